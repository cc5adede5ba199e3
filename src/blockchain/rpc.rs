use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use base64;
use hyper::{Body, Method, Request};
use serde::de::DeserializeOwned;
use serde_json::{self, Value};

use super::capabilities::BlockchainFuture;
use super::error::*;
use client::HttpClient;
use prelude::*;
use utils::read_body;

#[derive(Debug, Clone, Deserialize, Fail)]
#[fail(display = "node rpc error {}: {}", code, message)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

/// Json-rpc over http, as spoken by bitcoind-like and ethereum nodes.
///
/// Node error objects become `ErrorKind::Rpc(code)`, so that adapters can
/// translate chain-specific codes into `AddressInvalid`, `NoSuchTx`, etc.
pub struct RpcClient {
    cli: Arc<HttpClient>,
    url: String,
    authorization: Option<String>,
    next_id: AtomicUsize,
    closed: AtomicBool,
}

impl RpcClient {
    pub fn new(cli: Arc<HttpClient>, url: String, user: &str, pass: &str) -> Self {
        let authorization = if user.is_empty() {
            None
        } else {
            Some(format!("Basic {}", base64::encode(&format!("{}:{}", user, pass))))
        };
        Self {
            cli,
            url,
            authorization,
            next_id: AtomicUsize::new(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Same as `call_optional`, but a `null` result is an error
    pub fn call<T>(&self, method: &'static str, params: Value) -> BlockchainFuture<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        Box::new(self.call_optional(method, params).and_then(move |result| {
            result.ok_or(ectx!(err ErrorSource::Rpc, ErrorKind::Internal => method))
        }))
    }

    pub fn call_optional<T>(&self, method: &'static str, params: Value) -> BlockchainFuture<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        if self.closed.load(Ordering::SeqCst) {
            return Box::new(future::err(ectx!(err ErrorKind::Closed, ErrorKind::Closed => method)));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }).to_string();
        trace!("Rpc request to {}: {}", self.url, body);
        let mut builder = Request::builder();
        builder.uri(self.url.as_str()).method(Method::POST);
        builder.header("Content-Type", "application/json");
        if let Some(ref authorization) = self.authorization {
            builder.header("Authorization", authorization.as_str());
        }
        let cli = self.cli.clone();
        Box::new(
            builder
                .body(Body::from(body))
                .map_err(ectx!(ErrorSource::Hyper, ErrorKind::MalformedInput => method))
                .into_future()
                // node errors come with 4xx/5xx statuses and a json body, so statuses are not checked here
                .and_then(move |req| cli.request_raw(req).map_err(ectx!(convert => method)))
                .and_then(move |resp| {
                    let status = resp.status();
                    read_body(resp.into_body())
                        .map_err(ectx!(ErrorSource::Hyper, ErrorKind::Internal => method))
                        .map(move |bytes| (status, bytes))
                }).and_then(move |(status, bytes)| -> Result<Option<T>, Error> {
                    let response: RpcResponse<T> = serde_json::from_slice(&bytes).map_err(|e| {
                        let body = String::from_utf8_lossy(&bytes).to_string();
                        ectx!(try err e, ErrorSource::Json, ErrorKind::Internal => method, status, body)
                    })?;
                    match response.error {
                        Some(rpc_error) => {
                            let code = rpc_error.code;
                            Err(ectx!(err rpc_error, ErrorSource::Rpc, ErrorKind::Rpc(code) => method))
                        }
                        None => Ok(response.result),
                    }
                }),
        )
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
