//! Token gateway with a plain rest api, for coins that have no node of their own here
//! (e.g. erc-20 tokens behind a custodial service).

mod responses;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use base64;
use hyper::{Body, Method, Request};
use num::BigInt;
use serde::de::DeserializeOwned;
use serde_json;

use self::responses::*;
use super::capabilities::*;
use super::error::*;
use super::registry::DialParams;
use client::http_client::error::{Error as HttpClientError, ErrorKind as HttpClientErrorKind};
use client::HttpClient;
use models::*;
use prelude::*;
use utils::read_body;

pub const DEFAULT_DECIMALS: u32 = 8;

pub fn connect(http_client: Arc<HttpClient>, params: &DialParams) -> Result<Capabilities, Error> {
    let adapter = Arc::new(AssetAdapter::new(
        http_client,
        params.host.clone(),
        &params.user,
        &params.pass,
        params.extra_or("decimals", DEFAULT_DECIMALS)?,
    ));
    Ok(Capabilities {
        closer: Some(adapter.clone()),
        generator: Some(adapter.clone()),
        wallet_observer: Some(adapter.clone()),
        account_observer: Some(adapter.clone()),
        txs_observer: Some(adapter.clone()),
        tx_sender: Some(adapter),
        watcher_loop: None,
        txs_history: None,
    })
}

/// 404 and 422 answers mean different things depending on the endpoint
fn translate(e: HttpClientError, not_found: ErrorKind, unprocessable: ErrorKind) -> Error {
    let kind = match e.kind() {
        HttpClientErrorKind::NotFound => not_found,
        HttpClientErrorKind::Validation(_) => unprocessable,
        other => other.into(),
    };
    ectx!(err e, kind)
}

pub struct AssetAdapter {
    cli: Arc<HttpClient>,
    url: String,
    authorization: Option<String>,
    decimals: u32,
    closed: AtomicBool,
}

impl AssetAdapter {
    pub fn new(cli: Arc<HttpClient>, url: String, user: &str, pass: &str, decimals: u32) -> Self {
        let authorization = if user.is_empty() {
            None
        } else {
            Some(format!("Basic {}", base64::encode(&format!("{}:{}", user, pass))))
        };
        Self {
            cli,
            url,
            authorization,
            decimals,
            closed: AtomicBool::new(false),
        }
    }

    fn exec<T>(&self, method: Method, path: String, body: Option<String>, not_found: ErrorKind) -> BlockchainFuture<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        if self.closed.load(Ordering::SeqCst) {
            return Box::new(future::err(ectx!(err ErrorKind::Closed, ErrorKind::Closed => path)));
        }
        let url = format!("{}{}", self.url, path);
        let mut builder = Request::builder();
        builder.uri(url.as_str()).method(method);
        if let Some(ref authorization) = self.authorization {
            builder.header("Authorization", authorization.as_str());
        }
        if body.is_some() {
            builder.header("Content-Type", "application/json");
        }
        let cli = self.cli.clone();
        let url_clone = url.clone();
        Box::new(
            builder
                .body(body.map(Body::from).unwrap_or_else(Body::empty))
                .map_err(ectx!(ErrorSource::Hyper, ErrorKind::MalformedInput => url))
                .into_future()
                .and_then(move |req| {
                    cli.request(req)
                        .map_err(move |e| translate(e, not_found, ErrorKind::AddressInvalid))
                }).and_then(|resp| read_body(resp.into_body()).map_err(ectx!(ErrorSource::Hyper, ErrorKind::Internal)))
                .and_then(move |bytes| {
                    let body = String::from_utf8_lossy(&bytes).to_string();
                    serde_json::from_slice::<T>(&bytes).map_err(ectx!(ErrorSource::Json, ErrorKind::Internal => url_clone, body))
                }),
        )
    }
}

impl Generator for AssetAdapter {
    fn create(&self) -> BlockchainFuture<BlockchainAddress> {
        Box::new(
            self.exec::<AddressResponse>(Method::POST, "/addresses".to_string(), Some("{}".to_string()), ErrorKind::Internal)
                .map(|resp| BlockchainAddress::new(resp.address)),
        )
    }
}

impl WalletObserver for AssetAdapter {
    fn balance(&self, address: BlockchainAddress) -> BlockchainFuture<Amount> {
        let path = format!("/addresses/{}/balance", address);
        let decimals = self.decimals;
        Box::new(
            self.exec::<BalanceResponse>(Method::GET, path, None, ErrorKind::AddressInvalid)
                .and_then(move |resp| parse_units(&resp.balance, decimals)),
        )
    }

    fn balance_drops_on_send(&self) -> bool {
        true
    }
}

impl AccountObserver for AssetAdapter {
    fn get_balance(&self) -> BlockchainFuture<Amount> {
        let decimals = self.decimals;
        Box::new(
            self.exec::<BalanceResponse>(Method::GET, "/balance".to_string(), None, ErrorKind::Internal)
                .and_then(move |resp| parse_units(&resp.balance, decimals)),
        )
    }
}

impl TxsObserver for AssetAdapter {
    fn is_confirmed(&self, hash: TxHash) -> BlockchainFuture<Confirmation> {
        let path = format!("/transactions/{}", hash);
        Box::new(
            self.exec::<TransactionResponse>(Method::GET, path, None, ErrorKind::NoSuchTx)
                .map(|resp| Confirmation {
                    confirmed: resp.status == AssetTxStatus::Confirmed,
                    abandoned: resp.status == AssetTxStatus::Failed,
                }),
        )
    }
}

impl TxSender for AssetAdapter {
    fn send(&self, from: BlockchainAddress, to: BlockchainAddress, amount: Amount) -> BlockchainFuture<SentTx> {
        let decimals = self.decimals;
        let units = match amount.to_base_units(decimals) {
            Some(units) => units,
            None => return Box::new(future::err(ectx!(err ErrorContext::Amount, ErrorKind::MalformedInput => amount, decimals))),
        };
        let request = SendRequest {
            from: from.raw().to_string(),
            to: to.raw().to_string(),
            amount: units.to_string(),
        };
        let body = match serde_json::to_string(&request) {
            Ok(body) => body,
            Err(e) => return Box::new(future::err(ectx!(err e, ErrorSource::Json, ErrorKind::Internal => request))),
        };
        Box::new(
            self.exec::<SendResponse>(Method::POST, "/transactions".to_string(), Some(body), ErrorKind::AddressInvalid)
                .and_then(move |resp| -> Result<SentTx, Error> {
                    let fee = parse_units(&resp.fee, decimals)?;
                    Ok(SentTx {
                        hash: TxHash::new(resp.hash),
                        fee,
                    })
                }),
        )
    }
}

impl Closer for AssetAdapter {
    fn close(&self) -> Result<(), Error> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn parse_units(units: &str, decimals: u32) -> Result<Amount, Error> {
    BigInt::parse_bytes(units.as_bytes(), 10)
        .map(|units| Amount::from_base_units(units, decimals))
        .ok_or(ectx!(err ErrorContext::Amount, ErrorKind::Internal => units))
}
