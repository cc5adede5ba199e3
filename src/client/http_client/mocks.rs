use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use hyper::{Body, Request, Response, StatusCode};
use serde_json::{self, Value};

use super::error::*;
use super::{HttpClient, HttpFuture};
use prelude::*;
use utils::read_body;

/// Canned responses keyed either by json-rpc method name (for rpc calls)
/// or by `"<METHOD> <path?query>"` prefix (for rest calls).
///
/// Every key holds a queue of responses; the last one is repeated once the queue is drained.
#[derive(Clone, Default)]
pub struct HttpClientMock {
    responses: Arc<Mutex<HashMap<String, VecDeque<(u16, String)>>>>,
    requests: Arc<Mutex<Vec<(String, String)>>>,
}

impl HttpClientMock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, key: &str, status: u16, body: &str) {
        let mut responses = self.responses.lock().unwrap();
        responses
            .entry(key.to_string())
            .or_insert_with(VecDeque::new)
            .push_back((status, body.to_string()));
    }

    /// Json-rpc success response with the given `result`
    pub fn respond_rpc(&self, method: &str, result: Value) {
        let body = json!({"jsonrpc": "2.0", "id": 1, "result": result});
        self.respond(method, 200, &body.to_string());
    }

    pub fn respond_rpc_error(&self, method: &str, code: i64, message: &str) {
        let body = json!({"jsonrpc": "2.0", "id": 1, "result": null, "error": {"code": code, "message": message}});
        self.respond(method, 200, &body.to_string());
    }

    /// Bodies of the requests sent with this key
    pub fn requests(&self, key: &str) -> Vec<String> {
        let requests = self.requests.lock().unwrap();
        requests.iter().filter(|(k, _)| k.starts_with(key)).map(|(_, body)| body.clone()).collect()
    }

    fn request_key(method: &str, path: &str, body: &[u8]) -> String {
        let rpc_method = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|value| value.get("method").and_then(|m| m.as_str()).map(|m| m.to_string()));
        rpc_method.unwrap_or_else(|| format!("{} {}", method, path))
    }

    fn next_response(&self, key: &str) -> Option<(u16, String)> {
        let mut responses = self.responses.lock().unwrap();
        let best_match = responses
            .keys()
            .filter(|k| key.starts_with(k.as_str()))
            .max_by_key(|k| k.len())
            .cloned()?;
        let queue = responses.get_mut(&best_match)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

impl HttpClient for HttpClientMock {
    fn request_raw(&self, req: Request<Body>) -> HttpFuture {
        let (parts, body) = req.into_parts();
        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_default();
        let method = parts.method.to_string();
        let mock = self.clone();
        Box::new(
            read_body(body)
                .map_err(ectx!(ErrorSource::Hyper, ErrorKind::Internal))
                .and_then(move |body| {
                    let key = HttpClientMock::request_key(&method, &path, &body);
                    mock.requests
                        .lock()
                        .unwrap()
                        .push((key.clone(), String::from_utf8(body).unwrap_or_default()));
                    let (status, body) = mock
                        .next_response(&key)
                        .ok_or(ectx!(try err ErrorKind::Internal, ErrorKind::Internal => key))?;
                    let mut resp = Response::new(Body::from(body));
                    *resp.status_mut() = StatusCode::from_u16(status).map_err(ectx!(try ErrorSource::Server, ErrorKind::Internal))?;
                    Ok(resp)
                }),
        )
    }
}
