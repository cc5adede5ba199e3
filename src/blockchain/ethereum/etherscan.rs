use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use num::BigInt;
use serde_json::{self, Value};
use serde_qs;
use tokio::timer::Delay;

use super::super::capabilities::*;
use super::super::error::*;
use super::responses::*;
use super::WEI_EXPONENT;
use client::HttpClient;
use models::*;
use prelude::*;
use utils::read_body;

pub const MAINNET_EXPLORER_URL: &str = "https://api.etherscan.io/api";
pub const TESTNET_EXPLORER_URL: &str = "https://api-ropsten.etherscan.io/api";

#[derive(Debug, Clone, Serialize)]
struct ExplorerQuery {
    module: &'static str,
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    txhash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    apikey: Option<String>,
}

enum Answer {
    Result(Value),
    RateLimited,
}

/// Etherscan api, used for address history and for txs the node has not seen.
///
/// Free api keys are rate limited, such answers are retried `retries` times
/// with a linearly growing pause.
pub struct Etherscan {
    cli: Arc<HttpClient>,
    url: String,
    api_key: Option<String>,
    retries: u32,
    backoff: Duration,
}

impl Etherscan {
    pub fn new(cli: Arc<HttpClient>, url: String, api_key: Option<String>, retries: u32, backoff: Duration) -> Self {
        Self {
            cli,
            url,
            api_key,
            retries,
            backoff,
        }
    }

    pub fn tx_by_hash(&self, hash: &TxHash) -> BlockchainFuture<Option<TransactionObject>> {
        let query = ExplorerQuery {
            module: "proxy",
            action: "eth_getTransactionByHash",
            address: None,
            txhash: Some(hash.raw().to_string()),
            sort: None,
            apikey: self.api_key.clone(),
        };
        Box::new(self.query(query).and_then(|result| {
            let result_clone = result.clone();
            serde_json::from_value::<Option<TransactionObject>>(result)
                .map_err(ectx!(ErrorSource::Json, ErrorKind::Internal => result_clone))
        }))
    }

    pub fn tx_list(&self, address: &BlockchainAddress) -> BlockchainFuture<Vec<HistoryEntry>> {
        let query = ExplorerQuery {
            module: "account",
            action: "txlist",
            address: Some(address.raw().to_string()),
            txhash: None,
            sort: Some("asc"),
            apikey: self.api_key.clone(),
        };
        Box::new(self.query(query).and_then(|result| -> Result<Vec<HistoryEntry>, Error> {
            let result_clone = result.clone();
            let txs = serde_json::from_value::<Vec<ExplorerTx>>(result).map_err(ectx!(try ErrorSource::Json, ErrorKind::Internal => result_clone))?;
            txs.into_iter().map(history_entry).collect::<Result<Vec<_>, _>>()
        }))
    }

    fn query(&self, query: ExplorerQuery) -> BlockchainFuture<Value> {
        let url = match serde_qs::to_string(&query) {
            Ok(qs) => format!("{}?{}", self.url, qs),
            Err(e) => {
                let e = format_err!("{}", e);
                return Box::new(future::err(ectx!(err e, ErrorSource::SerdeQs, ErrorKind::MalformedInput => query)));
            }
        };
        let cli = self.cli.clone();
        let retries = self.retries;
        let backoff = self.backoff;
        Box::new(future::loop_fn(0u32, move |attempt| {
            let url = url.clone();
            Self::fetch(&cli, url.clone()).and_then(move |answer| -> BlockchainFuture<Loop<Value, u32>> {
                match answer {
                    Answer::Result(value) => Box::new(future::ok(Loop::Break(value))),
                    Answer::RateLimited if attempt >= retries => Box::new(future::err(ectx!(err ErrorSource::Explorer, ErrorContext::RateLimit, ErrorKind::Internal => url, attempt))),
                    Answer::RateLimited => {
                        debug!("Explorer rate limit hit, retrying in {:?}", backoff);
                        Box::new(
                            Delay::new(Instant::now() + backoff)
                                .map_err(ectx!(ErrorSource::Timer, ErrorKind::Internal))
                                .map(move |_| Loop::Continue(attempt + 1)),
                        )
                    }
                }
            })
        }))
    }

    fn fetch(cli: &Arc<HttpClient>, url: String) -> BlockchainFuture<Answer> {
        let url_clone = url.clone();
        Box::new(
            cli.get(url.clone())
                .map_err(ectx!(convert => url_clone))
                .and_then(|resp| read_body(resp.into_body()).map_err(ectx!(ErrorSource::Hyper, ErrorKind::Internal)))
                .and_then(move |bytes| -> Result<Answer, Error> {
                    let body = String::from_utf8_lossy(&bytes).to_string();
                    let response: ExplorerResponse =
                        serde_json::from_slice(&bytes).map_err(ectx!(try ErrorSource::Json, ErrorKind::Internal => body))?;
                    if response.status.as_ref().map(|s| s.as_str()) != Some("0") {
                        return Ok(Answer::Result(response.result));
                    }
                    let message = response.message.clone().unwrap_or_default();
                    let details = response.result.as_str().unwrap_or_default().to_string();
                    if details.to_lowercase().contains("rate limit") {
                        Ok(Answer::RateLimited)
                    } else if message.starts_with("No transactions found") {
                        Ok(Answer::Result(Value::Array(Vec::new())))
                    } else {
                        Err(ectx!(err ErrorSource::Explorer, ErrorKind::Internal => url, message, details))
                    }
                }),
        )
    }
}

fn parse_decimal<T: FromStr>(field: &'static str, value: &str) -> Result<T, Error> {
    value
        .parse()
        .map_err(|_| ectx!(err ErrorSource::Explorer, ErrorKind::Internal => field, value))
}

fn history_entry(tx: ExplorerTx) -> Result<HistoryEntry, Error> {
    let wei: BigInt = parse_decimal("value", &tx.value)?;
    Ok(HistoryEntry {
        hash: TxHash::new(tx.hash),
        from: BlockchainAddress::new(tx.from),
        to: BlockchainAddress::new(tx.to),
        amount: Amount::from_base_units(wei, WEI_EXPONENT),
        block: parse_decimal("blockNumber", &tx.block_number)?,
        confirmations: parse_decimal("confirmations", &tx.confirmations)?,
        failed: tx.is_error == "1",
    })
}

#[cfg(test)]
mod tests {
    use tokio::runtime::Runtime;

    use super::*;
    use client::HttpClientMock;

    fn create_explorer(http: &HttpClientMock, retries: u32) -> Etherscan {
        create_explorer_with_backoff(http, retries, Duration::from_millis(1))
    }

    fn create_explorer_with_backoff(http: &HttpClientMock, retries: u32, backoff: Duration) -> Etherscan {
        Etherscan::new(
            Arc::new(http.clone()),
            "http://explorer/api".to_string(),
            Some("key".to_string()),
            retries,
            backoff,
        )
    }

    const TXLIST: &str = r#"{"status": "1", "message": "OK", "result": [{
        "blockNumber": "6395245", "hash": "0xabc", "from": "0x01", "to": "0x02",
        "value": "1500000000000000000", "confirmations": "12", "isError": "0"
    }]}"#;

    #[test]
    fn test_tx_list() {
        let mut runtime = Runtime::new().unwrap();
        let http = HttpClientMock::new();
        http.respond("GET /api?module=account&action=txlist", 200, TXLIST);
        let explorer = create_explorer(&http, 3);
        let list = runtime.block_on(explorer.tx_list(&BlockchainAddress::new("0x02".to_string()))).unwrap();
        assert_eq!(
            list,
            vec![HistoryEntry {
                hash: TxHash::new("0xabc".to_string()),
                from: BlockchainAddress::new("0x01".to_string()),
                to: BlockchainAddress::new("0x02".to_string()),
                amount: Amount::from_str("1.5").unwrap(),
                block: 6395245,
                confirmations: 12,
                failed: false,
            }]
        );
    }

    #[test]
    fn test_no_transactions_is_empty_list() {
        let mut runtime = Runtime::new().unwrap();
        let http = HttpClientMock::new();
        http.respond(
            "GET /api?module=account",
            200,
            r#"{"status": "0", "message": "No transactions found", "result": []}"#,
        );
        let explorer = create_explorer(&http, 3);
        let list = runtime.block_on(explorer.tx_list(&BlockchainAddress::new("0x02".to_string()))).unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn test_rate_limit_is_retried() {
        let mut runtime = Runtime::new().unwrap();
        let http = HttpClientMock::new();
        let limited = r#"{"status": "0", "message": "NOTOK", "result": "Max rate limit reached"}"#;
        http.respond("GET /api?module=account", 200, limited);
        http.respond("GET /api?module=account", 200, limited);
        http.respond("GET /api?module=account", 200, TXLIST);
        let explorer = create_explorer(&http, 3);
        let list = runtime.block_on(explorer.tx_list(&BlockchainAddress::new("0x02".to_string()))).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(http.requests("GET /api?module=account").len(), 3);
    }

    #[test]
    fn test_rate_limit_backoff_does_not_grow() {
        let mut runtime = Runtime::new().unwrap();
        let http = HttpClientMock::new();
        let limited = r#"{"status": "0", "message": "NOTOK", "result": "Max rate limit reached"}"#;
        for _ in 0..4 {
            http.respond("GET /api?module=account", 200, limited);
        }
        http.respond("GET /api?module=account", 200, TXLIST);
        let explorer = create_explorer_with_backoff(&http, 4, Duration::from_millis(100));
        let started = Instant::now();
        let list = runtime.block_on(explorer.tx_list(&BlockchainAddress::new("0x02".to_string()))).unwrap();
        let elapsed = started.elapsed();
        assert_eq!(list.len(), 1);
        // 4 pauses of 100ms, a growing backoff would take 1s
        assert!(elapsed >= Duration::from_millis(400));
        assert!(elapsed < Duration::from_millis(900));
    }

    #[test]
    fn test_rate_limit_gives_up() {
        let mut runtime = Runtime::new().unwrap();
        let http = HttpClientMock::new();
        http.respond(
            "GET /api?module=account",
            200,
            r#"{"status": "0", "message": "NOTOK", "result": "Max rate limit reached, please use API Key for higher rate limit"}"#,
        );
        let explorer = create_explorer(&http, 2);
        let err = runtime
            .block_on(explorer.tx_list(&BlockchainAddress::new("0x02".to_string())))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(http.requests("GET /api?module=account").len(), 3);
    }

    #[test]
    fn test_explorer_error() {
        let mut runtime = Runtime::new().unwrap();
        let http = HttpClientMock::new();
        http.respond(
            "GET /api?module=account",
            200,
            r#"{"status": "0", "message": "NOTOK", "result": "Error! Invalid address format"}"#,
        );
        let explorer = create_explorer(&http, 3);
        let err = runtime.block_on(explorer.tx_list(&BlockchainAddress::new("zz".to_string()))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(http.requests("GET /api?module=account").len(), 1);
    }

    #[test]
    fn test_proxy_tx_by_hash() {
        let mut runtime = Runtime::new().unwrap();
        let http = HttpClientMock::new();
        http.respond(
            "GET /api?module=proxy",
            200,
            r#"{"jsonrpc": "2.0", "id": 1, "result": {"hash": "0xabc", "blockNumber": "0x10"}}"#,
        );
        let explorer = create_explorer(&http, 3);
        let tx = runtime
            .block_on(explorer.tx_by_hash(&TxHash::new("0xabc".to_string())))
            .unwrap()
            .unwrap();
        assert_eq!(tx.block_number, Some("0x10".to_string()));
    }
}
