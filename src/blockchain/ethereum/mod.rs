//! Ethereum node (geth, parity) over json-rpc, plus etherscan for history.
//!
//! Node quantities are `0x`-prefixed hex integers of wei, converted with 18 decimals.

mod etherscan;
mod responses;
mod watcher;

use std::sync::Arc;
use std::time::Duration;

use num::{BigInt, ToPrimitive};
use regex::Regex;

pub use self::etherscan::{Etherscan, MAINNET_EXPLORER_URL, TESTNET_EXPLORER_URL};
use self::responses::*;
pub use self::watcher::EthereumWatcher;
use super::capabilities::*;
use super::error::*;
use super::registry::DialParams;
use super::rpc::RpcClient;
use client::HttpClient;
use models::*;
use prelude::*;
use utils::{format_errors, log_warn};

pub const WEI_EXPONENT: u32 = 18;
pub const DEFAULT_CONFIRMATIONS: u64 = 12;
pub const DEFAULT_GAS_LIMIT: u64 = 21_000;
pub const DEFAULT_GAS_PRICE_WEI: u64 = 20_000_000_000;
pub const DEFAULT_POLL_SECS: u64 = 15;
pub const DEFAULT_EXPLORER_RETRIES: u32 = 3;
pub const DEFAULT_EXPLORER_BACKOFF_MS: u64 = 1000;
const UNLOCK_SECS: u64 = 60;

lazy_static! {
    static ref ADDRESS_REGEX: Regex = Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap();
}

pub fn connect(http_client: Arc<HttpClient>, params: &DialParams) -> Result<Capabilities, Error> {
    let rpc = Arc::new(RpcClient::new(http_client.clone(), params.host.clone(), &params.user, &params.pass));
    let explorer_url = params.extra_str("explorer_url").unwrap_or_else(|| {
        if params.testnet {
            TESTNET_EXPLORER_URL.to_string()
        } else {
            MAINNET_EXPLORER_URL.to_string()
        }
    });
    let explorer = Arc::new(Etherscan::new(
        http_client,
        explorer_url,
        params.extra_str("explorer_api_key"),
        params.extra_or("explorer_retries", DEFAULT_EXPLORER_RETRIES)?,
        Duration::from_millis(params.extra_or("explorer_backoff_ms", DEFAULT_EXPLORER_BACKOFF_MS)?),
    ));
    let adapter = Arc::new(EthereumAdapter {
        rpc: rpc.clone(),
        explorer,
        passphrase: params.extra_str("passphrase").unwrap_or_else(|| params.pass.clone()),
        confirmations: params.extra_or("confirmations", DEFAULT_CONFIRMATIONS)?,
        gas_limit: params.extra_or("gas_limit", DEFAULT_GAS_LIMIT)?,
        gas_price: params.extra_or("gas_price_wei", DEFAULT_GAS_PRICE_WEI)?,
    });
    let poll = Duration::from_secs(params.extra_or("poll_secs", DEFAULT_POLL_SECS)?);
    let watcher = Arc::new(EthereumWatcher::new(rpc, params.testnet, poll));
    Ok(Capabilities {
        closer: Some(adapter.clone()),
        generator: Some(adapter.clone()),
        wallet_observer: Some(adapter.clone()),
        account_observer: Some(adapter.clone()),
        txs_observer: Some(adapter.clone()),
        tx_sender: Some(adapter.clone()),
        watcher_loop: Some(watcher),
        txs_history: Some(adapter),
    })
}

/// Parses a hex quantity such as `0x1bc16d674ec80000`
pub fn parse_quantity(quantity: &str) -> Result<BigInt, Error> {
    let digits = quantity.trim_left_matches("0x");
    if digits.is_empty() {
        return Ok(BigInt::from(0));
    }
    BigInt::parse_bytes(digits.as_bytes(), 16).ok_or(ectx!(err ErrorContext::Hex, ErrorKind::Internal => quantity))
}

pub fn parse_quantity_u64(quantity: &str) -> Result<u64, Error> {
    parse_quantity(quantity)?
        .to_u64()
        .ok_or(ectx!(err ErrorContext::Hex, ErrorKind::Internal => quantity))
}

pub fn to_quantity(value: &BigInt) -> String {
    format!("0x{}", value.to_str_radix(16))
}

fn validate_address(address: &BlockchainAddress) -> Result<(), Error> {
    if ADDRESS_REGEX.is_match(address.raw()) {
        Ok(())
    } else {
        Err(ectx!(err ErrorKind::AddressInvalid, ErrorKind::AddressInvalid => address))
    }
}

pub struct EthereumAdapter {
    rpc: Arc<RpcClient>,
    explorer: Arc<Etherscan>,
    passphrase: String,
    confirmations: u64,
    gas_limit: u64,
    gas_price: u64,
}

impl EthereumAdapter {
    fn address_balance(&self, address: &BlockchainAddress) -> BlockchainFuture<Amount> {
        let address_clone = address.clone();
        Box::new(
            self.rpc
                .call::<String>("eth_getBalance", json!([address.raw(), "latest"]))
                .and_then(move |quantity| parse_quantity(&quantity).map_err(ectx!(convert => address_clone)))
                .map(|wei| Amount::from_base_units(wei, WEI_EXPONENT)),
        )
    }

    /// Node first, explorer for txs the node has dropped or never seen
    fn find_tx(&self, hash: TxHash) -> BlockchainFuture<TransactionObject> {
        let explorer = self.explorer.clone();
        Box::new(
            self.rpc
                .call_optional::<TransactionObject>("eth_getTransactionByHash", json!([hash.raw()]))
                .and_then(move |tx| -> BlockchainFuture<Option<TransactionObject>> {
                    match tx {
                        Some(tx) => Box::new(future::ok(Some(tx))),
                        None => explorer.tx_by_hash(&hash),
                    }
                }).and_then(|tx| tx.ok_or(ectx!(try err ErrorKind::NoSuchTx, ErrorKind::NoSuchTx))),
        )
    }
}

impl Generator for EthereumAdapter {
    fn create(&self) -> BlockchainFuture<BlockchainAddress> {
        Box::new(
            self.rpc
                .call::<String>("personal_newAccount", json!([self.passphrase]))
                .map(BlockchainAddress::new),
        )
    }
}

impl WalletObserver for EthereumAdapter {
    fn balance(&self, address: BlockchainAddress) -> BlockchainFuture<Amount> {
        if let Err(e) = validate_address(&address) {
            return Box::new(future::err(e));
        }
        self.address_balance(&address)
    }

    fn balance_drops_on_send(&self) -> bool {
        true
    }
}

impl AccountObserver for EthereumAdapter {
    /// Sum over node accounts. Accounts whose balance can't be read are skipped with a warning,
    /// the call fails only if none could be read.
    fn get_balance(&self) -> BlockchainFuture<Amount> {
        let rpc = self.rpc.clone();
        let balances = self.rpc.call::<Vec<BlockchainAddress>>("eth_accounts", json!([])).and_then(move |accounts| {
            let queries: Vec<_> = accounts
                .into_iter()
                .map(|address| {
                    let address_clone = address.clone();
                    rpc.call::<String>("eth_getBalance", json!([address.raw(), "latest"]))
                        .and_then(move |quantity| parse_quantity(&quantity).map_err(ectx!(convert => address_clone)))
                        .then(|res| Ok::<_, Error>(res))
                }).collect();
            future::join_all(queries)
        });
        Box::new(balances.and_then(|results| {
            if results.is_empty() {
                return Ok(Amount::zero());
            }
            let total = results.len();
            let (oks, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(|res| res.is_ok());
            let errors: Vec<Error> = errors.into_iter().filter_map(|res| res.err()).collect();
            if errors.len() == total {
                let messages = format_errors(errors.iter());
                return Err(ectx!(try err ErrorContext::AllBalancesFailed, ErrorKind::Internal => messages));
            }
            if !errors.is_empty() {
                let messages = format_errors(errors.iter());
                let e: Error = ectx!(err ErrorContext::PartialBalances(messages), ErrorKind::Internal);
                log_warn(&e);
            }
            let wei = oks
                .into_iter()
                .filter_map(|res| res.ok())
                .fold(BigInt::from(0), |acc, balance| acc + balance);
            Ok(Amount::from_base_units(wei, WEI_EXPONENT))
        }))
    }
}

impl TxsObserver for EthereumAdapter {
    fn is_confirmed(&self, hash: TxHash) -> BlockchainFuture<Confirmation> {
        let rpc = self.rpc.clone();
        let required = self.confirmations;
        Box::new(self.find_tx(hash).and_then(move |tx| -> BlockchainFuture<Confirmation> {
            let block = match tx.block_number {
                None => return Box::new(future::ok(Confirmation::default())),
                Some(block) => block,
            };
            Box::new(
                parse_quantity_u64(&block)
                    .into_future()
                    .join(rpc.call::<String>("eth_blockNumber", json!([])).and_then(|tip| parse_quantity_u64(&tip)))
                    .map(move |(block, tip)| Confirmation {
                        confirmed: tip.saturating_sub(block) >= required,
                        abandoned: false,
                    }),
            )
        }))
    }
}

impl TxSender for EthereumAdapter {
    fn send(&self, from: BlockchainAddress, to: BlockchainAddress, amount: Amount) -> BlockchainFuture<SentTx> {
        let wei = match validate_address(&from)
            .and_then(|_| validate_address(&to))
            .and_then(|_| {
                amount
                    .to_base_units(WEI_EXPONENT)
                    .ok_or(ectx!(err ErrorContext::Amount, ErrorKind::MalformedInput => amount))
            }) {
            Ok(wei) => wei,
            Err(e) => return Box::new(future::err(e)),
        };
        let gas_limit = BigInt::from(self.gas_limit);
        let gas_price = BigInt::from(self.gas_price);
        let fee = Amount::from_base_units(&gas_limit * &gas_price, WEI_EXPONENT);
        let tx = json!({
            "from": from.raw(),
            "to": to.raw(),
            "value": to_quantity(&wei),
            "gas": to_quantity(&gas_limit),
            "gasPrice": to_quantity(&gas_price),
        });
        let rpc = self.rpc.clone();
        let from_clone = from.clone();
        Box::new(
            self.rpc
                .call::<bool>("personal_unlockAccount", json!([from.raw(), self.passphrase, UNLOCK_SECS]))
                .and_then(move |unlocked| {
                    if unlocked {
                        Ok(())
                    } else {
                        Err(ectx!(try err ErrorKind::Internal, ErrorKind::Internal => from_clone))
                    }
                }).and_then(move |_| rpc.call::<String>("eth_sendTransaction", json!([tx])))
                .map(move |hash| SentTx {
                    hash: TxHash::new(hash),
                    fee,
                }),
        )
    }
}

impl TxsHistory for EthereumAdapter {
    fn list(&self, address: BlockchainAddress) -> BlockchainFuture<Vec<HistoryEntry>> {
        if let Err(e) = validate_address(&address) {
            return Box::new(future::err(e));
        }
        self.explorer.tx_list(&address)
    }
}

impl Closer for EthereumAdapter {
    fn close(&self) -> Result<(), Error> {
        self.rpc.close();
        Ok(())
    }
}
