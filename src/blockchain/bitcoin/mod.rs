//! Bitcoin-family nodes (bitcoind, litecoind) over json-rpc.
//! Node amounts are decimal coins, e.g. `0.5`, and are parsed without floats.

mod responses;
mod watcher;

use std::sync::Arc;
use std::time::Duration;

use self::responses::*;
pub use self::watcher::{next_poll_delay, BitcoinWatcher};
use super::capabilities::*;
use super::error::*;
use super::registry::DialParams;
use super::rpc::RpcClient;
use client::HttpClient;
use models::*;
use prelude::*;

/// `RPC_INVALID_ADDRESS_OR_KEY`, returned both for bad addresses and unknown tx ids
const RPC_INVALID_ADDRESS_OR_KEY: i64 = -5;

pub const DEFAULT_CONFIRMATIONS: i64 = 6;
pub const DEFAULT_MIN_SLEEP_SECS: u64 = 10;
pub const DEFAULT_RETRY_SECS: u64 = 30;

pub fn connect(http_client: Arc<HttpClient>, params: &DialParams, block_interval_secs: u64) -> Result<Capabilities, Error> {
    let rpc = Arc::new(RpcClient::new(http_client, params.host.clone(), &params.user, &params.pass));
    let confirmations = params.extra_or("confirmations", DEFAULT_CONFIRMATIONS)?;
    let min_sleep = Duration::from_secs(params.extra_or("min_sleep_secs", DEFAULT_MIN_SLEEP_SECS)?);
    let retry = Duration::from_secs(params.extra_or("retry_secs", DEFAULT_RETRY_SECS)?);
    let adapter = Arc::new(BitcoinAdapter::new(rpc.clone(), confirmations));
    let watcher = Arc::new(BitcoinWatcher::new(rpc, Duration::from_secs(block_interval_secs), min_sleep, retry));
    Ok(Capabilities {
        closer: Some(adapter.clone()),
        generator: Some(adapter.clone()),
        wallet_observer: Some(adapter.clone()),
        account_observer: Some(adapter.clone()),
        txs_observer: Some(adapter.clone()),
        tx_sender: Some(adapter),
        watcher_loop: Some(watcher),
        txs_history: None,
    })
}

pub struct BitcoinAdapter {
    rpc: Arc<RpcClient>,
    confirmations: i64,
}

impl BitcoinAdapter {
    pub fn new(rpc: Arc<RpcClient>, confirmations: i64) -> Self {
        Self { rpc, confirmations }
    }
}

/// Rpc code -5 means a bad address for address calls and an unknown tx for tx calls
fn translate_invalid(e: Error, kind: ErrorKind) -> Error {
    if e.kind() == ErrorKind::Rpc(RPC_INVALID_ADDRESS_OR_KEY) {
        ectx!(err e, kind)
    } else {
        e
    }
}

impl Generator for BitcoinAdapter {
    fn create(&self) -> BlockchainFuture<BlockchainAddress> {
        Box::new(
            self.rpc
                .call::<String>("getnewaddress", json!([]))
                .map(BlockchainAddress::new),
        )
    }
}

impl WalletObserver for BitcoinAdapter {
    fn balance(&self, address: BlockchainAddress) -> BlockchainFuture<Amount> {
        Box::new(
            self.rpc
                .call::<Amount>("getreceivedbyaddress", json!([address.raw()]))
                .map_err(|e| translate_invalid(e, ErrorKind::AddressInvalid)),
        )
    }

    /// Received total only, sends are funded from the whole node wallet
    fn balance_drops_on_send(&self) -> bool {
        false
    }
}

impl AccountObserver for BitcoinAdapter {
    fn get_balance(&self) -> BlockchainFuture<Amount> {
        Box::new(self.rpc.call::<WalletInfo>("getwalletinfo", json!([])).map(|info| info.balance))
    }
}

impl TxsObserver for BitcoinAdapter {
    fn is_confirmed(&self, hash: TxHash) -> BlockchainFuture<Confirmation> {
        let required = self.confirmations;
        Box::new(
            self.rpc
                .call::<TransactionInfo>("gettransaction", json!([hash.raw()]))
                .map_err(|e| translate_invalid(e, ErrorKind::NoSuchTx))
                .map(move |info| Confirmation {
                    confirmed: info.confirmations >= required,
                    abandoned: info.abandoned || info.confirmations < 0,
                }),
        )
    }
}

impl TxSender for BitcoinAdapter {
    /// The node picks inputs from its whole wallet, `from` is not used to fund the tx
    fn send(&self, from: BlockchainAddress, to: BlockchainAddress, amount: Amount) -> BlockchainFuture<SentTx> {
        debug!("Sending {} from {} to {}", amount, from, to);
        let rpc = self.rpc.clone();
        Box::new(
            self.rpc
                .call::<String>("sendtoaddress", json!([to.raw(), amount.to_string()]))
                .map_err(|e| translate_invalid(e, ErrorKind::AddressInvalid))
                .and_then(move |hash| {
                    rpc.call::<TransactionInfo>("gettransaction", json!([hash.as_str()]))
                        .map(move |info| SentTx {
                            hash: TxHash::new(hash),
                            fee: info.fee.map(|fee| if fee.is_negative() { -fee } else { fee }).unwrap_or_default(),
                        }).map_err(ectx!(convert => to))
                }),
        )
    }
}

impl Closer for BitcoinAdapter {
    fn close(&self) -> Result<(), Error> {
        self.rpc.close();
        Ok(())
    }
}
