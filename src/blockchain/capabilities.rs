use std::sync::Arc;

use super::error::*;
use super::shutdown::Shutdown;
use models::*;
use prelude::*;

pub type BlockchainFuture<T> = Box<Future<Item = T, Error = Error> + Send>;

pub trait Generator: Send + Sync + 'static {
    /// New address owned by the node
    fn create(&self) -> BlockchainFuture<BlockchainAddress>;
}

pub trait WalletObserver: Send + Sync + 'static {
    fn balance(&self, address: BlockchainAddress) -> BlockchainFuture<Amount>;
    /// Whether `balance` goes down once a tx sent from the address is mined
    fn balance_drops_on_send(&self) -> bool;
}

pub trait AccountObserver: Send + Sync + 'static {
    /// Sum over every address the node holds, i.e. the most the node can ever send
    fn get_balance(&self) -> BlockchainFuture<Amount>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Confirmation {
    pub confirmed: bool,
    /// Tx will never be mined, e.g. dropped from mempool or conflicting with a mined one
    pub abandoned: bool,
}

pub trait TxsObserver: Send + Sync + 'static {
    fn is_confirmed(&self, hash: TxHash) -> BlockchainFuture<Confirmation>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentTx {
    pub hash: TxHash,
    pub fee: Amount,
}

pub trait TxSender: Send + Sync + 'static {
    fn send(&self, from: BlockchainAddress, to: BlockchainAddress, amount: Amount) -> BlockchainFuture<SentTx>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBlock {
    /// Empty for nodes that are polled for the height only
    pub hash: String,
    pub height: u64,
}

/// Subscriber of a watcher loop. The loop waits for the returned future before its next tick.
pub type BlockCallback = Arc<Fn(NewBlock) -> Box<Future<Item = (), Error = ()> + Send> + Send + Sync>;

pub trait WatcherLoop: Send + Sync + 'static {
    fn on_new_block_released(&self, callback: BlockCallback);
    /// Polls the node until `shutdown` fires. Tick errors are logged and retried,
    /// only unrecoverable ones (e.g. wrong network) end the loop with an error.
    fn run(&self, shutdown: Shutdown) -> BlockchainFuture<()>;
}

pub trait TxsHistory: Send + Sync + 'static {
    fn list(&self, address: BlockchainAddress) -> BlockchainFuture<Vec<HistoryEntry>>;
}

pub trait Closer: Send + Sync + 'static {
    /// Releases node connections. Every call after this one fails with `ErrorKind::Closed`.
    fn close(&self) -> Result<(), Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Generator,
    WalletObserver,
    AccountObserver,
    TxsObserver,
    TxSender,
    WatcherLoop,
    TxsHistory,
}

/// Services one dialed adapter provides. An absent service is `None`.
#[derive(Clone, Default)]
pub struct Capabilities {
    pub closer: Option<Arc<Closer>>,
    pub generator: Option<Arc<Generator>>,
    pub wallet_observer: Option<Arc<WalletObserver>>,
    pub account_observer: Option<Arc<AccountObserver>>,
    pub txs_observer: Option<Arc<TxsObserver>>,
    pub tx_sender: Option<Arc<TxSender>>,
    pub watcher_loop: Option<Arc<WatcherLoop>>,
    pub txs_history: Option<Arc<TxsHistory>>,
}

impl Capabilities {
    pub fn provided(&self) -> Vec<Capability> {
        let mut res = Vec::new();
        if self.generator.is_some() {
            res.push(Capability::Generator);
        }
        if self.wallet_observer.is_some() {
            res.push(Capability::WalletObserver);
        }
        if self.account_observer.is_some() {
            res.push(Capability::AccountObserver);
        }
        if self.txs_observer.is_some() {
            res.push(Capability::TxsObserver);
        }
        if self.tx_sender.is_some() {
            res.push(Capability::TxSender);
        }
        if self.watcher_loop.is_some() {
            res.push(Capability::WatcherLoop);
        }
        if self.txs_history.is_some() {
            res.push(Capability::TxsHistory);
        }
        res
    }
}
