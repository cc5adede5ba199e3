use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::task;

use super::capabilities::*;
use super::error::*;
use models::*;
use prelude::*;

#[derive(Default)]
struct ChainState {
    account_balance: Amount,
    address_balances: HashMap<BlockchainAddress, Amount>,
    confirmations: HashMap<TxHash, Confirmation>,
    broken_confirmations: Vec<TxHash>,
    sent: Vec<(BlockchainAddress, BlockchainAddress, Amount)>,
    balance_drops_on_send: bool,
    send_error: Option<ErrorKind>,
    generated: usize,
    generator_yields: bool,
    closed: bool,
    close_error: bool,
}

/// In-memory node implementing every service except watching and history
#[derive(Clone, Default)]
pub struct ChainMock {
    state: Arc<Mutex<ChainState>>,
}

impl ChainMock {
    pub fn capabilities(&self) -> Capabilities {
        let this = Arc::new(self.clone());
        Capabilities {
            closer: Some(this.clone()),
            generator: Some(this.clone()),
            wallet_observer: Some(this.clone()),
            account_observer: Some(this.clone()),
            txs_observer: Some(this.clone()),
            tx_sender: Some(this),
            watcher_loop: None,
            txs_history: None,
        }
    }

    pub fn set_account_balance(&self, balance: Amount) {
        self.state.lock().unwrap().account_balance = balance;
    }

    pub fn set_address_balance(&self, address: BlockchainAddress, balance: Amount) {
        self.state.lock().unwrap().address_balances.insert(address, balance);
    }

    pub fn set_confirmation(&self, hash: TxHash, confirmation: Confirmation) {
        self.state.lock().unwrap().confirmations.insert(hash, confirmation);
    }

    /// Confirmation queries for `hash` fail with `ErrorKind::Internal`
    pub fn break_confirmation(&self, hash: TxHash) {
        self.state.lock().unwrap().broken_confirmations.push(hash);
    }

    /// Generated addresses are ready only on the second poll, letting other futures run in between
    pub fn set_generator_yields(&self, yields: bool) {
        self.state.lock().unwrap().generator_yields = yields;
    }

    pub fn set_balance_drops_on_send(&self, drops: bool) {
        self.state.lock().unwrap().balance_drops_on_send = drops;
    }

    pub fn set_send_error(&self, error: Option<ErrorKind>) {
        self.state.lock().unwrap().send_error = error;
    }

    pub fn set_close_error(&self, is_failing: bool) {
        self.state.lock().unwrap().close_error = is_failing;
    }

    pub fn sent(&self) -> Vec<(BlockchainAddress, BlockchainAddress, Amount)> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }
}

impl Generator for ChainMock {
    fn create(&self) -> BlockchainFuture<BlockchainAddress> {
        let mut state = self.state.lock().unwrap();
        state.generated += 1;
        let address = BlockchainAddress::new(format!("address-{}", state.generated));
        if !state.generator_yields {
            return Box::new(future::ok(address));
        }
        let mut address = Some(address);
        let mut yielded = false;
        Box::new(future::poll_fn(move || -> Poll<BlockchainAddress, Error> {
            if !yielded {
                yielded = true;
                task::current().notify();
                return Ok(Async::NotReady);
            }
            Ok(Async::Ready(address.take().unwrap()))
        }))
    }
}

impl WalletObserver for ChainMock {
    fn balance(&self, address: BlockchainAddress) -> BlockchainFuture<Amount> {
        let state = self.state.lock().unwrap();
        let balance = state.address_balances.get(&address).cloned().unwrap_or_default();
        Box::new(future::ok(balance))
    }

    fn balance_drops_on_send(&self) -> bool {
        self.state.lock().unwrap().balance_drops_on_send
    }
}

impl AccountObserver for ChainMock {
    fn get_balance(&self) -> BlockchainFuture<Amount> {
        let state = self.state.lock().unwrap();
        Box::new(future::ok(state.account_balance.clone()))
    }
}

impl TxsObserver for ChainMock {
    fn is_confirmed(&self, hash: TxHash) -> BlockchainFuture<Confirmation> {
        let state = self.state.lock().unwrap();
        if state.broken_confirmations.contains(&hash) {
            return Box::new(future::err(ectx!(err ErrorKind::Internal, ErrorKind::Internal => hash)));
        }
        let res = state
            .confirmations
            .get(&hash)
            .cloned()
            .ok_or(ectx!(try err ErrorKind::NoSuchTx, ErrorKind::NoSuchTx => hash));
        Box::new(res.into_future())
    }
}

impl TxSender for ChainMock {
    fn send(&self, from: BlockchainAddress, to: BlockchainAddress, amount: Amount) -> BlockchainFuture<SentTx> {
        let mut state = self.state.lock().unwrap();
        if let Some(kind) = state.send_error.clone() {
            return Box::new(future::err(ectx!(err kind.clone(), kind => to)));
        }
        state.sent.push((from, to, amount));
        let sent = SentTx {
            hash: TxHash::new(format!("hash-{}", state.sent.len())),
            fee: Amount::new(1, 4),
        };
        Box::new(future::ok(sent))
    }
}

impl Closer for ChainMock {
    fn close(&self) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.closed = true;
        if state.close_error {
            Err(ectx!(err ErrorKind::Internal, ErrorKind::Internal))
        } else {
            Ok(())
        }
    }
}
