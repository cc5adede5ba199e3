use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::super::capabilities::*;
use super::super::error::*;
use super::super::rpc::RpcClient;
use super::super::shutdown::Shutdown;
use super::parse_quantity_u64;
use prelude::*;
use utils::log_error;

const MAINNET_NETWORK_ID: &str = "1";

struct State {
    rpc: Arc<RpcClient>,
    testnet: bool,
    poll: Duration,
    network_checked: AtomicBool,
    last_block: Mutex<Option<u64>>,
    callback: Mutex<Option<BlockCallback>>,
}

/// Polls the block number every `poll`. Blocks come every ~15 secs, so no pacing is needed.
#[derive(Clone)]
pub struct EthereumWatcher {
    state: Arc<State>,
}

impl EthereumWatcher {
    pub fn new(rpc: Arc<RpcClient>, testnet: bool, poll: Duration) -> Self {
        Self {
            state: Arc::new(State {
                rpc,
                testnet,
                poll,
                network_checked: AtomicBool::new(false),
                last_block: Mutex::new(None),
                callback: Mutex::new(None),
            }),
        }
    }

    /// Mainnet node reports network id `1`, any other id is a testnet
    fn check_network(&self) -> BlockchainFuture<()> {
        if self.state.network_checked.load(Ordering::SeqCst) {
            return Box::new(future::ok(()));
        }
        let state = self.state.clone();
        Box::new(self.state.rpc.call::<String>("net_version", json!([])).and_then(move |network| {
            let is_mainnet = network == MAINNET_NETWORK_ID;
            if is_mainnet == state.testnet {
                let testnet = state.testnet;
                return Err(ectx!(try err ErrorKind::NetworkMismatch, ErrorKind::NetworkMismatch => network, testnet));
            }
            state.network_checked.store(true, Ordering::SeqCst);
            Ok(())
        }))
    }

    fn tick(&self) -> BlockchainFuture<()> {
        let state = self.state.clone();
        let rpc = self.state.rpc.clone();
        Box::new(
            self.check_network()
                .and_then(move |_| rpc.call::<String>("eth_blockNumber", json!([])))
                .and_then(move |number| -> BlockchainFuture<()> {
                    let height = match parse_quantity_u64(&number) {
                        Ok(height) => height,
                        Err(e) => return Box::new(future::err(e)),
                    };
                    {
                        let mut last_block = state.last_block.lock().unwrap();
                        if *last_block == Some(height) {
                            return Box::new(future::ok(()));
                        }
                        *last_block = Some(height);
                    }
                    let callback = state.callback.lock().unwrap().clone();
                    match callback {
                        Some(callback) => {
                            debug!("New block at height {}", height);
                            let block = NewBlock {
                                hash: String::new(),
                                height,
                            };
                            Box::new(callback(block).then(|_| Ok(())))
                        }
                        None => Box::new(future::ok(())),
                    }
                }),
        )
    }
}

impl WatcherLoop for EthereumWatcher {
    fn on_new_block_released(&self, callback: BlockCallback) {
        *self.state.callback.lock().unwrap() = Some(callback);
    }

    fn run(&self, shutdown: Shutdown) -> BlockchainFuture<()> {
        let watcher = self.clone();
        Box::new(future::loop_fn((), move |_| {
            let poll = watcher.state.poll;
            let shutdown = shutdown.clone();
            shutdown
                .or_cancel(watcher.tick())
                .then(move |res| -> Box<Future<Item = Loop<(), ()>, Error = Error> + Send> {
                    match res {
                        Ok(None) => return Box::new(future::ok(Loop::Break(()))),
                        Ok(Some(_)) => (),
                        Err(e) => {
                            if e.kind() == ErrorKind::NetworkMismatch {
                                return Box::new(future::err(e));
                            }
                            log_error(&ectx!(try err e, ErrorContext::WatcherTick, ErrorKind::Internal));
                        }
                    };
                    Box::new(shutdown.sleep(poll).map(|is_shutdown| {
                        if is_shutdown {
                            Loop::Break(())
                        } else {
                            Loop::Continue(())
                        }
                    }))
                })
        }))
    }
}
