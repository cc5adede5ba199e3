use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;

use super::super::capabilities::*;
use super::super::error::*;
use super::super::rpc::RpcClient;
use super::super::shutdown::Shutdown;
use super::responses::BlockInfo;
use prelude::*;
use utils::log_error;

/// How long to sleep before asking the node for a new block.
///
/// Blocks come on average every `block_interval`, so the watcher sleeps until the expected
/// arrival of the next one. If that moment has already passed, the expectation is doubled
/// until it lies in the future. The result is never shorter than `min_sleep`.
pub fn next_poll_delay(block_interval: Duration, since_last_block: Duration, min_sleep: Duration) -> Duration {
    if block_interval == Duration::from_secs(0) {
        return min_sleep;
    }
    let mut expected = block_interval;
    while expected <= since_last_block {
        expected = match expected.checked_mul(2) {
            Some(doubled) => doubled,
            None => break,
        };
    }
    let remaining = expected.checked_sub(since_last_block).unwrap_or_default();
    ::std::cmp::max(remaining, min_sleep)
}

struct State {
    rpc: Arc<RpcClient>,
    block_interval: Duration,
    min_sleep: Duration,
    retry: Duration,
    last_hash: Mutex<Option<String>>,
    callback: Mutex<Option<BlockCallback>>,
}

/// Polls `getbestblockhash`, paced by the expected block interval of the chain
#[derive(Clone)]
pub struct BitcoinWatcher {
    state: Arc<State>,
}

impl BitcoinWatcher {
    pub fn new(rpc: Arc<RpcClient>, block_interval: Duration, min_sleep: Duration, retry: Duration) -> Self {
        Self {
            state: Arc::new(State {
                rpc,
                block_interval,
                min_sleep,
                retry,
                last_hash: Mutex::new(None),
                callback: Mutex::new(None),
            }),
        }
    }

    /// One poll of the node. Resolves to the delay before the next poll.
    fn tick(&self) -> BlockchainFuture<Duration> {
        let state = self.state.clone();
        let rpc = self.state.rpc.clone();
        Box::new(
            self.state
                .rpc
                .call::<String>("getbestblockhash", json!([]))
                .and_then(move |hash| rpc.call::<BlockInfo>("getblock", json!([hash])))
                .and_then(move |block| {
                    let block_time = block.mediantime.unwrap_or(block.time);
                    let since = Utc::now().timestamp() - block_time;
                    let since = Duration::from_secs(if since > 0 { since as u64 } else { 0 });
                    let delay = next_poll_delay(state.block_interval, since, state.min_sleep);
                    let is_new = {
                        let mut last_hash = state.last_hash.lock().unwrap();
                        if last_hash.as_ref() == Some(&block.hash) {
                            false
                        } else {
                            *last_hash = Some(block.hash.clone());
                            true
                        }
                    };
                    let callback = state.callback.lock().unwrap().clone();
                    let notified: Box<Future<Item = (), Error = Error> + Send> = match callback {
                        Some(ref callback) if is_new => {
                            debug!("New block {} at height {}", block.hash, block.height);
                            Box::new(callback(NewBlock {
                                hash: block.hash,
                                height: block.height,
                            }).then(|_| Ok(())))
                        }
                        _ => Box::new(future::ok(())),
                    };
                    notified.map(move |_| delay)
                }),
        )
    }
}

impl WatcherLoop for BitcoinWatcher {
    fn on_new_block_released(&self, callback: BlockCallback) {
        *self.state.callback.lock().unwrap() = Some(callback);
    }

    fn run(&self, shutdown: Shutdown) -> BlockchainFuture<()> {
        let watcher = self.clone();
        Box::new(future::loop_fn((), move |_| {
            let retry = watcher.state.retry;
            let shutdown = shutdown.clone();
            shutdown
                .or_cancel(watcher.tick())
                .then(move |res| -> Box<Future<Item = Loop<(), ()>, Error = Error> + Send> {
                    let delay = match res {
                        Ok(None) => return Box::new(future::ok(Loop::Break(()))),
                        Ok(Some(delay)) => delay,
                        Err(e) => {
                            log_error(&ectx!(try err e, ErrorContext::WatcherTick, ErrorKind::Internal));
                            retry
                        }
                    };
                    trace!("Next poll of the node in {:?}", delay);
                    Box::new(shutdown.sleep(delay).map(|is_shutdown| {
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
