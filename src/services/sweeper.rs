use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;

use super::error::*;
use super::txs::TxsService;
use super::ServiceFuture;
use blockchain::Shutdown;
use prelude::*;
use utils::log_error;

/// Periodically cancels `pending` txs whose recipient never created a wallet
#[derive(Clone)]
pub struct Sweeper {
    txs_service: Arc<dyn TxsService>,
    interval: Duration,
    max_age: ChronoDuration,
}

impl Sweeper {
    pub fn new(txs_service: Arc<dyn TxsService>, interval: Duration, max_age: ChronoDuration) -> Self {
        Self {
            txs_service,
            interval,
            max_age,
        }
    }

    /// Sweeps until `shutdown` fires. A failed sweep is logged and retried on the next tick.
    pub fn run(&self, shutdown: Shutdown) -> ServiceFuture<()> {
        let sweeper = self.clone();
        Box::new(future::loop_fn((), move |_| {
            let interval = sweeper.interval;
            let shutdown = shutdown.clone();
            shutdown
                .or_cancel(sweeper.txs_service.cancel_outdated_pending(sweeper.max_age))
                .then(move |res| -> ServiceFuture<Loop<(), ()>> {
                    match res {
                        Ok(None) => return Box::new(future::ok(Loop::Break(()))),
                        Ok(Some(ref cancelled)) if !cancelled.is_empty() => {
                            debug!("Sweeper cancelled txs {:?}", cancelled.iter().map(|tx| tx.id).collect::<Vec<_>>())
                        }
                        Ok(Some(_)) => (),
                        Err(e) => log_error(&ectx!(try err e, ErrorContext::Sweep, ErrorKind::Internal)),
                    };
                    Box::new(shutdown.sleep(interval).map_err(ectx!(try convert)).map(|is_shutdown| {
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

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use chrono::Utc;
    use tokio::runtime::Runtime;
    use tokio::timer::Delay;

    use super::*;
    use blockchain::shutdown_channel;
    use models::*;
    use services::tests::Fixture;

    #[test]
    fn test_sweeper_cancels_outdated_and_stops_on_shutdown() {
        let fixture = Fixture::new();
        let sender = fixture.wallet("+79110000001", "BTC");
        let outdated = Tx {
            from_wallet_id: sender.id,
            to_phone: Some(Phone::new("+79110000002".to_string())),
            amount: Amount::new(1, 0),
            status_id: fixture.status_id(TxStatusName::Pending),
            created_at: Utc::now().naive_utc() - ChronoDuration::hours(2),
            ..Default::default()
        };
        fixture.txs_repo.insert(outdated.clone());
        let sweeper = Sweeper::new(
            Arc::new(fixture.txs_service()),
            Duration::from_millis(10),
            ChronoDuration::hours(1),
        );

        let mut runtime = Runtime::new().unwrap();
        let (trigger, shutdown) = shutdown_channel();
        runtime.spawn(Delay::new(Instant::now() + Duration::from_millis(100)).then(move |_| -> Result<(), ()> {
            trigger.fire();
            Ok(())
        }));
        let started = Instant::now();
        runtime.block_on(sweeper.run(shutdown)).unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(fixture.txs_repo.status_of(outdated.id), Some(TxStatusName::Cancel));
    }

    #[test]
    fn test_sweeper_does_nothing_after_shutdown() {
        let fixture = Fixture::new();
        let sweeper = Sweeper::new(Arc::new(fixture.txs_service()), Duration::from_secs(3600), ChronoDuration::hours(1));
        let mut runtime = Runtime::new().unwrap();
        let (trigger, shutdown) = shutdown_channel();
        trigger.fire();
        let started = Instant::now();
        runtime.block_on(sweeper.run(shutdown)).unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
    }
}
