use std::sync::Arc;

use super::error::*;
use super::{status_id, ServiceFuture};
use blockchain::{Confirmation, Coordinator, Error as BlockchainError};
use client::NotificationsClient;
use models::*;
use prelude::*;
use repos::{CoinsRepo, DbExecutor, Isolation, TxStatusesRepo, TxsExternalRepo, TxsRepo};
use utils::{format_errors, log_error, log_warn};

pub trait ConfirmationsService: Send + Sync + 'static {
    /// Checks every `waiting` tx of the coin against its node and moves the confirmed ones
    /// to `success` in one batch. Returns ids of the txs that were confirmed.
    fn on_new_confirmation(&self, coin: CoinSymbol) -> ServiceFuture<Vec<TxId>>;
}

#[derive(Clone)]
pub struct ConfirmationsServiceImpl<E: DbExecutor> {
    coins_repo: Arc<dyn CoinsRepo>,
    tx_statuses_repo: Arc<dyn TxStatusesRepo>,
    txs_repo: Arc<dyn TxsRepo>,
    txs_external_repo: Arc<dyn TxsExternalRepo>,
    notifications_client: Arc<dyn NotificationsClient>,
    coordinator: Arc<Coordinator>,
    db_executor: E,
}

impl<E: DbExecutor> ConfirmationsServiceImpl<E> {
    pub fn new(
        coins_repo: Arc<dyn CoinsRepo>,
        tx_statuses_repo: Arc<dyn TxStatusesRepo>,
        txs_repo: Arc<dyn TxsRepo>,
        txs_external_repo: Arc<dyn TxsExternalRepo>,
        notifications_client: Arc<dyn NotificationsClient>,
        coordinator: Arc<Coordinator>,
        db_executor: E,
    ) -> Self {
        Self {
            coins_repo,
            tx_statuses_repo,
            txs_repo,
            txs_external_repo,
            notifications_client,
            coordinator,
            db_executor,
        }
    }

    fn list_waiting(&self, coin: CoinSymbol) -> ServiceFuture<Vec<TxExternal>> {
        let coins_repo = self.coins_repo.clone();
        let tx_statuses_repo = self.tx_statuses_repo.clone();
        let txs_external_repo = self.txs_external_repo.clone();
        Box::new(
            self.db_executor
                .execute_transaction_with_isolation(Isolation::RepeatableRead, move || -> Result<Vec<TxExternal>, Error> {
                    let coin_clone = coin.clone();
                    let coin_id = coins_repo
                        .get_by_symbol(coin.clone())
                        .map_err(ectx!(try ErrorKind::Internal => coin_clone))?
                        .ok_or(ectx!(try err ErrorKind::NoSuchCoin, ErrorKind::NoSuchCoin => coin))?
                        .id;
                    let waiting = status_id(&*tx_statuses_repo, TxStatusName::Waiting)?;
                    txs_external_repo
                        .list_for_coin(coin_id, waiting)
                        .map_err(ectx!(try ErrorKind::Internal => coin_id, waiting))
                }),
        )
    }

    fn mark_confirmed(&self, tx_ids: Vec<TxId>) -> ServiceFuture<Vec<Tx>> {
        let tx_statuses_repo = self.tx_statuses_repo.clone();
        let txs_repo = self.txs_repo.clone();
        Box::new(self.db_executor.execute_transaction(move || -> Result<Vec<Tx>, Error> {
            let waiting = status_id(&*tx_statuses_repo, TxStatusName::Waiting)?;
            let success = status_id(&*tx_statuses_repo, TxStatusName::Success)?;
            txs_repo
                .update_statuses(tx_ids.clone(), waiting, success)
                .map_err(ectx!(try ErrorKind::Internal => tx_ids))
        }))
    }

    fn notify_processed(&self, txs: &[Tx]) -> ServiceFuture<()> {
        let sending: Vec<_> = txs
            .iter()
            .map(|tx| {
                let tx_id = tx.id;
                self.notifications_client
                    .processed(TxNotification::new(tx, TxStatusName::Success, &TxViolations::default()))
                    .then(move |res| {
                        if let Err(e) = res {
                            let e: Error = ectx!(err e, ErrorContext::Notification, ErrorKind::Internal => tx_id);
                            log_error(&e);
                        }
                        Ok::<(), Error>(())
                    })
            }).collect();
        Box::new(future::join_all(sending).map(|_| ()))
    }
}

impl<E: DbExecutor> ConfirmationsService for ConfirmationsServiceImpl<E> {
    fn on_new_confirmation(&self, coin: CoinSymbol) -> ServiceFuture<Vec<TxId>> {
        let observer = match self.coordinator.txs_observer(&coin) {
            Ok(observer) => observer,
            Err(e) => return Box::new(future::err(ectx!(try convert err e => coin))),
        };
        let service = self.clone();
        let coin_clone = coin.clone();
        Box::new(
            self.list_waiting(coin.clone())
                .and_then(move |externals| {
                    let checks: Vec<_> = externals
                        .into_iter()
                        .map(|external| {
                            observer
                                .is_confirmed(external.hash.clone())
                                .then(move |res| Ok::<_, Error>((external, res)))
                        }).collect();
                    future::join_all(checks)
                }).and_then(move |results: Vec<(TxExternal, Result<Confirmation, BlockchainError>)>| -> Result<Vec<TxId>, Error> {
                    if results.is_empty() {
                        return Ok(Vec::new());
                    }
                    let total = results.len();
                    let mut errors = Vec::new();
                    let mut confirmed = Vec::new();
                    for (external, res) in results {
                        match res {
                            Ok(Confirmation { confirmed: true, .. }) => confirmed.push(external.tx_id),
                            Ok(Confirmation { abandoned: true, .. }) => {
                                warn!("Tx {} with hash {} was abandoned by the {} node", external.tx_id, external.hash, coin)
                            }
                            Ok(_) => (),
                            Err(e) => errors.push(e),
                        }
                    }
                    if errors.len() == total {
                        let messages = format_errors(errors.iter());
                        return Err(ectx!(err ErrorContext::AllConfirmationsFailed(messages), ErrorKind::Internal => coin));
                    }
                    if !errors.is_empty() {
                        let messages = format_errors(errors.iter());
                        let e: Error = ectx!(err ErrorContext::PartialConfirmations(messages), ErrorKind::Internal => coin);
                        log_warn(&e);
                    }
                    Ok(confirmed)
                }).and_then(move |confirmed: Vec<TxId>| -> ServiceFuture<Vec<TxId>> {
                    if confirmed.is_empty() {
                        return Box::new(future::ok(Vec::new()));
                    }
                    let notifier = service.clone();
                    Box::new(service.mark_confirmed(confirmed).and_then(move |txs| {
                        info!("Confirmed {} txs of {}", txs.len(), coin_clone);
                        let tx_ids: Vec<TxId> = txs.iter().map(|tx| tx.id).collect();
                        notifier.notify_processed(&txs).map(move |_| tx_ids)
                    }))
                }),
        )
    }
}

#[cfg(test)]
mod tests {
    use tokio_core::reactor::Core;

    use super::*;
    use services::tests::Fixture;

    fn waiting_tx(fixture: &Fixture, sender: &Wallet, hash: &str) -> Tx {
        let to_address = BlockchainAddress::new("1BoatSLRHtKNngkdXEeobR76b53LETtpyT".to_string());
        let tx = Tx {
            from_wallet_id: sender.id,
            to_address: Some(to_address.clone()),
            amount: Amount::new(1, 0),
            tx_type: TxKind::External,
            status_id: fixture.status_id(TxStatusName::Waiting),
            ..Default::default()
        };
        fixture.txs_repo.insert(tx.clone());
        fixture
            .txs_external_repo
            .create(NewTxExternal {
                tx_id: tx.id,
                hash: TxHash::new(hash.to_string()),
                to_address,
                fee: Amount::zero(),
            }).unwrap();
        tx
    }

    fn confirmed() -> Confirmation {
        Confirmation {
            confirmed: true,
            abandoned: false,
        }
    }

    #[test]
    fn test_confirmed_txs_succeed() {
        let mut core = Core::new().unwrap();
        let fixture = Fixture::new();
        let sender = fixture.wallet("+79110000001", "BTC");
        let first = waiting_tx(&fixture, &sender, "hash-1");
        let second = waiting_tx(&fixture, &sender, "hash-2");
        let abandoned = waiting_tx(&fixture, &sender, "hash-3");
        fixture.chain.set_confirmation(TxHash::new("hash-1".to_string()), confirmed());
        fixture.chain.set_confirmation(TxHash::new("hash-2".to_string()), Confirmation::default());
        fixture.chain.set_confirmation(
            TxHash::new("hash-3".to_string()),
            Confirmation {
                confirmed: false,
                abandoned: true,
            },
        );
        let service = fixture.confirmations_service();

        let tx_ids = core.run(service.on_new_confirmation(CoinSymbol::new("BTC"))).unwrap();
        assert_eq!(tx_ids, vec![first.id]);
        assert_eq!(fixture.txs_repo.status_of(first.id), Some(TxStatusName::Success));
        assert_eq!(fixture.txs_repo.status_of(second.id), Some(TxStatusName::Waiting));
        assert_eq!(fixture.txs_repo.status_of(abandoned.id), Some(TxStatusName::Waiting));
        assert_eq!(fixture.notifications_client.sent_kinds(), vec![NotificationKind::Processed]);

        // nothing new is confirmed on the next block
        let tx_ids = core.run(service.on_new_confirmation(CoinSymbol::new("BTC"))).unwrap();
        assert!(tx_ids.is_empty());
    }

    #[test]
    fn test_partial_failures_are_tolerated() {
        let mut core = Core::new().unwrap();
        let fixture = Fixture::new();
        let sender = fixture.wallet("+79110000001", "BTC");
        let first = waiting_tx(&fixture, &sender, "hash-1");
        let second = waiting_tx(&fixture, &sender, "hash-2");
        fixture.chain.set_confirmation(TxHash::new("hash-1".to_string()), confirmed());
        fixture.chain.break_confirmation(TxHash::new("hash-2".to_string()));
        let service = fixture.confirmations_service();

        let tx_ids = core.run(service.on_new_confirmation(CoinSymbol::new("BTC"))).unwrap();
        assert_eq!(tx_ids, vec![first.id]);
        assert_eq!(fixture.txs_repo.status_of(second.id), Some(TxStatusName::Waiting));
    }

    #[test]
    fn test_all_failures_change_nothing() {
        let mut core = Core::new().unwrap();
        let fixture = Fixture::new();
        let sender = fixture.wallet("+79110000001", "BTC");
        let first = waiting_tx(&fixture, &sender, "hash-1");
        let second = waiting_tx(&fixture, &sender, "hash-2");
        fixture.chain.break_confirmation(TxHash::new("hash-1".to_string()));
        fixture.chain.break_confirmation(TxHash::new("hash-2".to_string()));
        let service = fixture.confirmations_service();

        let err = core.run(service.on_new_confirmation(CoinSymbol::new("BTC"))).unwrap_err();
        match err.kind() {
            ErrorKind::Internal => (),
            kind => panic!("unexpected error kind {:?}", kind),
        }
        assert_eq!(fixture.txs_repo.status_of(first.id), Some(TxStatusName::Waiting));
        assert_eq!(fixture.txs_repo.status_of(second.id), Some(TxStatusName::Waiting));
        assert!(fixture.notifications_client.sent().is_empty());
    }

    #[test]
    fn test_other_coins_are_not_checked() {
        let mut core = Core::new().unwrap();
        let fixture = Fixture::new();
        let sender = fixture.wallet("+79110000001", "LTC");
        let tx = waiting_tx(&fixture, &sender, "hash-1");
        fixture.chain.set_confirmation(TxHash::new("hash-1".to_string()), confirmed());
        let service = fixture.confirmations_service();

        let tx_ids = core.run(service.on_new_confirmation(CoinSymbol::new("BTC"))).unwrap();
        assert!(tx_ids.is_empty());
        assert_eq!(fixture.txs_repo.status_of(tx.id), Some(TxStatusName::Waiting));
    }

    #[test]
    fn test_undialed_coin() {
        let mut core = Core::new().unwrap();
        let fixture = Fixture::new();
        let service = fixture.confirmations_service();
        let err = core.run(service.on_new_confirmation(CoinSymbol::new("ETH"))).unwrap_err();
        match err.kind() {
            ErrorKind::NoSuchCoin => (),
            kind => panic!("unexpected error kind {:?}", kind),
        }
    }
}
