use std::sync::Arc;

use chrono::{Duration, Utc};
use futures::stream;

use super::balances::BalancesService;
use super::error::*;
use super::{status_id, ServiceFuture};
use blockchain::{Coordinator, ErrorKind as BlockchainErrorKind, SentTx};
use client::NotificationsClient;
use models::*;
use prelude::*;
use repos::{CoinsRepo, DbExecutor, TxStatusesRepo, TxsExternalRepo, TxsRepo, WalletsRepo};
use utils::log_error;

pub const ZERO_AMOUNT: &str = "zero_amount";
pub const NEGATIVE_AMOUNT: &str = "negative_amount";
pub const NO_SOURCE_WALLET: &str = "no_source_wallet";
pub const NO_DESTINATION: &str = "no_destination";
pub const AMBIGUOUS_DESTINATION: &str = "ambiguous_destination";
pub const COIN_MISMATCH: &str = "coin_mismatch";
pub const AMOUNT_TOO_BIG: &str = "amount_too_big";
pub const INSUFFICIENT_FUNDS: &str = "insufficient_funds";
pub const INVALID_WALLET_BALANCE: &str = "invalid_wallet_balance";
pub const ADDRESS_INVALID: &str = "address_invalid";

pub trait TxsService: Send + Sync + 'static {
    fn send_internal(&self, input: SendInternal) -> ServiceFuture<StepReport>;
    fn send_external(&self, input: SendExternal) -> ServiceFuture<StepReport>;
    /// Moves the tx through its states until it reaches one that has no automatic step.
    /// A declined tx is an `Ok` report with violations, `Err` is left for infrastructure failures.
    fn step_tx(&self, tx_id: TxId) -> ServiceFuture<StepReport>;
    /// Hands over `pending` txs addressed to the phone of a freshly created wallet
    fn on_recipient_created(&self, wallet: Wallet) -> ServiceFuture<Vec<StepReport>>;
    fn cancel_outdated_pending(&self, max_age: Duration) -> ServiceFuture<Vec<Tx>>;
}

#[derive(Clone)]
pub struct TxsServiceImpl<E: DbExecutor> {
    coins_repo: Arc<dyn CoinsRepo>,
    tx_statuses_repo: Arc<dyn TxStatusesRepo>,
    txs_repo: Arc<dyn TxsRepo>,
    txs_external_repo: Arc<dyn TxsExternalRepo>,
    wallets_repo: Arc<dyn WalletsRepo>,
    balances_service: Arc<dyn BalancesService>,
    notifications_client: Arc<dyn NotificationsClient>,
    coordinator: Arc<Coordinator>,
    db_executor: E,
}

/// Db state a tx is validated against
#[derive(Debug, Clone)]
struct TxContext {
    source: Option<(Wallet, Coin)>,
    /// Wallet behind `to_wallet_id`, or the wallet the `to_phone` user has for the source coin
    destination: Option<Wallet>,
}

enum Transition {
    Status,
    AttachRecipient(WalletId),
    Sent(SentTx, BlockchainAddress),
}

impl<E: DbExecutor> TxsServiceImpl<E> {
    pub fn new(
        coins_repo: Arc<dyn CoinsRepo>,
        tx_statuses_repo: Arc<dyn TxStatusesRepo>,
        txs_repo: Arc<dyn TxsRepo>,
        txs_external_repo: Arc<dyn TxsExternalRepo>,
        wallets_repo: Arc<dyn WalletsRepo>,
        balances_service: Arc<dyn BalancesService>,
        notifications_client: Arc<dyn NotificationsClient>,
        coordinator: Arc<Coordinator>,
        db_executor: E,
    ) -> Self {
        Self {
            coins_repo,
            tx_statuses_repo,
            txs_repo,
            txs_external_repo,
            wallets_repo,
            balances_service,
            notifications_client,
            coordinator,
            db_executor,
        }
    }

    fn create_and_step(&self, payload: NewTx) -> ServiceFuture<StepReport> {
        if let Err(e) = check_amount(&payload.amount) {
            return Box::new(future::err(e));
        }
        let wallets_repo = self.wallets_repo.clone();
        let tx_statuses_repo = self.tx_statuses_repo.clone();
        let txs_repo = self.txs_repo.clone();
        let service = self.clone();
        Box::new(
            self.db_executor
                .execute_transaction(move || {
                    let from_wallet_id = payload.from_wallet_id;
                    wallets_repo
                        .get(from_wallet_id)
                        .map_err(ectx!(try ErrorKind::Internal => from_wallet_id))?
                        .ok_or(ectx!(try err ErrorKind::NoSuchWallet, ErrorKind::NoSuchWallet => from_wallet_id))?;
                    let status_id = status_id(&*tx_statuses_repo, TxStatusName::Validation)?;
                    let payload = NewTx { status_id, ..payload };
                    txs_repo.create(payload.clone()).map_err(ectx!(try ErrorKind::Internal => payload))
                }).and_then(move |tx| {
                    debug!("Created tx {} of {} from wallet {}", tx.id, tx.amount, tx.from_wallet_id);
                    service.step_tx(tx.id)
                }),
        )
    }

    fn load(&self, tx_id: TxId) -> ServiceFuture<(Tx, TxStatus)> {
        let txs_repo = self.txs_repo.clone();
        Box::new(self.db_executor.execute(move || {
            txs_repo
                .get_with_status(tx_id)
                .map_err(ectx!(try ErrorKind::Internal => tx_id))?
                .ok_or(ectx!(try err ErrorKind::NoSuchTx, ErrorKind::NoSuchTx => tx_id))
        }))
    }

    fn load_context(&self, tx: &Tx) -> ServiceFuture<TxContext> {
        let wallets_repo = self.wallets_repo.clone();
        let coins_repo = self.coins_repo.clone();
        let from_wallet_id = tx.from_wallet_id;
        let to_wallet_id = tx.to_wallet_id;
        let to_phone = tx.to_phone.clone();
        Box::new(self.db_executor.execute(move || -> Result<TxContext, Error> {
            let source = match wallets_repo
                .get(from_wallet_id)
                .map_err(ectx!(try ErrorKind::Internal => from_wallet_id))?
            {
                Some(wallet) => {
                    let coin_id = wallet.coin_id;
                    let coin = coins_repo
                        .get(coin_id)
                        .map_err(ectx!(try ErrorKind::Internal => coin_id))?
                        .ok_or(ectx!(try err ErrorKind::NoSuchCoin, ErrorKind::NoSuchCoin => coin_id))?;
                    Some((wallet, coin))
                }
                None => None,
            };
            let destination = match (to_wallet_id, to_phone, &source) {
                (Some(to_wallet_id), _, _) => wallets_repo
                    .get(to_wallet_id)
                    .map_err(ectx!(try ErrorKind::Internal => to_wallet_id))?,
                (None, Some(to_phone), Some((_, coin))) => {
                    let coin_id = coin.id;
                    wallets_repo
                        .get_by_phone(to_phone.clone(), coin_id)
                        .map_err(ectx!(try ErrorKind::Internal => to_phone, coin_id))?
                }
                _ => None,
            };
            Ok(TxContext { source, destination })
        }))
    }

    fn validate(&self, tx: Tx, status: TxStatus) -> ServiceFuture<TxViolations> {
        let service = self.clone();
        let checks_service = self.clone();
        let checked_tx = tx.clone();
        let checks = self.load_context(&tx).and_then(move |context| {
            let mut violations = destination_violations(&checked_tx, &context);
            let balances: ServiceFuture<TxViolations> = match context.source.clone() {
                Some((wallet, coin)) => checks_service.check_balances(&checked_tx, wallet, coin.short_name),
                None => Box::new(future::ok(TxViolations::default())),
            };
            balances.map(move |balance_violations| {
                violations.extend(balance_violations);
                (violations, context)
            })
        });
        Box::new(checks.then(move |res| -> ServiceFuture<TxViolations> {
            match res {
                Ok((violations, context)) => {
                    if violations.is_empty() {
                        service.route(tx, status, context)
                    } else {
                        service.transition(tx, status.id, TxStatusName::Decline, Transition::Status, violations)
                    }
                }
                Err(e) => service.release(tx.id, status.id, e),
            }
        }))
    }

    fn check_balances(&self, tx: &Tx, wallet: Wallet, coin: CoinSymbol) -> ServiceFuture<TxViolations> {
        let amount = tx.amount.clone();
        Box::new(
            self.balances_service
                .account_balance(coin.clone())
                .join(self.balances_service.total_wallet_balance(wallet, coin, Some(tx.id)))
                .map(move |(node_balance, wallet_balance)| balance_violations(&amount, &wallet_balance, &node_balance)),
        )
    }

    /// Picks the next status of a valid tx
    fn route(&self, tx: Tx, status: TxStatus, context: TxContext) -> ServiceFuture<TxViolations> {
        let no_violations = TxViolations::default();
        match tx.tx_type {
            TxKind::Internal => match (tx.to_wallet_id, context.destination) {
                (Some(_), _) => self.transition(tx, status.id, TxStatusName::Success, Transition::Status, no_violations),
                (None, Some(recipient)) => self.transition(
                    tx,
                    status.id,
                    TxStatusName::Success,
                    Transition::AttachRecipient(recipient.id),
                    no_violations,
                ),
                (None, None) => self.transition(tx, status.id, TxStatusName::Pending, Transition::Status, no_violations),
            },
            TxKind::External => {
                let tx_id = tx.id;
                match (context.source, tx.to_address.clone()) {
                    (Some((wallet, coin)), Some(to_address)) => self.send(tx, status, wallet, coin, to_address),
                    (_, to_address) => self.release(
                        tx_id,
                        status.id,
                        ectx!(try err ErrorKind::Internal, ErrorKind::Internal => tx_id, to_address),
                    ),
                }
            }
        }
    }

    fn send(&self, tx: Tx, status: TxStatus, wallet: Wallet, coin: Coin, to_address: BlockchainAddress) -> ServiceFuture<TxViolations> {
        let tx_id = tx.id;
        let sender = match self.coordinator.tx_sender(&coin.short_name) {
            Ok(sender) => sender,
            Err(e) => return self.release(tx_id, status.id, ectx!(try convert err e => tx_id, coin.short_name)),
        };
        let service = self.clone();
        Box::new(
            sender
                .send(wallet.address.clone(), to_address.clone(), tx.amount.clone())
                .then(move |res| -> ServiceFuture<TxViolations> {
                    match res {
                        Ok(sent) => {
                            info!("Tx {} was sent on-chain to {} with hash {}", tx_id, to_address, sent.hash);
                            service.transition(
                                tx,
                                status.id,
                                TxStatusName::Waiting,
                                Transition::Sent(sent, to_address),
                                TxViolations::default(),
                            )
                        }
                        Err(ref e) if e.kind() == BlockchainErrorKind::AddressInvalid => {
                            let mut violations = TxViolations::default();
                            violations.add("to_address", ADDRESS_INVALID, format!("Node rejected address {}", to_address));
                            service.transition(tx, status.id, TxStatusName::Decline, Transition::Status, violations)
                        }
                        Err(e) => service.release(tx_id, status.id, ectx!(try convert err e => tx_id, to_address)),
                    }
                }),
        )
    }

    /// Cancels a tx that failed before reaching the chain, so that it stops holding its amount.
    /// Always resolves to `e`.
    fn release(&self, tx_id: TxId, from: TxStatusId, e: Error) -> ServiceFuture<TxViolations> {
        let tx_statuses_repo = self.tx_statuses_repo.clone();
        let txs_repo = self.txs_repo.clone();
        Box::new(
            self.db_executor
                .execute_transaction(move || -> Result<Option<Tx>, Error> {
                    let cancel = status_id(&*tx_statuses_repo, TxStatusName::Cancel)?;
                    txs_repo
                        .update_status(tx_id, from, cancel)
                        .map_err(ectx!(try ErrorKind::Internal => tx_id, from))
                }).then(move |res| -> Result<TxViolations, Error> {
                    match res {
                        Ok(Some(_)) => warn!("Tx {} cancelled after failed step: {}", tx_id, e),
                        Ok(None) => (),
                        Err(release_error) => log_error(&release_error),
                    };
                    Err(e)
                }),
        )
    }

    /// Persists the status change, then notifies about it
    fn transition(
        &self,
        tx: Tx,
        from: TxStatusId,
        to: TxStatusName,
        transition: Transition,
        violations: TxViolations,
    ) -> ServiceFuture<TxViolations> {
        let tx_statuses_repo = self.tx_statuses_repo.clone();
        let txs_repo = self.txs_repo.clone();
        let txs_external_repo = self.txs_external_repo.clone();
        let service = self.clone();
        let tx_id = tx.id;
        Box::new(
            self.db_executor
                .execute_transaction(move || -> Result<Tx, Error> {
                    let to_id = status_id(&*tx_statuses_repo, to)?;
                    let updated = match transition {
                        Transition::AttachRecipient(wallet_id) => txs_repo.attach_recipient(tx_id, wallet_id, from, to_id),
                        Transition::Status | Transition::Sent(..) => txs_repo.update_status(tx_id, from, to_id),
                    }.map_err(ectx!(try ErrorKind::Internal => tx_id, to))?
                    .ok_or(ectx!(try err ErrorContext::StatusChanged, ErrorKind::Internal => tx_id, from, to))?;
                    if let Transition::Sent(sent, to_address) = transition {
                        let payload = NewTxExternal {
                            tx_id,
                            hash: sent.hash,
                            to_address,
                            fee: sent.fee,
                        };
                        txs_external_repo
                            .create(payload.clone())
                            .map_err(ectx!(try ErrorKind::Internal => payload))?;
                    }
                    Ok(updated)
                }).and_then(move |updated| {
                    debug!("Tx {} moved to {}", updated.id, to);
                    service.notify(&updated, to, &violations).map(move |_| violations)
                }),
        )
    }

    /// Never fails, notification errors are only logged
    fn notify(&self, tx: &Tx, status: TxStatusName, violations: &TxViolations) -> ServiceFuture<()> {
        let payload = TxNotification::new(tx, status, violations);
        let sending = match status {
            TxStatusName::Success => self.notifications_client.processed(payload),
            TxStatusName::Decline => self.notifications_client.declined(payload),
            TxStatusName::Pending => self.notifications_client.await_recipient(payload),
            _ => return Box::new(future::ok(())),
        };
        let tx_id = tx.id;
        Box::new(sending.then(move |res| {
            if let Err(e) = res {
                let e: Error = ectx!(err e, ErrorContext::Notification, ErrorKind::Internal => tx_id, status);
                log_error(&e);
            }
            Ok(())
        }))
    }
}

impl<E: DbExecutor> TxsService for TxsServiceImpl<E> {
    fn send_internal(&self, input: SendInternal) -> ServiceFuture<StepReport> {
        let (to_wallet_id, to_phone) = match input.to {
            Recipient::Wallet(wallet_id) => (Some(wallet_id), None),
            Recipient::Phone(phone) => (None, Some(phone)),
        };
        self.create_and_step(NewTx {
            id: TxId::generate(),
            from_wallet_id: input.from_wallet_id,
            to_wallet_id,
            to_phone,
            to_address: None,
            amount: input.amount,
            tx_type: TxKind::Internal,
            status_id: TxStatusId::default(),
        })
    }

    fn send_external(&self, input: SendExternal) -> ServiceFuture<StepReport> {
        self.create_and_step(NewTx {
            id: TxId::generate(),
            from_wallet_id: input.from_wallet_id,
            to_wallet_id: None,
            to_phone: None,
            to_address: Some(input.to_address),
            amount: input.amount,
            tx_type: TxKind::External,
            status_id: TxStatusId::default(),
        })
    }

    fn step_tx(&self, tx_id: TxId) -> ServiceFuture<StepReport> {
        let service = self.clone();
        Box::new(future::loop_fn(TxViolations::default(), move |mut violations| {
            let service = service.clone();
            service
                .load(tx_id)
                .and_then(move |(tx, status)| -> ServiceFuture<Loop<StepReport, TxViolations>> {
                    match status.name {
                        TxStatusName::Validation => Box::new(service.validate(tx, status).map(move |step_violations| {
                            violations.extend(step_violations);
                            Loop::Continue(violations)
                        })),
                        name => Box::new(future::ok(Loop::Break(StepReport {
                            tx,
                            status: name,
                            violations,
                        }))),
                    }
                })
        }))
    }

    fn on_recipient_created(&self, wallet: Wallet) -> ServiceFuture<Vec<StepReport>> {
        let tx_statuses_repo = self.tx_statuses_repo.clone();
        let txs_repo = self.txs_repo.clone();
        let service = self.clone();
        Box::new(
            self.db_executor
                .execute_transaction(move || -> Result<Vec<TxId>, Error> {
                    let pending = status_id(&*tx_statuses_repo, TxStatusName::Pending)?;
                    let validation = status_id(&*tx_statuses_repo, TxStatusName::Validation)?;
                    let phone = wallet.user_phone.clone();
                    let coin_id = wallet.coin_id;
                    let txs = txs_repo
                        .list_for_phone(phone.clone(), coin_id, pending)
                        .map_err(ectx!(try ErrorKind::Internal => phone, coin_id))?;
                    let mut attached = Vec::new();
                    for tx in txs {
                        let tx_id = tx.id;
                        let wallet_id = wallet.id;
                        if let Some(tx) = txs_repo
                            .attach_recipient(tx_id, wallet_id, pending, validation)
                            .map_err(ectx!(try ErrorKind::Internal => tx_id, wallet_id))?
                        {
                            attached.push(tx.id);
                        }
                    }
                    Ok(attached)
                }).and_then(move |tx_ids| {
                    if !tx_ids.is_empty() {
                        info!("Validating {} pending txs of a new recipient", tx_ids.len());
                    }
                    stream::iter_ok::<_, Error>(tx_ids)
                        .and_then(move |tx_id| service.step_tx(tx_id))
                        .collect()
                }),
        )
    }

    fn cancel_outdated_pending(&self, max_age: Duration) -> ServiceFuture<Vec<Tx>> {
        let tx_statuses_repo = self.tx_statuses_repo.clone();
        let txs_repo = self.txs_repo.clone();
        Box::new(self.db_executor.execute_transaction(move || -> Result<Vec<Tx>, Error> {
            let pending = status_id(&*tx_statuses_repo, TxStatusName::Pending)?;
            let cancel = status_id(&*tx_statuses_repo, TxStatusName::Cancel)?;
            let created_before = Utc::now().naive_utc() - max_age;
            let tx_ids: Vec<TxId> = txs_repo
                .list_older_than(pending, created_before)
                .map_err(ectx!(try ErrorKind::Internal => created_before))?
                .into_iter()
                .map(|tx| tx.id)
                .collect();
            if tx_ids.is_empty() {
                return Ok(Vec::new());
            }
            let cancelled = txs_repo
                .update_statuses(tx_ids.clone(), pending, cancel)
                .map_err(ectx!(try ErrorKind::Internal => tx_ids))?;
            info!("Cancelled {} pending txs created before {}", cancelled.len(), created_before);
            Ok(cancelled)
        }))
    }
}

/// Zero and negative amounts never make it into the db
fn check_amount(amount: &Amount) -> Result<(), Error> {
    let mut violations = TxViolations::default();
    let context = if amount.is_zero() {
        violations.add("amount", ZERO_AMOUNT, "Amount must not be zero".to_string());
        ErrorContext::ZeroAmount
    } else if amount.is_negative() {
        violations.add("amount", NEGATIVE_AMOUNT, format!("Amount {} is negative", amount));
        ErrorContext::NegativeAmount
    } else {
        return Ok(());
    };
    let errors = violations.to_validation_errors();
    Err(ectx!(err context, ErrorKind::InvalidInput(errors) => amount))
}

fn destination_violations(tx: &Tx, context: &TxContext) -> TxViolations {
    let mut violations = TxViolations::default();
    if tx.amount.is_zero() {
        violations.add("amount", ZERO_AMOUNT, "Amount must not be zero".to_string());
    } else if tx.amount.is_negative() {
        violations.add("amount", NEGATIVE_AMOUNT, format!("Amount {} is negative", tx.amount));
    }
    if context.source.is_none() {
        violations.add("from_wallet_id", NO_SOURCE_WALLET, format!("Wallet {} does not exist", tx.from_wallet_id));
    }
    match tx.destinations_count() {
        0 => violations.add("to", NO_DESTINATION, "Tx has no destination".to_string()),
        1 => {
            let fits_kind = match tx.tx_type {
                TxKind::Internal => tx.to_address.is_none(),
                TxKind::External => tx.to_address.is_some(),
            };
            if !fits_kind {
                violations.add("to", NO_DESTINATION, format!("Tx of kind {:?} has no matching destination", tx.tx_type));
            } else if let Some(to_wallet_id) = tx.to_wallet_id {
                match (&context.destination, &context.source) {
                    (None, _) => violations.add("to_wallet_id", NO_DESTINATION, format!("Wallet {} does not exist", to_wallet_id)),
                    (Some(destination), Some((source, _))) if destination.coin_id != source.coin_id => violations.add(
                        "to_wallet_id",
                        COIN_MISMATCH,
                        format!("Wallet {} holds another coin", to_wallet_id),
                    ),
                    _ => (),
                }
            }
        }
        _ => violations.add("to", AMBIGUOUS_DESTINATION, "Tx has more than one destination".to_string()),
    }
    violations
}

/// Every rule is checked, so that a decline lists all of the reasons
fn balance_violations(amount: &Amount, wallet_balance: &Amount, node_balance: &Amount) -> TxViolations {
    let mut violations = TxViolations::default();
    if amount > node_balance {
        violations.add(
            "amount",
            AMOUNT_TOO_BIG,
            format!("Amount {} is more than the node holds ({})", amount, node_balance),
        );
    }
    if amount > wallet_balance {
        violations.add(
            "amount",
            INSUFFICIENT_FUNDS,
            format!("Amount {} is more than the wallet balance {}", amount, wallet_balance),
        );
    }
    if wallet_balance > node_balance {
        violations.add(
            "from_wallet_id",
            INVALID_WALLET_BALANCE,
            format!("Wallet balance {} is more than the node holds ({})", wallet_balance, node_balance),
        );
    }
    violations
}
