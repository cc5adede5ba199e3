use chrono::NaiveDateTime;
use diesel;
use diesel::dsl::now;
use diesel::sql_types::{Bool, Nullable, Numeric, Uuid as SqlUuid};

use super::error::*;
use super::executor::with_tls_connection;
use super::types::RepoResult;
use models::*;
use prelude::*;
use schema::{tx_statuses, txs, wallets};

/// Txs of a wallet that still count towards its balance: everything except cancelled and
/// declined ones, incoming internal minus every outgoing one. With `$3` false confirmed
/// external sends are left out, for chains where they are already off the address balance.
const WALLET_NET_SUM_QUERY: &str = "
    SELECT
        COALESCE(SUM(CASE WHEN txs.to_wallet_id = $1 THEN txs.amount ELSE 0 END), 0)
        - COALESCE(SUM(CASE WHEN txs.from_wallet_id = $1 THEN txs.amount ELSE 0 END), 0) AS net
    FROM txs
    JOIN tx_statuses ON tx_statuses.id = txs.status_id
    WHERE (txs.from_wallet_id = $1 OR txs.to_wallet_id = $1)
        AND ($2::uuid IS NULL OR txs.id <> $2)
        AND tx_statuses.name NOT IN ('cancel', 'decline')
        AND (txs.tx_type = 'internal' OR $3::boolean OR tx_statuses.name <> 'success')
";

#[derive(QueryableByName)]
struct NetSum {
    #[sql_type = "Nullable<Numeric>"]
    net: Option<Amount>,
}

pub trait TxsRepo: Send + Sync + 'static {
    fn create(&self, payload: NewTx) -> RepoResult<Tx>;
    fn get(&self, tx_id: TxId) -> RepoResult<Option<Tx>>;
    fn get_with_status(&self, tx_id: TxId) -> RepoResult<Option<(Tx, TxStatus)>>;
    /// Moves tx from one status to another. `None` if the tx is not in `from` status anymore.
    fn update_status(&self, tx_id: TxId, from: TxStatusId, to: TxStatusId) -> RepoResult<Option<Tx>>;
    /// Batch version of `update_status`, returns only the txs that were actually updated
    fn update_statuses(&self, tx_ids: Vec<TxId>, from: TxStatusId, to: TxStatusId) -> RepoResult<Vec<Tx>>;
    /// Txs to `phone` in `status` whose sender wallet holds `coin`
    fn list_for_phone(&self, phone: Phone, coin: CoinId, status: TxStatusId) -> RepoResult<Vec<Tx>>;
    /// Replaces phone destination with the wallet and moves the tx to `to` status
    fn attach_recipient(&self, tx_id: TxId, wallet_id: WalletId, from: TxStatusId, to: TxStatusId) -> RepoResult<Option<Tx>>;
    fn list_older_than(&self, status: TxStatusId, created_before: NaiveDateTime) -> RepoResult<Vec<Tx>>;
    /// Net sum of the wallet txs, optionally ignoring one tx.
    /// Confirmed external sends count only with `count_confirmed_external`.
    fn wallet_net_sum(&self, wallet_id: WalletId, exclude: Option<TxId>, count_confirmed_external: bool) -> RepoResult<Amount>;
}

#[derive(Clone, Default)]
pub struct TxsRepoImpl;

impl TxsRepo for TxsRepoImpl {
    fn create(&self, payload: NewTx) -> RepoResult<Tx> {
        with_tls_connection(|conn| {
            diesel::insert_into(txs::table)
                .values(payload.clone())
                .get_result::<Tx>(conn)
                .map_err(move |e| {
                    let kind = ErrorKind::from_diesel(&e);
                    ectx!(err e, kind => payload)
                })
        })
    }

    fn get(&self, tx_id: TxId) -> RepoResult<Option<Tx>> {
        with_tls_connection(|conn| {
            txs::table
                .filter(txs::id.eq(tx_id))
                .limit(1)
                .get_result(conn)
                .optional()
                .map_err(ectx!(ErrorKind::Internal => tx_id))
        })
    }

    fn get_with_status(&self, tx_id: TxId) -> RepoResult<Option<(Tx, TxStatus)>> {
        with_tls_connection(|conn| {
            txs::table
                .inner_join(tx_statuses::table)
                .filter(txs::id.eq(tx_id))
                .limit(1)
                .get_result(conn)
                .optional()
                .map_err(ectx!(ErrorKind::Internal => tx_id))
        })
    }

    fn update_status(&self, tx_id: TxId, from: TxStatusId, to: TxStatusId) -> RepoResult<Option<Tx>> {
        with_tls_connection(|conn| {
            let filtered = txs::table.filter(txs::id.eq(tx_id)).filter(txs::status_id.eq(from));
            diesel::update(filtered)
                .set((txs::status_id.eq(to), txs::updated_at.eq(now)))
                .get_result(conn)
                .optional()
                .map_err(ectx!(ErrorKind::Internal => tx_id, from, to))
        })
    }

    fn update_statuses(&self, tx_ids: Vec<TxId>, from: TxStatusId, to: TxStatusId) -> RepoResult<Vec<Tx>> {
        with_tls_connection(|conn| {
            let filtered = txs::table
                .filter(txs::id.eq_any(tx_ids.clone()))
                .filter(txs::status_id.eq(from));
            diesel::update(filtered)
                .set((txs::status_id.eq(to), txs::updated_at.eq(now)))
                .get_results(conn)
                .map_err(ectx!(ErrorKind::Internal => tx_ids, from, to))
        })
    }

    fn list_for_phone(&self, phone: Phone, coin: CoinId, status: TxStatusId) -> RepoResult<Vec<Tx>> {
        with_tls_connection(|conn| {
            let coin_wallets = wallets::table.filter(wallets::coin_id.eq(coin)).select(wallets::id);
            txs::table
                .filter(txs::to_phone.eq(phone.clone()))
                .filter(txs::status_id.eq(status))
                .filter(txs::from_wallet_id.eq_any(coin_wallets))
                .order(txs::created_at)
                .get_results(conn)
                .map_err(ectx!(ErrorKind::Internal => phone, coin, status))
        })
    }

    fn attach_recipient(&self, tx_id: TxId, wallet_id: WalletId, from: TxStatusId, to: TxStatusId) -> RepoResult<Option<Tx>> {
        with_tls_connection(|conn| {
            let filtered = txs::table.filter(txs::id.eq(tx_id)).filter(txs::status_id.eq(from));
            diesel::update(filtered)
                .set((
                    txs::to_wallet_id.eq(Some(wallet_id)),
                    txs::to_phone.eq(None::<Phone>),
                    txs::status_id.eq(to),
                    txs::updated_at.eq(now),
                )).get_result(conn)
                .optional()
                .map_err(ectx!(ErrorKind::Internal => tx_id, wallet_id, from, to))
        })
    }

    fn list_older_than(&self, status: TxStatusId, created_before: NaiveDateTime) -> RepoResult<Vec<Tx>> {
        with_tls_connection(|conn| {
            txs::table
                .filter(txs::status_id.eq(status))
                .filter(txs::created_at.lt(created_before))
                .order(txs::created_at)
                .get_results(conn)
                .map_err(ectx!(ErrorKind::Internal => status, created_before))
        })
    }

    fn wallet_net_sum(&self, wallet_id: WalletId, exclude: Option<TxId>, count_confirmed_external: bool) -> RepoResult<Amount> {
        with_tls_connection(|conn| {
            diesel::sql_query(WALLET_NET_SUM_QUERY)
                .bind::<SqlUuid, _>(wallet_id)
                .bind::<Nullable<SqlUuid>, _>(exclude)
                .bind::<Bool, _>(count_confirmed_external)
                .get_result::<NetSum>(conn)
                .map(|sum| sum.net.unwrap_or_default())
                .map_err(ectx!(ErrorKind::Internal => wallet_id, exclude, count_confirmed_external))
        })
    }
}
