use diesel;

use super::error::*;
use super::executor::with_tls_connection;
use super::types::RepoResult;
use models::*;
use prelude::*;
use schema::{txs, txs_external, wallets};

pub trait TxsExternalRepo: Send + Sync + 'static {
    fn create(&self, payload: NewTxExternal) -> RepoResult<TxExternal>;
    fn get_by_tx(&self, tx_id: TxId) -> RepoResult<Option<TxExternal>>;
    /// On-chain legs of txs in `status` sent from wallets of `coin`
    fn list_for_coin(&self, coin: CoinId, status: TxStatusId) -> RepoResult<Vec<TxExternal>>;
}

#[derive(Clone, Default)]
pub struct TxsExternalRepoImpl;

impl TxsExternalRepo for TxsExternalRepoImpl {
    fn create(&self, payload: NewTxExternal) -> RepoResult<TxExternal> {
        with_tls_connection(|conn| {
            diesel::insert_into(txs_external::table)
                .values(payload.clone())
                .get_result::<TxExternal>(conn)
                .map_err(move |e| {
                    let kind = ErrorKind::from_diesel(&e);
                    ectx!(err e, kind => payload)
                })
        })
    }

    fn get_by_tx(&self, tx_id: TxId) -> RepoResult<Option<TxExternal>> {
        with_tls_connection(|conn| {
            txs_external::table
                .filter(txs_external::tx_id.eq(tx_id))
                .limit(1)
                .get_result(conn)
                .optional()
                .map_err(ectx!(ErrorKind::Internal => tx_id))
        })
    }

    fn list_for_coin(&self, coin: CoinId, status: TxStatusId) -> RepoResult<Vec<TxExternal>> {
        with_tls_connection(|conn| {
            let coin_wallets = wallets::table.filter(wallets::coin_id.eq(coin)).select(wallets::id);
            txs_external::table
                .inner_join(txs::table)
                .filter(txs::status_id.eq(status))
                .filter(txs::from_wallet_id.eq_any(coin_wallets))
                .select(txs_external::all_columns)
                .order(txs_external::created_at)
                .get_results(conn)
                .map_err(ectx!(ErrorKind::Internal => coin, status))
        })
    }
}
