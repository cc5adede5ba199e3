use super::error::*;
use super::executor::with_tls_connection;
use super::types::RepoResult;
use models::*;
use prelude::*;
use schema::tx_statuses::dsl::*;

/// Statuses are seeded by migrations, services resolve them by name
pub trait TxStatusesRepo: Send + Sync + 'static {
    fn get(&self, status_id: TxStatusId) -> RepoResult<Option<TxStatus>>;
    fn get_by_name(&self, status_name: TxStatusName) -> RepoResult<Option<TxStatus>>;
}

#[derive(Clone, Default)]
pub struct TxStatusesRepoImpl;

impl TxStatusesRepo for TxStatusesRepoImpl {
    fn get(&self, status_id: TxStatusId) -> RepoResult<Option<TxStatus>> {
        with_tls_connection(|conn| {
            tx_statuses
                .filter(id.eq(status_id))
                .limit(1)
                .get_result(conn)
                .optional()
                .map_err(ectx!(ErrorKind::Internal => status_id))
        })
    }

    fn get_by_name(&self, status_name: TxStatusName) -> RepoResult<Option<TxStatus>> {
        with_tls_connection(|conn| {
            tx_statuses
                .filter(name.eq(status_name))
                .limit(1)
                .get_result(conn)
                .optional()
                .map_err(ectx!(ErrorKind::Internal => status_name))
        })
    }
}
