use super::error::*;
use super::executor::with_tls_connection;
use super::types::RepoResult;
use models::*;
use prelude::*;
use schema::coins::dsl::*;

pub trait CoinsRepo: Send + Sync + 'static {
    fn get(&self, coin_id: CoinId) -> RepoResult<Option<Coin>>;
    fn get_by_symbol(&self, symbol: CoinSymbol) -> RepoResult<Option<Coin>>;
    fn list_enabled(&self) -> RepoResult<Vec<Coin>>;
}

#[derive(Clone, Default)]
pub struct CoinsRepoImpl;

impl CoinsRepo for CoinsRepoImpl {
    fn get(&self, coin_id: CoinId) -> RepoResult<Option<Coin>> {
        with_tls_connection(|conn| {
            coins
                .filter(id.eq(coin_id))
                .limit(1)
                .get_result(conn)
                .optional()
                .map_err(ectx!(ErrorKind::Internal => coin_id))
        })
    }

    fn get_by_symbol(&self, symbol: CoinSymbol) -> RepoResult<Option<Coin>> {
        with_tls_connection(|conn| {
            coins
                .filter(short_name.eq(symbol.clone()))
                .limit(1)
                .get_result(conn)
                .optional()
                .map_err(ectx!(ErrorKind::Internal => symbol))
        })
    }

    fn list_enabled(&self) -> RepoResult<Vec<Coin>> {
        with_tls_connection(|conn| {
            coins
                .filter(enabled.eq(true))
                .order(id)
                .get_results(conn)
                .map_err(ectx!(ErrorKind::Internal))
        })
    }
}
