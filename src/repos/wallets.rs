use diesel;

use super::error::*;
use super::executor::with_tls_connection;
use super::types::RepoResult;
use models::*;
use prelude::*;
use schema::wallets::dsl::*;

pub trait WalletsRepo: Send + Sync + 'static {
    /// Fails with `ErrorKind::Constraints` if the phone already has a wallet for this coin
    fn create(&self, payload: NewWallet) -> RepoResult<Wallet>;
    fn get(&self, wallet_id: WalletId) -> RepoResult<Option<Wallet>>;
    fn get_by_phone(&self, phone: Phone, coin: CoinId) -> RepoResult<Option<Wallet>>;
    fn list_for_phone(&self, phone: Phone) -> RepoResult<Vec<Wallet>>;
}

#[derive(Clone, Default)]
pub struct WalletsRepoImpl;

impl WalletsRepo for WalletsRepoImpl {
    fn create(&self, payload: NewWallet) -> RepoResult<Wallet> {
        with_tls_connection(|conn| {
            diesel::insert_into(wallets)
                .values(payload.clone())
                .get_result::<Wallet>(conn)
                .map_err(move |e| {
                    let kind = ErrorKind::from_diesel(&e);
                    ectx!(err e, kind => payload)
                })
        })
    }

    fn get(&self, wallet_id: WalletId) -> RepoResult<Option<Wallet>> {
        with_tls_connection(|conn| {
            wallets
                .filter(id.eq(wallet_id))
                .limit(1)
                .get_result(conn)
                .optional()
                .map_err(ectx!(ErrorKind::Internal => wallet_id))
        })
    }

    fn get_by_phone(&self, phone: Phone, coin: CoinId) -> RepoResult<Option<Wallet>> {
        with_tls_connection(|conn| {
            wallets
                .filter(user_phone.eq(phone.clone()))
                .filter(coin_id.eq(coin))
                .limit(1)
                .get_result(conn)
                .optional()
                .map_err(ectx!(ErrorKind::Internal => phone, coin))
        })
    }

    fn list_for_phone(&self, phone: Phone) -> RepoResult<Vec<Wallet>> {
        with_tls_connection(|conn| {
            wallets
                .filter(user_phone.eq(phone.clone()))
                .order(created_at)
                .get_results(conn)
                .map_err(ectx!(ErrorKind::Internal => phone))
        })
    }
}
