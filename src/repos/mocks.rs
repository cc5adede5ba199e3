use std::sync::{Arc, Mutex};

use chrono::{NaiveDateTime, Utc};
use validator::{ValidationError, ValidationErrors};

use super::coins::*;
use super::error::*;
use super::executor::{DbExecutor, Isolation};
use super::tx_statuses::*;
use super::txs::*;
use super::txs_external::*;
use super::types::RepoResult;
use super::wallets::*;
use models::*;
use prelude::*;

fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

#[derive(Clone)]
pub struct CoinsRepoMock {
    data: Arc<Mutex<Vec<Coin>>>,
}

impl Default for CoinsRepoMock {
    fn default() -> Self {
        let coins = vec![("Bitcoin", "BTC"), ("Litecoin", "LTC"), ("Ethereum", "ETH"), ("Asset", "STQ")]
            .into_iter()
            .enumerate()
            .map(|(i, (name, symbol))| Coin {
                id: CoinId::new(i as i32 + 1),
                name: name.to_string(),
                short_name: CoinSymbol::new(symbol),
                enabled: true,
            }).collect();
        Self {
            data: Arc::new(Mutex::new(coins)),
        }
    }
}

impl CoinsRepoMock {
    pub fn set_enabled(&self, symbol: CoinSymbol, is_enabled: bool) {
        let mut data = self.data.lock().unwrap();
        for coin in data.iter_mut().filter(|coin| coin.short_name == symbol) {
            coin.enabled = is_enabled;
        }
    }
}

impl CoinsRepo for CoinsRepoMock {
    fn get(&self, coin_id: CoinId) -> RepoResult<Option<Coin>> {
        let data = self.data.lock().unwrap();
        Ok(data.iter().find(|x| x.id == coin_id).cloned())
    }
    fn get_by_symbol(&self, symbol: CoinSymbol) -> RepoResult<Option<Coin>> {
        let data = self.data.lock().unwrap();
        Ok(data.iter().find(|x| x.short_name == symbol).cloned())
    }
    fn list_enabled(&self) -> RepoResult<Vec<Coin>> {
        let data = self.data.lock().unwrap();
        Ok(data.iter().filter(|x| x.enabled).cloned().collect())
    }
}

#[derive(Clone)]
pub struct TxStatusesRepoMock {
    data: Arc<Vec<TxStatus>>,
}

impl Default for TxStatusesRepoMock {
    fn default() -> Self {
        let names = [
            TxStatusName::Validation,
            TxStatusName::Pending,
            TxStatusName::Waiting,
            TxStatusName::Success,
            TxStatusName::Decline,
            TxStatusName::Cancel,
        ];
        let data = names
            .iter()
            .enumerate()
            .map(|(i, name)| TxStatus {
                id: TxStatusId::new(i as i32 + 1),
                name: *name,
            }).collect();
        Self { data: Arc::new(data) }
    }
}

impl TxStatusesRepoMock {
    pub fn by_name(&self, status_name: TxStatusName) -> TxStatus {
        *self.data.iter().find(|x| x.name == status_name).unwrap()
    }

    pub fn by_id(&self, status_id: TxStatusId) -> TxStatus {
        *self.data.iter().find(|x| x.id == status_id).unwrap()
    }
}

impl TxStatusesRepo for TxStatusesRepoMock {
    fn get(&self, status_id: TxStatusId) -> RepoResult<Option<TxStatus>> {
        Ok(self.data.iter().find(|x| x.id == status_id).cloned())
    }
    fn get_by_name(&self, status_name: TxStatusName) -> RepoResult<Option<TxStatus>> {
        Ok(self.data.iter().find(|x| x.name == status_name).cloned())
    }
}

#[derive(Clone, Default)]
pub struct WalletsRepoMock {
    data: Arc<Mutex<Vec<Wallet>>>,
}

impl WalletsRepo for WalletsRepoMock {
    fn create(&self, payload: NewWallet) -> RepoResult<Wallet> {
        let mut data = self.data.lock().unwrap();
        if data.iter().any(|x| x.user_phone == payload.user_phone && x.coin_id == payload.coin_id) {
            let mut errors = ValidationErrors::new();
            errors.add("database", ValidationError::new("not_unique"));
            return Err(ErrorKind::Constraints(errors).into());
        }
        let res = Wallet {
            id: payload.id,
            user_phone: payload.user_phone,
            coin_id: payload.coin_id,
            address: payload.address,
            name: payload.name,
            created_at: now(),
            updated_at: now(),
        };
        data.push(res.clone());
        Ok(res)
    }
    fn get(&self, wallet_id: WalletId) -> RepoResult<Option<Wallet>> {
        let data = self.data.lock().unwrap();
        Ok(data.iter().find(|x| x.id == wallet_id).cloned())
    }
    fn get_by_phone(&self, phone: Phone, coin: CoinId) -> RepoResult<Option<Wallet>> {
        let data = self.data.lock().unwrap();
        Ok(data.iter().find(|x| x.user_phone == phone && x.coin_id == coin).cloned())
    }
    fn list_for_phone(&self, phone: Phone) -> RepoResult<Vec<Wallet>> {
        let data = self.data.lock().unwrap();
        Ok(data.iter().filter(|x| x.user_phone == phone).cloned().collect())
    }
}

#[derive(Clone)]
pub struct TxsRepoMock {
    data: Arc<Mutex<Vec<Tx>>>,
    statuses: TxStatusesRepoMock,
    wallets: WalletsRepoMock,
}

impl TxsRepoMock {
    pub fn new(statuses: TxStatusesRepoMock, wallets: WalletsRepoMock) -> Self {
        Self {
            data: Arc::new(Mutex::new(Vec::new())),
            statuses,
            wallets,
        }
    }

    /// Inserts a tx as is, e.g. with `created_at` in the past
    pub fn insert(&self, tx: Tx) {
        self.data.lock().unwrap().push(tx);
    }

    pub fn status_of(&self, tx_id: TxId) -> Option<TxStatusName> {
        let data = self.data.lock().unwrap();
        data.iter()
            .find(|x| x.id == tx_id)
            .map(|tx| self.statuses.by_id(tx.status_id).name)
    }

    fn update_where<F: FnMut(&mut Tx)>(&self, tx_ids: &[TxId], from: TxStatusId, mut f: F) -> Vec<Tx> {
        let mut data = self.data.lock().unwrap();
        data.iter_mut()
            .filter(|x| tx_ids.contains(&x.id) && x.status_id == from)
            .map(|x| {
                f(x);
                x.updated_at = now();
                x.clone()
            }).collect()
    }
}

impl TxsRepo for TxsRepoMock {
    fn create(&self, payload: NewTx) -> RepoResult<Tx> {
        let mut data = self.data.lock().unwrap();
        let res = Tx {
            id: payload.id,
            from_wallet_id: payload.from_wallet_id,
            to_wallet_id: payload.to_wallet_id,
            to_phone: payload.to_phone,
            to_address: payload.to_address,
            amount: payload.amount,
            tx_type: payload.tx_type,
            status_id: payload.status_id,
            created_at: now(),
            updated_at: now(),
        };
        data.push(res.clone());
        Ok(res)
    }
    fn get(&self, tx_id: TxId) -> RepoResult<Option<Tx>> {
        let data = self.data.lock().unwrap();
        Ok(data.iter().find(|x| x.id == tx_id).cloned())
    }
    fn get_with_status(&self, tx_id: TxId) -> RepoResult<Option<(Tx, TxStatus)>> {
        let tx = self.get(tx_id)?;
        Ok(tx.map(|tx| {
            let status = self.statuses.by_id(tx.status_id);
            (tx, status)
        }))
    }
    fn update_status(&self, tx_id: TxId, from: TxStatusId, to: TxStatusId) -> RepoResult<Option<Tx>> {
        Ok(self.update_where(&[tx_id], from, |x| x.status_id = to).into_iter().next())
    }
    fn update_statuses(&self, tx_ids: Vec<TxId>, from: TxStatusId, to: TxStatusId) -> RepoResult<Vec<Tx>> {
        Ok(self.update_where(&tx_ids, from, |x| x.status_id = to))
    }
    fn list_for_phone(&self, phone: Phone, coin: CoinId, status: TxStatusId) -> RepoResult<Vec<Tx>> {
        let wallets = self.wallets.data.lock().unwrap().clone();
        let data = self.data.lock().unwrap();
        Ok(data
            .iter()
            .filter(|x| x.to_phone.as_ref() == Some(&phone) && x.status_id == status)
            .filter(|x| wallets.iter().any(|w| w.id == x.from_wallet_id && w.coin_id == coin))
            .cloned()
            .collect())
    }
    fn attach_recipient(&self, tx_id: TxId, wallet_id: WalletId, from: TxStatusId, to: TxStatusId) -> RepoResult<Option<Tx>> {
        Ok(self
            .update_where(&[tx_id], from, |x| {
                x.to_wallet_id = Some(wallet_id);
                x.to_phone = None;
                x.status_id = to;
            }).into_iter()
            .next())
    }
    fn list_older_than(&self, status: TxStatusId, created_before: NaiveDateTime) -> RepoResult<Vec<Tx>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .iter()
            .filter(|x| x.status_id == status && x.created_at < created_before)
            .cloned()
            .collect())
    }
    fn wallet_net_sum(&self, wallet_id: WalletId, exclude: Option<TxId>, count_confirmed_external: bool) -> RepoResult<Amount> {
        let data = self.data.lock().unwrap();
        let sum = data
            .iter()
            .filter(|x| Some(x.id) != exclude)
            .filter(|x| match (self.statuses.by_id(x.status_id).name, x.tx_type) {
                (TxStatusName::Cancel, _) | (TxStatusName::Decline, _) => false,
                (TxStatusName::Success, TxKind::External) => count_confirmed_external,
                _ => true,
            }).fold(Amount::zero(), |acc, x| {
                let incoming = if x.to_wallet_id == Some(wallet_id) {
                    x.amount.clone()
                } else {
                    Amount::zero()
                };
                let outgoing = if x.from_wallet_id == wallet_id {
                    x.amount.clone()
                } else {
                    Amount::zero()
                };
                acc + incoming - outgoing
            });
        Ok(sum)
    }
}

#[derive(Clone)]
pub struct TxsExternalRepoMock {
    data: Arc<Mutex<Vec<TxExternal>>>,
    txs: TxsRepoMock,
}

impl TxsExternalRepoMock {
    pub fn new(txs: TxsRepoMock) -> Self {
        Self {
            data: Arc::new(Mutex::new(Vec::new())),
            txs,
        }
    }
}

impl TxsExternalRepo for TxsExternalRepoMock {
    fn create(&self, payload: NewTxExternal) -> RepoResult<TxExternal> {
        let mut data = self.data.lock().unwrap();
        let res = TxExternal {
            tx_id: payload.tx_id,
            hash: payload.hash,
            to_address: payload.to_address,
            fee: payload.fee,
            created_at: now(),
        };
        data.push(res.clone());
        Ok(res)
    }
    fn get_by_tx(&self, tx_id: TxId) -> RepoResult<Option<TxExternal>> {
        let data = self.data.lock().unwrap();
        Ok(data.iter().find(|x| x.tx_id == tx_id).cloned())
    }
    fn list_for_coin(&self, coin: CoinId, status: TxStatusId) -> RepoResult<Vec<TxExternal>> {
        let wallets = self.txs.wallets.data.lock().unwrap().clone();
        let txs = self.txs.data.lock().unwrap().clone();
        let data = self.data.lock().unwrap();
        Ok(data
            .iter()
            .filter(|external| {
                txs.iter().any(|tx| {
                    tx.id == external.tx_id
                        && tx.status_id == status
                        && wallets.iter().any(|w| w.id == tx.from_wallet_id && w.coin_id == coin)
                })
            }).cloned()
            .collect())
    }
}

#[derive(Clone, Default)]
pub struct DbExecutorMock;

impl DbExecutor for DbExecutorMock {
    fn execute<F, T, E>(&self, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Send + 'static,
    {
        Box::new(f().into_future())
    }
    fn execute_transaction_with_isolation<F, T, E>(&self, _isolation: Isolation, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Send + 'static,
    {
        Box::new(f().into_future())
    }
    fn execute_test_transaction<F, T, E>(&self, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Send + 'static,
    {
        Box::new(f().into_future())
    }
}
