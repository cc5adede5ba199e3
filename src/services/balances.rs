use std::sync::Arc;

use super::error::*;
use super::ServiceFuture;
use blockchain::{Coordinator, WalletObserver};
use models::*;
use prelude::*;
use repos::{DbExecutor, TxsRepo};

pub trait BalancesService: Send + Sync + 'static {
    /// Everything the coin node holds, i.e. the most the ledger can ever pay out
    fn account_balance(&self, coin: CoinSymbol) -> ServiceFuture<Amount>;
    /// On-chain balance of the wallet address plus the net sum of its txs in the ledger.
    /// `exclude_tx` is left out of the net sum, e.g. the tx that is being validated.
    fn total_wallet_balance(&self, wallet: Wallet, coin: CoinSymbol, exclude_tx: Option<TxId>) -> ServiceFuture<Amount>;
}

#[derive(Clone)]
pub struct BalancesServiceImpl<E: DbExecutor> {
    coordinator: Arc<Coordinator>,
    txs_repo: Arc<dyn TxsRepo>,
    db_executor: E,
}

impl<E: DbExecutor> BalancesServiceImpl<E> {
    pub fn new(coordinator: Arc<Coordinator>, txs_repo: Arc<dyn TxsRepo>, db_executor: E) -> Self {
        Self {
            coordinator,
            txs_repo,
            db_executor,
        }
    }

    /// `None` for a wallet without address, it needs no node
    fn wallet_observer(&self, wallet: &Wallet, coin: &CoinSymbol) -> Result<Option<Arc<WalletObserver>>, Error> {
        if wallet.address.is_empty() {
            return Ok(None);
        }
        let coin = coin.clone();
        self.coordinator
            .wallet_observer(&coin)
            .map(Some)
            .map_err(ectx!(try convert => coin))
    }
}

impl<E: DbExecutor> BalancesService for BalancesServiceImpl<E> {
    fn account_balance(&self, coin: CoinSymbol) -> ServiceFuture<Amount> {
        let coin_clone = coin.clone();
        Box::new(
            self.coordinator
                .account_observer(&coin)
                .map_err(ectx!(try convert => coin))
                .into_future()
                .and_then(move |observer| observer.get_balance().map_err(ectx!(try convert => coin_clone))),
        )
    }

    fn total_wallet_balance(&self, wallet: Wallet, coin: CoinSymbol, exclude_tx: Option<TxId>) -> ServiceFuture<Amount> {
        let observer = match self.wallet_observer(&wallet, &coin) {
            Ok(observer) => observer,
            Err(e) => return Box::new(future::err(e)),
        };
        // confirmed sends are already off an address balance that drops on send
        let count_confirmed_external = observer.as_ref().map(|o| !o.balance_drops_on_send()).unwrap_or(true);
        let txs_repo = self.txs_repo.clone();
        let wallet_id = wallet.id;
        let net_sum = self.db_executor.execute(move || {
            txs_repo
                .wallet_net_sum(wallet_id, exclude_tx, count_confirmed_external)
                .map_err(ectx!(try ErrorKind::Internal => wallet_id, exclude_tx))
        });
        let address = wallet.address.clone();
        let address_balance: ServiceFuture<Amount> = match observer {
            Some(observer) => Box::new(observer.balance(address.clone()).map_err(ectx!(try convert => address))),
            None => Box::new(future::ok(Amount::zero())),
        };
        Box::new(address_balance.join(net_sum).map(|(address_balance, net_sum)| address_balance + net_sum))
    }
}
