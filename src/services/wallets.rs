use std::sync::Arc;

use super::balances::BalancesService;
use super::error::*;
use super::txs::TxsService;
use super::ServiceFuture;
use blockchain::Coordinator;
use client::RatesClient;
use models::*;
use prelude::*;
use repos::{CoinsRepo, DbExecutor, ErrorKind as ReposErrorKind, WalletsRepo};
use utils::log_error;

pub trait WalletsService: Send + Sync + 'static {
    /// Creates the only wallet of a phone for the coin and hands over txs that were waiting for it
    fn create_wallet(&self, input: CreateWallet) -> ServiceFuture<Wallet>;
    fn get_balance(&self, wallet_id: WalletId) -> ServiceFuture<WalletBalance>;
    fn get_fiat_balance(&self, wallet_id: WalletId, currency: FiatSymbol) -> ServiceFuture<FiatBalance>;
    fn list_wallets(&self, phone: Phone) -> ServiceFuture<Vec<Wallet>>;
    /// On-chain txs of the wallet address, for coins whose node can list them
    fn history(&self, wallet_id: WalletId) -> ServiceFuture<Vec<HistoryEntry>>;
}

#[derive(Clone)]
pub struct WalletsServiceImpl<E: DbExecutor> {
    coins_repo: Arc<dyn CoinsRepo>,
    wallets_repo: Arc<dyn WalletsRepo>,
    balances_service: Arc<dyn BalancesService>,
    txs_service: Arc<dyn TxsService>,
    rates_client: Arc<dyn RatesClient>,
    coordinator: Arc<Coordinator>,
    db_executor: E,
}

impl<E: DbExecutor> WalletsServiceImpl<E> {
    pub fn new(
        coins_repo: Arc<dyn CoinsRepo>,
        wallets_repo: Arc<dyn WalletsRepo>,
        balances_service: Arc<dyn BalancesService>,
        txs_service: Arc<dyn TxsService>,
        rates_client: Arc<dyn RatesClient>,
        coordinator: Arc<Coordinator>,
        db_executor: E,
    ) -> Self {
        Self {
            coins_repo,
            wallets_repo,
            balances_service,
            txs_service,
            rates_client,
            coordinator,
            db_executor,
        }
    }

    fn wallet_with_coin(&self, wallet_id: WalletId) -> ServiceFuture<(Wallet, Coin)> {
        let wallets_repo = self.wallets_repo.clone();
        let coins_repo = self.coins_repo.clone();
        Box::new(self.db_executor.execute(move || -> Result<(Wallet, Coin), Error> {
            let wallet = wallets_repo
                .get(wallet_id)
                .map_err(ectx!(try ErrorKind::Internal => wallet_id))?
                .ok_or(ectx!(try err ErrorKind::NoSuchWallet, ErrorKind::NoSuchWallet => wallet_id))?;
            let coin_id = wallet.coin_id;
            let coin = coins_repo
                .get(coin_id)
                .map_err(ectx!(try ErrorKind::Internal => coin_id))?
                .ok_or(ectx!(try err ErrorKind::NoSuchCoin, ErrorKind::NoSuchCoin => coin_id))?;
            Ok((wallet, coin))
        }))
    }
}

impl<E: DbExecutor> WalletsService for WalletsServiceImpl<E> {
    fn create_wallet(&self, input: CreateWallet) -> ServiceFuture<Wallet> {
        let coins_repo = self.coins_repo.clone();
        let wallets_repo = self.wallets_repo.clone();
        let txs_service = self.txs_service.clone();
        let coordinator = self.coordinator.clone();
        let db_executor = self.db_executor.clone();
        let input_clone = input.clone();
        Box::new(
            input
                .validate_all()
                .map_err(|e| ectx!(err e.clone(), ErrorKind::InvalidInput(e) => input_clone))
                .into_future()
                .and_then({
                    let db_executor = db_executor.clone();
                    let wallets_repo = wallets_repo.clone();
                    let input = input.clone();
                    move |_| {
                        db_executor.execute(move || -> Result<Coin, Error> {
                            let symbol = input.coin.clone();
                            let symbol_clone = symbol.clone();
                            let coin = coins_repo
                                .get_by_symbol(symbol.clone())
                                .map_err(ectx!(try ErrorKind::Internal => symbol_clone))?
                                .ok_or(ectx!(try err ErrorKind::NoSuchCoin, ErrorKind::NoSuchCoin => symbol))?;
                            if !coin.enabled {
                                return Err(ectx!(err ErrorContext::CoinDisabled, ErrorKind::NoSuchCoin => symbol));
                            }
                            let phone = input.user_phone.clone();
                            let coin_id = coin.id;
                            let existing = wallets_repo
                                .get_by_phone(phone.clone(), coin_id)
                                .map_err(ectx!(try ErrorKind::Internal => phone, coin_id))?;
                            if let Some(existing) = existing {
                                return Err(ectx!(err ErrorKind::AlreadyExists, ErrorKind::AlreadyExists => existing.id, symbol));
                            }
                            Ok(coin)
                        })
                    }
                }).and_then(move |coin: Coin| {
                    let symbol = coin.short_name.clone();
                    coordinator
                        .generator(&coin.short_name)
                        .map_err(ectx!(try convert => symbol))
                        .into_future()
                        .and_then(|generator| generator.create().map_err(ectx!(try convert)))
                        .map(move |address| NewWallet::from((input, coin.id, address)))
                }).and_then(move |payload| {
                    db_executor.execute(move || {
                        wallets_repo.create(payload.clone()).map_err(move |e| {
                            // lost the race on the (phone, coin) unique key
                            let kind = match e.kind() {
                                ReposErrorKind::Constraints(_) => ErrorKind::AlreadyExists,
                                _ => ErrorKind::Internal,
                            };
                            ectx!(try err e, kind => payload)
                        })
                    })
                }).and_then(move |wallet| {
                    info!("Created wallet {} of {} at {}", wallet.id, wallet.user_phone, wallet.address);
                    let wallet_id = wallet.id;
                    txs_service.on_recipient_created(wallet.clone()).then(move |res| {
                        if let Err(e) = res {
                            let e: Error = ectx!(err e, ErrorContext::RecipientCreated, ErrorKind::Internal => wallet_id);
                            log_error(&e);
                        }
                        Ok(wallet)
                    })
                }),
        )
    }

    fn get_balance(&self, wallet_id: WalletId) -> ServiceFuture<WalletBalance> {
        let balances_service = self.balances_service.clone();
        Box::new(self.wallet_with_coin(wallet_id).and_then(move |(wallet, coin)| {
            balances_service
                .total_wallet_balance(wallet, coin.short_name.clone(), None)
                .map(move |balance| WalletBalance {
                    wallet_id,
                    coin: coin.short_name,
                    balance,
                })
        }))
    }

    fn get_fiat_balance(&self, wallet_id: WalletId, currency: FiatSymbol) -> ServiceFuture<FiatBalance> {
        let rates_client = self.rates_client.clone();
        Box::new(self.get_balance(wallet_id).and_then(move |balance| {
            let coin = balance.coin.clone();
            let currency_clone = currency.clone();
            rates_client
                .get_rate(coin.clone(), currency.clone())
                .map_err(ectx!(try convert => coin, currency_clone))
                .map(move |rate| FiatBalance {
                    wallet_id: balance.wallet_id,
                    coin: balance.coin,
                    currency,
                    fiat_balance: balance.balance.clone() * rate.rate,
                    balance: balance.balance,
                })
        }))
    }

    fn list_wallets(&self, phone: Phone) -> ServiceFuture<Vec<Wallet>> {
        let wallets_repo = self.wallets_repo.clone();
        Box::new(self.db_executor.execute(move || {
            wallets_repo
                .list_for_phone(phone.clone())
                .map_err(ectx!(try ErrorKind::Internal => phone))
        }))
    }

    fn history(&self, wallet_id: WalletId) -> ServiceFuture<Vec<HistoryEntry>> {
        let coordinator = self.coordinator.clone();
        Box::new(self.wallet_with_coin(wallet_id).and_then(move |(wallet, coin)| {
            let symbol = coin.short_name.clone();
            let address = wallet.address.clone();
            coordinator
                .txs_history(&coin.short_name)
                .map_err(ectx!(try convert => symbol))
                .into_future()
                .and_then(move |history| history.list(wallet.address).map_err(ectx!(try convert => address)))
        }))
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use tokio_core::reactor::Core;

    use super::*;
    use services::tests::Fixture;

    fn amount(s: &str) -> Amount {
        Amount::from_str(s).unwrap()
    }

    fn create_wallet_input(phone: &str, coin: &str) -> CreateWallet {
        CreateWallet {
            user_phone: Phone::new(phone.to_string()),
            coin: CoinSymbol::new(coin),
            name: "savings".to_string(),
        }
    }

    #[test]
    fn test_create_wallet() {
        let mut core = Core::new().unwrap();
        let fixture = Fixture::new();
        let service = fixture.wallets_service();
        let wallet = core.run(service.create_wallet(create_wallet_input("+7 911 000-00-01", "btc"))).unwrap();
        assert_eq!(wallet.address, BlockchainAddress::new("address-1".to_string()));
        assert_eq!(wallet.user_phone, Phone::new("+79110000001".to_string()));
        let wallets = core.run(service.list_wallets(Phone::new("+79110000001".to_string()))).unwrap();
        assert_eq!(wallets.len(), 1);
    }

    #[test]
    fn test_one_wallet_per_phone_and_coin() {
        let mut core = Core::new().unwrap();
        let fixture = Fixture::new();
        let service = fixture.wallets_service();
        core.run(service.create_wallet(create_wallet_input("+79110000001", "BTC"))).unwrap();
        let err = core
            .run(service.create_wallet(create_wallet_input("+79110000001", "BTC")))
            .unwrap_err();
        match err.kind() {
            ErrorKind::AlreadyExists => (),
            kind => panic!("unexpected error kind {:?}", kind),
        }
        // no address is wasted on a rejected wallet
        assert_eq!(
            core.run(fixture.chain.capabilities().generator.unwrap().create()).unwrap(),
            BlockchainAddress::new("address-2".to_string())
        );
    }

    #[test]
    fn test_concurrent_creates_leave_one_wallet() {
        let mut core = Core::new().unwrap();
        let fixture = Fixture::new();
        // both duplicate checks pass before either insert
        fixture.chain.set_generator_yields(true);
        let service = fixture.wallets_service();
        let first = service
            .create_wallet(create_wallet_input("+79110000001", "BTC"))
            .then(|res| Ok::<_, ()>(res));
        let second = service
            .create_wallet(create_wallet_input("+79110000001", "BTC"))
            .then(|res| Ok::<_, ()>(res));
        let (first, second) = core.run(first.join(second)).unwrap();
        let (created, rejected): (Vec<_>, Vec<_>) = vec![first, second].into_iter().partition(|res| res.is_ok());
        assert_eq!(created.len(), 1);
        assert_eq!(rejected.len(), 1);
        for res in rejected {
            match res.map(|_| ()).unwrap_err().kind() {
                ErrorKind::AlreadyExists => (),
                kind => panic!("unexpected error kind {:?}", kind),
            }
        }
        let wallets = core.run(service.list_wallets(Phone::new("+79110000001".to_string()))).unwrap();
        assert_eq!(wallets.len(), 1);
    }

    #[test]
    fn test_create_wallet_rejects_invalid_input() {
        let mut core = Core::new().unwrap();
        let fixture = Fixture::new();
        let service = fixture.wallets_service();
        let input = CreateWallet {
            name: String::new(),
            ..create_wallet_input("call me", "BTC")
        };
        let err = core.run(service.create_wallet(input)).unwrap_err();
        match err.kind() {
            ErrorKind::InvalidInput(errors) => {
                let errors = format!("{:?}", errors);
                assert!(errors.contains("name"));
                assert!(errors.contains("user_phone"));
            }
            kind => panic!("unexpected error kind {:?}", kind),
        }
    }

    #[test]
    fn test_create_wallet_of_unknown_or_disabled_coin() {
        let mut core = Core::new().unwrap();
        let fixture = Fixture::new();
        fixture.coins_repo.set_enabled(CoinSymbol::new("LTC"), false);
        let service = fixture.wallets_service();
        for coin in &["DOGE", "LTC"] {
            let err = core.run(service.create_wallet(create_wallet_input("+79110000001", coin))).unwrap_err();
            match err.kind() {
                ErrorKind::NoSuchCoin => (),
                kind => panic!("unexpected error kind {:?}", kind),
            }
        }
    }

    #[test]
    fn test_create_wallet_of_undialed_coin() {
        let mut core = Core::new().unwrap();
        let fixture = Fixture::new();
        let service = fixture.wallets_service();
        let err = core
            .run(service.create_wallet(create_wallet_input("+79110000001", "ETH")))
            .unwrap_err();
        match err.kind() {
            ErrorKind::NoSuchCoin => (),
            kind => panic!("unexpected error kind {:?}", kind),
        }
        assert!(core.run(service.list_wallets(Phone::new("+79110000001".to_string()))).unwrap().is_empty());
    }

    #[test]
    fn test_new_wallet_receives_pending_txs() {
        let mut core = Core::new().unwrap();
        let fixture = Fixture::new();
        let sender = fixture.wallet("+79110000001", "BTC");
        fixture.chain.set_account_balance(amount("100"));
        fixture.chain.set_address_balance(sender.address.clone(), amount("10"));
        let txs_service = fixture.txs_service();
        let report = core
            .run(txs_service.send_internal(SendInternal {
                from_wallet_id: sender.id,
                to: Recipient::Phone(Phone::new("+79110000002".to_string())),
                amount: amount("2.5"),
            })).unwrap();
        assert_eq!(report.status, TxStatusName::Pending);

        let service = fixture.wallets_service();
        let wallet = core.run(service.create_wallet(create_wallet_input("+79110000002", "BTC"))).unwrap();
        assert_eq!(fixture.txs_repo.status_of(report.tx.id), Some(TxStatusName::Success));
        let balance = core.run(service.get_balance(wallet.id)).unwrap();
        assert_eq!(balance.balance, amount("2.5"));
        assert_eq!(balance.coin, CoinSymbol::new("BTC"));
    }

    #[test]
    fn test_fiat_balance() {
        let mut core = Core::new().unwrap();
        let fixture = Fixture::new();
        let wallet = fixture.wallet("+79110000001", "BTC");
        fixture.chain.set_address_balance(wallet.address.clone(), amount("1.5"));
        fixture
            .rates_client
            .set_rate(CoinSymbol::new("BTC"), FiatSymbol::new("usd"), amount("6301.12"));
        let service = fixture.wallets_service();

        let balance = core.run(service.get_fiat_balance(wallet.id, FiatSymbol::new("USD"))).unwrap();
        assert_eq!(balance.balance, amount("1.5"));
        assert_eq!(balance.fiat_balance, amount("9451.68"));

        let err = core.run(service.get_fiat_balance(wallet.id, FiatSymbol::new("EUR"))).unwrap_err();
        match err.kind() {
            ErrorKind::NotFound => (),
            kind => panic!("unexpected error kind {:?}", kind),
        }
    }

    #[test]
    fn test_history_needs_capable_node() {
        let mut core = Core::new().unwrap();
        let fixture = Fixture::new();
        let wallet = fixture.wallet("+79110000001", "BTC");
        let service = fixture.wallets_service();
        let err = core.run(service.history(wallet.id)).unwrap_err();
        match err.kind() {
            ErrorKind::NotImplemented => (),
            kind => panic!("unexpected error kind {:?}", kind),
        }
        let err = core.run(service.history(WalletId::generate())).unwrap_err();
        match err.kind() {
            ErrorKind::NoSuchWallet => (),
            kind => panic!("unexpected error kind {:?}", kind),
        }
    }
}
