use std::sync::{Arc, Mutex};

use super::error::*;
use super::RatesClient;
use models::*;
use prelude::*;

#[derive(Clone, Default)]
pub struct RatesClientMock {
    rates: Arc<Mutex<Vec<Rate>>>,
}

impl RatesClientMock {
    pub fn set_rate(&self, coin: CoinSymbol, currency: FiatSymbol, rate: Amount) {
        let mut rates = self.rates.lock().unwrap();
        rates.retain(|x| !(x.coin == coin && x.currency == currency));
        rates.push(Rate { coin, currency, rate });
    }
}

impl RatesClient for RatesClientMock {
    fn get_rate(&self, coin: CoinSymbol, currency: FiatSymbol) -> Box<Future<Item = Rate, Error = Error> + Send> {
        let rates = self.rates.lock().unwrap();
        let rate = rates.iter().find(|x| x.coin == coin && x.currency == currency).cloned();
        Box::new(rate.ok_or(ectx!(err ErrorKind::NotFound, ErrorKind::NotFound => coin, currency)).into_future())
    }

    fn get_multi_rate(&self, coins: Vec<CoinSymbol>, currencies: Vec<FiatSymbol>) -> Box<Future<Item = Vec<Rate>, Error = Error> + Send> {
        let rates = self.rates.lock().unwrap();
        let res = rates
            .iter()
            .filter(|x| coins.contains(&x.coin) && currencies.contains(&x.currency))
            .cloned()
            .collect();
        Box::new(future::ok(res))
    }
}
