mod error;
#[cfg(test)]
mod mocks;

use std::sync::Arc;

use failure::Fail;
use futures::prelude::*;
use serde::Deserialize;
use serde_json;
use serde_qs;

pub use self::error::*;
#[cfg(test)]
pub use self::mocks::*;
use super::HttpClient;
use config::Config;
use models::*;
use utils::read_body;

/// Fiat rates collaborator. Rates are opaque here, the service decides how to price a coin.
pub trait RatesClient: Send + Sync + 'static {
    fn get_rate(&self, coin: CoinSymbol, currency: FiatSymbol) -> Box<Future<Item = Rate, Error = Error> + Send>;
    fn get_multi_rate(&self, coins: Vec<CoinSymbol>, currencies: Vec<FiatSymbol>) -> Box<Future<Item = Vec<Rate>, Error = Error> + Send>;
}

#[derive(Debug, Serialize)]
struct RateQuery {
    coin: String,
    currency: String,
}

#[derive(Debug, Serialize)]
struct MultiRateQuery {
    coins: String,
    currencies: String,
}

#[derive(Clone)]
pub struct RatesClientImpl {
    cli: Arc<HttpClient>,
    rates_url: String,
}

impl RatesClientImpl {
    pub fn new<C: HttpClient>(config: &Config, cli: C) -> Self {
        Self {
            cli: Arc::new(cli),
            rates_url: config.client.rates_url.clone(),
        }
    }

    fn exec_query<T: for<'de> Deserialize<'de> + Send>(&self, path: &str, query: String) -> impl Future<Item = T, Error = Error> + Send {
        let url = format!("{}{}?{}", self.rates_url, path, query);
        let url1 = url.clone();
        let cli = self.cli.clone();
        cli.get(url)
            .map_err(ectx!(convert => url1))
            .and_then(|resp| read_body(resp.into_body()).map_err(ectx!(ErrorSource::Hyper, ErrorKind::Internal)))
            .and_then(|bytes| {
                let bytes_clone = bytes.clone();
                String::from_utf8(bytes).map_err(ectx!(ErrorSource::Utf8, ErrorKind::Internal => bytes_clone))
            }).and_then(|string| serde_json::from_str::<T>(&string).map_err(ectx!(ErrorSource::Json, ErrorKind::Internal => string)))
    }
}

impl RatesClient for RatesClientImpl {
    fn get_rate(&self, coin: CoinSymbol, currency: FiatSymbol) -> Box<Future<Item = Rate, Error = Error> + Send> {
        let query = RateQuery {
            coin: coin.raw().to_string(),
            currency: currency.raw().to_string(),
        };
        let client = self.clone();
        Box::new(
            serde_qs::to_string(&query)
                .map_err(move |e| {
                    let e = format_err!("{}", e);
                    ectx!(err e, ErrorSource::SerdeQs, ErrorKind::MalformedInput => query)
                })
                .into_future()
                .and_then(move |query| client.exec_query::<Rate>("/rate", query)),
        )
    }

    fn get_multi_rate(&self, coins: Vec<CoinSymbol>, currencies: Vec<FiatSymbol>) -> Box<Future<Item = Vec<Rate>, Error = Error> + Send> {
        let query = MultiRateQuery {
            coins: coins.iter().map(|coin| coin.raw()).collect::<Vec<_>>().join(","),
            currencies: currencies.iter().map(|currency| currency.raw()).collect::<Vec<_>>().join(","),
        };
        let client = self.clone();
        Box::new(
            serde_qs::to_string(&query)
                .map_err(move |e| {
                    let e = format_err!("{}", e);
                    ectx!(err e, ErrorSource::SerdeQs, ErrorKind::MalformedInput => query)
                })
                .into_future()
                .and_then(move |query| client.exec_query::<Vec<Rate>>("/rates", query)),
        )
    }
}
