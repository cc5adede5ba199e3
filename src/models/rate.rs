use std::fmt::{self, Display};

use serde::de::{Deserialize, Deserializer};

use models::*;

/// Fiat currency code, e.g. `USD`, always uppercased
#[derive(Debug, Serialize, Clone, PartialEq, Eq, Hash)]
pub struct FiatSymbol(String);

impl FiatSymbol {
    pub fn new<S: Into<String>>(symbol: S) -> Self {
        FiatSymbol(symbol.into().trim().to_uppercase())
    }

    pub fn raw(&self) -> &str {
        &self.0
    }
}

impl Display for FiatSymbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for FiatSymbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(FiatSymbol::new)
    }
}

/// Price of one coin in a fiat currency
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rate {
    pub coin: CoinSymbol,
    pub currency: FiatSymbol,
    pub rate: Amount,
}
