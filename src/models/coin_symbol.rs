use std::fmt::{self, Display};
use std::str::FromStr;

use diesel::sql_types::VarChar;
use serde::de::{Deserialize, Deserializer};

/// Ticker of a coin, e.g. `BTC`. Always stored uppercased, so `btc` and `BTC` are the same coin.
#[derive(Debug, Serialize, FromSqlRow, AsExpression, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[sql_type = "VarChar"]
pub struct CoinSymbol(String);
derive_newtype_sql!(coin_symbol, VarChar, CoinSymbol, |raw: String| CoinSymbol::new(raw));

impl CoinSymbol {
    pub fn new<S: Into<String>>(symbol: S) -> Self {
        CoinSymbol(symbol.into().trim().to_uppercase())
    }

    pub fn raw(&self) -> &str {
        &self.0
    }
}

impl Display for CoinSymbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for CoinSymbol {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(CoinSymbol::new(s))
    }
}

impl<'a> From<&'a str> for CoinSymbol {
    fn from(s: &'a str) -> Self {
        CoinSymbol::new(s)
    }
}

impl<'de> Deserialize<'de> for CoinSymbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(CoinSymbol::new)
    }
}
