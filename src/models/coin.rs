use diesel::sql_types::Int4;

use models::*;

#[derive(Debug, Serialize, Deserialize, FromSqlRow, AsExpression, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[sql_type = "Int4"]
pub struct CoinId(i32);
derive_newtype_sql!(coin_id, Int4, CoinId, CoinId);

impl CoinId {
    pub fn new(id: i32) -> Self {
        CoinId(id)
    }

    pub fn inner(&self) -> i32 {
        self.0
    }
}

/// A coin known to the ledger. Wallets can only be created for enabled coins.
#[derive(Debug, Queryable, Clone, Serialize)]
pub struct Coin {
    pub id: CoinId,
    pub name: String,
    pub short_name: CoinSymbol,
    pub enabled: bool,
}

impl Default for Coin {
    fn default() -> Self {
        Self {
            id: CoinId::default(),
            name: "Bitcoin".to_string(),
            short_name: CoinSymbol::new("BTC"),
            enabled: true,
        }
    }
}

