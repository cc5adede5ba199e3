use std::fmt::{self, Display};

use diesel::sql_types::VarChar;

/// On-chain transaction hash (txid)
#[derive(Deserialize, FromSqlRow, AsExpression, Clone, Default, PartialEq, Eq, Hash, Serialize, Debug)]
#[sql_type = "VarChar"]
pub struct TxHash(String);
derive_newtype_sql!(tx_hash, VarChar, TxHash, TxHash);

impl TxHash {
    pub fn new(hash: String) -> Self {
        TxHash(hash)
    }

    pub fn raw(&self) -> &str {
        &self.0
    }
}

impl Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}
