use std::fmt::{self, Display};

use diesel::sql_types::VarChar;

/// Address on a chain, format depends on the chain and is checked by its adapter
#[derive(Deserialize, FromSqlRow, AsExpression, Clone, Default, PartialEq, Eq, Hash, Serialize, Debug)]
#[sql_type = "VarChar"]
pub struct BlockchainAddress(String);
derive_newtype_sql!(blockchain_address, VarChar, BlockchainAddress, BlockchainAddress);

impl BlockchainAddress {
    pub fn new(address: String) -> Self {
        BlockchainAddress(address)
    }

    pub fn raw(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for BlockchainAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}
