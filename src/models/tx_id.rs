use std::fmt::{self, Display};
use std::str::FromStr;

use diesel::sql_types::Uuid as SqlUuid;
use uuid::{self, Uuid};

#[derive(Debug, Serialize, Deserialize, FromSqlRow, AsExpression, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[sql_type = "SqlUuid"]
pub struct TxId(Uuid);
derive_newtype_sql!(tx_id, SqlUuid, TxId, TxId);

impl TxId {
    pub fn new(id: Uuid) -> Self {
        TxId(id)
    }

    pub fn generate() -> Self {
        TxId(Uuid::new_v4())
    }

    pub fn inner(&self) -> &Uuid {
        &self.0
    }
}

impl FromStr for TxId {
    type Err = uuid::ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = Uuid::parse_str(s)?;
        Ok(TxId::new(id))
    }
}

impl Display for TxId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&format!("{}", self.0.hyphenated()))
    }
}
