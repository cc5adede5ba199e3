use std::fmt::{self, Display};
use std::io::Write;

use diesel::deserialize::{self, FromSql};
use diesel::pg::Pg;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::{Int4, VarChar};

#[derive(Debug, Serialize, Deserialize, FromSqlRow, AsExpression, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[sql_type = "Int4"]
pub struct TxStatusId(i32);
derive_newtype_sql!(tx_status_id, Int4, TxStatusId, TxStatusId);

impl TxStatusId {
    pub fn new(id: i32) -> Self {
        TxStatusId(id)
    }
}

/// Lifecycle of a ledger transaction.
///
/// `validation` -> `success` | `decline` | `pending` | `waiting`,
/// `pending` -> `validation` (recipient wallet created) | `cancel` (outdated),
/// `waiting` -> `success` (confirmed on chain).
/// `success`, `decline` and `cancel` are terminal.
#[derive(Debug, Serialize, Deserialize, FromSqlRow, AsExpression, Clone, Copy, Eq, PartialEq, Hash)]
#[sql_type = "VarChar"]
#[serde(rename_all = "lowercase")]
pub enum TxStatusName {
    Validation,
    Pending,
    Waiting,
    Success,
    Decline,
    Cancel,
}

impl TxStatusName {
    pub fn is_terminal(&self) -> bool {
        match self {
            TxStatusName::Success | TxStatusName::Decline | TxStatusName::Cancel => true,
            TxStatusName::Validation | TxStatusName::Pending | TxStatusName::Waiting => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatusName::Validation => "validation",
            TxStatusName::Pending => "pending",
            TxStatusName::Waiting => "waiting",
            TxStatusName::Success => "success",
            TxStatusName::Decline => "decline",
            TxStatusName::Cancel => "cancel",
        }
    }
}

impl Display for TxStatusName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromSql<VarChar, Pg> for TxStatusName {
    fn from_sql(data: Option<&[u8]>) -> deserialize::Result<Self> {
        match data {
            Some(b"validation") => Ok(TxStatusName::Validation),
            Some(b"pending") => Ok(TxStatusName::Pending),
            Some(b"waiting") => Ok(TxStatusName::Waiting),
            Some(b"success") => Ok(TxStatusName::Success),
            Some(b"decline") => Ok(TxStatusName::Decline),
            Some(b"cancel") => Ok(TxStatusName::Cancel),
            Some(v) => Err(format!(
                "Unrecognized enum variant: {:?}",
                String::from_utf8(v.to_vec()).unwrap_or_else(|_| "Non - UTF8 value".to_string())
            ).to_string()
            .into()),
            None => Err("Unexpected null for non-null column".into()),
        }
    }
}

impl ToSql<VarChar, Pg> for TxStatusName {
    fn to_sql<W: Write>(&self, out: &mut Output<W, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

/// Row of `tx_statuses`, transactions reference statuses by id
#[derive(Debug, Queryable, Clone, Copy, PartialEq, Eq)]
pub struct TxStatus {
    pub id: TxStatusId,
    pub name: TxStatusName,
}
