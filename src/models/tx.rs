use chrono::NaiveDateTime;

use models::*;
use schema::txs;

/// Ledger transaction. Exactly one of `to_wallet_id`, `to_phone`, `to_address` is expected to be set,
/// this is checked when the transaction is validated rather than enforced on insert.
#[derive(Debug, Queryable, Clone)]
pub struct Tx {
    pub id: TxId,
    pub from_wallet_id: WalletId,
    pub to_wallet_id: Option<WalletId>,
    pub to_phone: Option<Phone>,
    pub to_address: Option<BlockchainAddress>,
    pub amount: Amount,
    pub tx_type: TxKind,
    pub status_id: TxStatusId,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Tx {
    /// Number of destinations set on this tx
    pub fn destinations_count(&self) -> usize {
        [self.to_wallet_id.is_some(), self.to_phone.is_some(), self.to_address.is_some()]
            .iter()
            .filter(|is_set| **is_set)
            .count()
    }
}

impl Default for Tx {
    fn default() -> Self {
        let now = ::chrono::Utc::now().naive_utc();
        Self {
            id: TxId::generate(),
            from_wallet_id: WalletId::generate(),
            to_wallet_id: None,
            to_phone: None,
            to_address: None,
            amount: Amount::default(),
            tx_type: TxKind::Internal,
            status_id: TxStatusId::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Insertable, Clone)]
#[table_name = "txs"]
pub struct NewTx {
    pub id: TxId,
    pub from_wallet_id: WalletId,
    pub to_wallet_id: Option<WalletId>,
    pub to_phone: Option<Phone>,
    pub to_address: Option<BlockchainAddress>,
    pub amount: Amount,
    pub tx_type: TxKind,
    pub status_id: TxStatusId,
}

/// Destination of an internal transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    Wallet(WalletId),
    Phone(Phone),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendInternal {
    pub from_wallet_id: WalletId,
    pub to: Recipient,
    pub amount: Amount,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendExternal {
    pub from_wallet_id: WalletId,
    pub to_address: BlockchainAddress,
    pub amount: Amount,
}

/// Result of driving a tx through its state machine until no automatic step applies
#[derive(Debug, Clone)]
pub struct StepReport {
    pub tx: Tx,
    pub status: TxStatusName,
    pub violations: TxViolations,
}
