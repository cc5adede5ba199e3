use models::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Processed,
    Declined,
    AwaitRecipient,
}

impl NotificationKind {
    pub fn path(&self) -> &'static str {
        match self {
            NotificationKind::Processed => "processed",
            NotificationKind::Declined => "declined",
            NotificationKind::AwaitRecipient => "await_recipient",
        }
    }
}

/// What the notification collaborator gets to know about a tx
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxNotification {
    pub tx_id: TxId,
    pub from_wallet_id: WalletId,
    pub to_wallet_id: Option<WalletId>,
    pub to_phone: Option<Phone>,
    pub to_address: Option<BlockchainAddress>,
    pub amount: Amount,
    pub status: TxStatusName,
    pub reasons: Vec<String>,
}

impl TxNotification {
    pub fn new(tx: &Tx, status: TxStatusName, violations: &TxViolations) -> Self {
        Self {
            tx_id: tx.id,
            from_wallet_id: tx.from_wallet_id,
            to_wallet_id: tx.to_wallet_id,
            to_phone: tx.to_phone.clone(),
            to_address: tx.to_address.clone(),
            amount: tx.amount.clone(),
            status,
            reasons: violations.codes(),
        }
    }
}
