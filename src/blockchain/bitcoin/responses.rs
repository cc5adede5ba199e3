use models::*;

#[derive(Debug, Clone, Deserialize)]
pub struct WalletInfo {
    pub balance: Amount,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockInfo {
    pub hash: String,
    pub height: u64,
    pub time: i64,
    pub mediantime: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionInfo {
    /// Negative when the tx conflicts with a mined one
    pub confirmations: i64,
    /// Present only for txs sent from the node wallet, negative
    pub fee: Option<Amount>,
    #[serde(default)]
    pub abandoned: bool,
}
