#[derive(Debug, Clone, Deserialize)]
pub struct AddressResponse {
    pub address: String,
}

/// Balances are strings of base units, e.g. `"150000000"` for 1.5 with 8 decimals
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    pub balance: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetTxStatus {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionResponse {
    pub status: AssetTxStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendRequest {
    pub from: String,
    pub to: String,
    pub amount: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendResponse {
    pub hash: String,
    pub fee: String,
}
