use serde_json::Value;

/// Subset of the `eth_getTransactionByHash` result. Quantities are hex strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionObject {
    pub hash: String,
    /// `None` while the tx is in the mempool
    pub block_number: Option<String>,
}

/// Envelope of every etherscan api answer. Proxy answers carry no `status`.
#[derive(Debug, Clone, Deserialize)]
pub struct ExplorerResponse {
    pub status: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub result: Value,
}

/// Etherscan `txlist` item, every field is a decimal string
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerTx {
    pub hash: String,
    pub from: String,
    pub to: String,
    pub value: String,
    pub block_number: String,
    pub confirmations: String,
    pub is_error: String,
}

