use models::*;

/// One transaction of an address as reported by a chain explorer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub hash: TxHash,
    pub from: BlockchainAddress,
    pub to: BlockchainAddress,
    pub amount: Amount,
    pub block: u64,
    pub confirmations: u64,
    pub failed: bool,
}
