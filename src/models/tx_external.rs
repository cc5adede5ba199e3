use chrono::NaiveDateTime;

use models::*;
use schema::txs_external;

/// On-chain leg of an external tx, created in the same db transaction
/// that moves the ledger tx to `waiting`
#[derive(Debug, Queryable, Clone)]
pub struct TxExternal {
    pub tx_id: TxId,
    pub hash: TxHash,
    pub to_address: BlockchainAddress,
    pub fee: Amount,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Insertable, Clone)]
#[table_name = "txs_external"]
pub struct NewTxExternal {
    pub tx_id: TxId,
    pub hash: TxHash,
    pub to_address: BlockchainAddress,
    pub fee: Amount,
}
