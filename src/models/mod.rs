mod amount;
mod blockchain_address;
mod coin;
mod coin_symbol;
mod history;
mod notification;
mod phone;
mod rate;
mod tx;
mod tx_external;
mod tx_hash;
mod tx_id;
mod tx_kind;
mod tx_status;
mod tx_violations;
mod wallet;
mod wallet_id;

pub use self::amount::*;
pub use self::blockchain_address::*;
pub use self::coin::*;
pub use self::coin_symbol::*;
pub use self::history::*;
pub use self::notification::*;
pub use self::phone::*;
pub use self::rate::*;
pub use self::tx::*;
pub use self::tx_external::*;
pub use self::tx_hash::*;
pub use self::tx_id::*;
pub use self::tx_kind::*;
pub use self::tx_status::*;
pub use self::tx_violations::*;
pub use self::wallet::*;
pub use self::wallet_id::*;
