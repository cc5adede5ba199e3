//! Repos is a module responsible for interacting with postgres db

pub mod coins;
pub mod error;
pub mod executor;
#[cfg(test)]
mod mocks;
pub mod tx_statuses;
pub mod txs;
pub mod txs_external;
pub mod types;
pub mod wallets;

pub use self::coins::*;
pub use self::error::*;
pub use self::executor::*;
#[cfg(test)]
pub use self::mocks::*;
pub use self::tx_statuses::*;
pub use self::txs::*;
pub use self::txs_external::*;
pub use self::types::*;
pub use self::wallets::*;
