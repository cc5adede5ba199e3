//! Chain adapters and the coordinator that owns them.
//!
//! Each adapter implements some of the services in `capabilities`. The `Registry` maps coin
//! symbols to chain families, and the `Coordinator` dials nodes and hands out services per coin.

pub mod asset;
pub mod bitcoin;
pub mod capabilities;
pub mod coordinator;
pub mod error;
pub mod ethereum;
#[cfg(test)]
pub mod mocks;
pub mod registry;
pub mod rpc;
pub mod shutdown;

pub use self::capabilities::*;
pub use self::coordinator::Coordinator;
pub use self::error::{Error, ErrorKind};
pub use self::registry::{Chain, ChainKind, DialParams, Registry};
pub use self::shutdown::{shutdown_channel, Shutdown, ShutdownTrigger};
