//! Services hold the business logic: tx state machine, wallets, balances and confirmations.
//! They talk to the db through repos and to coin nodes through the blockchain coordinator.

mod balances;
mod confirmations;
mod error;
mod sweeper;
mod txs;
mod wallets;

pub use self::balances::*;
pub use self::confirmations::*;
pub use self::error::*;
pub use self::sweeper::*;
pub use self::txs::*;
pub use self::wallets::*;

use models::*;
use prelude::*;
use repos::TxStatusesRepo;

pub type ServiceFuture<T> = Box<Future<Item = T, Error = Error> + Send>;

/// Statuses are referenced by id, but the state machine knows them by name
fn status_id(repo: &dyn TxStatusesRepo, name: TxStatusName) -> Result<TxStatusId, Error> {
    repo.get_by_name(name)
        .map_err(ectx!(try ErrorKind::Internal => name))?
        .map(|status| status.id)
        .ok_or(ectx!(try err ErrorContext::StatusNotFound, ErrorKind::Internal => name))
}
