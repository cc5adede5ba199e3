//! Clients of the http collaborators: fiat rates and user notifications.
//! Chain nodes are reached through `blockchain` adapters instead.

pub mod http_client;
pub mod notifications;
pub mod rates;

pub use self::http_client::*;
pub use self::notifications::*;
pub use self::rates::*;
