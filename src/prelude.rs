//! Imports shared by repos, services and blockchain adapters

pub use diesel::prelude::*;
pub use failure::Fail;
pub use futures::future::{self, Either, Loop};
pub use futures::prelude::*;

use diesel::r2d2::ConnectionManager;
use diesel::PgConnection;
use r2d2::{Pool, PooledConnection};

pub type PgPool = Pool<ConnectionManager<PgConnection>>;
pub type PgPooledConnection = PooledConnection<ConnectionManager<PgConnection>>;
