use std::cell::RefCell;

use diesel::connection::{AnsiTransactionManager, TransactionManager};
use diesel::pg::PgConnection;
use futures_cpupool::CpuPool;

use super::error::*;
use prelude::*;

thread_local! {
    pub static DB_CONN: RefCell<Option<PgPooledConnection>> = RefCell::new(None)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Isolation {
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl Isolation {
    fn begin_sql(&self) -> &'static str {
        match self {
            Isolation::ReadCommitted => "BEGIN TRANSACTION ISOLATION LEVEL READ COMMITTED",
            Isolation::RepeatableRead => "BEGIN TRANSACTION ISOLATION LEVEL REPEATABLE READ",
            Isolation::Serializable => "BEGIN TRANSACTION ISOLATION LEVEL SERIALIZABLE",
        }
    }
}

/// One of these methods should be used anytime you use Repo methods.
/// It effectively put a db connection to thread local storage, so that repo can use it.
/// This trait is also responsible for removing unhealthy connections from tls.
/// I.e. it provides guarantees that repo inside DbExecutor's method closure will get healthy connection
/// or if not, DbExecutor will heal it next time.
pub trait DbExecutor: Clone + Send + Sync + 'static {
    /// Execute some statements, basically queries
    fn execute<F, T, E>(&self, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Send + 'static;

    /// Execute mutations and queries inside one transaction.
    ///
    /// Commits only if `f` returns `Ok`. On `Err` and on panic inside `f` the transaction is rolled back.
    fn execute_transaction_with_isolation<F, T, E>(&self, isolation: Isolation, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Send + 'static;

    /// Same as `execute_transaction_with_isolation` with postgres default isolation
    fn execute_transaction<F, T, E>(&self, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Send + 'static,
    {
        self.execute_transaction_with_isolation(Isolation::ReadCommitted, f)
    }

    /// Execute mutations that will be rolled back. This is useful for tests, when you
    /// don't want to pollute your database
    #[cfg(test)]
    fn execute_test_transaction<F, T, E>(&self, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Send + 'static;
}

#[derive(Clone)]
pub struct DbExecutorImpl {
    db_pool: PgPool,
    db_thread_pool: CpuPool,
}

impl DbExecutorImpl {
    pub fn new(db_pool: PgPool, db_thread_pool: CpuPool) -> Self {
        Self { db_pool, db_thread_pool }
    }

    fn spawn_in_transaction<F, T, E>(&self, isolation: Isolation, commit: bool, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Send + 'static,
    {
        let db_pool = self.db_pool.clone();
        Box::new(self.db_thread_pool.spawn_fn(move || {
            DB_CONN.with(move |tls_conn_cell| -> Result<T, E> {
                put_connection_into_tls(&db_pool, tls_conn_cell)?;
                run_in_transaction(tls_conn_cell, isolation, commit, f).map_err(move |e| {
                    remove_connection_from_tls_if_broken(tls_conn_cell);
                    e
                })
            })
        }))
    }
}

impl DbExecutor for DbExecutorImpl {
    fn execute<F, T, E>(&self, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Send + 'static,
    {
        let db_pool = self.db_pool.clone();
        Box::new(self.db_thread_pool.spawn_fn(move || {
            DB_CONN.with(move |tls_conn_cell| -> Result<T, E> {
                put_connection_into_tls(&db_pool, tls_conn_cell)?;
                f().map_err(move |e| {
                    remove_connection_from_tls_if_broken(tls_conn_cell);
                    e
                })
            })
        }))
    }

    fn execute_transaction_with_isolation<F, T, E>(&self, isolation: Isolation, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Send + 'static,
    {
        self.spawn_in_transaction(isolation, true, f)
    }

    #[cfg(test)]
    fn execute_test_transaction<F, T, E>(&self, f: F) -> Box<Future<Item = T, Error = E> + Send + 'static>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, E> + Send + 'static,
        E: From<Error> + Send + 'static,
    {
        self.spawn_in_transaction(Isolation::ReadCommitted, false, f)
    }
}

/// Open transaction on a connection. Rolls back on drop unless committed,
/// so both an `Err` from the closure and a panic unwinding through it end with a rollback.
struct TransactionGuard<'a> {
    conn: &'a PgConnection,
    open: bool,
}

impl<'a> TransactionGuard<'a> {
    fn begin(conn: &'a PgConnection, isolation: Isolation) -> Result<Self, Error> {
        let manager: &AnsiTransactionManager = conn.transaction_manager();
        manager
            .begin_transaction_sql(conn, isolation.begin_sql())
            .map_err(ectx!(try ErrorSource::Diesel, ErrorContext::Begin, ErrorKind::Internal => isolation))?;
        Ok(TransactionGuard { conn, open: true })
    }

    fn commit(mut self) -> Result<(), Error> {
        self.conn
            .transaction_manager()
            .commit_transaction(self.conn)
            .map_err(ectx!(try ErrorSource::Diesel, ErrorContext::Commit, ErrorKind::Internal))?;
        self.open = false;
        Ok(())
    }
}

impl<'a> Drop for TransactionGuard<'a> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.conn.transaction_manager().rollback_transaction(self.conn) {
                error!("Failed to rollback db transaction: {}", e);
            }
        }
    }
}

fn run_in_transaction<F, T, E>(
    tls_conn_cell: &RefCell<Option<PgPooledConnection>>,
    isolation: Isolation,
    commit: bool,
    f: F,
) -> Result<T, E>
where
    F: FnOnce() -> Result<T, E>,
    E: From<Error>,
{
    let maybe_conn = tls_conn_cell.borrow();
    let conn = maybe_conn
        .as_ref()
        .ok_or(ectx!(try err ErrorContext::Connection, ErrorKind::Internal))?;
    let transaction = TransactionGuard::begin(conn, isolation)?;
    let value = f()?;
    if commit {
        transaction.commit()?;
    }
    Ok(value)
}

/// This method should be called inside repos for obtaining connections from
/// thread local storage
pub fn with_tls_connection<F, T>(f: F) -> Result<T, Error>
where
    F: FnOnce(&PgConnection) -> Result<T, Error>,
{
    DB_CONN.with(|tls_conn_cell| -> Result<T, Error> {
        let maybe_conn = tls_conn_cell.borrow();
        let conn_ref = maybe_conn
            .as_ref()
            .ok_or(ectx!(try err ErrorContext::Connection, ErrorKind::Internal))?;
        f(conn_ref)
    })
}

/// Checkout connection from db_pool and put it into thead local storage
/// if there is no connection already in thread local storage
fn put_connection_into_tls(db_pool: &PgPool, tls_conn_cell: &RefCell<Option<PgPooledConnection>>) -> Result<(), Error> {
    let mut maybe_conn = tls_conn_cell.borrow_mut();
    if maybe_conn.is_none() {
        match db_pool.get() {
            Ok(conn) => *maybe_conn = Some(conn),
            Err(e) => {
                let e: Error = ectx!(err e, ErrorSource::R2D2, ErrorKind::Internal);
                return Err(e);
            }
        }
    }
    Ok(())
}

/// Check if connection is broken and if so - remove from tls.
/// Select 1 is used for checking connection health, like in Diesel framework
fn remove_connection_from_tls_if_broken(tls_conn_cell: &RefCell<Option<PgPooledConnection>>) {
    let mut maybe_conn = tls_conn_cell.borrow_mut();
    let is_broken = match *maybe_conn {
        Some(ref conn) => conn.execute("SELECT 1").is_err(),
        None => false,
    };
    if is_broken {
        *maybe_conn = None;
    }
}
