use super::error::Error;

/// Repos are synchronous, they are meant to be called inside `DbExecutor` closures
pub type RepoResult<T> = Result<T, Error>;
