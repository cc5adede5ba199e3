use std::fmt;
use std::fmt::Display;

use failure::{Backtrace, Context, Fail};

use client::http_client::error::ErrorKind as HttpClientErrorKind;

#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

#[allow(dead_code)]
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "blockchain error - no adapter registered for the coin")]
    CoinUnsupported,
    #[fail(display = "blockchain error - coin was not dialed")]
    NoSuchCoin,
    #[fail(display = "blockchain error - coin adapter does not implement the service")]
    NotImplemented,
    #[fail(display = "blockchain error - address is invalid")]
    AddressInvalid,
    #[fail(display = "blockchain error - no such transaction")]
    NoSuchTx,
    #[fail(display = "blockchain error - node network does not match the configured one")]
    NetworkMismatch,
    #[fail(display = "blockchain error - malformed input")]
    MalformedInput,
    #[fail(display = "blockchain error - adapter is closed")]
    Closed,
    #[fail(display = "blockchain error - node rpc error with code {}", _0)]
    Rpc(i64),
    #[fail(display = "blockchain error - internal error")]
    Internal,
}

#[allow(dead_code)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorSource {
    #[fail(display = "blockchain source - error inside of Hyper library")]
    Hyper,
    #[fail(display = "blockchain source - error parsing bytes to utf8")]
    Utf8,
    #[fail(display = "blockchain source - error parsing string to json")]
    Json,
    #[fail(display = "blockchain source - error encoding query string")]
    SerdeQs,
    #[fail(display = "blockchain source - node returned rpc error")]
    Rpc,
    #[fail(display = "blockchain source - block explorer returned error")]
    Explorer,
    #[fail(display = "blockchain source - error inside of tokio timer")]
    Timer,
}

#[allow(dead_code)]
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorContext {
    #[fail(display = "blockchain context - error dialing coin node")]
    Dial,
    #[fail(display = "blockchain context - error closing adapters: {:?}", _0)]
    Close(Vec<String>),
    #[fail(display = "blockchain context - error parsing amount")]
    Amount,
    #[fail(display = "blockchain context - error parsing hex quantity")]
    Hex,
    #[fail(display = "blockchain context - explorer rate limit was hit too many times")]
    RateLimit,
    #[fail(display = "blockchain context - every balance query of the account failed")]
    AllBalancesFailed,
    #[fail(display = "blockchain context - some balance queries of the account failed: {:?}", _0)]
    PartialBalances(Vec<String>),
    #[fail(display = "blockchain context - error in watcher loop tick")]
    WatcherTick,
}

derive_error_impls!();

impl From<HttpClientErrorKind> for ErrorKind {
    fn from(err: HttpClientErrorKind) -> Self {
        match err {
            HttpClientErrorKind::BadRequest | HttpClientErrorKind::Validation(_) => ErrorKind::MalformedInput,
            _ => ErrorKind::Internal,
        }
    }
}
