use std::fmt;
use std::fmt::Display;

use failure::{Backtrace, Context, Fail};

#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

/// Statuses collaborators answer with are kept distinct, the rest of 5xx is `Server`
#[allow(dead_code)]
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "http client error - bad request")]
    BadRequest,
    #[fail(display = "http client error - unauthorized")]
    Unauthorized,
    #[fail(display = "http client error - not found")]
    NotFound,
    #[fail(display = "http client error - unprocessable entity: {}", _0)]
    Validation(String),
    #[fail(display = "http client error - too many requests")]
    TooManyRequests,
    #[fail(display = "http client error - server responded with status {}", _0)]
    Server(u16),
    #[fail(display = "http client error - internal error")]
    Internal,
}

#[allow(dead_code)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorSource {
    #[fail(display = "http client source - error inside of Hyper library")]
    Hyper,
    #[fail(display = "http client source - server returned response with error")]
    Server,
    #[fail(display = "http client source - response body is not utf8")]
    Utf8,
}

derive_error_impls!();
