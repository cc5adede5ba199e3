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
    #[fail(display = "rates client error - malformed input")]
    MalformedInput,
    #[fail(display = "rates client error - no rate for the pair")]
    NotFound,
    #[fail(display = "rates client error - internal error")]
    Internal,
}

#[allow(dead_code)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorSource {
    #[fail(display = "rates client source - error inside of Hyper library")]
    Hyper,
    #[fail(display = "rates client source - error encoding query string")]
    SerdeQs,
    #[fail(display = "rates client source - error parsing bytes to utf8")]
    Utf8,
    #[fail(display = "rates client source - error parsing string to json")]
    Json,
}

derive_error_impls!();

impl From<HttpClientErrorKind> for ErrorKind {
    fn from(err: HttpClientErrorKind) -> Self {
        match err {
            HttpClientErrorKind::NotFound => ErrorKind::NotFound,
            HttpClientErrorKind::BadRequest | HttpClientErrorKind::Validation(_) => ErrorKind::MalformedInput,
            _ => ErrorKind::Internal,
        }
    }
}
