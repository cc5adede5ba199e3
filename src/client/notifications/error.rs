use std::fmt;
use std::fmt::Display;

use failure::{Backtrace, Context, Fail};

#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

#[allow(dead_code)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "notifications client error - malformed input")]
    MalformedInput,
    #[fail(display = "notifications client error - internal error")]
    Internal,
}

#[allow(dead_code)]
#[derive(Copy, Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorSource {
    #[fail(display = "notifications client source - error inside of Hyper library")]
    Hyper,
    #[fail(display = "notifications client source - error serializing payload")]
    Json,
}

derive_error_impls!();
