use std::fmt;
use std::fmt::Display;

use failure::{Backtrace, Context, Fail};
use validator::ValidationErrors;

use blockchain::ErrorKind as BlockchainErrorKind;
use client::notifications::ErrorKind as NotificationsErrorKind;
use client::rates::ErrorKind as RatesErrorKind;
use repos::{Error as ReposError, ErrorKind as ReposErrorKind};

#[derive(Debug)]
pub struct Error {
    inner: Context<ErrorKind>,
}

#[allow(dead_code)]
#[derive(Clone, Debug, Fail)]
pub enum ErrorKind {
    #[fail(display = "service error - invalid input, errors: {}", _0)]
    InvalidInput(ValidationErrors),
    #[fail(display = "service error - already exists")]
    AlreadyExists,
    #[fail(display = "service error - not found")]
    NotFound,
    #[fail(display = "service error - no such coin")]
    NoSuchCoin,
    #[fail(display = "service error - no such wallet")]
    NoSuchWallet,
    #[fail(display = "service error - no such transaction")]
    NoSuchTx,
    #[fail(display = "service error - coin does not support the operation")]
    NotImplemented,
    #[fail(display = "service error - coin is not supported")]
    CoinUnsupported,
    #[fail(display = "service error - address is invalid")]
    AddressInvalid,
    #[fail(display = "service error - malformed input")]
    MalformedInput,
    #[fail(display = "service error - internal error")]
    Internal,
}

#[allow(dead_code)]
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorContext {
    #[fail(display = "service error context - amount is zero")]
    ZeroAmount,
    #[fail(display = "service error context - amount is negative")]
    NegativeAmount,
    #[fail(display = "service error context - coin is disabled")]
    CoinDisabled,
    #[fail(display = "service error context - tx status is missing from tx_statuses")]
    StatusNotFound,
    #[fail(display = "service error context - tx status was changed concurrently")]
    StatusChanged,
    #[fail(display = "service error context - every confirmation check failed: {:?}", _0)]
    AllConfirmationsFailed(Vec<String>),
    #[fail(display = "service error context - some confirmation checks failed: {:?}", _0)]
    PartialConfirmations(Vec<String>),
    #[fail(display = "service error context - error sending notification")]
    Notification,
    #[fail(display = "service error context - error linking pending txs to a new wallet")]
    RecipientCreated,
    #[fail(display = "service error context - error in sweeper tick")]
    Sweep,
}

derive_error_impls!();

impl From<ReposError> for Error {
    fn from(e: ReposError) -> Error {
        let kind: ErrorKind = e.kind().into();
        ectx!(err e, kind)
    }
}

impl From<ReposErrorKind> for ErrorKind {
    fn from(err: ReposErrorKind) -> Self {
        match err {
            ReposErrorKind::Constraints(_) | ReposErrorKind::Conflict | ReposErrorKind::Internal => ErrorKind::Internal,
        }
    }
}

impl From<BlockchainErrorKind> for ErrorKind {
    fn from(err: BlockchainErrorKind) -> Self {
        match err {
            BlockchainErrorKind::CoinUnsupported => ErrorKind::CoinUnsupported,
            BlockchainErrorKind::NoSuchCoin => ErrorKind::NoSuchCoin,
            BlockchainErrorKind::NotImplemented => ErrorKind::NotImplemented,
            BlockchainErrorKind::AddressInvalid => ErrorKind::AddressInvalid,
            BlockchainErrorKind::NoSuchTx => ErrorKind::NoSuchTx,
            BlockchainErrorKind::MalformedInput => ErrorKind::MalformedInput,
            BlockchainErrorKind::NetworkMismatch
            | BlockchainErrorKind::Closed
            | BlockchainErrorKind::Rpc(_)
            | BlockchainErrorKind::Internal => ErrorKind::Internal,
        }
    }
}

impl From<RatesErrorKind> for ErrorKind {
    fn from(err: RatesErrorKind) -> Self {
        match err {
            RatesErrorKind::MalformedInput => ErrorKind::MalformedInput,
            RatesErrorKind::NotFound => ErrorKind::NotFound,
            RatesErrorKind::Internal => ErrorKind::Internal,
        }
    }
}

impl From<NotificationsErrorKind> for ErrorKind {
    fn from(err: NotificationsErrorKind) -> Self {
        match err {
            NotificationsErrorKind::MalformedInput => ErrorKind::MalformedInput,
            NotificationsErrorKind::Internal => ErrorKind::Internal,
        }
    }
}
