//! Layered error taxonomy (spec §7): Network / Api / Data / Business / System.
//!
//! Every crate downstream of `hq-core` defines its own narrow error enum and converts it
//! into [`Error`] via `#[from]`, mirroring `barter/src/error.rs`'s aggregation of
//! `DataError`/`ExecutionError`/`IndexError` into one `BarterError`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, Error)]
pub enum Error {
    #[error("network: {0}")]
    Network(#[from] NetworkError),

    #[error("api: {0}")]
    Api(#[from] ApiError),

    #[error("data: {0}")]
    Data(#[from] DataError),

    #[error("business: {0}")]
    Business(#[from] BusinessError),

    #[error("system: {0}")]
    System(#[from] SystemError),
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, Error)]
pub enum NetworkError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("TLS failure: {0}")]
    TlsFailure(String),
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, Error)]
pub enum ApiError {
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("unauthorized")]
    Unauthorized,

    #[error("server error: {0}")]
    ServerError(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("signer required for this operation")]
    SignerRequired,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, Error)]
pub enum DataError {
    #[error("parse error: {0}")]
    ParseError(String),

    #[error("invalid symbol format: {0}")]
    InvalidSymbolFormat(String),

    #[error("unsupported quote currency: {0}")]
    UnsupportedQuoteCurrency(String),

    #[error("symbol not found: {0}")]
    SymbolNotFound(String),

    #[error("no price available for {0}")]
    NoPriceAvailable(String),

    #[error("asset not found: {0}")]
    AssetNotFound(String),
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, Error)]
pub enum BusinessError {
    #[error("order rejected: {0}")]
    OrderRejected(String),

    #[error("order not found")]
    OrderNotFound,

    #[error("order not cancellable in its current state")]
    OrderNotCancellable,

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("exceeds max position size")]
    ExceedsMaxPositionSize,

    #[error("exceeds max leverage")]
    ExceedsMaxLeverage,

    #[error("limit order requires a price")]
    LimitOrderRequiresPrice,

    #[error("market order should not have a price")]
    MarketOrderShouldNotHavePrice,

    #[error("invalid amount")]
    InvalidAmount,

    #[error("invalid price")]
    InvalidPrice,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize, Error)]
pub enum SystemError {
    #[error("out of memory")]
    OutOfMemory,

    #[error("no exchange registered")]
    NoExchangeRegistered,
}
