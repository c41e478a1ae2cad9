//! Unified types, [`Decimal`](rust_decimal::Decimal)/[`Timestamp`] primitives and the
//! layered error taxonomy shared by every `hyperquant` crate.

/// Decimal arithmetic helpers layered on top of [`rust_decimal::Decimal`].
pub mod decimal;

/// Millisecond-precision UTC [`Timestamp`] with k-line alignment.
pub mod time;

/// Layered error taxonomy (§7): Network / Api / Data / Business / System.
pub mod error;

/// Unified market and account types: [`TradingPair`](types::TradingPair),
/// [`Order`](types::Order), [`Ticker`](types::Ticker), [`Position`](types::Position), etc.
pub mod types;

/// Bidirectional mapping between unified [`TradingPair`](types::TradingPair)s and
/// venue-native symbols.
pub mod symbol;

/// Price-level order book ladder with snapshot/delta updates.
pub mod book;

pub use error::{Error, Result};
pub use time::Timestamp;
