//! Rate limiter, message bus, and latest-value cache shared across every `hyperquant`
//! component that talks to a venue or publishes market data (spec §4.4, §4.10).

/// Token-bucket [`rate_limit::RateLimiter`] (spec §4.4).
pub mod rate_limit;

/// Process-wide in-memory pub/sub [`bus::MessageBus`] (spec §4.10).
pub mod bus;

/// Latest-value [`cache::Cache`] for market data (spec §4.10).
pub mod cache;

pub use bus::{BusEvent, MessageBus};
pub use cache::Cache;
pub use rate_limit::{Priority, RateLimiter};
