//! Deterministic event-driven historical replay sharing the order/position contracts with
//! live execution (spec §4.13).

pub mod candle;
pub mod engine;
pub mod executor;
pub mod export;
pub mod stats;
pub mod strategy;

pub use candle::Candle;
pub use engine::{BacktestConfig, BacktestEngine, BacktestResult, ClosedTrade};
pub use executor::{Fill, OrderExecutor};
pub use stats::{EquityPoint, Metrics};
pub use strategy::{EntrySignal, Strategy};
