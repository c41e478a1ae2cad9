//! Data engine, execution engine, and the live trading tick scheduler (spec §4.11–§4.12,
//! §5).

pub mod data;
pub mod execution;
pub mod live;

pub use data::{DataEngine, DataEngineStats};
pub use execution::{ExecutionEngine, ExecutionEngineStats, ExecutionLimits};
pub use live::LiveTradingEngine;
