//! Paper trading simulator (spec §4.14): an `Exchange` implementation that never touches a
//! real venue, sharing its fill model with `hq-backtest` and its position bookkeeping with
//! the live stack.

pub mod simulator;

pub use hq_backtest::EquityPoint;
pub use simulator::PaperExchange;
