//! Historical OHLCV bar fed to the replay loop (spec §4.13).

use hq_core::time::Timestamp;
use hq_core::types::TradingPair;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub pair: TradingPair,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    pub timestamp: Timestamp,
}
