//! Strategy signal contract (spec §4.13 step 3/4, §8 "Look-ahead freedom").
//!
//! A strategy's decision at index *i* may only read candles and indicators at indices
//! `[0, i]`. Rather than trusting callers to respect that by convention, [`BacktestEngine`]
//! passes each strategy method a slice truncated to `..=i` — there is no later candle
//! reachable through the API, so a look-ahead bug can't be expressed in the first place.
//!
//! [`BacktestEngine`]: crate::engine::BacktestEngine

use crate::candle::Candle;
use hq_core::types::Side;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntrySignal {
    pub side: Side,
    pub size: Decimal,
}

/// A strategy plugged into the backtest/paper engines. `visible` is always `&candles[..=i]`
/// for the current index *i* — the strategy has no way to read ahead.
pub trait Strategy {
    /// Called only when no position is open for the pair.
    fn entry_signal(&mut self, visible: &[Candle]) -> Option<EntrySignal>;

    /// Called only when a position is open for the pair. Returning `true` closes it.
    fn exit_signal(&mut self, visible: &[Candle]) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use hq_core::time::Timestamp;
    use hq_core::types::TradingPair;
    use rust_decimal_macros::dec;

    fn candle(close: Decimal) -> Candle {
        Candle {
            pair: TradingPair::new("BTC", "USDC"),
            open: close,
            high: close,
            low: close,
            close,
            volume: dec!(1),
            timestamp: Timestamp::from_millis(0),
        }
    }

    // Scenario S5's strategy: enter at i=1, exit at i=2, both keyed only off `visible.len()`.
    struct FixedIndexStrategy;

    impl Strategy for FixedIndexStrategy {
        fn entry_signal(&mut self, visible: &[Candle]) -> Option<EntrySignal> {
            (visible.len() == 2).then_some(EntrySignal {
                side: Side::Buy,
                size: dec!(1),
            })
        }

        fn exit_signal(&mut self, visible: &[Candle]) -> bool {
            visible.len() == 3
        }
    }

    #[test]
    fn strategy_only_sees_candles_up_to_the_current_index() {
        let mut strategy = FixedIndexStrategy;
        let all = vec![candle(dec!(100)), candle(dec!(105)), candle(dec!(110))];

        assert!(strategy.entry_signal(&all[..=0]).is_none());
        assert!(strategy.entry_signal(&all[..=1]).is_some());
        assert!(!strategy.exit_signal(&all[..=1]));
        assert!(strategy.exit_signal(&all[..=2]));
    }
}
