//! JSON and CSV export of a [`BacktestResult`] (spec §6 "Persisted artefacts"): JSON
//! carries the full result, CSV splits into a flat `trades.csv` and `equity.csv`.

use crate::engine::BacktestResult;
use hq_core::Result;
use serde::Serialize;
use std::io::Write;

use hq_core::error::DataError;

pub fn to_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result)
        .map_err(|e| DataError::ParseError(e.to_string()).into())
}

#[derive(Serialize)]
struct TradeRow<'a> {
    pair: String,
    side: &'a str,
    entry_price: String,
    exit_price: String,
    size: String,
    commission: String,
    gross_pnl: String,
    net_pnl: String,
    entry_ts: String,
    exit_ts: String,
}

#[derive(Serialize)]
struct EquityRow {
    ts: String,
    equity: String,
}

/// Write `trades.csv` to `writer`.
pub fn write_trades_csv(result: &BacktestResult, writer: impl Write) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for trade in &result.trades {
        let row = TradeRow {
            pair: trade.pair.symbol().to_string(),
            side: match trade.side {
                hq_core::types::Side::Buy => "buy",
                hq_core::types::Side::Sell => "sell",
            },
            entry_price: trade.entry_price.to_string(),
            exit_price: trade.exit_price.to_string(),
            size: trade.size.to_string(),
            commission: trade.commission.to_string(),
            gross_pnl: trade.gross_pnl.to_string(),
            net_pnl: trade.net_pnl.to_string(),
            entry_ts: trade.entry_ts.to_string(),
            exit_ts: trade.exit_ts.to_string(),
        };
        csv_writer
            .serialize(row)
            .map_err(|e| DataError::ParseError(e.to_string()))?;
    }
    csv_writer
        .flush()
        .map_err(|e| DataError::ParseError(e.to_string()))?;
    Ok(())
}

/// Write `equity.csv` to `writer`.
pub fn write_equity_csv(result: &BacktestResult, writer: impl Write) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for point in &result.equity_curve {
        let row = EquityRow {
            ts: point.ts.to_string(),
            equity: point.equity.to_string(),
        };
        csv_writer
            .serialize(row)
            .map_err(|e| DataError::ParseError(e.to_string()))?;
    }
    csv_writer
        .flush()
        .map_err(|e| DataError::ParseError(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{BacktestConfig, ClosedTrade};
    use crate::stats::{self, EquityPoint};
    use hq_core::time::Timestamp;
    use hq_core::types::{Side, TradingPair};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn sample_result() -> BacktestResult {
        let trades = vec![ClosedTrade {
            pair: TradingPair::new("BTC", "USDC"),
            side: Side::Buy,
            entry_price: dec!(105),
            exit_price: dec!(110),
            size: dec!(1),
            commission: dec!(0.215),
            gross_pnl: dec!(5),
            net_pnl: dec!(4.785),
            entry_ts: Timestamp::from_millis(1),
            exit_ts: Timestamp::from_millis(2),
        }];
        let equity_curve = vec![EquityPoint {
            ts: Timestamp::from_millis(2),
            equity: dec!(10004.785),
        }];
        let metrics = stats::compute(&trades, &equity_curve);
        BacktestResult {
            config: BacktestConfig {
                initial_capital: dec!(10000),
                slippage: Decimal::ZERO,
                commission_rate: dec!(0.001),
            },
            trades,
            equity_curve,
            metrics,
        }
    }

    #[test]
    fn json_export_round_trips_through_serde() {
        let result = sample_result();
        let json = to_json(&result).unwrap();
        let parsed: BacktestResult = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.trades.len(), 1);
        assert_eq!(parsed.trades[0].net_pnl, dec!(4.785));
    }

    #[test]
    fn csv_exports_contain_expected_columns() {
        let result = sample_result();
        let mut trades_buf = Vec::new();
        write_trades_csv(&result, &mut trades_buf).unwrap();
        let trades_csv = String::from_utf8(trades_buf).unwrap();
        assert!(trades_csv.starts_with("pair,side,entry_price"));
        assert!(trades_csv.contains("4.785"));

        let mut equity_buf = Vec::new();
        write_equity_csv(&result, &mut equity_buf).unwrap();
        let equity_csv = String::from_utf8(equity_buf).unwrap();
        assert!(equity_csv.starts_with("ts,equity"));
        assert!(equity_csv.contains("10004.785"));
    }
}
