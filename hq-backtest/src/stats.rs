//! Performance metrics derived from a completed backtest (spec §4.13), grounded in the
//! same ratio/drawdown formulas as `barter/src/statistic/metric/*` but flattened to plain
//! functions over an equity curve and trade list rather than the generic `TimeInterval`
//! machinery, since this engine only ever reports the daily/annualized pair.

use crate::engine::ClosedTrade;
use rust_decimal::prelude::{ToPrimitive, Zero};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const TRADING_DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub ts: hq_core::time::Timestamp,
    pub equity: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub total_pnl: Decimal,
    pub net_pnl: Decimal,
    pub profit_factor: f64,
    pub average_win: Decimal,
    pub average_loss: Decimal,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub expectancy: Decimal,
}

/// Per-trade realized PnL, net of commission on both legs.
pub fn trade_net_pnls(trades: &[ClosedTrade]) -> Vec<Decimal> {
    trades.iter().map(|t| t.net_pnl).collect()
}

/// Daily simple returns derived from consecutive equity points (spec: "annualized daily
/// returns").
fn daily_returns(curve: &[EquityPoint]) -> Vec<f64> {
    curve
        .windows(2)
        .filter_map(|pair| {
            let prev = pair[0].equity.to_f64()?;
            let next = pair[1].equity.to_f64()?;
            if prev == 0.0 {
                None
            } else {
                Some((next - prev) / prev)
            }
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Sample standard deviation (n-1 denominator); `0.0` for fewer than two points.
fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

/// Max drawdown (peak-to-trough, fraction of peak). Peak tracking starts at index 0, which
/// means a strictly rising curve reports `0.0` rather than treating the first point as an
/// uninitialized peak — a documented off-by-one pitfall the source carried.
pub fn max_drawdown(curve: &[EquityPoint]) -> f64 {
    if curve.is_empty() {
        return 0.0;
    }
    let mut peak = curve[0].equity;
    let mut worst = Decimal::ZERO;
    for point in curve {
        if point.equity > peak {
            peak = point.equity;
        }
        if !peak.is_zero() {
            let drawdown = (point.equity - peak) / peak;
            if drawdown < worst {
                worst = drawdown;
            }
        }
    }
    worst.to_f64().unwrap_or(0.0)
}

fn sharpe_ratio(returns: &[f64]) -> f64 {
    let std_dev = sample_stdev(returns);
    if std_dev == 0.0 {
        return if mean(returns) > 0.0 { f64::INFINITY } else { 0.0 };
    }
    (mean(returns) / std_dev) * TRADING_DAYS_PER_YEAR.sqrt()
}

fn sortino_ratio(returns: &[f64]) -> f64 {
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let downside_dev = sample_stdev(&downside);
    if downside_dev == 0.0 {
        return if mean(returns) > 0.0 { f64::INFINITY } else { 0.0 };
    }
    (mean(returns) / downside_dev) * TRADING_DAYS_PER_YEAR.sqrt()
}

fn calmar_ratio(returns: &[f64], max_dd: f64) -> f64 {
    if max_dd == 0.0 {
        return if mean(returns) > 0.0 { f64::INFINITY } else { 0.0 };
    }
    (mean(returns) * TRADING_DAYS_PER_YEAR) / max_dd.abs()
}

/// Build the full [`Metrics`] report from the trade list and equity curve.
pub fn compute(trades: &[ClosedTrade], curve: &[EquityPoint]) -> Metrics {
    let net_pnls = trade_net_pnls(trades);
    let total_trades = net_pnls.len();

    let wins: Vec<Decimal> = net_pnls.iter().copied().filter(|p| *p > Decimal::ZERO).collect();
    let losses: Vec<Decimal> = net_pnls.iter().copied().filter(|p| *p < Decimal::ZERO).collect();

    let gross_profit: Decimal = wins.iter().sum();
    let gross_loss: Decimal = losses.iter().map(|l| l.abs()).sum();
    let net_pnl: Decimal = net_pnls.iter().sum();

    let win_rate = if total_trades == 0 {
        0.0
    } else {
        wins.len() as f64 / total_trades as f64
    };

    let profit_factor = if gross_loss.is_zero() {
        if gross_profit.is_zero() { 1.0 } else { f64::INFINITY }
    } else {
        (gross_profit / gross_loss).to_f64().unwrap_or(0.0)
    };

    let average_win = if wins.is_empty() {
        Decimal::ZERO
    } else {
        gross_profit / Decimal::from(wins.len() as u64)
    };
    let average_loss = if losses.is_empty() {
        Decimal::ZERO
    } else {
        -gross_loss / Decimal::from(losses.len() as u64)
    };

    let returns = daily_returns(curve);
    let max_dd = max_drawdown(curve);

    let expectancy = if total_trades == 0 {
        Decimal::ZERO
    } else {
        net_pnl / Decimal::from(total_trades as u64)
    };

    Metrics {
        total_trades,
        winning_trades: wins.len(),
        losing_trades: losses.len(),
        win_rate,
        total_pnl: gross_profit - gross_loss,
        net_pnl,
        profit_factor,
        average_win,
        average_loss,
        max_drawdown: max_dd,
        sharpe_ratio: sharpe_ratio(&returns),
        sortino_ratio: sortino_ratio(&returns),
        calmar_ratio: calmar_ratio(&returns, max_dd),
        expectancy,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hq_core::time::Timestamp;
    use rust_decimal_macros::dec;

    fn point(ms: i64, equity: Decimal) -> EquityPoint {
        EquityPoint {
            ts: Timestamp::from_millis(ms),
            equity,
        }
    }

    #[test]
    fn max_drawdown_is_zero_for_a_strictly_rising_curve() {
        let curve = vec![point(0, dec!(100)), point(1, dec!(110)), point(2, dec!(120))];
        assert_eq!(max_drawdown(&curve), 0.0);
    }

    #[test]
    fn max_drawdown_finds_the_deepest_peak_to_trough_decline() {
        let curve = vec![
            point(0, dec!(100)),
            point(1, dec!(120)),
            point(2, dec!(90)),
            point(3, dec!(130)),
        ];
        let dd = max_drawdown(&curve);
        assert!((dd - (-0.25)).abs() < 1e-9);
    }

    #[test]
    fn win_rate_and_profit_factor_on_mixed_trades() {
        let trade = |net_pnl: Decimal| ClosedTrade {
            pair: hq_core::types::TradingPair::new("BTC", "USDC"),
            side: hq_core::types::Side::Buy,
            entry_price: dec!(0),
            exit_price: dec!(0),
            size: dec!(0),
            commission: dec!(0),
            gross_pnl: net_pnl,
            net_pnl,
            entry_ts: Timestamp::from_millis(0),
            exit_ts: Timestamp::from_millis(0),
        };
        let trades = vec![trade(dec!(10)), trade(dec!(-5))];
        let metrics = compute(&trades, &[]);
        assert_eq!(metrics.total_trades, 2);
        assert_eq!(metrics.winning_trades, 1);
        assert_eq!(metrics.losing_trades, 1);
        assert_eq!(metrics.win_rate, 0.5);
        assert_eq!(metrics.profit_factor, 2.0);
        assert_eq!(metrics.net_pnl, dec!(5));
    }
}
