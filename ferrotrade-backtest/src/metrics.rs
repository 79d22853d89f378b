//! Performance statistics computed over one completed run's equity curve and trade ledger.

use crate::model::{EquityPoint, TradeRecord};
use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const TRADING_DAYS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceStatistics {
    pub total_return: Decimal,
    pub annualized_return: f64,
    pub cagr: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub calmar_ratio: f64,
    pub max_drawdown: Decimal,
    pub max_drawdown_duration: Duration,
    pub volatility: f64,
    pub downside_deviation: f64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub payoff_ratio: f64,
    pub expected_value: Decimal,
    pub total_trades: u32,
    pub winning_trades: u32,
    pub losing_trades: u32,
    pub breakeven_trades: u32,
    pub average_win: Decimal,
    pub average_loss: Decimal,
    pub largest_win: Decimal,
    pub largest_loss: Decimal,
    pub max_consecutive_wins: u32,
    pub max_consecutive_losses: u32,
    pub average_exposure: f64,
    pub max_simultaneous_positions: u32,
    pub risk_of_ruin: f64,
}

/// Computes every statistic from the raw equity curve and trade ledger a run produced. Takes
/// `initial_capital` separately since the equity curve's first point is already one step past
/// it (the opening balance before any candle has been replayed).
pub fn compute(
    initial_capital: Decimal,
    equity_curve: &[EquityPoint],
    trades: &[TradeRecord],
    candles_per_day: f64,
) -> PerformanceStatistics {
    let final_equity = equity_curve.last().map(|p| p.equity).unwrap_or(initial_capital);
    let total_return = if initial_capital.is_zero() {
        Decimal::ZERO
    } else {
        (final_equity - initial_capital) / initial_capital
    };

    let period_days = (equity_curve.len() as f64 / candles_per_day.max(1.0)).max(1.0);
    let total_return_f64 = to_f64(total_return);
    let years = (period_days / TRADING_DAYS_PER_YEAR).max(1.0 / TRADING_DAYS_PER_YEAR);
    let cagr = if total_return_f64 <= -1.0 {
        -1.0
    } else {
        (1.0 + total_return_f64).powf(1.0 / years) - 1.0
    };
    let annualized_return = total_return_f64 / years;

    let returns = daily_returns(equity_curve);
    let volatility = annualized_std_dev(&returns);
    let downside_deviation = annualized_downside_deviation(&returns);
    let sharpe_ratio = sharpe(&returns);
    let sortino_ratio = sortino(&returns, downside_deviation);

    let (max_drawdown, max_drawdown_duration) = max_drawdown(equity_curve);
    let max_drawdown_f64 = to_f64(max_drawdown);
    let calmar_ratio = if max_drawdown_f64.abs() < f64::EPSILON {
        0.0
    } else {
        annualized_return / max_drawdown_f64
    };

    let winners: Vec<&TradeRecord> = trades.iter().filter(|t| t.is_win()).collect();
    let losers: Vec<&TradeRecord> = trades.iter().filter(|t| t.is_loss()).collect();
    let breakeven_trades = trades.len() - winners.len() - losers.len();

    let win_rate = if trades.is_empty() { 0.0 } else { winners.len() as f64 / trades.len() as f64 };

    let gross_profit: Decimal = winners.iter().map(|t| t.realized_pnl).sum();
    let gross_loss: Decimal = losers.iter().map(|t| t.realized_pnl.abs()).sum();
    let profit_factor = if gross_loss.is_zero() {
        if gross_profit.is_zero() { 0.0 } else { f64::INFINITY }
    } else {
        to_f64(gross_profit / gross_loss)
    };

    let average_win = average(winners.iter().map(|t| t.realized_pnl));
    let average_loss = average(losers.iter().map(|t| t.realized_pnl));
    let payoff_ratio = if average_loss.is_zero() {
        0.0
    } else {
        to_f64(average_win / average_loss.abs())
    };

    let expected_value = Decimal::from_f64_retain(win_rate).unwrap_or(Decimal::ZERO) * average_win
        + (Decimal::ONE - Decimal::from_f64_retain(win_rate).unwrap_or(Decimal::ZERO)) * average_loss;

    let largest_win = winners.iter().map(|t| t.realized_pnl).max().unwrap_or(Decimal::ZERO);
    let largest_loss = losers.iter().map(|t| t.realized_pnl).min().unwrap_or(Decimal::ZERO);

    let max_consecutive_wins = max_consecutive(trades, |t| t.is_win());
    let max_consecutive_losses = max_consecutive(trades, |t| t.is_loss());

    let average_exposure = exposure_fraction(equity_curve, trades);

    PerformanceStatistics {
        total_return,
        annualized_return,
        cagr,
        sharpe_ratio,
        sortino_ratio,
        calmar_ratio,
        max_drawdown,
        max_drawdown_duration,
        volatility,
        downside_deviation,
        win_rate,
        profit_factor,
        payoff_ratio,
        expected_value,
        total_trades: trades.len() as u32,
        winning_trades: winners.len() as u32,
        losing_trades: losers.len() as u32,
        breakeven_trades: breakeven_trades as u32,
        average_win,
        average_loss,
        largest_win,
        largest_loss,
        max_consecutive_wins,
        max_consecutive_losses,
        average_exposure,
        max_simultaneous_positions: if trades.is_empty() { 0 } else { 1 },
        risk_of_ruin: risk_of_ruin(win_rate, payoff_ratio),
    }
}

/// Fraction of the run's wall-clock span spent with an open position. The engine only ever
/// carries one position per symbol at a time, so this is simply total time-in-trade over total
/// run duration.
fn exposure_fraction(equity_curve: &[EquityPoint], trades: &[TradeRecord]) -> f64 {
    let (Some(first), Some(last)) = (equity_curve.first(), equity_curve.last()) else {
        return 0.0;
    };
    let run_duration = (last.time - first.time).num_seconds() as f64;
    if run_duration <= 0.0 {
        return 0.0;
    }
    let time_in_trade: i64 = trades.iter().map(|t| t.duration().num_seconds()).sum();
    (time_in_trade as f64 / run_duration).clamp(0.0, 1.0)
}

fn to_f64(value: Decimal) -> f64 {
    value.to_string().parse().unwrap_or(0.0)
}

fn average(values: impl Iterator<Item = Decimal>) -> Decimal {
    let values: Vec<Decimal> = values.collect();
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().sum::<Decimal>() / Decimal::from(values.len())
}

fn daily_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            let prev = to_f64(w[0].equity);
            let curr = to_f64(w[1].equity);
            if prev != 0.0 {
                (curr - prev) / prev
            } else {
                0.0
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

fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn annualized_std_dev(returns: &[f64]) -> f64 {
    std_dev(returns) * TRADING_DAYS_PER_YEAR.sqrt()
}

fn annualized_downside_deviation(returns: &[f64]) -> f64 {
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    if downside.is_empty() {
        return 0.0;
    }
    let mean_square = downside.iter().map(|r| r.powi(2)).sum::<f64>() / downside.len() as f64;
    mean_square.sqrt() * TRADING_DAYS_PER_YEAR.sqrt()
}

fn sharpe(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let daily_mean = mean(returns);
    let daily_std = std_dev(returns);
    if daily_std == 0.0 {
        return 0.0;
    }
    (daily_mean / daily_std) * TRADING_DAYS_PER_YEAR.sqrt()
}

fn sortino(returns: &[f64], annualized_downside_deviation: f64) -> f64 {
    if returns.is_empty() || annualized_downside_deviation == 0.0 {
        return 0.0;
    }
    let annualized_mean = mean(returns) * TRADING_DAYS_PER_YEAR;
    annualized_mean / annualized_downside_deviation
}

fn max_drawdown(equity_curve: &[EquityPoint]) -> (Decimal, Duration) {
    let mut peak = Decimal::ZERO;
    let mut peak_time = equity_curve.first().map(|p| p.time);
    let mut max_dd = Decimal::ZERO;
    let mut max_dd_duration = Duration::zero();

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
            peak_time = Some(point.time);
        }
        if peak.is_zero() {
            continue;
        }
        let drawdown = (peak - point.equity) / peak;
        if drawdown > max_dd {
            max_dd = drawdown;
            if let Some(since) = peak_time {
                max_dd_duration = point.time - since;
            }
        }
    }
    (max_dd, max_dd_duration)
}

fn max_consecutive(trades: &[TradeRecord], predicate: impl Fn(&TradeRecord) -> bool) -> u32 {
    let mut max_run = 0u32;
    let mut current = 0u32;
    for trade in trades {
        if predicate(trade) {
            current += 1;
            max_run = max_run.max(current);
        } else {
            current = 0;
        }
    }
    max_run
}

/// A simplified risk-of-ruin estimate for a binary win/loss process with a fixed payoff ratio
/// (the classic gambler's-ruin closed form), not a full Monte Carlo simulation.
fn risk_of_ruin(win_rate: f64, payoff_ratio: f64) -> f64 {
    if win_rate <= 0.0 || win_rate >= 1.0 || payoff_ratio <= 0.0 {
        return 0.0;
    }
    let loss_rate = 1.0 - win_rate;
    let edge = win_rate * payoff_ratio - loss_rate;
    if edge <= 0.0 {
        return 1.0;
    }
    ((loss_rate / win_rate) / payoff_ratio).min(1.0).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use ferrotrade_exchange::model::Side;
    use rust_decimal_macros::dec;

    fn equity_point(equity: Decimal) -> EquityPoint {
        EquityPoint { time: Utc::now(), equity }
    }

    fn trade(pnl: Decimal) -> TradeRecord {
        TradeRecord {
            entry_time: Utc::now(),
            exit_time: Utc::now(),
            side: Side::Buy,
            entry_price: dec!(100),
            exit_price: dec!(100) + pnl,
            quantity: dec!(1),
            commission_paid: Decimal::ZERO,
            realized_pnl: pnl,
        }
    }

    #[test]
    fn total_return_reflects_capital_growth() {
        let curve = vec![equity_point(dec!(10000)), equity_point(dec!(11000))];
        let stats = compute(dec!(10000), &curve, &[], 1.0);
        assert_eq!(stats.total_return, dec!(0.1));
    }

    #[test]
    fn max_drawdown_measures_the_worst_peak_to_trough_decline() {
        let curve = vec![
            equity_point(dec!(10000)),
            equity_point(dec!(12000)),
            equity_point(dec!(9000)),
            equity_point(dec!(11000)),
        ];
        let stats = compute(dec!(10000), &curve, &[], 1.0);
        assert_eq!(stats.max_drawdown, dec!(0.25));
    }

    #[test]
    fn win_rate_and_profit_factor_match_the_trade_ledger() {
        let trades = vec![trade(dec!(100)), trade(dec!(-50)), trade(dec!(200))];
        let stats = compute(dec!(10000), &[], &trades, 1.0);
        assert_eq!(stats.winning_trades, 2);
        assert_eq!(stats.losing_trades, 1);
        assert!((stats.win_rate - (2.0 / 3.0)).abs() < 1e-9);
        assert_eq!(stats.profit_factor, 6.0);
    }

    #[test]
    fn max_consecutive_streaks_are_tracked_independently() {
        let trades = vec![trade(dec!(10)), trade(dec!(10)), trade(dec!(-5)), trade(dec!(10))];
        let stats = compute(dec!(10000), &[], &trades, 1.0);
        assert_eq!(stats.max_consecutive_wins, 2);
        assert_eq!(stats.max_consecutive_losses, 1);
    }

    #[test]
    fn empty_trade_ledger_produces_zeroed_statistics_without_panicking() {
        let stats = compute(dec!(10000), &[], &[], 1.0);
        assert_eq!(stats.total_trades, 0);
        assert_eq!(stats.win_rate, 0.0);
        assert_eq!(stats.profit_factor, 0.0);
    }
}
