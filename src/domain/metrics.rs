//! Performance metrics over an equity curve and its net returns.

use crate::domain::backtest::SimulationResult;

pub const TRADING_DAYS_PER_YEAR: u32 = 252;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Metrics {
    pub total_return: f64,
    /// Compound annual growth rate.
    pub cagr: f64,
    /// Deepest fall from a running peak, as a non-positive fraction.
    pub max_drawdown: f64,
    /// Annualized standard deviation of net returns.
    pub volatility: f64,
    pub days: usize,
}

impl Metrics {
    pub fn compute(equity: &[f64], net_returns: &[f64], periods_per_year: u32) -> Self {
        let Some(&final_equity) = equity.last() else {
            return Metrics {
                volatility: compute_volatility(net_returns, periods_per_year),
                ..Metrics::default()
            };
        };

        let days = equity.len();
        let periods = periods_per_year as f64;

        Metrics {
            total_return: final_equity - 1.0,
            cagr: final_equity.powf(periods / days.max(1) as f64) - 1.0,
            max_drawdown: compute_max_drawdown(equity),
            volatility: compute_volatility(net_returns, periods_per_year),
            days,
        }
    }

    pub fn from_simulation(result: &SimulationResult, periods_per_year: u32) -> Self {
        Self::compute(&result.equity, &result.net_returns, periods_per_year)
    }
}

fn compute_max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;

    for &value in equity {
        peak = peak.max(value);
        if peak > 0.0 {
            max_dd = max_dd.min(value / peak - 1.0);
        }
    }

    max_dd
}

fn compute_volatility(net_returns: &[f64], periods_per_year: u32) -> f64 {
    sample_stddev(net_returns)
        .map(|sd| sd * (periods_per_year as f64).sqrt())
        .unwrap_or(0.0)
}

/// Sample standard deviation (n - 1 denominator); `None` below two samples.
fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some(variance.sqrt())
}
