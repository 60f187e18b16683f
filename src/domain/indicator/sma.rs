//! Simple Moving Average.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]); the first (n-1) values are undefined.

use super::{rolling_mean, IndicatorSeries, IndicatorType};

pub fn calculate_sma(closes: &[f64], period: usize) -> IndicatorSeries {
    let defined: Vec<Option<f64>> = closes.iter().copied().map(Some).collect();
    IndicatorSeries {
        indicator_type: IndicatorType::Sma(period),
        values: rolling_mean(&defined, period),
    }
}
