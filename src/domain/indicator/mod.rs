//! Technical indicators feeding the signal generators.
//!
//! - `IndicatorType`: indicator identity + parameters
//! - `IndicatorSeries`: values aligned to the bars they were computed from,
//!   `None` where the indicator is undefined (warmup, division by zero)
//! - `MaType`: moving-average flavour used by OTT and TMA

pub mod cci;
pub mod ema;
pub mod ott;
pub mod rsi;
pub mod sma;

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MaType {
    Sma,
    #[default]
    Ema,
}

impl fmt::Display for MaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaType::Sma => f.write_str("SMA"),
            MaType::Ema => f.write_str("EMA"),
        }
    }
}

impl FromStr for MaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "SMA" => Ok(MaType::Sma),
            "EMA" => Ok(MaType::Ema),
            other => Err(format!("unknown moving average type '{other}' (expected SMA or EMA)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Cci(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<Option<f64>>,
}

impl IndicatorSeries {
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Cci(period) => write!(f, "CCI({})", period),
        }
    }
}

/// Moving average of closes of the requested flavour.
pub fn moving_average(closes: &[f64], period: usize, ma: MaType) -> IndicatorSeries {
    match ma {
        MaType::Sma => sma::calculate_sma(closes, period),
        MaType::Ema => ema::calculate_ema(closes, period),
    }
}

/// Rolling mean over a window of `period` defined values. A window that
/// contains any undefined value is itself undefined.
pub(crate) fn rolling_mean(values: &[Option<f64>], period: usize) -> Vec<Option<f64>> {
    if period == 0 {
        return vec![None; values.len()];
    }
    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            let window = &values[i + 1 - period..=i];
            window
                .iter()
                .copied()
                .sum::<Option<f64>>()
                .map(|sum| sum / period as f64)
        })
        .collect()
}

/// Exponentially weighted mean with smoothing factor `alpha`, seeded by the
/// first value (no bias adjustment).
pub(crate) fn ewm(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            None => v,
            Some(p) => alpha * v + (1.0 - alpha) * p,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}
