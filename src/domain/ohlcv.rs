//! Daily OHLCV bars and the close-price series the engine runs on.

use crate::domain::error::SignalbenchError;
use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct OhlcvBar {
    pub symbol: String,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl OhlcvBar {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Time index plus closing prices for one instrument.
///
/// Dates are strictly increasing; `closes[i]` belongs to `dates[i]`.
#[derive(Debug, Clone, Default)]
pub struct PriceSeries {
    pub symbol: String,
    pub dates: Vec<NaiveDate>,
    pub closes: Vec<f64>,
}

impl PriceSeries {
    pub fn from_bars(symbol: &str, bars: &[OhlcvBar]) -> Result<Self, SignalbenchError> {
        for pair in bars.windows(2) {
            if pair[1].date <= pair[0].date {
                return Err(SignalbenchError::UnorderedIndex {
                    symbol: symbol.to_string(),
                    date: pair[1].date.to_string(),
                });
            }
        }

        Ok(Self {
            symbol: symbol.to_string(),
            dates: bars.iter().map(|b| b.date).collect(),
            closes: bars.iter().map(|b| b.close).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.closes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closes.is_empty()
    }

    pub fn last(&self) -> Option<(NaiveDate, f64)> {
        self.dates.last().copied().zip(self.closes.last().copied())
    }

    /// Return of holding from the first close to the last close.
    pub fn buy_and_hold_return(&self) -> f64 {
        match (self.closes.first(), self.closes.last()) {
            (Some(&first), Some(&last)) if first > 0.0 => last / first - 1.0,
            _ => 0.0,
        }
    }
}
