#![allow(dead_code)]

use chrono::NaiveDate;
use signalbench::cli::RunSettings;
use signalbench::domain::backtest::CostModel;
use signalbench::domain::combine::CombineMode;
use signalbench::domain::error::SignalbenchError;
pub use signalbench::domain::ohlcv::OhlcvBar;
use signalbench::domain::signal::SignalStream;
use signalbench::domain::signal_gen::DEFAULT_MODELS;
use signalbench::ports::data_port::DataPort;
use std::collections::HashMap;
use std::path::PathBuf;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SignalbenchError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(SignalbenchError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, SignalbenchError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SignalbenchError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(SignalbenchError::Data {
                reason: reason.clone(),
            });
        }
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(symbol: &str, date: &str, close: f64) -> OhlcvBar {
    OhlcvBar {
        symbol: symbol.to_string(),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        open: close,
        high: close + 1.0,
        low: close - 1.0,
        close,
        volume: 1000,
    }
}

/// Consecutive daily bars starting 2024-01-01.
pub fn daily_bars(symbol: &str, closes: &[f64]) -> Vec<OhlcvBar> {
    let start = date(2024, 1, 1);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| OhlcvBar {
            symbol: symbol.to_string(),
            date: start + chrono::Duration::days(i as i64),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000,
        })
        .collect()
}

/// A wave with an upward drift, long enough to warm up every indicator.
pub fn wave_closes(len: usize) -> Vec<f64> {
    (0..len)
        .map(|i| {
            let t = i as f64;
            100.0 + 0.2 * t + 8.0 * (t / 6.0).sin()
        })
        .collect()
}

pub fn stream(name: &str, buy: &[u8], sell: &[u8]) -> SignalStream {
    SignalStream::new(
        name,
        buy.iter().map(|&b| b == 1).collect(),
        sell.iter().map(|&s| s == 1).collect(),
    )
    .unwrap()
}

pub fn sample_settings(symbol: &str) -> RunSettings {
    RunSettings {
        data_dir: PathBuf::from("data"),
        symbol: symbol.to_string(),
        start_date: None,
        end_date: None,
        models: DEFAULT_MODELS.to_vec(),
        mode: CombineMode::Any,
        costs: CostModel::new(20, 0),
        periods_per_year: 252,
        initial_capital: 10_000.0,
    }
}
