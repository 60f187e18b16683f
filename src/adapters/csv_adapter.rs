//! CSV file data adapter.
//!
//! One `<SYMBOL>.csv` per symbol with header `date,open,high,low,close,volume`.

use crate::domain::error::SignalbenchError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

const EXTENSION: &str = ".csv";

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}{}", symbol, EXTENSION))
    }

    /// Every bar in the symbol's file, sorted by date, duplicates rejected.
    fn read_all(&self, symbol: &str) -> Result<Vec<OhlcvBar>, SignalbenchError> {
        let path = self.csv_path(symbol);
        if !path.exists() {
            return Err(SignalbenchError::NoData {
                symbol: symbol.to_string(),
            });
        }
        let content = fs::read_to_string(&path).map_err(|e| SignalbenchError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| SignalbenchError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let date_str = field(&record, 0, "date")?;
            let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
                SignalbenchError::Data {
                    reason: format!("invalid date '{}': {}", date_str, e),
                }
            })?;

            bars.push(OhlcvBar {
                symbol: symbol.to_string(),
                date,
                open: number(&record, 1, "open")?,
                high: number(&record, 2, "high")?,
                low: number(&record, 3, "low")?,
                close: number(&record, 4, "close")?,
                volume: volume(&record)?,
            });
        }

        bars.sort_by_key(|b| b.date);
        if let Some(pair) = bars.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(SignalbenchError::UnorderedIndex {
                symbol: symbol.to_string(),
                date: pair[1].date.to_string(),
            });
        }
        Ok(bars)
    }
}

fn field<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    name: &str,
) -> Result<&'r str, SignalbenchError> {
    record.get(index).ok_or_else(|| SignalbenchError::Data {
        reason: format!("missing {} column", name),
    })
}

fn number(record: &csv::StringRecord, index: usize, name: &str) -> Result<f64, SignalbenchError> {
    field(record, index, name)?
        .trim()
        .parse()
        .map_err(|e| SignalbenchError::Data {
            reason: format!("invalid {} value: {}", name, e),
        })
}

/// Volume is integral, but some exporters write it as `123.0`.
fn volume(record: &csv::StringRecord) -> Result<i64, SignalbenchError> {
    let raw = field(record, 5, "volume")?.trim();
    raw.parse::<i64>()
        .or_else(|_| raw.parse::<f64>().map(|v| v.round() as i64))
        .map_err(|e| SignalbenchError::Data {
            reason: format!("invalid volume value: {}", e),
        })
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SignalbenchError> {
        Ok(self
            .read_all(symbol)?
            .into_iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .collect())
    }

    fn list_symbols(&self) -> Result<Vec<String>, SignalbenchError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SignalbenchError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            if let Some(symbol) = name.to_string_lossy().strip_suffix(EXTENSION) {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SignalbenchError> {
        let bars = match self.read_all(symbol) {
            Ok(bars) => bars,
            Err(SignalbenchError::NoData { .. }) => return Ok(None),
            Err(e) => return Err(e),
        };
        Ok(match (bars.first(), bars.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, bars.len())),
            _ => None,
        })
    }
}
