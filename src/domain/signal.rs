//! Buy/sell signal streams produced by indicators.

use crate::domain::error::SignalbenchError;
use std::collections::HashSet;

/// A named pair of aligned buy and sell trigger series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalStream {
    pub name: String,
    pub buy: Vec<bool>,
    pub sell: Vec<bool>,
}

impl SignalStream {
    pub fn new(
        name: impl Into<String>,
        buy: Vec<bool>,
        sell: Vec<bool>,
    ) -> Result<Self, SignalbenchError> {
        let name = name.into();
        if buy.len() != sell.len() {
            return Err(SignalbenchError::length_mismatch(
                format!("{name} sell flags"),
                buy.len(),
                sell.len(),
            ));
        }
        Ok(Self { name, buy, sell })
    }

    pub fn len(&self) -> usize {
        self.buy.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buy.is_empty()
    }

    /// Check both series against the length of the time index.
    pub fn ensure_aligned(&self, index_len: usize) -> Result<(), SignalbenchError> {
        if self.buy.len() != index_len {
            return Err(SignalbenchError::length_mismatch(
                format!("{} buy flags", self.name),
                index_len,
                self.buy.len(),
            ));
        }
        if self.sell.len() != index_len {
            return Err(SignalbenchError::length_mismatch(
                format!("{} sell flags", self.name),
                index_len,
                self.sell.len(),
            ));
        }
        Ok(())
    }
}

/// Signal sets are keyed by name; a repeated name is a caller error.
pub fn ensure_unique_names(signals: &[SignalStream]) -> Result<(), SignalbenchError> {
    let mut seen = HashSet::new();
    for signal in signals {
        if !seen.insert(signal.name.as_str()) {
            return Err(SignalbenchError::DuplicateSignal(signal.name.clone()));
        }
    }
    Ok(())
}
