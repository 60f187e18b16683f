//! Report output port trait.

use crate::domain::backtest::SimulationResult;
use crate::domain::combine::Decisions;
use crate::domain::error::SignalbenchError;
use crate::domain::ohlcv::PriceSeries;
use std::path::Path;

/// Everything a single backtest run produced, aligned to the price index.
pub struct RunReport<'a> {
    pub prices: &'a PriceSeries,
    pub decisions: &'a Decisions,
    pub result: &'a SimulationResult,
}

/// Port for writing backtest reports.
pub trait ReportPort {
    fn write(&self, report: &RunReport<'_>, output_path: &Path) -> Result<(), SignalbenchError>;
}
