//! CSV export of a backtest's daily series.
//!
//! Columns: date, close, entry, exit, position, net_return, equity

use crate::domain::error::SignalbenchError;
use crate::ports::report_port::{ReportPort, RunReport};
use std::path::Path;

const HEADER: [&str; 7] = [
    "date",
    "close",
    "entry",
    "exit",
    "position",
    "net_return",
    "equity",
];

pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }

    /// Render the report as CSV text.
    pub fn render(&self, report: &RunReport<'_>) -> Result<String, SignalbenchError> {
        let len = report.prices.len();
        if report.decisions.len() != len {
            return Err(SignalbenchError::length_mismatch(
                "report decisions",
                len,
                report.decisions.len(),
            ));
        }
        if report.result.len() != len {
            return Err(SignalbenchError::length_mismatch(
                "report series",
                len,
                report.result.len(),
            ));
        }

        let mut wtr = csv::Writer::from_writer(vec![]);
        wtr.write_record(HEADER).map_err(csv_error)?;

        for i in 0..len {
            let row = [
                report.prices.dates[i].to_string(),
                format!("{:.4}", report.prices.closes[i]),
                flag(report.decisions.entry[i]),
                flag(report.decisions.exit[i]),
                flag(report.result.position[i].is_long()),
                format!("{:.6}", report.result.net_returns[i]),
                format!("{:.6}", report.result.equity[i]),
            ];
            wtr.write_record(&row).map_err(csv_error)?;
        }

        let data = wtr.into_inner().map_err(|e| SignalbenchError::Data {
            reason: format!("failed to flush CSV writer: {}", e),
        })?;
        String::from_utf8(data).map_err(|e| SignalbenchError::Data {
            reason: format!("CSV output is not valid UTF-8: {}", e),
        })
    }
}

impl Default for CsvReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

fn flag(raised: bool) -> String {
    u8::from(raised).to_string()
}

fn csv_error(e: csv::Error) -> SignalbenchError {
    SignalbenchError::Data {
        reason: format!("CSV write error: {}", e),
    }
}

impl ReportPort for CsvReportAdapter {
    fn write(&self, report: &RunReport<'_>, output_path: &Path) -> Result<(), SignalbenchError> {
        let content = self.render(report)?;
        std::fs::write(output_path, content)?;
        Ok(())
    }
}
