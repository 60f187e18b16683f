//! Price data access port trait.

use crate::domain::error::SignalbenchError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` within `[start_date, end_date]`, ordered by date.
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, SignalbenchError>;

    fn list_symbols(&self) -> Result<Vec<String>, SignalbenchError>;

    /// First date, last date and bar count, or `None` when the symbol has no bars.
    fn get_data_range(
        &self,
        symbol: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, SignalbenchError>;
}
