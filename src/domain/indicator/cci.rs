//! CCI (Commodity Channel Index).
//!
//! tp = (H + L + C) / 3
//! CCI = (tp - SMA(tp, n)) / (0.015 * MD)
//! where MD is the n-bar mean of |tp - SMA(tp, n)|.
//!
//! Needs 2n-1 bars before the first defined value; undefined where MD == 0.

use super::{rolling_mean, IndicatorSeries, IndicatorType};
use crate::domain::ohlcv::OhlcvBar;

const LAMBERT_CONSTANT: f64 = 0.015;

pub fn calculate_cci(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let typical: Vec<f64> = bars.iter().map(OhlcvBar::typical_price).collect();
    let defined: Vec<Option<f64>> = typical.iter().copied().map(Some).collect();
    let mean_tp = rolling_mean(&defined, period);

    let deviation: Vec<Option<f64>> = typical
        .iter()
        .zip(&mean_tp)
        .map(|(tp, mean)| mean.map(|m| (tp - m).abs()))
        .collect();
    let mean_dev = rolling_mean(&deviation, period);

    let values = typical
        .iter()
        .zip(mean_tp.iter().zip(&mean_dev))
        .map(|(tp, (mean, md))| match (mean, md) {
            (Some(m), Some(d)) if *d > 0.0 => Some((tp - m) / (LAMBERT_CONSTANT * d)),
            _ => None,
        })
        .collect();

    IndicatorSeries {
        indicator_type: IndicatorType::Cci(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bars(closes: &[f64]) -> Vec<OhlcvBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| OhlcvBar {
                symbol: "TEST".into(),
                date: NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000,
            })
            .collect()
    }

    #[test]
    fn cci_warmup_is_two_periods() {
        let series = calculate_cci(&make_bars(&[1.0, 3.0, 2.0, 5.0, 4.0]), 2);
        assert_eq!(series.get(0), None);
        assert_eq!(series.get(1), None);
        assert!(series.get(2).is_some());
    }

    #[test]
    fn cci_known_value() {
        // n=2, tp = close: [1, 3, 2]
        // sma: [-, 2, 2.5]; dev: [-, 1, 0.5]; md: [-, -, 0.75]
        // cci[2] = (2 - 2.5) / (0.015 * 0.75)
        let series = calculate_cci(&make_bars(&[1.0, 3.0, 2.0]), 2);
        let expected = -0.5 / (0.015 * 0.75);
        assert!((series.get(2).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn cci_flat_prices_undefined() {
        let series = calculate_cci(&make_bars(&[10.0; 6]), 2);
        assert!(series.values.iter().all(Option::is_none));
    }

    #[test]
    fn cci_uses_typical_price() {
        let mut bars = make_bars(&[1.0, 3.0, 2.0]);
        for b in &mut bars {
            b.high += 3.0;
            b.low -= 3.0;
        }
        // symmetric high/low offsets leave the typical price unchanged
        let base = calculate_cci(&make_bars(&[1.0, 3.0, 2.0]), 2);
        assert_eq!(calculate_cci(&bars, 2).values, base.values);
    }
}
