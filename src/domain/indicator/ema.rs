//! Exponential Moving Average.
//!
//! k = 2/(n+1), EMA[0] = C[0], then EMA[i] = C[i]*k + EMA[i-1]*(1-k).
//! Seeded by the first close, so there is no warmup gap.

use super::{ewm, IndicatorSeries, IndicatorType};

pub fn calculate_ema(closes: &[f64], period: usize) -> IndicatorSeries {
    let values = if period == 0 {
        vec![None; closes.len()]
    } else {
        let k = 2.0 / (period as f64 + 1.0);
        ewm(closes, k).into_iter().map(Some).collect()
    };

    IndicatorSeries {
        indicator_type: IndicatorType::Ema(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_recursive_calculation() {
        let series = calculate_ema(&[10.0, 20.0, 30.0, 40.0], 3);
        let k = 2.0 / 4.0;

        let e0 = 10.0;
        let e1 = 20.0 * k + e0 * (1.0 - k);
        let e2 = 30.0 * k + e1 * (1.0 - k);
        let e3 = 40.0 * k + e2 * (1.0 - k);

        for (i, expected) in [e0, e1, e2, e3].into_iter().enumerate() {
            assert!((series.get(i).unwrap() - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn ema_period_1_tracks_price() {
        let series = calculate_ema(&[10.0, 20.0, 30.0], 1);
        assert_eq!(series.values, vec![Some(10.0), Some(20.0), Some(30.0)]);
    }

    #[test]
    fn ema_equal_prices() {
        let series = calculate_ema(&[100.0; 5], 3);
        assert!(series.values.iter().all(|v| *v == Some(100.0)));
    }

    #[test]
    fn ema_period_0_is_undefined() {
        let series = calculate_ema(&[10.0, 20.0], 0);
        assert_eq!(series.values, vec![None, None]);
    }

    #[test]
    fn ema_empty() {
        assert!(calculate_ema(&[], 3).is_empty());
    }
}
