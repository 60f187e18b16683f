//! RSI (Relative Strength Index).
//!
//! Gains and losses of close-to-close changes are smoothed with an
//! exponential mean, alpha = 1/n, seeded by the first change.
//!
//! Formula: RSI = 100 - (100 / (1 + avg_gain / avg_loss))
//!
//! Undefined on the first bar (no change yet) and wherever avg_loss == 0.

use super::{ewm, IndicatorSeries, IndicatorType};

pub fn calculate_rsi(closes: &[f64], period: usize) -> IndicatorSeries {
    if period == 0 || closes.len() < 2 {
        return IndicatorSeries {
            indicator_type: IndicatorType::Rsi(period),
            values: vec![None; closes.len()],
        };
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let gains: Vec<f64> = changes.iter().map(|c| c.max(0.0)).collect();
    let losses: Vec<f64> = changes.iter().map(|c| (-c).max(0.0)).collect();

    let alpha = 1.0 / period as f64;
    let avg_gain = ewm(&gains, alpha);
    let avg_loss = ewm(&losses, alpha);

    let mut values = Vec::with_capacity(closes.len());
    values.push(None);
    values.extend(avg_gain.iter().zip(&avg_loss).map(|(&gain, &loss)| {
        if loss == 0.0 {
            None
        } else {
            Some(100.0 - 100.0 / (1.0 + gain / loss))
        }
    }));

    IndicatorSeries {
        indicator_type: IndicatorType::Rsi(period),
        values,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsi_empty_and_single() {
        assert!(calculate_rsi(&[], 14).is_empty());
        assert_eq!(calculate_rsi(&[100.0], 14).values, vec![None]);
    }

    #[test]
    fn rsi_first_bar_undefined() {
        let series = calculate_rsi(&[100.0, 99.0, 101.0], 14);
        assert_eq!(series.len(), 3);
        assert_eq!(series.get(0), None);
    }

    #[test]
    fn rsi_all_losses_is_zero() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 - i as f64).collect();
        let series = calculate_rsi(&closes, 14);
        let last = series.get(14).unwrap();
        assert!(last.abs() < f64::EPSILON, "RSI should be 0 when all losses");
    }

    #[test]
    fn rsi_all_gains_is_undefined() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let series = calculate_rsi(&closes, 14);
        assert!(series.values.iter().all(Option::is_none));
    }

    #[test]
    fn rsi_known_values() {
        // changes: -1, +2 ; alpha = 1/2
        // gains: 0, 1 (0.5*2 + 0.5*0) ; losses: 1, 0.5
        let series = calculate_rsi(&[100.0, 99.0, 101.0], 2);
        assert_eq!(series.get(1), Some(0.0));
        let expected = 100.0 - 100.0 / (1.0 + 1.0 / 0.5);
        assert!((series.get(2).unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn rsi_in_range() {
        let closes: Vec<f64> = (1..=40)
            .map(|i| 100.0 + (i as f64 % 7.0 - 3.0) * 2.0)
            .collect();
        let series = calculate_rsi(&closes, 14);
        for rsi in series.values.iter().flatten() {
            assert!((0.0..=100.0).contains(rsi), "RSI {} out of range", rsi);
        }
    }

    #[test]
    fn rsi_zero_period() {
        let series = calculate_rsi(&[100.0, 101.0], 0);
        assert_eq!(series.values, vec![None, None]);
    }
}
