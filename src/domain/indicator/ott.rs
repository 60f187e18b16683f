//! OTT (Optimized Trend Tracker).
//!
//! Built on a moving average `mav` of the closes:
//! - `fark = mav * percent / 100`
//! - long stop ratchets up while `mav` stays above it, short stop ratchets
//!   down while `mav` stays below it
//! - direction flips to short when `mav` falls below the previous long stop
//!   and back to long when it rises above the previous short stop
//! - `mt` is the active stop; OTT = `mt * (200 ± percent) / 200`, upper band
//!   while `mav > mt`
//!
//! Undefined wherever the moving average is still warming up.

use super::{moving_average, MaType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trend {
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OttLine {
    pub mavg: Vec<Option<f64>>,
    pub ott: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Copy)]
struct Stops {
    long: f64,
    short: f64,
    trend: Trend,
}

impl Stops {
    fn seed(mav: f64, fark: f64) -> Self {
        Self {
            long: mav - fark,
            short: mav + fark,
            trend: Trend::Up,
        }
    }

    fn step(self, mav: f64, fark: f64) -> Self {
        let long_candidate = mav - fark;
        let short_candidate = mav + fark;
        let long = if mav > self.long {
            long_candidate.max(self.long)
        } else {
            long_candidate
        };
        let short = if mav < self.short {
            short_candidate.min(self.short)
        } else {
            short_candidate
        };
        let trend = match self.trend {
            Trend::Down if mav > self.short => Trend::Up,
            Trend::Up if mav < self.long => Trend::Down,
            unchanged => unchanged,
        };
        Self { long, short, trend }
    }

    fn active(&self) -> f64 {
        match self.trend {
            Trend::Up => self.long,
            Trend::Down => self.short,
        }
    }
}

pub fn calculate_ott(closes: &[f64], length: usize, percent: f64, ma: MaType) -> OttLine {
    let mavg = moving_average(closes, length, ma).values;
    let mut stops: Option<Stops> = None;

    let ott = mavg
        .iter()
        .map(|value| {
            let mav = (*value)?;
            let fark = mav * percent * 0.01;
            let next = match stops {
                None => Stops::seed(mav, fark),
                Some(prev) => prev.step(mav, fark),
            };
            stops = Some(next);

            let mt = next.active();
            let band = if mav > mt {
                200.0 + percent
            } else {
                200.0 - percent
            };
            Some(mt * band / 200.0)
        })
        .collect();

    OttLine { mavg, ott }
}
