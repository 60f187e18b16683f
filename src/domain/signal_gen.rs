//! Indicator-driven signal generators.
//!
//! Each model turns bars into a [`SignalStream`] named after the model:
//!
//! | Model | Buy | Sell |
//! |-------|-----|------|
//! | RSI | crosses up through `oversold` | crosses down through `overbought` |
//! | CCI | crosses up through `lower` | crosses down through `upper` |
//! | OTT | close crosses above the OTT line | close crosses below the OTT line |
//! | TMA | first bar of `fast > mid > slow` | first bar of `fast < mid < slow` |
//!
//! Comparisons against undefined indicator values are false.

use crate::domain::error::SignalbenchError;
use crate::domain::indicator::cci::calculate_cci;
use crate::domain::indicator::ott::calculate_ott;
use crate::domain::indicator::rsi::calculate_rsi;
use crate::domain::indicator::{moving_average, MaType};
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::signal::SignalStream;
use crate::domain::signal_model::SignalModel;
use tracing::debug;

/// Model order used when no model list is configured.
pub const DEFAULT_MODELS: [SignalModel; 4] = [
    SignalModel::Ott,
    SignalModel::Tma,
    SignalModel::Cci,
    SignalModel::Rsi,
];

/// Model order the ranker enumerates subsets in. Combo labels and ties
/// follow this order whatever order the models were configured in.
pub const RANKING_ORDER: [SignalModel; 4] = [
    SignalModel::Ott,
    SignalModel::Cci,
    SignalModel::Tma,
    SignalModel::Rsi,
];

/// `models` reordered to [`RANKING_ORDER`].
pub fn in_ranking_order(models: &[SignalModel]) -> Vec<SignalModel> {
    RANKING_ORDER
        .into_iter()
        .filter(|m| models.contains(m))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RsiParams {
    pub period: usize,
    pub overbought: f64,
    pub oversold: f64,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self {
            period: 14,
            overbought: 70.0,
            oversold: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CciParams {
    pub period: usize,
    pub upper: f64,
    pub lower: f64,
}

impl Default for CciParams {
    fn default() -> Self {
        Self {
            period: 20,
            upper: 100.0,
            lower: -100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OttParams {
    pub length: usize,
    pub percent: f64,
    pub ma: MaType,
}

impl Default for OttParams {
    fn default() -> Self {
        Self {
            length: 2,
            percent: 1.4,
            ma: MaType::Ema,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TmaParams {
    pub fast: usize,
    pub mid: usize,
    pub slow: usize,
    pub ma: MaType,
}

impl Default for TmaParams {
    fn default() -> Self {
        Self {
            fast: 5,
            mid: 20,
            slow: 50,
            ma: MaType::Ema,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SignalParams {
    pub rsi: RsiParams,
    pub cci: CciParams,
    pub ott: OttParams,
    pub tma: TmaParams,
}

/// A named indicator column backing a model's signals.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorColumn {
    pub name: &'static str,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutput {
    pub model: SignalModel,
    pub indicators: Vec<IndicatorColumn>,
    pub stream: SignalStream,
}

/// `prev < level && cur >= level`
pub fn crosses_up_through(values: &[Option<f64>], level: f64) -> Vec<bool> {
    crossings(values, |prev, cur| prev < level && cur >= level)
}

/// `prev > level && cur <= level`
pub fn crosses_down_through(values: &[Option<f64>], level: f64) -> Vec<bool> {
    crossings(values, |prev, cur| prev > level && cur <= level)
}

fn crossings(values: &[Option<f64>], hit: impl Fn(f64, f64) -> bool) -> Vec<bool> {
    let mut out = vec![false; values.len()];
    for (i, pair) in values.windows(2).enumerate() {
        if let (Some(prev), Some(cur)) = (pair[0], pair[1]) {
            out[i + 1] = hit(prev, cur);
        }
    }
    out
}

/// True on each bar where `state` turns on after being off (or at the first bar).
fn rising_edges(state: &[bool]) -> Vec<bool> {
    state
        .iter()
        .enumerate()
        .map(|(i, &on)| on && (i == 0 || !state[i - 1]))
        .collect()
}

pub fn rsi_signals(closes: &[f64], params: &RsiParams) -> Result<ModelOutput, SignalbenchError> {
    let rsi = calculate_rsi(closes, params.period).values;
    let buy = crosses_up_through(&rsi, params.oversold);
    let sell = crosses_down_through(&rsi, params.overbought);
    Ok(ModelOutput {
        model: SignalModel::Rsi,
        stream: SignalStream::new(SignalModel::Rsi.name(), buy, sell)?,
        indicators: vec![IndicatorColumn {
            name: "rsi",
            values: rsi,
        }],
    })
}

pub fn cci_signals(bars: &[OhlcvBar], params: &CciParams) -> Result<ModelOutput, SignalbenchError> {
    let cci = calculate_cci(bars, params.period).values;
    let buy = crosses_up_through(&cci, params.lower);
    let sell = crosses_down_through(&cci, params.upper);
    Ok(ModelOutput {
        model: SignalModel::Cci,
        stream: SignalStream::new(SignalModel::Cci.name(), buy, sell)?,
        indicators: vec![IndicatorColumn {
            name: "cci",
            values: cci,
        }],
    })
}

pub fn ott_signals(closes: &[f64], params: &OttParams) -> Result<ModelOutput, SignalbenchError> {
    let line = calculate_ott(closes, params.length, params.percent, params.ma);

    let mut buy = vec![false; closes.len()];
    let mut sell = vec![false; closes.len()];
    for i in 1..closes.len() {
        if let (Some(prev_ott), Some(ott)) = (line.ott[i - 1], line.ott[i]) {
            let (prev_close, close) = (closes[i - 1], closes[i]);
            buy[i] = prev_close <= prev_ott && close > ott;
            sell[i] = prev_close >= prev_ott && close < ott;
        }
    }

    Ok(ModelOutput {
        model: SignalModel::Ott,
        stream: SignalStream::new(SignalModel::Ott.name(), buy, sell)?,
        indicators: vec![
            IndicatorColumn {
                name: "mavg",
                values: line.mavg,
            },
            IndicatorColumn {
                name: "ott",
                values: line.ott,
            },
        ],
    })
}

pub fn tma_signals(closes: &[f64], params: &TmaParams) -> Result<ModelOutput, SignalbenchError> {
    let fast = moving_average(closes, params.fast, params.ma).values;
    let mid = moving_average(closes, params.mid, params.ma).values;
    let slow = moving_average(closes, params.slow, params.ma).values;

    let ordered = |cmp: fn(f64, f64) -> bool| -> Vec<bool> {
        (0..closes.len())
            .map(|i| match (fast[i], mid[i], slow[i]) {
                (Some(f), Some(m), Some(s)) => cmp(f, m) && cmp(m, s),
                _ => false,
            })
            .collect()
    };
    let up = ordered(|a, b| a > b);
    let down = ordered(|a, b| a < b);

    Ok(ModelOutput {
        model: SignalModel::Tma,
        stream: SignalStream::new(SignalModel::Tma.name(), rising_edges(&up), rising_edges(&down))?,
        indicators: vec![
            IndicatorColumn {
                name: "fast",
                values: fast,
            },
            IndicatorColumn {
                name: "mid",
                values: mid,
            },
            IndicatorColumn {
                name: "slow",
                values: slow,
            },
        ],
    })
}

/// Run the requested models over `bars`, in the order given.
pub fn build_signals(
    bars: &[OhlcvBar],
    params: &SignalParams,
    models: &[SignalModel],
) -> Result<Vec<ModelOutput>, SignalbenchError> {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    models
        .iter()
        .map(|model| {
            let output = match model {
                SignalModel::Rsi => rsi_signals(&closes, &params.rsi),
                SignalModel::Cci => cci_signals(bars, &params.cci),
                SignalModel::Ott => ott_signals(&closes, &params.ott),
                SignalModel::Tma => tma_signals(&closes, &params.tma),
            }?;
            debug!(
                model = %model,
                buys = output.stream.buy.iter().filter(|&&b| b).count(),
                sells = output.stream.sell.iter().filter(|&&s| s).count(),
                "generated signals"
            );
            Ok(output)
        })
        .collect()
}

/// Extract the signal streams from model outputs.
pub fn streams(outputs: &[ModelOutput]) -> Vec<SignalStream> {
    outputs.iter().map(|o| o.stream.clone()).collect()
}
