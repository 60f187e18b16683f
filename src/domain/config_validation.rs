//! Configuration validation.
//!
//! Validates all config fields before a run starts.

use crate::domain::backtest::CostBasis;
use crate::domain::combine::CombineMode;
use crate::domain::error::SignalbenchError;
use crate::domain::indicator::MaType;
use crate::domain::signal_gen::DEFAULT_MODELS;
use crate::domain::signal_model::parse_models;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    validate_costs(config)?;
    validate_initial_capital(config)?;
    validate_periods_per_year(config)?;
    validate_mode(config)?;
    validate_cost_basis(config)?;
    validate_dates(config)?;
    Ok(())
}

pub fn validate_signal_config(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    let model_count = validate_models(config)?;
    validate_vote_k(config, model_count)?;
    validate_rsi(config)?;
    validate_cci(config)?;
    validate_ott(config)?;
    validate_tma(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> SignalbenchError {
    SignalbenchError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_costs(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    for key in ["fee_bps", "slip_bps"] {
        if config.get_int("backtest", key, 0) < 0 {
            return Err(invalid("backtest", key, format!("{key} must be non-negative")));
        }
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    let value = config.get_double("backtest", "initial_capital", 10_000.0);
    if value <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_periods_per_year(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    let value = config.get_int("backtest", "periods_per_year", 252);
    if value < 1 || value > i64::from(u32::MAX) {
        return Err(invalid(
            "backtest",
            "periods_per_year",
            "periods_per_year must be a positive integer",
        ));
    }
    Ok(())
}

fn validate_mode(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    if let Some(mode) = config.get_string("backtest", "mode") {
        mode.parse::<CombineMode>()
            .map_err(|e| invalid("backtest", "mode", e.to_string()))?;
    }
    Ok(())
}

fn validate_cost_basis(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    if let Some(basis) = config.get_string("backtest", "cost_basis") {
        basis
            .parse::<CostBasis>()
            .map_err(|reason| invalid("backtest", "cost_basis", reason))?;
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    let start = parse_optional_date(config, "start_date")?;
    let end = parse_optional_date(config, "end_date")?;

    match (start, end) {
        (Some(start), Some(end)) if start > end => Err(invalid(
            "data",
            "start_date",
            "start_date must not be after end_date",
        )),
        _ => Ok(()),
    }
}

/// Parse an optional `[data]` date in YYYY-MM-DD form.
pub fn parse_optional_date(
    config: &dyn ConfigPort,
    field: &str,
) -> Result<Option<NaiveDate>, SignalbenchError> {
    match config.get_string("data", field) {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                invalid(
                    "data",
                    field,
                    format!("invalid {} format, expected YYYY-MM-DD", field),
                )
            }),
    }
}

fn validate_models(config: &dyn ConfigPort) -> Result<usize, SignalbenchError> {
    match config.get_string("signals", "models") {
        None => Ok(DEFAULT_MODELS.len()),
        Some(list) => parse_models(&list)
            .map(|models| models.len())
            .map_err(|e| invalid("signals", "models", e.to_string())),
    }
}

fn validate_vote_k(config: &dyn ConfigPort, model_count: usize) -> Result<(), SignalbenchError> {
    let explicit = config.get_string("backtest", "vote_k").is_some();
    let from_mode = config
        .get_string("backtest", "mode")
        .and_then(|m| m.parse::<CombineMode>().ok())
        .and_then(|mode| match mode {
            CombineMode::Vote(k) => k,
            _ => None,
        });

    let k = if explicit {
        Some(config.get_int("backtest", "vote_k", 0))
    } else {
        from_mode.map(|k| k as i64)
    };

    match k {
        Some(k) if k < 1 || k as usize > model_count => Err(invalid(
            "backtest",
            "vote_k",
            format!("vote_k must be between 1 and {model_count}"),
        )),
        _ => Ok(()),
    }
}

fn validate_period(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: i64,
) -> Result<i64, SignalbenchError> {
    let value = config.get_int(section, key, default);
    if value < 1 {
        return Err(invalid(section, key, format!("{key} must be at least 1")));
    }
    Ok(value)
}

fn validate_ma(config: &dyn ConfigPort, section: &str) -> Result<(), SignalbenchError> {
    if let Some(ma) = config.get_string(section, "ma") {
        ma.parse::<MaType>()
            .map_err(|reason| invalid(section, "ma", reason))?;
    }
    Ok(())
}

fn validate_rsi(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    validate_period(config, "rsi", "n", 14)?;
    let overbought = config.get_double("rsi", "overbought", 70.0);
    let oversold = config.get_double("rsi", "oversold", 30.0);
    if !(0.0..=100.0).contains(&overbought) || !(0.0..=100.0).contains(&oversold) {
        return Err(invalid("rsi", "overbought", "RSI levels must be within 0..100"));
    }
    if oversold >= overbought {
        return Err(invalid(
            "rsi",
            "oversold",
            "oversold must be below overbought",
        ));
    }
    Ok(())
}

fn validate_cci(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    validate_period(config, "cci", "n", 20)?;
    let upper = config.get_double("cci", "upper", 100.0);
    let lower = config.get_double("cci", "lower", -100.0);
    if lower >= upper {
        return Err(invalid("cci", "lower", "lower must be below upper"));
    }
    Ok(())
}

fn validate_ott(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    validate_period(config, "ott", "length", 2)?;
    let percent = config.get_double("ott", "percent", 1.4);
    if !(0.0..200.0).contains(&percent) {
        return Err(invalid(
            "ott",
            "percent",
            "percent must be in [0, 200)",
        ));
    }
    validate_ma(config, "ott")
}

fn validate_tma(config: &dyn ConfigPort) -> Result<(), SignalbenchError> {
    let fast = validate_period(config, "tma", "fast", 5)?;
    let mid = validate_period(config, "tma", "mid", 20)?;
    let slow = validate_period(config, "tma", "slow", 50)?;
    if !(fast < mid && mid < slow) {
        return Err(invalid(
            "tma",
            "mid",
            "periods must satisfy fast < mid < slow",
        ));
    }
    validate_ma(config, "tma")
}
