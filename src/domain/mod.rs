//! Core domain types and logic.

pub mod ohlcv;
pub mod indicator;
pub mod signal;
pub mod signal_model;
pub mod signal_gen;
pub mod combine;
pub mod backtest;
pub mod metrics;
pub mod ranker;
pub mod symbol;
pub mod config_validation;
pub mod error;
