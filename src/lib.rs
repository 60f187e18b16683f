//! signalbench: combine trading signals and backtest them long-only.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`], command orchestration in [`cli`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
