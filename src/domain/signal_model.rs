//! Signal model identifiers and model list parsing.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalModel {
    Ott,
    Cci,
    Tma,
    Rsi,
}

impl SignalModel {
    pub const ALL: [SignalModel; 4] = [
        SignalModel::Ott,
        SignalModel::Cci,
        SignalModel::Tma,
        SignalModel::Rsi,
    ];

    /// Name used as the signal stream key and in ranking labels.
    pub fn name(self) -> &'static str {
        match self {
            SignalModel::Ott => "OTT",
            SignalModel::Cci => "CCI",
            SignalModel::Tma => "TMA",
            SignalModel::Rsi => "RSI",
        }
    }
}

impl fmt::Display for SignalModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SignalModel {
    type Err = ModelParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "OTT" => Ok(SignalModel::Ott),
            "CCI" => Ok(SignalModel::Cci),
            "TMA" => Ok(SignalModel::Tma),
            "RSI" => Ok(SignalModel::Rsi),
            other => Err(ModelParseError::Unknown(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ModelParseError {
    #[error("empty token in model list")]
    EmptyToken,

    #[error("duplicate model: {0}")]
    Duplicate(String),

    #[error("unknown model '{0}' (expected OTT, CCI, TMA or RSI)")]
    Unknown(String),
}

/// Parse a comma-separated model list, preserving order.
pub fn parse_models(input: &str) -> Result<Vec<SignalModel>, ModelParseError> {
    let mut models = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(ModelParseError::EmptyToken);
        }
        let model: SignalModel = trimmed.parse()?;
        if !seen.insert(model) {
            return Err(ModelParseError::Duplicate(model.name().to_string()));
        }
        models.push(model);
    }

    Ok(models)
}
