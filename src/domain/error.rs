//! Domain error types.

/// Top-level error type for signalbench.
#[derive(Debug, thiserror::Error)]
pub enum SignalbenchError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unsupported combine mode: {0}")]
    UnsupportedMode(String),

    #[error("cannot resolve vote threshold from {0:?}")]
    VoteThresholdUnresolved(String),

    #[error("NONE mode requires a time index")]
    MissingIndex,

    #[error("{mode} mode requires at least one signal")]
    EmptySignalSet { mode: String },

    #[error("duplicate signal name: {0}")]
    DuplicateSignal(String),

    #[error("length mismatch for {what}: expected {expected}, got {actual}")]
    LengthMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("too many signal sources to rank: {count} (limit {max})")]
    TooManySources { count: usize, max: usize },

    #[error("time index for {symbol} is not strictly increasing at {date}")]
    UnorderedIndex { symbol: String, date: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol}")]
    NoData { symbol: String },

    #[error("insufficient data for {symbol}: {bars} bars, minimum {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SignalbenchError {
    pub(crate) fn length_mismatch(what: impl Into<String>, expected: usize, actual: usize) -> Self {
        SignalbenchError::LengthMismatch {
            what: what.into(),
            expected,
            actual,
        }
    }
}

impl From<&SignalbenchError> for std::process::ExitCode {
    fn from(err: &SignalbenchError) -> Self {
        let code: u8 = match err {
            SignalbenchError::Io(_) => 1,
            SignalbenchError::ConfigParse { .. }
            | SignalbenchError::ConfigMissing { .. }
            | SignalbenchError::ConfigInvalid { .. } => 2,
            SignalbenchError::Data { .. }
            | SignalbenchError::UnorderedIndex { .. }
            | SignalbenchError::InsufficientData { .. } => 3,
            SignalbenchError::UnsupportedMode(_)
            | SignalbenchError::VoteThresholdUnresolved(_)
            | SignalbenchError::MissingIndex
            | SignalbenchError::EmptySignalSet { .. }
            | SignalbenchError::DuplicateSignal(_)
            | SignalbenchError::LengthMismatch { .. }
            | SignalbenchError::TooManySources { .. } => 4,
            SignalbenchError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
