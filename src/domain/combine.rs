//! Signal combination policies.
//!
//! Merges any number of [`SignalStream`]s into a single entry/exit decision
//! pair. Every policy is a per-step reduction: the output at `t` depends only
//! on the input flags at `t`.

use crate::domain::error::SignalbenchError;
use crate::domain::signal::SignalStream;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombineMode {
    /// Ignore signals and buy on the first step (buy-and-hold).
    None,
    /// At least one signal fires.
    Any,
    /// Every signal fires.
    All,
    /// At least `k` signals fire; `None` means a simple majority.
    Vote(Option<usize>),
}

impl CombineMode {
    /// Policy name without the vote threshold.
    pub fn name(&self) -> &'static str {
        match self {
            CombineMode::None => "NONE",
            CombineMode::Any => "ANY",
            CombineMode::All => "ALL",
            CombineMode::Vote(_) => "VOTE",
        }
    }

    /// Minimum number of raised flags for this policy over `signal_count`
    /// signals. `None` for the buy-and-hold policy, which ignores signals.
    pub fn threshold(&self, signal_count: usize) -> Option<usize> {
        match self {
            CombineMode::None => None,
            CombineMode::Any => Some(1),
            CombineMode::All => Some(signal_count),
            CombineMode::Vote(k) => Some(k.unwrap_or_else(|| default_vote_threshold(signal_count))),
        }
    }
}

impl fmt::Display for CombineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CombineMode::Vote(Some(k)) => write!(f, "VOTE {}", k),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for CombineMode {
    type Err = SignalbenchError;

    /// Accepts `NONE`, `ANY`, `ALL`, `VOTE` and `VOTE <k>` in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_uppercase();
        let mut parts = upper.split_whitespace();
        let mode = match (parts.next(), parts.next(), parts.next()) {
            (Some("NONE"), None, _) => CombineMode::None,
            (Some("ANY"), None, _) => CombineMode::Any,
            (Some("ALL"), None, _) => CombineMode::All,
            (Some("VOTE"), None, _) => CombineMode::Vote(None),
            (Some("VOTE"), Some(k), None) => {
                let k = k
                    .parse()
                    .map_err(|_| SignalbenchError::VoteThresholdUnresolved(s.trim().to_string()))?;
                CombineMode::Vote(Some(k))
            }
            _ => return Err(SignalbenchError::UnsupportedMode(s.trim().to_string())),
        };
        Ok(mode)
    }
}

/// `ceil(signal_count / 2)`
pub fn default_vote_threshold(signal_count: usize) -> usize {
    signal_count.div_ceil(2)
}

/// Combined entry/exit decisions aligned to the time index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Decisions {
    pub entry: Vec<bool>,
    pub exit: Vec<bool>,
}

impl Decisions {
    pub fn len(&self) -> usize {
        self.entry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entry.is_empty()
    }
}

/// Combine `signals` under `mode`.
///
/// `index_len` is the length of the time index. It is required for
/// [`CombineMode::None`]; for the other policies it defaults to the length of
/// the first signal and every signal is checked against it.
pub fn combine(
    signals: &[SignalStream],
    mode: CombineMode,
    index_len: Option<usize>,
) -> Result<Decisions, SignalbenchError> {
    let Some(threshold) = mode.threshold(signals.len()) else {
        return buy_and_hold(index_len);
    };

    let Some(first) = signals.first() else {
        return Err(SignalbenchError::EmptySignalSet {
            mode: mode.name().to_string(),
        });
    };

    let len = index_len.unwrap_or_else(|| first.len());
    for signal in signals {
        signal.ensure_aligned(len)?;
    }

    if !(1..=signals.len()).contains(&threshold) {
        warn!(
            mode = %mode,
            threshold,
            signals = signals.len(),
            "vote threshold outside [1, signal count]; decisions will be constant"
        );
    }

    let entry = (0..len)
        .map(|t| signals.iter().filter(|s| s.buy[t]).count() >= threshold)
        .collect();
    let exit = (0..len)
        .map(|t| signals.iter().filter(|s| s.sell[t]).count() >= threshold)
        .collect();

    Ok(Decisions { entry, exit })
}

fn buy_and_hold(index_len: Option<usize>) -> Result<Decisions, SignalbenchError> {
    let len = index_len.ok_or(SignalbenchError::MissingIndex)?;
    let mut entry = vec![false; len];
    if let Some(first) = entry.first_mut() {
        *first = true;
    }
    Ok(Decisions {
        entry,
        exit: vec![false; len],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    fn stream(name: &str, buy: &[u8], sell: &[u8]) -> SignalStream {
        SignalStream::new(
            name,
            buy.iter().map(|&b| b == 1).collect(),
            sell.iter().map(|&s| s == 1).collect(),
        )
        .unwrap()
    }

    fn flags(bits: &[u8]) -> Vec<bool> {
        bits.iter().map(|&b| b == 1).collect()
    }

    /// In-memory sink for a test-local tracing subscriber.
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn with_captured_logs<T>(f: impl FnOnce() -> T) -> (T, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .finish();
        let out = tracing::subscriber::with_default(subscriber, f);
        let text = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        (out, text)
    }

    fn three_sources() -> Vec<SignalStream> {
        vec![
            stream("OTT", &[1, 1, 0, 1], &[0, 1, 1, 0]),
            stream("CCI", &[1, 0, 0, 1], &[0, 1, 0, 0]),
            stream("RSI", &[1, 1, 0, 0], &[0, 1, 1, 1]),
        ]
    }

    #[test]
    fn parse_modes() {
        assert_eq!("none".parse::<CombineMode>().unwrap(), CombineMode::None);
        assert_eq!("Any".parse::<CombineMode>().unwrap(), CombineMode::Any);
        assert_eq!(" ALL ".parse::<CombineMode>().unwrap(), CombineMode::All);
        assert_eq!("VOTE".parse::<CombineMode>().unwrap(), CombineMode::Vote(None));
        assert_eq!(
            "vote 3".parse::<CombineMode>().unwrap(),
            CombineMode::Vote(Some(3))
        );
    }

    #[test]
    fn parse_rejects_unknown_mode() {
        let err = "MAJORITY".parse::<CombineMode>().unwrap_err();
        assert!(matches!(err, SignalbenchError::UnsupportedMode(m) if m == "MAJORITY"));
        assert!("ANY 2".parse::<CombineMode>().is_err());
    }

    #[test]
    fn parse_rejects_unresolvable_vote() {
        let err = "VOTE two".parse::<CombineMode>().unwrap_err();
        assert!(matches!(err, SignalbenchError::VoteThresholdUnresolved(_)));
    }

    #[test]
    fn display_labels() {
        assert_eq!(CombineMode::Any.to_string(), "ANY");
        assert_eq!(CombineMode::Vote(None).to_string(), "VOTE");
        assert_eq!(CombineMode::Vote(Some(2)).to_string(), "VOTE 2");
    }

    #[test]
    fn default_vote_is_ceil_half() {
        assert_eq!(default_vote_threshold(1), 1);
        assert_eq!(default_vote_threshold(2), 1);
        assert_eq!(default_vote_threshold(3), 2);
        assert_eq!(default_vote_threshold(4), 2);
    }

    #[test]
    fn none_buys_on_first_step_only() {
        let d = combine(&[], CombineMode::None, Some(3)).unwrap();
        assert_eq!(d.entry, vec![true, false, false]);
        assert_eq!(d.exit, vec![false, false, false]);
    }

    #[test]
    fn none_ignores_signals() {
        let d = combine(&three_sources(), CombineMode::None, Some(4)).unwrap();
        assert_eq!(d.entry, flags(&[1, 0, 0, 0]));
        assert_eq!(d.exit, flags(&[0, 0, 0, 0]));
    }

    #[test]
    fn none_with_empty_index() {
        let d = combine(&[], CombineMode::None, Some(0)).unwrap();
        assert!(d.is_empty());
    }

    #[test]
    fn none_requires_index() {
        let err = combine(&three_sources(), CombineMode::None, None).unwrap_err();
        assert!(matches!(err, SignalbenchError::MissingIndex));
    }

    #[test]
    fn empty_signals_rejected_for_signal_policies() {
        for mode in [CombineMode::Any, CombineMode::All, CombineMode::Vote(Some(1))] {
            let err = combine(&[], mode, Some(3)).unwrap_err();
            assert!(matches!(err, SignalbenchError::EmptySignalSet { .. }));
        }
    }

    #[test]
    fn any_is_logical_or() {
        let d = combine(&three_sources(), CombineMode::Any, None).unwrap();
        assert_eq!(d.entry, flags(&[1, 1, 0, 1]));
        assert_eq!(d.exit, flags(&[0, 1, 1, 1]));
    }

    #[test]
    fn all_is_logical_and() {
        let d = combine(&three_sources(), CombineMode::All, None).unwrap();
        assert_eq!(d.entry, flags(&[1, 0, 0, 0]));
        assert_eq!(d.exit, flags(&[0, 1, 0, 0]));
    }

    #[test]
    fn vote_counts_flags() {
        let d = combine(&three_sources(), CombineMode::Vote(Some(2)), None).unwrap();
        assert_eq!(d.entry, flags(&[1, 1, 0, 1]));
        assert_eq!(d.exit, flags(&[0, 1, 1, 0]));
    }

    #[test]
    fn vote_defaults_to_majority() {
        let implicit = combine(&three_sources(), CombineMode::Vote(None), None).unwrap();
        let explicit = combine(&three_sources(), CombineMode::Vote(Some(2)), None).unwrap();
        assert_eq!(implicit, explicit);
    }

    #[test]
    fn vote_two_of_two_matches_all() {
        let sources = vec![
            stream("OTT", &[1, 1, 0, 1], &[0, 1, 1, 0]),
            stream("TMA", &[0, 1, 1, 1], &[0, 1, 0, 0]),
        ];
        let vote = combine(&sources, CombineMode::Vote(Some(2)), None).unwrap();
        let all = combine(&sources, CombineMode::All, None).unwrap();
        assert_eq!(vote, all);
        assert_eq!(vote.entry, flags(&[0, 1, 0, 1]));
    }

    #[test]
    fn out_of_range_vote_is_constant() {
        let sources = three_sources();
        let never = combine(&sources, CombineMode::Vote(Some(4)), None).unwrap();
        assert!(never.entry.iter().all(|&e| !e));
        assert!(never.exit.iter().all(|&e| !e));

        let always = combine(&sources, CombineMode::Vote(Some(0)), None).unwrap();
        assert!(always.entry.iter().all(|&e| e));
    }

    #[test]
    fn out_of_range_vote_logs_warning() {
        let sources = three_sources();
        let (decisions, logs) =
            with_captured_logs(|| combine(&sources, CombineMode::Vote(Some(4)), None));

        assert!(decisions.is_ok());
        assert!(logs.contains("WARN"), "no warning in: {logs}");
        assert!(logs.contains("vote threshold outside"));
        assert!(logs.contains("threshold=4"));
        assert!(logs.contains("signals=3"));
    }

    #[test]
    fn zero_vote_threshold_logs_warning() {
        let sources = three_sources();
        let (_, logs) = with_captured_logs(|| combine(&sources, CombineMode::Vote(Some(0)), None));
        assert!(logs.contains("threshold=0"));
    }

    #[test]
    fn in_range_vote_logs_nothing() {
        let sources = three_sources();
        let (decisions, logs) =
            with_captured_logs(|| combine(&sources, CombineMode::Vote(Some(2)), None));

        assert!(decisions.is_ok());
        assert!(logs.is_empty(), "unexpected log output: {logs}");
    }

    #[test]
    fn misaligned_signal_rejected() {
        let sources = vec![
            stream("OTT", &[1, 0, 0], &[0, 0, 1]),
            stream("CCI", &[1, 0], &[0, 0]),
        ];
        let err = combine(&sources, CombineMode::Any, None).unwrap_err();
        assert!(matches!(err, SignalbenchError::LengthMismatch { .. }));
    }

    #[test]
    fn explicit_index_is_enforced() {
        let err = combine(&three_sources(), CombineMode::Any, Some(5)).unwrap_err();
        assert!(matches!(
            err,
            SignalbenchError::LengthMismatch {
                expected: 5,
                actual: 4,
                ..
            }
        ));
    }

    #[test]
    fn combine_is_repeatable() {
        let sources = three_sources();
        let a = combine(&sources, CombineMode::Vote(Some(2)), Some(4)).unwrap();
        let b = combine(&sources, CombineMode::Vote(Some(2)), Some(4)).unwrap();
        assert_eq!(a, b);
    }
}
