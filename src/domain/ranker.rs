//! Brute-force search over signal subsets and combination policies.
//!
//! Every non-empty subset of the signal sources is tried with `ANY`, `ALL`
//! and `VOTE k` for `k` in `2..=min(3, subset size)`. The search is
//! exponential in the number of sources, so it refuses more than
//! [`MAX_RANKED_SOURCES`].
//!
//! Subsets are enumerated in the order the sources are given. The CLI hands
//! models over in [`RANKING_ORDER`](crate::domain::signal_gen::RANKING_ORDER),
//! so combo labels read `OTT & CCI & TMA & RSI`.

use crate::domain::backtest::{simulate, CostModel};
use crate::domain::combine::{combine, CombineMode};
use crate::domain::error::SignalbenchError;
use crate::domain::metrics::{Metrics, TRADING_DAYS_PER_YEAR};
use crate::domain::signal::{ensure_unique_names, SignalStream};
use tracing::debug;

/// Upper bound on signal sources; 2^8 - 1 subsets is still cheap.
pub const MAX_RANKED_SOURCES: usize = 8;

/// Largest vote threshold tried for a subset.
pub const MAX_VOTE_THRESHOLD: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct RankingRow {
    pub combo: Vec<String>,
    pub mode: CombineMode,
    pub trades: usize,
    pub total_return: f64,
}

impl RankingRow {
    /// Signal names joined with ` & `, e.g. `OTT & RSI`.
    pub fn combo_label(&self) -> String {
        self.combo.join(" & ")
    }

    /// Total return in percent, rounded to two decimals.
    pub fn total_return_pct(&self) -> f64 {
        (self.total_return * 100.0 * 100.0).round() / 100.0
    }
}

/// Ranking rows sorted by descending total return.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankingTable {
    pub rows: Vec<RankingRow>,
}

impl RankingTable {
    pub fn best(&self) -> Option<&RankingRow> {
        self.rows.first()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Rank every subset/policy pair using `fee_bps` per trade and no slippage.
pub fn rank(
    prices: &[f64],
    signals: &[SignalStream],
    fee_bps: u32,
) -> Result<RankingTable, SignalbenchError> {
    rank_with_costs(prices, signals, &CostModel::new(fee_bps, 0))
}

pub fn rank_with_costs(
    prices: &[f64],
    signals: &[SignalStream],
    costs: &CostModel,
) -> Result<RankingTable, SignalbenchError> {
    if signals.len() > MAX_RANKED_SOURCES {
        return Err(SignalbenchError::TooManySources {
            count: signals.len(),
            max: MAX_RANKED_SOURCES,
        });
    }
    ensure_unique_names(signals)?;

    let mut rows = Vec::new();
    for subset in subsets(signals.len()) {
        let picked: Vec<SignalStream> = subset.iter().map(|&i| signals[i].clone()).collect();
        let combo: Vec<String> = picked.iter().map(|s| s.name.clone()).collect();

        for mode in policies_for(picked.len()) {
            let decisions = combine(&picked, mode, Some(prices.len()))?;
            let result = simulate(prices, &decisions, costs)?;
            let metrics = Metrics::from_simulation(&result, TRADING_DAYS_PER_YEAR);

            debug!(
                combo = %combo.join(" & "),
                mode = %mode,
                trades = result.trade_count,
                total_return = metrics.total_return,
                "evaluated combination"
            );

            rows.push(RankingRow {
                combo: combo.clone(),
                mode,
                trades: result.trade_count,
                total_return: metrics.total_return,
            });
        }
    }

    // Stable: ties keep evaluation order.
    rows.sort_by(|a, b| b.total_return.total_cmp(&a.total_return));
    Ok(RankingTable { rows })
}

/// Policies tried for a subset of `size` sources.
pub fn policies_for(size: usize) -> Vec<CombineMode> {
    let mut modes = vec![CombineMode::Any, CombineMode::All];
    modes.extend((2..=MAX_VOTE_THRESHOLD.min(size)).map(|k| CombineMode::Vote(Some(k))));
    modes
}

/// All non-empty index subsets of `0..n`, by size, each size in
/// lexicographic order.
pub fn subsets(n: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    for size in 1..=n {
        let mut combo: Vec<usize> = (0..size).collect();
        loop {
            out.push(combo.clone());

            // Rightmost slot that can still move forward.
            let Some(slot) = (0..size).rev().find(|&i| combo[i] < n - size + i) else {
                break;
            };
            combo[slot] += 1;
            for i in slot + 1..size {
                combo[i] = combo[i - 1] + 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(name: &str, buy: &[u8], sell: &[u8]) -> SignalStream {
        SignalStream::new(
            name,
            buy.iter().map(|&b| b == 1).collect(),
            sell.iter().map(|&s| s == 1).collect(),
        )
        .unwrap()
    }

    #[test]
    fn subsets_of_three() {
        assert_eq!(
            subsets(3),
            vec![
                vec![0],
                vec![1],
                vec![2],
                vec![0, 1],
                vec![0, 2],
                vec![1, 2],
                vec![0, 1, 2],
            ]
        );
    }

    #[test]
    fn subset_count_is_two_pow_n_minus_one() {
        assert_eq!(subsets(4).len(), 15);
        assert!(subsets(0).is_empty());
    }

    #[test]
    fn policies_by_subset_size() {
        assert_eq!(policies_for(1), vec![CombineMode::Any, CombineMode::All]);
        assert_eq!(
            policies_for(2),
            vec![CombineMode::Any, CombineMode::All, CombineMode::Vote(Some(2))]
        );
        assert_eq!(
            policies_for(4),
            vec![
                CombineMode::Any,
                CombineMode::All,
                CombineMode::Vote(Some(2)),
                CombineMode::Vote(Some(3)),
            ]
        );
    }

    #[test]
    fn row_count_for_four_sources() {
        // sizes 1..4: 4*2 + 6*3 + 4*4 + 1*4
        let prices = vec![100.0; 5];
        let signals: Vec<SignalStream> = ["OTT", "CCI", "TMA", "RSI"]
            .iter()
            .map(|n| stream(n, &[0; 5], &[0; 5]))
            .collect();
        let table = rank(&prices, &signals, 0).unwrap();
        assert_eq!(table.len(), 46);
    }

    #[test]
    fn ranking_is_sorted_descending() {
        let prices = vec![100.0, 100.0, 120.0, 90.0, 110.0];
        let signals = vec![
            stream("A", &[0, 1, 0, 0, 0], &[0, 0, 1, 0, 0]),
            stream("B", &[0, 0, 1, 0, 0], &[0, 0, 0, 0, 1]),
        ];
        let table = rank(&prices, &signals, 0).unwrap();

        for pair in table.rows.windows(2) {
            assert!(pair[0].total_return >= pair[1].total_return);
        }
        let best = table.best().unwrap();
        assert_eq!(best.combo_label(), "A");
        assert_eq!(best.trades, 1);
        assert!((best.total_return - 0.2).abs() < 1e-12);
    }

    #[test]
    fn ties_keep_evaluation_order() {
        let prices = vec![100.0; 3];
        let signals = vec![stream("A", &[0; 3], &[0; 3]), stream("B", &[0; 3], &[0; 3])];
        let table = rank(&prices, &signals, 0).unwrap();
        let labels: Vec<String> = table
            .rows
            .iter()
            .map(|r| format!("{} {}", r.combo_label(), r.mode))
            .collect();
        assert_eq!(
            labels,
            vec!["A ANY", "A ALL", "B ANY", "B ALL", "A & B ANY", "A & B ALL", "A & B VOTE 2"]
        );
    }

    #[test]
    fn fees_reduce_returns() {
        let prices = vec![100.0, 100.0, 110.0, 110.0];
        let signals = vec![stream("A", &[0, 1, 0, 0], &[0, 0, 0, 1])];
        let free = rank(&prices, &signals, 0).unwrap();
        let costly = rank(&prices, &signals, 50).unwrap();
        assert!(costly.best().unwrap().total_return < free.best().unwrap().total_return);
    }

    #[test]
    fn rejects_too_many_sources() {
        let signals: Vec<SignalStream> = (0..=MAX_RANKED_SOURCES)
            .map(|i| stream(&format!("S{i}"), &[0], &[0]))
            .collect();
        let err = rank(&[1.0], &signals, 0).unwrap_err();
        assert!(matches!(err, SignalbenchError::TooManySources { count: 9, max: 8 }));
    }

    #[test]
    fn rejects_duplicate_names() {
        let signals = vec![stream("A", &[0], &[0]), stream("A", &[0], &[0])];
        assert!(matches!(
            rank(&[1.0], &signals, 0).unwrap_err(),
            SignalbenchError::DuplicateSignal(_)
        ));
    }

    #[test]
    fn empty_signal_set_gives_empty_table() {
        let table = rank(&[100.0, 101.0], &[], 10).unwrap();
        assert!(table.is_empty());
        assert!(table.best().is_none());
    }

    #[test]
    fn empty_prices_rank_to_zero_returns() {
        let signals = vec![stream("A", &[], &[])];
        let table = rank(&[], &signals, 10).unwrap();
        assert_eq!(table.len(), 2);
        assert!(table.rows.iter().all(|r| r.total_return == 0.0 && r.trades == 0));
    }

    #[test]
    fn total_return_pct_rounds() {
        let row = RankingRow {
            combo: vec!["OTT".into(), "RSI".into()],
            mode: CombineMode::Vote(Some(2)),
            trades: 3,
            total_return: 0.123456,
        };
        assert_eq!(row.combo_label(), "OTT & RSI");
        assert!((row.total_return_pct() - 12.35).abs() < 1e-9);
    }
}
