//! Long-only position simulator.
//!
//! Walks the time index once, carrying the previous position and the
//! entry/exit counters. Step 0 is always flat; the state machine starts at
//! step 1, where an entry raised on step 0 is still pending:
//!
//! - LONG and exit raised -> FLAT (exit wins over entry)
//! - FLAT and entry raised -> LONG
//! - otherwise hold
//!
//! The return earned at `t` uses the position held at `t-1`, so a decision
//! never trades on the price it was made from.

use crate::domain::combine::Decisions;
use crate::domain::error::SignalbenchError;
use std::str::FromStr;

const BPS_PER_UNIT: f64 = 10_000.0;

/// When the per-trade cost is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostBasis {
    /// Any step with a raised entry or exit flag pays the cost, whether or
    /// not the position changed.
    #[default]
    Signal,
    /// Only steps where the position actually changed pay the cost.
    Transition,
}

impl FromStr for CostBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "signal" => Ok(CostBasis::Signal),
            "transition" => Ok(CostBasis::Transition),
            other => Err(format!("unknown cost basis '{other}' (expected signal or transition)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CostModel {
    pub fee_bps: u32,
    pub slip_bps: u32,
    pub basis: CostBasis,
}

impl CostModel {
    pub fn new(fee_bps: u32, slip_bps: u32) -> Self {
        Self {
            fee_bps,
            slip_bps,
            basis: CostBasis::Signal,
        }
    }

    pub fn with_basis(self, basis: CostBasis) -> Self {
        Self { basis, ..self }
    }

    /// Combined fee and slippage as a fraction of equity.
    pub fn per_trade(&self) -> f64 {
        (self.fee_bps as f64 + self.slip_bps as f64) / BPS_PER_UNIT
    }

    fn charge(&self, entry: bool, exit: bool, changed: bool) -> f64 {
        let charged = match self.basis {
            CostBasis::Signal => entry || exit,
            CostBasis::Transition => changed,
        };
        if charged { self.per_trade() } else { 0.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PositionState {
    #[default]
    Flat,
    Long,
}

impl PositionState {
    /// Market exposure: 0 when flat, 1 when long.
    pub fn exposure(self) -> f64 {
        match self {
            PositionState::Flat => 0.0,
            PositionState::Long => 1.0,
        }
    }

    pub fn is_long(self) -> bool {
        self == PositionState::Long
    }

    fn next(self, entry: bool, exit: bool) -> Self {
        match self {
            PositionState::Long if exit => PositionState::Flat,
            PositionState::Flat if entry => PositionState::Long,
            held => held,
        }
    }
}

/// A completed or still-open holding period, as step indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundTrip {
    pub entry_index: usize,
    pub exit_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationResult {
    pub position: Vec<PositionState>,
    pub raw_returns: Vec<f64>,
    pub net_returns: Vec<f64>,
    pub equity: Vec<f64>,
    pub entry_count: usize,
    pub exit_count: usize,
    /// Completed round trips: `min(entry_count, exit_count)`.
    pub trade_count: usize,
    /// Positions still open at the end: `max(entry_count - exit_count, 0)`.
    pub open_trade_count: usize,
}

impl SimulationResult {
    pub fn len(&self) -> usize {
        self.equity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.equity.is_empty()
    }

    pub fn final_equity(&self) -> Option<f64> {
        self.equity.last().copied()
    }

    /// Steps where the position went from flat to long.
    pub fn buy_indices(&self) -> Vec<usize> {
        self.changes_to(PositionState::Long)
    }

    /// Steps where the position went from long to flat.
    pub fn sell_indices(&self) -> Vec<usize> {
        self.changes_to(PositionState::Flat)
    }

    fn changes_to(&self, target: PositionState) -> Vec<usize> {
        self.position
            .windows(2)
            .enumerate()
            .filter(|(_, w)| w[0] != target && w[1] == target)
            .map(|(i, _)| i + 1)
            .collect()
    }

    /// Pair each buy with the first unused sell at or after it. Buys with no
    /// later sell are left out.
    pub fn round_trips(&self) -> Vec<RoundTrip> {
        let sells = self.sell_indices();
        let mut trips = Vec::new();
        let mut next_sell = 0;

        for entry_index in self.buy_indices() {
            while next_sell < sells.len() && sells[next_sell] < entry_index {
                next_sell += 1;
            }
            if let Some(&exit_index) = sells.get(next_sell) {
                trips.push(RoundTrip {
                    entry_index,
                    exit_index,
                });
                next_sell += 1;
            }
        }
        trips
    }

    /// Equity curve expressed in currency for a starting capital.
    pub fn equity_value(&self, initial_capital: f64) -> Vec<f64> {
        self.equity.iter().map(|e| e * initial_capital).collect()
    }
}

/// Accumulator threaded through the fold over the time index.
struct Ledger {
    position: PositionState,
    pending_entry: bool,
    prev_price: f64,
    equity: f64,
    entries: usize,
    exits: usize,
    result: SimulationResult,
}

impl Ledger {
    /// Step 0: flat, no prior price, so the raw return is zero. A raised flag
    /// can still be charged under [`CostBasis::Signal`]. An entry without an
    /// exit is carried to step 1.
    fn open(first_price: f64, entry: bool, exit: bool, costs: &CostModel, len: usize) -> Self {
        let mut ledger = Ledger {
            position: PositionState::Flat,
            pending_entry: entry && !exit,
            prev_price: first_price,
            equity: 1.0,
            entries: 0,
            exits: 0,
            result: SimulationResult {
                position: Vec::with_capacity(len),
                raw_returns: Vec::with_capacity(len),
                net_returns: Vec::with_capacity(len),
                equity: Vec::with_capacity(len),
                ..SimulationResult::default()
            },
        };
        let net = -costs.charge(entry, exit, false);
        ledger.record(PositionState::Flat, 0.0, net);
        ledger
    }

    fn advance(mut self, price: f64, entry: bool, exit: bool, costs: &CostModel) -> Self {
        let held = self.position;
        let pending = std::mem::take(&mut self.pending_entry);
        let next = held.next(entry || pending, exit);
        match (held, next) {
            (PositionState::Flat, PositionState::Long) => self.entries += 1,
            (PositionState::Long, PositionState::Flat) => self.exits += 1,
            _ => {}
        }

        let raw = pct_change(self.prev_price, price);
        let net = held.exposure() * raw - costs.charge(entry, exit, held != next);

        self.record(next, raw, net);
        self.position = next;
        self.prev_price = price;
        self
    }

    fn record(&mut self, position: PositionState, raw: f64, net: f64) {
        self.equity *= 1.0 + net;
        self.result.position.push(position);
        self.result.raw_returns.push(raw);
        self.result.net_returns.push(net);
        self.result.equity.push(self.equity);
    }

    fn close(self) -> SimulationResult {
        SimulationResult {
            entry_count: self.entries,
            exit_count: self.exits,
            trade_count: self.entries.min(self.exits),
            open_trade_count: self.entries.saturating_sub(self.exits),
            ..self.result
        }
    }
}

fn pct_change(prev: f64, current: f64) -> f64 {
    if prev == 0.0 { 0.0 } else { current / prev - 1.0 }
}

/// Simulate a long-only position driven by `decisions` over `prices`.
///
/// An empty price series yields an empty result. Any length mismatch between
/// prices and decisions is rejected.
pub fn simulate(
    prices: &[f64],
    decisions: &Decisions,
    costs: &CostModel,
) -> Result<SimulationResult, SignalbenchError> {
    if decisions.entry.len() != prices.len() {
        return Err(SignalbenchError::length_mismatch(
            "entry decisions",
            prices.len(),
            decisions.entry.len(),
        ));
    }
    if decisions.exit.len() != prices.len() {
        return Err(SignalbenchError::length_mismatch(
            "exit decisions",
            prices.len(),
            decisions.exit.len(),
        ));
    }

    let Some(&first_price) = prices.first() else {
        return Ok(SimulationResult::default());
    };

    let start = Ledger::open(
        first_price,
        decisions.entry[0],
        decisions.exit[0],
        costs,
        prices.len(),
    );

    let ledger = prices
        .iter()
        .zip(decisions.entry.iter().zip(decisions.exit.iter()))
        .skip(1)
        .fold(start, |ledger, (&price, (&entry, &exit))| {
            ledger.advance(price, entry, exit, costs)
        });

    Ok(ledger.close())
}
