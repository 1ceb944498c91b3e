//! Signal transition detection.
//!
//! A [`CyclePattern`] is a small finite-state machine over the bits of one or
//! more signal columns. [`SignalTransitionEngine`] feeds it every row of a
//! table in a single pass, counting how often each bit value occurs and how
//! many cycles the pattern recognised.

use std::fmt::Debug;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use liftmetrics_core::{BrakePattern, DoorPattern, LiftError, Row, Table};

/// A cycle recogniser.
pub trait CyclePattern {
    /// State carried from one row to the next.
    type State: Copy + Eq + Debug;

    /// State before the first row.
    fn initial_state(&self) -> Self::State;

    /// Feed one row's bits. Returns the next state and whether a cycle completed.
    fn step(&self, state: Self::State, bits: &[u8]) -> (Self::State, bool);
}

/// Counts one edge between two exact readings, e.g. `(1,1) -> (0,0)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgePattern<const N: usize> {
    pub from: [u8; N],
    pub to: [u8; N],
}

impl<const N: usize> EdgePattern<N> {
    pub fn new(from: [u8; N], to: [u8; N]) -> Self {
        Self { from, to }
    }
}

impl From<BrakePattern> for EdgePattern<2> {
    fn from(pattern: BrakePattern) -> Self {
        Self::new(pattern.from, pattern.to)
    }
}

impl<const N: usize> CyclePattern for EdgePattern<N> {
    /// Previous reading; `None` before the first row.
    type State = Option<[u8; N]>;

    fn initial_state(&self) -> Self::State {
        None
    }

    fn step(&self, state: Self::State, bits: &[u8]) -> (Self::State, bool) {
        let Ok(current) = <[u8; N]>::try_from(bits) else {
            return (None, false);
        };
        (Some(current), state == Some(self.from) && current == self.to)
    }
}

/// Door latch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorState {
    Closed,
    Open,
}

/// Opens on `open_value`, closes on the other value and counts a cycle on close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DoorLatch {
    pub open_value: u8,
}

impl From<DoorPattern> for DoorLatch {
    fn from(pattern: DoorPattern) -> Self {
        Self {
            open_value: pattern.open_value,
        }
    }
}

impl CyclePattern for DoorLatch {
    type State = DoorState;

    fn initial_state(&self) -> Self::State {
        DoorState::Closed
    }

    fn step(&self, state: Self::State, bits: &[u8]) -> (Self::State, bool) {
        let Some(&bit) = bits.first() else {
            return (state, false);
        };
        match state {
            DoorState::Closed if bit == self.open_value => (DoorState::Open, false),
            DoorState::Open if bit != self.open_value => (DoorState::Closed, true),
            other => (other, false),
        }
    }
}

/// Occurrences of each value of one binary signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitCounts {
    #[serde(rename = "0")]
    pub zeros: u64,
    #[serde(rename = "1")]
    pub ones: u64,
}

impl BitCounts {
    pub fn record(&mut self, bit: u8) {
        if bit == 0 {
            self.zeros += 1;
        } else {
            self.ones += 1;
        }
    }

    pub fn merge(&mut self, other: &BitCounts) {
        self.zeros += other.zeros;
        self.ones += other.ones;
    }
}

/// Per-signal value counts plus recognised cycles.
///
/// Serializes as one object: each signal under its column name, then `cycles`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionCounts {
    #[serde(flatten)]
    pub signals: IndexMap<String, BitCounts>,
    pub cycles: u64,
}

impl TransitionCounts {
    /// Empty counts for the given columns, in order.
    pub fn for_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        Self {
            signals: columns
                .iter()
                .map(|c| (c.as_ref().to_string(), BitCounts::default()))
                .collect(),
            cycles: 0,
        }
    }

    /// Add `other` into `self`.
    pub fn merge(&mut self, other: &TransitionCounts) {
        for (name, counts) in &other.signals {
            self.signals.entry(name.clone()).or_default().merge(counts);
        }
        self.cycles += other.cycles;
    }
}

/// Runs a [`CyclePattern`] over the signal columns of a table.
#[derive(Debug, Clone)]
pub struct SignalTransitionEngine<P> {
    pattern: P,
    columns: Vec<String>,
}

impl<P: CyclePattern> SignalTransitionEngine<P> {
    /// Create an engine reading `columns`, in the order the pattern expects them.
    pub fn new(pattern: P, columns: Vec<String>) -> Self {
        Self { pattern, columns }
    }

    pub fn pattern(&self) -> &P {
        &self.pattern
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Scan every row of `table` in order.
    pub fn scan(&self, table: &Table) -> Result<TransitionCounts, LiftError> {
        self.scan_rows(table, table.rows())
    }

    /// Scan `rows`, which must belong to `table`, in the order given.
    pub fn scan_rows<'a, I>(&self, table: &Table, rows: I) -> Result<TransitionCounts, LiftError>
    where
        I: IntoIterator<Item = &'a Row>,
    {
        let indices = self
            .columns
            .iter()
            .map(|c| table.require_column(c))
            .collect::<Result<Vec<_>, _>>()?;

        let mut counts = TransitionCounts::for_columns(&self.columns);
        let mut state = self.pattern.initial_state();
        let mut bits = vec![0u8; indices.len()];

        for row in rows {
            for (slot, &column) in bits.iter_mut().zip(&indices) {
                *slot = table.bit(row, column)?;
            }
            for (counter, &bit) in counts.signals.values_mut().zip(&bits) {
                counter.record(bit);
            }
            let (next, cycle) = self.pattern.step(state, &bits);
            if cycle {
                counts.cycles += 1;
            }
            state = next;
        }

        Ok(counts)
    }
}
