//! The Playout Buffer - a bounded, time-ordered window of snapshots.
//!
//! Decouples arrival cadence from render cadence. Snapshots are appended at
//! the tail as they arrive; each render tick samples the window at the
//! virtual clock, advances the clock by a fixed step, and drops samples the
//! clock has fully passed.
//!
//! # Invariants
//!
//! - Timestamps are non-decreasing from head to tail; duplicates are kept.
//! - Length never exceeds the hard ceiling.
//! - Eviction never leaves fewer than [`MIN_RETAINED`] snapshots.
//! - Whenever the buffer is non-empty the clock lies in `[head, tail]`.

use std::collections::VecDeque;
use thiserror::Error;

use crate::interpolate::{self, QueryError};
use crate::snapshot::{BodyState, Snapshot};

/// Snapshots kept after eviction so there is always a pair to bracket.
pub const MIN_RETAINED: usize = 2;

/// Sizing and pacing of the playout window.
#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Desired steady-state length; prefill requests top up to this
    pub target_size: usize,

    /// Length at which admission stops
    pub hard_ceiling: usize,

    /// Proactive eviction starts above `target_size * eviction_factor`
    pub eviction_factor: f64,

    /// Simulation time advanced per rendered frame
    pub render_step: f64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            target_size: 10,
            hard_ceiling: 20,
            eviction_factor: 1.5,
            render_step: 24.0 * 60.0 * 60.0, // one simulated day per frame
        }
    }
}

/// The virtual simulation time cursor.
#[derive(Debug, Clone)]
pub struct SimClock {
    time: f64,
    step: f64,
}

impl SimClock {
    /// Creates a clock at zero advancing `step` per frame.
    pub fn new(step: f64) -> Self {
        Self { time: 0.0, step }
    }

    /// Current virtual time.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Per-frame increment.
    pub fn step(&self) -> f64 {
        self.step
    }

    /// Moves the cursor forward by one frame.
    pub fn advance(&mut self) {
        self.time += self.step;
    }

    /// Forces the cursor into `[lo, hi]`.
    pub fn clamp(&mut self, lo: f64, hi: f64) {
        self.time = self.time.max(lo).min(hi);
    }

    /// Back to zero, for a new run.
    pub fn reset(&mut self) {
        self.time = 0.0;
    }
}

/// Why a snapshot was refused.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum AdmitError {
    #[error("Buffer full ({0} snapshots)")]
    Full(usize),

    #[error("Timestamp {timestamp} precedes tail {tail}")]
    OutOfOrder { timestamp: f64, tail: f64 },

    #[error("Expected {expected} bodies, got {got}")]
    BodyCountMismatch { expected: usize, got: usize },

    #[error("Non-finite timestamp")]
    NonFinite,
}

/// Outcome of admitting a prefill batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub admitted: usize,
    pub rejected: usize,
}

/// State produced by one sampling step.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Virtual time the state was reconstructed at
    pub sim_time: f64,

    /// Interpolated bodies, in run order
    pub bodies: Vec<BodyState>,
}

/// Bounded, time-ordered snapshot window plus its virtual clock.
#[derive(Debug, Clone)]
pub struct PlayoutBuffer {
    snapshots: VecDeque<Snapshot>,
    config: BufferConfig,
    clock: SimClock,
}

impl PlayoutBuffer {
    /// Creates an empty buffer.
    pub fn new(config: BufferConfig) -> Self {
        let clock = SimClock::new(config.render_step);
        Self {
            snapshots: VecDeque::with_capacity(config.hard_ceiling),
            config,
            clock,
        }
    }

    /// Appends `snapshot` at the tail if the admission policy allows it.
    ///
    /// A refused snapshot leaves the buffer untouched.
    pub fn admit(&mut self, snapshot: Snapshot) -> Result<(), AdmitError> {
        if !snapshot.timestamp.is_finite() {
            return Err(AdmitError::NonFinite);
        }
        if self.snapshots.len() >= self.ceiling() {
            return Err(AdmitError::Full(self.snapshots.len()));
        }
        if let Some(tail) = self.snapshots.back() {
            if snapshot.timestamp < tail.timestamp {
                return Err(AdmitError::OutOfOrder {
                    timestamp: snapshot.timestamp,
                    tail: tail.timestamp,
                });
            }
            if snapshot.body_count() != tail.body_count() {
                return Err(AdmitError::BodyCountMismatch {
                    expected: tail.body_count(),
                    got: snapshot.body_count(),
                });
            }
        }

        self.snapshots.push_back(snapshot);
        self.clamp_clock();
        Ok(())
    }

    /// Admits a batch in order, counting refusals.
    pub fn admit_batch(&mut self, batch: impl IntoIterator<Item = Snapshot>) -> BatchReport {
        let mut report = BatchReport::default();
        for snapshot in batch {
            match self.admit(snapshot) {
                Ok(()) => report.admitted += 1,
                Err(_) => report.rejected += 1,
            }
        }
        report
    }

    /// Reconstructs the state at `sim_time` without touching the clock.
    pub fn query(&self, sim_time: f64) -> Result<Vec<BodyState>, QueryError> {
        interpolate::interpolate(&self.snapshots, sim_time)
    }

    /// One render step: sample at the clock, advance, evict.
    pub fn sample(&mut self) -> Result<Sample, QueryError> {
        self.clamp_clock();
        let sim_time = self.clock.time();
        let bodies = self.query(sim_time)?;

        self.clock.advance();
        self.evict();

        Ok(Sample { sim_time, bodies })
    }

    /// Drops consumed (or excess) snapshots from the head.
    ///
    /// A head is consumed once its successor is at or before the clock.
    /// Independently of the clock, the window is trimmed back to
    /// `target_size * eviction_factor`.
    pub fn evict(&mut self) {
        let overflow = self.config.target_size as f64 * self.config.eviction_factor;
        while self.snapshots.len() > MIN_RETAINED
            && (self.snapshots[1].timestamp <= self.clock.time()
                || self.snapshots.len() as f64 > overflow)
        {
            self.snapshots.pop_front();
        }
        self.clamp_clock();
    }

    /// Empties the buffer and rewinds the clock.
    pub fn reset(&mut self) {
        self.snapshots.clear();
        self.clock.reset();
    }

    /// Snapshots needed to reach the target size.
    pub fn free_slots(&self) -> usize {
        self.config.target_size.saturating_sub(self.snapshots.len())
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn head(&self) -> Option<&Snapshot> {
        self.snapshots.front()
    }

    pub fn tail(&self) -> Option<&Snapshot> {
        self.snapshots.back()
    }

    /// Current virtual time.
    pub fn sim_time(&self) -> f64 {
        self.clock.time()
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn config(&self) -> &BufferConfig {
        &self.config
    }

    pub fn snapshots(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    fn ceiling(&self) -> usize {
        self.config.hard_ceiling.max(MIN_RETAINED)
    }

    fn clamp_clock(&mut self) {
        if let (Some(head), Some(tail)) = (self.snapshots.front(), self.snapshots.back()) {
            let (lo, hi) = (head.timestamp, tail.timestamp);
            self.clock.clamp(lo, hi);
        }
    }
}

impl Default for PlayoutBuffer {
    fn default() -> Self {
        Self::new(BufferConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snap(t: f64, x: f64) -> Snapshot {
        Snapshot::new(t, vec![BodyState::new("Earth", x, 0.0, 5.0, "blue")])
    }

    fn unit_step_buffer() -> PlayoutBuffer {
        PlayoutBuffer::new(BufferConfig {
            target_size: 10,
            hard_ceiling: 20,
            eviction_factor: 1.5,
            render_step: 1.0,
        })
    }

    #[test]
    fn test_query_midpoint_scenario() {
        let mut buffer = unit_step_buffer();
        buffer.admit(snap(0.0, -4.0)).unwrap();
        buffer.admit(snap(1.0, 0.0)).unwrap();
        buffer.admit(snap(2.0, 10.0)).unwrap();

        let bodies = buffer.query(1.5).unwrap();

        assert_eq!(bodies[0].x, 5.0);
        assert_eq!(bodies[0].y, 0.0);
    }

    #[test]
    fn test_out_of_order_rejected_without_side_effects() {
        let mut buffer = unit_step_buffer();
        buffer.admit(snap(1.0, 0.0)).unwrap();
        buffer.admit(snap(2.0, 0.0)).unwrap();

        let result = buffer.admit(snap(1.5, 0.0));

        assert_eq!(result, Err(AdmitError::OutOfOrder { timestamp: 1.5, tail: 2.0 }));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.tail().unwrap().timestamp, 2.0);
    }

    #[test]
    fn test_duplicate_timestamps_kept() {
        let mut buffer = unit_step_buffer();
        buffer.admit(snap(1.0, 0.0)).unwrap();
        buffer.admit(snap(1.0, 1.0)).unwrap();
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn test_body_count_mismatch_rejected() {
        let mut buffer = unit_step_buffer();
        buffer.admit(snap(1.0, 0.0)).unwrap();

        let two_bodies = Snapshot::new(
            2.0,
            vec![
                BodyState::new("Earth", 0.0, 0.0, 5.0, "blue"),
                BodyState::new("Mars", 0.0, 0.0, 4.0, "red"),
            ],
        );

        assert_eq!(
            buffer.admit(two_bodies),
            Err(AdmitError::BodyCountMismatch { expected: 1, got: 2 })
        );
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn test_hard_ceiling() {
        let mut buffer = PlayoutBuffer::new(BufferConfig {
            hard_ceiling: 3,
            ..BufferConfig::default()
        });
        for t in 0..3 {
            buffer.admit(snap(t as f64, 0.0)).unwrap();
        }

        assert_eq!(buffer.admit(snap(3.0, 0.0)), Err(AdmitError::Full(3)));
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_sample_advances_and_evicts() {
        let mut buffer = unit_step_buffer();
        for t in 0..5 {
            buffer.admit(snap(t as f64, t as f64 * 10.0)).unwrap();
        }

        let first = buffer.sample().unwrap();
        assert_eq!(first.sim_time, 0.0);
        assert_eq!(first.bodies[0].x, 0.0);
        // clock = 1: head (t=0) is consumed once t=1 <= clock
        assert_eq!(buffer.head().unwrap().timestamp, 1.0);

        let second = buffer.sample().unwrap();
        assert_eq!(second.sim_time, 1.0);
        assert_eq!(second.bodies[0].x, 10.0);
    }

    #[test]
    fn test_clock_clamped_to_head_on_first_admission() {
        let mut buffer = unit_step_buffer();
        assert_eq!(buffer.sim_time(), 0.0);

        buffer.admit(snap(86_400.0, 0.0)).unwrap();
        buffer.admit(snap(172_800.0, 0.0)).unwrap();

        assert_eq!(buffer.sim_time(), 86_400.0);
    }

    #[test]
    fn test_starved_buffer_freezes_on_tail() {
        let mut buffer = unit_step_buffer();
        buffer.admit(snap(0.0, 0.0)).unwrap();
        buffer.admit(snap(1.0, 7.0)).unwrap();

        for _ in 0..5 {
            buffer.sample().unwrap();
        }

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.sim_time(), 1.0);
        assert_eq!(buffer.sample().unwrap().bodies[0].x, 7.0);
    }

    #[test]
    fn test_overflow_eviction_when_clock_lags() {
        let mut buffer = PlayoutBuffer::new(BufferConfig {
            target_size: 4,
            hard_ceiling: 20,
            eviction_factor: 1.5,
            render_step: 0.0,
        });
        for t in 0..10 {
            buffer.admit(snap(t as f64, 0.0)).unwrap();
        }

        buffer.evict();

        assert_eq!(buffer.len(), 6);
        assert_eq!(buffer.head().unwrap().timestamp, 4.0);
        assert!(buffer.sim_time() >= 4.0);
    }

    #[test]
    fn test_free_slots_and_reset() {
        let mut buffer = unit_step_buffer();
        assert_eq!(buffer.free_slots(), 10);
        buffer.admit_batch((0..4).map(|t| snap(t as f64, 0.0)));
        assert_eq!(buffer.free_slots(), 6);

        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.sim_time(), 0.0);
    }

    #[test]
    fn test_batch_report_counts() {
        let mut buffer = unit_step_buffer();
        let report = buffer.admit_batch(vec![snap(1.0, 0.0), snap(0.5, 0.0), snap(2.0, 0.0)]);
        assert_eq!(report, BatchReport { admitted: 2, rejected: 1 });
    }

    #[test]
    fn test_single_snapshot_is_insufficient() {
        let mut buffer = unit_step_buffer();
        buffer.admit(snap(1.0, 0.0)).unwrap();
        assert_eq!(
            buffer.sample().unwrap_err(),
            QueryError::InsufficientData { held: 1 }
        );
    }

    #[derive(Debug, Clone)]
    enum Op {
        Admit(f64),
        Sample,
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (-1.0f64..5.0).prop_map(Op::Admit),
            Just(Op::Sample),
        ]
    }

    proptest! {
        #[test]
        fn prop_buffer_invariants(ops in prop::collection::vec(op(), 1..200), step in 0.0f64..3.0) {
            let mut buffer = PlayoutBuffer::new(BufferConfig {
                target_size: 4,
                hard_ceiling: 8,
                eviction_factor: 1.5,
                render_step: step,
            });
            let mut last_tail = f64::NEG_INFINITY;
            let mut admitted = 0usize;

            for op in ops {
                match op {
                    Op::Admit(dt) => {
                        let t = last_tail.max(0.0) + dt;
                        if buffer.admit(snap(t, t)).is_ok() {
                            admitted += 1;
                            last_tail = t;
                        }
                    }
                    Op::Sample => {
                        let _ = buffer.sample();
                    }
                }

                prop_assert!(buffer.len() <= 8);
                if admitted >= MIN_RETAINED {
                    prop_assert!(buffer.len() >= MIN_RETAINED);
                }
                let times: Vec<f64> = buffer.snapshots().map(|s| s.timestamp).collect();
                prop_assert!(times.windows(2).all(|w| w[0] <= w[1]));
                if buffer.len() >= 2 {
                    let head = buffer.head().unwrap().timestamp;
                    let tail = buffer.tail().unwrap().timestamp;
                    prop_assert!(buffer.sim_time() >= head && buffer.sim_time() <= tail);
                }
            }
        }
    }
}
