//! The interpolator - reconstructs continuous state between two samples.
//!
//! Pure functions only: nothing here mutates the buffer or the clock. The
//! playout buffer calls [`interpolate`] from its sampling step and then does
//! its own clock and eviction bookkeeping.

use std::collections::VecDeque;
use thiserror::Error;

use crate::snapshot::{BodyState, Snapshot};

/// Why a query produced no state.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum QueryError {
    /// Fewer than two snapshots are held; nothing to interpolate between
    #[error("Insufficient data: {held} snapshot(s) buffered")]
    InsufficientData { held: usize },

    /// No adjacent pair brackets the requested time
    #[error("Sim time {0} is outside the buffered span")]
    OutOfRange(f64),
}

/// Fractional position of `t` between `t0` and `t1`, in `[0, 1]`.
///
/// A zero (or negative) span resolves to the left endpoint.
pub fn alpha(t0: f64, t1: f64, t: f64) -> f64 {
    let span = t1 - t0;
    if span <= 0.0 {
        return 0.0;
    }
    ((t - t0) / span).clamp(0.0, 1.0)
}

/// Linear blend that reproduces `a` at `alpha = 0` and `b` at `alpha = 1`
/// exactly.
#[inline]
pub fn lerp(a: f64, b: f64, alpha: f64) -> f64 {
    (1.0 - alpha) * a + alpha * b
}

/// Blends two snapshots index-for-index.
///
/// Positions are interpolated; label, size and colour come from `from`.
/// Bodies beyond the shorter of the two lists are dropped.
pub fn blend(from: &Snapshot, to: &Snapshot, alpha: f64) -> Vec<BodyState> {
    from.bodies
        .iter()
        .zip(&to.bodies)
        .map(|(a, b)| BodyState {
            label: a.label.clone(),
            x: lerp(a.x, b.x, alpha),
            y: lerp(a.y, b.y, alpha),
            size: a.size,
            color: a.color.clone(),
        })
        .collect()
}

/// Index `i` of the first adjacent pair with
/// `s[i].timestamp <= t <= s[i + 1].timestamp`, scanning from the head.
pub fn find_bracket(snapshots: &VecDeque<Snapshot>, t: f64) -> Option<usize> {
    snapshots
        .iter()
        .zip(snapshots.iter().skip(1))
        .position(|(a, b)| a.timestamp <= t && t <= b.timestamp)
}

/// Reconstructs the state at `sim_time` from a time-ordered window.
pub fn interpolate(snapshots: &VecDeque<Snapshot>, sim_time: f64) -> Result<Vec<BodyState>, QueryError> {
    if snapshots.len() < 2 {
        return Err(QueryError::InsufficientData {
            held: snapshots.len(),
        });
    }

    let i = find_bracket(snapshots, sim_time).ok_or(QueryError::OutOfRange(sim_time))?;
    let (from, to) = (&snapshots[i], &snapshots[i + 1]);
    let a = alpha(from.timestamp, to.timestamp, sim_time);

    Ok(blend(from, to, a))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn snap(t: f64, x: f64, y: f64) -> Snapshot {
        Snapshot::new(t, vec![BodyState::new("Earth", x, y, 5.0, "blue")])
    }

    fn window(snaps: Vec<Snapshot>) -> VecDeque<Snapshot> {
        snaps.into_iter().collect()
    }

    #[test]
    fn test_midpoint_between_bracketing_samples() {
        let w = window(vec![snap(0.0, -3.0, 7.0), snap(1.0, 0.0, 0.0), snap(2.0, 10.0, 0.0)]);

        let state = interpolate(&w, 1.5).unwrap();

        assert_eq!(state.len(), 1);
        assert_eq!(state[0].x, 5.0);
        assert_eq!(state[0].y, 0.0);
        assert_eq!(state[0].label, "Earth");
    }

    #[test]
    fn test_insufficient_data() {
        let w = window(vec![snap(0.0, 0.0, 0.0)]);
        assert_eq!(
            interpolate(&w, 0.0),
            Err(QueryError::InsufficientData { held: 1 })
        );
        assert_eq!(
            interpolate(&VecDeque::new(), 0.0),
            Err(QueryError::InsufficientData { held: 0 })
        );
    }

    #[test]
    fn test_out_of_range() {
        let w = window(vec![snap(1.0, 0.0, 0.0), snap(2.0, 1.0, 0.0)]);
        assert!(matches!(interpolate(&w, 2.5), Err(QueryError::OutOfRange(_))));
        assert!(matches!(interpolate(&w, 0.5), Err(QueryError::OutOfRange(_))));
    }

    #[test]
    fn test_zero_span_resolves_to_left_endpoint() {
        assert_eq!(alpha(3.0, 3.0, 3.0), 0.0);

        let w = window(vec![snap(3.0, 1.0, 1.0), snap(3.0, 9.0, 9.0)]);
        let state = interpolate(&w, 3.0).unwrap();
        assert_eq!(state[0].x, 1.0);
        assert_eq!(state[0].y, 1.0);
    }

    #[test]
    fn test_attributes_copied_from_left_sample() {
        let from = Snapshot::new(0.0, vec![BodyState::new("Mars", 0.0, 0.0, 4.0, "red")]);
        let to = Snapshot::new(1.0, vec![BodyState::new("Mars", 2.0, 0.0, 9.0, "green")]);

        let state = blend(&from, &to, 0.25);

        assert_eq!(state[0].size, 4.0);
        assert_eq!(state[0].color, "red");
        assert_relative_eq!(state[0].x, 0.5);
    }

    #[test]
    fn test_first_matching_pair_wins_on_duplicates() {
        let w = window(vec![snap(1.0, 0.0, 0.0), snap(1.0, 5.0, 0.0), snap(2.0, 6.0, 0.0)]);
        assert_eq!(find_bracket(&w, 1.0), Some(0));
        assert_eq!(find_bracket(&w, 1.5), Some(1));
    }

    proptest! {
        #[test]
        fn prop_endpoints_are_exact(
            ax in -1e12f64..1e12, ay in -1e12f64..1e12,
            bx in -1e12f64..1e12, by in -1e12f64..1e12,
        ) {
            let from = snap(0.0, ax, ay);
            let to = snap(1.0, bx, by);

            let start = blend(&from, &to, 0.0);
            let end = blend(&from, &to, 1.0);

            prop_assert_eq!(start[0].x, ax);
            prop_assert_eq!(start[0].y, ay);
            prop_assert_eq!(end[0].x, bx);
            prop_assert_eq!(end[0].y, by);
        }

        #[test]
        fn prop_alpha_within_unit_interval(
            t0 in -1e6f64..1e6, span in 0.0f64..1e6, t in -2e6f64..2e6,
        ) {
            let a = alpha(t0, t0 + span, t);
            prop_assert!((0.0..=1.0).contains(&a));
        }
    }
}
