//! Synthetic snapshot feed - the stand-in for the remote physics service.
//!
//! Bodies move on circular orbits around the origin, so the exact position
//! at any simulation time is known and interpolated output can be checked
//! against it.

use orrery_core::{BodyDescriptor, BodyState, Snapshot};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde_json::json;
use std::f64::consts::TAU;

/// Simulation seconds between consecutive snapshots (one day).
pub const DEFAULT_SIM_STEP: f64 = 24.0 * 60.0 * 60.0;

/// Orbit of one synthetic body.
#[derive(Debug, Clone)]
pub struct OrbitSpec {
    pub label: String,

    /// Orbit radius in render units
    pub radius: f64,

    /// Orbital period in days; zero means stationary
    pub period_days: f64,

    pub size: f64,
    pub color: String,

    /// Starting angle in radians
    pub phase: f64,
}

/// (label, orbit radius, period in days, marker size, colour)
const SOLAR_SYSTEM: [(&str, f64, f64, f64, &str); 9] = [
    ("Sun", 0.0, 0.0, 20.0, "orange"),
    ("Mercury", 58.0, 88.0, 3.0, "gray"),
    ("Venus", 108.0, 225.0, 5.0, "gold"),
    ("Earth", 150.0, 365.0, 5.0, "blue"),
    ("Mars", 228.0, 687.0, 4.0, "red"),
    ("Jupiter", 300.0, 4333.0, 12.0, "tan"),
    ("Saturn", 340.0, 10759.0, 10.0, "#e3c16f"),
    ("Uranus", 370.0, 30687.0, 8.0, "lightblue"),
    ("Neptune", 395.0, 60190.0, 8.0, "#3f54ba"),
];

/// Catalog describing every body the feed knows by name.
pub fn solar_catalog() -> Vec<BodyDescriptor> {
    SOLAR_SYSTEM
        .iter()
        .map(|(label, radius, period, _, _)| {
            BodyDescriptor::new(label)
                .with_property("orbitRadius", json!(radius))
                .with_property("yearLen", json!(period))
        })
        .collect()
}

/// Generates time-ordered snapshots on demand.
#[derive(Debug, Clone)]
pub struct SyntheticFeed {
    bodies: Vec<OrbitSpec>,
    sim_step: f64,
    next_index: u64,
}

impl SyntheticFeed {
    /// Creates a feed for the named bodies. Unknown names get a generated
    /// orbit.
    pub fn for_labels<S: AsRef<str>>(labels: &[S], sim_step: f64, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let bodies = labels
            .iter()
            .enumerate()
            .map(|(i, label)| {
                let label = label.as_ref();
                let phase = rng.gen_range(0.0..TAU);
                match SOLAR_SYSTEM.iter().find(|(name, ..)| *name == label) {
                    Some((_, radius, period, size, color)) => OrbitSpec {
                        label: label.to_string(),
                        radius: *radius,
                        period_days: *period,
                        size: *size,
                        color: color.to_string(),
                        phase,
                    },
                    None => OrbitSpec {
                        label: label.to_string(),
                        radius: 40.0 + 25.0 * i as f64,
                        period_days: rng.gen_range(50.0..2000.0),
                        size: 3.0,
                        color: "white".to_string(),
                        phase,
                    },
                }
            })
            .collect();

        Self {
            bodies,
            sim_step,
            next_index: 0,
        }
    }

    /// The first `count` bodies of the solar table, extended with
    /// generated ones.
    pub fn with_body_count(count: usize, sim_step: f64, seed: u64) -> Self {
        let labels: Vec<String> = (0..count)
            .map(|i| match SOLAR_SYSTEM.get(i) {
                Some((label, ..)) => label.to_string(),
                None => format!("Body-{}", i),
            })
            .collect();
        Self::for_labels(&labels, sim_step, seed)
    }

    /// Exact state at simulation time `t`.
    pub fn state_at(&self, t: f64) -> Vec<BodyState> {
        self.bodies
            .iter()
            .map(|orbit| {
                let angle = if orbit.period_days > 0.0 {
                    orbit.phase + TAU * t / (orbit.period_days * DEFAULT_SIM_STEP)
                } else {
                    orbit.phase
                };
                BodyState::new(
                    &orbit.label,
                    orbit.radius * angle.cos(),
                    orbit.radius * angle.sin(),
                    orbit.size,
                    &orbit.color,
                )
            })
            .collect()
    }

    /// Next snapshot in sequence.
    pub fn next_snapshot(&mut self) -> Snapshot {
        self.next_index += 1;
        let t = self.next_index as f64 * self.sim_step;
        Snapshot::new(t, self.state_at(t))
    }

    /// Restarts the sequence, as a new run does server-side.
    pub fn rewind(&mut self) {
        self.next_index = 0;
    }

    pub fn bodies(&self) -> &[OrbitSpec] {
        &self.bodies
    }

    pub fn sim_step(&self) -> f64 {
        self.sim_step
    }

    /// Snapshots produced since the last rewind.
    pub fn produced(&self) -> u64 {
        self.next_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_timestamps_strictly_increase() {
        let mut feed = SyntheticFeed::with_body_count(4, DEFAULT_SIM_STEP, 1);
        let times: Vec<f64> = (0..5).map(|_| feed.next_snapshot().timestamp).collect();
        assert!(times.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(times[0], DEFAULT_SIM_STEP);
    }

    #[test]
    fn test_orbits_keep_radius() {
        let feed = SyntheticFeed::for_labels(&["Sun", "Earth"], DEFAULT_SIM_STEP, 3);
        for day in [0.0, 10.0, 200.0] {
            let state = feed.state_at(day * DEFAULT_SIM_STEP);
            assert_relative_eq!(state[0].x, 0.0);
            assert_relative_eq!(state[1].x.hypot(state[1].y), 150.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_earth_returns_after_a_year() {
        let feed = SyntheticFeed::for_labels(&["Earth"], DEFAULT_SIM_STEP, 9);
        let start = feed.state_at(0.0);
        let later = feed.state_at(365.0 * DEFAULT_SIM_STEP);
        assert_relative_eq!(start[0].x, later[0].x, epsilon = 1e-6);
        assert_relative_eq!(start[0].y, later[0].y, epsilon = 1e-6);
    }

    #[test]
    fn test_generated_bodies_beyond_table() {
        let feed = SyntheticFeed::with_body_count(12, DEFAULT_SIM_STEP, 5);
        assert_eq!(feed.bodies().len(), 12);
        assert_eq!(feed.bodies()[11].label, "Body-11");
    }

    #[test]
    fn test_catalog_covers_table() {
        let catalog = solar_catalog();
        assert_eq!(catalog.len(), 9);
        assert_eq!(catalog[3].label, "Earth");
        assert_eq!(catalog[3].property("yearLen"), Some(&json!(365.0)));
    }

    proptest! {
        #[test]
        fn prop_orbit_radius_constant(seed in any::<u64>(), day in 0.0f64..100_000.0) {
            let feed = SyntheticFeed::with_body_count(12, DEFAULT_SIM_STEP, seed);
            for (orbit, state) in feed.bodies().iter().zip(feed.state_at(day * DEFAULT_SIM_STEP)) {
                prop_assert!((state.x.hypot(state.y) - orbit.radius).abs() < 1e-6);
            }
        }
    }
}
