//! Per-body trails of rendered positions.

use nalgebra::Point2;
use std::collections::{HashMap, VecDeque};

/// Trail settings.
#[derive(Debug, Clone)]
pub struct TrailConfig {
    /// Maximum points kept per body
    pub capacity: usize,

    /// Whether recording starts switched on
    pub enabled: bool,
}

impl Default for TrailConfig {
    fn default() -> Self {
        Self {
            capacity: 1000,
            enabled: false,
        }
    }
}

/// Bounded history of render-space points, keyed by body label.
#[derive(Debug, Clone)]
pub struct TrailTracker {
    enabled: bool,
    capacity: usize,
    trails: HashMap<String, VecDeque<Point2<f64>>>,
}

impl TrailTracker {
    pub fn new(config: TrailConfig) -> Self {
        Self {
            enabled: config.enabled,
            capacity: config.capacity,
            trails: HashMap::new(),
        }
    }

    /// Appends `point` to `label`'s trail when recording is on.
    pub fn record(&mut self, label: &str, point: Point2<f64>) {
        if !self.enabled {
            return;
        }
        let trail = self.trails.entry(label.to_string()).or_default();
        trail.push_back(point);
        while trail.len() > self.capacity {
            trail.pop_front();
        }
    }

    /// Switches recording; switching off empties every trail at once.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.trails.values_mut().for_each(VecDeque::clear);
        }
    }

    /// Flips recording and returns the new setting.
    pub fn toggle(&mut self) -> bool {
        self.set_enabled(!self.enabled);
        self.enabled
    }

    /// Forgets every body, for a new run.
    pub fn reset(&mut self) {
        self.trails.clear();
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn trail(&self, label: &str) -> Option<&VecDeque<Point2<f64>>> {
        self.trails.get(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &VecDeque<Point2<f64>>)> {
        self.trails.iter().map(|(label, trail)| (label.as_str(), trail))
    }
}

impl Default for TrailTracker {
    fn default() -> Self {
        Self::new(TrailConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn enabled(capacity: usize) -> TrailTracker {
        TrailTracker::new(TrailConfig { capacity, enabled: true })
    }

    #[test]
    fn test_disabled_records_nothing() {
        let mut trails = TrailTracker::default();
        trails.record("Earth", Point2::new(1.0, 1.0));
        assert!(trails.trail("Earth").is_none());
    }

    #[test]
    fn test_oldest_points_dropped() {
        let mut trails = enabled(3);
        for i in 0..5 {
            trails.record("Mars", Point2::new(i as f64, 0.0));
        }

        let trail = trails.trail("Mars").unwrap();
        assert_eq!(trail.len(), 3);
        assert_eq!(trail.front().unwrap().x, 2.0);
        assert_eq!(trail.back().unwrap().x, 4.0);
    }

    #[test]
    fn test_disabling_clears_every_trail() {
        let mut trails = enabled(10);
        trails.record("Earth", Point2::new(0.0, 0.0));
        trails.record("Mars", Point2::new(1.0, 0.0));

        assert!(!trails.toggle());

        assert!(trails.iter().all(|(_, t)| t.is_empty()));
        assert_eq!(trails.iter().count(), 2);
    }

    #[test]
    fn test_reset_forgets_labels() {
        let mut trails = enabled(10);
        trails.record("Earth", Point2::new(0.0, 0.0));
        trails.reset();
        assert_eq!(trails.iter().count(), 0);
    }

    proptest! {
        #[test]
        fn prop_capacity_never_exceeded(
            capacity in 0usize..50,
            labels in prop::collection::vec(0u8..4, 0..300),
        ) {
            let mut trails = enabled(capacity);
            for (i, l) in labels.iter().enumerate() {
                trails.record(&format!("body-{}", l), Point2::new(i as f64, 0.0));
                prop_assert!(trails.iter().all(|(_, t)| t.len() <= capacity));
            }
        }
    }
}
