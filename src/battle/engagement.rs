//! Engagement detection between units
//!
//! Two living units of opposing teams are engaged when they are within
//! contact distance. The relation is symmetric and rebuilt every tick.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::battle::units::{Unit, UnitTable};
use crate::core::types::UnitId;

/// An engaged pair, stored with the lower id first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Engagement {
    pub first: UnitId,
    pub second: UnitId,
}

impl Engagement {
    pub fn new(a: UnitId, b: UnitId) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// The other unit of the pair
    pub fn partner(&self, id: UnitId) -> Option<UnitId> {
        if self.first == id {
            Some(self.second)
        } else if self.second == id {
            Some(self.first)
        } else {
            None
        }
    }
}

/// Whether two units are in contact
pub fn in_contact(a: &Unit, b: &Unit, contact_distance: f32) -> bool {
    a.is_alive()
        && b.is_alive()
        && a.team != b.team
        && a.position.distance(&b.position) <= contact_distance
}

/// All engaged pairs in ascending `(first, second)` order
pub fn detect_engagements(units: &UnitTable, contact_distance: f32) -> Vec<Engagement> {
    let alive: Vec<&Unit> = units.alive().collect();
    let mut pairs = Vec::new();

    // `alive` is in id order, so pairs come out sorted
    for (i, a) in alive.iter().enumerate() {
        for b in &alive[i + 1..] {
            if in_contact(a, b, contact_distance) {
                pairs.push(Engagement::new(a.id, b.id));
            }
        }
    }

    pairs
}

/// Every unit that appears in at least one pair
pub fn engaged_units(pairs: &[Engagement]) -> BTreeSet<UnitId> {
    pairs.iter().flat_map(|p| [p.first, p.second]).collect()
}

/// Pairs that started or ended since the previous tick
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngagementChanges {
    pub started: Vec<Engagement>,
    pub ended: Vec<Engagement>,
}

/// Last tick's engagement set, kept for presentation only
#[derive(Debug, Clone, Default)]
pub struct EngagementTracker {
    previous: BTreeSet<Engagement>,
}

impl EngagementTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored set and report the differences
    pub fn update(&mut self, pairs: &[Engagement]) -> EngagementChanges {
        let current: BTreeSet<Engagement> = pairs.iter().copied().collect();
        let changes = EngagementChanges {
            started: current.difference(&self.previous).copied().collect(),
            ended: self.previous.difference(&current).copied().collect(),
        };
        self.previous = current;
        changes
    }

    pub fn clear(&mut self) {
        self.previous.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::units::UnitType;
    use crate::core::types::{Team, Vec2};

    fn table(positions: &[(Team, f32, f32)]) -> UnitTable {
        let mut units = UnitTable::new();
        for &(team, x, y) in positions {
            units.spawn(team, UnitType::Line, Vec2::new(x, y), 100.0);
        }
        units
    }

    #[test]
    fn test_opponents_in_range_engage() {
        let units = table(&[(Team::A, 100.0, 100.0), (Team::B, 120.0, 100.0)]);
        let pairs = detect_engagements(&units, 30.0);
        assert_eq!(pairs, vec![Engagement::new(UnitId(0), UnitId(1))]);
    }

    #[test]
    fn test_contact_distance_is_inclusive() {
        let units = table(&[(Team::A, 0.0, 0.0), (Team::B, 30.0, 0.0)]);
        assert_eq!(detect_engagements(&units, 30.0).len(), 1);
        assert!(detect_engagements(&units, 29.9).is_empty());
    }

    #[test]
    fn test_allies_never_engage() {
        let units = table(&[(Team::A, 0.0, 0.0), (Team::A, 5.0, 0.0)]);
        assert!(detect_engagements(&units, 30.0).is_empty());
    }

    #[test]
    fn test_dead_units_never_engage() {
        let mut units = table(&[(Team::A, 0.0, 0.0), (Team::B, 5.0, 0.0)]);
        units.get_mut(UnitId(1)).unwrap().health = 0.0;
        assert!(detect_engagements(&units, 30.0).is_empty());
    }

    #[test]
    fn test_pairs_sorted() {
        let units = table(&[
            (Team::B, 0.0, 0.0),
            (Team::A, 10.0, 0.0),
            (Team::B, 20.0, 0.0),
            (Team::A, 500.0, 0.0),
        ]);
        let pairs = detect_engagements(&units, 30.0);
        assert_eq!(
            pairs,
            vec![
                Engagement::new(UnitId(0), UnitId(1)),
                Engagement::new(UnitId(1), UnitId(2)),
            ]
        );
        let engaged = engaged_units(&pairs);
        assert_eq!(engaged.len(), 3);
        assert!(!engaged.contains(&UnitId(3)));
    }

    #[test]
    fn test_engagement_normalizes_order() {
        let e = Engagement::new(UnitId(5), UnitId(2));
        assert_eq!(e.first, UnitId(2));
        assert_eq!(e.partner(UnitId(2)), Some(UnitId(5)));
        assert_eq!(e.partner(UnitId(9)), None);
    }

    #[test]
    fn test_tracker_reports_transitions() {
        let mut tracker = EngagementTracker::new();
        let pair = Engagement::new(UnitId(0), UnitId(1));

        let changes = tracker.update(&[pair]);
        assert_eq!(changes.started, vec![pair]);

        let changes = tracker.update(&[pair]);
        assert_eq!(changes, EngagementChanges::default());

        let changes = tracker.update(&[]);
        assert_eq!(changes.ended, vec![pair]);
        assert_eq!(tracker.update(&[]), EngagementChanges::default());
    }
}
