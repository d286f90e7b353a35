// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Distance thresholds deciding reward eligibility and attraction proximity.
//!
//! The policy is shared as `Arc<ProximityPolicy>` by every scoring task.
//! Each radius sits behind its own reader-writer lock: readers never block
//! each other, and an admin update is seen by tasks that read after it.
//! A task that read the old radius finishes with it.

use crate::base::Coordinate;
use crate::distance::distance;
use crate::location::{Attraction, Position};
use parking_lot::RwLock;

/// Eligibility radius applied until an admin changes it, in miles.
pub const DEFAULT_ELIGIBILITY_RADIUS: f64 = 10.0;

/// Radius of the "is this attraction nearby" predicate, in miles.
pub const DEFAULT_ATTRACTION_PROXIMITY_RADIUS: f64 = 200.0;

#[derive(Debug)]
pub struct ProximityPolicy {
    eligibility_radius: RwLock<f64>,
    attraction_proximity_radius: RwLock<f64>,
}

impl ProximityPolicy {
    pub fn new(eligibility_radius: f64, attraction_proximity_radius: f64) -> Self {
        Self {
            eligibility_radius: RwLock::new(eligibility_radius),
            attraction_proximity_radius: RwLock::new(attraction_proximity_radius),
        }
    }

    pub fn eligibility_radius(&self) -> f64 {
        *self.eligibility_radius.read()
    }

    pub fn attraction_proximity_radius(&self) -> f64 {
        *self.attraction_proximity_radius.read()
    }

    pub fn set_proximity_radius(&self, radius: f64) {
        *self.eligibility_radius.write() = radius;
    }

    pub fn set_attraction_proximity_radius(&self, radius: f64) {
        *self.attraction_proximity_radius.write() = radius;
    }

    /// Restores the compiled-in eligibility radius.
    pub fn set_default(&self) {
        self.set_proximity_radius(DEFAULT_ELIGIBILITY_RADIUS);
    }

    /// A position earns a reward for an attraction within the eligibility
    /// radius, boundary included. Unset positions never qualify.
    pub fn is_eligible_for_reward(&self, position: &Position, attraction: &Attraction) -> bool {
        match position.coordinate {
            Some(coordinate) => {
                distance(coordinate, attraction.coordinate) <= self.eligibility_radius()
            }
            None => false,
        }
    }

    pub fn is_within_proximity(&self, attraction: &Attraction, coordinate: Coordinate) -> bool {
        distance(attraction.coordinate, coordinate) <= self.attraction_proximity_radius()
    }
}

impl Default for ProximityPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_ELIGIBILITY_RADIUS,
            DEFAULT_ATTRACTION_PROXIMITY_RADIUS,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::UserId;
    use chrono::Utc;

    fn attraction_at(latitude: f64, longitude: f64) -> Attraction {
        Attraction::new("Test", "City", "ST", Coordinate::new(latitude, longitude))
    }

    #[test]
    fn attraction_is_within_its_own_proximity() {
        let policy = ProximityPolicy::default();
        let attraction = attraction_at(33.817595, -117.922008);
        assert!(policy.is_within_proximity(&attraction, attraction.coordinate));
    }

    #[test]
    fn eligibility_boundary_is_inclusive() {
        let attraction = attraction_at(0.0, 0.0);
        let position = Position::new(UserId::random(), Coordinate::new(0.0, 1.0), Utc::now());
        let one_degree = distance(attraction.coordinate, Coordinate::new(0.0, 1.0));

        let policy = ProximityPolicy::new(one_degree, DEFAULT_ATTRACTION_PROXIMITY_RADIUS);
        assert!(policy.is_eligible_for_reward(&position, &attraction));

        policy.set_proximity_radius(one_degree - 1e-9);
        assert!(!policy.is_eligible_for_reward(&position, &attraction));
    }

    #[test]
    fn default_radius_excludes_one_degree_away() {
        let policy = ProximityPolicy::default();
        let attraction = attraction_at(0.0, 0.0);
        let position = Position::new(UserId::random(), Coordinate::new(0.0, 1.0), Utc::now());

        // One degree is ~69 miles.
        assert!(!policy.is_eligible_for_reward(&position, &attraction));
        assert!(policy.is_within_proximity(&attraction, Coordinate::new(0.0, 1.0)));
    }

    #[test]
    fn unset_position_is_never_eligible() {
        let policy = ProximityPolicy::new(f64::MAX, f64::MAX);
        let attraction = attraction_at(0.0, 0.0);
        assert!(!policy.is_eligible_for_reward(&Position::unset(UserId::random()), &attraction));
    }

    #[test]
    fn set_default_restores_eligibility_radius_only() {
        let policy = ProximityPolicy::default();
        policy.set_proximity_radius(f64::MAX);
        policy.set_attraction_proximity_radius(5.0);

        policy.set_default();

        assert_eq!(policy.eligibility_radius(), DEFAULT_ELIGIBILITY_RADIUS);
        assert_eq!(policy.attraction_proximity_radius(), 5.0);
    }
}
