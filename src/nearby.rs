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

//! Closest attractions to a position.

use crate::distance::distance;
use crate::location::Position;
use crate::oracle::{Catalog, RewardPointOracle};
use crate::reward::NearbyAttraction;
use crate::user::User;
use std::sync::Arc;
use tracing::warn;

/// How many attractions a nearby query returns at most.
pub const NEARBY_ATTRACTION_LIMIT: usize = 5;

pub struct NearbyAttractionRanker {
    attractions: Catalog,
    reward_points: Arc<dyn RewardPointOracle>,
}

impl NearbyAttractionRanker {
    pub fn new(attractions: Catalog, reward_points: Arc<dyn RewardPointOracle>) -> Self {
        Self {
            attractions,
            reward_points,
        }
    }

    /// The five attractions closest to `position`, nearest first.
    ///
    /// Every attraction in the catalog is measured and priced; ties keep
    /// catalog order. An unset position ranks nothing. An attraction whose
    /// points cannot be fetched is still ranked, with zero points.
    pub fn nearby(&self, user: &User, position: &Position) -> Vec<NearbyAttraction> {
        let Some(user_coordinate) = position.coordinate else {
            return Vec::new();
        };

        let mut ranked: Vec<NearbyAttraction> = self
            .attractions
            .iter()
            .map(|attraction| {
                let reward_points = self
                    .reward_points
                    .attraction_reward_points(attraction.id, user.id())
                    .unwrap_or_else(|e| {
                        warn!(attraction = %attraction.name, error = %e, "ranking without points");
                        0
                    });
                NearbyAttraction {
                    attraction_name: attraction.name.clone(),
                    attraction_coordinate: attraction.coordinate,
                    user_coordinate,
                    distance: distance(attraction.coordinate, user_coordinate),
                    reward_points,
                }
            })
            .collect();

        // Stable: equal distances keep catalog order.
        ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        ranked.truncate(NEARBY_ATTRACTION_LIMIT);
        ranked
    }
}

impl std::fmt::Debug for NearbyAttractionRanker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NearbyAttractionRanker")
            .field("attractions", &self.attractions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::{AttractionId, Coordinate, UserId};
    use crate::error::OracleError;
    use crate::location::Attraction;
    use crate::oracle::{SimulatedGps, SimulatedRewardCentral, load_catalog};
    use chrono::Utc;

    struct NoPoints;

    impl RewardPointOracle for NoPoints {
        fn attraction_reward_points(
            &self,
            _attraction_id: AttractionId,
            _user_id: UserId,
        ) -> Result<u32, OracleError> {
            Err(OracleError::Unavailable {
                service: "rewards",
                reason: "down".to_string(),
            })
        }
    }

    #[test]
    fn closest_five_in_ascending_order() {
        let ranker = NearbyAttractionRanker::new(
            load_catalog(&SimulatedGps::new()),
            Arc::new(SimulatedRewardCentral::new()),
        );
        let user = User::new("jon", "000", "jon@tourGuide.com");
        // Anaheim: Disneyland first, then San Diego Zoo.
        let position = Position::new(user.id(), Coordinate::new(33.817595, -117.922008), Utc::now());

        let nearby = ranker.nearby(&user, &position);

        assert_eq!(nearby.len(), NEARBY_ATTRACTION_LIMIT);
        assert_eq!(nearby[0].attraction_name, "Disneyland");
        assert_eq!(nearby[0].distance, 0.0);
        assert_eq!(nearby[1].attraction_name, "San Diego Zoo");
        assert!(nearby.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert!(nearby.iter().all(|n| (1..=1000).contains(&n.reward_points)));
    }

    #[test]
    fn ties_keep_catalog_order() {
        let here = Coordinate::new(10.0, 10.0);
        let catalog: Catalog = ["first", "second", "third"]
            .into_iter()
            .map(|name| Arc::new(Attraction::new(name, "C", "S", here)))
            .collect();
        let ranker = NearbyAttractionRanker::new(catalog, Arc::new(SimulatedRewardCentral::new()));
        let user = User::new("jon", "000", "jon@tourGuide.com");

        let nearby = ranker.nearby(&user, &Position::new(user.id(), here, Utc::now()));

        let names: Vec<_> = nearby.iter().map(|n| n.attraction_name.as_str()).collect();
        assert_eq!(names, ["first", "second", "third"]);
    }

    #[test]
    fn unset_position_ranks_nothing() {
        let ranker = NearbyAttractionRanker::new(
            load_catalog(&SimulatedGps::new()),
            Arc::new(SimulatedRewardCentral::new()),
        );
        let user = User::new("jon", "000", "jon@tourGuide.com");
        assert!(ranker.nearby(&user, &Position::unset(user.id())).is_empty());
    }

    #[test]
    fn failed_point_lookup_ranks_with_zero_points() {
        let ranker = NearbyAttractionRanker::new(load_catalog(&SimulatedGps::new()), Arc::new(NoPoints));
        let user = User::new("jon", "000", "jon@tourGuide.com");
        let position = Position::new(user.id(), Coordinate::new(0.0, 0.0), Utc::now());

        let nearby = ranker.nearby(&user, &position);
        assert_eq!(nearby.len(), NEARBY_ATTRACTION_LIMIT);
        assert!(nearby.iter().all(|n| n.reward_points == 0));
    }
}
