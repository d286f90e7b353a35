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

use crate::base::Coordinate;
use crate::location::{Attraction, Position};
use serde::Serialize;
use serde::ser::{SerializeStruct, Serializer};
use std::sync::Arc;

/// Scored association between one recorded position and one attraction.
#[derive(Debug, Clone, PartialEq)]
pub struct Reward {
    pub position: Position,
    pub attraction: Arc<Attraction>,
    pub points: u32,
}

impl Reward {
    pub fn new(position: Position, attraction: Arc<Attraction>, points: u32) -> Self {
        Self {
            position,
            attraction,
            points,
        }
    }

    pub fn attraction_name(&self) -> &str {
        &self.attraction.name
    }
}

impl Serialize for Reward {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("Reward", 3)?;
        state.serialize_field("position", &self.position)?;
        state.serialize_field("attraction", self.attraction.as_ref())?;
        state.serialize_field("rewardPoints", &self.points)?;
        state.end()
    }
}

/// One ranked entry of a nearby-attractions query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NearbyAttraction {
    pub attraction_name: String,
    pub attraction_coordinate: Coordinate,
    pub user_coordinate: Coordinate,
    pub distance: f64,
    pub reward_points: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::UserId;
    use chrono::Utc;

    #[test]
    fn reward_serializes_attraction_and_points() {
        let attraction = Arc::new(Attraction::new(
            "Disneyland",
            "Anaheim",
            "CA",
            Coordinate::new(33.817595, -117.922008),
        ));
        let position = Position::new(UserId::random(), attraction.coordinate, Utc::now());
        let reward = Reward::new(position, Arc::clone(&attraction), 420);

        let json = serde_json::to_value(&reward).unwrap();
        assert_eq!(json["rewardPoints"], 420);
        assert_eq!(json["attraction"]["name"], "Disneyland");
        assert_eq!(reward.attraction_name(), "Disneyland");
    }
}
