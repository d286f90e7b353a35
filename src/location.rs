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

//! Positions and attractions.

use crate::base::{AttractionId, Coordinate, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A timestamped coordinate recorded for a user.
///
/// A position without a coordinate is the "unset" position: it never earns
/// rewards and ranks no attractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub user_id: UserId,
    pub coordinate: Option<Coordinate>,
    pub time_visited: DateTime<Utc>,
}

impl Position {
    pub fn new(user_id: UserId, coordinate: Coordinate, time_visited: DateTime<Utc>) -> Self {
        Self {
            user_id,
            coordinate: Some(coordinate),
            time_visited,
        }
    }

    /// Position with no coordinate, stamped now.
    pub fn unset(user_id: UserId) -> Self {
        Self {
            user_id,
            coordinate: None,
            time_visited: Utc::now(),
        }
    }
}

/// A named point of interest with a fixed coordinate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attraction {
    pub id: AttractionId,
    pub name: String,
    pub city: String,
    pub state: String,
    pub coordinate: Coordinate,
}

impl Attraction {
    pub fn new(
        name: impl Into<String>,
        city: impl Into<String>,
        state: impl Into<String>,
        coordinate: Coordinate,
    ) -> Self {
        Self {
            id: AttractionId::random(),
            name: name.into(),
            city: city.into(),
            state: state.into(),
            coordinate,
        }
    }
}
