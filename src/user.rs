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

//! Tracked users.
//!
//! A [`User`] is shared as `Arc<User>` by every task that tracks or scores
//! it. Position history and reward collection sit behind separate locks so
//! a scoring pass appending rewards never blocks a tracking task appending
//! a position for the same user. Both collections are append-only.
//!
//! # Example
//!
//! ```
//! use tour_guide_rs::User;
//!
//! let user = User::new("jon", "000", "jon@tourGuide.com");
//! assert!(user.positions().is_empty());
//! assert_eq!(user.reward_points(), 0);
//! ```

use crate::base::UserId;
use crate::location::Position;
use crate::preferences::{Provider, UserPreferences};
use crate::reward::Reward;
use parking_lot::{Mutex, RwLock};
use serde::ser::{Serialize, SerializeStruct, Serializer};

#[derive(Debug)]
pub struct User {
    id: UserId,
    user_name: String,
    phone_number: String,
    email_address: String,
    positions: RwLock<Vec<Position>>,
    rewards: RwLock<Vec<Reward>>,
    preferences: RwLock<UserPreferences>,
    trip_deals: Mutex<Vec<Provider>>,
}

impl User {
    pub fn new(
        user_name: impl Into<String>,
        phone_number: impl Into<String>,
        email_address: impl Into<String>,
    ) -> Self {
        Self::with_id(UserId::random(), user_name, phone_number, email_address)
    }

    pub fn with_id(
        id: UserId,
        user_name: impl Into<String>,
        phone_number: impl Into<String>,
        email_address: impl Into<String>,
    ) -> Self {
        Self {
            id,
            user_name: user_name.into(),
            phone_number: phone_number.into(),
            email_address: email_address.into(),
            positions: RwLock::new(Vec::new()),
            rewards: RwLock::new(Vec::new()),
            preferences: RwLock::new(UserPreferences::default()),
            trip_deals: Mutex::new(Vec::new()),
        }
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    pub fn email_address(&self) -> &str {
        &self.email_address
    }

    pub fn add_position(&self, position: Position) {
        debug_assert_eq!(
            position.user_id, self.id,
            "Invariant violated: position recorded for another user"
        );
        self.positions.write().push(position);
    }

    /// Snapshot of the position history, oldest first.
    pub fn positions(&self) -> Vec<Position> {
        self.positions.read().clone()
    }

    pub fn position_count(&self) -> usize {
        self.positions.read().len()
    }

    pub fn last_position(&self) -> Option<Position> {
        self.positions.read().last().copied()
    }

    /// Appends a reward. The whole record becomes visible at once.
    pub fn add_reward(&self, reward: Reward) {
        self.rewards.write().push(reward);
    }

    /// Snapshot of the reward collection. Order is unspecified.
    pub fn rewards(&self) -> Vec<Reward> {
        self.rewards.read().clone()
    }

    pub fn reward_count(&self) -> usize {
        self.rewards.read().len()
    }

    /// Sum of points over every reward, the trip pricer's input.
    pub fn reward_points(&self) -> u64 {
        self.rewards
            .read()
            .iter()
            .map(|reward| u64::from(reward.points))
            .sum()
    }

    pub fn preferences(&self) -> UserPreferences {
        self.preferences.read().clone()
    }

    pub fn set_preferences(&self, preferences: UserPreferences) {
        *self.preferences.write() = preferences;
    }

    pub fn trip_deals(&self) -> Vec<Provider> {
        self.trip_deals.lock().clone()
    }

    pub fn set_trip_deals(&self, providers: Vec<Provider>) {
        *self.trip_deals.lock() = providers;
    }
}

impl Serialize for User {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut state = serializer.serialize_struct("User", 5)?;
        state.serialize_field("user", &self.user_name)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("positions", &self.position_count())?;
        state.serialize_field("rewards", &self.reward_count())?;
        state.serialize_field("points", &self.reward_points())?;
        state.end()
    }
}
