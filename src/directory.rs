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

//! In-memory user registry.

use crate::location::Position;
use crate::oracle::{random_coordinate, random_visit_time};
use crate::user::User;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use rand::Rng;
use std::sync::Arc;
use tracing::debug;

/// Positions generated for each internal user.
const INTERNAL_HISTORY_LEN: usize = 3;

/// Users keyed by username.
///
/// Backed by a [`DashMap`]: registering or looking up one user never blocks
/// on another.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: DashMap<String, Arc<User>>,
}

impl UserDirectory {
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
        }
    }

    /// Directory pre-filled with `internalUser{i}` users, each carrying a
    /// short random position history.
    pub fn with_internal_users(count: usize) -> Self {
        let directory = Self::new();
        let mut rng = rand::thread_rng();
        for index in 0..count {
            let user_name = format!("internalUser{index}");
            let email = format!("{user_name}@tourGuide.com");
            let user = Arc::new(User::new(user_name, "000", email));
            generate_history(&user, &mut rng);
            directory.add_user(user);
        }
        debug!(count, "created internal test users");
        directory
    }

    /// Registers `user` unless the username is taken.
    ///
    /// Returns `true` if the user was inserted.
    pub fn add_user(&self, user: Arc<User>) -> bool {
        // Entry API keeps check-and-insert atomic.
        match self.users.entry(user.user_name().to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(user);
                true
            }
        }
    }

    pub fn get_user(&self, user_name: &str) -> Option<Arc<User>> {
        self.users.get(user_name).map(|user| Arc::clone(user.value()))
    }

    pub fn all_users(&self) -> Vec<Arc<User>> {
        self.users
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

fn generate_history<R: Rng + ?Sized>(user: &User, rng: &mut R) {
    for _ in 0..INTERNAL_HISTORY_LEN {
        user.add_position(Position::new(
            user.id(),
            random_coordinate(rng),
            random_visit_time(rng),
        ));
    }
}
