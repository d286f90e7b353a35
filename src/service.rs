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

//! Tour guide service.
//!
//! The [`TourGuideService`] wires the pipeline together and is what an outer
//! layer (HTTP, CLI) talks to. It owns:
//!
//! - the [`UserDirectory`],
//! - the shared [`ProximityPolicy`],
//! - a [`LocationTracker`] on the tracking pool,
//! - a [`RewardEngine`] on the scoring pool,
//! - a [`NearbyAttractionRanker`],
//! - an optional background [`Tracker`].
//!
//! # Shutdown
//!
//! [`TourGuideService::shutdown`] stops the background tracker, drains the
//! tracking pool, then drains scoring. Queued work still pending at the
//! timeout is discarded and reported. Dropping the service does the same.

use crate::background::{Tracker, track_round};
use crate::base::{Coordinate, UserId};
use crate::config::TourGuideConfig;
use crate::directory::UserDirectory;
use crate::error::{PoolError, TourGuideError};
use crate::location::Position;
use crate::nearby::NearbyAttractionRanker;
use crate::oracle::{
    AttractionCatalog, PositionOracle, RewardPointOracle, SimulatedGps, SimulatedRewardCentral,
    SimulatedTripPricer, TripPricer, load_catalog,
};
use crate::pool::{Completion, WorkerPool};
use crate::preferences::{Provider, UserPreferences};
use crate::proximity::ProximityPolicy;
use crate::reward::{NearbyAttraction, Reward};
use crate::rewards::{RewardEngine, ScoringHandle};
use crate::tracker::{LocationTracker, TrackingHandle};
use crate::user::User;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// External collaborators the service consumes.
#[derive(Clone)]
pub struct Collaborators {
    pub positions: Arc<dyn PositionOracle>,
    pub catalog: Arc<dyn AttractionCatalog>,
    pub reward_points: Arc<dyn RewardPointOracle>,
    pub trip_pricer: Arc<dyn TripPricer>,
}

impl Collaborators {
    /// In-process stand-ins for every collaborator.
    pub fn simulated() -> Self {
        let gps = Arc::new(SimulatedGps::new());
        Self {
            positions: gps.clone(),
            catalog: gps,
            reward_points: Arc::new(SimulatedRewardCentral::new()),
            trip_pricer: Arc::new(SimulatedTripPricer::new()),
        }
    }
}

pub struct TourGuideService {
    config: TourGuideConfig,
    directory: Arc<UserDirectory>,
    policy: Arc<ProximityPolicy>,
    rewards: Arc<RewardEngine>,
    tracker: Arc<LocationTracker>,
    ranker: NearbyAttractionRanker,
    trip_pricer: Arc<dyn TripPricer>,
    background: Mutex<Option<Tracker>>,
}

impl TourGuideService {
    /// Starts both worker pools and loads the attraction catalog.
    ///
    /// # Errors
    ///
    /// [`TourGuideError::Pool`] if a pool cannot be started.
    pub fn new(
        config: TourGuideConfig,
        collaborators: Collaborators,
    ) -> Result<Self, TourGuideError> {
        let attractions = load_catalog(collaborators.catalog.as_ref());
        let policy = Arc::new(ProximityPolicy::new(
            config.eligibility_radius,
            config.attraction_proximity_radius,
        ));

        let rewards = Arc::new(RewardEngine::new(
            WorkerPool::new("scoring", config.scoring_workers)?,
            config.fan_out_width,
            Arc::clone(&attractions),
            Arc::clone(&collaborators.reward_points),
            Arc::clone(&policy),
        )?);
        let tracker = Arc::new(LocationTracker::new(
            WorkerPool::new("tracking", config.tracking_workers)?,
            Arc::clone(&collaborators.positions),
            Arc::clone(&rewards),
        ));
        let ranker = NearbyAttractionRanker::new(attractions, collaborators.reward_points);

        let directory = Arc::new(UserDirectory::with_internal_users(config.internal_users));
        if config.internal_users > 0 {
            info!(users = config.internal_users, "test mode: internal users created");
        }

        Ok(Self {
            config,
            directory,
            policy,
            rewards,
            tracker,
            ranker,
            trip_pricer: collaborators.trip_pricer,
            background: Mutex::new(None),
        })
    }

    /// Service backed by the simulated collaborators.
    pub fn simulated(config: TourGuideConfig) -> Result<Self, TourGuideError> {
        Self::new(config, Collaborators::simulated())
    }

    pub fn config(&self) -> &TourGuideConfig {
        &self.config
    }

    pub fn policy(&self) -> &Arc<ProximityPolicy> {
        &self.policy
    }

    pub fn rewards_engine(&self) -> &Arc<RewardEngine> {
        &self.rewards
    }

    // === Users ===

    pub fn get_user(&self, user_name: &str) -> Option<Arc<User>> {
        self.directory.get_user(user_name)
    }

    /// Registers a user unless the username is taken.
    pub fn add_user(&self, user: Arc<User>) -> bool {
        self.directory.add_user(user)
    }

    pub fn all_users(&self) -> Vec<Arc<User>> {
        self.directory.all_users()
    }

    fn require_user(&self, user_name: &str) -> Result<Arc<User>, TourGuideError> {
        self.get_user(user_name)
            .ok_or_else(|| TourGuideError::UnknownUser(user_name.to_string()))
    }

    // === Tracking ===

    pub fn track(&self, user: &Arc<User>) -> Result<TrackingHandle, TourGuideError> {
        self.tracker.track(user)
    }

    pub fn get_user_location(&self, user: &Arc<User>) -> Result<Position, TourGuideError> {
        self.tracker.get_user_location(user)
    }

    /// Same as [`get_user_location`](Self::get_user_location), by username.
    pub fn get_location(&self, user_name: &str) -> Result<Position, TourGuideError> {
        let user = self.require_user(user_name)?;
        self.get_user_location(&user)
    }

    /// Tracks every registered user once and waits for the fetches.
    pub fn track_all_users(&self) -> usize {
        track_round(&self.directory, &self.tracker)
    }

    /// Last known coordinate of every user, `None` for users never located.
    pub fn get_all_current_locations(&self) -> HashMap<UserId, Option<Coordinate>> {
        self.directory
            .all_users()
            .iter()
            .map(|user| {
                let coordinate = user.last_position().and_then(|p| p.coordinate);
                (user.id(), coordinate)
            })
            .collect()
    }

    /// Starts periodic tracking of every user. No-op if already running.
    pub fn start_tracking(&self) -> Result<(), TourGuideError> {
        let mut background = self.background.lock();
        if background.is_none() {
            let tracker = Tracker::start(
                Arc::clone(&self.directory),
                Arc::clone(&self.tracker),
                self.config.tracking_interval(),
            )
            .map_err(|e| PoolError::Spawn(e.to_string()))?;
            *background = Some(tracker);
        }
        Ok(())
    }

    pub fn stop_tracking(&self) {
        // Taken out first so the join happens without the lock held.
        let tracker = self.background.lock().take();
        if let Some(mut tracker) = tracker {
            tracker.stop_tracking();
        }
    }

    // === Rewards ===

    pub fn calculate_rewards(&self, user: &Arc<User>) -> Result<ScoringHandle, TourGuideError> {
        self.rewards.calculate_rewards(user)
    }

    pub fn get_rewards(&self, user: &User) -> Vec<Reward> {
        user.rewards()
    }

    pub fn set_proximity_radius(&self, radius: f64) {
        self.policy.set_proximity_radius(radius);
    }

    pub fn set_default_proximity_radius(&self) {
        self.policy.set_default();
    }

    /// Waits for submitted scoring passes; see [`RewardEngine::await_completion`].
    pub fn await_completion(&self, timeout: Duration) -> Completion {
        self.rewards.await_completion(timeout)
    }

    pub fn nearby(&self, user: &User, position: &Position) -> Vec<NearbyAttraction> {
        self.ranker.nearby(user, position)
    }

    /// Closest attractions to the user's current location.
    pub fn get_nearby_attractions(
        &self,
        user_name: &str,
    ) -> Result<Vec<NearbyAttraction>, TourGuideError> {
        let user = self.require_user(user_name)?;
        let position = self.get_user_location(&user)?;
        Ok(self.nearby(&user, &position))
    }

    // === Trips ===

    /// Prices trips from the user's preferences and accumulated points, and
    /// keeps the offers on the user.
    pub fn get_trip_deals(&self, user: &User) -> Vec<Provider> {
        let preferences = user.preferences();
        let providers = self.trip_pricer.price(
            &self.config.trip_pricer_api_key,
            user.id(),
            preferences.number_of_adults,
            preferences.number_of_children,
            preferences.trip_duration,
            user.reward_points(),
        );
        user.set_trip_deals(providers.clone());
        providers
    }

    pub fn update_user_preferences(
        &self,
        user_name: &str,
        preferences: UserPreferences,
    ) -> Result<UserPreferences, TourGuideError> {
        let user = self.require_user(user_name)?;
        user.set_preferences(preferences);
        Ok(user.preferences())
    }

    // === Lifecycle ===

    /// Stops background tracking, then drains tracking and scoring within
    /// the configured timeout each.
    pub fn shutdown(&self) -> (Completion, Completion) {
        self.stop_tracking();
        let timeout = self.config.await_timeout();
        let tracking = self.tracker.shutdown(timeout);
        let scoring = self.rewards.await_completion(timeout);
        info!(?tracking, ?scoring, "tour guide service shut down");
        (tracking, scoring)
    }
}

impl std::fmt::Debug for TourGuideService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TourGuideService")
            .field("users", &self.directory.len())
            .field("tracker", &self.tracker)
            .field("rewards", &self.rewards)
            .finish()
    }
}

impl Drop for TourGuideService {
    fn drop(&mut self) {
        self.stop_tracking();
        // Best effort: in-flight fetches finish, queued ones are dropped.
        self.tracker.shutdown(Duration::ZERO);
    }
}
