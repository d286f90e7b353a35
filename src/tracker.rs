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

//! Location tracking.
//!
//! [`LocationTracker::track`] runs on its own pool, separate from scoring,
//! so a scoring backlog never delays new position fetches. One tracking
//! task fetches the position, records it, queues a scoring pass without
//! waiting for it, and resolves with the position.

use crate::error::{OracleError, TourGuideError};
use crate::location::Position;
use crate::oracle::PositionOracle;
use crate::pool::{Completion, TaskHandle, WorkerPool};
use crate::rewards::RewardEngine;
use crate::user::User;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Position produced by one tracking task.
#[derive(Debug)]
pub struct TrackingHandle {
    task: TaskHandle<Result<Position, OracleError>>,
}

impl TrackingHandle {
    /// Blocks until the position is recorded.
    ///
    /// # Errors
    ///
    /// - [`TourGuideError::Oracle`] - the position oracle failed.
    /// - [`TourGuideError::Pool`] - the task was discarded at shutdown.
    pub fn join(self) -> Result<Position, TourGuideError> {
        Ok(self.task.join()??)
    }

    pub fn join_timeout(&self, timeout: Duration) -> Result<Position, TourGuideError> {
        Ok(self.task.join_timeout(timeout)??)
    }
}

pub struct LocationTracker {
    pool: WorkerPool,
    positions: Arc<dyn PositionOracle>,
    rewards: Arc<RewardEngine>,
}

impl LocationTracker {
    pub fn new(
        pool: WorkerPool,
        positions: Arc<dyn PositionOracle>,
        rewards: Arc<RewardEngine>,
    ) -> Self {
        Self {
            pool,
            positions,
            rewards,
        }
    }

    /// Fetches and records the user's current position in the background.
    ///
    /// # Errors
    ///
    /// [`TourGuideError::Pool`] if the tracking pool is shut down.
    pub fn track(&self, user: &Arc<User>) -> Result<TrackingHandle, TourGuideError> {
        let user = Arc::clone(user);
        let positions = Arc::clone(&self.positions);
        let rewards = Arc::clone(&self.rewards);

        let task = self
            .pool
            .submit(move || record_position(positions.as_ref(), &rewards, &user))?;
        Ok(TrackingHandle { task })
    }

    /// Most recent recorded position, fetching one if the history is empty.
    ///
    /// The fetch blocks the caller. On a tracking worker it runs inline
    /// rather than queueing behind the caller on the same pool.
    pub fn get_user_location(&self, user: &Arc<User>) -> Result<Position, TourGuideError> {
        if let Some(position) = user.last_position() {
            return Ok(position);
        }
        if self.pool.is_current_thread_worker() {
            return Ok(record_position(
                self.positions.as_ref(),
                &self.rewards,
                user,
            )?);
        }
        self.track(user)?.join()
    }

    /// Stops accepting tracking requests and drains in-flight fetches,
    /// discarding queued ones on timeout.
    pub fn shutdown(&self, timeout: Duration) -> Completion {
        let completion = self.pool.drain(timeout);
        if let Completion::TimedOut { discarded } = completion {
            warn!(discarded, "tracking requests dropped at shutdown");
        }
        completion
    }
}

impl std::fmt::Debug for LocationTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationTracker")
            .field("pool", &self.pool)
            .finish()
    }
}

fn record_position(
    positions: &dyn PositionOracle,
    rewards: &RewardEngine,
    user: &Arc<User>,
) -> Result<Position, OracleError> {
    let position = positions.user_location(user.id())?;
    user.add_position(position);

    // Not awaited: the position is returned as soon as it is recorded.
    if let Err(e) = rewards.calculate_rewards(user) {
        warn!(user = %user.user_name(), error = %e, "scoring not scheduled");
    }

    debug!(user = %user.user_name(), "position recorded");
    Ok(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::{SimulatedGps, SimulatedRewardCentral, load_catalog};
    use crate::proximity::ProximityPolicy;

    fn tracker(tracking_workers: usize) -> LocationTracker {
        let gps = Arc::new(SimulatedGps::new());
        let rewards = RewardEngine::new(
            WorkerPool::new("scoring-test", 2).unwrap(),
            2,
            load_catalog(gps.as_ref()),
            Arc::new(SimulatedRewardCentral::new()),
            Arc::new(ProximityPolicy::default()),
        )
        .unwrap();
        LocationTracker::new(
            WorkerPool::new("tracking-test", tracking_workers).unwrap(),
            gps,
            Arc::new(rewards),
        )
    }

    #[test]
    fn track_records_position_for_user() {
        let tracker = tracker(2);
        let user = Arc::new(User::new("jon", "000", "jon@tourGuide.com"));

        let position = tracker.track(&user).unwrap().join().unwrap();

        assert_eq!(position.user_id, user.id());
        assert_eq!(user.last_position(), Some(position));
    }

    #[test]
    fn get_user_location_prefers_cached_position() {
        let tracker = tracker(1);
        let user = Arc::new(User::new("jon", "000", "jon@tourGuide.com"));

        let first = tracker.get_user_location(&user).unwrap();
        let second = tracker.get_user_location(&user).unwrap();

        assert_eq!(first, second);
        assert_eq!(user.position_count(), 1);
    }

    #[test]
    fn nested_lookup_on_single_worker_does_not_starve() {
        let tracker = Arc::new(tracker(1));
        let user = Arc::new(User::new("jon", "000", "jon@tourGuide.com"));

        let inner_tracker = Arc::clone(&tracker);
        let inner_user = Arc::clone(&user);
        let handle = tracker
            .pool
            .submit(move || inner_tracker.get_user_location(&inner_user))
            .unwrap();

        let position = handle.join_timeout(Duration::from_secs(10)).unwrap().unwrap();
        assert_eq!(position.user_id, user.id());
    }

    #[test]
    fn shutdown_rejects_tracking() {
        let tracker = tracker(1);
        let user = Arc::new(User::new("jon", "000", "jon@tourGuide.com"));

        assert_eq!(tracker.shutdown(Duration::from_secs(5)), Completion::Drained);
        assert!(matches!(tracker.track(&user), Err(TourGuideError::Pool(_))));
    }
}
