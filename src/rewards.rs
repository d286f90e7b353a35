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

//! Reward scoring.
//!
//! The [`RewardEngine`] turns a user's visited positions into rewards. Each
//! call to [`RewardEngine::calculate_rewards`] becomes one task on the
//! scoring pool; inside that task the cross product
//! `positions × attractions` is evaluated on a bounded fan-out pool.
//!
//! # Scoring a pair
//!
//! 1. Skip the pair unless the position lies within the eligibility radius.
//! 2. Ask the reward-point oracle for `(attraction, user)`.
//! 3. Append the reward. A failed or panicking oracle call is logged and
//!    counted; the other pairs carry on.
//!
//! # Duplicates
//!
//! Rewards are not deduplicated. Scoring an unchanged user twice appends
//! every qualifying pair twice.

use crate::error::{PoolError, TourGuideError};
use crate::location::{Attraction, Position};
use crate::oracle::{Catalog, RewardPointOracle};
use crate::pool::{Completion, TaskHandle, WorkerPool};
use crate::proximity::ProximityPolicy;
use crate::reward::Reward;
use crate::user::User;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Default bound for [`RewardEngine::await_completion`].
pub const DEFAULT_AWAIT_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Tally of one scoring pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoringReport {
    pub pairs_evaluated: usize,
    pub rewards_added: usize,
    pub failures: usize,
    /// Pairs skipped because the pass was cancelled.
    pub cancelled: usize,
}

impl ScoringReport {
    fn merge(self, other: Self) -> Self {
        Self {
            pairs_evaluated: self.pairs_evaluated + other.pairs_evaluated,
            rewards_added: self.rewards_added + other.rewards_added,
            failures: self.failures + other.failures,
            cancelled: self.cancelled + other.cancelled,
        }
    }
}

enum PairOutcome {
    Ineligible,
    Rewarded,
    Failed,
    Cancelled,
}

impl PairOutcome {
    fn into_report(self) -> ScoringReport {
        let mut report = ScoringReport::default();
        match self {
            PairOutcome::Ineligible => report.pairs_evaluated = 1,
            PairOutcome::Rewarded => {
                report.pairs_evaluated = 1;
                report.rewards_added = 1;
            }
            PairOutcome::Failed => {
                report.pairs_evaluated = 1;
                report.failures = 1;
            }
            PairOutcome::Cancelled => report.cancelled = 1,
        }
        report
    }
}

/// Handle to one in-flight scoring pass.
///
/// Dropping the handle abandons the report; the pass keeps running.
#[derive(Debug)]
pub struct ScoringHandle {
    task: TaskHandle<ScoringReport>,
    token: CancellationToken,
}

impl ScoringHandle {
    pub fn join(self) -> Result<ScoringReport, PoolError> {
        self.task.join()
    }

    pub fn join_timeout(&self, timeout: Duration) -> Result<ScoringReport, PoolError> {
        self.task.join_timeout(timeout)
    }

    /// Stops evaluating remaining pairs. Rewards already appended stay.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

/// Everything one scoring pass needs, moved onto the scoring pool.
struct ScoringTask {
    user: Arc<User>,
    attractions: Catalog,
    reward_points: Arc<dyn RewardPointOracle>,
    policy: Arc<ProximityPolicy>,
    fan_out: Arc<ThreadPool>,
    token: CancellationToken,
}

impl ScoringTask {
    fn run(self) -> ScoringReport {
        let positions = self.user.positions();
        let report = self.fan_out.install(|| {
            positions
                .par_iter()
                .flat_map(|position| {
                    self.attractions
                        .par_iter()
                        .map(move |attraction| (position, attraction))
                })
                .map(|(position, attraction)| self.score_pair(position, attraction).into_report())
                .reduce(ScoringReport::default, ScoringReport::merge)
        });

        debug!(
            user = %self.user.user_name(),
            positions = positions.len(),
            rewards = report.rewards_added,
            failures = report.failures,
            cancelled = report.cancelled,
            "scoring pass finished"
        );
        report
    }

    fn score_pair(&self, position: &Position, attraction: &Arc<Attraction>) -> PairOutcome {
        if self.token.is_cancelled() {
            return PairOutcome::Cancelled;
        }
        if !self.policy.is_eligible_for_reward(position, attraction) {
            return PairOutcome::Ineligible;
        }

        // A panicking oracle fails its pair only.
        let lookup = panic::catch_unwind(AssertUnwindSafe(|| {
            self.reward_points
                .attraction_reward_points(attraction.id, self.user.id())
        }));

        match lookup {
            Ok(Ok(points)) => {
                self.user
                    .add_reward(Reward::new(*position, Arc::clone(attraction), points));
                PairOutcome::Rewarded
            }
            Ok(Err(e)) => {
                warn!(
                    user = %self.user.user_name(),
                    attraction = %attraction.name,
                    error = %e,
                    "skipping reward"
                );
                PairOutcome::Failed
            }
            Err(_) => {
                warn!(
                    user = %self.user.user_name(),
                    attraction = %attraction.name,
                    "reward oracle panicked, skipping reward"
                );
                PairOutcome::Failed
            }
        }
    }
}

/// Computes rewards on a dedicated scoring pool.
///
/// # Thread Safety
///
/// Passes for different users share nothing but the catalog and the
/// policy. Passes for the same user interleave their appends freely; each
/// append is atomic.
pub struct RewardEngine {
    pool: WorkerPool,
    fan_out: Arc<ThreadPool>,
    attractions: Catalog,
    reward_points: Arc<dyn RewardPointOracle>,
    policy: Arc<ProximityPolicy>,
    token: CancellationToken,
}

impl RewardEngine {
    /// Builds an engine around an owned scoring pool.
    ///
    /// `fan_out_width` bounds how many pairs of one pass, across all
    /// passes, are evaluated at once.
    ///
    /// # Errors
    ///
    /// [`PoolError::Spawn`] if the fan-out threads cannot be started.
    pub fn new(
        pool: WorkerPool,
        fan_out_width: usize,
        attractions: Catalog,
        reward_points: Arc<dyn RewardPointOracle>,
        policy: Arc<ProximityPolicy>,
    ) -> Result<Self, PoolError> {
        let fan_out = ThreadPoolBuilder::new()
            .num_threads(fan_out_width.max(1))
            .thread_name(|index| format!("fan-out-{index}"))
            .build()
            .map_err(|e| PoolError::Spawn(e.to_string()))?;

        Ok(Self {
            pool,
            fan_out: Arc::new(fan_out),
            attractions,
            reward_points,
            policy,
            token: CancellationToken::new(),
        })
    }

    pub fn policy(&self) -> &Arc<ProximityPolicy> {
        &self.policy
    }

    pub fn attractions(&self) -> &Catalog {
        &self.attractions
    }

    /// Queues a scoring pass for `user`.
    ///
    /// # Errors
    ///
    /// [`PoolError::ShutDown`] once [`await_completion`](Self::await_completion)
    /// has been called.
    pub fn calculate_rewards(&self, user: &Arc<User>) -> Result<ScoringHandle, TourGuideError> {
        let token = self.token.child_token();
        let task = ScoringTask {
            user: Arc::clone(user),
            attractions: Arc::clone(&self.attractions),
            reward_points: Arc::clone(&self.reward_points),
            policy: Arc::clone(&self.policy),
            fan_out: Arc::clone(&self.fan_out),
            token: token.clone(),
        };

        let task = self.pool.submit(move || task.run())?;
        Ok(ScoringHandle { task, token })
    }

    /// Stops accepting passes and waits for submitted ones to finish.
    ///
    /// On timeout, running passes are cancelled and queued ones discarded;
    /// the returned [`Completion::TimedOut`] tells the caller.
    pub fn await_completion(&self, timeout: Duration) -> Completion {
        self.pool.shutdown();
        if self.pool.await_termination(timeout) {
            return Completion::Drained;
        }

        self.token.cancel();
        let discarded = self.pool.shutdown_now();
        warn!(
            discarded,
            running = self.pool.outstanding(),
            "scoring did not complete in time, remaining passes cancelled"
        );
        Completion::TimedOut { discarded }
    }

    /// Cancels every pass, running or queued, without shutting the pool.
    pub fn cancel_all(&self) {
        self.token.cancel();
    }
}

impl std::fmt::Debug for RewardEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RewardEngine")
            .field("pool", &self.pool)
            .field("attractions", &self.attractions.len())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::Coordinate;
    use crate::oracle::{SimulatedGps, SimulatedRewardCentral, load_catalog};
    use chrono::Utc;

    fn engine(policy: ProximityPolicy) -> RewardEngine {
        RewardEngine::new(
            WorkerPool::new("scoring-test", 4).unwrap(),
            4,
            load_catalog(&SimulatedGps::new()),
            Arc::new(SimulatedRewardCentral::new()),
            Arc::new(policy),
        )
        .unwrap()
    }

    fn user_at(coordinate: Coordinate) -> Arc<User> {
        let user = Arc::new(User::new("jon", "000", "jon@tourGuide.com"));
        user.add_position(Position::new(user.id(), coordinate, Utc::now()));
        user
    }

    #[test]
    fn report_counts_every_pair() {
        let engine = engine(ProximityPolicy::default());
        let first = engine.attractions()[0].coordinate;
        let user = user_at(first);

        let report = engine.calculate_rewards(&user).unwrap().join().unwrap();

        assert_eq!(report.pairs_evaluated, 26);
        assert_eq!(report.rewards_added, 1);
        assert_eq!(report.failures, 0);
        assert_eq!(user.reward_count(), 1);
    }

    #[test]
    fn cancelled_pass_adds_nothing() {
        let engine = engine(ProximityPolicy::new(f64::MAX, f64::MAX));
        let user = user_at(Coordinate::new(0.0, 0.0));

        engine.cancel_all();
        let report = engine.calculate_rewards(&user).unwrap().join().unwrap();

        assert_eq!(report.cancelled, 26);
        assert_eq!(report.rewards_added, 0);
        assert_eq!(user.reward_count(), 0);
    }

    #[test]
    fn rejects_after_await_completion() {
        let engine = engine(ProximityPolicy::default());
        let user = user_at(Coordinate::new(0.0, 0.0));

        assert_eq!(engine.await_completion(Duration::from_secs(5)), Completion::Drained);
        assert!(matches!(
            engine.calculate_rewards(&user),
            Err(TourGuideError::Pool(PoolError::ShutDown(_)))
        ));
    }

    #[test]
    fn merge_adds_fields() {
        let a = PairOutcome::Rewarded.into_report();
        let b = PairOutcome::Failed.into_report();
        let c = PairOutcome::Cancelled.into_report();
        let merged = a.merge(b).merge(c);
        assert_eq!(
            merged,
            ScoringReport {
                pairs_evaluated: 2,
                rewards_added: 1,
                failures: 1,
                cancelled: 1,
            }
        );
    }
}
