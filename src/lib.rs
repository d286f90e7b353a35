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

//! # Tour Guide
//!
//! This library tracks user positions and turns visited positions into
//! reward points by matching them against a catalog of attractions, then
//! ranks nearby attractions by distance.
//!
//! ## Core Components
//!
//! - [`TourGuideService`]: Entry point wiring tracking, scoring and ranking
//! - [`LocationTracker`]: Asynchronous position fetch on the tracking pool
//! - [`RewardEngine`]: Bounded-parallel reward scoring on the scoring pool
//! - [`NearbyAttractionRanker`]: Five closest attractions to a position
//! - [`ProximityPolicy`]: Eligibility and proximity radii
//! - [`WorkerPool`]: Fixed-size thread pool with joinable task handles
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tour_guide_rs::{TourGuideConfig, TourGuideService, User};
//!
//! let service = TourGuideService::simulated(TourGuideConfig::compact()).unwrap();
//! let user = Arc::new(User::new("jon", "000", "jon@tourGuide.com"));
//! service.add_user(Arc::clone(&user));
//!
//! // Fetch a position; scoring is queued in the background
//! let position = service.track(&user).unwrap().join().unwrap();
//! assert_eq!(position.user_id, user.id());
//!
//! // Wait for scoring, then read the results
//! assert!(service.await_completion(Duration::from_secs(60)).is_drained());
//! let nearby = service.nearby(&user, &position);
//! assert_eq!(nearby.len(), 5);
//! ```
//!
//! ## Thread Safety
//!
//! Tracking and scoring run on two independent pools. Each user's position
//! history and reward collection take concurrent appends; no lock spans
//! more than one user.

pub mod background;
mod base;
pub mod config;
pub mod directory;
pub mod distance;
pub mod error;
mod location;
pub mod logging;
pub mod nearby;
pub mod oracle;
pub mod pool;
mod preferences;
pub mod proximity;
mod reward;
pub mod rewards;
mod service;
pub mod tracker;
pub mod user;

pub use background::Tracker;
pub use base::{AttractionId, Coordinate, UserId};
pub use config::TourGuideConfig;
pub use directory::UserDirectory;
pub use distance::distance;
pub use error::{OracleError, PoolError, TourGuideError};
pub use location::{Attraction, Position};
pub use nearby::NearbyAttractionRanker;
pub use oracle::{AttractionCatalog, Catalog, PositionOracle, RewardPointOracle, TripPricer};
pub use pool::{Completion, TaskHandle, WorkerPool};
pub use preferences::{Provider, UserPreferences};
pub use proximity::ProximityPolicy;
pub use reward::{NearbyAttraction, Reward};
pub use rewards::{RewardEngine, ScoringHandle, ScoringReport};
pub use service::{Collaborators, TourGuideService};
pub use tracker::{LocationTracker, TrackingHandle};
pub use user::User;
