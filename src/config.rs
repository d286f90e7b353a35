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

//! Service configuration.

use crate::proximity::{DEFAULT_ATTRACTION_PROXIMITY_RADIUS, DEFAULT_ELIGIBILITY_RADIUS};
use crate::rewards::DEFAULT_AWAIT_TIMEOUT;
use serde::Deserialize;
use std::time::Duration;

/// Tuning knobs for [`TourGuideService`](crate::TourGuideService).
///
/// Every field has a default, so a partial document deserializes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TourGuideConfig {
    /// Threads fetching positions.
    pub tracking_workers: usize,
    /// Threads running scoring passes.
    pub scoring_workers: usize,
    /// Threads evaluating position/attraction pairs, shared by all passes.
    /// Oracle calls block, so this is sized in the hundreds.
    pub fan_out_width: usize,
    pub eligibility_radius: f64,
    pub attraction_proximity_radius: f64,
    pub await_timeout_secs: u64,
    pub tracking_interval_secs: u64,
    /// Internal users generated at startup.
    pub internal_users: usize,
    pub trip_pricer_api_key: String,
}

impl Default for TourGuideConfig {
    fn default() -> Self {
        Self {
            tracking_workers: 200,
            scoring_workers: 400,
            fan_out_width: 400,
            eligibility_radius: DEFAULT_ELIGIBILITY_RADIUS,
            attraction_proximity_radius: DEFAULT_ATTRACTION_PROXIMITY_RADIUS,
            await_timeout_secs: DEFAULT_AWAIT_TIMEOUT.as_secs(),
            tracking_interval_secs: 5 * 60,
            internal_users: 0,
            trip_pricer_api_key: "test-server-api-key".to_string(),
        }
    }
}

impl TourGuideConfig {
    /// Small pools, for tests and short runs.
    pub fn compact() -> Self {
        Self {
            tracking_workers: 4,
            scoring_workers: 8,
            fan_out_width: 4,
            ..Self::default()
        }
    }

    pub fn await_timeout(&self) -> Duration {
        Duration::from_secs(self.await_timeout_secs)
    }

    pub fn tracking_interval(&self) -> Duration {
        Duration::from_secs(self.tracking_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_size_scoring_above_tracking() {
        let config = TourGuideConfig::default();
        assert!(config.scoring_workers > config.tracking_workers);
        assert_eq!(config.eligibility_radius, 10.0);
        assert_eq!(config.attraction_proximity_radius, 200.0);
        assert_eq!(config.await_timeout(), Duration::from_secs(900));
    }

    #[test]
    fn default_fan_out_matches_scoring_workers() {
        let config = TourGuideConfig::default();
        assert_eq!(config.fan_out_width, 400);
        assert_eq!(config.fan_out_width, config.scoring_workers);
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let config: TourGuideConfig =
            serde_json::from_str(r#"{"scoring_workers": 16, "internal_users": 100}"#).unwrap();
        assert_eq!(config.scoring_workers, 16);
        assert_eq!(config.internal_users, 100);
        assert_eq!(config.tracking_workers, 200);
        assert_eq!(config.trip_pricer_api_key, "test-server-api-key");
    }
}
