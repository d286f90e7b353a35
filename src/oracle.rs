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

//! External collaborators and their simulated stand-ins.
//!
//! The engine only sees the traits. Every call may block for an unspecified
//! time, so callers run them on worker pools, never while holding a lock.

use crate::base::{AttractionId, Coordinate, UserId};
use crate::error::OracleError;
use crate::location::{Attraction, Position};
use crate::preferences::Provider;
use chrono::{Duration as ChronoDuration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use uuid::Uuid;

/// Immutable attraction catalog shared by every computation.
pub type Catalog = Arc<[Arc<Attraction>]>;

/// Supplies a user's current position.
pub trait PositionOracle: Send + Sync {
    fn user_location(&self, user_id: UserId) -> Result<Position, OracleError>;
}

/// Supplies the attraction catalog. Read once at startup.
pub trait AttractionCatalog: Send + Sync {
    fn attractions(&self) -> Vec<Attraction>;
}

/// Supplies the points a user earns for visiting an attraction.
pub trait RewardPointOracle: Send + Sync {
    fn attraction_reward_points(
        &self,
        attraction_id: AttractionId,
        user_id: UserId,
    ) -> Result<u32, OracleError>;
}

/// Prices trips for a party, discounted by accumulated reward points.
pub trait TripPricer: Send + Sync {
    fn price(
        &self,
        api_key: &str,
        user_id: UserId,
        adults: u32,
        children: u32,
        nights: u32,
        reward_points: u64,
    ) -> Vec<Provider>;
}

/// Loads the catalog once into its shared immutable form.
pub fn load_catalog(source: &dyn AttractionCatalog) -> Catalog {
    source.attractions().into_iter().map(Arc::new).collect()
}

const ATTRACTIONS: [(&str, &str, &str, f64, f64); 26] = [
    ("Disneyland", "Anaheim", "CA", 33.817595, -117.922008),
    ("Jackson Hole", "Jackson Hole", "WY", 43.582767, -110.821999),
    ("Mojave National Preserve", "Kelso", "CA", 35.141689, -115.510399),
    ("Joshua Tree National Park", "Joshua Tree National Park", "CA", 33.881866, -115.90065),
    ("Buffalo National River", "St Joe", "AR", 35.985512, -92.757652),
    ("Hot Springs National Park", "Hot Springs", "AR", 34.52153, -93.042267),
    ("Kartchner Caverns State Park", "Benson", "AZ", 31.837551, -110.347382),
    ("Legend Valley", "Thornville", "OH", 39.937778, -82.40667),
    ("Flowers Bakery of London", "Flowers Bakery of London", "KY", 37.131527, -84.07486),
    ("McKinley Tower", "Anchorage", "AK", 61.218887, -149.877502),
    ("Flatiron Building", "New York City", "NY", 40.741112, -73.989723),
    ("Fallingwater", "Mill Run", "PA", 39.906113, -79.468056),
    ("Union Station", "Washington D.C.", "CA", 38.897095, -77.006332),
    ("Roger Dean Stadium", "Jupiter", "FL", 26.890959, -80.116577),
    ("Texas Memorial Stadium", "Austin", "TX", 30.283682, -97.732536),
    ("Bryant-Denny Stadium", "Tuscaloosa", "AL", 33.208973, -87.550438),
    ("Tiger Stadium", "Baton Rouge", "LA", 30.412035, -91.183815),
    ("Neyland Stadium", "Knoxville", "TN", 35.955013, -83.925011),
    ("Kyle Field", "College Station", "TX", 30.61025, -96.339844),
    ("San Diego Zoo", "San Diego", "CA", 32.735317, -117.149048),
    ("Zoo Tampa at Lowry Park", "Tampa", "FL", 28.012804, -82.469269),
    ("Franklin Park Zoo", "Boston", "MA", 42.302601, -71.086731),
    ("El Paso Zoo", "El Paso", "TX", 31.769125, -106.44487),
    ("Kansas City Zoo", "Kansas City", "MO", 39.007504, -94.529625),
    ("Bronx Zoo", "Bronx", "NY", 40.852905, -73.872971),
    ("Cinderella Castle", "Orlando", "FL", 28.419411, -81.5812),
];

/// Web-Mercator latitude bound.
pub const MAX_LATITUDE: f64 = 85.05112878;

pub fn random_coordinate<R: Rng + ?Sized>(rng: &mut R) -> Coordinate {
    Coordinate::new(
        rng.gen_range(-MAX_LATITUDE..=MAX_LATITUDE),
        rng.gen_range(-180.0..=180.0),
    )
}

/// In-process GPS: a fixed 26-attraction catalog and random positions.
#[derive(Debug)]
pub struct SimulatedGps {
    attractions: Vec<Attraction>,
    latency: Duration,
}

impl SimulatedGps {
    pub fn new() -> Self {
        Self::with_latency(Duration::ZERO)
    }

    /// Every `user_location` call sleeps for `latency` first.
    pub fn with_latency(latency: Duration) -> Self {
        let attractions = ATTRACTIONS
            .iter()
            .map(|&(name, city, state, latitude, longitude)| {
                Attraction::new(name, city, state, Coordinate::new(latitude, longitude))
            })
            .collect();
        Self {
            attractions,
            latency,
        }
    }
}

impl Default for SimulatedGps {
    fn default() -> Self {
        Self::new()
    }
}

impl PositionOracle for SimulatedGps {
    fn user_location(&self, user_id: UserId) -> Result<Position, OracleError> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        let coordinate = random_coordinate(&mut rand::thread_rng());
        Ok(Position::new(user_id, coordinate, Utc::now()))
    }
}

impl AttractionCatalog for SimulatedGps {
    fn attractions(&self) -> Vec<Attraction> {
        self.attractions.clone()
    }
}

/// In-process reward central: 1 to 1000 points per lookup.
#[derive(Debug, Default)]
pub struct SimulatedRewardCentral {
    latency: Duration,
}

impl SimulatedRewardCentral {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_latency(latency: Duration) -> Self {
        Self { latency }
    }
}

impl RewardPointOracle for SimulatedRewardCentral {
    fn attraction_reward_points(
        &self,
        _attraction_id: AttractionId,
        _user_id: UserId,
    ) -> Result<u32, OracleError> {
        if !self.latency.is_zero() {
            thread::sleep(self.latency);
        }
        Ok(rand::thread_rng().gen_range(1..=1000))
    }
}

const PROVIDERS: [&str; 10] = [
    "Holiday Travels",
    "Enterprize Ventures Limited",
    "Sunny Days",
    "FlyAway Trips",
    "United Partners Vacations",
    "Dream Trips",
    "Live Free",
    "Dancing Waves Cruselines and Partners",
    "AdventureCo",
    "Cure-Your-Blues",
];

/// Number of offers the simulated pricer returns.
pub const TRIP_DEAL_COUNT: usize = 5;

/// In-process trip pricer returning five offers from random providers.
#[derive(Debug, Default)]
pub struct SimulatedTripPricer;

impl SimulatedTripPricer {
    pub fn new() -> Self {
        Self
    }
}

impl TripPricer for SimulatedTripPricer {
    fn price(
        &self,
        _api_key: &str,
        _user_id: UserId,
        adults: u32,
        children: u32,
        nights: u32,
        reward_points: u64,
    ) -> Vec<Provider> {
        let mut rng = rand::thread_rng();
        let start = rng.gen_range(0..PROVIDERS.len());
        let discount = Decimal::from(reward_points) / Decimal::from(100);

        (0..TRIP_DEAL_COUNT)
            .map(|offset| {
                let nightly = Decimal::from(rng.gen_range(100u32..=700));
                // Children travel at two thirds of the adult rate.
                let party = Decimal::from(adults) + Decimal::from(children) * Decimal::new(66, 2);
                let price = (nightly * party * Decimal::from(nights.max(1)) - discount)
                    .max(Decimal::ZERO)
                    .round_dp(2);
                Provider {
                    name: PROVIDERS[(start + offset) % PROVIDERS.len()].to_string(),
                    price,
                    trip_id: Uuid::new_v4(),
                }
            })
            .collect()
    }
}

/// Random visit time within the last 30 days.
pub fn random_visit_time<R: Rng + ?Sized>(rng: &mut R) -> chrono::DateTime<Utc> {
    Utc::now() - ChronoDuration::days(rng.gen_range(0..30))
}
