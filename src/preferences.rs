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

//! Trip preferences and trip-pricer offers.
//!
//! Price points are plain decimal amounts in the preference's currency;
//! no conversion or formatting happens here.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Trip preferences a user hands to the trip pricer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserPreferences {
    pub attraction_proximity: u32,
    pub currency: String,
    pub lower_price_point: Decimal,
    pub high_price_point: Decimal,
    pub trip_duration: u32,
    pub ticket_quantity: u32,
    pub number_of_adults: u32,
    pub number_of_children: u32,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            attraction_proximity: u32::MAX,
            currency: "USD".to_string(),
            lower_price_point: Decimal::ZERO,
            high_price_point: Decimal::from(i32::MAX),
            trip_duration: 1,
            ticket_quantity: 1,
            number_of_adults: 1,
            number_of_children: 0,
        }
    }
}

/// A priced trip offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub name: String,
    pub price: Decimal,
    pub trip_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn defaults_match_single_adult_one_night() {
        let prefs = UserPreferences::default();
        assert_eq!(prefs.currency, "USD");
        assert_eq!(prefs.number_of_adults, 1);
        assert_eq!(prefs.number_of_children, 0);
        assert_eq!(prefs.trip_duration, 1);
        assert_eq!(prefs.lower_price_point, dec!(0));
        assert_eq!(prefs.high_price_point, dec!(2147483647));
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let prefs: UserPreferences =
            serde_json::from_str(r#"{"numberOfAdults": 2, "highPricePoint": "1500.50"}"#).unwrap();
        assert_eq!(prefs.number_of_adults, 2);
        assert_eq!(prefs.high_price_point, dec!(1500.50));
        assert_eq!(prefs.ticket_quantity, 1);
        assert_eq!(prefs.currency, "USD");
    }
}
