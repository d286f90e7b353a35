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

//! Great-circle distance.

use crate::base::Coordinate;

pub const STATUTE_MILES_PER_NAUTICAL_MILE: f64 = 1.15077945;

/// One degree of arc on a great circle is 60 nautical miles.
pub const NAUTICAL_MILES_PER_DEGREE: f64 = 60.0;

/// Distance in statute miles between two coordinates.
///
/// Uses the spherical law of cosines. Symmetric and zero for identical
/// points. NaN coordinates yield NaN.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    // sin² + cos² is not exactly 1.0 in floating point.
    if a == b {
        return 0.0;
    }

    let lat1 = a.latitude.to_radians();
    let lon1 = a.longitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let lon2 = b.longitude.to_radians();

    // Keep acos in its domain for nearly coincident points.
    let cosine = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * (lon1 - lon2).cos();
    let angle = cosine.clamp(-1.0, 1.0).acos();

    let nautical_miles = NAUTICAL_MILES_PER_DEGREE * angle.to_degrees();
    STATUTE_MILES_PER_NAUTICAL_MILE * nautical_miles
}
