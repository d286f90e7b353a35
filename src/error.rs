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

//! Error types for tracking and scoring.

use thiserror::Error;

/// Failures reported by an external collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// The collaborator did not answer
    #[error("{service} unavailable: {reason}")]
    Unavailable {
        service: &'static str,
        reason: String,
    },
}

/// Worker pool failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// Pool no longer accepts tasks
    #[error("task rejected: pool `{0}` is shut down")]
    ShutDown(String),

    /// Task was discarded or panicked before producing a result
    #[error("task lost before completion")]
    TaskLost,

    /// Task did not finish within the join timeout
    #[error("task did not complete in time")]
    TimedOut,

    /// Worker threads could not be started
    #[error("failed to start worker pool: {0}")]
    Spawn(String),
}

/// Errors surfaced to callers of the tour guide service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TourGuideError {
    /// No user registered under this name
    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Pool(#[from] PoolError),
}
