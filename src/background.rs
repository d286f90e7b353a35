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

//! Periodic tracking of every registered user.

use crate::directory::UserDirectory;
use crate::tracker::LocationTracker;
use crossbeam::channel::{self, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Tracks every user once and waits for the fetches.
///
/// Returns how many positions were recorded. Stops submitting as soon as
/// the tracking pool rejects a request.
pub fn track_round(directory: &UserDirectory, tracker: &LocationTracker) -> usize {
    let users = directory.all_users();
    let mut handles = Vec::with_capacity(users.len());
    for user in &users {
        match tracker.track(user) {
            Ok(handle) => handles.push(handle),
            Err(e) => {
                warn!(error = %e, "tracking round cut short");
                break;
            }
        }
    }

    handles
        .into_iter()
        .filter_map(|handle| match handle.join() {
            Ok(position) => Some(position),
            Err(e) => {
                warn!(error = %e, "tracking request failed");
                None
            }
        })
        .count()
}

/// Background thread running [`track_round`] every interval until stopped.
#[derive(Debug)]
pub struct Tracker {
    stop: Sender<()>,
    thread: Option<JoinHandle<()>>,
}

impl Tracker {
    pub fn start(
        directory: Arc<UserDirectory>,
        tracker: Arc<LocationTracker>,
        interval: Duration,
    ) -> std::io::Result<Self> {
        let (stop, stopped) = channel::bounded::<()>(1);
        let thread = thread::Builder::new()
            .name("tracker".to_string())
            .spawn(move || {
                loop {
                    match stopped.try_recv() {
                        Err(TryRecvError::Empty) => {}
                        Ok(()) | Err(TryRecvError::Disconnected) => break,
                    }

                    let started = Instant::now();
                    let users = directory.len();
                    let tracked = track_round(&directory, &tracker);
                    debug!(users, tracked, elapsed = ?started.elapsed(), "tracking round");

                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                debug!("tracker stopping");
            })?;

        info!(?interval, "background tracking started");
        Ok(Self {
            stop,
            thread: Some(thread),
        })
    }

    /// Signals the thread and waits for its current round to finish.
    pub fn stop_tracking(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        let _ = self.stop.try_send(());
        if thread.join().is_err() {
            warn!("tracker thread panicked");
        }
        info!("background tracking stopped");
    }
}

impl Drop for Tracker {
    fn drop(&mut self) {
        self.stop_tracking();
    }
}
