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

//! Deadlock detection tests using parking_lot's built-in deadlock detector.
//!
//! Dev builds enable parking_lot's `deadlock_detection` feature, so every
//! lock the service takes (user histories, the proximity policy, pool
//! state) is visible to the detector while tracking, scoring and reads
//! run side by side.

use chrono::Utc;
use parking_lot::deadlock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use tour_guide_rs::{Coordinate, Position, TourGuideConfig, TourGuideService, User};

// === Deadlock Detection Infrastructure ===

/// Starts a background thread that checks for deadlocks.
/// Returns a handle to stop the detector.
fn start_deadlock_detector() -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();

    thread::spawn(move || {
        while running_clone.load(Ordering::SeqCst) {
            thread::sleep(Duration::from_millis(100));
            let deadlocks = deadlock::check_deadlock();
            if !deadlocks.is_empty() {
                eprintln!("\n=== DEADLOCK DETECTED ===");
                for (i, threads) in deadlocks.iter().enumerate() {
                    eprintln!("\nDeadlock #{}", i + 1);
                    for t in threads {
                        eprintln!("Thread ID: {:?}", t.thread_id());
                        eprintln!("Backtrace:\n{:#?}", t.backtrace());
                    }
                }
                panic!("Deadlock detected! See output above for details.");
            }
        }
    });

    running
}

/// Stops the deadlock detector.
fn stop_deadlock_detector(running: Arc<AtomicBool>) {
    running.store(false, Ordering::SeqCst);
    thread::sleep(Duration::from_millis(150));
}

fn service_with_users(count: usize) -> Arc<TourGuideService> {
    let config = TourGuideConfig {
        internal_users: count,
        ..TourGuideConfig::compact()
    };
    Arc::new(TourGuideService::simulated(config).unwrap())
}

// === Tests ===

/// Many threads tracking, scoring and reading the same user.
#[test]
fn no_deadlock_single_user_contention() {
    let detector = start_deadlock_detector();
    let service = service_with_users(0);
    let user = Arc::new(User::new("jon", "000", "jon@tourGuide.com"));
    service.add_user(Arc::clone(&user));
    service.set_proximity_radius(f64::MAX);

    const NUM_THREADS: usize = 10;
    const OPS_PER_THREAD: usize = 12;

    let mut handles = Vec::with_capacity(NUM_THREADS);
    for _ in 0..NUM_THREADS {
        let service = service.clone();
        let user = user.clone();

        handles.push(thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                match i % 3 {
                    0 => {
                        service.track(&user).unwrap().join().unwrap();
                    }
                    1 => {
                        service.calculate_rewards(&user).unwrap();
                    }
                    _ => {
                        let _ = service.get_rewards(&user);
                        let _ = user.positions();
                        let _ = user.reward_points();
                    }
                }
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }
    assert!(service.await_completion(Duration::from_secs(60)).is_drained());

    stop_deadlock_detector(detector);

    // Every tracked position is scored against every attraction at least
    // once by the pass its own tracking request queued.
    assert_eq!(user.position_count(), NUM_THREADS * OPS_PER_THREAD / 3);
    assert!(user.reward_count() >= user.position_count());
}

/// Radius changes race with scoring passes that read the policy.
#[test]
fn no_deadlock_radius_changes_during_scoring() {
    let detector = start_deadlock_detector();
    let service = service_with_users(50);

    let writer = {
        let service = service.clone();
        thread::spawn(move || {
            for i in 0..200 {
                if i % 2 == 0 {
                    service.set_proximity_radius(f64::MAX);
                } else {
                    service.set_default_proximity_radius();
                }
            }
        })
    };

    let scorer = {
        let service = service.clone();
        thread::spawn(move || {
            for user in service.all_users() {
                service.calculate_rewards(&user).unwrap();
            }
        })
    };

    writer.join().expect("Thread panicked");
    scorer.join().expect("Thread panicked");
    assert!(service.await_completion(Duration::from_secs(60)).is_drained());

    stop_deadlock_detector(detector);
}

/// Background tracking, foreground reads and shutdown overlap.
#[test]
fn no_deadlock_background_tracking_with_readers() {
    let detector = start_deadlock_detector();
    let service = Arc::new(
        TourGuideService::simulated(TourGuideConfig {
            internal_users: 20,
            tracking_interval_secs: 0,
            ..TourGuideConfig::compact()
        })
        .unwrap(),
    );

    service.start_tracking().unwrap();

    let mut readers = Vec::new();
    for _ in 0..4 {
        let service = service.clone();
        readers.push(thread::spawn(move || {
            for _ in 0..50 {
                let locations = service.get_all_current_locations();
                assert_eq!(locations.len(), 20);
                for user in service.all_users() {
                    let _ = service.get_user_location(&user);
                }
            }
        }));
    }

    for reader in readers {
        reader.join().expect("Thread panicked");
    }
    service.stop_tracking();
    let (tracking, _) = service.shutdown();
    assert!(tracking.is_drained());

    stop_deadlock_detector(detector);
}

/// Users appended to from many threads while the directory grows.
#[test]
fn no_deadlock_directory_growth_during_appends() {
    let detector = start_deadlock_detector();
    let service = service_with_users(0);

    const NUM_THREADS: usize = 10;
    const USERS_PER_THREAD: usize = 20;

    let mut handles = Vec::with_capacity(NUM_THREADS);
    for t in 0..NUM_THREADS {
        let service = service.clone();
        handles.push(thread::spawn(move || {
            for i in 0..USERS_PER_THREAD {
                let user = Arc::new(User::new(format!("user{t}-{i}"), "000", "x@tourGuide.com"));
                service.add_user(Arc::clone(&user));
                user.add_position(Position::unset(user.id()));
                user.add_position(Position::new(
                    user.id(),
                    Coordinate::new(33.817595, -117.922008),
                    Utc::now(),
                ));
                let _ = service.all_users();
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    stop_deadlock_detector(detector);
    assert_eq!(service.all_users().len(), NUM_THREADS * USERS_PER_THREAD);
}
