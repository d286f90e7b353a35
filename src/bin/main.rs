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

use clap::Parser;
use csv::Writer;
use std::io::Write;
use std::process;
use std::thread;
use std::time::{Duration, Instant};
use tour_guide_rs::{Completion, TourGuideConfig, TourGuideError, TourGuideService, logging};
use tracing::info;

/// Tour Guide - simulate tracking and reward scoring
///
/// Creates internal users, tracks them against the simulated GPS, scores
/// their positions and writes one CSV row per user to stdout.
#[derive(Parser, Debug)]
#[command(name = "tour-guide-rs")]
#[command(about = "Tracks simulated users and scores their visits", long_about = None)]
struct Args {
    /// Number of internal users to generate
    #[arg(short, long, default_value_t = 100)]
    users: usize,

    /// Tracking rounds to run over every user
    #[arg(short, long, default_value_t = 1)]
    rounds: usize,

    /// Run background tracking for this many seconds after the rounds
    #[arg(long, value_name = "SECS")]
    watch: Option<u64>,

    /// Seconds between background tracking rounds
    #[arg(long, value_name = "SECS")]
    interval: Option<u64>,

    /// Reward eligibility radius in miles
    #[arg(long, value_name = "MILES")]
    proximity: Option<f64>,

    /// Threads fetching positions
    #[arg(long)]
    tracking_workers: Option<usize>,

    /// Threads running scoring passes
    #[arg(long)]
    scoring_workers: Option<usize>,

    /// Seconds to wait for scoring before giving up
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

impl Args {
    fn into_config(self) -> TourGuideConfig {
        let defaults = TourGuideConfig::default();
        TourGuideConfig {
            internal_users: self.users,
            tracking_interval_secs: self.interval.unwrap_or(1),
            eligibility_radius: self.proximity.unwrap_or(defaults.eligibility_radius),
            tracking_workers: self.tracking_workers.unwrap_or(defaults.tracking_workers),
            scoring_workers: self.scoring_workers.unwrap_or(defaults.scoring_workers),
            await_timeout_secs: self.timeout.unwrap_or(defaults.await_timeout_secs),
            ..defaults
        }
    }
}

fn main() {
    logging::init();

    let args = Args::parse();
    let rounds = args.rounds;
    let watch = args.watch.map(Duration::from_secs);

    let service = match run(args.into_config(), rounds, watch) {
        Ok(service) => service,
        Err(e) => {
            eprintln!("Error running simulation: {}", e);
            process::exit(1);
        }
    };

    if let Err(e) = write_users(&service, std::io::stdout()) {
        eprintln!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Tracks every user `rounds` times, optionally keeps background tracking
/// running for `watch`, then waits for scoring to settle.
fn run(
    config: TourGuideConfig,
    rounds: usize,
    watch: Option<Duration>,
) -> Result<TourGuideService, TourGuideError> {
    let started = Instant::now();
    let service = TourGuideService::simulated(config)?;

    for round in 0..rounds {
        let tracked = service.track_all_users();
        info!(round, tracked, "tracking round complete");
    }

    if let Some(watch) = watch {
        service.start_tracking()?;
        thread::sleep(watch);
        service.stop_tracking();
    }

    let timeout = service.config().await_timeout();
    match service.await_completion(timeout) {
        Completion::Drained => {}
        Completion::TimedOut { discarded } => {
            eprintln!("Scoring timed out, {} passes discarded", discarded);
        }
    }

    info!(elapsed = ?started.elapsed(), users = service.all_users().len(), "simulation done");
    Ok(service)
}

/// Write one row per user to a CSV writer.
///
/// # CSV Format
///
/// Columns: `user, id, positions, rewards, points`
///
/// # Example
///
/// ```csv
/// user,id,positions,rewards,points
/// internalUser0,8f1c...,4,1,512
/// ```
fn write_users<W: Write>(service: &TourGuideService, writer: W) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);

    let mut users = service.all_users();
    users.sort_by(|a, b| a.user_name().cmp(b.user_name()));
    for user in &users {
        wtr.serialize(user.as_ref())?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tour_guide_rs::User;

    fn quiet_config(users: usize) -> TourGuideConfig {
        TourGuideConfig {
            internal_users: users,
            ..TourGuideConfig::compact()
        }
    }

    #[test]
    fn run_tracks_every_user_each_round() {
        let service = run(quiet_config(10), 2, None).unwrap();

        assert_eq!(service.all_users().len(), 10);
        // Three generated positions plus one per round.
        assert!(service.all_users().iter().all(|u| u.position_count() == 5));
    }

    #[test]
    fn write_users_emits_header_and_rows() {
        let service = TourGuideService::simulated(quiet_config(0)).unwrap();
        service.add_user(Arc::new(User::new("jon", "000", "jon@tourGuide.com")));
        service.add_user(Arc::new(User::new("ann", "000", "ann@tourGuide.com")));

        let mut output = Vec::new();
        write_users(&service, &mut output).unwrap();

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines[0], "user,id,positions,rewards,points");
        assert!(lines[1].starts_with("ann,"));
        assert!(lines[2].starts_with("jon,"));
        assert!(lines[2].ends_with(",0,0,0"));
    }

    #[test]
    fn args_map_onto_config() {
        let args = Args::parse_from(["tour-guide-rs", "--users", "7", "--proximity", "25"]);
        let config = args.into_config();
        assert_eq!(config.internal_users, 7);
        assert_eq!(config.eligibility_radius, 25.0);
        assert_eq!(config.scoring_workers, TourGuideConfig::default().scoring_workers);
    }
}
