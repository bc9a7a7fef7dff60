//! Cross-entity checks run over a fully loaded [`Schedule`].
//!
//! Each pass reports through the [`Reporter`] and never fails on its own;
//! the only early exit is a strict accumulator halting between passes.

use std::time::Instant;

use tracing::{debug, info};

use crate::{
    gtfs::ValidateOptions,
    problems::{Halted, Reporter},
    schedule::Schedule,
};

mod blocks;
mod feed;
mod service;
mod stops;
mod trips;

pub use stops::{ClosePair, MIN_STOP_DISTANCE, close_stop_pairs};

type Pass = fn(&Schedule, &mut Reporter, &ValidateOptions);

const PASSES: [(&str, Pass); 10] = [
    ("agency timezones", feed::agency_timezones),
    ("feed language", feed::feed_language),
    ("service range", service::service_range),
    ("stops", stops::stops),
    ("nearby stops", stops::nearby_stops),
    ("route names", feed::route_names),
    ("trips", trips::trips),
    ("route agencies", feed::route_agency_ids),
    ("trip stop times", trips::trip_stop_times),
    ("unused shapes", feed::unused_shapes),
];

/// Runs every pass in order, polling the reporter after each one.
pub fn validate(
    schedule: &Schedule,
    reporter: &mut Reporter,
    options: &ValidateOptions,
) -> Result<(), Halted> {
    info!("Validating schedule...");
    let started = Instant::now();
    reporter.clear_context();
    for (name, pass) in PASSES {
        debug!("Checking {name}...");
        let now = Instant::now();
        pass(schedule, reporter, options);
        debug!("Checking {name} took {:?}", now.elapsed());
        reporter.checkpoint()?;
    }
    info!("Validating schedule took {:?}", started.elapsed());
    Ok(())
}
