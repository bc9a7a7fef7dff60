//! Loads GTFS feeds into an in-memory [`Schedule`](schedule::Schedule),
//! validates them and writes them back.
//!
//! ```no_run
//! use feedguard::prelude::*;
//!
//! let mut collector = Collector::new();
//! let mut reporter = Reporter::new(&mut collector);
//! let schedule = load("feed.zip", &mut reporter, LoadOptions::default())?;
//! schedule.validate(&mut reporter, &ValidateOptions::default())?;
//! drop(reporter);
//! for problem in collector.sorted() {
//!     println!("{}: {}", problem.severity, problem.message());
//! }
//! # Ok::<(), feedguard::gtfs::Error>(())
//! ```

pub mod gtfs;
pub mod problems;
pub mod schedule;
pub mod shared;
pub mod validation;

pub mod prelude {
    pub use crate::{
        gtfs::{Error, LoadOptions, Loader, Registry, ValidateOptions, load},
        problems::{
            BoundedAccumulator, Collector, Problem, ProblemKind, Reporter, Severity,
            StrictAccumulator,
        },
        schedule::{Schedule, entities::*},
        shared::{Coordinate, Time},
    };
}
