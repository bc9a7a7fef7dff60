use std::{path::PathBuf, process::ExitCode, time::Instant};

use chrono::Days;
use clap::Parser;
use feedguard::{
    gtfs::{self, LoadOptions},
    problems::{BoundedAccumulator, Context, ProblemKind, Reporter, Severity},
    schedule::Schedule,
};
use serde::Serialize;
use tracing::{error, info};

/// Days of service the calendar summary looks at.
const SUMMARY_DAYS: u64 = 365;

/// Validates a GTFS feed and prints the problems found.
#[derive(Parser)]
#[command(name = "feedguard", version)]
struct Args {
    /// Feed zip archive or directory
    feed: PathBuf,

    /// Report service gaps of at least this many days
    #[arg(long, value_name = "DAYS")]
    gap_days: Option<u32>,

    /// Problems listed per severity and kind
    #[arg(long, default_value_t = 5)]
    limit: usize,

    /// Report trips running the same stops at the same times
    #[arg(long)]
    duplicate_trips: bool,

    /// Print the problems as JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct JsonProblem<'a> {
    name: &'static str,
    severity: Severity,
    message: String,
    kind: &'a ProblemKind,
    context: &'a Context,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    feed: String,
    loaded: bool,
    errors: usize,
    warnings: usize,
    notices: usize,
    problems: Vec<JsonProblem<'a>>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt().init();

    let args = Args::parse();

    let options = LoadOptions {
        extra_validation: true,
        check_duplicate_trips: args.duplicate_trips,
        service_gap_interval: args.gap_days,
        ..Default::default()
    };
    let mut accumulator = BoundedAccumulator::new(args.limit);
    let mut reporter = Reporter::new(&mut accumulator);

    info!("Validating {}...", args.feed.display());
    let now = Instant::now();
    let schedule = match gtfs::load(&args.feed, &mut reporter, options) {
        Ok(schedule) => Some(schedule),
        Err(err) => {
            error!("{err}");
            None
        }
    };
    drop(reporter);
    info!("Validating took {:?}", now.elapsed());

    if args.json {
        if let Err(err) = print_json(&args, schedule.is_some(), &accumulator) {
            error!("Could not write the report: {err}");
            return ExitCode::FAILURE;
        }
    } else {
        print_problems(&accumulator);
        if let Some(schedule) = &schedule {
            print_calendar_summary(schedule);
        }
    }

    if schedule.is_none() || accumulator.has_issues() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn print_problems(accumulator: &BoundedAccumulator) {
    let counts = [
        (Severity::Error, accumulator.error_count()),
        (Severity::Warning, accumulator.warning_count()),
        (Severity::Notice, accumulator.notice_count()),
    ];
    for (severity, count) in counts {
        if count == 0 {
            continue;
        }
        println!("{count} {severity}{}", if count == 1 { "" } else { "s" });
        for (kind, list) in accumulator.lists(severity) {
            for problem in list.problems() {
                let context = problem.format_context();
                if context.is_empty() {
                    println!("  {kind}: {}", problem.message());
                } else {
                    println!("  {kind} ({context}): {}", problem.message());
                }
                if let Some(row) = problem.format_row() {
                    println!("    {row}");
                }
            }
            if list.dropped_count() > 0 {
                println!("  ... and {} more {kind}", list.dropped_count());
            }
        }
    }
    if counts.iter().all(|(_, count)| *count == 0) {
        println!("No problems found");
    }
}

fn print_json(
    args: &Args,
    loaded: bool,
    accumulator: &BoundedAccumulator,
) -> serde_json::Result<()> {
    let mut problems = Vec::new();
    for severity in [Severity::Error, Severity::Warning, Severity::Notice] {
        for (_, list) in accumulator.lists(severity) {
            problems.extend(list.problems().iter().map(|problem| JsonProblem {
                name: problem.name(),
                severity: problem.severity,
                message: problem.message(),
                kind: &problem.kind,
                context: &problem.context,
            }));
        }
    }
    let report = JsonReport {
        feed: args.feed.display().to_string(),
        loaded,
        errors: accumulator.error_count(),
        warnings: accumulator.warning_count(),
        notices: accumulator.notice_count(),
        problems,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn print_calendar_summary(schedule: &Schedule) {
    let Some(range) = schedule.date_range() else {
        println!("Calendar: no service dates");
        return;
    };
    let horizon = range
        .start
        .checked_add_days(Days::new(SUMMARY_DAYS))
        .unwrap_or(range.end);
    let end = range.end.succ_opt().unwrap_or(range.end).min(horizon);
    let days = schedule.date_trips_departures(range.start, end);
    let trips: Vec<usize> = days.iter().map(|day| day.trips).collect();
    let average = trips.iter().sum::<usize>() as f64 / trips.len().max(1) as f64;
    println!(
        "Calendar: {} to {} ({} / {}), {:.1} trips per day on average, {} at most, {} at least",
        range.start,
        range.end,
        range.start_origin,
        range.end_origin,
        average,
        trips.iter().max().unwrap_or(&0),
        trips.iter().min().unwrap_or(&0),
    );
}
