use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashSet},
};

use tracing::{error, info, warn};

use crate::problems::{Problem, Severity};

/// Receives every problem a [`Reporter`](crate::problems::Reporter) creates.
pub trait Accumulator {
    fn report(&mut self, problem: Problem);

    /// The problem that stopped this accumulator, if it stops on problems.
    fn halted(&self) -> Option<&Problem> {
        None
    }
}

/// Keeps every problem it receives, in report order.
#[derive(Debug, Default)]
pub struct Collector {
    problems: Vec<Problem>,
    ignore: HashSet<String>,
    log: bool,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops problems whose kind name is listed, e.g. `["ExpirationDate"]`.
    pub fn ignoring<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(kinds.into_iter().map(Into::into));
        self
    }

    /// Also forwards every kept problem to `tracing`.
    pub fn with_logging(mut self) -> Self {
        self.log = true;
        self
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn into_problems(self) -> Vec<Problem> {
        self.problems
    }

    /// Problems sorted by their presentation order key.
    pub fn sorted(&self) -> Vec<&Problem> {
        let mut sorted: Vec<&Problem> = self.problems.iter().collect();
        sorted.sort_by_cached_key(|problem| problem.order_key());
        sorted
    }

    pub fn of_kind<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Problem> + 'a {
        self.problems
            .iter()
            .filter(move |problem| problem.name() == name)
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn notice_count(&self) -> usize {
        self.count(Severity::Notice)
    }

    pub fn has_issues(&self) -> bool {
        self.error_count() > 0 || self.warning_count() > 0
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn clear(&mut self) {
        self.problems.clear();
    }

    fn count(&self, severity: Severity) -> usize {
        self.problems
            .iter()
            .filter(|problem| problem.severity == severity)
            .count()
    }
}

impl Accumulator for Collector {
    fn report(&mut self, problem: Problem) {
        if self.ignore.contains(problem.name()) {
            return;
        }
        if self.log {
            match problem.severity {
                Severity::Error => error!("{problem}"),
                Severity::Warning => warn!("{problem}"),
                Severity::Notice => info!("{problem}"),
            }
        }
        self.problems.push(problem);
    }
}

/// Turns the first error (and optionally the first warning) into a failure.
///
/// Problems below the threshold are collected. Once a problem at or above it
/// arrives the accumulator latches it, and the loader and the validation
/// passes stop at their next checkpoint.
#[derive(Debug, Default)]
pub struct StrictAccumulator {
    halt_on_warnings: bool,
    halted: Option<Problem>,
    passed: Collector,
}

impl StrictAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn halting_on_warnings() -> Self {
        Self {
            halt_on_warnings: true,
            ..Default::default()
        }
    }

    /// Problems that were below the halting threshold.
    pub fn passed(&self) -> &[Problem] {
        self.passed.problems()
    }

    pub fn into_failure(self) -> Option<Problem> {
        self.halted
    }
}

impl Accumulator for StrictAccumulator {
    fn report(&mut self, problem: Problem) {
        if self.halted.is_some() {
            return;
        }
        let halts = problem.is_error() || (self.halt_on_warnings && problem.is_warning());
        if halts {
            self.halted = Some(problem);
        } else {
            self.passed.report(problem);
        }
    }

    fn halted(&self) -> Option<&Problem> {
        self.halted.as_ref()
    }
}

/// A list of problems of one kind that never grows beyond its bound.
///
/// Kinds with a significance order keep the most significant problems,
/// all other kinds keep the first ones reported.
#[derive(Debug, Clone)]
pub struct BoundedProblemList {
    count: usize,
    problems: Vec<Problem>,
    bound: usize,
}

impl BoundedProblemList {
    pub fn new(bound: usize) -> Self {
        Self {
            count: 0,
            problems: Vec::new(),
            bound,
        }
    }

    pub fn add(&mut self, problem: Problem) {
        self.count += 1;
        let comparable = self
            .problems
            .iter()
            .all(|kept| problem.kind.compare_significance(&kept.kind).is_some())
            && problem.kind.compare_significance(&problem.kind).is_some();
        if comparable {
            // Insert after every problem that is at least as significant.
            let at = self.problems.partition_point(|kept| {
                kept.kind.compare_significance(&problem.kind) != Some(Ordering::Greater)
            });
            self.problems.insert(at, problem);
            if self.count > self.bound {
                self.problems.pop();
            }
        } else if self.count <= self.bound {
            self.problems.push(problem);
        }
    }

    /// Total number of problems added, including dropped ones.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn dropped_count(&self) -> usize {
        self.count - self.problems.len()
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }
}

/// Keeps at most `limit` problems per severity and kind.
#[derive(Debug)]
pub struct BoundedAccumulator {
    limit: usize,
    ignore: HashSet<String>,
    lists: BTreeMap<(Severity, &'static str), BoundedProblemList>,
}

impl BoundedAccumulator {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ignore: HashSet::new(),
            lists: BTreeMap::new(),
        }
    }

    pub fn ignoring<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore.extend(kinds.into_iter().map(Into::into));
        self
    }

    pub fn list(&self, severity: Severity, kind: &str) -> Option<&BoundedProblemList> {
        self.lists
            .iter()
            .find(|((s, k), _)| *s == severity && *k == kind)
            .map(|(_, list)| list)
    }

    /// Every list of the given severity keyed by kind name.
    pub fn lists(
        &self,
        severity: Severity,
    ) -> impl Iterator<Item = (&'static str, &BoundedProblemList)> {
        self.lists
            .iter()
            .filter(move |((s, _), _)| *s == severity)
            .map(|((_, kind), list)| (*kind, list))
    }

    pub fn error_count(&self) -> usize {
        self.lists(Severity::Error).map(|(_, list)| list.count()).sum()
    }

    pub fn warning_count(&self) -> usize {
        self.lists(Severity::Warning)
            .map(|(_, list)| list.count())
            .sum()
    }

    pub fn notice_count(&self) -> usize {
        self.lists(Severity::Notice)
            .map(|(_, list)| list.count())
            .sum()
    }

    pub fn has_issues(&self) -> bool {
        self.error_count() > 0 || self.warning_count() > 0
    }
}

impl Accumulator for BoundedAccumulator {
    fn report(&mut self, problem: Problem) {
        if self.ignore.contains(problem.name()) {
            return;
        }
        let limit = self.limit;
        self.lists
            .entry((problem.severity, problem.name()))
            .or_insert_with(|| BoundedProblemList::new(limit))
            .add(problem);
    }
}
