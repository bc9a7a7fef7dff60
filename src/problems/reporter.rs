use thiserror::Error;

use crate::problems::{Accumulator, Context, Problem, ProblemKind, Severity};

/// Raised at a checkpoint once a [`StrictAccumulator`](crate::problems::StrictAccumulator)
/// has latched a problem.
#[derive(Error, Debug, Clone)]
#[error("halted on {}: {}", .0.severity, .0)]
pub struct Halted(pub Box<Problem>);

/// Creates problems, attaches the current file context and hands them to an
/// [`Accumulator`].
///
/// The loader sets the file context before handing a row to an entity so
/// every problem raised while processing the row points back at it.
pub struct Reporter<'a> {
    accumulator: &'a mut dyn Accumulator,
    context: Option<Context>,
}

impl<'a> Reporter<'a> {
    pub fn new(accumulator: &'a mut dyn Accumulator) -> Self {
        Self {
            accumulator,
            context: None,
        }
    }

    pub fn set_file_context(
        &mut self,
        file_name: &str,
        row_num: usize,
        row: &[String],
        headers: &[String],
    ) {
        self.context = Some(Context {
            file_name: Some(file_name.to_string()),
            row_num: Some(row_num),
            row: Some(row.to_vec()),
            headers: Some(headers.to_vec()),
        });
    }

    pub fn clear_context(&mut self) {
        self.context = None;
    }

    pub fn file_context(&self) -> Option<&Context> {
        self.context.as_ref()
    }

    /// Reports `kind` with its default severity in the current context.
    pub fn report(&mut self, kind: ProblemKind) {
        let severity = kind.default_severity();
        self.report_as(kind, severity);
    }

    pub fn report_as(&mut self, kind: ProblemKind, severity: Severity) {
        let context = self.context.clone().unwrap_or_default();
        self.accumulator.report(Problem {
            kind,
            severity,
            context,
        });
    }

    /// Reports with an explicit context, ignoring the current file context.
    pub fn report_in(&mut self, kind: ProblemKind, severity: Severity, context: Context) {
        self.accumulator.report(Problem {
            kind,
            severity,
            context,
        });
    }

    pub fn missing_value(&mut self, column_name: &str) {
        self.report(ProblemKind::MissingValue {
            column_name: column_name.to_string(),
            reason: None,
        });
    }

    pub fn missing_value_because(&mut self, column_name: &str, reason: impl Into<String>) {
        self.report(ProblemKind::MissingValue {
            column_name: column_name.to_string(),
            reason: Some(reason.into()),
        });
    }

    pub fn invalid_value(&mut self, column_name: &str, value: impl ToString) {
        self.invalid_value_as(column_name, value, None, Severity::Error);
    }

    pub fn invalid_value_because(
        &mut self,
        column_name: &str,
        value: impl ToString,
        reason: impl Into<String>,
    ) {
        self.invalid_value_as(column_name, value, Some(reason.into()), Severity::Error);
    }

    pub fn invalid_value_as(
        &mut self,
        column_name: &str,
        value: impl ToString,
        reason: Option<String>,
        severity: Severity,
    ) {
        self.report_as(
            ProblemKind::InvalidValue {
                column_name: column_name.to_string(),
                value: value.to_string(),
                reason,
            },
            severity,
        );
    }

    pub fn duplicate_id(&mut self, column_name: &str, value: &str) {
        self.duplicate_id_as(column_name, value, Severity::Error);
    }

    pub fn duplicate_id_as(&mut self, column_name: &str, value: &str, severity: Severity) {
        self.report_as(
            ProblemKind::DuplicateId {
                column_name: column_name.to_string(),
                value: value.to_string(),
            },
            severity,
        );
    }

    /// Reports a composite key, rendered as `(a, b)`.
    pub fn duplicate_ids(&mut self, column_names: &[&str], values: &[&str], severity: Severity) {
        let column_name = format!("({})", column_names.join(", "));
        let value = format!("({})", values.join(", "));
        self.duplicate_id_as(&column_name, &value, severity);
    }

    pub fn other(&mut self, description: impl Into<String>, severity: Severity) {
        self.report_as(
            ProblemKind::OtherProblem {
                description: description.into(),
            },
            severity,
        );
    }

    pub fn is_halted(&self) -> bool {
        self.accumulator.halted().is_some()
    }

    /// Fails once the accumulator has stopped accepting problems.
    pub fn checkpoint(&self) -> Result<(), Halted> {
        match self.accumulator.halted() {
            Some(problem) => Err(Halted(Box::new(problem.clone()))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problems::{Collector, StrictAccumulator};

    #[test]
    fn attaches_file_context() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        reporter.set_file_context(
            "stops.txt",
            3,
            &["S1".to_string(), "".to_string()],
            &["stop_id".to_string(), "stop_name".to_string()],
        );
        reporter.missing_value("stop_name");
        reporter.clear_context();
        reporter.other("loose", Severity::Warning);

        let problems = collector.problems();
        assert_eq!(problems[0].format_context(), "stops.txt:3 column stop_name");
        assert_eq!(
            problems[0].format_row().unwrap(),
            "stop_id=S1, *stop_name=*"
        );
        assert!(problems[1].context.is_empty());
        assert!(problems[1].is_warning());
    }

    #[test]
    fn checkpoint_fails_after_strict_error() {
        let mut strict = StrictAccumulator::new();
        let mut reporter = Reporter::new(&mut strict);
        reporter.other("just a note", Severity::Notice);
        assert!(reporter.checkpoint().is_ok());
        reporter.invalid_value("route_type", "9");
        let halted = reporter.checkpoint().unwrap_err();
        assert_eq!(halted.0.name(), "InvalidValue");
    }

    #[test]
    fn reason_follows_message() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        reporter.invalid_value_because("stop_id", "S9", "This value wasn't defined in stops.txt");
        assert_eq!(
            collector.problems()[0].message(),
            "Invalid value S9 in field stop_id\nThis value wasn't defined in stops.txt"
        );
    }
}
