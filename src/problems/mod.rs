//! Problem taxonomy, the context aware [`Reporter`] and the accumulators
//! that decide what happens to each reported [`Problem`].

mod accumulator;
mod kind;
mod reporter;

pub use accumulator::*;
pub use kind::*;
pub use reporter::*;

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Error,
    Warning,
    Notice,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Notice => "notice",
        })
    }
}

/// Where in the feed a problem was found.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Context {
    pub file_name: Option<String>,
    /// 1-based line number, the header being line 1.
    pub row_num: Option<usize>,
    pub row: Option<Vec<String>>,
    pub headers: Option<Vec<String>>,
}

impl Context {
    pub fn file(file_name: impl Into<String>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            ..Default::default()
        }
    }

    pub fn line(file_name: impl Into<String>, row_num: usize) -> Self {
        Self {
            file_name: Some(file_name.into()),
            row_num: Some(row_num),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.file_name.is_none() && self.row_num.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Problem {
    pub kind: ProblemKind,
    pub severity: Severity,
    pub context: Context,
}

/// Sort key giving problems a stable presentation order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct OrderKey {
    severity: Severity,
    kind: &'static str,
    file_name: Option<String>,
    row_num: Option<usize>,
    extra: Vec<String>,
    message: String,
}

impl Problem {
    pub fn new(kind: ProblemKind) -> Self {
        let severity = kind.default_severity();
        Self {
            kind,
            severity,
            context: Context::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    pub fn is_notice(&self) -> bool {
        self.severity == Severity::Notice
    }

    pub fn message(&self) -> String {
        self.kind.to_string()
    }

    /// Renders `file:row column name`, or an empty string without context.
    pub fn format_context(&self) -> String {
        let mut text = String::new();
        if let Some(file_name) = &self.context.file_name {
            text.push_str(file_name);
        }
        if let Some(row_num) = self.context.row_num {
            text.push_str(&format!(":{row_num}"));
        }
        if let Some(column) = self.kind.column_name()
            && !text.is_empty()
        {
            text.push_str(&format!(" column {column}"));
        }
        text
    }

    /// Renders the offending row as `header=value` pairs, marking the column
    /// the problem is about with asterisks.
    pub fn format_row(&self) -> Option<String> {
        let headers = self.context.headers.as_ref()?;
        let row = self.context.row.as_ref()?;
        let column = self.kind.column_name();
        let cells: Vec<String> = headers
            .iter()
            .zip(row.iter())
            .map(|(header, value)| {
                if Some(header.as_str()) == column {
                    format!("*{header}={value}*")
                } else {
                    format!("{header}={value}")
                }
            })
            .collect();
        Some(cells.join(", "))
    }

    pub fn order_key(&self) -> OrderKey {
        OrderKey {
            severity: self.severity,
            kind: self.kind.name(),
            file_name: self.context.file_name.clone(),
            row_num: self.context.row_num,
            extra: self.kind.extra_order_tokens(),
            message: self.message(),
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let context = self.format_context();
        if context.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{context}: {}", self.kind)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn problems_serialize_with_dates() {
        let mut problem = Problem::new(ProblemKind::TooManyDaysWithoutService {
            first_day: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            last_day: NaiveDate::from_ymd_opt(2024, 1, 21).unwrap(),
            consecutive_days: 12,
        });
        problem.context = Context::file("calendar.txt");

        let json = serde_json::to_value(&problem).unwrap();
        let gap = &json["kind"]["TooManyDaysWithoutService"];
        assert_eq!(gap["first_day"], "2024-01-10");
        assert_eq!(gap["consecutive_days"], 12);
        assert_eq!(json["severity"], serde_json::to_value(problem.severity).unwrap());
        assert_eq!(json["context"]["file_name"], "calendar.txt");
        assert!(json["context"]["row_num"].is_null());
    }
}
