use std::{io::Cursor, sync::Arc};

use csv::{ByteRecord, ByteRecordsIntoIter, ReaderBuilder};
use tracing::warn;

use crate::{
    gtfs::Columns,
    problems::{Context, ProblemKind, Reporter, Severity},
};

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

/// Characters that split a line for some readers but not for others.
const INVALID_LINE_SEPARATORS: [(&[u8], &str); 5] = [
    (b"\x0c", "ASCII Form Feed 0x0C"),
    (b"\x0d", "ASCII Carriage Return 0x0D, \\r"),
    ("\u{2028}".as_bytes(), "Unicode LINE SEPARATOR U+2028"),
    ("\u{2029}".as_bytes(), "Unicode PARAGRAPH SEPARATOR U+2029"),
    ("\u{0085}".as_bytes(), "Unicode NEXT LINE SEPARATOR U+0085"),
];

/// Fixes up what can be fixed before CSV parsing: UTF-16 files are reported
/// and converted, a UTF-8 byte order mark is dropped.
///
/// Returns `None` when the file contains a NUL byte.
pub fn decode_contents(
    file_name: &str,
    contents: Vec<u8>,
    reporter: &mut Reporter,
) -> Option<Vec<u8>> {
    let mut contents = contents;
    if contents.starts_with(b"\xff\xfe") || contents.starts_with(b"\xfe\xff") {
        reporter.report_in(
            ProblemKind::FileFormat {
                file_name: file_name.to_string(),
                problem: "appears to be encoded in utf-16".to_string(),
            },
            Severity::Error,
            Context::file(file_name),
        );
        contents = decode_utf16(&contents).into_bytes();
    }

    if let Some(index) = contents.iter().position(|byte| *byte == 0) {
        let start = index.saturating_sub(20);
        let end = (index + 21).min(contents.len());
        let text: String = contents[start..end]
            .iter()
            .flat_map(|byte| std::ascii::escape_default(*byte))
            .map(char::from)
            .collect();
        reporter.report_in(
            ProblemKind::FileFormat {
                file_name: file_name.to_string(),
                problem: format!("contains a null in text \"{text}\" at byte {}", index + 1),
            },
            Severity::Error,
            Context::file(file_name),
        );
        return None;
    }

    if contents.starts_with(UTF8_BOM) {
        contents.drain(..UTF8_BOM.len());
    }
    Some(contents)
}

fn decode_utf16(contents: &[u8]) -> String {
    let little_endian = contents.starts_with(b"\xff\xfe");
    let units: Vec<u16> = contents[2..]
        .chunks_exact(2)
        .map(|pair| {
            if little_endian {
                u16::from_le_bytes([pair[0], pair[1]])
            } else {
                u16::from_be_bytes([pair[0], pair[1]])
            }
        })
        .collect();
    String::from_utf16_lossy(&units)
}

fn filled_lines(contents: &[u8]) -> Vec<(u64, usize)> {
    let mut start = 0;
    let mut lines = Vec::new();
    for (index, line) in contents.split_inclusive(|byte| *byte == b'\n').enumerate() {
        if line.iter().any(|byte| *byte != b'\n' && *byte != b'\r') {
            lines.push((start, index + 1));
        }
        start += line.len() as u64;
    }
    lines
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|window| window == needle)
}

/// Reports odd line endings, stray separator characters and files that mix
/// `\r\n` with `\n`.
pub fn check_line_ends(file_name: &str, contents: &[u8], reporter: &mut Reporter) {
    const EXAMPLES: usize = 5;
    let mut crlf: Vec<usize> = Vec::new();
    let mut lf: Vec<usize> = Vec::new();
    let (mut crlf_count, mut lf_count) = (0, 0);

    for (index, line) in contents.split_inclusive(|byte| *byte == b'\n').enumerate() {
        let line_number = index + 1;
        let body_end = line
            .iter()
            .rposition(|byte| *byte != b'\n' && *byte != b'\r')
            .map_or(0, |position| position + 1);
        let (body, line_end) = line.split_at(body_end);
        match line_end {
            b"\r\n" => {
                crlf_count += 1;
                if crlf.len() < EXAMPLES {
                    crlf.push(line_number);
                }
            }
            b"\n" => {
                lf_count += 1;
                if lf.len() < EXAMPLES {
                    lf.push(line_number);
                }
            }
            b"" => {}
            other => {
                let bad_line_end: String = other
                    .iter()
                    .flat_map(|byte| std::ascii::escape_default(*byte))
                    .map(char::from)
                    .collect();
                reporter.report_in(
                    ProblemKind::InvalidLineEnd { bad_line_end },
                    Severity::Warning,
                    Context::line(file_name, line_number),
                );
            }
        }
        for (sequence, name) in INVALID_LINE_SEPARATORS {
            if contains(body, sequence) {
                reporter.report_in(
                    ProblemKind::OtherProblem {
                        description: format!("Line contains {name}"),
                    },
                    Severity::Warning,
                    Context::line(file_name, line_number),
                );
            }
        }
    }

    if crlf_count > 0 && lf_count > 0 {
        let describe = |count: usize, examples: &[usize]| {
            let plural = if count > 1 { "s" } else { "" };
            let mut lines = examples
                .iter()
                .map(usize::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            if count > examples.len() {
                lines.push_str(", ...");
            }
            (plural, lines)
        };
        let (crlf_plural, crlf_lines) = describe(crlf_count, &crlf);
        let (lf_plural, lf_lines) = describe(lf_count, &lf);
        reporter.report_in(
            ProblemKind::OtherProblem {
                description: format!(
                    "Found {crlf_count} CR LF \"\\r\\n\" line end{crlf_plural} \
                     (line{crlf_plural} {crlf_lines}) and {lf_count} LF \"\\n\" line \
                     end{lf_plural} (line{lf_plural} {lf_lines}). A file must use a \
                     consistent line end."
                ),
            },
            Severity::Error,
            Context::file(file_name),
        );
    }
}

/// One data row of a file, values keyed by the cleaned up header.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    line: usize,
    header: Arc<[String]>,
    values: Vec<String>,
    cells: usize,
    unicode_errors: Vec<usize>,
}

impl Row {
    /// Builds a row outside of a file, mostly useful to construct entities
    /// from plain values.
    pub fn new<H, V>(header: &[H], values: &[V]) -> Self
    where
        H: AsRef<str>,
        V: AsRef<str>,
    {
        let header: Arc<[String]> = header.iter().map(|h| h.as_ref().to_string()).collect();
        let values: Vec<String> = values.iter().map(|v| v.as_ref().trim().to_string()).collect();
        Self {
            line: 0,
            cells: values.len(),
            header,
            values,
            unicode_errors: Vec::new(),
        }
    }

    /// 1-based line in the file, 0 for rows built by hand.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Trimmed value of `column`, empty when the file lacks the column or the
    /// row is short.
    pub fn get(&self, column: &str) -> &str {
        self.header
            .iter()
            .position(|name| name == column)
            .and_then(|index| self.values.get(index))
            .map_or("", String::as_str)
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.header.iter().any(|name| name == column)
    }

    /// Values of the columns `columns` does not treat as fields, in file
    /// order.
    pub fn extras(&self, columns: &Columns) -> Vec<(String, String)> {
        self.header
            .iter()
            .zip(self.values.iter())
            .filter(|(name, _)| !name.is_empty() && !columns.is_field(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

/// A CSV file whose header has been read and checked. Iterating yields the
/// data rows once.
pub struct Table {
    file_name: String,
    header: Arc<[String]>,
    raw_header_len: usize,
    /// Index into the raw record of every kept header column.
    kept: Vec<usize>,
    records: ByteRecordsIntoIter<Cursor<Vec<u8>>>,
    /// Byte offset and 1-based number of every line that is not blank.
    lines: Vec<(u64, usize)>,
    line: usize,
}

impl Table {
    /// Reads the header row of `contents` and reports blank, padded,
    /// duplicate, unknown, missing and deprecated columns.
    ///
    /// Returns `None` for a file without any row.
    pub fn open(
        file_name: &str,
        contents: Vec<u8>,
        columns: &Columns,
        reporter: &mut Reporter,
    ) -> Option<Self> {
        let lines = filled_lines(&contents);
        let mut records = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(Cursor::new(contents))
            .into_byte_records();
        let raw_header = match records.next()? {
            Ok(record) => record,
            Err(err) => {
                warn!("Could not read the header of {file_name}: {err}");
                reporter.report_in(
                    ProblemKind::CsvSyntax {
                        description: format!("The header row could not be read: {err}"),
                    },
                    Severity::Error,
                    Context::line(file_name, 1),
                );
                return None;
            }
        };
        let raw_header: Vec<String> = raw_header
            .iter()
            .map(|cell| String::from_utf8_lossy(cell).into_owned())
            .collect();
        let header_context = |header: &[String]| Context {
            file_name: Some(file_name.to_string()),
            row_num: Some(1),
            row: Some(vec![String::new(); header.len()]),
            headers: Some(header.to_vec()),
        };

        let mut header = Vec::with_capacity(raw_header.len());
        let mut kept = Vec::with_capacity(raw_header.len());
        for (index, name) in raw_header.iter().enumerate() {
            let stripped = name.trim();
            if stripped.is_empty() {
                reporter.report_in(
                    ProblemKind::CsvSyntax {
                        description: "The header row should not contain any blank values. \
                                      The corresponding column will be skipped for the \
                                      entire file."
                            .to_string(),
                    },
                    Severity::Error,
                    header_context(&raw_header),
                );
                continue;
            }
            if stripped != name {
                reporter.report_in(
                    ProblemKind::CsvSyntax {
                        description: "The header row should not contain any space characters."
                            .to_string(),
                    },
                    Severity::Warning,
                    header_context(&raw_header),
                );
            }
            header.push(stripped.to_string());
            kept.push(index);
        }

        let mut seen: Vec<&str> = Vec::new();
        for name in &header {
            if seen.contains(&name.as_str()) {
                continue;
            }
            seen.push(name);
            let count = header.iter().filter(|other| *other == name).count();
            if count > 1 {
                reporter.report_in(
                    ProblemKind::DuplicateColumn {
                        file_name: file_name.to_string(),
                        header: name.clone(),
                        count,
                    },
                    Severity::Error,
                    Context::file(file_name),
                );
            }
        }

        let unknown: Vec<&str> = seen
            .iter()
            .copied()
            .filter(|name| !columns.is_known(name))
            .collect();
        if unknown.len() == seen.len() {
            reporter.report_in(
                ProblemKind::CsvSyntax {
                    description: "The header row did not contain any known column names. \
                                  The file is most likely missing the header row or not in \
                                  the expected CSV format."
                        .to_string(),
                },
                Severity::Error,
                header_context(&raw_header),
            );
        } else {
            for name in unknown {
                reporter.report_in(
                    ProblemKind::UnrecognizedColumn {
                        file_name: file_name.to_string(),
                        column_name: name.to_string(),
                    },
                    Severity::Warning,
                    header_context(&header),
                );
            }
        }

        for required in columns.required {
            if !header.iter().any(|name| name == required) {
                reporter.report_in(
                    ProblemKind::MissingColumn {
                        file_name: file_name.to_string(),
                        column_name: required.to_string(),
                    },
                    Severity::Error,
                    header_context(&header),
                );
            }
        }

        for (deprecated, replacement) in columns.deprecated {
            if header.iter().any(|name| name == deprecated) {
                reporter.report_in(
                    ProblemKind::DeprecatedColumn {
                        file_name: file_name.to_string(),
                        column_name: deprecated.to_string(),
                        new_name: replacement.map(str::to_string),
                    },
                    Severity::Warning,
                    header_context(&header),
                );
            }
        }

        Some(Self {
            file_name: file_name.to_string(),
            header: header.into(),
            raw_header_len: raw_header.len(),
            kept,
            records,
            lines,
            line: 1,
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// The header without blank columns, names trimmed.
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Reports cell count mismatches and cells that are not valid UTF-8.
    /// Expects the reporter to point at `row` already.
    pub fn check_row(&self, row: &Row, reporter: &mut Reporter) {
        let problem = if row.cells > self.raw_header_len {
            Some("too many")
        } else if row.cells < self.raw_header_len {
            Some("missing")
        } else {
            None
        };
        if let Some(problem) = problem {
            reporter.report_in(
                ProblemKind::OtherProblem {
                    description: format!(
                        "Found {problem} cells (commas) in line {} of file \"{}\".  Every row \
                         in the file should have the same number of cells as the header \
                         (first line) does.",
                        row.line, self.file_name
                    ),
                },
                Severity::Warning,
                Context::line(&self.file_name, row.line),
            );
        }
        for index in &row.unicode_errors {
            if let (Some(column), Some(value)) = (row.header.get(*index), row.values.get(*index)) {
                reporter.invalid_value_because(column, value, "Unicode error");
            }
        }
    }

    fn build_row(&self, record: &ByteRecord, line: usize) -> Row {
        let mut values = Vec::with_capacity(self.kept.len());
        let mut unicode_errors = Vec::new();
        for index in &self.kept {
            let Some(cell) = record.get(*index) else {
                break;
            };
            let value = match std::str::from_utf8(cell) {
                Ok(value) => value.trim().to_string(),
                Err(_) => {
                    unicode_errors.push(values.len());
                    String::from_utf8_lossy(cell).trim().to_string()
                }
            };
            values.push(value);
        }
        Row {
            line,
            header: self.header.clone(),
            values,
            cells: record.len(),
            unicode_errors,
        }
    }
}

impl Iterator for Table {
    type Item = Row;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(err) => {
                    self.line += 1;
                    warn!("Skipping unreadable record in {}: {err}", self.file_name);
                    continue;
                }
            };
            // A record position points at the end of the previous record,
            // before any blank lines the csv reader skipped.
            let line = record
                .position()
                .and_then(|position| {
                    let index = self
                        .lines
                        .partition_point(|(start, _)| *start < position.byte());
                    self.lines.get(index).map(|(_, line)| *line)
                })
                .unwrap_or(self.line + 1);
            self.line = line;
            if record.is_empty() || (record.len() == 1 && record[0].is_empty()) {
                continue;
            }
            return Some(self.build_row(&record, line));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problems::Collector;

    const STOP_COLUMNS: Columns = Columns {
        required: &["stop_id", "stop_name"],
        optional: &["stop_desc"],
        deprecated: &[("stop_street", None)],
    };

    #[test]
    fn header_problems() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        let contents =
            b"stop_id, stop_desc ,,stop_street,stop_id,colour\nS1,desc,x,street,S1,red\n";
        let table = Table::open("stops.txt", contents.to_vec(), &STOP_COLUMNS, &mut reporter)
            .expect("table");
        assert_eq!(
            table.header(),
            ["stop_id", "stop_desc", "stop_street", "stop_id", "colour"]
        );
        let names: Vec<&str> = collector.problems().iter().map(|p| p.name()).collect();
        assert_eq!(
            names,
            [
                "CsvSyntax",
                "CsvSyntax",
                "DuplicateColumn",
                "UnrecognizedColumn",
                "MissingColumn",
                "DeprecatedColumn"
            ]
        );
    }

    #[test]
    fn rows_are_trimmed_and_keep_extras() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        let contents = b"stop_id,stop_name,colour\n S1 ,Main St,red\n\nS2,Side St\n";
        let table = Table::open("stops.txt", contents.to_vec(), &STOP_COLUMNS, &mut reporter)
            .expect("table");
        let rows: Vec<Row> = table.collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("stop_id"), "S1");
        assert_eq!(rows[0].line(), 2);
        assert_eq!(rows[0].extras(&STOP_COLUMNS), vec![("colour".into(), "red".into())]);
        assert_eq!(rows[1].line(), 4);
        assert_eq!(rows[1].get("colour"), "");
    }

    #[test]
    fn rows_after_blank_lines_keep_their_line() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        let contents = b"stop_id,stop_name\r\nS1,One\r\n\r\n\r\nS2,Two\r\n\nS3,Three";
        let table = Table::open("stops.txt", contents.to_vec(), &STOP_COLUMNS, &mut reporter)
            .expect("table");
        let lines: Vec<usize> = table.map(|row| row.line()).collect();
        assert_eq!(lines, [2, 5, 7]);
    }

    #[test]
    fn null_bytes_stop_the_file() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        let contents = b"stop_id\nS\x001\n".to_vec();
        assert!(decode_contents("stops.txt", contents, &mut reporter).is_none());
        assert!(collector.problems()[0].message().contains("at byte 10"));
    }

    #[test]
    fn utf16_is_converted() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        let mut contents = vec![0xff, 0xfe];
        for unit in "stop_id\n".encode_utf16() {
            contents.extend_from_slice(&unit.to_le_bytes());
        }
        let decoded = decode_contents("stops.txt", contents, &mut reporter).expect("decoded");
        assert_eq!(decoded, b"stop_id\n");
        assert_eq!(collector.problems()[0].name(), "FileFormat");
    }

    #[test]
    fn mixed_line_ends() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        check_line_ends("stops.txt", b"a\r\nb\nc\r\r\nd\x0ce", &mut reporter);
        let names: Vec<&str> = collector.problems().iter().map(|p| p.name()).collect();
        assert_eq!(names, ["InvalidLineEnd", "OtherProblem", "OtherProblem"]);
        assert!(collector.problems()[2].message().contains("Found 1 CR LF"));
    }
}
