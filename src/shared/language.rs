use std::sync::LazyLock;

use regex::Regex;

use crate::{
    problems::{Reporter, Severity},
    shared::values::{is_empty, is_iso_639_1},
};

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-z]{2,3}|[a-z]{5,8})(?:-[a-z0-9]{1,8})*$").expect("static language pattern")
});

/// Outcome of parsing a BCP-47 language tag.
#[derive(Debug, Clone, PartialEq)]
pub struct LanguageTag {
    pub wellformed: bool,
    pub valid: bool,
    pub description: String,
}

/// Parses language tags for `agency_lang` and `feed_lang`.
///
/// A full BCP-47 grammar can be plugged in through
/// [`Schedule::with_language_parser`](crate::schedule::Schedule::with_language_parser).
pub trait LanguageParser: Send + Sync {
    fn parse_language(&self, tag: &str) -> LanguageTag;
}

/// Checks the tag shape and that the primary language subtag is a known
/// ISO 639-1 code (or one of the special `mul`, `und`, `mis`, `zxx` codes).
#[derive(Debug, Default, Clone, Copy)]
pub struct PrimarySubtagParser;

impl LanguageParser for PrimarySubtagParser {
    fn parse_language(&self, tag: &str) -> LanguageTag {
        let tag = tag.to_lowercase();
        if !TAG.is_match(&tag) {
            return LanguageTag {
                wellformed: false,
                valid: false,
                description: String::new(),
            };
        }
        let mut subtags = tag.split('-');
        let primary = subtags.next().unwrap_or_default();
        let valid = is_iso_639_1(primary) || matches!(primary, "mul" | "und" | "mis" | "zxx");
        let mut description = format!("Language: {primary}");
        for subtag in subtags {
            match subtag.len() {
                2 => description.push_str(&format!(", Region: {}", subtag.to_uppercase())),
                4 => description.push_str(&format!(", Script: {subtag}")),
                _ => description.push_str(&format!(", Subtag: {subtag}")),
            }
        }
        LanguageTag {
            wellformed: true,
            valid,
            description,
        }
    }
}

/// Reports malformed tags as errors and unknown ones as warnings.
pub fn validate_language(
    parser: &dyn LanguageParser,
    value: &str,
    column: &str,
    reporter: &mut Reporter,
) -> bool {
    if is_empty(value) {
        return true;
    }
    let parsed = parser.parse_language(value);
    if !parsed.wellformed {
        reporter.invalid_value_because(
            column,
            value,
            format!("language code \"{value}\" is not well-formed"),
        );
        return false;
    }
    if !parsed.valid {
        reporter.invalid_value_as(
            column,
            value,
            Some(format!(
                "language code \"{value}\" is not valid, parses as: {}",
                parsed.description
            )),
            Severity::Warning,
        );
        return false;
    }
    true
}

#[test]
fn parses_common_tags() {
    let parser = PrimarySubtagParser;
    assert!(parser.parse_language("en").valid);
    assert!(parser.parse_language("en-US").valid);
    assert!(parser.parse_language("mul").valid);
    assert!(!parser.parse_language("e").wellformed);
    assert!(!parser.parse_language("en_US").wellformed);
    let unknown = parser.parse_language("qq");
    assert!(unknown.wellformed && !unknown.valid);
}
