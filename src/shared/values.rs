//! Field level value checks shared by the entity types.
//!
//! The `validate_*` functions accept empty values (required-ness is checked
//! separately) and report an invalid value against `column`.

use std::{collections::HashSet, sync::LazyLock};

use regex::Regex;

use crate::problems::{ProblemKind, Reporter, Severity};

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+").expect("static email pattern"));
static HEX_COLOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]{6}$").expect("static color pattern"));
static CANONICAL_FLOAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?\d+(\.\d+)?$").expect("static float pattern"));
static CANONICAL_NON_NEGATIVE_INT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:0|[1-9]\d*)$").expect("static integer pattern"));

/// Minimum luminance difference between a route color and its text color.
pub const MIN_COLOR_CONTRAST: f64 = 510.0 / 7.0;

pub fn is_empty(value: &str) -> bool {
    value.trim().is_empty()
}

pub fn is_valid_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

pub fn validate_url(url: &str, column: &str, reporter: &mut Reporter) -> bool {
    if is_empty(url) || is_valid_url(url) {
        return true;
    }
    reporter.invalid_value(column, url);
    false
}

pub fn validate_email(email: &str, column: &str, reporter: &mut Reporter) -> bool {
    if is_empty(email) || EMAIL.is_match(email) {
        return true;
    }
    reporter.invalid_value(column, email);
    false
}

pub fn is_valid_hex_color(color: &str) -> bool {
    HEX_COLOR.is_match(color)
}

/// Brightness of a `RRGGBB` color between 0 (black) and 255 (white).
pub fn color_luminance(color: &str) -> Option<f64> {
    if !is_valid_hex_color(color) {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&color[range], 16).ok();
    let r = f64::from(channel(0..2)?);
    let g = f64::from(channel(2..4)?);
    let b = f64::from(channel(4..6)?);
    Some((299.0 * r + 587.0 * g + 114.0 * b) / 1000.0)
}

pub fn is_valid_timezone(timezone: &str) -> bool {
    timezone.parse::<chrono_tz::Tz>().is_ok()
}

pub fn validate_timezone(timezone: &str, column: &str, reporter: &mut Reporter) -> bool {
    if is_empty(timezone) || is_valid_timezone(timezone) {
        return true;
    }
    reporter.invalid_value_because(
        column,
        timezone,
        format!("\"{timezone}\" is not a timezone name in the IANA time zone database"),
    );
    false
}

pub fn validate_yes_no_unknown(value: &str, column: &str, reporter: &mut Reporter) -> bool {
    if is_empty(value) || matches!(value, "0" | "1" | "2") {
        return true;
    }
    reporter.invalid_value(column, value);
    false
}

/// Parses an integer restricted to `allowed`.
///
/// Non integers are errors and yield `default`; integers outside `allowed`
/// are warnings and are returned as parsed.
pub fn parse_int_in(
    value: &str,
    allowed: &[i64],
    default: Option<i64>,
    allow_empty: bool,
    column: &str,
    reporter: &mut Reporter,
) -> Option<i64> {
    if allow_empty && is_empty(value) {
        return default;
    }
    match value.trim().parse::<i64>() {
        Ok(parsed) => {
            if !allowed.contains(&parsed) {
                reporter.invalid_value_as(column, value, None, Severity::Warning);
            }
            Some(parsed)
        }
        Err(_) => {
            reporter.invalid_value(column, value);
            default
        }
    }
}

/// Parses a decimal number. Values that only parse in a lenient way, such as
/// `.5` or `1e3`, are accepted with a warning.
pub fn parse_float(value: &str, reporter: &mut Reporter) -> Option<f64> {
    if value.contains(['x', 'X']) {
        return None;
    }
    let parsed: f64 = value.trim().parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    if !CANONICAL_FLOAT.is_match(value) {
        reporter.report(ProblemKind::InvalidFloatValue {
            value: value.to_string(),
        });
    }
    Some(parsed)
}

/// Parses a non-negative integer. Leading zeros or a plus sign are accepted
/// with a warning.
pub fn parse_non_negative_int(value: &str, reporter: &mut Reporter) -> Option<u32> {
    let parsed: i64 = value.trim().parse().ok()?;
    let parsed = u32::try_from(parsed).ok()?;
    if !CANONICAL_NON_NEGATIVE_INT.is_match(value) {
        reporter.report(ProblemKind::InvalidNonNegativeIntegerValue {
            value: value.to_string(),
        });
    }
    Some(parsed)
}

static ISO_639_1: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "aa", "ab", "ae", "af", "ak", "am", "an", "ar", "as", "av", "ay", "az", "ba", "be", "bg",
        "bh", "bi", "bm", "bn", "bo", "br", "bs", "ca", "ce", "ch", "co", "cr", "cs", "cu", "cv",
        "cy", "da", "de", "dv", "dz", "ee", "el", "en", "eo", "es", "et", "eu", "fa", "ff", "fi",
        "fj", "fo", "fr", "fy", "ga", "gd", "gl", "gn", "gu", "gv", "ha", "he", "hi", "ho", "hr",
        "ht", "hu", "hy", "hz", "ia", "id", "ie", "ig", "ii", "ik", "io", "is", "it", "iu", "ja",
        "jv", "ka", "kg", "ki", "kj", "kk", "kl", "km", "kn", "ko", "kr", "ks", "ku", "kv", "kw",
        "ky", "la", "lb", "lg", "li", "ln", "lo", "lt", "lu", "lv", "mg", "mh", "mi", "mk", "ml",
        "mn", "mo", "mr", "ms", "mt", "my", "na", "nb", "nd", "ne", "ng", "nl", "nn", "no", "nr",
        "nv", "ny", "oc", "oj", "om", "or", "os", "pa", "pi", "pl", "ps", "pt", "qu", "rm", "rn",
        "ro", "ru", "rw", "sa", "sc", "sd", "se", "sg", "si", "sk", "sl", "sm", "sn", "so", "sq",
        "sr", "ss", "st", "su", "sv", "sw", "ta", "te", "tg", "th", "ti", "tk", "tl", "tn", "to",
        "tr", "ts", "tt", "tw", "ty", "ug", "uk", "ur", "uz", "ve", "vi", "vo", "wa", "wo", "xh",
        "yi", "yo", "za", "zh", "zu",
    ]
    .into_iter()
    .collect()
});

pub fn is_iso_639_1(code: &str) -> bool {
    ISO_639_1.contains(code.to_lowercase().as_str())
}

static ISO_4217: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "AED", "AFN", "ALL", "AMD", "ANG", "AOA", "ARS", "AUD", "AWG", "AZN", "BAM", "BBD", "BDT",
        "BGN", "BHD", "BIF", "BMD", "BND", "BOB", "BOV", "BRL", "BSD", "BTN", "BWP", "BYN", "BYR",
        "BZD", "CAD", "CDF", "CHE", "CHF", "CHW", "CLF", "CLP", "CNY", "COP", "COU", "CRC", "CUC",
        "CUP", "CVE", "CYP", "CZK", "DJF", "DKK", "DOP", "DZD", "EEK", "EGP", "ERN", "ETB", "EUR",
        "FJD", "FKP", "GBP", "GEL", "GHC", "GHS", "GIP", "GMD", "GNF", "GTQ", "GYD", "HKD", "HNL",
        "HRK", "HTG", "HUF", "IDR", "ILS", "INR", "IQD", "IRR", "ISK", "JMD", "JOD", "JPY", "KES",
        "KGS", "KHR", "KMF", "KPW", "KRW", "KWD", "KYD", "KZT", "LAK", "LBP", "LKR", "LRD", "LSL",
        "LTL", "LVL", "LYD", "MAD", "MDL", "MGA", "MKD", "MMK", "MNT", "MOP", "MRO", "MRU", "MTL",
        "MUR", "MVR", "MWK", "MXN", "MXV", "MYR", "MZN", "NAD", "NGN", "NIO", "NOK", "NPR", "NZD",
        "OMR", "PAB", "PEN", "PGK", "PHP", "PKR", "PLN", "PYG", "QAR", "ROL", "RON", "RSD", "RUB",
        "RWF", "SAR", "SBD", "SCR", "SDD", "SDG", "SEK", "SGD", "SHP", "SKK", "SLE", "SLL", "SOS",
        "SRD", "SSP", "STD", "STN", "SYP", "SZL", "THB", "TJS", "TMM", "TMT", "TND", "TOP", "TRY",
        "TTD", "TWD", "TZS", "UAH", "UGX", "USD", "USN", "USS", "UYU", "UZS", "VEB", "VED", "VES",
        "VND", "VUV", "WST", "XAF", "XAG", "XAU", "XBA", "XBB", "XBC", "XBD", "XCD", "XDR", "XFO",
        "XFU", "XOF", "XPD", "XPF", "XPT", "XTS", "XXX", "YER", "ZAR", "ZMK", "ZMW", "ZWD", "ZWL",
    ]
    .into_iter()
    .collect()
});

pub fn is_iso_4217(code: &str) -> bool {
    ISO_4217.contains(code)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problems::Collector;

    #[test]
    fn lenient_float_warns() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        assert_eq!(parse_float("1.5", &mut reporter), Some(1.5));
        assert_eq!(parse_float(".5", &mut reporter), Some(0.5));
        assert_eq!(parse_float("0x20", &mut reporter), None);
        assert_eq!(parse_float("abc", &mut reporter), None);
        assert_eq!(collector.problems().len(), 1);
        assert_eq!(collector.problems()[0].name(), "InvalidFloatValue");
    }

    #[test]
    fn leading_zero_int_warns() {
        let mut collector = Collector::new();
        let mut reporter = Reporter::new(&mut collector);
        assert_eq!(parse_non_negative_int("10", &mut reporter), Some(10));
        assert_eq!(parse_non_negative_int("010", &mut reporter), Some(10));
        assert_eq!(parse_non_negative_int("-1", &mut reporter), None);
        assert_eq!(collector.warning_count(), 1);
    }

    #[test]
    fn luminance() {
        assert_eq!(color_luminance("000000"), Some(0.0));
        assert_eq!(color_luminance("FFFFFF"), Some(255.0));
        assert_eq!(color_luminance("GGGGGG"), None);
    }

    #[test]
    fn timezones() {
        assert!(is_valid_timezone("America/Los_Angeles"));
        assert!(is_valid_timezone("Europe/Stockholm"));
        assert!(!is_valid_timezone("Mars/Olympus_Mons"));
    }
}
