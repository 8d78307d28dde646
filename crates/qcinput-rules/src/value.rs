//! Leaf predicates over client-supplied values.
//!
//! Predicates never fail; they answer yes or no. Turning a `false` into a
//! typed error is the job of the rule layer.

use chrono::format::{parse, ParseErrorKind, Parsed, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::config::LengthUnit;

static NUMERIC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[+-]?(\d+(\.\d*)?|\.\d+)([eE][+-]?\d+)?\s*$").expect("numeric pattern")
});

static INTEGER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[+-]?(0|[1-9]\d*)\s*$").expect("integer pattern"));

static FLOAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*[+-]?((\d{1,3}(,\d{3})+|\d+)(\.\d*)?|\.\d+)([eE][+-]?\d+)?\s*$")
        .expect("float pattern")
});

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[A-Za-z0-9!#$%&'*+/=?^_`{|}~-]+)*@([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)+[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?$",
    )
    .expect("email pattern")
});

static PHONE_NOISE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(|\)|\s|\.|-|ext|Ext|EXT").expect("phone noise pattern"));

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+\d{7,15}$|^\d{7,16}$").expect("phone pattern"));

const MAX_EMAIL_LEN: usize = 254;
const MAX_EMAIL_LOCAL_LEN: usize = 64;

const BOOLEAN_LITERALS: [&str; 6] = ["true", "false", "TRUE", "FALSE", "0", "1"];

/// True when the value is a number or a numeric string such as `"1.5e3"`.
pub fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => NUMERIC_RE.is_match(s),
        _ => false,
    }
}

/// Returns the integer the value strictly represents, if any.
///
/// JSON floats never count, even when integral, and neither do strings like
/// `"3.0"`.
pub fn as_integer(value: &Value) -> Option<i128> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from)),
        Value::String(s) if INTEGER_RE.is_match(s) => s.trim().parse::<i64>().ok().map(i128::from),
        _ => None,
    }
}

pub fn is_integer(value: &Value) -> bool {
    as_integer(value).is_some()
}

/// True when the value is an integer within `[min, max]`.
pub fn integer_is_between(value: &Value, min: i64, max: i64) -> bool {
    as_integer(value)
        .map(|n| i128::from(min) <= n && n <= i128::from(max))
        .unwrap_or(false)
}

/// True when the value is a number or a floating-point string. Comma
/// thousands separators are accepted (`"1,234.5"`).
pub fn is_float(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::String(s) => FLOAT_RE.is_match(s),
        _ => false,
    }
}

pub fn is_string(value: &Value) -> bool {
    value.is_string()
}

pub fn string_has_length(value: &Value, length: usize, unit: LengthUnit) -> bool {
    match value {
        Value::String(s) => unit.measure(s) == length,
        _ => false,
    }
}

pub fn string_has_length_interval(value: &Value, min: usize, max: usize, unit: LengthUnit) -> bool {
    match value {
        Value::String(s) => {
            let len = unit.measure(s);
            min <= len && len <= max
        }
        _ => false,
    }
}

pub fn is_email(value: &Value) -> bool {
    let Value::String(s) = value else {
        return false;
    };
    if s.len() > MAX_EMAIL_LEN {
        return false;
    }
    match s.rsplit_once('@') {
        Some((local, _)) if local.len() <= MAX_EMAIL_LOCAL_LEN => EMAIL_RE.is_match(s),
        _ => false,
    }
}

/// Lenient boolean check.
///
/// Accepts native booleans, any integer `>= 0` (not only 0 and 1), and the
/// literals `true`, `false`, `TRUE`, `FALSE`, `0`, `1`.
pub fn is_boolean(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::Number(_) => as_integer(value).is_some_and(|n| n >= 0),
        Value::String(s) => {
            if let Some(n) = as_integer(value) {
                return n >= 0;
            }
            BOOLEAN_LITERALS.contains(&s.as_str())
        }
        _ => false,
    }
}

/// True when the value parses under the `strftime` pattern `format`.
///
/// The pattern may describe a full date, time or timestamp, or only part of
/// one (`%Y-%m`, `%m/%Y`). The whole string must be consumed, and fields
/// that do pin down a calendar date must name a real one.
pub fn is_date_time(value: &Value, format: &str) -> bool {
    let Value::String(s) = value else {
        return false;
    };
    NaiveDateTime::parse_from_str(s, format).is_ok()
        || NaiveDate::parse_from_str(s, format).is_ok()
        || NaiveTime::parse_from_str(s, format).is_ok()
        || DateTime::parse_from_str(s, format).is_ok()
        || parses_partially(s, format)
}

fn parses_partially(s: &str, format: &str) -> bool {
    let mut parsed = Parsed::new();
    if parse(&mut parsed, s, StrftimeItems::new(format)).is_err() {
        return false;
    }
    match parsed.to_naive_date() {
        Ok(_) => true,
        Err(err) => err.kind() == ParseErrorKind::NotEnough,
    }
}

/// True when the value looks like a phone number once punctuation,
/// whitespace and extension markers are stripped.
pub fn is_phone_number(value: &Value) -> bool {
    let Some(raw) = scalar_text(value) else {
        return false;
    };
    let lowered = raw.to_lowercase();
    let normalized = PHONE_NOISE_RE.replace_all(&lowered, "");
    PHONE_RE.is_match(&normalized)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
