//! Core value types for formula evaluation.
//!
//! This module contains the fundamental data type used throughout the
//! evaluation core:
//! - [`Val`] - The tagged result type with its coercion and rendering rules
//!
//! Coercions never fail loudly: an unconvertible value yields `None` and the
//! caller decides whether that becomes a `Null` or an `Error` result.

pub mod compare;

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Length of the normal date-time form `2000-01-01T00:00:00.000Z`.
const NORMAL_DATE_LEN: usize = 24;

/// A value produced by evaluating a formula expression.
///
/// This enum represents every result the evaluation core can produce.
/// `Error` is a first-class value: evaluation faults propagate through the
/// expression tree as data rather than unwinding it, so a formula that errors
/// on one row still produces output for every other row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Val {
    /// Evaluation fault carrying a human-readable message
    Error(String),
    /// Absent value
    Null,
    /// Boolean value (true/false)
    Boolean(bool),
    /// 32-bit signed integer
    Integer(i32),
    /// 64-bit signed integer
    Long(i64),
    /// 64-bit floating point number
    Double(f64),
    /// UTF-8 string
    String(String),
}

impl Val {
    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Error(_) => "error",
            Val::Null => "null",
            Val::Boolean(_) => "boolean",
            Val::Integer(_) => "integer",
            Val::Long(_) => "long",
            Val::Double(_) => "double",
            Val::String(_) => "string",
        }
    }

    /// True for every variant except `Null` and `Error`.
    pub fn has_value(&self) -> bool {
        !matches!(self, Val::Null | Val::Error(_))
    }

    pub fn is_value(&self) -> bool {
        self.has_value()
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Val::Integer(_) | Val::Long(_) | Val::Double(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Val::Error(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Val::Null)
    }

    pub fn to_integer(&self) -> Option<i32> {
        match self {
            Val::Boolean(b) => Some(*b as i32),
            Val::Integer(i) => Some(*i),
            Val::Long(l) => Some(*l as i32),
            Val::Double(d) => Some(*d as i32),
            Val::String(s) => s.parse().ok(),
            Val::Null | Val::Error(_) => None,
        }
    }

    pub fn to_long(&self) -> Option<i64> {
        match self {
            Val::Boolean(b) => Some(*b as i64),
            Val::Integer(i) => Some(*i as i64),
            Val::Long(l) => Some(*l),
            Val::Double(d) => Some(*d as i64),
            // Strings fall back to the normal date-time form, yielding epoch
            // milliseconds, so date-valued columns sort and subtract sanely.
            Val::String(s) => s.parse().ok().or_else(|| parse_normal_date(s)),
            Val::Null | Val::Error(_) => None,
        }
    }

    pub fn to_double(&self) -> Option<f64> {
        match self {
            Val::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Val::Integer(i) => Some(*i as f64),
            Val::Long(l) => Some(*l as f64),
            Val::Double(d) => Some(*d),
            Val::String(s) => s
                .parse()
                .ok()
                .or_else(|| parse_normal_date(s).map(|ms| ms as f64)),
            Val::Null | Val::Error(_) => None,
        }
    }

    pub fn to_boolean(&self) -> Option<bool> {
        match self {
            Val::Boolean(b) => Some(*b),
            Val::Integer(i) => Some(*i != 0),
            Val::Long(l) => Some(*l != 0),
            Val::Double(d) => Some(*d != 0.0),
            Val::String(s) => Some(s.eq_ignore_ascii_case("true")),
            Val::Null | Val::Error(_) => None,
        }
    }

    /// String form of this value, or `None` for `Null`.
    ///
    /// `Error` renders its message so faults stay visible when a caller
    /// stringifies indiscriminately (e.g. the joining aggregator).
    pub fn to_string_value(&self) -> Option<String> {
        match self {
            Val::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Appends this value as a formula-text literal, re-parseable by the
    /// expression grammar (`'quoted'` strings, `null()`, `true()`/`false()`).
    pub fn append_literal(&self, out: &mut String) {
        match self {
            Val::Error(_) => out.push_str("err()"),
            Val::Null => out.push_str("null()"),
            Val::Boolean(true) => out.push_str("true()"),
            Val::Boolean(false) => out.push_str("false()"),
            Val::Integer(_) | Val::Long(_) | Val::Double(_) => out.push_str(&self.to_string()),
            Val::String(s) => {
                out.push('\'');
                out.push_str(&s.replace('\'', "''"));
                out.push('\'');
            }
        }
    }
}

/// Display implementation for clean output formatting.
///
/// `Double` uses the shortest decimal form: no trailing zeros and never
/// exponent notation, so `100.0` renders as `"100"` and `1.5` as `"1.5"`.
impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Error(msg) => write!(f, "{}", msg),
            Val::Null => Ok(()),
            Val::Boolean(b) => write!(f, "{}", b),
            Val::Integer(i) => write!(f, "{}", i),
            Val::Long(l) => write!(f, "{}", l),
            Val::Double(d) => write!(f, "{}", d),
            Val::String(s) => write!(f, "{}", s),
        }
    }
}

/// Hash over the discriminant plus value bits so values can participate in
/// group keys. `f64` hashes through its bit representation, which handles
/// NaN, infinity and -0.0 deterministically.
impl Hash for Val {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Val::Error(msg) => msg.hash(state),
            Val::Null => {}
            Val::Boolean(b) => b.hash(state),
            Val::Integer(i) => i.hash(state),
            Val::Long(l) => l.hash(state),
            Val::Double(d) => d.to_bits().hash(state),
            Val::String(s) => s.hash(state),
        }
    }
}

impl From<bool> for Val {
    fn from(b: bool) -> Self {
        Val::Boolean(b)
    }
}

impl From<i32> for Val {
    fn from(i: i32) -> Self {
        Val::Integer(i)
    }
}

impl From<i64> for Val {
    fn from(l: i64) -> Self {
        Val::Long(l)
    }
}

impl From<f64> for Val {
    fn from(d: f64) -> Self {
        Val::Double(d)
    }
}

impl From<String> for Val {
    fn from(s: String) -> Self {
        Val::String(s)
    }
}

impl From<&str> for Val {
    fn from(s: &str) -> Self {
        Val::String(s.to_string())
    }
}

/// Parses the normal date-time form `yyyy-MM-ddTHH:mm:ss.SSS±ZZ` (exactly 24
/// characters, e.g. `2000-01-01T00:00:00.000Z`) to epoch milliseconds.
fn parse_normal_date(s: &str) -> Option<i64> {
    if s.len() != NORMAL_DATE_LEN {
        return None;
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name() {
        assert_eq!(Val::Null.type_name(), "null");
        assert_eq!(Val::Error("x".into()).type_name(), "error");
        assert_eq!(Val::Boolean(true).type_name(), "boolean");
        assert_eq!(Val::Integer(1).type_name(), "integer");
        assert_eq!(Val::Long(1).type_name(), "long");
        assert_eq!(Val::Double(1.0).type_name(), "double");
        assert_eq!(Val::String("s".into()).type_name(), "string");
    }

    #[test]
    fn test_has_value() {
        assert!(!Val::Null.has_value());
        assert!(!Val::Error("boom".into()).has_value());
        assert!(Val::Boolean(false).has_value());
        assert!(Val::Integer(0).has_value());
        assert!(Val::String(String::new()).has_value());
    }

    #[test]
    fn test_predicates() {
        assert!(Val::Integer(1).is_number());
        assert!(Val::Long(1).is_number());
        assert!(Val::Double(1.0).is_number());
        assert!(!Val::String("1".into()).is_number());
        assert!(Val::Null.is_null());
        assert!(Val::Error("e".into()).is_error());
    }

    #[test]
    fn test_to_integer() {
        assert_eq!(Val::Integer(42).to_integer(), Some(42));
        assert_eq!(Val::Long(42).to_integer(), Some(42));
        assert_eq!(Val::Double(3.7).to_integer(), Some(3));
        assert_eq!(Val::Boolean(true).to_integer(), Some(1));
        assert_eq!(Val::String("42".into()).to_integer(), Some(42));
        assert_eq!(Val::String("nope".into()).to_integer(), None);
        assert_eq!(Val::Null.to_integer(), None);
        assert_eq!(Val::Error("e".into()).to_integer(), None);
    }

    #[test]
    fn test_to_long_from_date_string() {
        assert_eq!(
            Val::String("2000-01-01T00:00:00.000Z".into()).to_long(),
            Some(946684800000)
        );
        // Wrong length is not a normal date
        assert_eq!(Val::String("2000-01-01T00:00:00Z".into()).to_long(), None);
    }

    #[test]
    fn test_to_double() {
        assert_eq!(Val::Double(2.5).to_double(), Some(2.5));
        assert_eq!(Val::Integer(2).to_double(), Some(2.0));
        assert_eq!(Val::String("99.3".into()).to_double(), Some(99.3));
        assert_eq!(Val::String("abc".into()).to_double(), None);
        assert_eq!(Val::Boolean(true).to_double(), Some(1.0));
    }

    #[test]
    fn test_to_boolean() {
        assert_eq!(Val::Boolean(true).to_boolean(), Some(true));
        assert_eq!(Val::Integer(0).to_boolean(), Some(false));
        assert_eq!(Val::Integer(7).to_boolean(), Some(true));
        assert_eq!(Val::Double(0.0).to_boolean(), Some(false));
        assert_eq!(Val::String("true".into()).to_boolean(), Some(true));
        assert_eq!(Val::String("TRUE".into()).to_boolean(), Some(true));
        assert_eq!(Val::String("yes".into()).to_boolean(), Some(false));
        assert_eq!(Val::Null.to_boolean(), None);
    }

    #[test]
    fn test_double_rendering() {
        assert_eq!(Val::Double(100.0).to_string(), "100");
        assert_eq!(Val::Double(1.5).to_string(), "1.5");
        assert_eq!(Val::Double(0.25).to_string(), "0.25");
        assert_eq!(Val::Double(-3.0).to_string(), "-3");
    }

    #[test]
    fn test_string_value() {
        assert_eq!(Val::Null.to_string_value(), None);
        assert_eq!(Val::Integer(5).to_string_value(), Some("5".to_string()));
        assert_eq!(
            Val::Boolean(false).to_string_value(),
            Some("false".to_string())
        );
        assert_eq!(
            Val::Error("bad".into()).to_string_value(),
            Some("bad".to_string())
        );
    }

    #[test]
    fn test_literal_rendering() {
        let mut out = String::new();
        Val::String("it's a string".into()).append_literal(&mut out);
        assert_eq!(out, "'it''s a string'");

        let mut out = String::new();
        Val::Null.append_literal(&mut out);
        assert_eq!(out, "null()");

        let mut out = String::new();
        Val::Double(50.0).append_literal(&mut out);
        assert_eq!(out, "50");

        let mut out = String::new();
        Val::Boolean(true).append_literal(&mut out);
        assert_eq!(out, "true()");
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(Val::from(true), Val::Boolean(true));
        assert_eq!(Val::from(5i32), Val::Integer(5));
        assert_eq!(Val::from(5i64), Val::Long(5));
        assert_eq!(Val::from(2.5f64), Val::Double(2.5));
        assert_eq!(Val::from("hi"), Val::String("hi".into()));
    }
}
