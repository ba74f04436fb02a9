//! Scalar (per-row) operations.
//!
//! Each operation knows its name, arity and how to build its evaluation
//! pipeline. Operations are pure: the same child values always produce the
//! same result, which is what makes constant folding safe for all of them.

use crate::streamexpr::expr::cache::{cached_formatter, cached_regex};
use crate::streamexpr::expr::evaluator::Evaluator;
use crate::streamexpr::values::compare::{compare_values, equals};
use crate::streamexpr::values::Val;
use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use std::cmp::Ordering;

/// A scalar operation from the function catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanOrEqualTo,
    LessThan,
    LessThanOrEqualTo,
    Not,
    If,
    Concat,
    UpperCase,
    LowerCase,
    StringLength,
    Substring,
    SubstringBefore,
    SubstringAfter,
    IndexOf,
    Replace,
    /// `literal_tests[i]` is true when test `i` was authored as a literal
    /// and is therefore matched as a regex; dynamic tests compare by string
    /// equality.
    Decode { literal_tests: Vec<bool> },
    Include,
    Exclude,
    Match,
    Hash,
    ToInteger,
    ToLong,
    ToDouble,
    ToString,
    ParseDate,
    FormatDate,
}

impl ScalarOp {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarOp::Add => "+",
            ScalarOp::Subtract => "-",
            ScalarOp::Multiply => "*",
            ScalarOp::Divide => "/",
            ScalarOp::Modulo => "%",
            ScalarOp::Equals => "=",
            ScalarOp::NotEquals => "!=",
            ScalarOp::GreaterThan => ">",
            ScalarOp::GreaterThanOrEqualTo => ">=",
            ScalarOp::LessThan => "<",
            ScalarOp::LessThanOrEqualTo => "<=",
            ScalarOp::Not => "not",
            ScalarOp::If => "if",
            ScalarOp::Concat => "concat",
            ScalarOp::UpperCase => "upperCase",
            ScalarOp::LowerCase => "lowerCase",
            ScalarOp::StringLength => "stringLength",
            ScalarOp::Substring => "substring",
            ScalarOp::SubstringBefore => "substringBefore",
            ScalarOp::SubstringAfter => "substringAfter",
            ScalarOp::IndexOf => "indexOf",
            ScalarOp::Replace => "replace",
            ScalarOp::Decode { .. } => "decode",
            ScalarOp::Include => "include",
            ScalarOp::Exclude => "exclude",
            ScalarOp::Match => "match",
            ScalarOp::Hash => "hash",
            ScalarOp::ToInteger => "toInteger",
            ScalarOp::ToLong => "toLong",
            ScalarOp::ToDouble => "toDouble",
            ScalarOp::ToString => "toString",
            ScalarOp::ParseDate => "parseDate",
            ScalarOp::FormatDate => "formatDate",
        }
    }

    /// Operators render infix in formula text, functions render prefix.
    pub fn is_operator(&self) -> bool {
        matches!(
            self,
            ScalarOp::Add
                | ScalarOp::Subtract
                | ScalarOp::Multiply
                | ScalarOp::Divide
                | ScalarOp::Modulo
                | ScalarOp::Equals
                | ScalarOp::NotEquals
                | ScalarOp::GreaterThan
                | ScalarOp::GreaterThanOrEqualTo
                | ScalarOp::LessThan
                | ScalarOp::LessThanOrEqualTo
        )
    }

    /// (min, max) parameter counts. `usize::MAX` marks an open upper bound.
    pub fn arity(&self) -> (usize, usize) {
        match self {
            ScalarOp::Add
            | ScalarOp::Subtract
            | ScalarOp::Multiply
            | ScalarOp::Divide
            | ScalarOp::Modulo => (2, usize::MAX),
            ScalarOp::Equals
            | ScalarOp::NotEquals
            | ScalarOp::GreaterThan
            | ScalarOp::GreaterThanOrEqualTo
            | ScalarOp::LessThan
            | ScalarOp::LessThanOrEqualTo => (2, 2),
            ScalarOp::Not => (1, 1),
            ScalarOp::If => (3, 3),
            ScalarOp::Concat => (1, usize::MAX),
            ScalarOp::UpperCase | ScalarOp::LowerCase | ScalarOp::StringLength => (1, 1),
            ScalarOp::Substring => (3, 3),
            ScalarOp::SubstringBefore | ScalarOp::SubstringAfter | ScalarOp::IndexOf => (2, 2),
            ScalarOp::Replace => (3, 3),
            ScalarOp::Decode { .. } => (4, usize::MAX),
            ScalarOp::Include | ScalarOp::Exclude => (2, usize::MAX),
            ScalarOp::Match => (2, 2),
            ScalarOp::Hash => (1, 3),
            ScalarOp::ToInteger | ScalarOp::ToLong | ScalarOp::ToDouble | ScalarOp::ToString => {
                (1, 1)
            }
            ScalarOp::ParseDate | ScalarOp::FormatDate => (1, 3),
        }
    }

    /// Builds the evaluation pipeline for this operation.
    pub fn evaluator(&self) -> Evaluator {
        let name = self.name();
        match self {
            ScalarOp::Add => numeric(name, |a, b| a + b),
            ScalarOp::Subtract => numeric(name, |a, b| a - b),
            ScalarOp::Multiply => numeric(name, |a, b| a * b),
            ScalarOp::Divide => numeric(name, |a, b| a / b),
            ScalarOp::Modulo => numeric(name, |a, b| a % b),
            ScalarOp::Equals => Evaluator::builder(name)
                .error_on_first_error()
                .step(|vals| Some(equals(&vals[0], &vals[1])))
                .build(),
            ScalarOp::NotEquals => Evaluator::builder(name)
                .error_on_first_error()
                .step(|vals| match equals(&vals[0], &vals[1]) {
                    Val::Boolean(b) => Some(Val::Boolean(!b)),
                    other => Some(other),
                })
                .build(),
            ScalarOp::GreaterThan => ordering(name, |o| o == Ordering::Greater),
            ScalarOp::GreaterThanOrEqualTo => ordering(name, |o| o != Ordering::Less),
            ScalarOp::LessThan => ordering(name, |o| o == Ordering::Less),
            ScalarOp::LessThanOrEqualTo => ordering(name, |o| o != Ordering::Greater),
            ScalarOp::Not => Evaluator::builder(name)
                .error_on_first_error()
                .step(|vals| match vals[0].to_boolean() {
                    Some(b) => Some(Val::Boolean(!b)),
                    None => Some(Val::Error("Expecting a condition".to_string())),
                })
                .build(),
            ScalarOp::If => Evaluator::builder(name)
                .step(|vals| {
                    let condition = &vals[0];
                    if !condition.has_value() {
                        return Some(condition.clone());
                    }
                    match condition.to_boolean() {
                        Some(true) => Some(vals[1].clone()),
                        Some(false) => Some(vals[2].clone()),
                        None => Some(Val::Error("Expecting a condition".to_string())),
                    }
                })
                .build(),
            ScalarOp::Concat => Evaluator::builder(name)
                .error_on_first_error()
                .step(|vals| {
                    let mut out = String::new();
                    for v in vals {
                        if let Some(s) = v.to_string_value() {
                            out.push_str(&s);
                        }
                    }
                    Some(Val::String(out))
                })
                .build(),
            ScalarOp::UpperCase => Evaluator::builder(name)
                .error_on_first_error()
                .string_mapper(|s| s.map(|x| x.to_uppercase()))
                .build(),
            ScalarOp::LowerCase => Evaluator::builder(name)
                .error_on_first_error()
                .string_mapper(|s| s.map(|x| x.to_lowercase()))
                .build(),
            ScalarOp::StringLength => Evaluator::builder(name)
                .step(|vals| {
                    let v = &vals[0];
                    if !v.has_value() {
                        return Some(v.clone());
                    }
                    let count = v.to_string().chars().count();
                    Some(Val::Integer(count as i32))
                })
                .build(),
            ScalarOp::Substring => Evaluator::builder(name)
                .error_on_first_error()
                .step(|vals| Some(substring(vals)))
                .build(),
            ScalarOp::SubstringBefore => Evaluator::builder(name)
                .error_on_first_error()
                .step(|vals| Some(substring_around(vals, true)))
                .build(),
            ScalarOp::SubstringAfter => Evaluator::builder(name)
                .error_on_first_error()
                .step(|vals| Some(substring_around(vals, false)))
                .build(),
            ScalarOp::IndexOf => Evaluator::builder(name)
                .error_on_first_error()
                .step(|vals| Some(index_of(vals)))
                .build(),
            ScalarOp::Replace => Evaluator::builder(name)
                .error_on_first_error()
                .step(|vals| Some(replace(vals)))
                .build(),
            ScalarOp::Decode { literal_tests } => {
                let literal_tests = literal_tests.clone();
                Evaluator::builder(name)
                    .error_on_first_error()
                    .step(move |vals| Some(decode(vals, &literal_tests)))
                    .build()
            }
            ScalarOp::Include => Evaluator::builder(name)
                .error_on_first_error()
                .step(|vals| Some(include_exclude(vals, true)))
                .build(),
            ScalarOp::Exclude => Evaluator::builder(name)
                .error_on_first_error()
                .step(|vals| Some(include_exclude(vals, false)))
                .build(),
            ScalarOp::Match => Evaluator::builder(name)
                .error_on_first_error()
                .step(|vals| {
                    let v = &vals[0];
                    if !v.has_value() {
                        return Some(v.clone());
                    }
                    let pattern = match vals[1].to_string_value() {
                        Some(p) => p,
                        None => return Some(Val::Error("Expecting a pattern".to_string())),
                    };
                    Some(match full_match(&pattern, &v.to_string()) {
                        Ok(matched) => Val::Boolean(matched),
                        Err(e) => Val::Error(e),
                    })
                })
                .build(),
            ScalarOp::Hash => Evaluator::builder(name)
                .error_on_first_error()
                .step(|vals| Some(hash(vals)))
                .build(),
            ScalarOp::ToInteger => cast(name, "integer", |v| v.to_integer().map(Val::Integer)),
            ScalarOp::ToLong => cast(name, "long", |v| v.to_long().map(Val::Long)),
            ScalarOp::ToDouble => cast(name, "double", |v| v.to_double().map(Val::Double)),
            ScalarOp::ToString => Evaluator::builder(name)
                .error_on_first_error()
                .string_mapper(|s| s.map(|x| x.to_string()))
                .build(),
            ScalarOp::ParseDate => Evaluator::builder(name)
                .error_on_first_error()
                .step(|vals| Some(parse_date(vals)))
                .build(),
            ScalarOp::FormatDate => Evaluator::builder(name)
                .error_on_first_error()
                .step(|vals| Some(format_date(vals)))
                .build(),
        }
    }
}

/// Left-to-right fold over doubles. A null or error operand propagates
/// unchanged; a present but non-numeric operand is a fault.
fn numeric(name: &'static str, op: fn(f64, f64) -> f64) -> Evaluator {
    Evaluator::builder(name)
        .step(move |vals| {
            let mut acc: Option<f64> = None;
            for v in vals {
                if !v.has_value() {
                    return Some(v.clone());
                }
                if !v.is_number() {
                    return Some(Val::Error(format!(
                        "Expecting a number, got '{}' in function {}",
                        v, name
                    )));
                }
                let x = v.to_double()?;
                acc = Some(match acc {
                    None => x,
                    Some(a) => op(a, x),
                });
            }
            Some(acc.map(Val::Double).unwrap_or(Val::Null))
        })
        .build()
}

fn ordering(name: &'static str, accept: fn(Ordering) -> bool) -> Evaluator {
    Evaluator::builder(name)
        .step(move |vals| match compare_values(&vals[0], &vals[1]) {
            Some(ord) => Some(Val::Boolean(accept(ord))),
            None => Some(Val::Error(format!(
                "Unable to compare absent value in operator {}",
                name
            ))),
        })
        .build()
}

fn cast(
    name: &'static str,
    target: &'static str,
    convert: fn(&Val) -> Option<Val>,
) -> Evaluator {
    Evaluator::builder(name)
        .step(move |vals| {
            let v = &vals[0];
            if !v.has_value() {
                return Some(v.clone());
            }
            Some(convert(v).unwrap_or_else(|| {
                Val::Error(format!("Unable to cast '{}' to {}", v, target))
            }))
        })
        .build()
}

/// substring(value, start, end) over character positions. Start clamps to 0,
/// an end before the start or a start past the end yields the empty string,
/// an end past the end takes the rest.
fn substring(vals: &[Val]) -> Val {
    let v = &vals[0];
    if !v.has_value() {
        return v.clone();
    }
    let (start, end) = match (vals[1].to_integer(), vals[2].to_integer()) {
        (Some(s), Some(e)) => (s, e),
        _ => return Val::Error("Expecting numeric start and end positions".to_string()),
    };
    let chars: Vec<char> = v.to_string().chars().collect();
    let len = chars.len() as i32;
    let start = start.max(0);
    if end < start || start >= len {
        return Val::String(String::new());
    }
    let end = end.min(len);
    Val::String(chars[start as usize..end as usize].iter().collect())
}

fn substring_around(vals: &[Val], before: bool) -> Val {
    let v = &vals[0];
    if !v.has_value() {
        return v.clone();
    }
    let delimiter = match vals[1].to_string_value() {
        Some(d) => d,
        None => return Val::Error("Expecting a delimiter".to_string()),
    };
    let s = v.to_string();
    match s.find(&delimiter) {
        Some(pos) => {
            if before {
                Val::String(s[..pos].to_string())
            } else {
                Val::String(s[pos + delimiter.len()..].to_string())
            }
        }
        None => Val::String(String::new()),
    }
}

fn index_of(vals: &[Val]) -> Val {
    let v = &vals[0];
    if !v.has_value() {
        return v.clone();
    }
    let needle = match vals[1].to_string_value() {
        Some(n) => n,
        None => return Val::Error("Expecting a string to find".to_string()),
    };
    let s = v.to_string();
    match s.find(&needle) {
        Some(byte_pos) => Val::Integer(s[..byte_pos].chars().count() as i32),
        None => Val::Integer(-1),
    }
}

fn replace(vals: &[Val]) -> Val {
    let v = &vals[0];
    if !v.has_value() {
        return v.clone();
    }
    let (pattern, replacement) = match (vals[1].to_string_value(), vals[2].to_string_value()) {
        (Some(p), Some(r)) => (p, r),
        _ => return Val::Error("Expecting a pattern and a replacement".to_string()),
    };
    match cached_regex("replace", &pattern) {
        Ok(regex) => Val::String(regex.replace_all(&v.to_string(), replacement.as_str()).into_owned()),
        Err(e) => Val::Error(e.to_string()),
    }
}

/// decode(input, test1, result1, ..., default): first matching test wins,
/// otherwise the trailing default. Literal tests match as whole-string
/// regexes, dynamic tests by string equality.
fn decode(vals: &[Val], literal_tests: &[bool]) -> Val {
    let v = &vals[0];
    if !v.has_value() {
        return v.clone();
    }
    let input = v.to_string();
    let pairs = &vals[1..vals.len() - 1];
    for (i, pair) in pairs.chunks(2).enumerate() {
        let test = match pair[0].to_string_value() {
            Some(t) => t,
            None => continue,
        };
        let matched = if literal_tests.get(i).copied().unwrap_or(false) {
            match full_match(&test, &input) {
                Ok(m) => m,
                Err(e) => return Val::Error(e),
            }
        } else {
            test == input
        };
        if matched {
            return pair[1].clone();
        }
    }
    vals[vals.len() - 1].clone()
}

fn include_exclude(vals: &[Val], include: bool) -> Val {
    let v = &vals[0];
    if !v.has_value() {
        return v.clone();
    }
    let s = v.to_string();
    for pattern_val in &vals[1..] {
        let pattern = match pattern_val.to_string_value() {
            Some(p) => p,
            None => continue,
        };
        match full_match(&pattern, &s) {
            Ok(true) => {
                return if include { v.clone() } else { Val::Null };
            }
            Ok(false) => {}
            Err(e) => return Val::Error(e),
        }
    }
    if include {
        Val::Null
    } else {
        v.clone()
    }
}

/// Whole-string regex match through the process cache.
fn full_match(pattern: &str, input: &str) -> Result<bool, String> {
    let anchored = format!(r"\A(?:{})\z", pattern);
    cached_regex("match", &anchored)
        .map(|r| r.is_match(input))
        .map_err(|e| e.to_string())
}

/// hash(value[, algorithm[, salt]]): SHA-256 by default; the salt, when
/// given, is prepended to the digested input. Output is lowercase hex.
fn hash(vals: &[Val]) -> Val {
    let v = &vals[0];
    if !v.has_value() {
        return v.clone();
    }
    let algorithm = match vals.get(1) {
        Some(a) if a.has_value() => match a.to_string_value() {
            Some(s) => s,
            None => return Val::Error("Expecting a hash algorithm".to_string()),
        },
        _ => "SHA-256".to_string(),
    };
    let mut input = String::new();
    if let Some(salt) = vals.get(2).and_then(|s| s.to_string_value()) {
        input.push_str(&salt);
    }
    input.push_str(&v.to_string());

    let digest = match algorithm.to_ascii_uppercase().replace('-', "").as_str() {
        "SHA224" => format!("{:x}", Sha224::digest(input.as_bytes())),
        "SHA256" => format!("{:x}", Sha256::digest(input.as_bytes())),
        "SHA384" => format!("{:x}", Sha384::digest(input.as_bytes())),
        "SHA512" => format!("{:x}", Sha512::digest(input.as_bytes())),
        other => {
            return Val::Error(format!("Unsupported hash algorithm '{}'", other));
        }
    };
    Val::String(digest)
}

/// Default date pattern is the normal form `2010-01-01T23:59:59.000Z`.
fn parse_date(vals: &[Val]) -> Val {
    let v = &vals[0];
    if !v.has_value() {
        return v.clone();
    }
    let text = v.to_string();
    if vals.len() == 1 {
        return match DateTime::parse_from_rfc3339(&text) {
            Ok(dt) => Val::Long(dt.timestamp_millis()),
            Err(_) => Val::Error(format!("Unable to parse date '{}'", text)),
        };
    }
    let (pattern, zone) = match pattern_and_zone(vals) {
        Ok(pz) => pz,
        Err(e) => return Val::Error(e),
    };
    match cached_formatter("parseDate", &pattern, &zone) {
        Ok(formatter) => match formatter.parse_millis(&text) {
            Some(ms) => Val::Long(ms),
            None => Val::Error(format!("Unable to parse date '{}'", text)),
        },
        Err(e) => Val::Error(e.to_string()),
    }
}

fn format_date(vals: &[Val]) -> Val {
    let v = &vals[0];
    if !v.has_value() {
        return v.clone();
    }
    let millis = match v.to_long() {
        Some(ms) => ms,
        None => return Val::Error(format!("Unable to cast '{}' to long", v)),
    };
    if vals.len() == 1 {
        return match Utc.timestamp_millis_opt(millis).single() {
            Some(dt) => Val::String(dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => Val::Error(format!("Millisecond value '{}' is out of range", millis)),
        };
    }
    let (pattern, zone) = match pattern_and_zone(vals) {
        Ok(pz) => pz,
        Err(e) => return Val::Error(e),
    };
    match cached_formatter("formatDate", &pattern, &zone) {
        Ok(formatter) => match formatter.format_millis(millis) {
            Some(s) => Val::String(s),
            None => Val::Error(format!("Millisecond value '{}' is out of range", millis)),
        },
        Err(e) => Val::Error(e.to_string()),
    }
}

fn pattern_and_zone(vals: &[Val]) -> Result<(String, String), String> {
    let pattern = vals[1]
        .to_string_value()
        .ok_or_else(|| "Expecting a date pattern".to_string())?;
    let zone = match vals.get(2) {
        Some(z) if z.has_value() => z
            .to_string_value()
            .ok_or_else(|| "Expecting a time zone".to_string())?,
        _ => "UTC".to_string(),
    };
    Ok((pattern, zone))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(op: ScalarOp, vals: &[Val]) -> Val {
        op.evaluator().evaluate(vals)
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(
            eval(ScalarOp::Add, &[Val::Integer(2), Val::Integer(3)]),
            Val::Double(5.0)
        );
        assert_eq!(
            eval(
                ScalarOp::Subtract,
                &[Val::Integer(10), Val::Integer(3), Val::Integer(2)]
            ),
            Val::Double(5.0)
        );
        assert_eq!(
            eval(ScalarOp::Divide, &[Val::Integer(7), Val::Double(2.0)]),
            Val::Double(3.5)
        );
        assert_eq!(
            eval(ScalarOp::Modulo, &[Val::Integer(7), Val::Integer(4)]),
            Val::Double(3.0)
        );
    }

    #[test]
    fn test_arithmetic_propagates_absent_and_faults_on_strings() {
        assert_eq!(
            eval(ScalarOp::Add, &[Val::Null, Val::Integer(1)]),
            Val::Null
        );
        let e = eval(ScalarOp::Add, &[Val::Error("x".into()), Val::Integer(1)]);
        assert_eq!(e, Val::Error("x".into()));
        assert!(eval(ScalarOp::Add, &[Val::String("5".into()), Val::Integer(1)]).is_error());
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(
            eval(ScalarOp::GreaterThan, &[Val::Integer(3), Val::Integer(2)]),
            Val::Boolean(true)
        );
        assert_eq!(
            eval(
                ScalarOp::LessThanOrEqualTo,
                &[Val::Double(2.0), Val::Integer(2)]
            ),
            Val::Boolean(true)
        );
        assert_eq!(
            eval(ScalarOp::Equals, &[Val::Null, Val::Null]),
            Val::Boolean(true)
        );
        assert_eq!(
            eval(ScalarOp::NotEquals, &[Val::Integer(1), Val::Integer(2)]),
            Val::Boolean(true)
        );
        assert!(eval(ScalarOp::GreaterThan, &[Val::Null, Val::Integer(1)]).is_error());
    }

    #[test]
    fn test_equality_propagates_operand_errors_unchanged() {
        let cast_fault = Val::Error("Unable to cast 'abc' to integer".into());
        assert_eq!(
            eval(ScalarOp::Equals, &[cast_fault.clone(), Val::Integer(1)]),
            cast_fault
        );
        assert_eq!(
            eval(ScalarOp::NotEquals, &[Val::Integer(1), cast_fault.clone()]),
            cast_fault
        );
    }

    #[test]
    fn test_not_and_if() {
        assert_eq!(eval(ScalarOp::Not, &[Val::Boolean(true)]), Val::Boolean(false));
        assert!(eval(ScalarOp::Not, &[Val::Null]).is_error());
        assert_eq!(
            eval(
                ScalarOp::If,
                &[Val::Boolean(true), Val::Integer(1), Val::Integer(2)]
            ),
            Val::Integer(1)
        );
        assert_eq!(
            eval(
                ScalarOp::If,
                &[Val::Boolean(false), Val::Integer(1), Val::Integer(2)]
            ),
            Val::Integer(2)
        );
        // An error in the untaken branch does not surface
        assert_eq!(
            eval(
                ScalarOp::If,
                &[Val::Boolean(true), Val::Integer(1), Val::Error("x".into())]
            ),
            Val::Integer(1)
        );
    }

    #[test]
    fn test_string_functions() {
        assert_eq!(
            eval(ScalarOp::UpperCase, &[Val::String("abc".into())]),
            Val::String("ABC".into())
        );
        assert_eq!(eval(ScalarOp::LowerCase, &[Val::Null]), Val::Null);
        assert_eq!(
            eval(ScalarOp::StringLength, &[Val::String("héllo".into())]),
            Val::Integer(5)
        );
        assert_eq!(
            eval(
                ScalarOp::Concat,
                &[Val::String("a".into()), Val::Null, Val::Integer(5)]
            ),
            Val::String("a5".into())
        );
    }

    #[test]
    fn test_substring_clamping() {
        let s = Val::String("this".into());
        let sub = |start: i32, end: i32| {
            eval(
                ScalarOp::Substring,
                &[s.clone(), Val::Integer(start), Val::Integer(end)],
            )
        };
        assert_eq!(sub(1, 3), Val::String("hi".into()));
        assert_eq!(sub(-1, 2), Val::String("th".into()));
        assert_eq!(sub(2, 99), Val::String("is".into()));
        assert_eq!(sub(3, 1), Val::String("".into()));
        assert_eq!(sub(9, 12), Val::String("".into()));
    }

    #[test]
    fn test_substring_before_after_index_of() {
        let s = Val::String("key=value".into());
        assert_eq!(
            eval(ScalarOp::SubstringBefore, &[s.clone(), Val::String("=".into())]),
            Val::String("key".into())
        );
        assert_eq!(
            eval(ScalarOp::SubstringAfter, &[s.clone(), Val::String("=".into())]),
            Val::String("value".into())
        );
        assert_eq!(
            eval(ScalarOp::SubstringBefore, &[s.clone(), Val::String("|".into())]),
            Val::String("".into())
        );
        assert_eq!(
            eval(ScalarOp::IndexOf, &[s.clone(), Val::String("=".into())]),
            Val::Integer(3)
        );
        assert_eq!(
            eval(ScalarOp::IndexOf, &[s, Val::String("|".into())]),
            Val::Integer(-1)
        );
    }

    #[test]
    fn test_replace() {
        assert_eq!(
            eval(
                ScalarOp::Replace,
                &[
                    Val::String("a1b22c".into()),
                    Val::String(r"\d+".into()),
                    Val::String("#".into())
                ]
            ),
            Val::String("a#b#c".into())
        );
        assert!(eval(
            ScalarOp::Replace,
            &[
                Val::String("x".into()),
                Val::String("(".into()),
                Val::String("y".into())
            ]
        )
        .is_error());
    }

    #[test]
    fn test_decode_literal_regex_and_default() {
        let op = ScalarOp::Decode {
            literal_tests: vec![true, true],
        };
        let args = |input: &str| {
            vec![
                Val::String(input.into()),
                Val::String("^a.*".into()),
                Val::String("starts with a".into()),
                Val::String(".*z$".into()),
                Val::String("ends with z".into()),
                Val::String("other".into()),
            ]
        };
        assert_eq!(
            eval(op.clone(), &args("abc")),
            Val::String("starts with a".into())
        );
        assert_eq!(
            eval(op.clone(), &args("xyz")),
            Val::String("ends with z".into())
        );
        assert_eq!(eval(op, &args("mmm")), Val::String("other".into()));
    }

    #[test]
    fn test_decode_dynamic_test_is_equality() {
        let op = ScalarOp::Decode {
            literal_tests: vec![false],
        };
        // ".*" as a dynamic test only matches the literal string ".*"
        let args = vec![
            Val::String("anything".into()),
            Val::String(".*".into()),
            Val::String("matched".into()),
            Val::String("default".into()),
        ];
        assert_eq!(eval(op.clone(), &args), Val::String("default".into()));
        let args = vec![
            Val::String(".*".into()),
            Val::String(".*".into()),
            Val::String("matched".into()),
            Val::String("default".into()),
        ];
        assert_eq!(eval(op, &args), Val::String("matched".into()));
    }

    #[test]
    fn test_include_exclude_match() {
        let v = Val::String("error".into());
        assert_eq!(
            eval(ScalarOp::Include, &[v.clone(), Val::String("err.*".into())]),
            v
        );
        assert_eq!(
            eval(ScalarOp::Include, &[v.clone(), Val::String("warn.*".into())]),
            Val::Null
        );
        assert_eq!(
            eval(ScalarOp::Exclude, &[v.clone(), Val::String("err.*".into())]),
            Val::Null
        );
        assert_eq!(
            eval(ScalarOp::Match, &[v.clone(), Val::String("err.*".into())]),
            Val::Boolean(true)
        );
        // Whole-string matching: a partial hit is not a match
        assert_eq!(
            eval(ScalarOp::Match, &[v, Val::String("err".into())]),
            Val::Boolean(false)
        );
    }

    #[test]
    fn test_match_propagates_pattern_errors() {
        // A faulted pattern operand must not be rendered and compiled
        let fault = Val::Error("boom.*".into());
        assert_eq!(
            eval(
                ScalarOp::Match,
                &[Val::String("boom happened".into()), fault.clone()]
            ),
            fault
        );
    }

    #[test]
    fn test_hash() {
        assert_eq!(
            eval(ScalarOp::Hash, &[Val::String("test".into())]),
            Val::String(
                "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08".into()
            )
        );
        // Salt changes the digest
        let salted = eval(
            ScalarOp::Hash,
            &[
                Val::String("test".into()),
                Val::String("SHA-256".into()),
                Val::String("pepper".into()),
            ],
        );
        assert_ne!(
            salted,
            eval(ScalarOp::Hash, &[Val::String("test".into())])
        );
        assert!(eval(
            ScalarOp::Hash,
            &[Val::String("x".into()), Val::String("MD5".into())]
        )
        .is_error());
    }

    #[test]
    fn test_casts() {
        assert_eq!(
            eval(ScalarOp::ToInteger, &[Val::String("42".into())]),
            Val::Integer(42)
        );
        assert_eq!(
            eval(ScalarOp::ToDouble, &[Val::String("2.5".into())]),
            Val::Double(2.5)
        );
        assert_eq!(
            eval(ScalarOp::ToString, &[Val::Double(100.0)]),
            Val::String("100".into())
        );
        let e = eval(ScalarOp::ToLong, &[Val::String("abc".into())]);
        assert_eq!(e, Val::Error("Unable to cast 'abc' to long".into()));
        assert_eq!(eval(ScalarOp::ToInteger, &[Val::Null]), Val::Null);
    }

    #[test]
    fn test_parse_and_format_date_defaults() {
        assert_eq!(
            eval(
                ScalarOp::ParseDate,
                &[Val::String("2010-01-01T23:59:59.000Z".into())]
            ),
            Val::Long(1262390399000)
        );
        assert_eq!(
            eval(ScalarOp::FormatDate, &[Val::Long(1262390399000)]),
            Val::String("2010-01-01T23:59:59.000Z".into())
        );
    }

    #[test]
    fn test_parse_date_with_pattern_and_zone() {
        assert_eq!(
            eval(
                ScalarOp::ParseDate,
                &[
                    Val::String("2014-02-22 00:00:00".into()),
                    Val::String("%Y-%m-%d %H:%M:%S".into()),
                    Val::String("UTC".into())
                ]
            ),
            Val::Long(1393027200000)
        );
        assert!(eval(
            ScalarOp::ParseDate,
            &[
                Val::String("2014-02-22".into()),
                Val::String("%Y-%m-%d %H:%M:%S".into()),
                Val::String("Nowhere/Town".into())
            ]
        )
        .is_error());
    }
}
