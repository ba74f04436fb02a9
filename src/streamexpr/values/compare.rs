//! Equality, ordering, and sort comparison over [`Val`].
//!
//! Three distinct rules live here and deliberately do not share behaviour:
//! - [`equals`] backs the `=` operator: typed equality within a variant,
//!   string equality across variants, two nulls are equal.
//! - [`compare_values`] backs the ordering operators (`<`, `<=`, `>`, `>=`):
//!   numeric when both sides coerce to double, otherwise case-sensitive
//!   string comparison; absent values cannot be ordered.
//! - [`sort_compare`] is the total comparator used to order result columns:
//!   absent values sort first and string comparison is case-insensitive.

use super::Val;
use std::cmp::Ordering;

/// Equality rule for the `=` operator. Returns a boolean `Val`, or an
/// `Error` when one side is absent and the other is not.
pub fn equals(a: &Val, b: &Val) -> Val {
    if a.is_null() && b.is_null() {
        return Val::Boolean(true);
    }
    if !a.has_value() || !b.has_value() {
        return Val::Error("Unable to compare absent value".to_string());
    }
    let eq = match (a, b) {
        (Val::Boolean(x), Val::Boolean(y)) => x == y,
        (Val::Integer(x), Val::Integer(y)) => x == y,
        (Val::Long(x), Val::Long(y)) => x == y,
        (Val::Double(x), Val::Double(y)) => x == y,
        (Val::String(x), Val::String(y)) => x == y,
        _ => a.to_string() == b.to_string(),
    };
    Val::Boolean(eq)
}

/// Ordering rule for the comparison operators. `None` when either side is
/// absent. Numbers (and anything coercible to double, including booleans and
/// numeric strings) compare numerically; everything else compares by its
/// rendered string, case-sensitively.
pub fn compare_values(a: &Val, b: &Val) -> Option<Ordering> {
    if !a.has_value() || !b.has_value() {
        return None;
    }
    if let (Some(x), Some(y)) = (a.to_double(), b.to_double()) {
        return x.partial_cmp(&y);
    }
    Some(a.to_string().cmp(&b.to_string()))
}

/// Total comparator for sorting result values. Absent values (null or error)
/// sort before present ones; strings compare case-insensitively.
pub fn sort_compare(a: &Val, b: &Val) -> Ordering {
    match (a.has_value(), b.has_value()) {
        (false, false) => Ordering::Equal,
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => {
            if let (Some(x), Some(y)) = (a.to_double(), b.to_double()) {
                x.partial_cmp(&y).unwrap_or(Ordering::Equal)
            } else {
                let x = a.to_string();
                let y = b.to_string();
                x.to_lowercase().cmp(&y.to_lowercase())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equals_same_type() {
        assert_eq!(
            equals(&Val::Integer(5), &Val::Integer(5)),
            Val::Boolean(true)
        );
        assert_eq!(
            equals(&Val::Double(1.5), &Val::Double(1.6)),
            Val::Boolean(false)
        );
        assert_eq!(
            equals(&Val::String("a".into()), &Val::String("A".into())),
            Val::Boolean(false)
        );
    }

    #[test]
    fn test_equals_cross_type_via_string() {
        // 5 renders as "5" in both cases
        assert_eq!(equals(&Val::Integer(5), &Val::Long(5)), Val::Boolean(true));
        assert_eq!(
            equals(&Val::Double(50.0), &Val::String("50".into())),
            Val::Boolean(true)
        );
    }

    #[test]
    fn test_equals_nulls() {
        assert_eq!(equals(&Val::Null, &Val::Null), Val::Boolean(true));
        assert!(equals(&Val::Null, &Val::Integer(1)).is_error());
        assert!(equals(&Val::Error("x".into()), &Val::Integer(1)).is_error());
    }

    #[test]
    fn test_compare_numeric() {
        assert_eq!(
            compare_values(&Val::Integer(2), &Val::Double(2.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            compare_values(&Val::String("10".into()), &Val::Integer(9)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_compare_string_case_sensitive() {
        // 'Z' (0x5A) sorts before 'a' (0x61) in a case-sensitive compare
        assert_eq!(
            compare_values(&Val::String("Z".into()), &Val::String("a".into())),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_compare_absent() {
        assert_eq!(compare_values(&Val::Null, &Val::Integer(1)), None);
        assert_eq!(compare_values(&Val::Error("e".into()), &Val::Null), None);
    }

    #[test]
    fn test_sort_compare() {
        assert_eq!(sort_compare(&Val::Null, &Val::Integer(1)), Ordering::Less);
        assert_eq!(sort_compare(&Val::Null, &Val::Null), Ordering::Equal);
        assert_eq!(
            sort_compare(&Val::Integer(3), &Val::Integer(2)),
            Ordering::Greater
        );
        // Case-insensitive for sorting
        assert_eq!(
            sort_compare(&Val::String("apple".into()), &Val::String("APPLE".into())),
            Ordering::Equal
        );
        assert_eq!(
            sort_compare(&Val::String("Zebra".into()), &Val::String("apple".into())),
            Ordering::Greater
        );
    }

    #[test]
    fn test_sort_is_consistent_for_mixed_lists() {
        let mut vals = vec![
            Val::String("banana".into()),
            Val::Null,
            Val::Integer(3),
            Val::Double(1.5),
        ];
        vals.sort_by(sort_compare);
        assert_eq!(vals[0], Val::Null);
        assert_eq!(vals[1], Val::Double(1.5));
        assert_eq!(vals[2], Val::Integer(3));
        assert_eq!(vals[3], Val::String("banana".into()));
    }
}
