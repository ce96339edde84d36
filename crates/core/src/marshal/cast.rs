//! Loss-free scalar casts
//!
//! A cast is accepted only when the original value can be re-derived from
//! the result. The accepted sources per target are:
//!
//! | target | accepted sources |
//! |--------|------------------|
//! | int    | int; integral finite float in range; integer or integral numeric text; bool |
//! | float  | float; int with magnitude ≤ 2^53; finite numeric text; bool |
//! | string | string; int; finite float |
//! | bool   | bool; int 0/1; float 0.0/1.0; text `0`, `1`, `true`, `false` |
//! | null   | null; `""`; `0`; `0.0`; `false` |
//!
//! Text is trimmed before parsing and matched case-insensitively. Null is
//! never cast to anything but null. Anything else is rejected and the caller
//! keeps the uncast value.

use crate::value::Value;

use super::declared::ScalarKind;

/// Largest integer magnitude a float represents exactly
const F64_EXACT_INT: u64 = 1 << 53;

/// Attempt a loss-free cast of a scalar
///
/// Returns `None` when the cast would lose information or the value is not
/// a scalar.
pub fn cast_scalar(value: &Value, target: ScalarKind) -> Option<Value> {
    match target {
        ScalarKind::Int => to_int(value).map(Value::Int),
        ScalarKind::Float => to_float(value).map(Value::Float),
        ScalarKind::String => to_string(value).map(Value::String),
        ScalarKind::Bool => to_bool(value).map(Value::Bool),
        ScalarKind::Null => is_empty_scalar(value).then_some(Value::Null),
    }
}

fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Float(f) => integral(*f),
        Value::String(s) => {
            let text = s.trim();
            text.parse::<i64>()
                .ok()
                .or_else(|| numeric(text).and_then(integral))
        }
        Value::Bool(b) => Some(*b as i64),
        _ => None,
    }
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        Value::Int(i) if i.unsigned_abs() <= F64_EXACT_INT => Some(*i as f64),
        Value::String(s) => numeric(s.trim()),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

fn to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) if f.is_finite() => Some(f.to_string()),
        _ => None,
    }
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Int(0) => Some(false),
        Value::Int(1) => Some(true),
        Value::Float(f) if *f == 0.0 => Some(false),
        Value::Float(f) if *f == 1.0 => Some(true),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "0" | "false" => Some(false),
            "1" | "true" => Some(true),
            _ => None,
        },
        _ => None,
    }
}

fn is_empty_scalar(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Int(i) => *i == 0,
        Value::Float(f) => *f == 0.0,
        Value::Bool(b) => !b,
        _ => false,
    }
}

/// Parse numeric text into a finite float
///
/// Rejects the special spellings (`inf`, `nan`) that `f64::from_str` accepts.
fn numeric(text: &str) -> Option<f64> {
    if text.is_empty()
        || !text
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.' | 'e' | 'E'))
    {
        return None;
    }
    text.parse::<f64>().ok().filter(|f| f.is_finite())
}

/// Integer value of an integral, in-range float
fn integral(f: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: impl Into<Value>) -> Option<Value> {
        cast_scalar(&v.into(), ScalarKind::Int)
    }

    #[test]
    fn test_int_from_text() {
        assert_eq!(int("12"), Some(Value::Int(12)));
        assert_eq!(int(" -7 "), Some(Value::Int(-7)));
        assert_eq!(int("12.0"), Some(Value::Int(12)));
        assert_eq!(int("1e3"), Some(Value::Int(1000)));
        assert_eq!(int("12abc"), None);
        assert_eq!(int("12.5"), None);
        assert_eq!(int(""), None);
        assert_eq!(int("inf"), None);
        assert_eq!(int("NaN"), None);
    }

    #[test]
    fn test_int_from_float_and_bool() {
        assert_eq!(int(3.0), Some(Value::Int(3)));
        assert_eq!(int(3.5), None);
        assert_eq!(int(1e300), None);
        assert_eq!(int(true), Some(Value::Int(1)));
        assert_eq!(cast_scalar(&Value::Null, ScalarKind::Int), None);
    }

    #[test]
    fn test_float_precision_boundary() {
        let exact = Value::Int(1 << 53);
        let lossy = Value::Int((1 << 53) + 1);
        assert_eq!(
            cast_scalar(&exact, ScalarKind::Float),
            Some(Value::Float(9007199254740992.0))
        );
        assert_eq!(cast_scalar(&lossy, ScalarKind::Float), None);
        assert_eq!(
            cast_scalar(&Value::from("0.25"), ScalarKind::Float),
            Some(Value::Float(0.25))
        );
    }

    #[test]
    fn test_string_targets() {
        assert_eq!(
            cast_scalar(&Value::Int(42), ScalarKind::String),
            Some(Value::from("42"))
        );
        assert_eq!(
            cast_scalar(&Value::Float(0.1), ScalarKind::String),
            Some(Value::from("0.1"))
        );
        assert_eq!(cast_scalar(&Value::Bool(true), ScalarKind::String), None);
        assert_eq!(cast_scalar(&Value::Null, ScalarKind::String), None);
    }

    #[test]
    fn test_bool_targets() {
        let b = |v: Value| cast_scalar(&v, ScalarKind::Bool);
        assert_eq!(b(Value::Int(1)), Some(Value::Bool(true)));
        assert_eq!(b(Value::Int(2)), None);
        assert_eq!(b(Value::from("TRUE")), Some(Value::Bool(true)));
        assert_eq!(b(Value::from("0")), Some(Value::Bool(false)));
        assert_eq!(b(Value::from("yes")), None);
        assert_eq!(b(Value::from("")), None);
    }

    #[test]
    fn test_null_target() {
        let n = |v: Value| cast_scalar(&v, ScalarKind::Null);
        assert_eq!(n(Value::from("")), Some(Value::Null));
        assert_eq!(n(Value::Int(0)), Some(Value::Null));
        assert_eq!(n(Value::Bool(false)), Some(Value::Null));
        assert_eq!(n(Value::Int(1)), None);
        assert_eq!(n(Value::from("x")), None);
    }
}
