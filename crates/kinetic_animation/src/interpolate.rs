//! Type-directed interpolation between two [`Value`]s
//!
//! An interpolator maps eased progress `t` in `[0, 1]` to a value between
//! `from` (t = 0) and `to` (t = 1). The default factory walks both values
//! together, so building an interpolator is also the shape check: kind
//! mismatches and null operands are rejected before anything animates.

use crate::error::{AnimationError, Result};
use crate::value::{Value, ValueKind};
use indexmap::IndexMap;
use std::rc::Rc;

/// Maps eased progress to an intermediate value
pub type Interpolator = Box<dyn Fn(f64) -> Value>;

/// Builds an interpolator from a `(from, to)` pair
pub type InterpolatorFactory = Rc<dyn Fn(&Value, &Value) -> Result<Interpolator>>;

/// The factory used by tweens unless one is supplied
pub fn default_factory() -> InterpolatorFactory {
    Rc::new(default_interpolator)
}

/// Interpolate numbers, dates, arrays and records.
///
/// - equal operands (or a NaN start) interpolate to a constant
/// - arrays follow the target's length, records the target's keys
/// - a null operand facing null, a record or a date is [`AnimationError::NullOperand`]
/// - any other pairing of different kinds is [`AnimationError::KindMismatch`]
/// - booleans and strings are [`AnimationError::Unsupported`]
pub fn default_interpolator(from: &Value, to: &Value) -> Result<Interpolator> {
    if from.is_null() || to.is_null() {
        return Err(null_error(from, to));
    }

    if from == to || matches!(from, Value::Number(n) if n.is_nan()) {
        let constant = from.clone();
        return Ok(Box::new(move |_| constant.clone()));
    }

    match (from, to) {
        (Value::Number(a), Value::Number(b)) => {
            let (a, delta) = (*a, b - a);
            Ok(Box::new(move |t| Value::Number(a + t * delta)))
        }
        (Value::Date(a), Value::Date(b)) => {
            let (a, delta) = (*a, b - a);
            Ok(Box::new(move |t| Value::Date(a + t * delta)))
        }
        (Value::Array(a), Value::Array(b)) => {
            let parts = b
                .iter()
                .enumerate()
                .map(|(i, target)| match a.get(i) {
                    Some(start) => default_interpolator(start, target),
                    None => Err(AnimationError::ShapeMismatch {
                        detail: format!("array of {} elements cannot reach index {i}", a.len()),
                    }),
                })
                .collect::<Result<Vec<_>>>()?;
            Ok(Box::new(move |t| {
                Value::Array(parts.iter().map(|part| part(t)).collect())
            }))
        }
        (Value::Record(a), Value::Record(b)) => {
            let mut fields = IndexMap::with_capacity(b.len());
            for (key, target) in b {
                let start = a.get(key).ok_or_else(|| AnimationError::ShapeMismatch {
                    detail: format!("record has no field `{key}`"),
                })?;
                fields.insert(key.clone(), default_interpolator(start, target)?);
            }
            Ok(Box::new(move |t| {
                Value::Record(
                    fields
                        .iter()
                        .map(|(key, part)| (key.clone(), part(t)))
                        .collect(),
                )
            }))
        }
        (a, b) if a.kind() != b.kind() => Err(AnimationError::KindMismatch {
            from: a.kind(),
            to: b.kind(),
        }),
        (a, _) => Err(AnimationError::Unsupported { kind: a.kind() }),
    }
}

fn null_error(from: &Value, to: &Value) -> AnimationError {
    let other = if from.is_null() { to } else { from };
    match other.kind() {
        ValueKind::Null | ValueKind::Record | ValueKind::Date => AnimationError::NullOperand,
        kind => {
            let null = ValueKind::Null;
            if from.is_null() {
                AnimationError::KindMismatch { from: null, to: kind }
            } else {
                AnimationError::KindMismatch { from: kind, to: null }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(from: impl Into<Value>, to: impl Into<Value>, t: f64) -> Value {
        match default_interpolator(&from.into(), &to.into()) {
            Ok(f) => f(t),
            Err(err) => panic!("interpolator failed: {err}"),
        }
    }

    #[test]
    fn test_numbers() {
        assert_eq!(at(0.0, 100.0, 0.25), Value::Number(25.0));
        assert_eq!(at(10.0, -10.0, 1.0), Value::Number(-10.0));
    }

    #[test]
    fn test_equal_operands_are_constant() {
        assert_eq!(at(3.0, 3.0, 0.7), Value::Number(3.0));
        assert_eq!(at(true, true, 0.5), Value::Bool(true));
    }

    #[test]
    fn test_nan_start_is_constant() {
        let v = at(f64::NAN, 5.0, 0.5);
        assert!(v.as_number().is_some_and(f64::is_nan));
    }

    #[test]
    fn test_dates() {
        assert_eq!(at(Value::Date(1000.0), Value::Date(2000.0), 0.5), Value::Date(1500.0));
    }

    #[test]
    fn test_arrays_follow_target_length() {
        assert_eq!(
            at(vec![0.0, 10.0, 99.0], vec![10.0, 20.0], 0.5),
            Value::from(vec![5.0, 15.0])
        );
    }

    #[test]
    fn test_records_follow_target_keys() {
        let from = Value::record([("x", 0.0), ("y", 0.0), ("z", 1.0)]);
        let to = Value::record([("x", 10.0), ("y", -10.0)]);
        assert_eq!(at(from, to, 0.5), Value::record([("x", 5.0), ("y", -5.0)]));
    }

    #[test]
    fn test_nested_shapes() {
        let from = Value::record([("pos", Value::from(vec![0.0, 0.0]))]);
        let to = Value::record([("pos", Value::from(vec![2.0, 4.0]))]);
        assert_eq!(
            at(from, to, 0.5),
            Value::record([("pos", Value::from(vec![1.0, 2.0]))])
        );
    }

    #[test]
    fn test_kind_mismatch() {
        let err = default_interpolator(&Value::from(1.0), &Value::from(vec![1.0])).err();
        assert_eq!(
            err,
            Some(AnimationError::KindMismatch {
                from: ValueKind::Number,
                to: ValueKind::Array
            })
        );
    }

    #[test]
    fn test_null_operands() {
        let record = Value::record([("x", 1.0)]);
        assert_eq!(
            default_interpolator(&Value::Null, &Value::Null).err(),
            Some(AnimationError::NullOperand)
        );
        assert_eq!(
            default_interpolator(&record, &Value::Null).err(),
            Some(AnimationError::NullOperand)
        );
        assert_eq!(
            default_interpolator(&Value::Null, &Value::from(2.0)).err(),
            Some(AnimationError::KindMismatch {
                from: ValueKind::Null,
                to: ValueKind::Number
            })
        );
    }

    #[test]
    fn test_unsupported_kinds() {
        assert_eq!(
            default_interpolator(&Value::from("a"), &Value::from("b")).err(),
            Some(AnimationError::Unsupported {
                kind: ValueKind::Text
            })
        );
    }

    #[test]
    fn test_missing_record_field() {
        let from = Value::record([("x", 1.0)]);
        let to = Value::record([("y", 1.0)]);
        assert!(matches!(
            default_interpolator(&from, &to),
            Err(AnimationError::ShapeMismatch { .. })
        ));
    }
}
