//! Comparisons and boolean logic.
//!
//! Comparison operands normalize to a common form first: numbers meet in
//! their base expansion (so `5 m > 300 cm` compares 5 to 3), temporal
//! values meet on the timeline or on a plain datetime, and durations
//! meet on their conventional millisecond totals. Incomparable operands
//! are a typed error, never a silent `false`.

use std::cmp::Ordering;

use crate::ast::BinaryOp;
use crate::conversion;
use crate::dimension;
use crate::eval::Evaluator;
use crate::temporal::{duration_from_composite, duration_from_numeric};
use crate::values::Value;
use crate::{ReckonError, ReckonResult};

/// Coerces a value to a boolean: booleans pass through, the number zero
/// is false and every other number true, everything else errors.
pub(crate) fn truthiness(value: &Value) -> ReckonResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => Ok(n.value != 0.0),
        other => Err(ReckonError::conversion_incompatible()
            .with_message(format!("{} is not a boolean", other.kind_name()))),
    }
}

/// Evaluates a comparison or logical operator.
pub(crate) fn compare(
    ev: &Evaluator,
    operator: BinaryOp,
    lhs: Value,
    rhs: Value,
) -> ReckonResult<Value> {
    match operator {
        BinaryOp::And => Ok(Value::Bool(truthiness(&lhs)? && truthiness(&rhs)?)),
        BinaryOp::Or => Ok(Value::Bool(truthiness(&lhs)? || truthiness(&rhs)?)),
        _ => {
            // Booleans are equatable but carry no order.
            if let (Value::Bool(a), Value::Bool(b)) = (&lhs, &rhs) {
                return match operator {
                    BinaryOp::Equal => Ok(Value::Bool(a == b)),
                    BinaryOp::NotEqual => Ok(Value::Bool(a != b)),
                    _ => Err(ReckonError::conversion_incompatible()
                        .with_message("booleans are not ordered")),
                };
            }
            let ordering = ordering_of(ev, lhs, rhs)?;
            Ok(Value::Bool(match operator {
                BinaryOp::Equal => ordering == Ordering::Equal,
                BinaryOp::NotEqual => ordering != Ordering::Equal,
                BinaryOp::Less => ordering == Ordering::Less,
                BinaryOp::LessEq => ordering != Ordering::Greater,
                BinaryOp::Greater => ordering == Ordering::Greater,
                BinaryOp::GreaterEq => ordering != Ordering::Less,
                _ => {
                    return Err(
                        ReckonError::assert().with_message("non-comparison operator in compare")
                    )
                }
            }))
        }
    }
}

fn ordering_of(ev: &Evaluator, lhs: Value, rhs: Value) -> ReckonResult<Ordering> {
    // Durations attract time-dimensioned numbers and clock composites,
    // mirroring the arithmetic coercion.
    let lhs = coerce_for_comparison(ev, lhs, &rhs);
    let rhs = coerce_for_comparison(ev, rhs, &lhs);

    match (&lhs, &rhs) {
        (Value::Duration(a), Value::Duration(b)) => {
            Ok(total_cmp(a.total_milliseconds(), b.total_milliseconds()))
        }
        (Value::Number(_) | Value::Composite(_), Value::Number(_) | Value::Composite(_)) => {
            let left = conversion::flatten_value(ev, lhs.clone())?;
            let right = conversion::flatten_value(ev, rhs.clone())?;
            if !(left.is_dimensionless() && right.is_dimensionless())
                && !dimension::compatible(&ev.registry, &left.terms, &right.terms)?
            {
                return Err(ReckonError::dimension_mismatch().with_message(
                    "cannot compare values with incompatible dimensions",
                ));
            }
            let variant = ev.config.variant;
            let left_base = conversion::numeric_base_value(&left, variant);
            let right_base = conversion::numeric_base_value(&right, variant);
            Ok(total_cmp(left_base, right_base))
        }
        _ if lhs.is_datetime() && rhs.is_datetime() => {
            if matches!(lhs, Value::Duration(_)) || matches!(rhs, Value::Duration(_)) {
                return Err(ReckonError::dimension_mismatch()
                    .with_message("cannot compare a duration with a point in time"));
            }
            let engine = ev.temporal();
            if matches!(lhs, Value::Instant(_) | Value::Zoned(_))
                || matches!(rhs, Value::Instant(_) | Value::Zoned(_))
            {
                let left = engine.to_instant(&lhs)?;
                let right = engine.to_instant(&rhs)?;
                Ok(left.cmp(&right))
            } else {
                let left = engine.to_plain_datetime(&lhs)?;
                let right = engine.to_plain_datetime(&rhs)?;
                Ok(left.cmp(&right))
            }
        }
        _ => Err(ReckonError::dimension_mismatch().with_message(format!(
            "cannot compare {} with {}",
            lhs.kind_name(),
            rhs.kind_name()
        ))),
    }
}

fn coerce_for_comparison(ev: &Evaluator, value: Value, other: &Value) -> Value {
    if !matches!(other, Value::Duration(_)) {
        return value;
    }
    match &value {
        Value::Number(n) => {
            duration_from_numeric(n, ev.config.variant).map_or(value, Value::Duration)
        }
        Value::Composite(c) => {
            duration_from_composite(c, ev.config.variant).map_or(value, Value::Duration)
        }
        _ => value,
    }
}

#[inline]
fn total_cmp(a: f64, b: f64) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::FixedHooks;
    use crate::options::EvaluatorConfig;
    use crate::registry::{ExchangeRates, UnitRegistry};
    use crate::values::{CalendarDuration, DurationField, Numeric};
    use chrono_tz::Tz;
    use std::sync::Arc;

    fn evaluator() -> Evaluator {
        Evaluator::new(
            Arc::new(UnitRegistry::builtin()),
            Arc::new(ExchangeRates::new()),
            EvaluatorConfig::default(),
            Box::new(FixedHooks {
                epoch_ms: 1_705_320_000_000,
                tz: Tz::UTC,
            }),
        )
    }

    fn simple(ev: &Evaluator, value: f64, id: &str) -> Value {
        Value::Number(Numeric::num_unit(
            value,
            ev.registry.unit_by_id(id).expect("unit"),
        ))
    }

    #[test]
    fn numbers_compare_in_their_base_expansion() {
        let ev = evaluator();
        let result = compare(
            &ev,
            crate::ast::BinaryOp::Greater,
            simple(&ev, 5.0, "meter"),
            simple(&ev, 300.0, "centimeter"),
        )
        .expect("compare");
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn durations_attract_time_numbers() {
        let ev = evaluator();
        let ninety = Value::Duration(CalendarDuration::from_field(DurationField::Minutes, 90.0));
        let result = compare(
            &ev,
            crate::ast::BinaryOp::Equal,
            ninety,
            simple(&ev, 1.5, "hour"),
        )
        .expect("compare");
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn plain_temporal_values_order_on_the_wall_clock() {
        let ev = evaluator();
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
        let later = date.and_hms_opt(5, 0, 0).expect("datetime");
        let result = compare(
            &ev,
            crate::ast::BinaryOp::Less,
            Value::Date(date),
            Value::DateTime(later),
        )
        .expect("compare");
        assert_eq!(result, Value::Bool(true));
    }

    #[test]
    fn booleans_equal_but_never_order() {
        let ev = evaluator();
        let eq = compare(
            &ev,
            crate::ast::BinaryOp::Equal,
            Value::Bool(true),
            Value::Bool(true),
        )
        .expect("compare");
        assert_eq!(eq, Value::Bool(true));
        let ne = compare(
            &ev,
            crate::ast::BinaryOp::Equal,
            Value::Bool(true),
            Value::Bool(false),
        )
        .expect("compare");
        assert_eq!(ne, Value::Bool(false));
        let err = compare(
            &ev,
            crate::ast::BinaryOp::Less,
            Value::Bool(false),
            Value::Bool(true),
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ConversionIncompatible);
    }

    #[test]
    fn incompatible_dimensions_do_not_compare() {
        let ev = evaluator();
        let err = compare(
            &ev,
            crate::ast::BinaryOp::Equal,
            simple(&ev, 1.0, "meter"),
            simple(&ev, 1.0, "kilogram"),
        )
        .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::DimensionMismatch);
    }
}
