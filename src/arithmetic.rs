//! The binary/unary operator dispatcher.
//!
//! Operators match on operand kinds explicitly; nothing coerces
//! silently. The routing order for a binary operator is:
//!
//! 1. if either side is temporal, coerce a time-dimensioned number or an
//!    all-clock composite on the other side to a duration and take the
//!    temporal table;
//! 2. otherwise flatten composites down to simple numbers;
//! 3. otherwise consult the numeric operator table.

use crate::ast::BinaryOp;
use crate::compare;
use crate::conversion;
use crate::dimension;
use crate::eval::Evaluator;
use crate::temporal::{duration_from_composite, duration_from_numeric, TemporalEngine};
use crate::terms;
use crate::values::{Numeric, Value};
use crate::{ReckonError, ReckonResult};

/// Applies a binary operator.
pub(crate) fn binary(
    ev: &Evaluator,
    operator: BinaryOp,
    lhs: Value,
    rhs: Value,
) -> ReckonResult<Value> {
    let lhs = lhs.unwrap_presentation();
    let rhs = rhs.unwrap_presentation();

    if matches!(
        operator,
        BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::Less
            | BinaryOp::LessEq
            | BinaryOp::Greater
            | BinaryOp::GreaterEq
            | BinaryOp::And
            | BinaryOp::Or
    ) {
        return compare::compare(ev, operator, lhs, rhs);
    }

    if lhs.is_datetime() || rhs.is_datetime() {
        let lhs = coerce_to_duration(ev, lhs);
        let rhs = coerce_to_duration(ev, rhs);
        return temporal_binary(ev, operator, lhs, rhs);
    }

    let lhs = conversion::flatten_value(ev, lhs)?;
    let rhs = conversion::flatten_value(ev, rhs)?;
    numeric_binary(ev, operator, &lhs, &rhs).map(Value::Number)
}

/// Rewrites a value as a duration when the temporal table will need one:
/// a simple time-dimensioned number, or a composite of clock components.
fn coerce_to_duration(ev: &Evaluator, value: Value) -> Value {
    match &value {
        Value::Number(n) => duration_from_numeric(n, ev.config.variant)
            .map_or(value, Value::Duration),
        Value::Composite(c) => duration_from_composite(c, ev.config.variant)
            .map_or(value, Value::Duration),
        _ => value,
    }
}

// ==== Temporal operator table ====

fn temporal_binary(
    ev: &Evaluator,
    operator: BinaryOp,
    lhs: Value,
    rhs: Value,
) -> ReckonResult<Value> {
    let engine = ev.temporal();
    match operator {
        BinaryOp::Add => temporal_add(&engine, &lhs, &rhs),
        BinaryOp::Subtract => temporal_subtract(&engine, &lhs, &rhs),
        BinaryOp::Multiply => temporal_multiply(&lhs, &rhs),
        BinaryOp::Divide | BinaryOp::Per => temporal_divide(&lhs, &rhs),
        _ => Err(ReckonError::dimension_mismatch().with_message(format!(
            "operator is not defined between {} and {}",
            lhs.kind_name(),
            rhs.kind_name()
        ))),
    }
}

fn temporal_add(engine: &TemporalEngine<'_>, lhs: &Value, rhs: &Value) -> ReckonResult<Value> {
    match (lhs, rhs) {
        (Value::Duration(a), Value::Duration(b)) => Ok(Value::Duration(a.added(b))),
        (_, Value::Duration(d)) if lhs.is_datetime() => engine.add_duration(lhs, d),
        // Addition commutes, so `2 days + today` works like `today + 2 days`.
        (Value::Duration(d), _) if rhs.is_datetime() => engine.add_duration(rhs, d),
        _ => Err(ReckonError::dimension_mismatch().with_message(format!(
            "cannot add {} and {}",
            lhs.kind_name(),
            rhs.kind_name()
        ))),
    }
}

fn temporal_subtract(engine: &TemporalEngine<'_>, lhs: &Value, rhs: &Value) -> ReckonResult<Value> {
    match (lhs, rhs) {
        (Value::Duration(a), Value::Duration(b)) => {
            Ok(Value::Duration(a.added(&b.negated())))
        }
        (_, Value::Duration(d)) if lhs.is_datetime() => engine.add_duration(lhs, &d.negated()),
        (Value::Duration(_), _) => Err(ReckonError::dimension_mismatch()
            .with_message(format!("cannot subtract {} from a duration", rhs.kind_name()))),
        _ if lhs.is_datetime() && rhs.is_datetime() => engine
            .subtract_temporal(lhs, rhs)
            .map(Value::Duration),
        _ => Err(ReckonError::dimension_mismatch().with_message(format!(
            "cannot subtract {} from {}",
            rhs.kind_name(),
            lhs.kind_name()
        ))),
    }
}

fn temporal_multiply(lhs: &Value, rhs: &Value) -> ReckonResult<Value> {
    match (lhs, rhs) {
        (Value::Duration(d), Value::Number(n)) | (Value::Number(n), Value::Duration(d))
            if n.is_dimensionless() =>
        {
            Ok(Value::Duration(d.scaled(n.value)))
        }
        _ => Err(ReckonError::dimension_mismatch().with_message(format!(
            "cannot multiply {} by {}",
            lhs.kind_name(),
            rhs.kind_name()
        ))),
    }
}

fn temporal_divide(lhs: &Value, rhs: &Value) -> ReckonResult<Value> {
    match (lhs, rhs) {
        (Value::Duration(a), Value::Duration(b)) => {
            a.ratio(b).map(|ratio| Value::Number(Numeric::num(ratio)))
        }
        (Value::Duration(d), Value::Number(n)) if n.is_dimensionless() => {
            if n.value == 0.0 {
                return Err(ReckonError::division_by_zero());
            }
            Ok(Value::Duration(d.scaled(1.0 / n.value)))
        }
        _ => Err(ReckonError::dimension_mismatch().with_message(format!(
            "cannot divide {} by {}",
            lhs.kind_name(),
            rhs.kind_name()
        ))),
    }
}

// ==== Numeric operator table ====

fn numeric_binary(
    ev: &Evaluator,
    operator: BinaryOp,
    lhs: &Numeric,
    rhs: &Numeric,
) -> ReckonResult<Numeric> {
    match operator {
        BinaryOp::Add => additive(ev, lhs, rhs, 1.0),
        BinaryOp::Subtract => additive(ev, lhs, rhs, -1.0),
        BinaryOp::Multiply => multiplicative(ev, lhs, rhs, false),
        BinaryOp::Divide | BinaryOp::Per => multiplicative(ev, lhs, rhs, true),
        BinaryOp::Modulo => modulo(lhs, rhs),
        BinaryOp::Power => power(ev, lhs, rhs),
        _ => Err(ReckonError::assert().with_message("non-arithmetic operator in numeric table")),
    }
}

fn additive(ev: &Evaluator, lhs: &Numeric, rhs: &Numeric, sign: f64) -> ReckonResult<Numeric> {
    let variant = ev.config.variant;
    if lhs.is_dimensionless() && rhs.is_dimensionless() {
        return Ok(Numeric::num(lhs.value + sign * rhs.value));
    }
    if !dimension::compatible(&ev.registry, &lhs.terms, &rhs.terms)? {
        return Err(incompatible(ev, lhs, rhs));
    }

    // Simple + simple of one dimension converts the right side into the
    // left unit, affine offsets included, and keeps the left unit.
    if let (Some(left_unit), Some(right_unit)) = (lhs.simple_unit(), rhs.simple_unit()) {
        if left_unit.dimension == right_unit.dimension {
            let converted = left_unit.from_base(right_unit.to_base(rhs.value, variant), variant);
            return Ok(Numeric::num_terms(
                lhs.value + sign * converted,
                lhs.terms.clone(),
            ));
        }
    }

    // Derived spellings operate in the base expansion and come back out
    // wearing the left term list.
    let left_factor = conversion::terms_factor(&lhs.terms, variant);
    let right_factor = conversion::terms_factor(&rhs.terms, variant);
    let result_base = lhs.value * left_factor + sign * rhs.value * right_factor;
    Ok(Numeric::num_terms(
        result_base / left_factor,
        lhs.terms.clone(),
    ))
}

fn multiplicative(
    ev: &Evaluator,
    lhs: &Numeric,
    rhs: &Numeric,
    divide: bool,
) -> ReckonResult<Numeric> {
    let variant = ev.config.variant;
    if divide {
        if rhs.value == 0.0 {
            return Err(ReckonError::division_by_zero());
        }
        // Same-dimension simple division is a dimensionless ratio.
        if let (Some(left_unit), Some(right_unit)) = (lhs.simple_unit(), rhs.simple_unit()) {
            if left_unit.dimension == right_unit.dimension {
                let converted =
                    left_unit.from_base(right_unit.to_base(rhs.value, variant), variant);
                if converted == 0.0 {
                    return Err(ReckonError::division_by_zero());
                }
                return Ok(Numeric::num(lhs.value / converted));
            }
        }
    }

    let scalar = if divide {
        lhs.value / rhs.value
    } else {
        lhs.value * rhs.value
    };
    let right_terms = if divide {
        terms::negate(&rhs.terms)
    } else {
        rhs.terms.clone()
    };
    let combined = terms::combine(&lhs.terms, &right_terms);
    let (simplified, multiplier) = terms::simplify(&combined, variant);
    let (reduced, value) = terms::reduce(
        &ev.registry,
        simplified,
        scalar * multiplier,
        &lhs.terms,
        &rhs.terms,
        variant,
    )?;
    Ok(Numeric::num_terms(value, reduced))
}

fn modulo(lhs: &Numeric, rhs: &Numeric) -> ReckonResult<Numeric> {
    if !lhs.is_dimensionless() || !rhs.is_dimensionless() {
        return Err(ReckonError::dimension_mismatch()
            .with_message("modulo is only defined for dimensionless operands"));
    }
    if rhs.value == 0.0 {
        return Err(ReckonError::division_by_zero());
    }
    Ok(Numeric::num(lhs.value % rhs.value))
}

pub(crate) fn power(ev: &Evaluator, lhs: &Numeric, rhs: &Numeric) -> ReckonResult<Numeric> {
    if !rhs.is_dimensionless() {
        return Err(ReckonError::dimension_mismatch()
            .with_message("an exponent must be dimensionless"));
    }
    let exponent = rhs.value;
    if lhs.is_dimensionless() {
        return checked_pow(lhs.value, exponent).map(Numeric::num);
    }

    // Derived units expand to their base spelling first, so `(m²)^½` is
    // `m` and `(1 L)^⅓` lands on a length, not on `L^⅓`.
    let needs_expansion = lhs.terms.iter().any(|t| {
        !t.unit.is_special()
            && ev
                .registry
                .dimension_by_id(&t.unit.dimension)
                .is_some_and(|d| !d.is_base())
    });
    let (base_terms, factor) = if needs_expansion {
        terms::expand_to_base(&ev.registry, &lhs.terms, ev.config.variant)?
    } else {
        (lhs.terms.clone(), 1.0)
    };

    let value = checked_pow(lhs.value * factor, exponent)?;
    let mut scaled: Vec<_> = base_terms
        .iter()
        .map(|t| crate::values::UnitTerm::new(t.unit.clone(), t.exponent * exponent))
        .collect();
    scaled.retain(|t| t.exponent != 0.0);
    Ok(Numeric::num_terms(value, scaled))
}

fn checked_pow(base: f64, exponent: f64) -> ReckonResult<f64> {
    let result = base.powf(exponent);
    if result.is_nan() && !base.is_nan() && !exponent.is_nan() {
        return Err(ReckonError::domain()
            .with_message("cannot raise a negative number to a fractional power"));
    }
    Ok(result)
}

fn incompatible(ev: &Evaluator, lhs: &Numeric, rhs: &Numeric) -> ReckonError {
    let left = dimension::signature_of(&ev.registry, &lhs.terms)
        .map(|s| s.to_string())
        .unwrap_or_else(|_| "unknown".to_owned());
    let right = dimension::signature_of(&ev.registry, &rhs.terms)
        .map(|s| s.to_string())
        .unwrap_or_else(|_| "unknown".to_owned());
    ReckonError::dimension_mismatch().with_message(format!("{left} is not compatible with {right}"))
}

// ==== Unary operators ====

/// Applies a prefix operator.
pub(crate) fn unary(operator: crate::ast::UnaryOp, value: Value) -> ReckonResult<Value> {
    use crate::ast::UnaryOp;

    let value = value.unwrap_presentation();
    match operator {
        UnaryOp::Not => compare::truthiness(&value).map(|b| Value::Bool(!b)),
        UnaryOp::Plus | UnaryOp::Negate => {
            let negate = operator == UnaryOp::Negate;
            match value {
                Value::Number(n) => Ok(Value::Number(if negate {
                    n.with_value(-n.value)
                } else {
                    n
                })),
                Value::Composite(c) => Ok(Value::Composite(if negate { c.negated() } else { c })),
                Value::Duration(d) => Ok(Value::Duration(if negate { d.negated() } else { d })),
                other => Err(ReckonError::dimension_mismatch()
                    .with_message(format!("cannot apply a sign to {}", other.kind_name()))),
            }
        }
    }
}

/// Applies the postfix factorial.
pub(crate) fn factorial(value: Value) -> ReckonResult<Value> {
    let value = value.unwrap_presentation();
    let Value::Number(n) = &value else {
        return Err(ReckonError::domain()
            .with_message(format!("factorial expects a number, got {}", value.kind_name())));
    };
    if !n.is_dimensionless() {
        return Err(ReckonError::dimension_mismatch()
            .with_message("factorial is only defined for dimensionless numbers"));
    }
    if n.value < 0.0 || n.value.fract() != 0.0 {
        return Err(ReckonError::domain()
            .with_message("factorial is only defined for non-negative integers"));
    }
    let mut product = 1.0_f64;
    let mut k = 2.0;
    while k <= n.value && product.is_finite() {
        product *= k;
        k += 1.0;
    }
    // 171! exceeds f64 range and is reported as infinity, not an error.
    if k <= n.value {
        product = f64::INFINITY;
    }
    Ok(Value::Number(Numeric::num(product)))
}
