//! The math-function table.
//!
//! The rounding family preserves the first argument's units and accepts
//! an optional *step* argument (`round(1.71 m, 5 cm)` rounds to the
//! nearest 5 cm and answers in centimeters). Trigonometric functions
//! honor explicit angle units and fall back to the configured angle
//! setting for bare numbers; their inverses answer in that setting.

use crate::conversion;
use crate::dimension;
use crate::eval::Evaluator;
use crate::options::AngleUnit;
use crate::terms::UnitTerm;
use crate::values::{Numeric, Value};
use crate::{ReckonError, ReckonResult};

/// Dispatches a function call by name.
pub(crate) fn call(ev: &Evaluator, name: &str, args: Vec<Value>) -> ReckonResult<Value> {
    let args: Vec<Value> = args.into_iter().map(Value::unwrap_presentation).collect();
    match name {
        "round" => step_function(ev, name, args, f64::round),
        "floor" => step_function(ev, name, args, f64::floor),
        "ceil" => step_function(ev, name, args, f64::ceil),
        "trunc" => step_function(ev, name, args, f64::trunc),
        "abs" => step_function(ev, name, args, f64::abs),
        "frac" => step_function(ev, name, args, |x| x - x.trunc()),
        "sqrt" => root(ev, name, args, 0.5),
        "cbrt" => root(ev, name, args, 1.0 / 3.0),
        "ln" => logarithm(name, args, f64::ln),
        "log" | "log10" => logarithm(name, args, f64::log10),
        "log2" => logarithm(name, args, f64::log2),
        "exp" => {
            let n = single_dimensionless(name, args)?;
            Ok(Value::num(n.exp()))
        }
        "sin" => trig(ev, name, args, f64::sin),
        "cos" => trig(ev, name, args, f64::cos),
        "tan" => trig(ev, name, args, f64::tan),
        "asin" => inverse_trig(ev, name, args, f64::asin, true),
        "acos" => inverse_trig(ev, name, args, f64::acos, true),
        "atan" => inverse_trig(ev, name, args, f64::atan, false),
        "min" => extremum(ev, name, args, false),
        "max" => extremum(ev, name, args, true),
        _ => Err(ReckonError::unknown_function()
            .with_message(format!("'{name}' is not a known function"))),
    }
}

fn arity(name: &str, expected: &str, got: usize) -> ReckonError {
    ReckonError::arity_mismatch()
        .with_message(format!("{name} expects {expected} argument(s), got {got}"))
}

// ==== Unit-preserving rounding family ====

fn step_function(
    ev: &Evaluator,
    name: &str,
    mut args: Vec<Value>,
    f: fn(f64) -> f64,
) -> ReckonResult<Value> {
    let step = match args.len() {
        1 => None,
        2 => Some(args.pop().ok_or_else(ReckonError::assert)?),
        got => return Err(arity(name, "1 or 2", got)),
    };
    let subject = args.pop().ok_or_else(ReckonError::assert)?;

    match subject {
        Value::Duration(d) => {
            if step.is_some() {
                return Err(ReckonError::domain()
                    .with_message("a rounding step is not supported for durations"));
            }
            // Field-wise application keeps calendar semantics.
            Ok(Value::Duration(d.map_fields(f)))
        }
        Value::Number(n) => apply_step(ev, n, step, f).map(Value::Number),
        Value::Composite(c) => {
            // Flatten, operate, then re-composite into the source units.
            let units: Vec<UnitTerm> = c
                .components
                .iter()
                .map(|component| UnitTerm::simple(component.unit.clone()))
                .collect();
            let flat = conversion::flatten_value(ev, Value::Composite(c))?;
            let rounded = apply_step(ev, flat, step, f)?;
            conversion::convert(
                ev,
                Value::Number(rounded),
                &crate::ast::ConversionTarget::Units(
                    units
                        .iter()
                        .map(|t| crate::ast::UnitTermNode {
                            unit: crate::ast::UnitExprNode::Named(t.unit.id.clone()),
                            exponent: t.exponent,
                        })
                        .collect(),
                ),
            )
        }
        other => Err(ReckonError::domain()
            .with_message(format!("{name} expects a number, got {}", other.kind_name()))),
    }
}

fn apply_step(
    ev: &Evaluator,
    subject: Numeric,
    step: Option<Value>,
    f: fn(f64) -> f64,
) -> ReckonResult<Numeric> {
    let variant = ev.config.variant;
    let Some(step) = step else {
        let value = f(subject.value);
        return Ok(subject.with_value(value));
    };
    let Value::Number(step) = step else {
        return Err(ReckonError::domain()
            .with_message(format!("a rounding step must be a number, got {}", step.kind_name())));
    };
    if step.value == 0.0 {
        return Err(ReckonError::division_by_zero().with_message("a rounding step cannot be zero"));
    }

    if step.is_dimensionless() {
        let value = f(subject.value / step.value) * step.value;
        return Ok(subject.with_value(value));
    }

    // A united step pulls the subject into the step's unit; the answer
    // stays there.
    if !dimension::compatible(&ev.registry, &subject.terms, &step.terms)? {
        return Err(ReckonError::dimension_mismatch()
            .with_message("the rounding step must share the value's dimension"));
    }
    let step_factor = conversion::terms_factor(&step.terms, variant);
    let subject_in_step = conversion::numeric_base_value(&subject, variant) / step_factor;
    let value = f(subject_in_step / step.value) * step.value;
    Ok(Numeric::num_terms(value, step.terms.clone()))
}

// ==== Roots and logarithms ====

fn root(ev: &Evaluator, name: &str, args: Vec<Value>, exponent: f64) -> ReckonResult<Value> {
    let [arg] = <[Value; 1]>::try_from(args).map_err(|a| arity(name, "1", a.len()))?;
    let n = conversion::flatten_value(ev, arg)?;
    if n.is_dimensionless() && n.value < 0.0 {
        return Err(ReckonError::domain()
            .with_message(format!("{name} of a negative number has no real value")));
    }
    crate::arithmetic::power(ev, &n, &Numeric::num(exponent)).map(Value::Number)
}

fn logarithm(name: &str, args: Vec<Value>, f: fn(f64) -> f64) -> ReckonResult<Value> {
    let n = single_dimensionless(name, args)?;
    if n <= 0.0 {
        return Err(ReckonError::domain()
            .with_message(format!("{name} is only defined for positive numbers")));
    }
    Ok(Value::num(f(n)))
}

fn single_dimensionless(name: &str, args: Vec<Value>) -> ReckonResult<f64> {
    let [arg] = <[Value; 1]>::try_from(args).map_err(|a| arity(name, "1", a.len()))?;
    match arg {
        Value::Number(n) if n.is_dimensionless() => Ok(n.value),
        Value::Number(_) => Err(ReckonError::dimension_mismatch()
            .with_message(format!("{name} expects a dimensionless number"))),
        other => Err(ReckonError::domain()
            .with_message(format!("{name} expects a number, got {}", other.kind_name()))),
    }
}

// ==== Trigonometry ====

fn trig(ev: &Evaluator, name: &str, args: Vec<Value>, f: fn(f64) -> f64) -> ReckonResult<Value> {
    let [arg] = <[Value; 1]>::try_from(args).map_err(|a| arity(name, "1", a.len()))?;
    let Value::Number(n) = arg else {
        return Err(ReckonError::domain()
            .with_message(format!("{name} expects a number, got {}", arg.kind_name())));
    };
    let radians = if n.is_dimensionless() {
        match ev.config.angle_unit {
            AngleUnit::Degree => n.value.to_radians(),
            AngleUnit::Radian => n.value,
        }
    } else if let Some(unit) = n.simple_unit().filter(|u| u.dimension == "angle") {
        unit.to_base(n.value, ev.config.variant)
    } else {
        return Err(ReckonError::dimension_mismatch()
            .with_message(format!("{name} expects an angle or a bare number")));
    };
    Ok(Value::num(f(radians)))
}

fn inverse_trig(
    ev: &Evaluator,
    name: &str,
    args: Vec<Value>,
    f: fn(f64) -> f64,
    bounded: bool,
) -> ReckonResult<Value> {
    let x = single_dimensionless(name, args)?;
    if bounded && !(-1.0..=1.0).contains(&x) {
        return Err(ReckonError::domain()
            .with_message(format!("{name} is only defined on [-1, 1]")));
    }
    let radians = f(x);
    let (unit_id, value) = match ev.config.angle_unit {
        AngleUnit::Degree => ("degree", radians.to_degrees()),
        AngleUnit::Radian => ("radian", radians),
    };
    let unit = ev
        .registry
        .unit_by_id(unit_id)
        .ok_or_else(ReckonError::assert)?;
    Ok(Value::Number(Numeric::num_unit(value, unit)))
}

// ==== Extrema ====

fn extremum(ev: &Evaluator, name: &str, args: Vec<Value>, want_max: bool) -> ReckonResult<Value> {
    if args.is_empty() {
        return Err(arity(name, "at least 1", 0));
    }
    let variant = ev.config.variant;
    let mut iter = args.into_iter();
    let first = conversion::flatten_value(ev, iter.next().ok_or_else(ReckonError::assert)?)?;
    let mut best_base = conversion::numeric_base_value(&first, variant);
    let anchor = first.clone();

    for arg in iter {
        let candidate = conversion::flatten_value(ev, arg)?;
        if !dimension::compatible(&ev.registry, &anchor.terms, &candidate.terms)? {
            return Err(ReckonError::dimension_mismatch()
                .with_message(format!("{name} arguments must share a dimension")));
        }
        let base = conversion::numeric_base_value(&candidate, variant);
        if (want_max && base > best_base) || (!want_max && base < best_base) {
            best_base = base;
        }
    }

    // The winner answers in the first argument's unit.
    let value = if let Some(unit) = anchor.simple_unit() {
        unit.from_base(best_base, variant)
    } else if anchor.is_dimensionless() {
        best_base
    } else {
        best_base / conversion::terms_factor(&anchor.terms, variant)
    };
    Ok(Value::Number(Numeric::num_terms(value, anchor.terms)))
}
