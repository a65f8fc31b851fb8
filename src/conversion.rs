//! The conversion engine behind `to` expressions.
//!
//! One entry point, four target families:
//!
//! - **unit targets** — simple, composite (`ft in`), and derived
//!   (`kg·m/s²`) conversions, all checked by dimension signature;
//! - **presentation formats** — most wrap the value for the formatter,
//!   a few transform it (`unix`, `decimals N`, `N sig figs`);
//! - **temporal properties** — field extraction, with instants read in
//!   the host zone;
//! - **timezones** — retargeting onto another IANA zone.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Offset, Timelike};

use crate::ast::{ConversionTarget, TemporalProperty};
use crate::dimension;
use crate::eval::Evaluator;
use crate::options::UnitVariant;
use crate::rounding;
use crate::terms::UnitTerm;
use crate::values::{
    CalendarDuration, CompositeComponent, CompositeValue, Numeric, Precision, PrecisionMode,
    PresentationFormat, Value,
};
use crate::{ReckonError, ReckonResult};

/// Converts `value` into the requested target.
pub(crate) fn convert(
    ev: &Evaluator,
    value: Value,
    target: &ConversionTarget,
) -> ReckonResult<Value> {
    match target {
        ConversionTarget::Value => Ok(value.unwrap_presentation()),
        ConversionTarget::Units(nodes) => {
            let value = value.unwrap_presentation();
            let terms = ev.resolve_unit_terms(nodes)?;
            convert_to_units(ev, value, terms)
        }
        ConversionTarget::Format(format) => {
            let value = value.unwrap_presentation();
            convert_to_format(ev, value, *format)
        }
        ConversionTarget::Property(property) => {
            let value = value.unwrap_presentation();
            extract_property(ev, &value, *property)
        }
        ConversionTarget::Timezone(name) => {
            let value = value.unwrap_presentation();
            if !value.is_datetime() || matches!(value, Value::Duration(_)) {
                return Err(ReckonError::conversion_incompatible().with_message(format!(
                    "cannot move {} into a timezone",
                    value.kind_name()
                )));
            }
            let tz = ev.registry.timezone_resolve(name)?;
            let instant = ev.temporal().to_instant(&value)?;
            Ok(Value::Zoned(instant.to_zoned(tz)?))
        }
    }
}

// ==== Unit targets ====

fn convert_to_units(ev: &Evaluator, value: Value, targets: Vec<UnitTerm>) -> ReckonResult<Value> {
    // Durations materialize as plain measurements first, so `to hours`
    // works uniformly on `90 min` and on date differences.
    let value = match value {
        Value::Duration(d) => d.into_value(&ev.registry)?,
        other => other,
    };
    let source = match value {
        Value::Number(n) => SourceQuantity::Number(n),
        Value::Composite(c) => SourceQuantity::Composite(c),
        other => {
            return Err(ReckonError::conversion_incompatible().with_message(format!(
                "cannot convert {} to a unit",
                other.kind_name()
            )))
        }
    };

    let all_simple = targets.iter().all(|t| t.exponent == 1.0);
    if targets.len() == 1 && all_simple {
        let unit = targets.into_iter().next().map(|t| t.unit);
        let Some(unit) = unit else {
            return Err(ReckonError::assert());
        };
        return convert_to_simple(ev, &source, &unit).map(Value::Number);
    }
    if targets.len() > 1 && all_simple && shares_source_dimension(&source, &targets) {
        return convert_to_composite(ev, &source, &targets).map(Value::Composite);
    }
    convert_to_derived(ev, &source, targets).map(Value::Number)
}

enum SourceQuantity {
    Number(Numeric),
    Composite(CompositeValue),
}

impl SourceQuantity {
    fn terms(&self) -> Vec<UnitTerm> {
        match self {
            Self::Number(n) => n.terms.clone(),
            // A composite's dimension is its leading component's.
            Self::Composite(c) => c
                .leading_unit()
                .map(|u| vec![UnitTerm::simple(u.clone())])
                .unwrap_or_default(),
        }
    }

    /// The source expressed in its dimension's base expansion.
    fn base_value(&self, variant: UnitVariant) -> f64 {
        match self {
            Self::Number(n) => numeric_base_value(n, variant),
            Self::Composite(c) => c
                .components
                .iter()
                .map(|component| component.unit.to_base(component.value, variant))
                .sum(),
        }
    }
}

fn shares_source_dimension(source: &SourceQuantity, targets: &[UnitTerm]) -> bool {
    let source_dimension = match source {
        SourceQuantity::Number(n) => n.simple_unit().map(|u| u.dimension.clone()),
        SourceQuantity::Composite(c) => c.leading_unit().map(|u| u.dimension.clone()),
    };
    let Some(dimension) = source_dimension else {
        return false;
    };
    targets.iter().all(|t| t.unit.dimension == dimension)
}

fn check_convertible(
    ev: &Evaluator,
    source_terms: &[UnitTerm],
    target_terms: &[UnitTerm],
) -> ReckonResult<()> {
    if dimension::compatible(&ev.registry, source_terms, target_terms)? {
        return Ok(());
    }
    let from = dimension::signature_of(&ev.registry, source_terms)?;
    let to = dimension::signature_of(&ev.registry, target_terms)?;
    Err(ReckonError::conversion_incompatible()
        .with_message(format!("cannot convert {from} to {to}")))
}

fn convert_to_simple(
    ev: &Evaluator,
    source: &SourceQuantity,
    unit: &std::sync::Arc<crate::registry::Unit>,
) -> ReckonResult<Numeric> {
    let variant = ev.config.variant;
    let target_terms = [UnitTerm::simple(unit.clone())];
    check_convertible(ev, &source.terms(), &target_terms)?;
    match source {
        // Simple → simple takes the affine-aware path in one hop.
        SourceQuantity::Number(n) if n.is_simple() => {
            let Some(source_unit) = n.simple_unit() else {
                return Err(ReckonError::assert());
            };
            let converted = unit.from_base(source_unit.to_base(n.value, variant), variant);
            Ok(Numeric::num_unit(converted, unit.clone()))
        }
        _ => {
            let converted = unit.from_base(source.base_value(variant), variant);
            Ok(Numeric::num_unit(converted, unit.clone()))
        }
    }
}

/// Greedy multi-unit conversion: whole counts for every target but the
/// last, which absorbs the remainder (`1.71 m` → `5 ft 7.32… in`).
fn convert_to_composite(
    ev: &Evaluator,
    source: &SourceQuantity,
    targets: &[UnitTerm],
) -> ReckonResult<CompositeValue> {
    let variant = ev.config.variant;
    check_convertible(ev, &source.terms(), &targets[..1])?;

    let mut remainder = source.base_value(variant);
    let mut components = Vec::with_capacity(targets.len());
    for (index, target) in targets.iter().enumerate() {
        let factor = target.unit.factor(variant);
        if index + 1 == targets.len() {
            components.push(CompositeComponent::new(remainder / factor, target.unit.clone()));
        } else {
            let count = (remainder / factor).trunc();
            remainder -= count * factor;
            components.push(CompositeComponent::new(count, target.unit.clone()));
        }
    }
    Ok(CompositeValue::new(components))
}

fn convert_to_derived(
    ev: &Evaluator,
    source: &SourceQuantity,
    targets: Vec<UnitTerm>,
) -> ReckonResult<Numeric> {
    let variant = ev.config.variant;
    check_convertible(ev, &source.terms(), &targets)?;
    let value = source.base_value(variant) / terms_factor(&targets, variant);
    Ok(Numeric::num_terms(value, targets))
}

// ==== Shared numeric helpers ====

/// The product of `factor^exponent` over a term list; maps a scalar into
/// the list's base expansion. Affine offsets do not participate here,
/// they only exist on the simple single-unit path.
pub(crate) fn terms_factor(terms: &[UnitTerm], variant: UnitVariant) -> f64 {
    terms
        .iter()
        .map(|t| t.unit.factor(variant).powf(t.exponent))
        .product()
}

/// A Numeric's value in its base expansion, affine-aware when simple.
pub(crate) fn numeric_base_value(numeric: &Numeric, variant: UnitVariant) -> f64 {
    if let Some(unit) = numeric.simple_unit() {
        unit.to_base(numeric.value, variant)
    } else {
        numeric.value * terms_factor(&numeric.terms, variant)
    }
}

/// Flattens a value into a Numeric for the numeric operator table. A
/// composite collapses onto its first component's unit.
pub(crate) fn flatten_value(ev: &Evaluator, value: Value) -> ReckonResult<Numeric> {
    match value {
        Value::Number(n) => Ok(n),
        Value::Composite(c) => flatten_composite(ev, &c),
        other => Err(ReckonError::dimension_mismatch()
            .with_message(format!("expected a number, got {}", other.kind_name()))),
    }
}

/// Converts every component into the first component's unit and sums.
pub(crate) fn flatten_composite(ev: &Evaluator, composite: &CompositeValue) -> ReckonResult<Numeric> {
    let variant = ev.config.variant;
    let Some(leading) = composite.leading_unit() else {
        return Ok(Numeric::num(0.0));
    };
    if !composite.all_of_dimension(&leading.dimension) {
        let lead_terms = [UnitTerm::simple(leading.clone())];
        for component in &composite.components {
            let component_terms = [UnitTerm::simple(component.unit.clone())];
            check_convertible(ev, &component_terms, &lead_terms)?;
        }
    }
    let base: f64 = composite
        .components
        .iter()
        .map(|component| component.unit.to_base(component.value, variant))
        .sum();
    Ok(Numeric::num_unit(leading.from_base(base, variant), leading.clone()))
}

// ==== Presentation formats ====

fn convert_to_format(
    ev: &Evaluator,
    value: Value,
    format: PresentationFormat,
) -> ReckonResult<Value> {
    match format {
        PresentationFormat::Decimals(count) => apply_precision(
            value,
            Precision {
                count,
                mode: PrecisionMode::Decimals,
            },
        ),
        PresentationFormat::SigFigs(count) => apply_precision(
            value,
            Precision {
                count,
                mode: PrecisionMode::SigFigs,
            },
        ),
        PresentationFormat::Unix | PresentationFormat::UnixMillis => {
            if !value.is_datetime() || matches!(value, Value::Duration(_)) {
                return Err(ReckonError::format_incompatible().with_message(format!(
                    "unix timestamps require a point in time, got {}",
                    value.kind_name()
                )));
            }
            let ms = ev.temporal().to_instant(&value)?.epoch_milliseconds();
            let number = if format == PresentationFormat::Unix {
                ms as f64 / 1000.0
            } else {
                ms as f64
            };
            Ok(Value::num(number))
        }
        PresentationFormat::Percentage => match &value {
            Value::Number(n) if n.is_dimensionless() => Ok(Value::presented(format, value)),
            _ => Err(ReckonError::format_incompatible()
                .with_message("percentage requires a dimensionless number")),
        },
        PresentationFormat::Ordinal => match &value {
            Value::Number(n) if n.is_dimensionless() && n.is_integer() => {
                Ok(Value::presented(format, value))
            }
            _ => Err(ReckonError::format_incompatible()
                .with_message("ordinal requires a whole number")),
        },
        PresentationFormat::Base(base) => {
            if !(2..=36).contains(&base) {
                return Err(ReckonError::invalid_base()
                    .with_message(format!("base {base} is outside 2..=36")));
            }
            require_number(value, format)
        }
        PresentationFormat::Binary
        | PresentationFormat::Octal
        | PresentationFormat::Decimal
        | PresentationFormat::Hex
        | PresentationFormat::Fraction
        | PresentationFormat::Scientific => require_number(value, format),
        PresentationFormat::Iso8601 | PresentationFormat::Rfc9557 => {
            if value.is_datetime() {
                Ok(Value::presented(format, value))
            } else {
                Err(ReckonError::format_incompatible()
                    .with_message("this format applies to dates and times"))
            }
        }
        PresentationFormat::Rfc2822 => {
            if value.is_datetime() && !matches!(value, Value::Duration(_)) {
                Ok(Value::presented(format, value))
            } else {
                Err(ReckonError::format_incompatible()
                    .with_message("RFC 2822 applies to points in time"))
            }
        }
    }
}

fn require_number(value: Value, format: PresentationFormat) -> ReckonResult<Value> {
    match &value {
        Value::Number(_) => Ok(Value::presented(format, value)),
        _ => Err(ReckonError::format_incompatible()
            .with_message(format!("this format applies to numbers, got {}", value.kind_name()))),
    }
}

/// Precision formats round in place and record the precision for the
/// formatter; on a composite the final (fractional) component carries it.
fn apply_precision(value: Value, precision: Precision) -> ReckonResult<Value> {
    let round = |x: f64| match precision.mode {
        PrecisionMode::Decimals => rounding::round_decimals(x, precision.count),
        PrecisionMode::SigFigs => rounding::round_sig_figs(x, precision.count),
    };
    match value {
        Value::Number(mut n) => {
            n.value = round(n.value);
            n.precision = Some(precision);
            Ok(Value::Number(n))
        }
        Value::Composite(mut c) => {
            if let Some(last) = c.components.last_mut() {
                last.value = round(last.value);
                last.precision = Some(precision);
            }
            Ok(Value::Composite(c))
        }
        other => Err(ReckonError::precision_not_applicable()
            .with_message(format!("cannot apply precision to {}", other.kind_name()))),
    }
}

// ==== Temporal properties ====

fn extract_property(
    ev: &Evaluator,
    value: &Value,
    property: TemporalProperty,
) -> ReckonResult<Value> {
    match value {
        Value::Date(date) => date_property(*date, property),
        Value::Time(time) => time_property(*time, property),
        Value::DateTime(dt) => datetime_property(*dt, property),
        Value::Zoned(zoned) => {
            if property == TemporalProperty::Offset {
                return offset_value(ev, zoned.offset().fix().local_minus_utc());
            }
            datetime_property(zoned.naive_local(), property)
        }
        Value::Instant(instant) => {
            // Instants carry no zone; properties read in the host zone.
            let zoned = instant.to_zoned(ev.temporal().system_tz()?)?;
            if property == TemporalProperty::Offset {
                return offset_value(ev, zoned.offset().fix().local_minus_utc());
            }
            datetime_property(zoned.naive_local(), property)
        }
        other => Err(ReckonError::property_not_applicable().with_message(format!(
            "cannot read a calendar property from {}",
            other.kind_name()
        ))),
    }
}

fn datetime_property(dt: NaiveDateTime, property: TemporalProperty) -> ReckonResult<Value> {
    match property {
        TemporalProperty::Hour
        | TemporalProperty::Minute
        | TemporalProperty::Second
        | TemporalProperty::Millisecond => time_property(dt.time(), property),
        _ => date_property(dt.date(), property),
    }
}

fn date_property(date: NaiveDate, property: TemporalProperty) -> ReckonResult<Value> {
    let number = match property {
        TemporalProperty::Year => f64::from(date.year()),
        TemporalProperty::Month => f64::from(date.month()),
        TemporalProperty::Day => f64::from(date.day()),
        TemporalProperty::Weekday => f64::from(date.weekday().number_from_monday()),
        TemporalProperty::DayOfYear => f64::from(date.ordinal()),
        TemporalProperty::WeekOfYear => f64::from(date.iso_week().week()),
        _ => {
            return Err(ReckonError::property_not_applicable()
                .with_message("a date has no clock fields"))
        }
    };
    Ok(Value::num(number))
}

fn time_property(time: NaiveTime, property: TemporalProperty) -> ReckonResult<Value> {
    let number = match property {
        TemporalProperty::Hour => f64::from(time.hour()),
        TemporalProperty::Minute => f64::from(time.minute()),
        TemporalProperty::Second => f64::from(time.second()),
        TemporalProperty::Millisecond => f64::from(time.nanosecond() / 1_000_000),
        _ => {
            return Err(ReckonError::property_not_applicable()
                .with_message("a time has no calendar fields"))
        }
    };
    Ok(Value::num(number))
}

/// A UTC offset as a duration; the zero offset comes back as the Numeric
/// `0 minutes` so the formatter has a unit to show.
fn offset_value(ev: &Evaluator, offset_seconds: i32) -> ReckonResult<Value> {
    if offset_seconds == 0 {
        let minute = ev
            .registry
            .unit_by_id("minute")
            .ok_or_else(ReckonError::assert)?;
        return Ok(Value::Number(Numeric::num_unit(0.0, minute)));
    }
    let hours = f64::from(offset_seconds / 3600);
    let minutes = f64::from((offset_seconds % 3600) / 60);
    Ok(Value::Duration(CalendarDuration::new(
        0.0, 0.0, 0.0, 0.0, hours, minutes, 0.0, 0.0,
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::UnitTermNode;
    use crate::host::FixedHooks;
    use crate::options::EvaluatorConfig;
    use crate::registry::{ExchangeRates, UnitRegistry};
    use crate::temporal;
    use crate::values::DurationField;
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

    fn units_target(pairs: &[(&str, f64)]) -> ConversionTarget {
        ConversionTarget::Units(
            pairs
                .iter()
                .map(|(name, exponent)| UnitTermNode::named_pow(name, *exponent))
                .collect(),
        )
    }

    fn number(ev: &Evaluator, value: f64, pairs: &[(&str, f64)]) -> Value {
        let terms = pairs
            .iter()
            .map(|(id, exponent)| {
                UnitTerm::new(ev.registry.unit_by_id(id).expect("unit"), *exponent)
            })
            .collect();
        Value::Number(Numeric::num_terms(value, terms))
    }

    #[test]
    fn derived_conversion_between_velocity_spellings() {
        let ev = evaluator();
        let source = number(&ev, 90.0, &[("kilometer", 1.0), ("hour", -1.0)]);
        let target = units_target(&[("mi", 1.0), ("hour", -1.0)]);
        let Value::Number(n) = convert(&ev, source, &target).expect("convert") else {
            panic!("expected a number");
        };
        assert!((n.value - 90.0 * 1000.0 / 1609.344).abs() < 1e-9);
        assert_eq!(n.terms[0].unit.id, "mile");
        assert_eq!(n.terms[1].exponent, -1.0);
    }

    #[test]
    fn simple_conversion_is_affine_aware() {
        let ev = evaluator();
        let source = number(&ev, 25.0, &[("celsius", 1.0)]);
        let Value::Number(n) =
            convert(&ev, source, &units_target(&[("fahrenheit", 1.0)])).expect("convert")
        else {
            panic!("expected a number");
        };
        assert!((n.value - 77.0).abs() < 1e-9);
    }

    #[test]
    fn composite_sources_flatten_through_base() {
        let ev = evaluator();
        let ft = ev.registry.unit_by_id("foot").expect("foot");
        let inch = ev.registry.unit_by_id("inch").expect("inch");
        let source = Value::Composite(CompositeValue::new(vec![
            CompositeComponent::new(5.0, ft),
            CompositeComponent::new(7.0, inch),
        ]));
        let Value::Number(n) =
            convert(&ev, source, &units_target(&[("cm", 1.0)])).expect("convert")
        else {
            panic!("expected a number");
        };
        assert!((n.value - 170.18).abs() < 1e-9);
    }

    #[test]
    fn durations_materialize_before_unit_targets() {
        let ev = evaluator();
        let duration = CalendarDuration::new(0.0, 0.0, 0.0, 0.0, 2.0, 30.0, 0.0, 0.0);
        let Value::Number(n) = convert(
            &ev,
            Value::Duration(duration),
            &units_target(&[("minute", 1.0)]),
        )
        .expect("convert")
        else {
            panic!("expected a number");
        };
        assert_eq!(n.value, 150.0);
        assert_eq!(n.simple_unit().map(|u| u.id.as_str()), Some("minute"));
    }

    #[test]
    fn offset_property_reports_the_zone() {
        let ev = evaluator();
        let newyork = temporal::resolve_local(
            Tz::America__New_York,
            chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
                .expect("date")
                .and_hms_opt(7, 0, 0)
                .expect("datetime"),
        )
        .expect("resolve");
        let offset = convert(
            &ev,
            Value::Zoned(newyork),
            &ConversionTarget::Property(TemporalProperty::Offset),
        )
        .expect("offset");
        assert_eq!(
            offset,
            Value::Duration(CalendarDuration::from_field(DurationField::Hours, -5.0))
        );

        let utc = temporal::resolve_local(
            Tz::UTC,
            chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
                .expect("date")
                .and_hms_opt(12, 0, 0)
                .expect("datetime"),
        )
        .expect("resolve");
        let Value::Number(zero) = convert(
            &ev,
            Value::Zoned(utc),
            &ConversionTarget::Property(TemporalProperty::Offset),
        )
        .expect("offset")
        else {
            panic!("expected the 0-minutes number");
        };
        assert_eq!(zero.value, 0.0);
        assert_eq!(zero.simple_unit().map(|u| u.id.as_str()), Some("minute"));
    }

    #[test]
    fn sig_figs_round_and_record_precision() {
        let ev = evaluator();
        let Value::Number(n) = convert(
            &ev,
            Value::num(1234.5),
            &ConversionTarget::Format(PresentationFormat::SigFigs(2)),
        )
        .expect("convert")
        else {
            panic!("expected a number");
        };
        assert_eq!(n.value, 1200.0);
        assert_eq!(
            n.precision,
            Some(Precision {
                count: 2,
                mode: PrecisionMode::SigFigs
            })
        );
    }

    #[test]
    fn incompatible_unit_targets_are_rejected() {
        let ev = evaluator();
        let source = number(&ev, 5.0, &[("meter", 1.0)]);
        let err = convert(&ev, source, &units_target(&[("kg", 1.0)])).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::ConversionIncompatible);
    }
}
