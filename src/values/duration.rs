//! Signed calendar durations.
//!
//! A duration keeps its authored calendar fields (`1 month` is a month,
//! not 30.4375 days) so calendar-aware addition can apply them field by
//! field. Absolute comparisons, fractional scaling, and ratios go
//! through a conventional millisecond total using 365.25-day years and
//! 30.4375-day months.

use std::sync::Arc;

use crate::registry::{Unit, UnitRegistry};
use crate::values::{CompositeComponent, CompositeValue, Numeric, Value};
use crate::{ReckonError, ReckonResult, ReckonUnwrap};

pub(crate) const MS_PER_SECOND: f64 = 1000.0;
pub(crate) const MS_PER_MINUTE: f64 = 60.0 * MS_PER_SECOND;
pub(crate) const MS_PER_HOUR: f64 = 60.0 * MS_PER_MINUTE;
pub(crate) const MS_PER_DAY: f64 = 24.0 * MS_PER_HOUR;
pub(crate) const MS_PER_WEEK: f64 = 7.0 * MS_PER_DAY;
/// Conventional average month: 30.4375 days.
pub(crate) const MS_PER_MONTH: f64 = 30.437_5 * MS_PER_DAY;
/// Conventional average year: 365.25 days.
pub(crate) const MS_PER_YEAR: f64 = 365.25 * MS_PER_DAY;

/// The calendar fields of a duration, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationField {
    Years,
    Months,
    Weeks,
    Days,
    Hours,
    Minutes,
    Seconds,
    Milliseconds,
}

impl DurationField {
    /// All fields, largest first.
    pub const ALL: [Self; 8] = [
        Self::Years,
        Self::Months,
        Self::Weeks,
        Self::Days,
        Self::Hours,
        Self::Minutes,
        Self::Seconds,
        Self::Milliseconds,
    ];

    /// The registry unit id measuring this field.
    #[must_use]
    pub const fn unit_id(self) -> &'static str {
        match self {
            Self::Years => "year",
            Self::Months => "month",
            Self::Weeks => "week",
            Self::Days => "day",
            Self::Hours => "hour",
            Self::Minutes => "minute",
            Self::Seconds => "second",
            Self::Milliseconds => "millisecond",
        }
    }

    /// The conventional milliseconds per unit of this field.
    #[must_use]
    pub(crate) const fn milliseconds(self) -> f64 {
        match self {
            Self::Years => MS_PER_YEAR,
            Self::Months => MS_PER_MONTH,
            Self::Weeks => MS_PER_WEEK,
            Self::Days => MS_PER_DAY,
            Self::Hours => MS_PER_HOUR,
            Self::Minutes => MS_PER_MINUTE,
            Self::Seconds => MS_PER_SECOND,
            Self::Milliseconds => 1.0,
        }
    }

    /// Maps a time-dimension unit id onto its duration field.
    #[must_use]
    pub(crate) fn from_unit_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.unit_id() == id)
    }
}

/// A signed calendar duration.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CalendarDuration {
    pub years: f64,
    pub months: f64,
    pub weeks: f64,
    pub days: f64,
    pub hours: f64,
    pub minutes: f64,
    pub seconds: f64,
    pub milliseconds: f64,
}

impl CalendarDuration {
    /// Creates a duration from all eight fields.
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub const fn new(
        years: f64,
        months: f64,
        weeks: f64,
        days: f64,
        hours: f64,
        minutes: f64,
        seconds: f64,
        milliseconds: f64,
    ) -> Self {
        Self {
            years,
            months,
            weeks,
            days,
            hours,
            minutes,
            seconds,
            milliseconds,
        }
    }

    /// A duration with a single field set.
    #[must_use]
    pub fn from_field(field: DurationField, value: f64) -> Self {
        let mut duration = Self::default();
        *duration.field_mut(field) = value;
        duration
    }

    /// The field values in canonical order, largest first.
    #[must_use]
    pub fn fields(&self) -> [f64; 8] {
        [
            self.years,
            self.months,
            self.weeks,
            self.days,
            self.hours,
            self.minutes,
            self.seconds,
            self.milliseconds,
        ]
    }

    pub(crate) fn field_mut(&mut self, field: DurationField) -> &mut f64 {
        match field {
            DurationField::Years => &mut self.years,
            DurationField::Months => &mut self.months,
            DurationField::Weeks => &mut self.weeks,
            DurationField::Days => &mut self.days,
            DurationField::Hours => &mut self.hours,
            DurationField::Minutes => &mut self.minutes,
            DurationField::Seconds => &mut self.seconds,
            DurationField::Milliseconds => &mut self.milliseconds,
        }
    }

    /// Returns true if every field is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.fields().iter().all(|f| *f == 0.0)
    }

    /// Returns true if any of the date fields is set.
    #[must_use]
    pub fn has_date_components(&self) -> bool {
        self.years != 0.0 || self.months != 0.0 || self.weeks != 0.0 || self.days != 0.0
    }

    /// Returns true if any of the time-of-day fields is set.
    #[must_use]
    pub fn has_time_components(&self) -> bool {
        self.hours != 0.0 || self.minutes != 0.0 || self.seconds != 0.0 || self.milliseconds != 0.0
    }

    /// The single `(field, value)` entry, if exactly one field is set.
    #[must_use]
    pub fn single_field(&self) -> Option<(DurationField, f64)> {
        let mut found = None;
        for (field, value) in DurationField::ALL.into_iter().zip(self.fields()) {
            if value != 0.0 {
                if found.is_some() {
                    return None;
                }
                found = Some((field, value));
            }
        }
        found
    }

    /// Field-wise negation.
    #[must_use]
    pub fn negated(&self) -> Self {
        self.map_fields(|v| -v)
    }

    /// Field-wise addition; both operands keep their calendar semantics.
    #[must_use]
    pub fn added(&self, other: &Self) -> Self {
        Self::new(
            self.years + other.years,
            self.months + other.months,
            self.weeks + other.weeks,
            self.days + other.days,
            self.hours + other.hours,
            self.minutes + other.minutes,
            self.seconds + other.seconds,
            self.milliseconds + other.milliseconds,
        )
    }

    /// Applies `f` to every field.
    #[must_use]
    pub fn map_fields(&self, f: impl Fn(f64) -> f64) -> Self {
        Self::new(
            f(self.years),
            f(self.months),
            f(self.weeks),
            f(self.days),
            f(self.hours),
            f(self.minutes),
            f(self.seconds),
            f(self.milliseconds),
        )
    }

    /// The conventional absolute length in milliseconds.
    #[must_use]
    pub fn total_milliseconds(&self) -> f64 {
        DurationField::ALL
            .into_iter()
            .zip(self.fields())
            .map(|(field, value)| value * field.milliseconds())
            .sum()
    }

    /// Regroups an absolute millisecond count into day-and-smaller
    /// fields, largest unit first, rounding down to whole milliseconds.
    #[must_use]
    pub fn from_total_milliseconds(total_ms: f64) -> Self {
        let negative = total_ms < 0.0;
        let mut remainder = total_ms.abs().floor();
        let mut duration = Self::default();
        for field in [
            DurationField::Days,
            DurationField::Hours,
            DurationField::Minutes,
            DurationField::Seconds,
            DurationField::Milliseconds,
        ] {
            let per = field.milliseconds();
            let count = (remainder / per).floor();
            remainder -= count * per;
            *duration.field_mut(field) = count;
        }
        if negative {
            duration = duration.negated();
        }
        duration
    }

    /// Scales the duration.
    ///
    /// Integer factors multiply each calendar field independently, which
    /// preserves calendar semantics (`2 × 1 month` is two months, not
    /// 60.875 days). Fractional factors scale the conventional
    /// millisecond total and regroup.
    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        if factor.fract() == 0.0 {
            self.map_fields(|v| v * factor)
        } else {
            Self::from_total_milliseconds(self.total_milliseconds() * factor)
        }
    }

    /// The dimensionless ratio of two durations via millisecond totals.
    pub fn ratio(&self, other: &Self) -> ReckonResult<f64> {
        let denominator = other.total_milliseconds();
        if denominator == 0.0 {
            return Err(
                ReckonError::division_by_zero().with_message("cannot divide by a zero duration")
            );
        }
        Ok(self.total_milliseconds() / denominator)
    }

    // ==== Numeric interop ====

    /// Materializes the duration as a plain value on the engine
    /// boundary: one nonzero field becomes a simple Numeric, several
    /// become a Composite in canonical field order, and the empty
    /// duration is `0 seconds`.
    pub fn into_value(self, registry: &UnitRegistry) -> ReckonResult<Value> {
        if self.is_zero() {
            let second = registry.unit_by_id("second").reckon_unwrap()?;
            return Ok(Value::Number(Numeric::num_unit(0.0, second)));
        }
        if let Some((field, value)) = self.single_field() {
            let unit = field_unit(registry, field)?;
            return Ok(Value::Number(Numeric::num_unit(value, unit)));
        }
        let mut components = Vec::new();
        for (field, value) in DurationField::ALL.into_iter().zip(self.fields()) {
            if value == 0.0 {
                continue;
            }
            components.push(CompositeComponent::new(value, field_unit(registry, field)?));
        }
        Ok(Value::Composite(CompositeValue::new(components)))
    }
}

fn field_unit(registry: &UnitRegistry, field: DurationField) -> ReckonResult<Arc<Unit>> {
    registry.unit_by_id(field.unit_id()).reckon_unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_scaling_preserves_calendar_fields() {
        let duration = CalendarDuration::new(1.0, 2.0, 0.0, 3.0, 4.0, 0.0, 0.0, 0.0);
        let doubled = duration.scaled(2.0);
        assert_eq!(doubled.years, 2.0);
        assert_eq!(doubled.months, 4.0);
        assert_eq!(doubled.days, 6.0);
        assert_eq!(doubled.hours, 8.0);
    }

    #[test]
    fn fractional_scaling_regroups_from_milliseconds() {
        let duration = CalendarDuration::from_field(DurationField::Days, 1.0);
        let half = duration.scaled(0.5);
        assert_eq!(half.days, 0.0);
        assert_eq!(half.hours, 12.0);
    }

    #[test]
    fn scaled_by_integer_divides_back_exactly() {
        let duration = CalendarDuration::new(0.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        for k in [2.0, 3.0, 7.0] {
            let scaled = duration.scaled(k);
            let ratio = scaled.ratio(&duration).expect("ratio");
            assert!((ratio - k).abs() < 1e-9);
        }
    }

    #[test]
    fn ratio_rejects_zero_durations() {
        let duration = CalendarDuration::from_field(DurationField::Hours, 1.0);
        let err = duration.ratio(&CalendarDuration::default()).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::DivisionByZero);
    }

    #[test]
    fn interop_single_field_becomes_simple_numeric() {
        let registry = UnitRegistry::builtin();
        let duration = CalendarDuration::from_field(DurationField::Days, 14.0);
        let Value::Number(n) = duration.into_value(&registry).expect("value") else {
            panic!("expected a number");
        };
        assert_eq!(n.value, 14.0);
        assert_eq!(n.simple_unit().map(|u| u.id.as_str()), Some("day"));
    }

    #[test]
    fn interop_multi_field_becomes_composite_in_canonical_order() {
        let registry = UnitRegistry::builtin();
        let duration = CalendarDuration::new(0.0, 0.0, 0.0, 0.0, 2.0, 30.0, 0.0, 0.0);
        let Value::Composite(c) = duration.into_value(&registry).expect("value") else {
            panic!("expected a composite");
        };
        let ids: Vec<&str> = c.components.iter().map(|c| c.unit.id.as_str()).collect();
        assert_eq!(ids, ["hour", "minute"]);
    }

    #[test]
    fn interop_empty_duration_is_zero_seconds() {
        let registry = UnitRegistry::builtin();
        let Value::Number(n) = CalendarDuration::default()
            .into_value(&registry)
            .expect("value")
        else {
            panic!("expected a number");
        };
        assert_eq!(n.value, 0.0);
        assert_eq!(n.simple_unit().map(|u| u.id.as_str()), Some("second"));
    }

    #[test]
    fn negative_totals_regroup_with_sign() {
        let duration = CalendarDuration::from_total_milliseconds(-90_061_001.0);
        assert_eq!(duration.days, -1.0);
        assert_eq!(duration.hours, -1.0);
        assert_eq!(duration.minutes, -1.0);
        assert_eq!(duration.seconds, -1.0);
        assert_eq!(duration.milliseconds, -1.0);
    }
}
