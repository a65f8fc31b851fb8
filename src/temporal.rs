//! Calendar arithmetic across the six temporal kinds.
//!
//! The calendar and zone internals (month lengths, leap handling, IANA
//! transitions) come from `chrono`/`chrono-tz`; this module decides which
//! calls to make: how durations split into calendar and clock parts, when
//! a plain result widens to a datetime, and how mixed-kind operands
//! normalize before subtraction.
//!
//! Ground rules:
//!
//! - month and year addition clamps to the last valid day, so
//!   `2024-02-29 + 1 year = 2025-02-28`;
//! - zoned addition applies calendar fields on the local wall clock and
//!   resolves against the zone before the clock fields are added as
//!   absolute milliseconds, so DST transitions behave;
//! - anything subtracted against an instant or zoned datetime normalizes
//!   both sides to the timeline; plain values are read in the host zone.

use chrono::{Months, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike};
use chrono_tz::Tz;

use crate::host::HostHooks;
use crate::options::UnitVariant;
use crate::values::duration::MS_PER_DAY;
use crate::values::{
    CalendarDuration, CompositeValue, DurationField, Instant, Numeric, Value, ZonedDateTime,
};
use crate::{ReckonError, ReckonResult};

/// The temporal half of the evaluator, bound to the host's clock/zone.
#[derive(Clone, Copy)]
pub(crate) struct TemporalEngine<'a> {
    hooks: &'a dyn HostHooks,
}

impl<'a> TemporalEngine<'a> {
    pub(crate) fn new(hooks: &'a dyn HostHooks) -> Self {
        Self { hooks }
    }

    // ==== Host access ====

    pub(crate) fn system_tz(&self) -> ReckonResult<Tz> {
        self.hooks.get_host_time_zone()
    }

    pub(crate) fn now_instant(&self) -> ReckonResult<Instant> {
        Ok(Instant::from_epoch_milliseconds(
            self.hooks.get_host_epoch_milliseconds()?,
        ))
    }

    pub(crate) fn now_zoned(&self) -> ReckonResult<ZonedDateTime> {
        self.now_instant()?.to_zoned(self.system_tz()?)
    }

    pub(crate) fn today(&self) -> ReckonResult<NaiveDate> {
        Ok(self.now_zoned()?.date_naive())
    }

    pub(crate) fn today_offset(&self, days: i64) -> ReckonResult<NaiveDate> {
        let delta = TimeDelta::try_days(days).ok_or_else(date_out_of_range)?;
        self.today()?
            .checked_add_signed(delta)
            .ok_or_else(date_out_of_range)
    }

    // ==== Duration addition ====

    /// Adds a duration to any temporal value, widening where the
    /// operation demands it.
    pub(crate) fn add_duration(
        &self,
        value: &Value,
        duration: &CalendarDuration,
    ) -> ReckonResult<Value> {
        match value {
            Value::Date(date) => self.add_to_date(*date, duration),
            Value::Time(time) => self.add_to_time(*time, duration),
            Value::DateTime(dt) => Ok(Value::DateTime(add_to_datetime(*dt, duration)?)),
            Value::Instant(instant) => Ok(Value::Instant(self.add_to_instant(*instant, duration)?)),
            Value::Zoned(zoned) => Ok(Value::Zoned(add_to_zoned(zoned, duration)?)),
            Value::Duration(lhs) => Ok(Value::Duration(lhs.added(duration))),
            _ => Err(ReckonError::assert().with_message("add_duration expects a temporal value")),
        }
    }

    fn add_to_date(&self, date: NaiveDate, duration: &CalendarDuration) -> ReckonResult<Value> {
        let split = SplitDuration::from(duration);
        let shifted = add_months_days(date, split.months, split.days)?;
        if split.clock_ms == 0.0 {
            return Ok(Value::Date(shifted));
        }
        // Any clock component widens the result to a plain datetime.
        let midnight = shifted.and_hms_opt(0, 0, 0).ok_or_else(date_out_of_range)?;
        Ok(Value::DateTime(add_milliseconds(midnight, split.clock_ms)?))
    }

    fn add_to_time(&self, time: NaiveTime, duration: &CalendarDuration) -> ReckonResult<Value> {
        if duration.has_date_components() {
            // Date fields force a datetime anchored on the host's today.
            let anchored = self.today()?.and_time(time);
            return Ok(Value::DateTime(add_to_datetime(anchored, duration)?));
        }
        let split = SplitDuration::from(duration);
        let total = f64::from(ms_of_day(time)) + split.clock_ms;
        let wrapped = total.rem_euclid(MS_PER_DAY);
        let rollover = ((total - wrapped) / MS_PER_DAY) as i64;
        let new_time = time_from_ms_of_day(wrapped)?;
        if rollover == 0 {
            return Ok(Value::Time(new_time));
        }
        // Crossing a day boundary records the implicit rollover day.
        let date = self.today_offset(rollover)?;
        Ok(Value::DateTime(date.and_time(new_time)))
    }

    fn add_to_instant(
        &self,
        instant: Instant,
        duration: &CalendarDuration,
    ) -> ReckonResult<Instant> {
        let split = SplitDuration::from(duration);
        if split.months == 0 && split.days == 0 {
            let ms = instant.epoch_milliseconds() as f64 + split.clock_ms;
            if !ms.is_finite() || ms.abs() >= i64::MAX as f64 {
                return Err(date_out_of_range());
            }
            return Ok(Instant::from_epoch_milliseconds(ms.round() as i64));
        }
        // Calendar fields only make sense on a wall clock; instants
        // borrow the host zone for the calendar part of the walk.
        let zoned = instant.to_zoned(self.system_tz()?)?;
        Ok(Instant::from(&add_to_zoned(&zoned, duration)?))
    }

    // ==== Cross-kind subtraction ====

    /// `lhs − rhs` for any two non-duration temporal values.
    pub(crate) fn subtract_temporal(
        &self,
        lhs: &Value,
        rhs: &Value,
    ) -> ReckonResult<CalendarDuration> {
        if matches!(lhs, Value::Instant(_) | Value::Zoned(_))
            || matches!(rhs, Value::Instant(_) | Value::Zoned(_))
        {
            let left = self.to_instant(lhs)?;
            let right = self.to_instant(rhs)?;
            let diff = left.epoch_milliseconds() - right.epoch_milliseconds();
            return Ok(CalendarDuration::from_total_milliseconds(diff as f64));
        }
        let left = self.to_plain_datetime(lhs)?;
        let right = self.to_plain_datetime(rhs)?;
        let diff = left.signed_duration_since(right).num_milliseconds();
        Ok(CalendarDuration::from_total_milliseconds(diff as f64))
    }

    // ==== Normalization ====

    /// Widens a plain temporal value to a plain datetime. Dates land on
    /// midnight; times borrow the host's today.
    pub(crate) fn to_plain_datetime(&self, value: &Value) -> ReckonResult<NaiveDateTime> {
        match value {
            Value::Date(date) => date.and_hms_opt(0, 0, 0).ok_or_else(date_out_of_range),
            Value::Time(time) => Ok(self.today()?.and_time(*time)),
            Value::DateTime(dt) => Ok(*dt),
            _ => Err(ReckonError::assert().with_message("expected a plain temporal value")),
        }
    }

    /// Normalizes any non-duration temporal value onto the timeline,
    /// reading plain values in the host zone.
    pub(crate) fn to_instant(&self, value: &Value) -> ReckonResult<Instant> {
        match value {
            Value::Instant(instant) => Ok(*instant),
            Value::Zoned(zoned) => Ok(Instant::from(zoned)),
            Value::Date(_) | Value::Time(_) | Value::DateTime(_) => {
                let naive = self.to_plain_datetime(value)?;
                let zoned = resolve_local(self.system_tz()?, naive)?;
                Ok(Instant::from(&zoned))
            }
            _ => Err(ReckonError::assert().with_message("expected a temporal value")),
        }
    }
}

// ==== Plain/zoned addition helpers ====

fn add_to_datetime(dt: NaiveDateTime, duration: &CalendarDuration) -> ReckonResult<NaiveDateTime> {
    let split = SplitDuration::from(duration);
    let date = add_months_days(dt.date(), split.months, split.days)?;
    add_milliseconds(date.and_time(dt.time()), split.clock_ms)
}

fn add_to_zoned(zoned: &ZonedDateTime, duration: &CalendarDuration) -> ReckonResult<ZonedDateTime> {
    let split = SplitDuration::from(duration);
    // Calendar fields move the local wall clock; the zone decides what
    // absolute instant that wall clock lands on.
    let local = zoned.naive_local();
    let date = add_months_days(local.date(), split.months, split.days)?;
    let resolved = resolve_local(zoned.timezone(), date.and_time(local.time()))?;
    resolved
        .checked_add_signed(clock_delta(split.clock_ms)?)
        .ok_or_else(date_out_of_range)
}

/// Resolves a local wall-clock reading against a zone. A DST fold picks
/// the earlier instant; a gap shifts forward an hour, matching the
/// common "skip ahead" convention.
pub(crate) fn resolve_local(tz: Tz, naive: NaiveDateTime) -> ReckonResult<ZonedDateTime> {
    use chrono::offset::LocalResult;
    use chrono::TimeZone;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest),
        LocalResult::None => {
            let shifted = naive
                .checked_add_signed(TimeDelta::hours(1))
                .ok_or_else(date_out_of_range)?;
            tz.from_local_datetime(&shifted)
                .earliest()
                .ok_or_else(|| {
                    ReckonError::timezone_unknown()
                        .with_message("local time does not exist in the target zone")
                })
        }
    }
}

/// A duration split for calendar application: whole months, whole days,
/// and everything else as clock milliseconds (fractional calendar fields
/// fall into the clock part via the conventional averages).
struct SplitDuration {
    months: i64,
    days: i64,
    clock_ms: f64,
}

impl From<&CalendarDuration> for SplitDuration {
    fn from(duration: &CalendarDuration) -> Self {
        let whole_years = duration.years.trunc();
        let whole_months = duration.months.trunc();
        let whole_weeks = duration.weeks.trunc();
        let whole_days = duration.days.trunc();

        let clock_ms = (duration.years - whole_years) * DurationField::Years.milliseconds()
            + (duration.months - whole_months) * DurationField::Months.milliseconds()
            + (duration.weeks - whole_weeks) * DurationField::Weeks.milliseconds()
            + (duration.days - whole_days) * DurationField::Days.milliseconds()
            + duration.hours * DurationField::Hours.milliseconds()
            + duration.minutes * DurationField::Minutes.milliseconds()
            + duration.seconds * DurationField::Seconds.milliseconds()
            + duration.milliseconds;

        Self {
            months: (whole_years * 12.0 + whole_months) as i64,
            days: (whole_weeks * 7.0 + whole_days) as i64,
            clock_ms,
        }
    }
}

fn add_months_days(date: NaiveDate, months: i64, days: i64) -> ReckonResult<NaiveDate> {
    let with_months = if months >= 0 {
        u32::try_from(months)
            .ok()
            .and_then(|m| date.checked_add_months(Months::new(m)))
    } else {
        u32::try_from(-months)
            .ok()
            .and_then(|m| date.checked_sub_months(Months::new(m)))
    }
    .ok_or_else(date_out_of_range)?;
    let delta = TimeDelta::try_days(days).ok_or_else(date_out_of_range)?;
    with_months
        .checked_add_signed(delta)
        .ok_or_else(date_out_of_range)
}

fn add_milliseconds(dt: NaiveDateTime, ms: f64) -> ReckonResult<NaiveDateTime> {
    dt.checked_add_signed(clock_delta(ms)?)
        .ok_or_else(date_out_of_range)
}

/// A clock offset as a `TimeDelta`, rejecting magnitudes the timeline
/// cannot hold rather than saturating into a panic.
fn clock_delta(ms: f64) -> ReckonResult<TimeDelta> {
    if !ms.is_finite() || ms.abs() >= i64::MAX as f64 {
        return Err(date_out_of_range());
    }
    Ok(TimeDelta::milliseconds(ms.round() as i64))
}

fn date_out_of_range() -> ReckonError {
    ReckonError::domain().with_message("date is out of the supported range")
}

fn ms_of_day(time: NaiveTime) -> u32 {
    time.num_seconds_from_midnight() * 1000 + time.nanosecond() / 1_000_000
}

fn time_from_ms_of_day(ms: f64) -> ReckonResult<NaiveTime> {
    let ms = ms.rem_euclid(MS_PER_DAY) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(ms / 1000, (ms % 1000) * 1_000_000)
        .ok_or_else(date_out_of_range)
}

// ==== Duration coercion from numbers ====

/// Interprets a simple time-dimensioned Numeric as a calendar duration.
/// Unit ids that name a duration field map directly, so `2 days` keeps
/// calendar semantics; other time units go through seconds.
pub(crate) fn duration_from_numeric(
    numeric: &Numeric,
    variant: UnitVariant,
) -> Option<CalendarDuration> {
    let unit = numeric.simple_unit()?;
    if unit.dimension != "time" {
        return None;
    }
    if let Some(field) = DurationField::from_unit_id(&unit.id) {
        return Some(CalendarDuration::from_field(field, numeric.value));
    }
    let seconds = unit.to_base(numeric.value, variant);
    Some(CalendarDuration::from_field(
        DurationField::Seconds,
        seconds,
    ))
}

/// Interprets a composite whose components are all time-dimensioned as a
/// calendar duration (`1 hr 30 min`).
pub(crate) fn duration_from_composite(
    composite: &CompositeValue,
    variant: UnitVariant,
) -> Option<CalendarDuration> {
    let mut duration = CalendarDuration::default();
    for component in &composite.components {
        if component.unit.dimension != "time" {
            return None;
        }
        if let Some(field) = DurationField::from_unit_id(&component.unit.id) {
            *duration.field_mut(field) += component.value;
        } else {
            let seconds = component.unit.to_base(component.value, variant);
            *duration.field_mut(DurationField::Seconds) += seconds;
        }
    }
    Some(duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::FixedHooks;

    // 2024-01-15T12:00:00Z
    const FIXED_MS: i64 = 1_705_320_000_000;

    fn hooks() -> FixedHooks {
        FixedHooks {
            epoch_ms: FIXED_MS,
            tz: Tz::UTC,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("date")
    }

    #[test]
    fn leap_day_plus_one_year_clamps() {
        let hooks = hooks();
        let engine = TemporalEngine::new(&hooks);
        let duration = CalendarDuration::from_field(DurationField::Years, 1.0);
        let result = engine
            .add_duration(&Value::Date(date(2024, 2, 29)), &duration)
            .expect("add");
        assert_eq!(result, Value::Date(date(2025, 2, 28)));
    }

    #[test]
    fn time_components_widen_date_to_datetime() {
        let hooks = hooks();
        let engine = TemporalEngine::new(&hooks);
        let duration = CalendarDuration::new(0.0, 0.0, 0.0, 1.0, 2.0, 0.0, 0.0, 0.0);
        let result = engine
            .add_duration(&Value::Date(date(2024, 1, 1)), &duration)
            .expect("add");
        let expected = date(2024, 1, 2).and_hms_opt(2, 0, 0).expect("datetime");
        assert_eq!(result, Value::DateTime(expected));
    }

    #[test]
    fn time_rollover_records_the_day() {
        let hooks = hooks();
        let engine = TemporalEngine::new(&hooks);
        let time = NaiveTime::from_hms_opt(23, 0, 0).expect("time");
        let duration = CalendarDuration::from_field(DurationField::Hours, 2.0);
        let result = engine
            .add_duration(&Value::Time(time), &duration)
            .expect("add");
        // Host clock is 2024-01-15; crossing midnight lands on the 16th.
        let expected = date(2024, 1, 16).and_hms_opt(1, 0, 0).expect("datetime");
        assert_eq!(result, Value::DateTime(expected));
    }

    #[test]
    fn plain_date_difference_counts_days() {
        let hooks = hooks();
        let engine = TemporalEngine::new(&hooks);
        let diff = engine
            .subtract_temporal(&Value::Date(date(2024, 1, 15)), &Value::Date(date(2024, 1, 1)))
            .expect("subtract");
        assert_eq!(diff.days, 14.0);
        assert!(!diff.has_time_components());
    }

    #[test]
    fn zoned_addition_respects_dst() {
        // One calendar day across the America/New_York spring-forward
        // keeps the local wall clock even though only 23h elapse.
        let start = resolve_local(
            Tz::America__New_York,
            date(2024, 3, 9).and_hms_opt(12, 0, 0).expect("datetime"),
        )
        .expect("resolve");
        let duration = CalendarDuration::from_field(DurationField::Days, 1.0);
        let end = add_to_zoned(&start, &duration).expect("add");
        assert_eq!(end.naive_local().time(), start.naive_local().time());
        let elapsed_ms = end.timestamp_millis() - start.timestamp_millis();
        assert_eq!(elapsed_ms, 23 * 3_600_000);
    }

    #[test]
    fn gap_times_shift_forward() {
        // 02:30 on 2024-03-10 does not exist in New York.
        let resolved = resolve_local(
            Tz::America__New_York,
            date(2024, 3, 10).and_hms_opt(2, 30, 0).expect("datetime"),
        )
        .expect("resolve");
        assert_eq!(
            resolved.naive_local(),
            date(2024, 3, 10).and_hms_opt(3, 30, 0).expect("datetime")
        );
    }

    #[test]
    fn add_then_subtract_round_trips() {
        let hooks = hooks();
        let engine = TemporalEngine::new(&hooks);
        let a = Value::DateTime(date(2024, 5, 1).and_hms_opt(8, 30, 0).expect("datetime"));
        let b = Value::DateTime(date(2024, 5, 3).and_hms_opt(10, 0, 0).expect("datetime"));
        let diff = engine.subtract_temporal(&b, &a).expect("subtract");
        let back = engine.add_duration(&a, &diff).expect("add");
        assert_eq!(back, b);
    }

    #[test]
    fn numeric_days_keep_calendar_semantics() {
        let registry = crate::UnitRegistry::builtin();
        let day = registry.unit_by_id("day").expect("day");
        let numeric = Numeric::num_unit(2.0, day);
        let duration =
            duration_from_numeric(&numeric, UnitVariant::Us).expect("time dimension");
        assert_eq!(duration.days, 2.0);
        assert!(!duration.has_time_components());
    }

    #[test]
    fn composite_clock_components_become_fields() {
        let registry = crate::UnitRegistry::builtin();
        let hour = registry.unit_by_id("hour").expect("hour");
        let minute = registry.unit_by_id("minute").expect("minute");
        let composite = CompositeValue::new(vec![
            crate::values::CompositeComponent::new(1.0, hour),
            crate::values::CompositeComponent::new(30.0, minute),
        ]);
        let duration =
            duration_from_composite(&composite, UnitVariant::Us).expect("time dimension");
        assert_eq!(duration.hours, 1.0);
        assert_eq!(duration.minutes, 30.0);
    }
}
