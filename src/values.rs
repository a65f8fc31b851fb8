//! The typed value universe produced by evaluation.
//!
//! Every line of a document evaluates to exactly one [`Value`]. The set
//! of kinds is closed, and the operator tables in [`crate::arithmetic`],
//! [`crate::compare`], and [`crate::conversion`] match on it
//! exhaustively, so adding a kind surfaces every operator that needs a
//! decision.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;

mod composite;
pub(crate) mod duration;
mod instant;
mod numeric;

#[doc(inline)]
pub use composite::{CompositeComponent, CompositeValue};
#[doc(inline)]
pub use duration::{CalendarDuration, DurationField};
#[doc(inline)]
pub use instant::Instant;
#[doc(inline)]
pub use numeric::{Numeric, Precision, PrecisionMode};

pub use crate::terms::UnitTerm;

/// A datetime pinned to an IANA time zone.
pub type ZonedDateTime = chrono::DateTime<Tz>;

/// A typed value.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Value {
    /// A number, dimensionless or carrying unit terms.
    Number(Numeric),
    /// An ordered multi-component measurement such as `5 ft 7 in`.
    Composite(CompositeValue),
    /// A calendar date without time or zone.
    Date(NaiveDate),
    /// A wall-clock time without date or zone.
    Time(NaiveTime),
    /// A date and wall-clock time without zone.
    DateTime(NaiveDateTime),
    /// An absolute timestamp, timezone-free.
    Instant(Instant),
    /// A datetime in an explicit IANA zone.
    Zoned(ZonedDateTime),
    /// A signed calendar duration.
    Duration(CalendarDuration),
    /// A boolean.
    Bool(bool),
    /// A display wrapper the formatter unwraps.
    Presentation(PresentationValue),
}

/// A display format applied by the formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum PresentationFormat {
    /// Base 2.
    Binary,
    /// Base 8.
    Octal,
    /// Base 10 (explicitly requested).
    Decimal,
    /// Base 16.
    Hex,
    /// An arbitrary base in `2..=36`.
    Base(i64),
    /// Render as a vulgar fraction.
    Fraction,
    /// Scientific notation.
    Scientific,
    /// Multiply by 100 and suffix `%` at display time.
    Percentage,
    /// Render an integer as `1st`, `2nd`, …
    Ordinal,
    /// Seconds since the Unix epoch.
    Unix,
    /// Milliseconds since the Unix epoch.
    UnixMillis,
    /// ISO 8601 date/time text.
    Iso8601,
    /// RFC 9557 date/time text.
    Rfc9557,
    /// RFC 2822 date/time text.
    Rfc2822,
    /// Fixed decimal places.
    Decimals(u8),
    /// Significant figures.
    SigFigs(u8),
}

/// A value wrapped with the display format the formatter must apply.
#[derive(Debug, Clone, PartialEq)]
pub struct PresentationValue {
    /// The display transform.
    pub format: PresentationFormat,
    /// The wrapped value.
    pub inner: Box<Value>,
}

impl Value {
    /// Creates a dimensionless number.
    #[inline]
    #[must_use]
    pub fn num(value: f64) -> Self {
        Self::Number(Numeric::num(value))
    }

    /// Wraps a value in a presentation format.
    #[must_use]
    pub fn presented(format: PresentationFormat, inner: Self) -> Self {
        Self::Presentation(PresentationValue {
            format,
            inner: Box::new(inner),
        })
    }

    /// Unwraps one presentation level; other values pass through.
    #[must_use]
    pub fn unwrap_presentation(self) -> Self {
        match self {
            Self::Presentation(p) => *p.inner,
            other => other,
        }
    }

    /// Returns true for the six temporal kinds.
    #[inline]
    #[must_use]
    pub fn is_datetime(&self) -> bool {
        matches!(
            self,
            Self::Date(_)
                | Self::Time(_)
                | Self::DateTime(_)
                | Self::Instant(_)
                | Self::Zoned(_)
                | Self::Duration(_)
        )
    }

    /// A short kind label for diagnostics.
    #[must_use]
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Number(_) => "number",
            Self::Composite(_) => "composite measurement",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::DateTime(_) => "datetime",
            Self::Instant(_) => "instant",
            Self::Zoned(_) => "zoned datetime",
            Self::Duration(_) => "duration",
            Self::Bool(_) => "boolean",
            Self::Presentation(_) => "presented value",
        }
    }
}

impl From<Numeric> for Value {
    fn from(value: Numeric) -> Self {
        Self::Number(value)
    }
}

impl From<CompositeValue> for Value {
    fn from(value: CompositeValue) -> Self {
        Self::Composite(value)
    }
}

impl From<CalendarDuration> for Value {
    fn from(value: CalendarDuration) -> Self {
        Self::Duration(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presentation_unwraps_one_level() {
        let inner = Value::num(42.0);
        let wrapped = Value::presented(PresentationFormat::Hex, inner.clone());
        assert_eq!(wrapped.unwrap_presentation(), inner);
        // Non-presentation values pass through untouched.
        assert_eq!(inner.clone().unwrap_presentation(), inner);
    }

    #[test]
    fn temporal_predicate_covers_all_six_kinds() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).expect("date");
        assert!(Value::Date(date).is_datetime());
        assert!(Value::Duration(CalendarDuration::default()).is_datetime());
        assert!(!Value::num(1.0).is_datetime());
        assert!(!Value::Bool(true).is_datetime());
    }
}
