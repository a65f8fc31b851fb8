//! An absolute, timezone-free timestamp.

use chrono::TimeZone;
use chrono_tz::Tz;

use crate::values::ZonedDateTime;
use crate::{ReckonResult, ReckonUnwrap};

/// Milliseconds since the Unix epoch.
///
/// An instant has no zone of its own; displaying it or extracting a
/// calendar property pairs it with a zone first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Instant(i64);

impl Instant {
    /// Creates an instant from epoch milliseconds.
    #[inline]
    #[must_use]
    pub const fn from_epoch_milliseconds(ms: i64) -> Self {
        Self(ms)
    }

    /// This instant as epoch milliseconds.
    #[inline]
    #[must_use]
    pub const fn epoch_milliseconds(&self) -> i64 {
        self.0
    }

    /// Reinterprets the instant in a zone.
    pub fn to_zoned(self, tz: Tz) -> ReckonResult<ZonedDateTime> {
        // Epoch-millisecond timestamps map to exactly one UTC datetime.
        let utc = chrono::Utc
            .timestamp_millis_opt(self.0)
            .single()
            .reckon_unwrap()?;
        Ok(utc.with_timezone(&tz))
    }
}

impl From<&ZonedDateTime> for Instant {
    fn from(zoned: &ZonedDateTime) -> Self {
        Self(zoned.timestamp_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoned_round_trip_preserves_the_timeline() {
        let instant = Instant::from_epoch_milliseconds(1_705_320_000_000);
        let zoned = instant.to_zoned(Tz::America__New_York).expect("zone");
        assert_eq!(Instant::from(&zoned), instant);
    }
}
