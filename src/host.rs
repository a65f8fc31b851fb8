//! Trait definitions for accessing values from the host environment.
//!
//! The temporal keywords (`now`, `today`, …) and every operation that
//! interprets a plain value "in the system zone" read the clock and zone
//! through these traits, so hosts and tests can substitute their own.

use chrono_tz::Tz;

use crate::ReckonResult;

/// The `HostClock` trait defines an accessor to the host's clock.
pub trait HostClock {
    /// Returns the host's wall clock as milliseconds since the Unix epoch.
    fn get_host_epoch_milliseconds(&self) -> ReckonResult<i64>;
}

/// The `HostTimeZone` trait defines the host's time zone.
pub trait HostTimeZone {
    /// Returns the host's current IANA time zone.
    fn get_host_time_zone(&self) -> ReckonResult<Tz>;
}

/// `HostHooks` marks a type that provides both required host accessors.
pub trait HostHooks: HostClock + HostTimeZone {}

// Implement empty providers: epoch 0 in UTC, for deterministic use.

impl HostClock for () {
    fn get_host_epoch_milliseconds(&self) -> ReckonResult<i64> {
        Ok(0)
    }
}

impl HostTimeZone for () {
    fn get_host_time_zone(&self) -> ReckonResult<Tz> {
        Ok(Tz::UTC)
    }
}

impl HostHooks for () {}

/// A fixed clock and zone, primarily for tests and reproducible replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedHooks {
    /// The frozen wall clock, in milliseconds since the Unix epoch.
    pub epoch_ms: i64,
    /// The reported host time zone.
    pub tz: Tz,
}

impl HostClock for FixedHooks {
    fn get_host_epoch_milliseconds(&self) -> ReckonResult<i64> {
        Ok(self.epoch_ms)
    }
}

impl HostTimeZone for FixedHooks {
    fn get_host_time_zone(&self) -> ReckonResult<Tz> {
        Ok(self.tz)
    }
}

impl HostHooks for FixedHooks {}
