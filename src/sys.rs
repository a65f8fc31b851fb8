//! System clock and time zone access.

use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono_tz::Tz;

use crate::host::{HostClock, HostHooks, HostTimeZone};
use crate::{ReckonError, ReckonResult};

#[inline]
pub(crate) fn get_system_timezone() -> ReckonResult<Tz> {
    let name = iana_time_zone::get_timezone()
        .map_err(|e| ReckonError::timezone_unknown().with_message(e.to_string()))?;
    Tz::from_str(&name).map_err(|e| ReckonError::timezone_unknown().with_message(e.to_string()))
}

/// Returns the system time in milliseconds since the Unix epoch.
pub(crate) fn get_system_milliseconds() -> ReckonResult<i64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| ReckonError::assert().with_message(e.to_string()))
        .map(|d| d.as_millis() as i64)
}

/// Host hooks backed by the process wall clock and the OS time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysHooks;

impl HostClock for SysHooks {
    fn get_host_epoch_milliseconds(&self) -> ReckonResult<i64> {
        get_system_milliseconds()
    }
}

impl HostTimeZone for SysHooks {
    fn get_host_time_zone(&self) -> ReckonResult<Tz> {
        get_system_timezone()
    }
}

impl HostHooks for SysHooks {}
