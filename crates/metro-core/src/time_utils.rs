use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::error::{MetroError, Result};

/// Timezone the operator publishes its status in.
pub const DEFAULT_TIMEZONE: &str = "Europe/Lisbon";

/// Parse an IANA timezone name.
///
/// An unknown name is a [`MetroError::Config`]; there is no UTC fallback.
pub fn parse_timezone(tz_name: &str) -> Result<Tz> {
    tz_name
        .trim()
        .parse::<Tz>()
        .map_err(|_| MetroError::Config(format!("unknown timezone \"{}\"", tz_name)))
}

/// Render the `[HH:MM]` marker for `now` in `tz`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use metro_core::time_utils::timestamp_marker;
///
/// let now = Utc.with_ymd_and_hms(2024, 7, 1, 8, 5, 0).unwrap();
/// // Lisbon is UTC+1 in summer.
/// assert_eq!(timestamp_marker(now, chrono_tz::Europe::Lisbon), "[09:05]");
/// ```
pub fn timestamp_marker(now: DateTime<Utc>, tz: Tz) -> String {
    now.with_timezone(&tz).format("[%H:%M]").to_string()
}
