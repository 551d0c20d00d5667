//! Quiet-hours evaluation.
//!
//! A quiet window is a daily `[start, end]` range in the user's local time.
//! Both bounds are inclusive. When `start > end` the window wraps past
//! midnight (e.g. `22:00`-`06:00`).
//!
//! Nothing in this module fails: a missing bound, an unparseable time, or an
//! unknown zone degrade to "not quiet" or to UTC respectively.

use chrono::Timelike;
use chrono_tz::Tz;

use crate::preferences::NotificationPreferences;
use crate::types::Timestamp;

const MINUTES_PER_HOUR: u32 = 60;

/// Whether `now` falls inside the user's configured quiet window.
pub fn is_quiet(prefs: &NotificationPreferences, now: Timestamp) -> bool {
    if !prefs.quiet_hours_enabled {
        return false;
    }

    let (Some(start), Some(end)) = (
        prefs.quiet_hours_start.as_deref().and_then(parse_time_of_day),
        prefs.quiet_hours_end.as_deref().and_then(parse_time_of_day),
    ) else {
        return false;
    };

    let local = now.with_timezone(&resolve_timezone(prefs.timezone.as_deref()));
    let current = local.hour() * MINUTES_PER_HOUR + local.minute();

    in_window(current, start, end)
}

/// Inclusive window test on minutes-since-midnight, handling wrap-around.
pub fn in_window(current: u32, start: u32, end: u32) -> bool {
    if start <= end {
        start <= current && current <= end
    } else {
        current >= start || current <= end
    }
}

/// Parse `HH:MM` (or `H:MM`) into minutes since midnight.
pub fn parse_time_of_day(value: &str) -> Option<u32> {
    let (h, m) = value.trim().split_once(':')?;
    if h.is_empty() || h.len() > 2 || m.len() != 2 {
        return None;
    }
    let hour: u32 = h.parse().ok()?;
    let minute: u32 = m.parse().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    Some(hour * MINUTES_PER_HOUR + minute)
}

/// The user's zone, or UTC when unset or unknown.
pub fn resolve_timezone(name: Option<&str>) -> Tz {
    name.and_then(|n| n.parse::<Tz>().ok()).unwrap_or(Tz::UTC)
}
