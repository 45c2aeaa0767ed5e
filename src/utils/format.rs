use chrono::{NaiveDateTime, NaiveTime};

use crate::models::{Prayer, PrayerTimes, SENTINEL};

/// Format a duration in seconds to "Xh Ym" or "Ym" string
pub fn format_duration_secs(secs: i64) -> String {
    if secs <= 0 {
        return "now".to_string();
    }
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// First prayer strictly after `now` on the same day, with seconds until it.
pub fn next_prayer(times: &PrayerTimes, now: NaiveDateTime) -> Option<(Prayer, i64)> {
    times
        .iter()
        .filter(|(_, value)| *value != SENTINEL)
        .filter_map(|(prayer, value)| {
            let time = NaiveTime::parse_from_str(value, "%H:%M").ok()?;
            let secs = (now.date().and_time(time) - now).num_seconds();
            (secs > 0).then_some((prayer, secs))
        })
        .min_by_key(|(_, secs)| *secs)
}

/// Whether a clock time has already passed today. Sentinels never pass.
pub fn is_past(value: &str, now: NaiveTime) -> bool {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map(|t| t < now)
        .unwrap_or(false)
}
