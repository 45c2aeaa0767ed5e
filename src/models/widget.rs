use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::PrayerTimes;

/// Display settings handed explicitly to whatever builds a widget record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WidgetTheme {
    pub hue: f32,
    pub dark_mode: bool,
    /// 0.0 is opaque, 1.0 fully transparent.
    pub transparency: f32,
}

/// Snapshot the widget reads. Rewritten wholesale on every successful refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetCacheRecord {
    pub times: PrayerTimes,
    pub source: String,
    pub location: String,
    pub hue: f32,
    pub dark_mode: bool,
    pub transparency: f32,
    pub written_at: DateTime<FixedOffset>,
}

impl WidgetCacheRecord {
    pub fn written_date(&self) -> NaiveDate {
        self.written_at.date_naive()
    }

    /// Fresh when written on the same local calendar day as `today`.
    pub fn is_fresh(&self, today: NaiveDate) -> bool {
        self.written_date() == today
    }
}
