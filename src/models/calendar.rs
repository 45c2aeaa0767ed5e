use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::PrayerTimes;

/// Shown instead of a numeral for the day that awaits moon sighting.
pub const MOON_SIGHTING_MARKER: &str = "*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "day", rename_all = "snake_case")]
pub enum HijriDay {
    Numbered(u32),
    /// Final day of the month, not yet confirmed by observation.
    PendingSighting(u32),
}

impl HijriDay {
    pub fn number(&self) -> u32 {
        match self {
            HijriDay::Numbered(n) | HijriDay::PendingSighting(n) => *n,
        }
    }

    pub fn label(&self) -> String {
        match self {
            HijriDay::Numbered(n) => n.to_string(),
            HijriDay::PendingSighting(_) => MOON_SIGHTING_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrayerDay {
    pub times: PrayerTimes,
    pub weekday: String,
    pub hijri_day: HijriDay,
    pub hijri_month: String,
    pub solar_day: u32,
    pub solar_month: String,
    /// Concrete Gregorian date, when the solar day/month/year combine to a real date.
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyCalendar {
    pub city_id: String,
    pub hijri_month: String,
    pub hijri_transliteration: Option<String>,
    pub solar_months: Vec<String>,
    /// Keyed by Hijri day number.
    pub days: BTreeMap<u32, PrayerDay>,
    pub total_days: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// Exclusive: the calendar must be refetched once today reaches this date.
    pub expires_at: Option<NaiveDate>,
}

impl MonthlyCalendar {
    pub fn empty(city_id: &str) -> Self {
        Self {
            city_id: city_id.to_string(),
            hijri_month: String::new(),
            hijri_transliteration: None,
            solar_months: Vec::new(),
            days: BTreeMap::new(),
            total_days: 0,
            first_date: None,
            last_date: None,
            expires_at: None,
        }
    }

    /// Builds the calendar and derives the count and date bounds from `days`.
    pub fn from_days(
        city_id: &str,
        hijri_month: String,
        hijri_transliteration: Option<String>,
        solar_months: Vec<String>,
        days: BTreeMap<u32, PrayerDay>,
    ) -> Self {
        let first_date = days.values().filter_map(|d| d.date).min();
        let last_date = days.values().filter_map(|d| d.date).max();
        Self {
            city_id: city_id.to_string(),
            hijri_month,
            hijri_transliteration,
            solar_months,
            total_days: days.len(),
            days,
            first_date,
            last_date,
            expires_at: last_date.map(|d| d + Duration::days(1)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        match self.expires_at {
            Some(expires_at) => today >= expires_at,
            None => true,
        }
    }

    pub fn day_for_date(&self, date: NaiveDate) -> Option<&PrayerDay> {
        self.days.values().find(|d| d.date == Some(date))
    }

    pub fn today(&self, today: NaiveDate) -> Option<&PrayerDay> {
        self.day_for_date(today)
    }

    pub fn tomorrow(&self, today: NaiveDate) -> Option<&PrayerDay> {
        today.succ_opt().and_then(|d| self.day_for_date(d))
    }

    pub fn by_hijri_day(&self, day: u32) -> Option<&PrayerDay> {
        self.days.get(&day)
    }

    /// Gregorian dates in Hijri-day order.
    pub fn gregorian_dates(&self) -> Vec<NaiveDate> {
        self.days.values().filter_map(|d| d.date).collect()
    }

    pub fn all_days(&self) -> Vec<&PrayerDay> {
        self.days.values().collect()
    }

    /// Day records keyed by the Hijri day number rendered as a string.
    pub fn keyed_by_hijri(&self) -> BTreeMap<String, &PrayerDay> {
        self.days.iter().map(|(k, v)| (k.to_string(), v)).collect()
    }
}
