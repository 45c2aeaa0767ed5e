use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::PrayerTimes;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceUsed {
    ScrapedRemote,
    OfflineCalculated,
    ApiRemote,
    None,
}

impl SourceUsed {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceUsed::ScrapedRemote => "scraped_remote",
            SourceUsed::OfflineCalculated => "offline_calculated",
            SourceUsed::ApiRemote => "api_remote",
            SourceUsed::None => "none",
        }
    }
}

impl std::fmt::Display for SourceUsed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Parses decimal strings; anything unparseable counts as zero.
    pub fn from_strings(latitude: &str, longitude: &str) -> Self {
        Self {
            latitude: latitude.trim().parse().unwrap_or(0.0),
            longitude: longitude.trim().parse().unwrap_or(0.0),
        }
    }

    pub fn is_zero(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }
}

/// Outcome of one resolution pass. Never persisted as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPrayerTimes {
    pub source_used: SourceUsed,
    pub times: PrayerTimes,
    pub date: NaiveDate,
    pub coordinates: Option<Coordinates>,
    pub city: Option<String>,
    /// Literal parameters sent to the source that produced `times`.
    pub input_settings: BTreeMap<String, String>,
}

impl ResolvedPrayerTimes {
    pub fn total_failure(date: NaiveDate) -> Self {
        Self {
            source_used: SourceUsed::None,
            times: PrayerTimes::unresolved(),
            date,
            coordinates: None,
            city: None,
            input_settings: BTreeMap::new(),
        }
    }

    pub fn is_total_failure(&self) -> bool {
        self.source_used == SourceUsed::None
    }
}
