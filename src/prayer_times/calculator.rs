use anyhow::{anyhow, Result};
use chrono::{FixedOffset, NaiveDate};
use salah::prelude::*;
use std::collections::BTreeMap;

use crate::models::{Coordinates as Coords, Prayer as PrayerName, PrayerTimes};
use crate::prayer_times::SourceError;

/// Offline astronomical calculation, consumed as a black box.
pub trait OfflineCalculator: Send + Sync {
    fn calculate(&self, coords: Coords, date: NaiveDate) -> Result<PrayerTimes, SourceError>;

    /// Parameters reported back in `ResolvedPrayerTimes::input_settings`.
    fn settings(&self, coords: Coords) -> BTreeMap<String, String>;
}

pub struct SalahCalculator {
    pub method_str: String,
    pub madhab_str: String,
    pub tz_offset_minutes: i32,
}

impl SalahCalculator {
    pub fn new(method: &str, madhab: &str, tz_offset_minutes: i32) -> Result<Self> {
        // Validate method + madhab early
        parse_method(method)?;
        parse_madhab(madhab)?;
        FixedOffset::east_opt(tz_offset_minutes * 60)
            .ok_or_else(|| anyhow!("Invalid timezone offset: {}", tz_offset_minutes))?;
        Ok(Self {
            method_str: method.to_string(),
            madhab_str: madhab.to_string(),
            tz_offset_minutes,
        })
    }
}

impl OfflineCalculator for SalahCalculator {
    fn calculate(&self, coords: Coords, date: NaiveDate) -> Result<PrayerTimes, SourceError> {
        let method =
            parse_method(&self.method_str).map_err(|e| SourceError::Parse(e.to_string()))?;
        let madhab =
            parse_madhab(&self.madhab_str).map_err(|e| SourceError::Parse(e.to_string()))?;
        let params = Configuration::with(method, madhab);

        let times = PrayerSchedule::new()
            .on(date)
            .for_location(Coordinates::new(coords.latitude, coords.longitude))
            .with_configuration(params)
            .calculate()
            .map_err(|e| SourceError::EmptyResult(format!("prayer calculation failed: {e}")))?;

        let offset = FixedOffset::east_opt(self.tz_offset_minutes * 60).ok_or_else(|| {
            SourceError::Parse(format!("invalid timezone offset: {}", self.tz_offset_minutes))
        })?;

        let to_local = |utc: chrono::DateTime<chrono::Utc>| -> String {
            utc.with_timezone(&offset).format("%H:%M").to_string()
        };

        let mut result = PrayerTimes::unresolved();
        result.set(PrayerName::Fajr, to_local(times.time(Prayer::Fajr)));
        result.set(PrayerName::Sunrise, to_local(times.time(Prayer::Sunrise)));
        result.set(PrayerName::Dhuhr, to_local(times.time(Prayer::Dhuhr)));
        result.set(PrayerName::Asr, to_local(times.time(Prayer::Asr)));
        result.set(PrayerName::Maghrib, to_local(times.time(Prayer::Maghrib)));
        result.set(PrayerName::Isha, to_local(times.time(Prayer::Isha)));
        Ok(result)
    }

    fn settings(&self, coords: Coords) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("latitude".to_string(), coords.latitude.to_string()),
            ("longitude".to_string(), coords.longitude.to_string()),
            ("method".to_string(), self.method_str.clone()),
            ("madhab".to_string(), self.madhab_str.clone()),
            ("timezone_offset".to_string(), self.tz_offset_minutes.to_string()),
        ])
    }
}

/// Stands in when offline mode is off; the resolver never asks it for times.
pub struct DisabledCalculator;

impl OfflineCalculator for DisabledCalculator {
    fn calculate(&self, _coords: Coords, _date: NaiveDate) -> Result<PrayerTimes, SourceError> {
        Err(SourceError::EmptyResult("offline calculation is disabled".to_string()))
    }

    fn settings(&self, _coords: Coords) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// The salah calculator when `enabled`, else [`DisabledCalculator`]. Method
/// and madhab are only validated when they will be used.
pub fn offline_calculator(
    enabled: bool,
    method: &str,
    madhab: &str,
    tz_offset_minutes: i32,
) -> Result<Box<dyn OfflineCalculator>> {
    if !enabled {
        return Ok(Box::new(DisabledCalculator));
    }
    Ok(Box::new(SalahCalculator::new(method, madhab, tz_offset_minutes)?))
}

fn parse_method(s: &str) -> Result<Method> {
    match s {
        "MuslimWorldLeague" => Ok(Method::MuslimWorldLeague),
        "Egyptian" => Ok(Method::Egyptian),
        "Karachi" => Ok(Method::Karachi),
        "UmmAlQura" => Ok(Method::UmmAlQura),
        "Dubai" => Ok(Method::Dubai),
        "MoonsightingCommittee" => Ok(Method::MoonsightingCommittee),
        "NorthAmerica" => Ok(Method::NorthAmerica),
        "Kuwait" => Ok(Method::Kuwait),
        "Qatar" => Ok(Method::Qatar),
        "Singapore" => Ok(Method::Singapore),
        "Tehran" => Ok(Method::Tehran),
        "Turkey" => Ok(Method::Turkey),
        "Other" => Ok(Method::Other),
        _ => Err(anyhow!("Unknown calculation method: '{}'", s)),
    }
}

fn parse_madhab(s: &str) -> Result<Madhab> {
    match s {
        "Hanafi" => Ok(Madhab::Hanafi),
        "Shafi" | "Shafi'i" => Ok(Madhab::Shafi),
        _ => Err(anyhow!("Unknown madhab: '{}'", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::time::is_clock_time;

    #[test]
    fn rejects_unknown_method_and_madhab() {
        assert!(SalahCalculator::new("Moroccan", "Shafi", 60).is_err());
        assert!(SalahCalculator::new("MuslimWorldLeague", "Maliki", 60).is_err());
        assert!(SalahCalculator::new("MuslimWorldLeague", "Shafi", 60).is_ok());
    }

    #[test]
    fn bad_settings_only_matter_in_offline_mode() {
        let rabat = Coords {
            latitude: 34.0209,
            longitude: -6.8416,
        };
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();

        let disabled = offline_calculator(false, "Moroccan", "Maliki", 60).unwrap();
        assert!(disabled.calculate(rabat, date).is_err());
        assert!(disabled.settings(rabat).is_empty());

        assert!(offline_calculator(true, "Moroccan", "Maliki", 60).is_err());
        assert!(offline_calculator(true, "MuslimWorldLeague", "Shafi", 60).is_ok());
    }

    #[test]
    fn computes_six_ordered_clock_times() {
        let calc = SalahCalculator::new("MuslimWorldLeague", "Shafi", 60).unwrap();
        let rabat = Coords {
            latitude: 34.0209,
            longitude: -6.8416,
        };
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let times = calc.calculate(rabat, date).unwrap();

        assert!(times.iter().all(|(_, t)| is_clock_time(t)));
        // HH:MM strings compare in clock order
        assert!(times.fajr < times.sunrise);
        assert!(times.sunrise < times.dhuhr);
        assert!(times.dhuhr < times.asr);
        assert!(times.asr < times.maghrib);
        assert!(times.maghrib < times.isha);
    }

    #[test]
    fn settings_echo_inputs() {
        let calc = SalahCalculator::new("Egyptian", "Hanafi", 120).unwrap();
        let settings = calc.settings(Coords {
            latitude: 30.0,
            longitude: 31.25,
        });
        assert_eq!(settings["method"], "Egyptian");
        assert_eq!(settings["longitude"], "31.25");
        assert_eq!(settings["timezone_offset"], "120");
    }
}
