use chrono::NaiveDate;
use regex::Regex;
use scraper::{Html, Selector};
use std::sync::LazyLock;

use crate::models::{Prayer, PrayerTimes, SENTINEL};
use crate::parsers::text_of;
use crate::parsers::time::{normalize_time, sanitize};

/// Headings like "مواقيت الصلاة حسب مدينة الرباط" or "Horaires de la ville de Rabat".
static CITY_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:مدينة|ville\s+de|city\s+of)\s*[:：]?\s*(.+)$")
        .expect("city heading pattern is valid")
});

/// Native and English label terms per prayer.
const LABELS: [(Prayer, &[&str]); 6] = [
    (Prayer::Fajr, &["الفجر", "الصبح", "fajr", "subh", "sobh"]),
    (Prayer::Sunrise, &["الشروق", "sunrise", "shuruq", "chourouq"]),
    (Prayer::Dhuhr, &["الظهر", "dhuhr", "zuhr", "dohr"]),
    (Prayer::Asr, &["العصر", "asr"]),
    (Prayer::Maghrib, &["المغرب", "maghrib"]),
    (Prayer::Isha, &["العشاء", "isha"]),
];

#[derive(Debug, Clone, PartialEq)]
pub struct DailyPrayerTimes {
    pub times: PrayerTimes,
    pub date: NaiveDate,
    pub city: String,
}

/// Reads label/value cells row by row. Anything that can't be read stays the sentinel.
pub fn parse_daily_on(markup: &str, city_name: &str, date: NaiveDate) -> DailyPrayerTimes {
    let document = Html::parse_document(markup);
    let mut result = DailyPrayerTimes {
        times: PrayerTimes::unresolved(),
        date,
        city: heading_city(&document).unwrap_or_else(|| city_name.to_string()),
    };

    let (Ok(row_sel), Ok(cell_sel)) = (Selector::parse("table tr"), Selector::parse("th, td"))
    else {
        return result;
    };

    let rows: Vec<Vec<String>> = document
        .select(&row_sel)
        .map(|row| row.select(&cell_sel).map(|c| text_of(&c)).collect())
        .collect();
    if rows.is_empty() {
        log::warn!("No prayer table in daily markup for {}", result.city);
        return result;
    }

    // a label's value is the next cell in the same row
    for cells in &rows {
        let mut idx = 0;
        while idx + 1 < cells.len() {
            let Some(prayer) = match_label(&cells[idx]) else {
                idx += 1;
                continue;
            };
            if result.times.get(prayer) == SENTINEL {
                result.times.set(prayer, normalize_time(&cells[idx + 1]));
            }
            idx += 2;
        }
    }

    result
}

fn match_label(label: &str) -> Option<Prayer> {
    let label = sanitize(label).to_lowercase();
    LABELS
        .iter()
        .find(|(_, terms)| terms.iter().any(|t| label.contains(t)))
        .map(|(prayer, _)| *prayer)
}

fn heading_city(document: &Html) -> Option<String> {
    let selector = Selector::parse("h1, h2, h3, h4").ok()?;
    document.select(&selector).find_map(|heading| {
        let text = text_of(&heading);
        CITY_HEADING
            .captures(&text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|city| !city.is_empty())
    })
}
