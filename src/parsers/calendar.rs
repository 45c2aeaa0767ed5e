use chrono::{Datelike, NaiveDate};
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;

use crate::models::{HijriDay, MonthlyCalendar, Prayer, PrayerDay, PrayerTimes};
use crate::parsers::months::{hijri_transliteration, solar_month_number, split_month_list};
use crate::parsers::text_of;
use crate::parsers::time::{leading_number, normalize_time};

/// Cells per data row: weekday, Hijri day, solar day, then the six times.
const DATA_CELLS: usize = 9;

/// Solar day assumed when the cell has no digits. Sits between the two
/// thresholds below so it can never trigger a month transition by itself.
const SOLAR_DAY_FALLBACK: u32 = 15;

/// A drop from above `TRANSITION_FROM` to at most `TRANSITION_TO` starts the second solar month.
const TRANSITION_FROM: u32 = 20;
const TRANSITION_TO: u32 = 10;

/// Canonical (Moroccan Arabic) spelling per Gregorian month.
const CANONICAL_SOLAR_NAMES: [&str; 12] = [
    "يناير", "فبراير", "مارس", "أبريل", "ماي", "يونيو", "يوليوز", "غشت", "شتنبر", "أكتوبر",
    "نونبر", "دجنبر",
];

#[derive(Debug)]
struct RawRow {
    weekday: String,
    hijri_day: Option<u32>,
    solar_day: u32,
    times: PrayerTimes,
}

#[derive(Debug, Clone, PartialEq)]
struct SolarMonth {
    name: String,
    number: Option<u32>,
    year: i32,
}

/// Parses a month table; `today` decides which year each listed month belongs to.
/// Never fails: a document without a table yields an empty calendar.
pub fn parse_calendar_on(markup: &str, city_id: &str, today: NaiveDate) -> MonthlyCalendar {
    let document = Html::parse_document(markup);
    let (Ok(table_sel), Ok(row_sel), Ok(cell_sel)) = (
        Selector::parse("table"),
        Selector::parse("tr"),
        Selector::parse("th, td"),
    ) else {
        return MonthlyCalendar::empty(city_id);
    };

    let Some(table) = document.select(&table_sel).next() else {
        log::warn!("No table in calendar markup for city {}", city_id);
        return MonthlyCalendar::empty(city_id);
    };

    let mut rows = table.select(&row_sel);
    let Some(header) = rows.next() else {
        log::warn!("Calendar table for city {} has no rows", city_id);
        return MonthlyCalendar::empty(city_id);
    };

    let header_cells = cell_texts(&header, &cell_sel);
    let hijri_label = header_cells.get(1).cloned().unwrap_or_default();
    let solar_label = header_cells.get(2).cloned().unwrap_or_default();

    let raw_rows: Vec<RawRow> = rows
        .enumerate()
        .filter_map(|(idx, row)| {
            let cells = cell_texts(&row, &cell_sel);
            let parsed = parse_row(&cells);
            if parsed.is_none() {
                log::debug!(
                    "Skipping calendar row {} with {} cells (city {})",
                    idx + 1,
                    cells.len(),
                    city_id
                );
            }
            parsed
        })
        .collect();

    if raw_rows.is_empty() {
        log::warn!("Calendar table for city {} has no usable data rows", city_id);
        return MonthlyCalendar::empty(city_id);
    }

    let months = solar_months(&solar_label, today);
    let transition = find_transition(&raw_rows);
    let hijri_month = hijri_label.trim().to_string();
    let transliteration = hijri_transliteration(&hijri_month).map(str::to_string);

    let max_observed = raw_rows.iter().filter_map(|r| r.hijri_day).max().unwrap_or(0);
    let mut next_pending = max_observed + 1;
    let mut days = BTreeMap::new();
    let mut previous_solar: Option<u32> = None;
    let mut spans_second = false;

    for (idx, row) in raw_rows.into_iter().enumerate() {
        // a pending row never opens the second month but still lands after the drop
        let in_second = transition.is_some_and(|t| idx >= t)
            || (row.hijri_day.is_none() && crosses_month(previous_solar, row.solar_day));
        spans_second |= in_second;
        previous_solar = Some(row.solar_day);
        let month = if in_second { &months.1 } else { &months.0 };

        let hijri_day = match row.hijri_day {
            Some(n) => HijriDay::Numbered(n),
            None => {
                let n = next_pending;
                next_pending += 1;
                HijriDay::PendingSighting(n)
            }
        };

        let date = month
            .number
            .and_then(|m| NaiveDate::from_ymd_opt(month.year, m, row.solar_day));

        let day = PrayerDay {
            times: row.times,
            weekday: row.weekday,
            hijri_day,
            hijri_month: hijri_month.clone(),
            solar_day: row.solar_day,
            solar_month: month.name.clone(),
            date,
        };

        if let Some(previous) = days.insert(hijri_day.number(), day) {
            log::warn!(
                "Duplicate Hijri day {} in calendar for city {} (replaced {})",
                hijri_day.number(),
                city_id,
                previous.weekday
            );
        }
    }

    let mut listed = vec![months.0.name.clone()];
    if spans_second && months.1 != months.0 {
        listed.push(months.1.name.clone());
    }

    MonthlyCalendar::from_days(city_id, hijri_month, transliteration, listed, days)
}

fn cell_texts(row: &ElementRef, cell_sel: &Selector) -> Vec<String> {
    row.select(cell_sel).map(|cell| text_of(&cell)).collect()
}

fn parse_row(cells: &[String]) -> Option<RawRow> {
    if cells.len() < DATA_CELLS {
        return None;
    }

    let mut times = PrayerTimes::unresolved();
    for (prayer, raw) in Prayer::ALL.iter().zip(&cells[3..DATA_CELLS]) {
        times.set(*prayer, normalize_time(raw));
    }

    Some(RawRow {
        weekday: cells[0].trim().to_string(),
        hijri_day: leading_number(&cells[1]),
        solar_day: leading_number(&cells[2]).unwrap_or(SOLAR_DAY_FALLBACK),
        times,
    })
}

/// Index of the first row that belongs to the second solar month.
/// Rows awaiting moon sighting are ignored.
fn find_transition(rows: &[RawRow]) -> Option<usize> {
    let mut previous: Option<u32> = None;
    for (idx, row) in rows.iter().enumerate() {
        if row.hijri_day.is_none() {
            continue;
        }
        if crosses_month(previous, row.solar_day) {
            return Some(idx);
        }
        previous = Some(row.solar_day);
    }
    None
}

fn crosses_month(previous: Option<u32>, current: u32) -> bool {
    previous.is_some_and(|p| p > TRANSITION_FROM) && current <= TRANSITION_TO
}

/// First and second solar month for the table. When the header names only
/// one month, the second is the month that follows it.
fn solar_months(label: &str, today: NaiveDate) -> (SolarMonth, SolarMonth) {
    let names = split_month_list(label);
    let first_name = names.first().cloned().unwrap_or_default();
    let first_number = solar_month_number(&first_name);
    if first_number.is_none() && !first_name.is_empty() {
        log::warn!("Unrecognised solar month '{}'", first_name);
    }

    let (second_name, second_number) = match names.get(1) {
        Some(name) => (name.clone(), solar_month_number(name)),
        None => match first_number {
            Some(m) => {
                let next = m % 12 + 1;
                (CANONICAL_SOLAR_NAMES[next as usize - 1].to_string(), Some(next))
            }
            None => (first_name.clone(), None),
        },
    };

    let (first_year, second_year) = infer_years(first_number, second_number, names.len(), today);

    (
        SolarMonth {
            name: first_name,
            number: first_number,
            year: first_year,
        },
        SolarMonth {
            name: second_name,
            number: second_number,
            year: second_year,
        },
    )
}

/// Years for the first and second listed months, judged against the real date.
fn infer_years(
    first: Option<u32>,
    second: Option<u32>,
    listed: usize,
    today: NaiveDate,
) -> (i32, i32) {
    let year = today.year();
    let current_month = today.month();

    match (first, second) {
        (Some(12), Some(1)) if listed >= 2 => {
            if current_month == 1 {
                (year - 1, year)
            } else {
                (year, year + 1)
            }
        }
        (Some(m), _) if listed <= 1 => {
            let y = if m < current_month { year + 1 } else { year };
            (y, if m == 12 { y + 1 } else { y })
        }
        (Some(m1), Some(m2)) => {
            let y2 = if m2 < current_month { year + 1 } else { year };
            (if m1 > m2 { y2 - 1 } else { y2 }, y2)
        }
        (None, Some(m2)) => {
            let y2 = if m2 < current_month { year + 1 } else { year };
            (y2, y2)
        }
        _ => (year, year),
    }
}
