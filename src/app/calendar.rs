use chrono::NaiveDate;

use crate::db::StoreError;
use crate::models::MonthlyCalendar;
use crate::parsers::parse_calendar_on;
use crate::prayer_times::{HtmlSource, SourceError};

/// Where parsed month tables are kept between runs.
pub trait CalendarCache: Send + Sync {
    fn cached_calendar(&self, city_id: &str) -> Result<Option<MonthlyCalendar>, StoreError>;
    fn store_calendar(&self, calendar: &MonthlyCalendar) -> Result<(), StoreError>;
}

/// Serves the month table for a city, refetching it once `today` reaches
/// its expiry date.
pub struct CalendarService<'a> {
    html: &'a dyn HtmlSource,
    cache: &'a dyn CalendarCache,
}

impl<'a> CalendarService<'a> {
    pub fn new(html: &'a dyn HtmlSource, cache: &'a dyn CalendarCache) -> Self {
        Self { html, cache }
    }

    pub async fn month(&self, city_id: &str, today: NaiveDate) -> Result<MonthlyCalendar, SourceError> {
        match self.cache.cached_calendar(city_id) {
            Ok(Some(calendar)) if !calendar.is_empty() && !calendar.is_expired(today) => {
                log::debug!("Using cached calendar for city {}", city_id);
                return Ok(calendar);
            }
            Ok(Some(calendar)) => {
                log::info!("Cached calendar for city {} expired at {:?}", city_id, calendar.expires_at);
            }
            Ok(None) => {}
            Err(error) => log::warn!("Could not read cached calendar: {}", error),
        }

        let markup = self.html.monthly_markup(city_id).await?;
        let calendar = parse_calendar_on(&markup, city_id, today);
        if calendar.is_empty() {
            return Err(SourceError::Parse(format!("no calendar rows for city {city_id}")));
        }

        if let Err(error) = self.cache.store_calendar(&calendar) {
            log::warn!("Could not cache calendar for city {}: {}", city_id, error);
        }
        Ok(calendar)
    }
}
