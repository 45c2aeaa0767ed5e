use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::models::{Coordinates, Prayer, PrayerTimes, ResolvedPrayerTimes, SourceUsed, SENTINEL};
use crate::parsers::parse_daily_on;
use crate::parsers::time::{is_clock_time, strip_timezone_suffix};
use crate::prayer_times::calculator::OfflineCalculator;
use crate::prayer_times::http::{ApiRequest, HtmlSource, TimingApi};
use crate::prayer_times::SourceError;

#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    pub prefer_scraped: bool,
    pub offline_mode: bool,
    pub city_id: String,
    pub city_name: String,
    pub latitude: String,
    pub longitude: String,
}

impl ResolverConfig {
    pub fn coordinates(&self) -> Coordinates {
        Coordinates::from_strings(&self.latitude, &self.longitude)
    }
}

/// Tries each source in priority order, one at a time, and settles on the
/// first one that yields usable times.
pub struct SourceResolver<'a> {
    html: &'a dyn HtmlSource,
    api: &'a dyn TimingApi,
    offline: &'a dyn OfflineCalculator,
}

impl<'a> SourceResolver<'a> {
    pub fn new(
        html: &'a dyn HtmlSource,
        api: &'a dyn TimingApi,
        offline: &'a dyn OfflineCalculator,
    ) -> Self {
        Self { html, api, offline }
    }

    /// Never fails: when every source is exhausted the result has
    /// `SourceUsed::None` and all six times set to the sentinel.
    pub async fn resolve(&self, config: &ResolverConfig, date: NaiveDate) -> ResolvedPrayerTimes {
        let coords = config.coordinates();

        if config.prefer_scraped {
            match self.try_scraped(config, date).await {
                Ok(resolved) => return resolved,
                Err(error) => log::warn!("Scraped source failed for {}: {}", config.city_id, error),
            }
        }

        if config.offline_mode && !coords.is_zero() {
            match self.try_offline(config, coords, date) {
                Ok(resolved) => return resolved,
                Err(error) => log::warn!("Offline calculation failed: {}", error),
            }
        }

        if coords.is_zero() {
            log::warn!("No coordinates configured; skipping timing API");
        } else {
            log::info!("Falling back to timing API for {:?}", coords);
            match self.try_api(config, coords, date).await {
                Ok(resolved) => return resolved,
                Err(error) => log::warn!("Timing API failed: {}", error),
            }
        }

        log::error!("Every prayer time source failed for {}", date);
        ResolvedPrayerTimes::total_failure(date)
    }

    async fn try_scraped(
        &self,
        config: &ResolverConfig,
        date: NaiveDate,
    ) -> Result<ResolvedPrayerTimes, SourceError> {
        let markup = self.html.daily_markup(&config.city_id).await?;
        let daily = parse_daily_on(&markup, &config.city_name, date);
        if !daily.times.is_complete() {
            let missing: Vec<&str> = daily
                .times
                .iter()
                .filter(|(_, t)| *t == SENTINEL)
                .map(|(p, _)| p.as_str())
                .collect();
            return Err(SourceError::EmptyResult(format!(
                "daily page is missing {}",
                missing.join(", ")
            )));
        }

        Ok(ResolvedPrayerTimes {
            source_used: SourceUsed::ScrapedRemote,
            times: daily.times,
            date,
            coordinates: None,
            city: Some(daily.city),
            input_settings: BTreeMap::from([
                ("city_id".to_string(), config.city_id.clone()),
                ("city_name".to_string(), config.city_name.clone()),
            ]),
        })
    }

    fn try_offline(
        &self,
        config: &ResolverConfig,
        coords: Coordinates,
        date: NaiveDate,
    ) -> Result<ResolvedPrayerTimes, SourceError> {
        let times = self.offline.calculate(coords, date)?;
        if times.is_unresolved() {
            return Err(SourceError::EmptyResult("calculator returned no times".to_string()));
        }

        Ok(ResolvedPrayerTimes {
            source_used: SourceUsed::OfflineCalculated,
            times,
            date,
            coordinates: Some(coords),
            city: Some(config.city_name.clone()),
            input_settings: self.offline.settings(coords),
        })
    }

    async fn try_api(
        &self,
        config: &ResolverConfig,
        coords: Coordinates,
        date: NaiveDate,
    ) -> Result<ResolvedPrayerTimes, SourceError> {
        let request = ApiRequest::new(coords, day_timestamp(date));
        let raw = self.api.timings(&request).await?;

        let mut times = PrayerTimes::unresolved();
        for prayer in Prayer::ALL {
            let Some(value) = raw.get(prayer.display_name()) else {
                continue;
            };
            let stripped = strip_timezone_suffix(value.trim());
            if is_clock_time(stripped) {
                times.set(prayer, stripped);
            } else {
                log::warn!(
                    "{}",
                    SourceError::Validation(format!("{} = '{}'", prayer.as_str(), value))
                );
            }
        }
        if times.is_unresolved() {
            return Err(SourceError::EmptyResult("no valid timings in response".to_string()));
        }

        let mut input_settings: BTreeMap<String, String> = request
            .query()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        input_settings.insert("timestamp".to_string(), request.timestamp.to_string());

        Ok(ResolvedPrayerTimes {
            source_used: SourceUsed::ApiRemote,
            times,
            date,
            coordinates: Some(coords),
            city: Some(config.city_name.clone()),
            input_settings,
        })
    }
}

/// Unix timestamp of noon UTC on `date`.
fn day_timestamp(date: NaiveDate) -> i64 {
    date.and_hms_opt(12, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const DAILY_PAGE: &str = r#"<h2>مدينة الرباط</h2><table>
        <tr><td>الفجر</td><td>06:12</td><td>الشروق</td><td>07:37</td></tr>
        <tr><td>الظهر</td><td>13:11</td><td>العصر</td><td>16:24</td></tr>
        <tr><td>المغرب</td><td>18:46</td><td>العشاء</td><td>20:03</td></tr></table>"#;

    #[derive(Default)]
    struct FakeHtml {
        daily: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl HtmlSource for FakeHtml {
        async fn daily_markup(&self, _city_id: &str) -> Result<String, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.daily
                .map(str::to_string)
                .ok_or_else(|| SourceError::Network("connection reset".to_string()))
        }

        async fn monthly_markup(&self, _city_id: &str) -> Result<String, SourceError> {
            Err(SourceError::Network("not used".to_string()))
        }
    }

    #[derive(Default)]
    struct FakeApi {
        timings: Option<HashMap<String, String>>,
        seen: std::sync::Mutex<Vec<ApiRequest>>,
    }

    #[async_trait]
    impl TimingApi for FakeApi {
        async fn timings(
            &self,
            request: &ApiRequest,
        ) -> Result<HashMap<String, String>, SourceError> {
            self.seen.lock().unwrap().push(request.clone());
            self.timings
                .clone()
                .ok_or_else(|| SourceError::Network("http 503".to_string()))
        }
    }

    struct FakeOffline {
        times: Option<PrayerTimes>,
    }

    impl OfflineCalculator for FakeOffline {
        fn calculate(&self, _c: Coordinates, _d: NaiveDate) -> Result<PrayerTimes, SourceError> {
            self.times
                .clone()
                .ok_or_else(|| SourceError::EmptyResult("no result".to_string()))
        }

        fn settings(&self, _c: Coordinates) -> BTreeMap<String, String> {
            BTreeMap::from([("method".to_string(), "fake".to_string())])
        }
    }

    fn api_timings() -> HashMap<String, String> {
        [
            ("Fajr", "06:10 (+01)"),
            ("Sunrise", "07:36 (+01)"),
            ("Dhuhr", "13:10 (+01)"),
            ("Asr", "16:23 (+01)"),
            ("Maghrib", "18:45 (+01)"),
            ("Isha", "20:08 (+01)"),
            ("Midnight", "00:28 (+01)"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    fn offline_times() -> PrayerTimes {
        let mut t = PrayerTimes::unresolved();
        for (p, v) in Prayer::ALL.into_iter().zip(["06:00", "07:30", "13:00", "16:00", "18:40", "20:00"]) {
            t.set(p, v);
        }
        t
    }

    fn config(prefer_scraped: bool, offline_mode: bool) -> ResolverConfig {
        ResolverConfig {
            prefer_scraped,
            offline_mode,
            city_id: "1".to_string(),
            city_name: "Rabat".to_string(),
            latitude: "34.0209".to_string(),
            longitude: "-6.8416".to_string(),
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    #[tokio::test]
    async fn scraped_source_wins_when_complete() {
        let html = FakeHtml {
            daily: Some(DAILY_PAGE),
            ..Default::default()
        };
        let api = FakeApi {
            timings: Some(api_timings()),
            ..Default::default()
        };
        let offline = FakeOffline { times: Some(offline_times()) };

        let resolved = SourceResolver::new(&html, &api, &offline)
            .resolve(&config(true, true), date())
            .await;

        assert_eq!(resolved.source_used, SourceUsed::ScrapedRemote);
        assert_eq!(resolved.times.isha, "20:03");
        assert_eq!(resolved.city.as_deref(), Some("الرباط"));
        assert!(api.seen.lock().unwrap().is_empty(), "lower sources must not be queried");
    }

    #[tokio::test]
    async fn failing_scrape_falls_back_to_api_with_used_coordinates() {
        let html = FakeHtml::default();
        let api = FakeApi {
            timings: Some(api_timings()),
            ..Default::default()
        };
        let offline = FakeOffline { times: Some(offline_times()) };

        let resolved = SourceResolver::new(&html, &api, &offline)
            .resolve(&config(true, false), date())
            .await;

        assert_eq!(html.calls.load(Ordering::SeqCst), 1);
        assert_eq!(resolved.source_used, SourceUsed::ApiRemote);
        assert_eq!(resolved.times.fajr, "06:10");
        assert_eq!(resolved.times.isha, "20:08");
        assert_eq!(resolved.input_settings["latitude"], "34.0209");
        assert_eq!(resolved.input_settings["longitude"], "-6.8416");
        assert_eq!(resolved.input_settings["method"], "99");
        assert_eq!(
            resolved.coordinates,
            Some(Coordinates {
                latitude: 34.0209,
                longitude: -6.8416
            })
        );
    }

    #[tokio::test]
    async fn incomplete_scrape_is_treated_as_failure() {
        let html = FakeHtml {
            daily: Some("<table><tr><td>الفجر</td><td>06:12</td></tr></table>"),
            ..Default::default()
        };
        let api = FakeApi::default();
        let offline = FakeOffline { times: Some(offline_times()) };

        let resolved = SourceResolver::new(&html, &api, &offline)
            .resolve(&config(true, true), date())
            .await;

        assert_eq!(resolved.source_used, SourceUsed::OfflineCalculated);
        assert_eq!(resolved.input_settings["method"], "fake");
    }

    #[tokio::test]
    async fn offline_is_skipped_without_coordinates() {
        let html = FakeHtml::default();
        let api = FakeApi::default();
        let offline = FakeOffline { times: Some(offline_times()) };
        let mut cfg = config(false, true);
        cfg.latitude = "0".to_string();
        cfg.longitude = "not a number".to_string();

        let resolved = SourceResolver::new(&html, &api, &offline).resolve(&cfg, date()).await;

        assert_eq!(resolved.source_used, SourceUsed::None);
        assert_eq!(html.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn total_failure_is_all_sentinel() {
        let html = FakeHtml::default();
        let api = FakeApi::default();
        let offline = FakeOffline { times: None };

        let resolved = SourceResolver::new(&html, &api, &offline)
            .resolve(&config(true, true), date())
            .await;

        assert_eq!(resolved.source_used, SourceUsed::None);
        assert!(resolved.times.is_unresolved());
        assert_eq!(resolved.date, date());
        assert_eq!(api.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn api_with_only_invalid_times_is_empty() {
        let html = FakeHtml::default();
        let api = FakeApi {
            timings: Some(HashMap::from([("Fajr".to_string(), "--".to_string())])),
            ..Default::default()
        };
        let offline = FakeOffline { times: None };

        let resolved = SourceResolver::new(&html, &api, &offline)
            .resolve(&config(false, false), date())
            .await;
        assert_eq!(resolved.source_used, SourceUsed::None);
    }

    #[test]
    fn day_timestamp_is_noon_utc() {
        assert_eq!(day_timestamp(date()) % 86_400, 43_200);
    }
}
