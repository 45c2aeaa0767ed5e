//! In-process stand-ins for the network sources.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::models::{Coordinates, PrayerTimes};
use crate::prayer_times::http::ApiRequest;
use crate::prayer_times::{HtmlSource, OfflineCalculator, SourceError, TimingApi};

pub const DAILY_PAGE: &str = r#"<h2>مدينة الرباط</h2><table>
    <tr><td>الفجر</td><td>06:12</td><td>الشروق</td><td>07:37</td></tr>
    <tr><td>الظهر</td><td>13:11</td><td>العصر</td><td>16:24</td></tr>
    <tr><td>المغرب</td><td>18:46</td><td>العشاء</td><td>20:03</td></tr></table>"#;

#[derive(Default)]
pub struct FakeHtml {
    pub daily: Option<&'static str>,
    pub monthly: Option<&'static str>,
    daily_calls: AtomicUsize,
    monthly_calls: AtomicUsize,
}

impl FakeHtml {
    pub fn with_daily(page: &'static str) -> Self {
        Self {
            daily: Some(page),
            ..Default::default()
        }
    }

    pub fn with_monthly(page: &'static str) -> Self {
        Self {
            monthly: Some(page),
            ..Default::default()
        }
    }

    pub fn daily_calls(&self) -> usize {
        self.daily_calls.load(Ordering::SeqCst)
    }

    pub fn monthly_calls(&self) -> usize {
        self.monthly_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HtmlSource for FakeHtml {
    async fn daily_markup(&self, _city_id: &str) -> Result<String, SourceError> {
        self.daily_calls.fetch_add(1, Ordering::SeqCst);
        self.daily
            .map(str::to_string)
            .ok_or_else(|| SourceError::Network("connection refused".to_string()))
    }

    async fn monthly_markup(&self, _city_id: &str) -> Result<String, SourceError> {
        self.monthly_calls.fetch_add(1, Ordering::SeqCst);
        self.monthly
            .map(str::to_string)
            .ok_or_else(|| SourceError::Network("connection refused".to_string()))
    }
}

/// Always down.
pub struct DownApi;

#[async_trait]
impl TimingApi for DownApi {
    async fn timings(&self, _request: &ApiRequest) -> Result<HashMap<String, String>, SourceError> {
        Err(SourceError::Network("request timed out".to_string()))
    }
}

/// Never produces times.
pub struct NoOffline;

impl OfflineCalculator for NoOffline {
    fn calculate(&self, _coords: Coordinates, _date: NaiveDate) -> Result<PrayerTimes, SourceError> {
        Err(SourceError::EmptyResult("offline calculation disabled".to_string()))
    }

    fn settings(&self, _coords: Coordinates) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}
