use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::models::Coordinates;
use crate::prayer_times::SourceError;

/// Custom calculation method understood by the timing API.
pub const API_METHOD: &str = "99";
/// Fajr angle, unused slot, Isha angle.
pub const API_METHOD_SETTINGS: &str = "19,null,17";
pub const API_SCHOOL: &str = "0";
/// Per-field minute offsets; only the Isha slot is shifted (+5).
pub const API_TUNE: &str = "0,0,0,0,0,5,0,0,0";

/// Scraped government pages.
#[async_trait]
pub trait HtmlSource: Send + Sync {
    async fn daily_markup(&self, city_id: &str) -> Result<String, SourceError>;
    async fn monthly_markup(&self, city_id: &str) -> Result<String, SourceError>;
}

/// Remote timing API returning raw (possibly suffixed) time strings keyed by prayer name.
#[async_trait]
pub trait TimingApi: Send + Sync {
    async fn timings(&self, request: &ApiRequest) -> Result<HashMap<String, String>, SourceError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub coordinates: Coordinates,
    /// Unix timestamp identifying the day.
    pub timestamp: i64,
}

impl ApiRequest {
    pub fn new(coordinates: Coordinates, timestamp: i64) -> Self {
        Self {
            coordinates,
            timestamp,
        }
    }

    /// Query parameters exactly as sent.
    pub fn query(&self) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", self.coordinates.latitude.to_string()),
            ("longitude", self.coordinates.longitude.to_string()),
            ("method", API_METHOD.to_string()),
            ("methodSettings", API_METHOD_SETTINGS.to_string()),
            ("school", API_SCHOOL.to_string()),
            ("tune", API_TUNE.to_string()),
        ]
    }
}

#[derive(Debug, Clone)]
pub struct Endpoints {
    pub daily_url: String,
    pub monthly_url: String,
    pub api_url: String,
}

/// `reqwest` client for every remote source. Certificates are always validated.
#[derive(Debug, Clone)]
pub struct HttpSources {
    client: Client,
    endpoints: Endpoints,
}

#[derive(Debug, Deserialize)]
struct TimingsEnvelope {
    data: Option<TimingsData>,
    timings: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct TimingsData {
    timings: HashMap<String, String>,
}

impl HttpSources {
    pub fn new(endpoints: Endpoints, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("miqat/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|error| SourceError::Network(format!("failed to build http client: {error}")))?;
        Ok(Self { client, endpoints })
    }

    async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String, SourceError> {
        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SourceError::Network(format!("http {} from {url}", status.as_u16())));
        }
        Ok(body)
    }
}

#[async_trait]
impl HtmlSource for HttpSources {
    async fn daily_markup(&self, city_id: &str) -> Result<String, SourceError> {
        self.get_text(&self.endpoints.daily_url, &[("ville", city_id.to_string())])
            .await
    }

    async fn monthly_markup(&self, city_id: &str) -> Result<String, SourceError> {
        self.get_text(&self.endpoints.monthly_url, &[("ville", city_id.to_string())])
            .await
    }
}

#[async_trait]
impl TimingApi for HttpSources {
    async fn timings(&self, request: &ApiRequest) -> Result<HashMap<String, String>, SourceError> {
        let url = format!(
            "{}/{}",
            self.endpoints.api_url.trim_end_matches('/'),
            request.timestamp
        );
        let body = self.get_text(&url, &request.query()).await?;
        parse_timings(&body)
    }
}

/// Extracts the `timings` object from an API response body.
pub fn parse_timings(body: &str) -> Result<HashMap<String, String>, SourceError> {
    let envelope: TimingsEnvelope = serde_json::from_str(body)
        .map_err(|error| SourceError::Parse(format!("invalid timings payload: {error}")))?;
    envelope
        .data
        .map(|d| d.timings)
        .or(envelope.timings)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| SourceError::EmptyResult("response has no timings".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_carries_fixed_method_parameters() {
        let request = ApiRequest::new(
            Coordinates {
                latitude: 34.02,
                longitude: -6.84,
            },
            1_792_368_000,
        );
        let query: HashMap<_, _> = request.query().into_iter().collect();
        assert_eq!(query["method"], "99");
        assert_eq!(query["methodSettings"], "19,null,17");
        assert_eq!(query["school"], "0");
        assert_eq!(query["tune"], "0,0,0,0,0,5,0,0,0");
        assert_eq!(query["latitude"], "34.02");
        assert_eq!(query["longitude"], "-6.84");
    }

    #[test]
    fn timings_are_read_from_data_envelope() {
        let body = r#"{"code":200,"data":{"timings":{"Fajr":"06:12 (+01)","Isha":"20:03"}}}"#;
        let timings = parse_timings(body).unwrap();
        assert_eq!(timings["Fajr"], "06:12 (+01)");
        assert_eq!(timings["Isha"], "20:03");
    }

    #[test]
    fn top_level_timings_are_accepted() {
        let timings = parse_timings(r#"{"timings":{"Asr":"16:24"}}"#).unwrap();
        assert_eq!(timings["Asr"], "16:24");
    }

    #[test]
    fn missing_timings_is_an_empty_result() {
        assert!(matches!(
            parse_timings(r#"{"code":200,"data":{}}"#),
            Err(SourceError::Parse(_))
        ));
        assert!(matches!(
            parse_timings(r#"{"code":200}"#),
            Err(SourceError::EmptyResult(_))
        ));
        assert!(matches!(parse_timings("<html>"), Err(SourceError::Parse(_))));
    }
}
