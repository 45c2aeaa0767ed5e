use chrono::{DateTime, FixedOffset};
use std::time::Duration;
use thiserror::Error;

use crate::db::StoreError;
use crate::models::{ResolvedPrayerTimes, WidgetCacheRecord, WidgetTheme};
use crate::widget::signals::{SignalAction, SignalBus};

/// Fixed key the widget reads its record from.
pub const WIDGET_CACHE_KEY: &str = "widget_cache_record";

/// Key/value storage shared with the widget process.
pub trait WidgetCacheStore: Send + Sync {
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError>;
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("widget store error: {0}")]
    Store(#[from] StoreError),
    #[error("widget record encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("widget record read back does not match what was written")]
    VerificationMismatch,
    #[error("widget cache still stale after {attempts} attempts")]
    Stale { attempts: u32 },
}

impl BridgeError {
    /// Whether the host scheduler should try the background refresh again later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BridgeError::Stale { .. } | BridgeError::Store(_))
    }
}

/// How long the background task waits for the resolver to answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

/// Projects a resolution onto the record the widget displays.
pub fn build_record(
    resolved: &ResolvedPrayerTimes,
    theme: &WidgetTheme,
    location: &str,
    now: DateTime<FixedOffset>,
) -> WidgetCacheRecord {
    WidgetCacheRecord {
        times: resolved.times.clone(),
        source: resolved.source_used.as_str().to_string(),
        location: location.to_string(),
        hue: theme.hue,
        dark_mode: theme.dark_mode,
        transparency: theme.transparency,
        written_at: now,
    }
}

pub struct WidgetSyncBridge<'a> {
    cache: &'a dyn WidgetCacheStore,
    signals: &'a dyn SignalBus,
}

impl<'a> WidgetSyncBridge<'a> {
    pub fn new(cache: &'a dyn WidgetCacheStore, signals: &'a dyn SignalBus) -> Self {
        Self { cache, signals }
    }

    /// Writes the record, reads it back, and asks the widget to redraw.
    /// The read-back only detects a write that did not land; a concurrent
    /// writer can still replace the record right after.
    pub fn publish(&self, record: &WidgetCacheRecord) -> Result<(), BridgeError> {
        let encoded = serde_json::to_string(record)?;
        self.cache.put(WIDGET_CACHE_KEY, &encoded)?;

        match self.cache.get(WIDGET_CACHE_KEY)? {
            Some(stored) if stored == encoded => {
                log::debug!("Widget record verified ({} bytes)", encoded.len());
            }
            _ => {
                log::error!("Widget record verification failed after write");
                return Err(BridgeError::VerificationMismatch);
            }
        }

        self.signals.raise(SignalAction::RenderWidget)?;
        Ok(())
    }

    /// The record currently in the cache, if any. An undecodable record is
    /// logged and treated as missing.
    pub fn read_cached(&self) -> Result<Option<WidgetCacheRecord>, BridgeError> {
        let Some(raw) = self.cache.get(WIDGET_CACHE_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(Some(record)),
            Err(error) => {
                log::warn!("Ignoring unreadable widget record: {}", error);
                Ok(None)
            }
        }
    }

    /// Background path: raise a refresh request, then poll the cache until
    /// a record written at or after the request shows up. When the resolver
    /// never answers, a record from earlier today is still accepted;
    /// anything older is a retryable failure.
    pub async fn request_refresh<C>(&self, policy: PollPolicy, clock: C) -> Result<WidgetCacheRecord, BridgeError>
    where
        C: Fn() -> DateTime<FixedOffset>,
    {
        let requested_at = clock();
        self.signals.raise(SignalAction::RequestRefresh)?;
        log::info!("Requested refresh; polling up to {} times", policy.max_attempts);

        for attempt in 1..=policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
            if let Some(record) = self.read_cached()? {
                if record.written_at >= requested_at && record.is_fresh(clock().date_naive()) {
                    log::info!("Fresh widget record after {} attempt(s)", attempt);
                    return Ok(record);
                }
            }
            log::debug!("Attempt {}: no answer yet", attempt);
        }

        match self.read_cached()? {
            Some(record) if record.is_fresh(clock().date_naive()) => {
                log::warn!("Resolver did not answer; using record written at {}", record.written_at);
                Ok(record)
            }
            _ => Err(BridgeError::Stale {
                attempts: policy.max_attempts,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Store;
    use crate::models::{Coordinates, PrayerTimes, SourceUsed};
    use chrono::{Local, TimeZone};
    use std::collections::{BTreeMap, HashMap};
    use std::sync::{Arc, Mutex};

    fn resolved() -> ResolvedPrayerTimes {
        ResolvedPrayerTimes {
            source_used: SourceUsed::ApiRemote,
            times: PrayerTimes {
                fajr: "06:12".to_string(),
                sunrise: "07:37".to_string(),
                dhuhr: "13:11".to_string(),
                asr: "16:24".to_string(),
                maghrib: "18:46".to_string(),
                isha: "N/A".to_string(),
            },
            date: chrono::NaiveDate::from_ymd_opt(2026, 10, 19).unwrap(),
            coordinates: Some(Coordinates {
                latitude: 34.0209,
                longitude: -6.8416,
            }),
            city: None,
            input_settings: BTreeMap::new(),
        }
    }

    fn theme() -> WidgetTheme {
        WidgetTheme {
            hue: 210.0,
            dark_mode: true,
            transparency: 0.35,
        }
    }

    fn now() -> DateTime<FixedOffset> {
        Local::now().fixed_offset()
    }

    #[test]
    fn record_survives_serialization() {
        let written_at = FixedOffset::east_opt(3600)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 19, 9, 30, 0)
            .unwrap();
        let record = build_record(&resolved(), &theme(), "Rabat", written_at);
        let json = serde_json::to_string(&record).unwrap();
        let back: WidgetCacheRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(back, record);
        assert_eq!(back.times.isha, "N/A");
        assert_eq!(back.source, "api_remote");
        assert_eq!(back.written_at.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn publish_writes_and_signals_render() {
        let store = Store::open_in_memory().unwrap();
        let bridge = WidgetSyncBridge::new(&store, &store);
        let record = build_record(&resolved(), &theme(), "Rabat", now());

        bridge.publish(&record).unwrap();
        assert_eq!(bridge.read_cached().unwrap(), Some(record));
        assert!(store.consume(SignalAction::RenderWidget).unwrap().is_some());
    }

    /// Drops every write, so the read-back never matches.
    struct LossyCache;

    impl WidgetCacheStore for LossyCache {
        fn put(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Ok(())
        }

        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }
    }

    #[test]
    fn lost_write_is_reported_without_render_signal() {
        let store = Store::open_in_memory().unwrap();
        let bridge = WidgetSyncBridge::new(&LossyCache, &store);
        let record = build_record(&resolved(), &theme(), "Rabat", now());

        let error = bridge.publish(&record).unwrap_err();
        assert!(matches!(error, BridgeError::VerificationMismatch));
        assert!(store.consume(SignalAction::RenderWidget).unwrap().is_none());
    }

    #[test]
    fn garbage_in_cache_reads_as_missing() {
        let cache = MemoryCache::default();
        cache.put(WIDGET_CACHE_KEY, "{not json").unwrap();
        let store = Store::open_in_memory().unwrap();
        assert!(WidgetSyncBridge::new(&cache, &store).read_cached().unwrap().is_none());
    }

    #[derive(Default)]
    struct MemoryCache {
        values: Mutex<HashMap<String, String>>,
    }

    impl WidgetCacheStore for MemoryCache {
        fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.values.lock().unwrap().insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
            Ok(self.values.lock().unwrap().get(key).cloned())
        }
    }

    fn policy() -> PollPolicy {
        PollPolicy {
            max_attempts: 5,
            interval: Duration::from_secs(2),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn background_refresh_waits_for_the_resolver() {
        let store = Arc::new(Store::open_in_memory().unwrap());

        let responder = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                // the foreground picks the request up a few ticks later
                tokio::time::sleep(Duration::from_secs(5)).await;
                assert!(store.consume(SignalAction::RequestRefresh).unwrap().is_some());
                let record = build_record(&resolved(), &theme(), "Rabat", now());
                WidgetSyncBridge::new(&*store, &*store).publish(&record).unwrap();
            })
        };

        let bridge = WidgetSyncBridge::new(&*store, &*store);
        let record = bridge.request_refresh(policy(), now).await.unwrap();
        assert_eq!(record.location, "Rabat");
        responder.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn silent_resolver_with_old_cache_is_retryable() {
        let store = Store::open_in_memory().unwrap();
        let bridge = WidgetSyncBridge::new(&store, &store);
        let yesterday = now() - chrono::Duration::days(1);
        bridge
            .publish(&build_record(&resolved(), &theme(), "Rabat", yesterday))
            .unwrap();

        let error = bridge.request_refresh(policy(), now).await.unwrap_err();
        assert!(matches!(error, BridgeError::Stale { attempts: 5 }));
        assert!(error.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_resolver_with_todays_cache_is_accepted() {
        let store = Store::open_in_memory().unwrap();
        let bridge = WidgetSyncBridge::new(&store, &store);
        let earlier = now();
        bridge
            .publish(&build_record(&resolved(), &theme(), "Rabat", earlier))
            .unwrap();

        let clock = move || earlier + chrono::Duration::seconds(30);
        let record = bridge.request_refresh(policy(), clock).await.unwrap();
        assert_eq!(record.written_at, earlier);
    }
}
