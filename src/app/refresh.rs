use chrono::{DateTime, TimeZone};

use crate::config::AppConfig;
use crate::models::{ResolvedPrayerTimes, WidgetCacheRecord};
use crate::notifications::{AlarmBackend, NotificationScheduler};
use crate::prayer_times::SourceResolver;
use crate::widget::{build_record, SignalBus, WidgetCacheStore, WidgetSyncBridge};

#[derive(Debug, Clone)]
pub struct RefreshSummary {
    pub resolved: ResolvedPrayerTimes,
    /// Logical notifications scheduled for the day.
    pub scheduled: usize,
    /// Record handed to the widget, when the write was verified.
    pub record: Option<WidgetCacheRecord>,
}

/// Label shown on the widget: the configured override, else the city the
/// source reported, else the configured city name.
pub fn widget_location(config: &AppConfig, resolved: &ResolvedPrayerTimes) -> String {
    config
        .widget
        .location_label
        .clone()
        .or_else(|| resolved.city.clone())
        .filter(|label| !label.trim().is_empty())
        .unwrap_or_else(|| config.source.city_name.clone())
}

/// One full pass: resolve today's times, replace today's alarms, then hand
/// the widget a new record and ask it to redraw.
///
/// When no source answers, the previous alarms and widget record are left
/// untouched; they still describe the last good resolution.
pub async fn refresh_cycle<S, Tz>(
    resolver: &SourceResolver<'_>,
    store: &S,
    config: &AppConfig,
    now: &DateTime<Tz>,
) -> RefreshSummary
where
    S: AlarmBackend + WidgetCacheStore + SignalBus,
    Tz: TimeZone,
{
    let day = now.date_naive();
    let resolved = resolver.resolve(&config.source.resolver(), day).await;

    if resolved.is_total_failure() {
        log::warn!("No prayer time source answered for {}; keeping previous state", day);
        return RefreshSummary {
            resolved,
            scheduled: 0,
            record: None,
        };
    }
    log::info!("Resolved {} times from {}", day, resolved.source_used);

    let scheduled =
        NotificationScheduler::new(store, &config.notifications).reschedule_day(&resolved.times, day, now);

    let location = widget_location(config, &resolved);
    let record = build_record(&resolved, &config.widget.theme(), &location, now.fixed_offset());
    let record = match WidgetSyncBridge::new(store, store).publish(&record) {
        Ok(()) => Some(record),
        Err(error) => {
            log::error!("Widget update failed: {}", error);
            None
        }
    };

    RefreshSummary {
        resolved,
        scheduled,
        record,
    }
}
