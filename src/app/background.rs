use chrono::{DateTime, FixedOffset, Local};

use crate::config::RefreshConfig;
use crate::db::Store;
use crate::models::WidgetCacheRecord;
use crate::widget::{BridgeError, WidgetSyncBridge};

/// `EX_TEMPFAIL`: the host scheduler should back off and run us again.
pub const EXIT_RETRY: i32 = 75;
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug)]
pub enum BackgroundOutcome {
    Fresh(WidgetCacheRecord),
    Retry(BridgeError),
    Failed(BridgeError),
}

impl BackgroundOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            BackgroundOutcome::Fresh(_) => 0,
            BackgroundOutcome::Retry(_) => EXIT_RETRY,
            BackgroundOutcome::Failed(_) => EXIT_FAILURE,
        }
    }
}

/// Periodic task run by an external scheduler. It cannot resolve times
/// itself, so it asks the daemon and waits for the cache to catch up.
pub async fn background_refresh(store: &Store, refresh: &RefreshConfig) -> BackgroundOutcome {
    background_refresh_with(store, refresh, || Local::now().fixed_offset()).await
}

async fn background_refresh_with<C>(store: &Store, refresh: &RefreshConfig, clock: C) -> BackgroundOutcome
where
    C: Fn() -> DateTime<FixedOffset>,
{
    let bridge = WidgetSyncBridge::new(store, store);
    match bridge.request_refresh(refresh.poll_policy(), clock).await {
        Ok(record) => BackgroundOutcome::Fresh(record),
        Err(error) if error.is_retryable() => {
            log::warn!("Background refresh will be retried: {}", error);
            BackgroundOutcome::Retry(error)
        }
        Err(error) => {
            log::error!("Background refresh failed: {}", error);
            BackgroundOutcome::Failed(error)
        }
    }
}
