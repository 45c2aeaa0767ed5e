pub mod bridge;
pub mod signals;

pub use bridge::{build_record, BridgeError, PollPolicy, WidgetCacheStore, WidgetSyncBridge, WIDGET_CACHE_KEY};
pub use signals::{SignalAction, SignalBus};
