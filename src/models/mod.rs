pub mod calendar;
pub mod notification;
pub mod prayer;
pub mod resolved;
pub mod widget;

pub use calendar::{HijriDay, MonthlyCalendar, PrayerDay, MOON_SIGHTING_MARKER};
pub use notification::{
    EntryKind, NotificationPayload, NotificationState, NotificationTarget,
    ScheduledNotificationEntry, SoundStyle,
};
pub use prayer::{Prayer, PrayerTimes, SENTINEL};
pub use resolved::{Coordinates, ResolvedPrayerTimes, SourceUsed};
pub use widget::{WidgetCacheRecord, WidgetTheme};
