use crate::models::{NotificationState, SoundStyle};

/// Silent channel used for the alarm that clears a reminder countdown.
pub const CLEANUP_CHANNEL: &str = "reminder_cleanup";

/// Channel per `(state, sound style)`. The style only matters in the `full` state.
const CHANNEL_TABLE: [(NotificationState, SoundStyle, &str); 9] = [
    (NotificationState::Silent, SoundStyle::System, "prayer_silent"),
    (NotificationState::Silent, SoundStyle::Short, "prayer_silent"),
    (NotificationState::Silent, SoundStyle::Full, "prayer_silent"),
    (NotificationState::Vibrate, SoundStyle::System, "prayer_vibrate"),
    (NotificationState::Vibrate, SoundStyle::Short, "prayer_vibrate"),
    (NotificationState::Vibrate, SoundStyle::Full, "prayer_vibrate"),
    (NotificationState::Full, SoundStyle::System, "prayer_full_system"),
    (NotificationState::Full, SoundStyle::Short, "prayer_full_short"),
    (NotificationState::Full, SoundStyle::Full, "prayer_full_adhan"),
];

/// `None` for `off`: nothing is scheduled.
pub fn channel_for(state: NotificationState, style: SoundStyle) -> Option<&'static str> {
    CHANNEL_TABLE
        .iter()
        .find(|(s, st, _)| *s == state && *st == style)
        .map(|(_, _, channel)| *channel)
}

/// Channels whose delivery plays a sound.
pub fn is_audible(channel: &str) -> bool {
    channel.starts_with("prayer_full_")
}
