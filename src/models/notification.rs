use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::models::Prayer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationState {
    Off,
    Silent,
    Vibrate,
    #[default]
    Full,
}

impl NotificationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationState::Off => "off",
            NotificationState::Silent => "silent",
            NotificationState::Vibrate => "vibrate",
            NotificationState::Full => "full",
        }
    }

    pub fn vibrates(&self) -> bool {
        matches!(self, NotificationState::Vibrate | NotificationState::Full)
    }

    pub fn plays_sound(&self) -> bool {
        matches!(self, NotificationState::Full)
    }
}

impl FromStr for NotificationState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "off" => Ok(NotificationState::Off),
            "silent" => Ok(NotificationState::Silent),
            "vibrate" => Ok(NotificationState::Vibrate),
            "full" => Ok(NotificationState::Full),
            _ => Err(anyhow::anyhow!("Unknown notification state: {}", s)),
        }
    }
}

/// Alert sound used when a notification is in the `full` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundStyle {
    #[default]
    System,
    Short,
    Full,
}

impl SoundStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundStyle::System => "system",
            SoundStyle::Short => "short",
            SoundStyle::Full => "full",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "prayer", rename_all = "lowercase")]
pub enum NotificationTarget {
    Prayer(Prayer),
    Reminder(Prayer),
}

impl NotificationTarget {
    pub fn prayer(&self) -> Prayer {
        match self {
            NotificationTarget::Prayer(p) | NotificationTarget::Reminder(p) => *p,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Fires at prayer time.
    Alert,
    /// Countdown shown ahead of a prayer.
    Countdown,
    /// Silent alarm at prayer time that clears the countdown.
    Dismiss,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Alert => "alert",
            EntryKind::Countdown => "countdown",
            EntryKind::Dismiss => "dismiss",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub prayer_time: String,
    pub vibrate: bool,
    pub sound: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledNotificationEntry {
    pub id: String,
    pub day: NaiveDate,
    pub target: NotificationTarget,
    pub kind: EntryKind,
    pub fire_at: DateTime<Utc>,
    pub channel: String,
    pub payload: NotificationPayload,
}
