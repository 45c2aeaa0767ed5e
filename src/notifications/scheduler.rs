use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::config::NotificationSettings;
use crate::db::StoreError;
use crate::models::{
    EntryKind, NotificationPayload, NotificationState, NotificationTarget, Prayer, PrayerTimes,
    ScheduledNotificationEntry, SENTINEL,
};
use crate::notifications::channels::{channel_for, CLEANUP_CHANNEL};

/// Where physical alarms live until they fire.
pub trait AlarmBackend: Send + Sync {
    /// Removes every alarm for `day`, returning how many were removed.
    fn cancel_day(&self, day: NaiveDate) -> Result<usize, StoreError>;
    fn schedule(&self, entry: &ScheduledNotificationEntry) -> Result<(), StoreError>;
    /// Removes and returns alarms due at or before `now`, earliest first.
    fn take_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledNotificationEntry>, StoreError>;
    fn list_day(&self, day: NaiveDate) -> Result<Vec<ScheduledNotificationEntry>, StoreError>;
}

/// One logical notification: a prayer alert, or a reminder countdown with
/// its dismiss alarm (dismiss first, so a half-written pair never leaves a
/// countdown without its cleanup).
pub type PlannedNotification = Vec<ScheduledNotificationEntry>;

/// Entries for `day` that should exist given `times` and the current instant.
pub fn plan_day<Tz: TimeZone>(
    times: &PrayerTimes,
    day: NaiveDate,
    now: &DateTime<Tz>,
    settings: &NotificationSettings,
) -> Vec<PlannedNotification> {
    let now_utc = now.with_timezone(&Utc);
    let mut planned = Vec::new();

    for prayer in Prayer::ALL {
        let value = times.get(prayer);
        if value == SENTINEL {
            continue;
        }
        let Some(prayer_at) = local_instant(value, day, &now.timezone()) else {
            log::warn!("Cannot place {} at '{}' on {}", prayer, value, day);
            continue;
        };
        if prayer_at <= now_utc {
            continue;
        }

        let prayer_state = settings.effective_prayer_state(prayer);
        log::trace!("{} alert state: {}", prayer, prayer_state.as_str());
        if let Some(channel) = channel_for(prayer_state, settings.sound_style) {
            planned.push(vec![ScheduledNotificationEntry {
                id: entry_id(day, prayer, EntryKind::Alert),
                day,
                target: NotificationTarget::Prayer(prayer),
                kind: EntryKind::Alert,
                fire_at: prayer_at,
                channel: channel.to_string(),
                payload: payload(prayer_state, prayer.display_name(), format!("{} at {}", prayer, value), value),
            }]);
        }

        if settings.reminder_minutes == 0 {
            continue;
        }
        let reminder_state = settings.effective_reminder_state(prayer);
        let Some(channel) = channel_for(reminder_state, settings.sound_style) else {
            continue;
        };
        let reminder_at = prayer_at - Duration::minutes(i64::from(settings.reminder_minutes));
        if reminder_at <= now_utc {
            continue;
        }

        let target = NotificationTarget::Reminder(prayer);
        planned.push(vec![
            ScheduledNotificationEntry {
                id: entry_id(day, prayer, EntryKind::Dismiss),
                day,
                target,
                kind: EntryKind::Dismiss,
                fire_at: prayer_at,
                channel: CLEANUP_CHANNEL.to_string(),
                payload: payload(NotificationState::Silent, prayer.display_name(), String::new(), value),
            },
            ScheduledNotificationEntry {
                id: entry_id(day, prayer, EntryKind::Countdown),
                day,
                target,
                kind: EntryKind::Countdown,
                fire_at: reminder_at,
                channel: channel.to_string(),
                payload: payload(
                    reminder_state,
                    &format!("{} soon", prayer),
                    format!("{} in {} min ({})", prayer, settings.reminder_minutes, value),
                    value,
                ),
            },
        ]);
    }

    planned
}

/// Replaces every alarm for one day.
pub struct NotificationScheduler<'a> {
    backend: &'a dyn AlarmBackend,
    settings: &'a NotificationSettings,
}

impl<'a> NotificationScheduler<'a> {
    pub fn new(backend: &'a dyn AlarmBackend, settings: &'a NotificationSettings) -> Self {
        Self { backend, settings }
    }

    /// Cancels the day's alarms and schedules the fresh set. Returns the number
    /// of logical notifications scheduled; a failing entry is logged and skipped.
    pub fn reschedule_day<Tz: TimeZone>(
        &self,
        times: &PrayerTimes,
        day: NaiveDate,
        now: &DateTime<Tz>,
    ) -> usize {
        match self.backend.cancel_day(day) {
            Ok(removed) => log::debug!("Cancelled {} alarms for {}", removed, day),
            Err(error) => {
                // Scheduling on top of alarms we could not remove would mix old and new times.
                log::error!("Could not cancel alarms for {}: {}", day, error);
                return 0;
            }
        }

        let mut scheduled = 0;
        for notification in plan_day(times, day, now, self.settings) {
            let outcome = notification
                .iter()
                .try_for_each(|entry| self.backend.schedule(entry).map_err(|e| (entry, e)));
            match outcome {
                Ok(()) => scheduled += 1,
                Err((entry, error)) => {
                    log::warn!("Failed to schedule {} ({}): {}", entry.id, entry.kind.as_str(), error)
                }
            }
        }

        log::info!(
            "Scheduled {} notifications for {} ({} sound)",
            scheduled,
            day,
            self.settings.sound_style.as_str()
        );
        scheduled
    }
}

fn local_instant<Tz: TimeZone>(value: &str, day: NaiveDate, tz: &Tz) -> Option<DateTime<Utc>> {
    let time = NaiveTime::parse_from_str(value, "%H:%M").ok()?;
    tz.from_local_datetime(&day.and_time(time))
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn entry_id(day: NaiveDate, prayer: Prayer, kind: EntryKind) -> String {
    format!("{}:{}:{}", day.format("%Y-%m-%d"), prayer.as_str(), kind.as_str())
}

fn payload(state: NotificationState, title: &str, body: String, time: &str) -> NotificationPayload {
    NotificationPayload {
        title: title.to_string(),
        body,
        prayer_time: time.to_string(),
        vibrate: state.vibrates(),
        sound: state.plays_sound(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SoundStyle;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingBackend {
        entries: Mutex<Vec<ScheduledNotificationEntry>>,
        fail_prayer: Option<Prayer>,
    }

    impl AlarmBackend for RecordingBackend {
        fn cancel_day(&self, day: NaiveDate) -> Result<usize, StoreError> {
            let mut entries = self.entries.lock().unwrap();
            let before = entries.len();
            entries.retain(|e| e.day != day);
            Ok(before - entries.len())
        }

        fn schedule(&self, entry: &ScheduledNotificationEntry) -> Result<(), StoreError> {
            if Some(entry.target.prayer()) == self.fail_prayer {
                return Err(StoreError::Lock("alarm table busy".to_string()));
            }
            self.entries.lock().unwrap().push(entry.clone());
            Ok(())
        }

        fn take_due(&self, _now: DateTime<Utc>) -> Result<Vec<ScheduledNotificationEntry>, StoreError> {
            Ok(Vec::new())
        }

        fn list_day(&self, day: NaiveDate) -> Result<Vec<ScheduledNotificationEntry>, StoreError> {
            Ok(self.entries.lock().unwrap().iter().filter(|e| e.day == day).cloned().collect())
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        day().and_hms_opt(h, m, 0).unwrap().and_utc()
    }

    fn times() -> PrayerTimes {
        PrayerTimes {
            fajr: "06:12".to_string(),
            sunrise: "07:37".to_string(),
            dhuhr: "13:00".to_string(),
            asr: "16:24".to_string(),
            maghrib: "18:46".to_string(),
            isha: "20:03".to_string(),
        }
    }

    fn settings(reminder: NotificationState, minutes: u32) -> NotificationSettings {
        NotificationSettings {
            advanced: false,
            prayer_state: NotificationState::Full,
            reminder_state: reminder,
            prayers: HashMap::new(),
            reminders: HashMap::new(),
            reminder_minutes: minutes,
            sound_style: SoundStyle::Short,
        }
    }

    #[test]
    fn passed_prayers_are_not_scheduled() {
        let planned = plan_day(&times(), day(), &at(12, 0), &settings(NotificationState::Off, 0));
        let prayers: Vec<Prayer> = planned.iter().map(|p| p[0].target.prayer()).collect();
        assert_eq!(prayers, vec![Prayer::Dhuhr, Prayer::Asr, Prayer::Maghrib, Prayer::Isha]);
        assert!(planned.iter().all(|p| p[0].channel == "prayer_full_short"));
    }

    #[test]
    fn prayer_at_exactly_now_is_skipped() {
        let planned = plan_day(&times(), day(), &at(13, 0), &settings(NotificationState::Off, 0));
        assert!(planned.iter().all(|p| p[0].target.prayer() != Prayer::Dhuhr));
    }

    #[test]
    fn sentinel_prayers_are_excluded() {
        let mut t = times();
        t.asr = SENTINEL.to_string();
        let planned = plan_day(&t, day(), &at(0, 0), &settings(NotificationState::Silent, 10));
        assert!(planned.iter().flatten().all(|e| e.target.prayer() != Prayer::Asr));
        // five prayers, each with an alert and a reminder pair
        assert_eq!(planned.len(), 10);
    }

    #[test]
    fn reminder_boundary_is_exclusive() {
        let s = settings(NotificationState::Vibrate, 10);
        let reminder_at = at(12, 50);

        let on_boundary = plan_day(&times(), day(), &reminder_at, &s);
        assert!(
            !on_boundary
                .iter()
                .flatten()
                .any(|e| e.target == NotificationTarget::Reminder(Prayer::Dhuhr)),
            "reminder firing exactly now must be skipped"
        );

        let just_before = reminder_at - Duration::microseconds(1);
        let planned = plan_day(&times(), day(), &just_before, &s);
        let pair = planned
            .iter()
            .find(|p| p[0].target == NotificationTarget::Reminder(Prayer::Dhuhr))
            .expect("reminder scheduled one microsecond ahead");
        assert_eq!(pair[0].kind, EntryKind::Dismiss);
        assert_eq!(pair[0].fire_at, at(13, 0));
        assert_eq!(pair[0].channel, CLEANUP_CHANNEL);
        assert_eq!(pair[1].kind, EntryKind::Countdown);
        assert_eq!(pair[1].fire_at, reminder_at);
        assert!(pair[1].fire_at < pair[0].fire_at);
        assert_eq!(pair[1].channel, "prayer_vibrate");
        assert!(pair[1].payload.vibrate && !pair[1].payload.sound);
    }

    #[test]
    fn advanced_mode_uses_per_prayer_states() {
        let mut s = settings(NotificationState::Off, 0);
        s.advanced = true;
        s.prayers.insert(Prayer::Sunrise, NotificationState::Off);
        s.prayers.insert(Prayer::Isha, NotificationState::Silent);

        let planned = plan_day(&times(), day(), &at(0, 0), &s);
        assert!(planned.iter().all(|p| p[0].target.prayer() != Prayer::Sunrise));
        let isha = planned.iter().find(|p| p[0].target.prayer() == Prayer::Isha).unwrap();
        assert_eq!(isha[0].channel, "prayer_silent");

        // the same map is ignored when advanced control is off
        s.advanced = false;
        let planned = plan_day(&times(), day(), &at(0, 0), &s);
        assert_eq!(planned.len(), 6);
    }

    #[test]
    fn local_timezone_shifts_fire_instants() {
        let tz = chrono::FixedOffset::east_opt(3600).unwrap();
        let now = tz.from_local_datetime(&day().and_hms_opt(12, 0, 0).unwrap()).unwrap();
        let planned = plan_day(&times(), day(), &now, &settings(NotificationState::Off, 0));
        let dhuhr = planned.iter().find(|p| p[0].target.prayer() == Prayer::Dhuhr).unwrap();
        assert_eq!(dhuhr[0].fire_at, at(12, 0));
    }

    #[test]
    fn reschedule_replaces_previous_entries() {
        let backend = RecordingBackend::default();
        let s = settings(NotificationState::Off, 0);
        let scheduler = NotificationScheduler::new(&backend, &s);

        assert_eq!(scheduler.reschedule_day(&times(), day(), &at(0, 0)), 6);
        let mut later = times();
        later.isha = SENTINEL.to_string();
        assert_eq!(scheduler.reschedule_day(&later, day(), &at(0, 0)), 5);

        let stored = backend.list_day(day()).unwrap();
        assert_eq!(stored.len(), 5);
        assert!(stored.iter().all(|e| e.target.prayer() != Prayer::Isha));
    }

    #[test]
    fn one_failing_entry_does_not_stop_the_rest() {
        let backend = RecordingBackend {
            fail_prayer: Some(Prayer::Asr),
            ..Default::default()
        };
        let s = settings(NotificationState::Full, 15);
        let scheduler = NotificationScheduler::new(&backend, &s);

        let count = scheduler.reschedule_day(&times(), day(), &at(0, 0));
        // six alerts plus six reminders, minus Asr's alert and reminder
        assert_eq!(count, 10);
        assert_eq!(backend.list_day(day()).unwrap().len(), 5 + 5 * 2);
    }

    fn time_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            1 => Just(SENTINEL.to_string()),
            4 => (0u32..24, 0u32..60).prop_map(|(h, m)| format!("{h:02}:{m:02}")),
        ]
    }

    proptest! {
        #[test]
        fn scheduled_count_matches_future_non_sentinel_prayers(
            values in proptest::collection::vec(time_strategy(), 6),
            now_h in 0u32..24,
            now_m in 0u32..60,
        ) {
            let mut t = PrayerTimes::unresolved();
            for (p, v) in Prayer::ALL.into_iter().zip(&values) {
                t.set(p, v.clone());
            }
            let now = at(now_h, now_m);
            let expected = values
                .iter()
                .filter(|v| v.as_str() != SENTINEL)
                .filter(|v| {
                    let time = NaiveTime::parse_from_str(v, "%H:%M").unwrap();
                    day().and_time(time).and_utc() > now
                })
                .count();

            let backend = RecordingBackend::default();
            let s = settings(NotificationState::Off, 0);
            let count = NotificationScheduler::new(&backend, &s).reschedule_day(&t, day(), &now);
            prop_assert_eq!(count, expected);
        }
    }
}
