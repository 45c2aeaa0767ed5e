use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Connection;
use std::path::Path;
use std::sync::Mutex;

use crate::app::CalendarCache;
use crate::db::migrations::run_migrations;
use crate::db::repository::{AlarmRepo, CalendarRepo, MetaRepo, SignalRepo};
use crate::db::StoreError;
use crate::models::{MonthlyCalendar, ScheduledNotificationEntry};
use crate::notifications::AlarmBackend;
use crate::widget::{SignalAction, SignalBus, WidgetCacheStore};

/// The database shared by the daemon, the background task and the widget.
/// Each process opens its own connection; writes are last-writer-wins.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        // WAL lets the widget read while the daemon writes
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=3000;")?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let conn = self
            .conn
            .lock()
            .map_err(|error| StoreError::Lock(error.to_string()))?;
        f(&conn)
    }

    pub fn clear_expired_calendars(&self, today: NaiveDate) -> Result<usize, StoreError> {
        self.with_conn(|conn| CalendarRepo::clear_expired(conn, today))
    }
}

impl CalendarCache for Store {
    fn cached_calendar(&self, city_id: &str) -> Result<Option<MonthlyCalendar>, StoreError> {
        self.with_conn(|conn| CalendarRepo::get(conn, city_id))
    }

    fn store_calendar(&self, calendar: &MonthlyCalendar) -> Result<(), StoreError> {
        self.with_conn(|conn| CalendarRepo::store(conn, calendar))
    }
}

impl AlarmBackend for Store {
    fn cancel_day(&self, day: NaiveDate) -> Result<usize, StoreError> {
        self.with_conn(|conn| AlarmRepo::delete_day(conn, day))
    }

    fn schedule(&self, entry: &ScheduledNotificationEntry) -> Result<(), StoreError> {
        self.with_conn(|conn| AlarmRepo::upsert(conn, entry))
    }

    fn take_due(&self, now: DateTime<Utc>) -> Result<Vec<ScheduledNotificationEntry>, StoreError> {
        self.with_conn(|conn| AlarmRepo::take_due(conn, now))
    }

    fn list_day(&self, day: NaiveDate) -> Result<Vec<ScheduledNotificationEntry>, StoreError> {
        self.with_conn(|conn| AlarmRepo::get_day(conn, day))
    }
}

impl WidgetCacheStore for Store {
    fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| MetaRepo::set(conn, key, value))
    }

    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.with_conn(|conn| MetaRepo::get(conn, key))
    }
}

impl SignalBus for Store {
    fn raise(&self, action: SignalAction) -> Result<(), StoreError> {
        self.with_conn(|conn| SignalRepo::raise(conn, action.name(), Utc::now()))
    }

    fn consume(&self, action: SignalAction) -> Result<Option<DateTime<Utc>>, StoreError> {
        self.with_conn(|conn| SignalRepo::consume(conn, action.name()))
    }
}
