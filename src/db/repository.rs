use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::StoreError;
use crate::models::{MonthlyCalendar, ScheduledNotificationEntry};

fn day_key(day: NaiveDate) -> String {
    day.format("%Y-%m-%d").to_string()
}

/// Fixed-width UTC timestamp so text comparison follows time order.
fn instant_key(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// ─── App meta ────────────────────────────────────────────────────────────────

pub struct MetaRepo;

impl MetaRepo {
    pub fn get(conn: &Connection, key: &str) -> Result<Option<String>, StoreError> {
        conn.query_row(
            "SELECT value FROM app_meta WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(StoreError::from)
    }

    pub fn set(conn: &Connection, key: &str, value: &str) -> Result<(), StoreError> {
        conn.execute(
            "INSERT INTO app_meta (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }
}

// ─── Scheduled alarms ────────────────────────────────────────────────────────

pub struct AlarmRepo;

impl AlarmRepo {
    pub fn delete_day(conn: &Connection, day: NaiveDate) -> Result<usize, StoreError> {
        let removed = conn.execute(
            "DELETE FROM scheduled_alarms WHERE day = ?1",
            params![day_key(day)],
        )?;
        Ok(removed)
    }

    pub fn upsert(conn: &Connection, entry: &ScheduledNotificationEntry) -> Result<(), StoreError> {
        let json = serde_json::to_string(entry)?;
        conn.execute(
            "INSERT OR REPLACE INTO scheduled_alarms (id, day, fire_at, kind, entry)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.id,
                day_key(entry.day),
                instant_key(entry.fire_at),
                entry.kind.as_str(),
                json
            ],
        )?;
        Ok(())
    }

    pub fn get_day(conn: &Connection, day: NaiveDate) -> Result<Vec<ScheduledNotificationEntry>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT entry FROM scheduled_alarms WHERE day = ?1 ORDER BY fire_at, id",
        )?;
        let rows = stmt.query_map(params![day_key(day)], |row| row.get::<_, String>(0))?;
        Self::decode(rows)
    }

    /// Removes and returns everything due at or before `now`.
    pub fn take_due(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<ScheduledNotificationEntry>, StoreError> {
        let now = instant_key(now);
        let tx = conn.unchecked_transaction()?;
        let due = {
            let mut stmt = tx.prepare(
                "SELECT entry FROM scheduled_alarms WHERE fire_at <= ?1 ORDER BY fire_at, id",
            )?;
            let rows = stmt.query_map(params![now], |row| row.get::<_, String>(0))?;
            Self::decode(rows)?
        };
        tx.execute("DELETE FROM scheduled_alarms WHERE fire_at <= ?1", params![now])?;
        tx.commit()?;
        Ok(due)
    }

    fn decode<I>(rows: I) -> Result<Vec<ScheduledNotificationEntry>, StoreError>
    where
        I: Iterator<Item = rusqlite::Result<String>>,
    {
        let mut result = Vec::new();
        for row in rows {
            result.push(serde_json::from_str(&row?)?);
        }
        Ok(result)
    }
}

// ─── Signals ─────────────────────────────────────────────────────────────────

pub struct SignalRepo;

impl SignalRepo {
    pub fn raise(conn: &Connection, action: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        conn.execute(
            "INSERT OR REPLACE INTO signals (action, raised_at) VALUES (?1, ?2)",
            params![action, instant_key(at)],
        )?;
        Ok(())
    }

    /// Clears a pending action, returning when it was raised.
    pub fn consume(conn: &Connection, action: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        let tx = conn.unchecked_transaction()?;
        let raised: Option<String> = tx
            .query_row(
                "SELECT raised_at FROM signals WHERE action = ?1",
                params![action],
                |row| row.get(0),
            )
            .optional()?;
        tx.execute("DELETE FROM signals WHERE action = ?1", params![action])?;
        tx.commit()?;

        raised
            .map(|s| {
                DateTime::parse_from_rfc3339(&s)
                    .map(|dt| dt.with_timezone(&Utc))
                    .map_err(|e| StoreError::Corrupt(format!("signal timestamp '{s}': {e}")))
            })
            .transpose()
    }
}

// ─── Monthly calendar ────────────────────────────────────────────────────────

pub struct CalendarRepo;

impl CalendarRepo {
    pub fn get(conn: &Connection, city_id: &str) -> Result<Option<MonthlyCalendar>, StoreError> {
        let json: Option<String> = conn
            .query_row(
                "SELECT calendar FROM monthly_calendar WHERE city_id = ?1",
                params![city_id],
                |row| row.get(0),
            )
            .optional()?;
        json.map(|j| serde_json::from_str(&j).map_err(StoreError::from))
            .transpose()
    }

    pub fn store(conn: &Connection, calendar: &MonthlyCalendar) -> Result<(), StoreError> {
        conn.execute(
            "INSERT OR REPLACE INTO monthly_calendar (city_id, expires_at, calendar, fetched_at)
             VALUES (?1, ?2, ?3, datetime('now'))",
            params![
                calendar.city_id,
                calendar.expires_at.map(day_key),
                serde_json::to_string(calendar)?
            ],
        )?;
        Ok(())
    }

    pub fn clear_expired(conn: &Connection, today: NaiveDate) -> Result<usize, StoreError> {
        let removed = conn.execute(
            "DELETE FROM monthly_calendar WHERE expires_at IS NULL OR expires_at <= ?1",
            params![day_key(today)],
        )?;
        Ok(removed)
    }
}
