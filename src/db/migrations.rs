use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("
        CREATE TABLE IF NOT EXISTS app_meta (
            key   TEXT PRIMARY KEY,
            value TEXT
        );

        CREATE TABLE IF NOT EXISTS scheduled_alarms (
            id       TEXT PRIMARY KEY,
            day      TEXT NOT NULL,
            fire_at  TEXT NOT NULL,
            kind     TEXT NOT NULL CHECK(kind IN ('alert','countdown','dismiss')),
            entry    TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_scheduled_alarms_day ON scheduled_alarms(day);
        CREATE INDEX IF NOT EXISTS idx_scheduled_alarms_fire_at ON scheduled_alarms(fire_at);

        CREATE TABLE IF NOT EXISTS signals (
            action     TEXT PRIMARY KEY,
            raised_at  TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS monthly_calendar (
            city_id     TEXT PRIMARY KEY,
            expires_at  TEXT,
            calendar    TEXT NOT NULL,
            fetched_at  TEXT DEFAULT (datetime('now'))
        );
    ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 4);
    }
}
