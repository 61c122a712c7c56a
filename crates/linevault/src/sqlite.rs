// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SQLite event store backend.

use crate::store::{now_ns, BatchReport, EventStore, TimeseriesEvent};
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::sync::Mutex;

/// SQLite-backed event store.
///
/// Thread-safe via internal Mutex (SQLite `Connection` is not Sync).
///
/// # Schema
///
/// ```sql
/// CREATE TABLE timeseries_event (
///     id INTEGER PRIMARY KEY AUTOINCREMENT,
///     timestamp_ns INTEGER NOT NULL,
///     source TEXT NOT NULL,
///     type TEXT NOT NULL,
///     payload TEXT NOT NULL
/// );
/// CREATE INDEX idx_source_type_ts ON timeseries_event(source, type, timestamp_ns);
/// ```
pub struct SqliteEventStore {
    conn: Mutex<Connection>,
}

impl SqliteEventStore {
    /// Create a new store backed by a database file.
    pub fn new(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open SQLite database at {}", path))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    pub fn new_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("failed to create in-memory SQLite database")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "CREATE TABLE IF NOT EXISTS timeseries_event (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp_ns INTEGER NOT NULL,
                source TEXT NOT NULL,
                type TEXT NOT NULL,
                payload TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_source_type_ts
             ON timeseries_event(source, type, timestamp_ns)",
            [],
        )?;

        Ok(())
    }

    /// Helper function to map a row to an event.
    fn row_to_event(row: &rusqlite::Row) -> rusqlite::Result<TimeseriesEvent> {
        Ok(TimeseriesEvent {
            id: row.get(0)?,
            timestamp_ns: row.get::<_, i64>(1)? as u64,
            source: row.get(2)?,
            kind: row.get(3)?,
            payload: row.get(4)?,
        })
    }
}

impl EventStore for SqliteEventStore {
    fn insert(&self, event: &TimeseriesEvent) -> Result<i64> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO timeseries_event (timestamp_ns, source, type, payload)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                event.timestamp_ns as i64,
                event.source,
                event.kind,
                event.payload,
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    fn query(
        &self,
        source: &str,
        kind: &str,
        start_ns: u64,
        end_ns: u64,
    ) -> Result<Vec<TimeseriesEvent>> {
        let conn = self.conn.lock().unwrap();

        // Saturate to i64::MAX to avoid overflow (u64::MAX as i64 = -1)
        let start = start_ns.min(i64::MAX as u64) as i64;
        let end = end_ns.min(i64::MAX as u64) as i64;

        let mut stmt = conn.prepare(
            "SELECT id, timestamp_ns, source, type, payload
             FROM timeseries_event
             WHERE source = ?1 AND type = ?2 AND timestamp_ns BETWEEN ?3 AND ?4
             ORDER BY timestamp_ns ASC, id ASC",
        )?;

        let events = stmt
            .query_map(params![source, kind, start, end], Self::row_to_event)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(events)
    }

    fn ingest_batch(&self, records: &[Vec<u8>], source: &str, kind: &str) -> Result<BatchReport> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .context("failed to begin ingest transaction")?;

        let mut report = BatchReport::default();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO timeseries_event (timestamp_ns, source, type, payload)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;

            for record in records {
                let payload = String::from_utf8_lossy(record);
                match stmt.execute(params![now_ns() as i64, source, kind, payload.as_ref()]) {
                    Ok(_) => report.inserted += 1,
                    Err(err) => {
                        // A bad record does not roll back its batch.
                        report.failed += 1;
                        tracing::debug!(%err, "skipping record that failed to insert");
                    }
                }
            }
        }

        tx.commit().context("failed to commit ingest transaction")?;
        Ok(report)
    }

    fn count(&self) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM timeseries_event", [], |row| row.get(0))?;

        Ok(count as usize)
    }

    fn clear(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM timeseries_event", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(timestamp_ns: u64, source: &str, kind: &str, payload: &str) -> TimeseriesEvent {
        TimeseriesEvent {
            id: 0,
            timestamp_ns,
            source: source.to_string(),
            kind: kind.to_string(),
            payload: payload.to_string(),
        }
    }

    #[test]
    fn test_insert_and_query() {
        let store = SqliteEventStore::new_in_memory().unwrap();

        let id = store
            .insert(&event(1000, "capture", "stream", "hello"))
            .unwrap();
        assert!(id > 0);

        let events = store.query("capture", "stream", 0, u64::MAX).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, id);
        assert_eq!(events[0].payload, "hello");
    }

    #[test]
    fn test_query_filters_and_range() {
        let store = SqliteEventStore::new_in_memory().unwrap();

        for i in 0..10u64 {
            store
                .insert(&event(i * 1000, "capture", "stream", &format!("p{i}")))
                .unwrap();
        }
        store.insert(&event(3000, "strace", "read", "other")).unwrap();
        store
            .insert(&event(3000, "capture", "read", "other kind"))
            .unwrap();

        // Range is inclusive on both ends and matches source AND type.
        let events = store.query("capture", "stream", 2000, 5000).unwrap();
        assert_eq!(events.len(), 4);
        assert_eq!(events[0].payload, "p2");
        assert_eq!(events[3].payload, "p5");
    }

    #[test]
    fn test_query_orders_by_timestamp_then_id() {
        let store = SqliteEventStore::new_in_memory().unwrap();

        let a = store.insert(&event(500, "capture", "stream", "a")).unwrap();
        let b = store.insert(&event(500, "capture", "stream", "b")).unwrap();
        let c = store.insert(&event(100, "capture", "stream", "c")).unwrap();

        let events = store.query("capture", "stream", 0, u64::MAX).unwrap();
        let ids: Vec<i64> = events.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![c, a, b]);
    }

    #[test]
    fn test_ingest_batch_commits_all_records() {
        let store = SqliteEventStore::new_in_memory().unwrap();

        let records: Vec<Vec<u8>> = (0..50).map(|i| format!("line {i}").into_bytes()).collect();
        let report = store.ingest_batch(&records, "capture", "stream").unwrap();

        assert_eq!(report.inserted, 50);
        assert_eq!(report.failed, 0);
        assert_eq!(store.count().unwrap(), 50);

        // Insertion order is preserved by the assigned identifiers.
        let events = store.query("capture", "stream", 0, u64::MAX).unwrap();
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.payload, format!("line {i}"));
        }
    }

    #[test]
    fn test_ingest_batch_lossy_utf8() {
        let store = SqliteEventStore::new_in_memory().unwrap();

        let records = vec![vec![0xff, 0xfe, b'x']];
        let report = store.ingest_batch(&records, "capture", "stream").unwrap();
        assert_eq!(report.inserted, 1);

        let events = store.query("capture", "stream", 0, u64::MAX).unwrap();
        assert!(events[0].payload.ends_with('x'));
    }

    #[test]
    fn test_clear() {
        let store = SqliteEventStore::new_in_memory().unwrap();

        store.insert(&event(1, "capture", "stream", "x")).unwrap();
        assert_eq!(store.count().unwrap(), 1);

        store.clear().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }
}
