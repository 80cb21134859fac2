use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{
    connection::Database,
    helpers::{parse_datetime, to_i64, to_u64},
};
use crate::models::{SessionTimeline, TitleInterval, WindowIntervals};

struct TimelineRow {
    id: String,
    started_at: DateTime<Utc>,
    total_duration_secs: u64,
}

fn row_to_timeline(row: &Row) -> Result<TimelineRow> {
    let started_at: String = row.get("started_at")?;
    let total_duration_secs: i64 = row.get("total_duration_secs")?;

    Ok(TimelineRow {
        id: row.get("id")?,
        started_at: parse_datetime(&started_at, "started_at")?,
        total_duration_secs: to_u64(total_duration_secs, "total_duration_secs")?,
    })
}

/// Rows come back grouped by window in first-appearance order.
fn load_windows(conn: &Connection, timeline_id: &str) -> Result<Vec<WindowIntervals>> {
    let mut stmt = conn.prepare(
        "SELECT window_class, title, start_tick, end_tick
         FROM timeline_intervals
         WHERE timeline_id = ?1
         ORDER BY window_order ASC, position ASC",
    )?;

    let mut rows = stmt.query(params![timeline_id])?;
    let mut windows: Vec<WindowIntervals> = Vec::new();
    while let Some(row) = rows.next()? {
        let window_class: String = row.get("window_class")?;
        let interval = TitleInterval::new(
            row.get::<_, String>("title")?,
            to_u64(row.get("start_tick")?, "start_tick")?,
            to_u64(row.get("end_tick")?, "end_tick")?,
        )?;

        match windows.last_mut() {
            Some(window) if window.window_class == window_class => {
                window.intervals.push(interval);
            }
            _ => windows.push(WindowIntervals {
                window_class,
                intervals: vec![interval],
            }),
        }
    }
    Ok(windows)
}

fn hydrate(conn: &Connection, row: TimelineRow) -> Result<SessionTimeline> {
    let windows = load_windows(conn, &row.id)?;
    let id = row.id.clone();
    SessionTimeline::restore(row.id, row.started_at, row.total_duration_secs, windows)
        .with_context(|| format!("stored timeline {id} is inconsistent"))
}

impl Database {
    pub async fn insert_timeline(&self, timeline: &SessionTimeline) -> Result<()> {
        let record = timeline.clone();
        let archived_at = Utc::now();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO timelines (id, started_at, total_duration_secs, archived_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.id(),
                    record.started_at().to_rfc3339(),
                    to_i64(record.total_duration_secs())?,
                    archived_at.to_rfc3339(),
                ],
            )
            .context("failed to insert timeline")?;

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO timeline_intervals
                        (timeline_id, window_class, window_order, position, title, start_tick, end_tick)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                )?;
                for (window_order, window) in record.windows().iter().enumerate() {
                    for (position, interval) in window.intervals.iter().enumerate() {
                        stmt.execute(params![
                            record.id(),
                            window.window_class,
                            to_i64(window_order as u64)?,
                            to_i64(position as u64)?,
                            interval.title,
                            to_i64(interval.range.start())?,
                            to_i64(interval.range.end())?,
                        ])
                        .context("failed to insert timeline interval")?;
                    }
                }
            }

            tx.commit().context("failed to commit timeline")?;
            Ok(())
        })
        .await
    }

    /// The `limit` most recently archived timelines, oldest first.
    pub async fn list_timelines(&self, limit: usize) -> Result<Vec<SessionTimeline>> {
        let limit = to_i64(limit as u64)?;
        self.execute(move |conn| {
            let headers = {
                let mut stmt = conn.prepare(
                    "SELECT id, started_at, total_duration_secs
                     FROM timelines
                     ORDER BY archived_at DESC, started_at DESC
                     LIMIT ?1",
                )?;
                let mut rows = stmt.query(params![limit])?;
                let mut headers = Vec::new();
                while let Some(row) = rows.next()? {
                    headers.push(row_to_timeline(row)?);
                }
                headers
            };

            headers
                .into_iter()
                .rev()
                .map(|row| hydrate(conn, row))
                .collect()
        })
        .await
    }

    pub async fn get_timeline(&self, id: &str) -> Result<Option<SessionTimeline>> {
        let id = id.to_string();
        self.execute(move |conn| {
            let header = conn
                .query_row(
                    "SELECT id, started_at, total_duration_secs FROM timelines WHERE id = ?1",
                    params![id],
                    |row| Ok(row_to_timeline(row)),
                )
                .optional()?
                .transpose()?;

            header.map(|row| hydrate(conn, row)).transpose()
        })
        .await
    }

    /// Returns false when no timeline had that id.
    pub async fn delete_timeline(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.execute(move |conn| {
            let deleted = conn
                .execute("DELETE FROM timelines WHERE id = ?1", params![id])
                .context("failed to delete timeline")?;
            Ok(deleted > 0)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interval(title: &str, start: u64, end: u64) -> TitleInterval {
        TitleInterval::new(title, start, end).unwrap()
    }

    fn sample_timeline() -> SessionTimeline {
        let mut timeline = SessionTimeline::new(12);
        timeline
            .insert("Editor", [interval("Writing", 0, 5)])
            .unwrap();
        timeline
            .insert("Browser", [interval("Docs", 5, 7), interval("Mail", 7, 10)])
            .unwrap();
        timeline
    }

    fn open() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("focusline.db")).unwrap();
        (dir, db)
    }

    #[tokio::test]
    async fn stored_timeline_reads_back_identically() {
        let (_dir, db) = open();
        let timeline = sample_timeline();

        db.insert_timeline(&timeline).await.unwrap();
        let loaded = db.get_timeline(timeline.id()).await.unwrap().unwrap();

        assert_eq!(loaded, timeline);
        assert_eq!(loaded.windows()[0].window_class, "Editor");
        assert!(db.get_timeline("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_returns_most_recent_oldest_first() {
        let (_dir, db) = open();
        let mut ids = Vec::new();
        for _ in 0..3 {
            let timeline = sample_timeline();
            ids.push(timeline.id().to_string());
            db.insert_timeline(&timeline).await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        let listed: Vec<String> = db
            .list_timelines(2)
            .await
            .unwrap()
            .iter()
            .map(|t| t.id().to_string())
            .collect();
        assert_eq!(listed, ids[1..].to_vec());
    }

    #[tokio::test]
    async fn delete_cascades_to_intervals() {
        let (_dir, db) = open();
        let timeline = sample_timeline();
        db.insert_timeline(&timeline).await.unwrap();

        assert!(db.delete_timeline(timeline.id()).await.unwrap());
        assert!(!db.delete_timeline(timeline.id()).await.unwrap());

        let remaining: i64 = db
            .execute(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM timeline_intervals", [], |row| {
                    row.get(0)
                })?)
            })
            .await
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[tokio::test]
    async fn duplicate_id_is_rejected_without_partial_rows() {
        let (_dir, db) = open();
        let timeline = sample_timeline();
        db.insert_timeline(&timeline).await.unwrap();
        assert!(db.insert_timeline(&timeline).await.is_err());

        let rows: i64 = db
            .execute(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM timeline_intervals", [], |row| {
                    row.get(0)
                })?)
            })
            .await
            .unwrap();
        assert_eq!(rows, 3);
    }
}
