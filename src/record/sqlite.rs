use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};
use std::path::Path;

use super::{log_recommendations, log_status, log_timing, StatusRecord, TimingSample, TrafficLog};
use crate::analyzer::{Recommendation, SignalTiming};
use crate::intersection::Direction;

pub struct SqliteTrafficLog {
    conn: Connection,
}

impl SqliteTrafficLog {
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = Connection::open(db_path)
            .map_err(|e| anyhow!("failed to open {}: {}", db_path.display(), e))?;
        let mut log = Self { conn };
        log.ensure_schema()?;
        Ok(log)
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut log = Self {
            conn: Connection::open_in_memory()?,
        };
        log.ensure_schema()?;
        Ok(log)
    }

    fn ensure_schema(&mut self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            PRAGMA journal_mode=WAL;

            CREATE TABLE IF NOT EXISTS status_records (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              recorded_at REAL NOT NULL,
              current_phase TEXT NOT NULL,
              payload_json TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS recommendations (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              recorded_at REAL NOT NULL,
              message TEXT NOT NULL,
              payload_json TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS signal_timing (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              recorded_at REAL NOT NULL,
              direction TEXT NOT NULL,
              current_green_secs INTEGER NOT NULL,
              suggested_green_secs INTEGER,
              difference_secs INTEGER
            );

            CREATE INDEX IF NOT EXISTS idx_status_recorded ON status_records(recorded_at);
            "#,
        )?;
        Ok(())
    }

    pub fn recommendation_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM recommendations", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Latest suggested-minus-current difference recorded for a direction.
    pub fn latest_difference(&self, direction: Direction) -> Result<Option<i64>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT difference_secs FROM signal_timing
            WHERE direction = ?1
            ORDER BY id DESC LIMIT 1
            "#,
        )?;
        let mut rows = stmt.query(params![direction.key()])?;
        match rows.next()? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(None),
        }
    }
}

impl TrafficLog for SqliteTrafficLog {
    fn record_status(&mut self, record: &StatusRecord) -> Result<()> {
        log_status(record);
        let payload_json = serde_json::to_string(record)?;
        self.conn.execute(
            r#"
            INSERT INTO status_records(recorded_at, current_phase, payload_json)
            VALUES (?1, ?2, ?3)
            "#,
            params![record.timestamp, record.current_phase.key(), payload_json],
        )?;
        Ok(())
    }

    fn record_recommendations(
        &mut self,
        timestamp: f64,
        recommendations: &[Recommendation],
    ) -> Result<()> {
        log_recommendations(recommendations);
        let tx = self.conn.transaction()?;
        for recommendation in recommendations {
            tx.execute(
                r#"
                INSERT INTO recommendations(recorded_at, message, payload_json)
                VALUES (?1, ?2, ?3)
                "#,
                params![
                    timestamp,
                    recommendation.to_string(),
                    serde_json::to_string(recommendation)?
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn record_timing(
        &mut self,
        timestamp: f64,
        plan: &[(Direction, SignalTiming)],
    ) -> Result<()> {
        let samples = TimingSample::from_plan(plan);
        log_timing(&samples);
        let tx = self.conn.transaction()?;
        for sample in &samples {
            tx.execute(
                r#"
                INSERT INTO signal_timing(
                  recorded_at, direction, current_green_secs, suggested_green_secs, difference_secs
                )
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![
                    timestamp,
                    sample.direction.key(),
                    sample.current_green_secs,
                    sample.suggested_green_secs,
                    sample.difference_secs
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn records(&self) -> Result<Vec<StatusRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT payload_json FROM status_records ORDER BY id ASC")?;
        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let payload: String = row.get(0)?;
            out.push(serde_json::from_str(&payload)?);
        }
        Ok(out)
    }
}
