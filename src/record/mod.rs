//! Persistent traffic history: one flattened row per status sample.
//!
//! Backends share the `TrafficLog` trait so the daemon can hold any of them
//! behind a `Box<dyn TrafficLog>`.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::analyzer::{join_directions, AnalyzerStatus, Recommendation, SignalTiming};
use crate::intersection::{Direction, Phase};

mod jsonl;
mod memory;
mod recorder;
mod sqlite;

pub use jsonl::JsonlTrafficLog;
pub use memory::InMemoryTrafficLog;
pub use recorder::TrafficRecorder;
pub use sqlite::SqliteTrafficLog;

/// Density and vehicle count for one approach at sample time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DirectionSample {
    pub direction: Direction,
    pub density: f64,
    pub vehicle_count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Wall-clock seconds since the Unix epoch.
    pub timestamp: f64,
    pub directions: Vec<DirectionSample>,
    pub current_phase: Phase,
    pub current_directions: String,
    pub time_remaining_secs: f64,
    pub current_phase_secs: u64,
    pub elapsed_secs: f64,
}

impl StatusRecord {
    pub fn from_status(status: &AnalyzerStatus, timestamp: f64) -> Self {
        Self {
            timestamp,
            directions: status
                .directions
                .iter()
                .map(|d| DirectionSample {
                    direction: d.direction,
                    density: d.density,
                    vehicle_count: d.vehicle_count,
                })
                .collect(),
            current_phase: status.current_phase,
            current_directions: join_directions(&status.current_directions),
            time_remaining_secs: status.remaining_secs,
            current_phase_secs: status.phase_duration_secs,
            elapsed_secs: status.elapsed_secs,
        }
    }

    pub fn sample(&self, direction: Direction) -> Option<&DirectionSample> {
        self.directions.iter().find(|s| s.direction == direction)
    }
}

/// Current against suggested green for one approach.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingSample {
    pub direction: Direction,
    pub current_green_secs: u32,
    pub suggested_green_secs: Option<u32>,
    pub difference_secs: Option<i64>,
}

impl TimingSample {
    pub fn from_plan(plan: &[(Direction, SignalTiming)]) -> Vec<Self> {
        plan.iter()
            .map(|(direction, timing)| Self {
                direction: *direction,
                current_green_secs: timing.current_green_secs,
                suggested_green_secs: timing.suggested_green_secs,
                difference_secs: timing.difference_secs(),
            })
            .collect()
    }
}

pub trait TrafficLog: Send {
    fn record_status(&mut self, record: &StatusRecord) -> Result<()>;

    fn record_recommendations(
        &mut self,
        timestamp: f64,
        recommendations: &[Recommendation],
    ) -> Result<()>;

    /// Records the signal plan as current, suggested and difference per
    /// direction.
    fn record_timing(
        &mut self,
        timestamp: f64,
        plan: &[(Direction, SignalTiming)],
    ) -> Result<()>;

    /// Status records in insertion order.
    fn records(&self) -> Result<Vec<StatusRecord>>;
}

pub fn epoch_secs() -> Result<f64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| anyhow!("system clock is before the Unix epoch"))?
        .as_secs_f64())
}

fn log_status(record: &StatusRecord) {
    let densities = record
        .directions
        .iter()
        .map(|s| format!("{}={:.3}", s.direction.key(), s.density))
        .collect::<Vec<_>>()
        .join(" ");
    log::info!(
        "status: {} ({}) remaining={:.1}s {}",
        record.current_phase,
        record.current_directions,
        record.time_remaining_secs,
        densities
    );
}

fn log_recommendations(recommendations: &[Recommendation]) {
    for recommendation in recommendations {
        log::info!("recommendation: {}", recommendation);
    }
}

fn log_timing(samples: &[TimingSample]) {
    for sample in samples {
        match (sample.suggested_green_secs, sample.difference_secs) {
            (Some(suggested), Some(difference)) => log::info!(
                "timing: {} current={}s suggested={}s ({:+}s)",
                sample.direction,
                sample.current_green_secs,
                suggested,
                difference
            ),
            _ => log::info!(
                "timing: {} current={}s (no suggestion yet)",
                sample.direction,
                sample.current_green_secs
            ),
        }
    }
}

/// Reads status records from a JSONL traffic log. Lines of other kinds
/// (recommendations, timing) are skipped.
pub fn read_jsonl(path: &Path) -> Result<Vec<StatusRecord>> {
    let file = File::open(path)
        .map_err(|e| anyhow!("failed to open traffic log {}: {}", path.display(), e))?;
    let mut out = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let value: serde_json::Value = serde_json::from_str(&line)
            .map_err(|e| anyhow!("{}:{}: invalid JSON: {}", path.display(), index + 1, e))?;
        if value.get("type").and_then(|t| t.as_str()) != Some(jsonl::STATUS_LINE) {
            continue;
        }
        let record: StatusRecord = serde_json::from_value(value).map_err(|e| {
            anyhow!("{}:{}: invalid status record: {}", path.display(), index + 1, e)
        })?;
        out.push(record);
    }
    Ok(out)
}

/// Writes statistics as CSV: a header row, then one row per record. Direction
/// columns follow the first record. Nothing is written for an empty slice.
pub fn write_csv(path: &Path, records: &[StatusRecord]) -> Result<bool> {
    let Some(first) = records.first() else {
        log::warn!("no statistics to save");
        return Ok(false);
    };
    let directions: Vec<Direction> = first.directions.iter().map(|s| s.direction).collect();

    let file = File::create(path)
        .map_err(|e| anyhow!("failed to create {}: {}", path.display(), e))?;
    let mut writer = BufWriter::new(file);

    let mut header = vec!["timestamp".to_string()];
    for direction in &directions {
        header.push(format!("{}_density", direction.key()));
        header.push(format!("{}_vehicles", direction.key()));
    }
    header.extend(
        [
            "current_phase",
            "current_directions",
            "time_remaining",
            "current_phase_time",
            "elapsed_time",
        ]
        .map(str::to_string),
    );
    writeln!(writer, "{}", header.join(","))?;

    for record in records {
        let mut row = vec![format!("{:.3}", record.timestamp)];
        for direction in &directions {
            match record.sample(*direction) {
                Some(sample) => {
                    row.push(format!("{:.6}", sample.density));
                    row.push(sample.vehicle_count.to_string());
                }
                None => {
                    row.push(String::new());
                    row.push(String::new());
                }
            }
        }
        row.push(record.current_phase.key().to_string());
        row.push(record.current_directions.clone());
        row.push(format!("{:.1}", record.time_remaining_secs));
        row.push(record.current_phase_secs.to_string());
        row.push(format!("{:.1}", record.elapsed_secs));
        writeln!(writer, "{}", row.join(","))?;
    }
    writer.flush()?;
    log::info!("saved {} records to {}", records.len(), path.display());
    Ok(true)
}

#[cfg(test)]
pub(crate) fn sample_record(
    timestamp: f64,
    north: (f64, usize),
    south: (f64, usize),
) -> StatusRecord {
    StatusRecord {
        timestamp,
        directions: vec![
            DirectionSample {
                direction: Direction::North,
                density: north.0,
                vehicle_count: north.1,
            },
            DirectionSample {
                direction: Direction::South,
                density: south.0,
                vehicle_count: south.1,
            },
        ],
        current_phase: Phase::Phase1,
        current_directions: "North-South".to_string(),
        time_remaining_secs: 12.5,
        current_phase_secs: 33,
        elapsed_secs: 20.5,
    }
}
