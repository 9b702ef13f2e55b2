use anyhow::{anyhow, Result};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{log_recommendations, log_status, log_timing, StatusRecord, TimingSample, TrafficLog};
use crate::analyzer::{Recommendation, SignalTiming};
use crate::intersection::Direction;

pub(super) const STATUS_LINE: &str = "status";

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum LogLine<'a> {
    Status(&'a StatusRecord),
    Recommendations {
        timestamp: f64,
        items: &'a [Recommendation],
    },
    Timing {
        timestamp: f64,
        directions: &'a [TimingSample],
    },
}

/// Appends one JSON object per line. Status records are also kept in memory
/// for the statistics export at shutdown.
pub struct JsonlTrafficLog {
    path: PathBuf,
    writer: BufWriter<File>,
    records: Vec<StatusRecord>,
}

impl JsonlTrafficLog {
    pub fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| anyhow!("failed to open traffic log {}: {}", path.display(), e))?;
        log::info!("traffic log: {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
            records: Vec::new(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_line(&mut self, line: &LogLine<'_>) -> Result<()> {
        serde_json::to_writer(&mut self.writer, line)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

impl TrafficLog for JsonlTrafficLog {
    fn record_status(&mut self, record: &StatusRecord) -> Result<()> {
        log_status(record);
        self.write_line(&LogLine::Status(record))?;
        self.records.push(record.clone());
        Ok(())
    }

    fn record_recommendations(
        &mut self,
        timestamp: f64,
        recommendations: &[Recommendation],
    ) -> Result<()> {
        log_recommendations(recommendations);
        self.write_line(&LogLine::Recommendations {
            timestamp,
            items: recommendations,
        })
    }

    fn record_timing(
        &mut self,
        timestamp: f64,
        plan: &[(Direction, SignalTiming)],
    ) -> Result<()> {
        let samples = TimingSample::from_plan(plan);
        log_timing(&samples);
        self.write_line(&LogLine::Timing {
            timestamp,
            directions: &samples,
        })
    }

    fn records(&self) -> Result<Vec<StatusRecord>> {
        Ok(self.records.clone())
    }
}
