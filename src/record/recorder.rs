use anyhow::Result;

use super::{write_csv, JsonlTrafficLog, SqliteTrafficLog, StatusRecord, TrafficLog};
use crate::analyzer::{Recommendation, SignalTiming};
use crate::config::LoggingSettings;
use crate::intersection::Direction;

/// Fans samples out to the configured log sinks and keeps every status
/// record for the statistics export. Statistics are collected even when
/// logging is disabled.
pub struct TrafficRecorder {
    sinks: Vec<Box<dyn TrafficLog>>,
    statistics: Vec<StatusRecord>,
}

impl TrafficRecorder {
    pub fn new(sinks: Vec<Box<dyn TrafficLog>>) -> Self {
        Self {
            sinks,
            statistics: Vec::new(),
        }
    }

    /// Opens the JSONL log (and the SQLite log, if configured) when logging
    /// is enabled.
    pub fn open(settings: &LoggingSettings) -> Result<Self> {
        let mut sinks: Vec<Box<dyn TrafficLog>> = Vec::new();
        if settings.enabled {
            sinks.push(Box::new(JsonlTrafficLog::open(&settings.log_path)?));
            if let Some(path) = &settings.sqlite_path {
                sinks.push(Box::new(SqliteTrafficLog::open(path)?));
            }
        }
        Ok(Self::new(sinks))
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    pub fn record(
        &mut self,
        record: StatusRecord,
        recommendations: &[Recommendation],
        plan: &[(Direction, SignalTiming)],
    ) -> Result<()> {
        for sink in self.sinks.iter_mut() {
            sink.record_status(&record)?;
            sink.record_recommendations(record.timestamp, recommendations)?;
            sink.record_timing(record.timestamp, plan)?;
        }
        self.statistics.push(record);
        Ok(())
    }

    pub fn statistics(&self) -> &[StatusRecord] {
        &self.statistics
    }

    /// Writes the statistics CSV when `save_statistics` is set. Returns
    /// whether a file was written.
    pub fn save_statistics(&self, settings: &LoggingSettings) -> Result<bool> {
        if !settings.save_statistics {
            return Ok(false);
        }
        write_csv(&settings.statistics_path, &self.statistics)
    }
}
