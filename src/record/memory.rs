use anyhow::Result;

use super::{log_recommendations, log_status, log_timing, StatusRecord, TimingSample, TrafficLog};
use crate::analyzer::{Recommendation, SignalTiming};
use crate::intersection::Direction;

#[derive(Clone, Debug, Default)]
pub struct InMemoryTrafficLog {
    records: Vec<StatusRecord>,
    recommendations: Vec<(f64, Vec<Recommendation>)>,
    timings: Vec<(f64, Vec<TimingSample>)>,
}

impl InMemoryTrafficLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recommendations(&self) -> &[(f64, Vec<Recommendation>)] {
        &self.recommendations
    }

    pub fn timings(&self) -> &[(f64, Vec<TimingSample>)] {
        &self.timings
    }
}

impl TrafficLog for InMemoryTrafficLog {
    fn record_status(&mut self, record: &StatusRecord) -> Result<()> {
        log_status(record);
        self.records.push(record.clone());
        Ok(())
    }

    fn record_recommendations(
        &mut self,
        timestamp: f64,
        recommendations: &[Recommendation],
    ) -> Result<()> {
        log_recommendations(recommendations);
        self.recommendations.push((timestamp, recommendations.to_vec()));
        Ok(())
    }

    fn record_timing(
        &mut self,
        timestamp: f64,
        plan: &[(Direction, SignalTiming)],
    ) -> Result<()> {
        let samples = TimingSample::from_plan(plan);
        log_timing(&samples);
        self.timings.push((timestamp, samples));
        Ok(())
    }

    fn records(&self) -> Result<Vec<StatusRecord>> {
        Ok(self.records.clone())
    }
}
