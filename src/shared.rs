use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use anyhow::{anyhow, Result};

use crate::analyzer::{AnalyzerStatus, OptimalTiming, Recommendation, TimingAnalyzer};
use crate::detect::DetectionBox;
use crate::intersection::Direction;

/// Cloneable handle to one analyzer shared by a capture thread and a
/// display thread.
///
/// Every call holds the lock for the whole operation, so a status read sees
/// densities and counts from the same ingestion, never a mix.
#[derive(Clone)]
pub struct SharedAnalyzer {
    inner: Arc<Mutex<TimingAnalyzer>>,
}

impl SharedAnalyzer {
    pub fn new(analyzer: TimingAnalyzer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(analyzer)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, TimingAnalyzer>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("analyzer lock poisoned"))
    }

    /// Runs `f` with exclusive access to the analyzer.
    pub fn with<T>(&self, f: impl FnOnce(&mut TimingAnalyzer) -> T) -> Result<T> {
        let mut guard = self.lock()?;
        Ok(f(&mut *guard))
    }

    pub fn ingest_frame(
        &self,
        direction: Direction,
        detections: &[DetectionBox],
        frame_width: u32,
        frame_height: u32,
    ) -> Result<f64> {
        self.lock()?
            .update_direction_density(direction, detections, frame_width, frame_height)
    }

    pub fn tick(&self, now: Instant) -> Result<bool> {
        Ok(self.lock()?.tick(now))
    }

    pub fn status(&self, now: Instant) -> Result<AnalyzerStatus> {
        Ok(self.lock()?.get_status(now))
    }

    pub fn optimal_timing(&self) -> Result<OptimalTiming> {
        Ok(self.lock()?.compute_optimal_timing())
    }

    pub fn recommendations(&self) -> Result<Vec<Recommendation>> {
        Ok(self.lock()?.generate_recommendations())
    }

    /// Status and recommendations taken under one lock.
    pub fn snapshot(&self, now: Instant) -> Result<(AnalyzerStatus, Vec<Recommendation>)> {
        let mut guard = self.lock()?;
        let recommendations = guard.generate_recommendations();
        let status = guard.get_status(now);
        Ok((status, recommendations))
    }
}
