use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::detect::backends::{ScriptedBackend, SyntheticBackend, SyntheticLoad};
use crate::detect::result::DetectionBox;
use crate::error::AnalyzerError;
use crate::ingest::Frame;
use crate::intersection::Direction;

use super::backend::VehicleDetector;

/// Thread-safe registry of per-camera detectors.
///
/// Each approach has its own camera, and detectors may keep per-stream state,
/// so detectors are keyed by direction. Entries are wrapped in `Mutex` because
/// `VehicleDetector::detect` takes `&mut self`.
#[derive(Default)]
pub struct DetectorRegistry {
    detectors: BTreeMap<Direction, Arc<Mutex<dyn VehicleDetector>>>,
}

impl DetectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the detector for a direction, replacing any previous one.
    pub fn register<D: VehicleDetector + 'static>(&mut self, direction: Direction, detector: D) {
        if let Some(previous) = self
            .detectors
            .insert(direction, Arc::new(Mutex::new(detector)))
        {
            if let Ok(previous) = previous.lock() {
                log::debug!("replaced {} detector for {}", previous.name(), direction);
            }
        }
    }

    pub fn get(&self, direction: Direction) -> Option<Arc<Mutex<dyn VehicleDetector>>> {
        self.detectors.get(&direction).cloned()
    }

    /// Registered directions, sorted.
    pub fn directions(&self) -> Vec<Direction> {
        self.detectors.keys().copied().collect()
    }

    pub fn warm_up_all(&self) -> Result<()> {
        for (direction, detector) in &self.detectors {
            let mut guard = detector
                .lock()
                .map_err(|_| anyhow!("detector lock poisoned for {}", direction))?;
            guard.warm_up()?;
        }
        Ok(())
    }

    /// Run the direction's detector on a frame captured for that direction.
    pub fn detect(&self, direction: Direction, frame: &Frame) -> Result<Vec<DetectionBox>> {
        if frame.direction != direction {
            return Err(anyhow!(
                "frame from {} handed to the {} detector",
                frame.direction,
                direction
            ));
        }
        let detector = self
            .get(direction)
            .ok_or(AnalyzerError::InvalidDirection(direction))?;
        let mut guard = detector
            .lock()
            .map_err(|_| anyhow!("detector lock poisoned for {}", direction))?;
        guard.detect(frame)
    }
}

/// Builds a detector backend from its configured name.
pub fn build_backend(
    name: &str,
    seed: u64,
    load: SyntheticLoad,
) -> Result<Box<dyn VehicleDetector>> {
    match name {
        "synthetic" => Ok(Box::new(SyntheticBackend::new(seed, load)?)),
        "scripted" => Ok(Box::new(ScriptedBackend::default())),
        other => Err(anyhow!("unknown detector backend '{}'", other)),
    }
}
