use anyhow::Result;

use crate::detect::backend::VehicleDetector;
use crate::detect::result::DetectionBox;
use crate::ingest::Frame;

pub const DEFAULT_MIN_ASPECT_RATIO: f64 = 0.7;
pub const DEFAULT_MAX_ASPECT_RATIO: f64 = 2.0;
pub const DEFAULT_MIN_SIDE_PX: u32 = 30;

/// Post-detection false-positive filter.
///
/// Vehicles seen from a road camera are wider than tall but rarely more than
/// twice as wide; boxes outside that band or below the minimum size are dropped.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VehicleFilter {
    pub min_aspect_ratio: f64,
    pub max_aspect_ratio: f64,
    pub min_side_px: u32,
}

impl Default for VehicleFilter {
    fn default() -> Self {
        Self {
            min_aspect_ratio: DEFAULT_MIN_ASPECT_RATIO,
            max_aspect_ratio: DEFAULT_MAX_ASPECT_RATIO,
            min_side_px: DEFAULT_MIN_SIDE_PX,
        }
    }
}

impl VehicleFilter {
    pub fn accepts(&self, bbox: &DetectionBox) -> bool {
        let ratio = bbox.aspect_ratio();
        bbox.width() >= self.min_side_px
            && bbox.height() >= self.min_side_px
            && (self.min_aspect_ratio..=self.max_aspect_ratio).contains(&ratio)
    }

    pub fn apply(&self, boxes: Vec<DetectionBox>) -> Vec<DetectionBox> {
        boxes.into_iter().filter(|bbox| self.accepts(bbox)).collect()
    }
}

/// Wraps a detector and applies a `VehicleFilter` to its output.
pub struct FilteredDetector<D> {
    inner: D,
    filter: VehicleFilter,
}

impl<D: VehicleDetector> FilteredDetector<D> {
    pub fn new(inner: D, filter: VehicleFilter) -> Self {
        Self { inner, filter }
    }
}

impl<D: VehicleDetector> VehicleDetector for FilteredDetector<D> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionBox>> {
        let raw = self.inner.detect(frame)?;
        let before = raw.len();
        let kept = self.filter.apply(raw);
        if kept.len() != before {
            log::trace!(
                "{} frame {}: filtered {} of {} boxes",
                frame.direction,
                frame.sequence,
                before - kept.len(),
                before
            );
        }
        Ok(kept)
    }

    fn warm_up(&mut self) -> Result<()> {
        self.inner.warm_up()
    }
}
