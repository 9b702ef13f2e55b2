use anyhow::Result;

use crate::detect::result::DetectionBox;
use crate::ingest::Frame;

/// Vehicle detector collaborator.
///
/// The analyzer never calls a detector itself; the processing loop hands the
/// returned boxes to `TimingAnalyzer::update_direction_density`. Detectors
/// own no analyzer state and apply no density logic.
pub trait VehicleDetector: Send {
    /// Backend identifier.
    fn name(&self) -> &'static str;

    /// Run detection on a frame and return vehicle boxes.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionBox>>;

    /// Optional warm-up hook.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<D: VehicleDetector + ?Sized> VehicleDetector for Box<D> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionBox>> {
        (**self).detect(frame)
    }

    fn warm_up(&mut self) -> Result<()> {
        (**self).warm_up()
    }
}
