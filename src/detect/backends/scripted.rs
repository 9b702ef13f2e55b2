use anyhow::Result;

use crate::detect::backend::VehicleDetector;
use crate::detect::result::DetectionBox;
use crate::ingest::Frame;

/// Replays a fixed list of per-frame detections, cycling when exhausted.
///
/// An empty script yields no detections for every frame.
#[derive(Clone, Debug, Default)]
pub struct ScriptedBackend {
    script: Vec<Vec<DetectionBox>>,
    cursor: usize,
}

impl ScriptedBackend {
    pub fn new(script: Vec<Vec<DetectionBox>>) -> Self {
        Self { script, cursor: 0 }
    }

    /// Same boxes on every frame.
    pub fn constant(boxes: Vec<DetectionBox>) -> Self {
        Self::new(vec![boxes])
    }
}

impl VehicleDetector for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn detect(&mut self, _frame: &Frame) -> Result<Vec<DetectionBox>> {
        if self.script.is_empty() {
            return Ok(Vec::new());
        }
        let boxes = self.script[self.cursor].clone();
        self.cursor = (self.cursor + 1) % self.script.len();
        Ok(boxes)
    }
}
