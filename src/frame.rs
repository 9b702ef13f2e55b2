//! Captured frame identity.
//!
//! The analyzer never sees pixels. A `Frame` carries what the processing
//! loop needs to route detections: which camera it came from, its position
//! in that camera's stream, and the dimensions density is measured against.

use anyhow::Result;

use crate::error::AnalyzerError;
use crate::intersection::Direction;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub direction: Direction,
    /// Zero-based position in the camera stream.
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(direction: Direction, sequence: u64, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(AnalyzerError::InvalidFrameDimensions { width, height }.into());
        }
        Ok(Self {
            direction,
            sequence,
            width,
            height,
        })
    }
}
