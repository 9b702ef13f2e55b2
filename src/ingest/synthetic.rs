use anyhow::Result;

use super::{Frame, FrameSource};
use crate::error::AnalyzerError;
use crate::intersection::Direction;

/// Configuration for a synthetic camera.
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub direction: Direction,
    pub width: u32,
    pub height: u32,
    /// Stop after this many frames; `None` streams forever.
    pub frame_limit: Option<u64>,
}

impl SyntheticConfig {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            width: 640,
            height: 480,
            frame_limit: None,
        }
    }
}

/// Synthetic frame source. Pairs with `SyntheticBackend` for detections.
pub struct SyntheticSource {
    config: SyntheticConfig,
    frames_captured: u64,
}

impl SyntheticSource {
    pub fn new(config: SyntheticConfig) -> Result<Self> {
        if config.width == 0 || config.height == 0 {
            return Err(AnalyzerError::InvalidFrameDimensions {
                width: config.width,
                height: config.height,
            }
            .into());
        }
        log::info!(
            "SyntheticSource: {} camera at {}x{}",
            config.direction,
            config.width,
            config.height
        );
        Ok(Self {
            config,
            frames_captured: 0,
        })
    }

    pub fn frames_captured(&self) -> u64 {
        self.frames_captured
    }
}

impl FrameSource for SyntheticSource {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if let Some(limit) = self.config.frame_limit {
            if self.frames_captured >= limit {
                return Ok(None);
            }
        }
        let frame = Frame::new(
            self.config.direction,
            self.frames_captured,
            self.config.width,
            self.config.height,
        )?;
        self.frames_captured += 1;
        Ok(Some(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_frame_limit() -> Result<()> {
        let mut source = SyntheticSource::new(SyntheticConfig {
            frame_limit: Some(2),
            ..SyntheticConfig::new(Direction::South)
        })?;
        let first = source.next_frame()?.expect("first frame");
        assert_eq!(first.sequence, 0);
        assert_eq!(first.direction, Direction::South);
        assert_eq!(source.next_frame()?.map(|f| f.sequence), Some(1));
        assert!(source.next_frame()?.is_none());
        assert_eq!(source.frames_captured(), 2);
        Ok(())
    }

    #[test]
    fn rejects_zero_dimensions() {
        let config = SyntheticConfig {
            width: 0,
            ..SyntheticConfig::new(Direction::North)
        };
        assert!(SyntheticSource::new(config).is_err());
    }
}
