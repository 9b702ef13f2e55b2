use anyhow::{anyhow, Result};
use serde::Serialize;

/// Axis-aligned vehicle bounding box in pixel coordinates.
///
/// Width and height are always positive; `new` is the only constructor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DetectionBox {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
}

impl DetectionBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!(
                "detection box must have positive size (got {}x{})",
                width,
                height
            ));
        }
        Ok(Self {
            x,
            y,
            width,
            height,
        })
    }

    pub fn x(&self) -> u32 {
        self.x
    }

    pub fn y(&self) -> u32 {
        self.y
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Width over height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}
