use anyhow::{anyhow, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::detect::backend::VehicleDetector;
use crate::detect::result::DetectionBox;
use crate::ingest::Frame;

const MIN_VEHICLE_WIDTH_PX: u32 = 60;
const MAX_VEHICLE_WIDTH_PX: u32 = 120;

/// Traffic level a synthetic camera simulates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SyntheticLoad {
    /// Mean number of vehicles per frame.
    pub mean_vehicles: f64,
    /// Frames per full rise-and-fall of the load wave; 0 keeps the load flat.
    pub wave_period_frames: u64,
}

impl SyntheticLoad {
    pub fn flat(mean_vehicles: f64) -> Self {
        Self {
            mean_vehicles,
            wave_period_frames: 0,
        }
    }

    fn mean_at(&self, sequence: u64) -> f64 {
        if self.wave_period_frames == 0 {
            return self.mean_vehicles;
        }
        let phase = (sequence % self.wave_period_frames) as f64 / self.wave_period_frames as f64;
        self.mean_vehicles * (1.0 + 0.5 * (phase * std::f64::consts::TAU).sin())
    }
}

/// Seeded generator of plausible vehicle boxes.
///
/// Output depends only on the seed and the frame sequence of calls, so demo
/// runs and tests are reproducible.
pub struct SyntheticBackend {
    rng: StdRng,
    load: SyntheticLoad,
}

impl SyntheticBackend {
    pub fn new(seed: u64, load: SyntheticLoad) -> Result<Self> {
        if !load.mean_vehicles.is_finite() || load.mean_vehicles < 0.0 {
            return Err(anyhow!(
                "synthetic load must be a non-negative number of vehicles"
            ));
        }
        Ok(Self {
            rng: StdRng::seed_from_u64(seed),
            load,
        })
    }

    fn vehicle_box(&mut self, frame: &Frame) -> Result<DetectionBox> {
        let width = self
            .rng
            .gen_range(MIN_VEHICLE_WIDTH_PX..=MAX_VEHICLE_WIDTH_PX)
            .min(frame.width);
        // width / height stays inside the 0.7..=2.0 vehicle band
        let ratio: f64 = self.rng.gen_range(0.8..1.8);
        let height = ((width as f64 / ratio).round() as u32).clamp(1, frame.height);
        let x = self.rng.gen_range(0..=frame.width - width);
        let y = self.rng.gen_range(0..=frame.height - height);
        DetectionBox::new(x, y, width.max(1), height)
    }
}

impl VehicleDetector for SyntheticBackend {
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionBox>> {
        let mean = self.load.mean_at(frame.sequence);
        let upper = (mean * 2.0).round() as u32;
        let count = if upper == 0 {
            0
        } else {
            self.rng.gen_range(0..=upper)
        };
        (0..count).map(|_| self.vehicle_box(frame)).collect()
    }
}
