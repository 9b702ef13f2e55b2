use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analyzer::TimingConfig;
use crate::detect::{SyntheticLoad, VehicleFilter};
use crate::error::AnalyzerError;
use crate::intersection::{Direction, Phase, PhaseLayout};

const DEFAULT_LAYOUT: &str = "four_way";
const DEFAULT_CAPTURE_FPS: u32 = 10;
const DEFAULT_CAPTURE_WIDTH: u32 = 640;
const DEFAULT_CAPTURE_HEIGHT: u32 = 480;
const DEFAULT_DETECTOR_BACKEND: &str = "synthetic";
const DEFAULT_DETECTOR_SEED: u64 = 42;
const DEFAULT_VEHICLES_PER_FRAME: f64 = 3.0;
const DEFAULT_LOG_PATH: &str = "traffic_log.jsonl";
const DEFAULT_STATISTICS_PATH: &str = "traffic_statistics.csv";
const DEFAULT_STATUS_INTERVAL_FRAMES: u64 = 30;

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct TrafficConfigFile {
    timing: Option<TimingConfigFile>,
    layout: Option<LayoutConfigFile>,
    capture: Option<CaptureConfigFile>,
    detector: Option<DetectorConfigFile>,
    logging: Option<LoggingConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct TimingConfigFile {
    density_threshold: Option<f64>,
    total_cycle_secs: Option<u32>,
    min_green_secs: Option<u32>,
    yellow_secs: Option<u32>,
    significance_threshold_secs: Option<u32>,
    default_green_secs: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct LayoutConfigFile {
    preset: Option<String>,
    phases: Option<Vec<PhaseConfigFile>>,
}

#[derive(Debug, Deserialize)]
struct PhaseConfigFile {
    phase: Phase,
    directions: Vec<Direction>,
}

#[derive(Debug, Deserialize, Default)]
struct CaptureConfigFile {
    target_fps: Option<u32>,
    width: Option<u32>,
    height: Option<u32>,
    frame_limit: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    backend: Option<String>,
    seed: Option<u64>,
    vehicles_per_frame: Option<BTreeMap<Direction, f64>>,
    wave_period_frames: Option<u64>,
    min_aspect_ratio: Option<f64>,
    max_aspect_ratio: Option<f64>,
    min_side_px: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct LoggingConfigFile {
    enabled: Option<bool>,
    log_path: Option<PathBuf>,
    statistics_path: Option<PathBuf>,
    save_statistics: Option<bool>,
    sqlite_path: Option<PathBuf>,
    status_interval_frames: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct TrafficConfig {
    pub timing: TimingConfig,
    pub layout: PhaseLayout,
    pub capture: CaptureSettings,
    pub detector: DetectorSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone)]
pub struct CaptureSettings {
    pub target_fps: u32,
    pub width: u32,
    pub height: u32,
    pub frame_limit: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub backend: String,
    pub seed: u64,
    pub vehicles_per_frame: BTreeMap<Direction, f64>,
    pub wave_period_frames: u64,
    pub filter: VehicleFilter,
}

impl DetectorSettings {
    pub fn load_for(&self, direction: Direction) -> SyntheticLoad {
        SyntheticLoad {
            mean_vehicles: self
                .vehicles_per_frame
                .get(&direction)
                .copied()
                .unwrap_or(DEFAULT_VEHICLES_PER_FRAME),
            wave_period_frames: self.wave_period_frames,
        }
    }

    /// Per-camera seed, so cameras sharing a config do not see identical traffic.
    pub fn seed_for(&self, direction: Direction) -> u64 {
        let index = Direction::ALL
            .iter()
            .position(|candidate| *candidate == direction)
            .unwrap_or(0) as u64;
        self.seed.wrapping_mul(31).wrapping_add(index)
    }
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub enabled: bool,
    pub log_path: PathBuf,
    pub statistics_path: PathBuf,
    pub save_statistics: bool,
    pub sqlite_path: Option<PathBuf>,
    pub status_interval_frames: u64,
}

impl TrafficConfig {
    /// Loads the file named by `TRAFFIC_CONFIG` (if set), applies
    /// `TRAFFIC_*` environment overrides and validates the result.
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("TRAFFIC_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) if !path.trim().is_empty() => Some(read_config_file(Path::new(path))?),
            _ => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default())?;
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Loads one config file without consulting the environment.
    pub fn from_path(path: &Path) -> Result<Self> {
        let cfg = Self::from_file(read_config_file(path)?)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Built-in defaults, ignoring the environment.
    pub fn defaults() -> Result<Self> {
        Self::from_file(TrafficConfigFile::default())
    }

    fn from_file(file: TrafficConfigFile) -> Result<Self> {
        let defaults = TimingConfig::default();
        let timing_file = file.timing.unwrap_or_default();
        let timing = TimingConfig {
            density_threshold: timing_file
                .density_threshold
                .unwrap_or(defaults.density_threshold),
            total_cycle_secs: timing_file
                .total_cycle_secs
                .unwrap_or(defaults.total_cycle_secs),
            min_green_secs: timing_file
                .min_green_secs
                .unwrap_or(defaults.min_green_secs),
            yellow_secs: timing_file.yellow_secs.unwrap_or(defaults.yellow_secs),
            significance_threshold_secs: timing_file
                .significance_threshold_secs
                .unwrap_or(defaults.significance_threshold_secs),
            default_green_secs: timing_file
                .default_green_secs
                .unwrap_or(defaults.default_green_secs),
        };

        let layout_file = file.layout.unwrap_or_default();
        let layout = match (layout_file.phases, layout_file.preset) {
            (Some(_), Some(_)) => {
                return Err(anyhow!(
                    "layout: set either a preset or explicit phases, not both"
                ))
            }
            (Some(phases), None) => PhaseLayout::new(
                phases
                    .into_iter()
                    .map(|phase| (phase.phase, phase.directions))
                    .collect(),
            )?,
            (None, preset) => PhaseLayout::preset(preset.as_deref().unwrap_or(DEFAULT_LAYOUT))?,
        };

        let capture_file = file.capture.unwrap_or_default();
        let capture = CaptureSettings {
            target_fps: capture_file.target_fps.unwrap_or(DEFAULT_CAPTURE_FPS),
            width: capture_file.width.unwrap_or(DEFAULT_CAPTURE_WIDTH),
            height: capture_file.height.unwrap_or(DEFAULT_CAPTURE_HEIGHT),
            frame_limit: capture_file.frame_limit,
        };

        let detector_file = file.detector.unwrap_or_default();
        let default_filter = VehicleFilter::default();
        let detector = DetectorSettings {
            backend: detector_file
                .backend
                .unwrap_or_else(|| DEFAULT_DETECTOR_BACKEND.to_string()),
            seed: detector_file.seed.unwrap_or(DEFAULT_DETECTOR_SEED),
            vehicles_per_frame: detector_file.vehicles_per_frame.unwrap_or_default(),
            wave_period_frames: detector_file.wave_period_frames.unwrap_or(0),
            filter: VehicleFilter {
                min_aspect_ratio: detector_file
                    .min_aspect_ratio
                    .unwrap_or(default_filter.min_aspect_ratio),
                max_aspect_ratio: detector_file
                    .max_aspect_ratio
                    .unwrap_or(default_filter.max_aspect_ratio),
                min_side_px: detector_file
                    .min_side_px
                    .unwrap_or(default_filter.min_side_px),
            },
        };

        let logging_file = file.logging.unwrap_or_default();
        let logging = LoggingSettings {
            enabled: logging_file.enabled.unwrap_or(true),
            log_path: logging_file
                .log_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_PATH)),
            statistics_path: logging_file
                .statistics_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STATISTICS_PATH)),
            save_statistics: logging_file.save_statistics.unwrap_or(true),
            sqlite_path: logging_file.sqlite_path,
            status_interval_frames: logging_file
                .status_interval_frames
                .unwrap_or(DEFAULT_STATUS_INTERVAL_FRAMES),
        };

        Ok(Self {
            timing,
            layout,
            capture,
            detector,
            logging,
        })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(threshold) = env_parse::<f64>("TRAFFIC_DENSITY_THRESHOLD")? {
            self.timing.density_threshold = threshold;
        }
        if let Some(secs) = env_parse::<u32>("TRAFFIC_CYCLE_SECS")? {
            self.timing.total_cycle_secs = secs;
        }
        if let Some(secs) = env_parse::<u32>("TRAFFIC_MIN_GREEN_SECS")? {
            self.timing.min_green_secs = secs;
        }
        if let Some(secs) = env_parse::<u32>("TRAFFIC_YELLOW_SECS")? {
            self.timing.yellow_secs = secs;
        }
        if let Ok(layout) = std::env::var("TRAFFIC_LAYOUT") {
            if !layout.trim().is_empty() {
                self.layout = PhaseLayout::preset(&layout)?;
            }
        }
        if let Ok(path) = std::env::var("TRAFFIC_LOG_PATH") {
            if !path.trim().is_empty() {
                self.logging.log_path = PathBuf::from(path);
            }
        }
        if let Ok(path) = std::env::var("TRAFFIC_STATS_PATH") {
            if !path.trim().is_empty() {
                self.logging.statistics_path = PathBuf::from(path);
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.timing.validate(self.layout.phase_count())?;

        if self.capture.target_fps == 0 {
            return Err(invalid_config("capture target_fps must be >= 1"));
        }
        if self.capture.width == 0 || self.capture.height == 0 {
            return Err(AnalyzerError::InvalidFrameDimensions {
                width: self.capture.width,
                height: self.capture.height,
            }
            .into());
        }

        for (direction, load) in &self.detector.vehicles_per_frame {
            if !load.is_finite() || *load < 0.0 {
                return Err(invalid_config(&format!(
                    "vehicles_per_frame for {} must be a non-negative number",
                    direction
                )));
            }
            if !self.layout.contains(*direction) {
                return Err(AnalyzerError::InvalidDirection(*direction).into());
            }
        }
        let filter = &self.detector.filter;
        if !(filter.min_aspect_ratio > 0.0 && filter.min_aspect_ratio <= filter.max_aspect_ratio)
        {
            return Err(invalid_config(
                "detector aspect ratio bounds must satisfy 0 < min <= max",
            ));
        }

        if self.logging.status_interval_frames == 0 {
            return Err(invalid_config("logging status_interval_frames must be >= 1"));
        }
        if self.logging.status_interval_frames > u64::from(u32::MAX) {
            return Err(invalid_config(&format!(
                "logging status_interval_frames must be <= {}",
                u32::MAX
            )));
        }
        Ok(())
    }

    /// Wall-clock time between status samples at the target frame rate.
    pub fn status_interval(&self) -> Duration {
        let fps = f64::from(self.capture.target_fps.max(1));
        Duration::try_from_secs_f64(self.logging.status_interval_frames as f64 / fps)
            .unwrap_or(Duration::MAX)
    }
}

fn invalid_config(message: &str) -> anyhow::Error {
    AnalyzerError::InvalidConfig(message.to_string()).into()
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| anyhow!("{} has an invalid value '{}'", key, value)),
        _ => Ok(None),
    }
}

fn read_config_file(path: &Path) -> Result<TrafficConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let is_toml = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    let cfg = if is_toml {
        toml::from_str(&raw).map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    } else {
        serde_json::from_str(&raw)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?
    };
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() -> Result<()> {
        let cfg = TrafficConfig::from_file(TrafficConfigFile::default())?;
        cfg.validate()?;
        assert_eq!(cfg.timing, TimingConfig::default());
        assert_eq!(cfg.layout, PhaseLayout::four_way());
        assert_eq!(cfg.capture.target_fps, 10);
        assert_eq!(cfg.detector.backend, "synthetic");
        assert_eq!(cfg.detector.load_for(Direction::North).mean_vehicles, 3.0);
        assert!(cfg.logging.enabled);
        assert!(cfg.logging.sqlite_path.is_none());
        Ok(())
    }

    #[test]
    fn explicit_phases_replace_preset() -> Result<()> {
        let file: TrafficConfigFile = serde_json::from_str(
            r#"{
                "layout": {
                    "phases": [
                        { "phase": "phase1", "directions": ["north"] },
                        { "phase": "phase2", "directions": ["east", "west"] },
                        { "phase": "phase3", "directions": ["south"] }
                    ]
                }
            }"#,
        )?;
        let cfg = TrafficConfig::from_file(file)?;
        assert_eq!(cfg.layout.phase_count(), 3);
        assert_eq!(cfg.layout.phase_of(Direction::South), Some(Phase::Phase3));
        Ok(())
    }

    #[test]
    fn rejects_preset_and_phases_together() -> Result<()> {
        let file: TrafficConfigFile = serde_json::from_str(
            r#"{ "layout": { "preset": "two_road", "phases": [] } }"#,
        )?;
        assert!(TrafficConfig::from_file(file).is_err());
        Ok(())
    }

    #[test]
    fn rejects_load_for_unknown_direction() -> Result<()> {
        let file: TrafficConfigFile = serde_json::from_str(
            r#"{
                "layout": { "preset": "two_road" },
                "detector": { "vehicles_per_frame": { "north": 2.0 } }
            }"#,
        )?;
        let cfg = TrafficConfig::from_file(file)?;
        assert!(cfg.validate().is_err());
        Ok(())
    }

    #[test]
    fn status_interval_follows_frame_rate() -> Result<()> {
        let mut cfg = TrafficConfig::from_file(TrafficConfigFile::default())?;
        assert_eq!(cfg.status_interval(), Duration::from_secs(3));

        cfg.logging.status_interval_frames = u64::from(u32::MAX);
        cfg.validate()?;
        assert!(cfg.status_interval() > Duration::from_secs(400_000_000));

        cfg.logging.status_interval_frames = 1 << 32;
        let err = cfg.validate().unwrap_err();
        assert!(matches!(
            crate::error::analyzer_error(&err),
            Some(AnalyzerError::InvalidConfig(_))
        ));
        assert!(cfg.status_interval() > Duration::ZERO);
        Ok(())
    }

    #[test]
    fn seeds_differ_per_direction() -> Result<()> {
        let cfg = TrafficConfig::from_file(TrafficConfigFile::default())?;
        assert_ne!(
            cfg.detector.seed_for(Direction::North),
            cfg.detector.seed_for(Direction::South)
        );
        Ok(())
    }
}
