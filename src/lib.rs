//! Adaptive traffic-signal timing for a single intersection.
//!
//! Camera frames per approach are turned into vehicle detections, detections
//! into a coverage density, and densities into green-time suggestions for a
//! fixed cyclic sequence of signal phases.
//!
//! # Architecture
//!
//! The analyzer upholds these properties:
//!
//! 1. **Bounded cycle**: no phase's suggested green drops below minimum
//!    green. When no phase had to be raised to that minimum, suggested greens
//!    plus yellows sum to the configured cycle; a raised phase lengthens it.
//! 2. **Closed directions**: only directions in the configured phase layout
//!    are accepted; anything else is an `InvalidDirection` error.
//! 3. **Cyclic clock**: phases advance in layout order and wrap around.
//! 4. **Consistent snapshots**: shared access goes through one lock, so a
//!    status read never mixes two ingestions.
//!
//! # Module Structure
//!
//! - `intersection`: directions, phases and the phase layout
//! - `analyzer`: density ingestion, phase clock, timing and recommendations
//! - `shared`: lock-guarded analyzer handle for capture and display threads
//! - `detect`: vehicle detector trait, aspect filter and backends
//! - `ingest`: frame sources
//! - `record`: traffic history logs and CSV statistics
//! - `report`: session summary
//! - `config`: file and environment configuration

pub mod analyzer;
pub mod clock;
pub mod config;
pub mod detect;
pub mod error;
pub mod frame;
pub mod ingest;
pub mod intersection;
pub mod record;
pub mod report;
pub mod shared;
pub mod ui;

pub use analyzer::{
    AnalyzerStatus, DirectionStatus, OptimalTiming, Recommendation, SignalTiming, TimingAnalyzer,
    TimingBasis, TimingConfig, DEFAULT_YELLOW_SECS,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TrafficConfig;
pub use detect::{
    build_backend, DetectionBox, DetectorRegistry, FilteredDetector, ScriptedBackend,
    SyntheticBackend, SyntheticLoad, VehicleDetector, VehicleFilter,
};
pub use error::{analyzer_error, AnalyzerError};
pub use frame::Frame;
pub use ingest::{FrameSource, SyntheticConfig, SyntheticSource};
pub use intersection::{Direction, Phase, PhaseLayout};
pub use record::{
    read_jsonl, write_csv, InMemoryTrafficLog, JsonlTrafficLog, SqliteTrafficLog, StatusRecord,
    TimingSample, TrafficLog, TrafficRecorder,
};
pub use report::TrafficReport;
pub use shared::SharedAnalyzer;
