mod backend;
pub mod backends;
mod filter;
mod registry;
mod result;

pub use backend::VehicleDetector;
pub use backends::{ScriptedBackend, SyntheticBackend, SyntheticLoad};
pub use filter::{FilteredDetector, VehicleFilter};
pub use registry::{build_backend, DetectorRegistry};
pub use result::DetectionBox;
