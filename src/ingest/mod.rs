//! Frame acquisition.
//!
//! Real deployments point one camera at each approach. This crate ships a
//! synthetic source so the whole loop can run without video hardware; any
//! other source only has to implement `FrameSource`.

pub mod synthetic;

use anyhow::Result;

pub use crate::frame::Frame;
pub use synthetic::{SyntheticConfig, SyntheticSource};

/// A stream of frames for one approach.
pub trait FrameSource: Send {
    /// Next frame, or `None` once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}
