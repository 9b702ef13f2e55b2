use crate::intersection::Direction;

/// Domain failures raised by the analyzer and its configuration.
///
/// Library functions return `anyhow::Result`; these values travel inside the
/// `anyhow::Error` and callers that need to branch on them use
/// `err.downcast_ref::<AnalyzerError>()`.
#[derive(Clone, Debug, PartialEq)]
pub enum AnalyzerError {
    /// Direction is not part of the configured layout.
    InvalidDirection(Direction),
    /// Frame width or height is zero.
    InvalidFrameDimensions { width: u32, height: u32 },
    /// Phase layout does not partition the direction set.
    InvalidLayout(String),
    /// A green duration of zero seconds was requested.
    InvalidGreenTime { direction: Direction, seconds: u32 },
    /// Timing or capture configuration is out of range.
    InvalidConfig(String),
}

impl AnalyzerError {
    pub fn code(&self) -> &'static str {
        match self {
            AnalyzerError::InvalidDirection(_) => "INVALID_DIRECTION",
            AnalyzerError::InvalidFrameDimensions { .. } => "INVALID_FRAME_DIMENSIONS",
            AnalyzerError::InvalidLayout(_) => "INVALID_LAYOUT",
            AnalyzerError::InvalidGreenTime { .. } => "INVALID_GREEN_TIME",
            AnalyzerError::InvalidConfig(_) => "INVALID_CONFIG",
        }
    }
}

impl std::fmt::Display for AnalyzerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalyzerError::InvalidDirection(direction) => write!(
                f,
                "{}: direction {} is not part of this intersection",
                self.code(),
                direction
            ),
            AnalyzerError::InvalidFrameDimensions { width, height } => write!(
                f,
                "{}: frame dimensions must be positive (got {}x{})",
                self.code(),
                width,
                height
            ),
            AnalyzerError::InvalidLayout(message) | AnalyzerError::InvalidConfig(message) => {
                write!(f, "{}: {}", self.code(), message)
            }
            AnalyzerError::InvalidGreenTime { direction, seconds } => write!(
                f,
                "{}: green time for {} must be positive (got {}s)",
                self.code(),
                direction,
                seconds
            ),
        }
    }
}

impl std::error::Error for AnalyzerError {}

/// Returns the analyzer error carried by `err`, if any.
pub fn analyzer_error(err: &anyhow::Error) -> Option<&AnalyzerError> {
    err.downcast_ref::<AnalyzerError>()
}
