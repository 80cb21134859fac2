use thiserror::Error;

/// Domain errors raised at the timeline boundary.
///
/// Infrastructure failures (database, settings file) travel as `anyhow::Error`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    #[error("invalid interval [{start}, {end}]: end must be greater than start")]
    InvalidInterval { start: u64, end: u64 },

    #[error("interval for '{window_class}' starts at {start} before the last stored end {previous_end}")]
    OverlappingInterval {
        window_class: String,
        start: u64,
        previous_end: u64,
    },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),
}

pub type TimelineResult<T> = Result<T, TimelineError>;
