use crate::models::NO_WINDOW;

/// Tunables for the tick aggregator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Minimum consecutive ticks on a window before its buffer is committed.
    pub minimum_activity_duration_secs: u64,

    /// Keep sampling while the clock is on a break.
    pub sample_during_break: bool,

    /// Window classes that are never recorded (the app's own window).
    /// The `"none"` sentinel is always excluded.
    pub excluded_windows: Vec<String>,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            minimum_activity_duration_secs: 0,
            sample_during_break: false,
            excluded_windows: Vec::new(),
        }
    }
}

impl AggregatorConfig {
    pub fn is_excluded(&self, window_class: &str) -> bool {
        window_class == NO_WINDOW || self.excluded_windows.iter().any(|w| w == window_class)
    }
}
