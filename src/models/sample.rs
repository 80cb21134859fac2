use serde::{Deserialize, Serialize};

/// Sentinel used for both window class and title when nothing is observed.
pub const NO_WINDOW: &str = "none";

/// The uniform per-tick signal the aggregator consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySample {
    pub window_class: String,
    pub title: String,
}

impl ActivitySample {
    pub fn new(window_class: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            window_class: window_class.into(),
            title: title.into(),
        }
    }

    pub fn none() -> Self {
        Self::new(NO_WINDOW, NO_WINDOW)
    }

    pub fn is_none(&self) -> bool {
        self.window_class == NO_WINDOW && self.title == NO_WINDOW
    }
}

impl Default for ActivitySample {
    fn default() -> Self {
        Self::none()
    }
}

/// Raw payload pushed by the window observer, `{"title": .., "class": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowEvent {
    pub title: String,
    #[serde(rename = "class")]
    pub window_class: String,
}

impl WindowEvent {
    pub fn new(window_class: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            window_class: window_class.into(),
        }
    }
}
