use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::error::{TimelineError, TimelineResult};
use crate::timeline::{history::DEFAULT_HISTORY_LIMIT, AggregatorConfig};
use crate::timer::TimerSettings;

pub const SELF_WINDOW_CLASS: &str = "focusline";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub timer: TimerSettings,
    pub minimum_activity_duration_secs: u64,
    pub sample_during_break: bool,
    pub history_limit: usize,
    pub excluded_windows: Vec<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            timer: TimerSettings::default(),
            minimum_activity_duration_secs: 0,
            sample_during_break: false,
            history_limit: DEFAULT_HISTORY_LIMIT,
            excluded_windows: vec![SELF_WINDOW_CLASS.to_string()],
        }
    }
}

impl UserSettings {
    pub fn validate(&self) -> TimelineResult<()> {
        if self.timer.session_length_secs == 0 {
            return Err(TimelineError::InvalidSettings(
                "session length must be greater than zero".into(),
            ));
        }
        if self.timer.number_of_sessions == 0 {
            return Err(TimelineError::InvalidSettings(
                "number of sessions must be greater than zero".into(),
            ));
        }
        if self.history_limit == 0 {
            return Err(TimelineError::InvalidSettings(
                "history limit must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn aggregator_config(&self) -> AggregatorConfig {
        AggregatorConfig {
            minimum_activity_duration_secs: self.minimum_activity_duration_secs,
            sample_during_break: self.sample_during_break,
            excluded_windows: self.excluded_windows.clone(),
        }
    }
}

/// Where user settings live. Injected into the controller so the engine
/// never touches the filesystem itself.
pub trait SettingsRepository: Send + Sync {
    fn load(&self) -> UserSettings;
    fn save(&self, settings: &UserSettings) -> Result<()>;
}

/// JSON file backed settings, cached in memory.
pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<UserSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            Self::read_or_default(&path)
        } else {
            UserSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    fn read_or_default(path: &Path) -> UserSettings {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(err) => {
                warn!(
                    "Could not read settings from {}: {err}; using defaults",
                    path.display()
                );
                return UserSettings::default();
            }
        };

        match serde_json::from_str::<UserSettings>(&contents) {
            Ok(settings) if settings.validate().is_ok() => settings,
            Ok(_) | Err(_) => {
                warn!(
                    "Ignoring invalid settings in {}; using defaults",
                    path.display()
                );
                UserSettings::default()
            }
        }
    }

    fn persist(&self, data: &UserSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, UserSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, UserSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SettingsRepository for SettingsStore {
    fn load(&self) -> UserSettings {
        self.read_guard().clone()
    }

    fn save(&self, settings: &UserSettings) -> Result<()> {
        settings.validate()?;
        let mut guard = self.write_guard();
        self.persist(settings)?;
        *guard = settings.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        assert_eq!(store.load(), UserSettings::default());
    }

    #[test]
    fn save_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();

        let mut settings = UserSettings::default();
        settings.timer.session_length_secs = 50 * 60;
        settings.minimum_activity_duration_secs = 5;
        store.save(&settings).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.load(), settings);
    }

    #[test]
    fn rejects_invalid_settings() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();

        let mut settings = UserSettings::default();
        settings.timer.number_of_sessions = 0;
        assert!(store.save(&settings).is_err());
        assert_eq!(store.load(), UserSettings::default());
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.load(), UserSettings::default());
    }

    #[test]
    fn unreadable_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, [0xff, 0xfe, 0x00]).unwrap();

        let store = SettingsStore::new(path.clone()).unwrap();
        assert_eq!(store.load(), UserSettings::default());

        let mut settings = UserSettings::default();
        settings.history_limit = 3;
        store.save(&settings).unwrap();
        assert_eq!(SettingsStore::new(path).unwrap().load(), settings);
    }

    #[test]
    fn partial_file_fills_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"minimumActivityDurationSecs": 7}"#).unwrap();

        let store = SettingsStore::new(path).unwrap();
        let settings = store.load();
        assert_eq!(settings.minimum_activity_duration_secs, 7);
        assert_eq!(settings.timer, TimerSettings::default());
    }
}
