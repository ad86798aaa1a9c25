//! User settings and live configuration.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::EventHub;

/// Errors from loading settings.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Settings file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Settings file is not valid JSON for [`Settings`].
    #[error("invalid settings in {path}: {source}")]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },
}

/// Persisted user settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Show change icons in the gutter instead of colouring line numbers.
    pub show_icons_in_editor_gutter: bool,
    /// Cycle to the first/last hunk when navigation runs off either end.
    pub wrap_around_on_move_to_diff: bool,
    /// Whether the host shows line numbers at all. Icons need them.
    pub show_line_numbers: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_icons_in_editor_gutter: false,
            wrap_around_on_move_to_diff: true,
            show_line_numbers: true,
        }
    }
}

impl Settings {
    /// Default location of the settings file, if a config directory exists.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "gitgutter")
            .map(|d| d.config_dir().join("settings.json"))
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load settings from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Whether change icons should be drawn in the gutter.
    pub fn gutter_icons_enabled(&self) -> bool {
        self.show_line_numbers && self.show_icons_in_editor_gutter
    }
}

/// Which setting changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigEvent {
    /// `show_icons_in_editor_gutter` changed.
    ShowIconsChanged,
    /// `wrap_around_on_move_to_diff` changed.
    WrapAroundChanged,
    /// `show_line_numbers` changed.
    ShowLineNumbersChanged,
}

/// Live, shareable configuration with change notifications.
#[derive(Debug, Default)]
pub struct Config {
    settings: RwLock<Settings>,
    events: EventHub<ConfigEvent>,
}

impl Config {
    /// Wrap a settings snapshot.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
            events: EventHub::new(),
        }
    }

    /// Current settings snapshot.
    pub fn get(&self) -> Settings {
        *self.settings.read()
    }

    /// Replace the settings, emitting one event per changed field.
    pub fn set(&self, next: Settings) {
        let prev = std::mem::replace(&mut *self.settings.write(), next);

        if prev.show_icons_in_editor_gutter != next.show_icons_in_editor_gutter {
            self.events.emit(&ConfigEvent::ShowIconsChanged);
        }
        if prev.wrap_around_on_move_to_diff != next.wrap_around_on_move_to_diff {
            self.events.emit(&ConfigEvent::WrapAroundChanged);
        }
        if prev.show_line_numbers != next.show_line_numbers {
            self.events.emit(&ConfigEvent::ShowLineNumbersChanged);
        }
    }

    /// Change notifications.
    pub fn events(&self) -> &EventHub<ConfigEvent> {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(settings.wrap_around_on_move_to_diff);
        assert!(!settings.gutter_icons_enabled());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{ "showIconsInEditorGutter": true }"#).unwrap();
        let settings = Settings::load_from(&path).unwrap();
        assert!(settings.show_icons_in_editor_gutter);
        assert!(settings.show_line_numbers);
        assert!(settings.gutter_icons_enabled());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ nope").unwrap();
        assert!(matches!(
            Settings::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn set_emits_only_changed_fields() {
        let config = Config::new(Settings::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        let _sub = config.events().subscribe(move |e| s.lock().unwrap().push(*e));

        config.set(Settings {
            wrap_around_on_move_to_diff: false,
            ..Settings::default()
        });
        config.set(config.get());

        assert_eq!(*seen.lock().unwrap(), vec![ConfigEvent::WrapAroundChanged]);
        assert!(!config.get().wrap_around_on_move_to_diff);
    }
}
