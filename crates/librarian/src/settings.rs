//! Configuration and settings management

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::browser::Mode;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub library: LibrarySettings,
    #[serde(default)]
    pub ui: UiSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibrarySettings {
    /// Root assumed before the backend reports the real one.
    #[serde(default = "default_legacy_auto_root")]
    pub legacy_auto_root: String,
    /// Root used when the backend cannot report one.
    #[serde(default = "default_fallback_auto_root")]
    pub fallback_auto_root: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSettings {
    #[serde(default = "default_start_tab")]
    pub start_tab: Mode,
    #[serde(default = "default_upload_poll_ms")]
    pub upload_poll_ms: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for LibrarySettings {
    fn default() -> Self {
        Self {
            legacy_auto_root: default_legacy_auto_root(),
            fallback_auto_root: default_fallback_auto_root(),
        }
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            start_tab: default_start_tab(),
            upload_poll_ms: default_upload_poll_ms(),
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_legacy_auto_root() -> String {
    "/mount/library-auto".to_string()
}

fn default_fallback_auto_root() -> String {
    "/host/mount/library-auto".to_string()
}

fn default_start_tab() -> Mode {
    Mode::Auto
}

fn default_upload_poll_ms() -> u64 {
    2500
}

impl ServerSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl UiSettings {
    pub fn upload_poll_interval(&self) -> Duration {
        Duration::from_millis(self.upload_poll_ms.max(100))
    }
}

impl Settings {
    /// Load settings from a file, or return defaults if file doesn't exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        let settings: Settings = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))?;

        Ok(settings)
    }

    /// Save settings to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize settings")?;

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;

        Ok(())
    }

    /// Platform config directory for librarian, if one can be determined
    pub fn config_dir() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "librarian").map(|d| d.config_dir().to_path_buf())
    }

    /// Platform data directory (logs live here)
    pub fn data_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "librarian")
            .map(|d| d.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Get the default settings file path
    pub fn default_path() -> PathBuf {
        Self::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("settings.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.server.base_url, "http://127.0.0.1:8080");
        assert_eq!(settings.library.legacy_auto_root, "/mount/library-auto");
        assert_eq!(settings.library.fallback_auto_root, "/host/mount/library-auto");
        assert_eq!(settings.ui.start_tab, Mode::Auto);
        assert_eq!(settings.ui.upload_poll_interval(), Duration::from_millis(2500));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().join("settings.toml");

        let mut settings = Settings::default();
        settings.server.base_url = "http://nas.local:9000".to_string();
        settings.ui.start_tab = Mode::Manual;

        settings.save(&settings_path).unwrap();

        let loaded = Settings::load(&settings_path).unwrap();
        assert_eq!(loaded.server.base_url, "http://nas.local:9000");
        assert_eq!(loaded.ui.start_tab, Mode::Manual);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().join("nonexistent.toml");

        let settings = Settings::load(&settings_path).unwrap();
        assert_eq!(settings.ui.upload_poll_ms, 2500);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().join("settings.toml");
        std::fs::write(&settings_path, "[ui]\nstart_tab = \"manual\"\n").unwrap();

        let settings = Settings::load(&settings_path).unwrap();
        assert_eq!(settings.ui.start_tab, Mode::Manual);
        assert_eq!(settings.ui.upload_poll_ms, 2500);
        assert_eq!(settings.server.timeout_secs, 10);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let settings_path = temp_dir.path().join("settings.toml");
        std::fs::write(&settings_path, "[ui]\nstart_tab = \"sideways\"\n").unwrap();

        let err = Settings::load(&settings_path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse settings"));
    }

    #[test]
    fn test_settings_creates_parent_directory() {
        let temp_dir = TempDir::new().unwrap();
        let nested_path = temp_dir
            .path()
            .join("subdir")
            .join("nested")
            .join("settings.toml");

        assert!(!nested_path.parent().unwrap().exists());

        let settings = Settings::default();
        settings.save(&nested_path).unwrap();

        assert!(nested_path.exists());
        let content = std::fs::read_to_string(&nested_path).unwrap();
        assert!(content.contains("base_url"));
        assert!(content.contains("start_tab = \"auto\""));
    }
}
