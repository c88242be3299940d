use serde::{Serialize, Deserialize};
use directories::ProjectDirs;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Messages from the same author within this many seconds are grouped.
pub const DEFAULT_GROUPING_PERIOD_SECS: u64 = 300;

/// View settings for the message list.
///
/// Every field has a default so a partial `settings.json` still loads.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Grouping period in seconds.
    pub grouping_period_secs: u64,
    /// Master switch for visual grouping.
    pub allow_group: bool,
    /// Show real names instead of usernames when available.
    pub use_real_name: bool,
    /// Username whose messages are rendered as chatops output.
    pub chatops_username: Option<String>,
    pub allow_editing: bool,
    /// Editing is blocked this many minutes after sending. Zero disables the block.
    pub edit_block_minutes: u32,
    pub allow_deleting: bool,
    /// Deleting is blocked this many minutes after sending. Zero disables the block.
    pub delete_block_minutes: u32,
    pub show_edited_status: bool,
    pub embed_enabled: bool,
    /// Comma separated usernames whose links never get embeds.
    pub embed_disabled_for: String,
    pub hide_roles: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            grouping_period_secs: DEFAULT_GROUPING_PERIOD_SECS,
            allow_group: true,
            use_real_name: false,
            chatops_username: None,
            allow_editing: true,
            edit_block_minutes: 0,
            allow_deleting: true,
            delete_block_minutes: 0,
            show_edited_status: true,
            embed_enabled: true,
            embed_disabled_for: String::new(),
            hide_roles: false,
        }
    }
}

impl Settings {
    /// Periods beyond what chrono can represent saturate to `Duration::MAX`.
    pub fn grouping_period(&self) -> chrono::Duration {
        i64::try_from(self.grouping_period_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }
}

pub fn settings_path() -> Result<PathBuf, ConfigError> {
    let proj = ProjectDirs::from("org", "chatline", "chatline").ok_or(ConfigError::NoConfigDir)?;
    let dir = proj.config_dir();
    fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    Ok(dir.join("settings.json"))
}

/// Load settings from the platform config directory.
/// A missing file yields the defaults.
pub fn load_settings() -> Result<Settings, ConfigError> {
    load_settings_from(&settings_path()?)
}

pub fn load_settings_from(path: &Path) -> Result<Settings, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no settings file, using defaults");
        return Ok(Settings::default());
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&content)?)
}

pub fn save_settings(settings: &Settings) -> Result<(), ConfigError> {
    save_settings_to(settings, &settings_path()?)
}

pub fn save_settings_to(settings: &Settings, path: &Path) -> Result<(), ConfigError> {
    let data = serde_json::to_string_pretty(settings)?;
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut file = fs::File::create(path).map_err(io_err)?;
    file.write_all(data.as_bytes()).map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.grouping_period(), chrono::Duration::seconds(300));
        assert!(settings.allow_group);
        assert_eq!(settings.edit_block_minutes, 0);
    }

    #[test]
    fn test_huge_grouping_period_saturates() {
        for secs in [u64::MAX, 10_000_000_000_000_000, i64::MAX as u64] {
            let settings = Settings {
                grouping_period_secs: secs,
                ..Settings::default()
            };
            assert_eq!(settings.grouping_period(), chrono::Duration::MAX);
        }

        let largest = chrono::Duration::MAX.num_seconds() as u64;
        let settings = Settings {
            grouping_period_secs: largest,
            ..Settings::default()
        };
        assert_eq!(settings.grouping_period().num_seconds(), chrono::Duration::MAX.num_seconds());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"grouping_period_secs": 60, "use_real_name": true}"#).unwrap();
        assert_eq!(settings.grouping_period_secs, 60);
        assert!(settings.use_real_name);
        assert!(settings.allow_editing);
        assert!(settings.embed_enabled);
    }

    #[test]
    fn test_save_and_load_roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");

        let settings = Settings {
            grouping_period_secs: 120,
            chatops_username: Some("rocket.cat".into()),
            embed_disabled_for: "spam, bot".into(),
            ..Settings::default()
        };
        save_settings_to(&settings, &path).unwrap();
        assert_eq!(load_settings_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = load_settings_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(loaded, Settings::default());
    }

    #[test]
    fn test_invalid_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_settings_from(&path), Err(ConfigError::Json(_))));
    }
}
