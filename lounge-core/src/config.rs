use anyhow::{Context, Result, anyhow, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";
pub const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 60 * 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Configuration stored on disk, read once at startup.
///
/// Example TOML:
/// ```toml
/// api_key = "..."
/// city = "London"
/// refresh_interval_secs = 3600
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// OpenWeather API key.
    pub api_key: String,

    /// Location query used when none is given on the command line.
    #[serde(default)]
    pub city: Option<String>,

    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

impl Config {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            city: None,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            base_url: default_base_url(),
        }
    }

    /// Load config from the platform config directory.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    /// Load config from an explicit path. A missing file or an empty API key is an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            bail!(
                "Config file not found: {}.\n\
                 Hint: run `lounge configure` and enter your OpenWeather API key.",
                path.display()
            );
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let cfg: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        cfg.validate()?;
        Ok(cfg)
    }

    /// Read a config without validating it, for pre-filling interactive prompts.
    pub fn read_existing(path: &Path) -> Option<Self> {
        let contents = fs::read_to_string(path).ok()?;
        toml::from_str(&contents).ok()
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            bail!(
                "No API key configured.\n\
                 Hint: run `lounge configure` and enter your OpenWeather API key."
            );
        }
        if self.refresh_interval_secs == 0 {
            bail!("refresh_interval_secs must be greater than zero");
        }
        Ok(())
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-lounge", "lounge")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_fatal_with_hint() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = Config::load_from(&dir.path().join("config.toml")).unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("Config file not found"));
        assert!(msg.contains("lounge configure"));
    }

    #[test]
    fn blank_api_key_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_key = \"   \"\n").expect("write config");

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("No API key configured"));
    }

    #[test]
    fn missing_api_key_field_fails_to_parse() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "city = \"Oslo\"\n").expect("write config");

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn defaults_fill_optional_fields() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_key = \"KEY\"\n").expect("write config");

        let cfg = Config::load_from(&path).expect("config should load");
        assert_eq!(cfg.api_key, "KEY");
        assert_eq!(cfg.city, None);
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(3600));
        assert_eq!(cfg.request_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn save_then_load_creates_parent_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::new("KEY".into());
        cfg.city = Some("Reykjavik".into());
        cfg.refresh_interval_secs = 900;
        cfg.save_to(&path).expect("save should succeed");

        let loaded = Config::load_from(&path).expect("config should load");
        assert_eq!(loaded.city.as_deref(), Some("Reykjavik"));
        assert_eq!(loaded.refresh_interval_secs, 900);
    }

    #[test]
    fn zero_refresh_interval_is_rejected() {
        let mut cfg = Config::new("KEY".into());
        cfg.refresh_interval_secs = 0;
        assert!(cfg.validate().is_err());
    }
}
