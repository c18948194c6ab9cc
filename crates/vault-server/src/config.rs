//! Configuration loading and management

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use vault_core::AutoSaveConfig;

/// Main configuration for the vault server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Seed the demo vault into the empty store at startup
    #[serde(default = "default_true")]
    pub seed_demo_data: bool,

    /// Autosave settings handed to editors
    #[serde(default)]
    pub autosave: AutosaveSettings,

    /// Google Drive API settings
    #[serde(default)]
    pub drive: DriveConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutosaveSettings {
    /// Quiet period before an edit is saved (default: 1 second)
    #[serde(default = "default_autosave_delay")]
    pub delay_ms: u64,
}

impl Default for AutosaveSettings {
    fn default() -> Self {
        Self {
            delay_ms: default_autosave_delay(),
        }
    }
}

impl AutosaveSettings {
    pub fn to_config(&self) -> AutoSaveConfig {
        AutoSaveConfig {
            delay: Duration::from_millis(self.delay_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Drive v3 metadata endpoint
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Drive v3 upload endpoint
    #[serde(default = "default_upload_base")]
    pub upload_base: String,

    /// OAuth access token; `--drive-token` overrides it.
    /// Without one the server runs local-only.
    pub access_token: Option<String>,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            upload_base: default_upload_base(),
            access_token: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_autosave_delay() -> u64 {
    1000
}

fn default_api_base() -> String {
    "https://www.googleapis.com/drive/v3".to_string()
}

fn default_upload_base() -> String {
    "https://www.googleapis.com/upload/drive/v3".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed_demo_data: true,
            autosave: AutosaveSettings::default(),
            drive: DriveConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the config directory
    pub fn load(config_path: &str) -> Result<Self> {
        let config_file = Path::new(config_path).join("config.json");

        if config_file.exists() {
            let content = std::fs::read_to_string(&config_file)
                .with_context(|| format!("Failed to read config file: {:?}", config_file))?;
            let config: Config =
                serde_json::from_str(&content).with_context(|| "Failed to parse config.json")?;
            tracing::info!("Loaded configuration from {:?}", config_file);
            Ok(config)
        } else {
            tracing::info!("No config file found at {:?}, using defaults", config_file);
            let config = Config::default();

            std::fs::create_dir_all(config_path)
                .with_context(|| format!("Failed to create config directory: {}", config_path))?;

            // Write default config for reference
            let content = serde_json::to_string_pretty(&config)?;
            std::fs::write(&config_file, content)
                .with_context(|| format!("Failed to write default config: {:?}", config_file))?;
            tracing::info!("Created default config at {:?}", config_file);

            Ok(config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested");
        let path = path.to_str().unwrap();

        let config = Config::load(path).unwrap();
        assert_eq!(config, Config::default());
        assert!(Path::new(path).join("config.json").exists());

        // Second load reads the file just written
        assert_eq!(Config::load(path).unwrap(), config);
    }

    #[test]
    fn partial_file_takes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("config.json"),
            r#"{ "seed_demo_data": false, "autosave": { "delay_ms": 250 } }"#,
        )
        .unwrap();

        let config = Config::load(dir.path().to_str().unwrap()).unwrap();
        assert!(!config.seed_demo_data);
        assert_eq!(config.autosave.to_config().delay, Duration::from_millis(250));
        assert_eq!(config.drive, DriveConfig::default());
    }

    #[test]
    fn rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), "{ not json").unwrap();
        assert!(Config::load(dir.path().to_str().unwrap()).is_err());
    }
}
