//! Application configuration management

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::models::{DownloadRequest, MediaFormat, Resolution};
use super::options::DEFAULT_FILENAME_TEMPLATE;
use crate::utils::file_utils::default_download_dir;

/// Settings remembered between runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub output_path: PathBuf,
    pub selected_format: MediaFormat,
    pub selected_quality: Resolution,
    pub playlist: bool,
    pub custom_filename: bool,
    pub filename_template: String,
    pub embed_metadata: bool,
    pub ytdlp_path: PathBuf,
    pub log_level: String, // "error", "warn", "info", "debug", "trace"
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_path: default_download_dir(),
            selected_format: MediaFormat::Mp4,
            selected_quality: Resolution::Best,
            playlist: false,
            custom_filename: false,
            filename_template: DEFAULT_FILENAME_TEMPLATE.to_string(),
            embed_metadata: false,
            ytdlp_path: PathBuf::from("yt-dlp"),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file, creating default if not exists
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

            let config: AppConfig =
                serde_json::from_str(&content).with_context(|| "Failed to parse config file")?;

            tracing::info!("Loaded configuration from: {:?}", config_path);
            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(config_path)?;
            tracing::info!("Created default configuration at: {:?}", config_path);
            Ok(config)
        }
    }

    /// Load, validate, and fall back to defaults on any problem
    pub fn load_or_default(config_path: &Path) -> Self {
        match Self::load_from(config_path) {
            Ok(cfg) => match cfg.validate() {
                Ok(()) => cfg,
                Err(err) => {
                    tracing::warn!(
                        "Invalid configuration detected ({}), falling back to defaults",
                        err
                    );
                    Self::persist_default(config_path)
                }
            },
            Err(err) => {
                tracing::warn!(
                    "Failed to load configuration from disk: {}. Using defaults",
                    err
                );
                Self::persist_default(config_path)
            }
        }
    }

    fn persist_default(config_path: &Path) -> Self {
        let default_cfg = Self::default();
        if let Err(save_err) = default_cfg.save_to(config_path) {
            tracing::warn!("Failed to persist default configuration: {}", save_err);
        }
        default_cfg
    }

    /// Save configuration to file
    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content =
            serde_json::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Settings saved to: {:?}", config_path);
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn get_config_path() -> Result<PathBuf> {
        let project_dirs = ProjectDirs::from("com", "ytlinkdownloader", "youtube-link-downloader")
            .with_context(|| "Failed to get project directories")?;

        Ok(project_dirs.config_dir().join("config.json"))
    }

    /// Reset configuration to defaults
    pub fn reset_at(config_path: &Path) -> Result<Self> {
        let config = Self::default();
        config.save_to(config_path)?;
        tracing::info!("Reset configuration to defaults");
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.output_path.as_os_str().is_empty() {
            anyhow::bail!("Output path must not be empty");
        }

        if self.custom_filename && self.filename_template.trim().is_empty() {
            anyhow::bail!("Filename template must not be empty when custom filenames are enabled");
        }

        if self.custom_filename && !self.filename_template.contains("%(ext)s") {
            anyhow::bail!("Filename template must contain %(ext)s");
        }

        if self.ytdlp_path.as_os_str().is_empty() {
            anyhow::bail!("yt-dlp path must not be empty");
        }

        if !["error", "warn", "info", "debug", "trace"].contains(&self.log_level.as_str()) {
            anyhow::bail!(
                "Invalid log level: must be 'error', 'warn', 'info', 'debug', or 'trace'"
            );
        }

        Ok(())
    }

    /// Seed a request with the remembered form values
    pub fn request_for(&self, url: impl Into<String>) -> DownloadRequest {
        let mut request = DownloadRequest::new(url, self.selected_format, &self.output_path)
            .with_resolution(self.selected_quality);
        request.playlist = self.playlist;
        request.embed_metadata = self.embed_metadata;
        if self.custom_filename {
            request.filename_template = Some(self.filename_template.clone());
        }
        request
    }

    /// Remember the form values of a submitted request
    pub fn remember(&mut self, request: &DownloadRequest) {
        self.output_path = request.output_dir.clone();
        self.selected_format = request.format;
        self.selected_quality = request.resolution;
        self.playlist = request.playlist;
        self.embed_metadata = request.embed_metadata;
        match request.filename_template.as_deref() {
            Some(template) if !template.trim().is_empty() => {
                self.custom_filename = true;
                self.filename_template = template.to_string();
            }
            _ => self.custom_filename = false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_creates_default_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("nested").join("config.json");

        let config = AppConfig::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_and_reload() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.json");

        let mut config = AppConfig::default();
        config.selected_format = MediaFormat::Mp3;
        config.selected_quality = Resolution::P480;
        config.embed_metadata = true;
        config.save_to(&path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("\"480p\""));
        assert!(content.contains("\"mp3\""));

        let reloaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, r#"{"selected_format": "webm"}"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.selected_format, MediaFormat::Webm);
        assert_eq!(config.selected_quality, Resolution::Best);
    }

    #[test]
    fn test_corrupt_file_falls_back_to_defaults() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = AppConfig::load_or_default(&path);
        assert_eq!(config, AppConfig::default());
        // the default was written back
        assert!(AppConfig::load_from(&path).is_ok());
    }

    #[test]
    fn test_invalid_config_validation() {
        let mut config = AppConfig::default();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.custom_filename = true;
        config.filename_template = "%(title)s".to_string();
        assert!(config.validate().is_err());

        config = AppConfig::default();
        config.output_path = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_request_round_trip_through_settings() {
        let mut config = AppConfig::default();
        let mut request = DownloadRequest::new("https://youtu.be/x", MediaFormat::Mkv, "/videos")
            .with_resolution(Resolution::P720);
        request.filename_template = Some("%(id)s.%(ext)s".to_string());
        request.playlist = true;

        config.remember(&request);
        assert!(config.custom_filename);

        let seeded = config.request_for("https://youtu.be/y");
        assert_eq!(seeded.format, MediaFormat::Mkv);
        assert_eq!(seeded.resolution, Resolution::P720);
        assert_eq!(seeded.output_dir, PathBuf::from("/videos"));
        assert_eq!(seeded.filename_template.as_deref(), Some("%(id)s.%(ext)s"));
        assert!(seeded.playlist);
    }
}
