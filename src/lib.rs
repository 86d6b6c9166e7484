//! YouTube Link Downloader - Core Library
//!
//! Wraps the `yt-dlp` tool behind a small download invoker: a request from the
//! form becomes one tool invocation, the produced file optionally gets its
//! title tag rewritten, and the outcome is reported back to the interface.

#[cfg(feature = "gui")]
pub mod app;
#[cfg(feature = "gui")]
pub mod commands;
pub mod core;
pub mod utils;

// Re-export commonly used types
pub use core::{
    config::AppConfig,
    models::{
        AppError, AppResult, DownloadOutcome, DownloadRequest, DownloadState, MediaFormat,
        Resolution, VideoInfo,
    },
    session::{DownloadSession, EventSink, SessionEvent},
    tagging::{LoftyTagWriter, TagWriter},
    youtube_downloader::{MediaBackend, YoutubeDownloader, YtDlpBackend},
};

use std::path::PathBuf;
use std::sync::Arc;

/// Application state shared between the interface handlers
#[derive(Clone)]
pub struct AppState {
    pub session: DownloadSession,
    /// The yt-dlp runner behind `session`, kept to follow `ytdlp_path` changes
    pub backend: Arc<YtDlpBackend>,
    pub config: Arc<tokio::sync::RwLock<AppConfig>>,
    pub config_path: PathBuf,
}

impl AppState {
    pub fn new() -> anyhow::Result<Self> {
        let config_path = AppConfig::get_config_path()?;
        Ok(Self::with_config_path(config_path))
    }

    /// Build the state from the settings file at `config_path`
    pub fn with_config_path(config_path: PathBuf) -> Self {
        let config = AppConfig::load_or_default(&config_path);
        let backend = Arc::new(YtDlpBackend::new(config.ytdlp_path.clone()));
        let downloader =
            YoutubeDownloader::new(backend.clone(), Arc::new(LoftyTagWriter::new()));

        Self {
            session: DownloadSession::new(downloader),
            backend,
            config: Arc::new(tokio::sync::RwLock::new(config)),
            config_path,
        }
    }

    /// Validate, store and persist new settings
    pub async fn update_config(&self, new_config: AppConfig) -> anyhow::Result<()> {
        new_config.validate()?;
        new_config.save_to(&self.config_path)?;
        self.backend.set_binary(new_config.ytdlp_path.clone()).await;
        *self.config.write().await = new_config;
        Ok(())
    }

    pub async fn reset_config(&self) -> anyhow::Result<AppConfig> {
        let config = AppConfig::reset_at(&self.config_path)?;
        self.backend.set_binary(config.ytdlp_path.clone()).await;
        *self.config.write().await = config.clone();
        Ok(config)
    }
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Initialize logging with default settings
pub fn init() -> anyhow::Result<()> {
    utils::logging::init_tracing(None);
    tracing::info!("📚 {} v{} initialized", NAME, VERSION);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        assert!(init().is_ok());
    }

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!NAME.is_empty());
    }

    #[tokio::test]
    async fn test_app_state_persists_updates() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("config.json");
        let state = AppState::with_config_path(path.clone());
        assert!(path.exists());

        let mut config = state.config.read().await.clone();
        config.selected_format = MediaFormat::Mp3;
        state.update_config(config).await.unwrap();
        assert_eq!(
            AppConfig::load_from(&path).unwrap().selected_format,
            MediaFormat::Mp3
        );

        let mut bad = AppConfig::default();
        bad.log_level = "shout".to_string();
        assert!(state.update_config(bad).await.is_err());
        assert_eq!(state.config.read().await.selected_format, MediaFormat::Mp3);

        let reset = state.reset_config().await.unwrap();
        assert_eq!(reset, AppConfig::default());
        assert_eq!(state.session.state().await, DownloadState::Idle);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_changed_ytdlp_path_is_used_right_away() {
        use crate::core::youtube_downloader::tests::write_fake_tool;

        let temp = tempfile::tempdir().unwrap();
        let state = AppState::with_config_path(temp.path().join("config.json"));
        let out_dir = temp.path().join("out");
        let produced = out_dir.join("fake.mp4");
        let tool = write_fake_tool(
            temp.path(),
            &format!(
                "if [ \"$1\" = --version ]; then echo 2099.01.01; exit 0; fi\n\
                 : > '{path}'\n\
                 echo 'ytdl-output:{path}'",
                path = produced.display()
            ),
        );

        let mut config = state.config.read().await.clone();
        config.ytdlp_path = tool.clone();
        state.update_config(config).await.unwrap();

        assert_eq!(state.backend.binary().await, tool);
        assert_eq!(state.backend.version().await.as_deref(), Some("2099.01.01"));

        let request = DownloadRequest::new("https://youtu.be/dQw4w9WgXcQ", MediaFormat::Mp4, &out_dir);
        let sink: Arc<dyn EventSink> = Arc::new(|_event: SessionEvent| {});
        let handle = state.session.start(request, sink).await.unwrap();
        let outcome = handle.wait().await.unwrap();
        assert_eq!(outcome.output_path, produced);

        state.reset_config().await.unwrap();
        assert_eq!(state.backend.binary().await, AppConfig::default().ytdlp_path);
    }
}
