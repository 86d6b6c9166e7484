//! System command handlers
//!
//! Tool availability checks and the output folder helpers behind the
//! Desktop, Downloads and Browse buttons.

use serde::Serialize;
use std::path::PathBuf;
use tauri::State;
use tracing::{error, info, warn};

use crate::core::models::{AppError, AppResult};
use crate::core::youtube_downloader::MediaBackend;
use crate::utils::file_utils::{default_desktop_dir, default_download_dir};
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct DefaultDirectories {
    pub downloads: PathBuf,
    pub desktop: PathBuf,
}

/// Check if FFmpeg is available
#[tauri::command]
pub async fn check_ffmpeg() -> Result<bool, String> {
    info!("🎬 Checking FFmpeg availability");

    match check_tool_availability("ffmpeg", &["-version"]).await {
        Ok(available) => {
            if available {
                info!("✅ FFmpeg is available");
            } else {
                warn!("⚠️ FFmpeg is not available");
            }
            Ok(available)
        }
        Err(e) => {
            error!("❌ Failed to check FFmpeg: {}", e);
            Err(e.to_string())
        }
    }
}

/// Check if the configured yt-dlp is available
#[tauri::command]
pub async fn check_yt_dlp(state: State<'_, AppState>) -> Result<bool, String> {
    info!(
        "📺 Checking yt-dlp availability at {:?}",
        state.backend.binary().await
    );

    match state.backend.version().await {
        Some(version) => {
            info!("✅ yt-dlp {} is available", version);
            Ok(true)
        }
        None => {
            warn!("⚠️ yt-dlp is not available");
            Ok(false)
        }
    }
}

#[tauri::command]
pub async fn get_default_directories() -> Result<DefaultDirectories, String> {
    Ok(DefaultDirectories {
        downloads: default_download_dir(),
        desktop: default_desktop_dir(),
    })
}

/// Let the user pick the output folder; `None` when the dialog is dismissed
#[tauri::command]
pub async fn select_output_directory() -> Result<Option<PathBuf>, String> {
    info!("📁 Opening folder picker");

    // the blocking dialog must stay off the async workers
    tokio::task::spawn_blocking(|| {
        tauri::api::dialog::blocking::FileDialogBuilder::new()
            .set_title("Select Output Folder")
            .pick_folder()
    })
    .await
    .map_err(|e| {
        error!("❌ Folder picker failed: {}", e);
        e.to_string()
    })
}

async fn check_tool_availability(tool_name: &str, args: &[&str]) -> AppResult<bool> {
    let output = tokio::process::Command::new(tool_name)
        .args(args)
        .output()
        .await;

    match output {
        Ok(output) => Ok(output.status.success()),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(false),
            _ => Err(AppError::Io(e)),
        },
    }
}
