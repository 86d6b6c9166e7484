//! Tauri application builder

use std::path::PathBuf;
use tauri::Manager;
use tracing::{error, info};

use crate::commands::*;
use crate::utils::logging::init_tracing;
use crate::AppState;

/// Build and run the desktop window; returns when the last window closes
pub fn run() -> anyhow::Result<()> {
    let state = AppState::new().unwrap_or_else(|e| {
        eprintln!("Failed to locate the settings directory: {}", e);
        AppState::with_config_path(PathBuf::from("youtube-link-downloader.json"))
    });

    let log_level = state.config.blocking_read().log_level.clone();
    init_tracing(Some(&log_level));
    info!("🚀 Starting {} v{}", crate::NAME, crate::VERSION);

    tauri::Builder::default()
        .manage(state)
        .invoke_handler(tauri::generate_handler![
            // 下载相关命令
            start_download,
            cancel_download,
            get_download_state,
            // YouTube 相关命令
            get_youtube_info,
            // 配置相关命令
            get_config,
            update_config,
            reset_config,
            // 系统相关命令
            check_yt_dlp,
            check_ffmpeg,
            get_default_directories,
            select_output_directory,
        ])
        .setup(|app| {
            info!("🔧 Setting up application");

            if let Err(e) = app.emit_all("app_ready", true) {
                error!("Failed to emit app_ready event: {}", e);
            } else {
                info!("✅ App ready event emitted");
            }
            Ok(())
        })
        .on_window_event(|event| {
            if let tauri::WindowEvent::CloseRequested { .. } = event.event() {
                info!("🔚 Application closing");
            }
        })
        .run(tauri::generate_context!())?;

    Ok(())
}
