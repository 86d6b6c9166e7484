//! Download command handlers
//!
//! Starts, cancels and inspects the single download session. Progress is
//! pushed to the window as `download_progress`, `download_log` and
//! `download_finished` events.

use std::sync::Arc;
use tauri::{AppHandle, Manager, State};
use tracing::{error, info, warn};

use crate::core::models::{AppResult, DownloadRequest, DownloadState};
use crate::core::session::{EventSink, SessionEvent};
use crate::AppState;

/// Forwards session events to every open window
struct WindowEventSink {
    app: AppHandle,
}

impl EventSink for WindowEventSink {
    fn emit(&self, event: SessionEvent) {
        let name = event_name(&event);
        if let Err(e) = self.app.emit_all(name, &event) {
            error!("Failed to emit {} event: {}", name, e);
        }
    }
}

pub(crate) fn event_name(event: &SessionEvent) -> &'static str {
    match event {
        SessionEvent::Progress { .. } => "download_progress",
        SessionEvent::Log { .. } => "download_log",
        SessionEvent::Finished { .. } => "download_finished",
    }
}

/// Start downloading the submitted form; returns the download id
#[tauri::command]
pub async fn start_download(
    app: AppHandle,
    state: State<'_, AppState>,
    request: DownloadRequest,
) -> Result<String, String> {
    info!("⬇️ Download requested: {} as {}", request.url, request.format);

    match start_download_impl(app, &state, request).await {
        Ok(download_id) => {
            info!("✅ Download {} started", download_id);
            Ok(download_id)
        }
        Err(e) => {
            error!("❌ Failed to start download: {}", e);
            Err(e.user_message())
        }
    }
}

async fn start_download_impl(
    app: AppHandle,
    state: &AppState,
    request: DownloadRequest,
) -> AppResult<String> {
    let sink: Arc<dyn EventSink> = Arc::new(WindowEventSink { app });
    let handle = state.session.start(request.clone(), sink).await?;

    // the form values are remembered once the download is accepted
    let mut config = state.config.write().await;
    config.remember(&request);
    if let Err(e) = config.save_to(&state.config_path) {
        warn!("⚠️ Failed to save settings: {}", e);
    }

    Ok(handle.download_id)
}

/// Cancel the running download
#[tauri::command]
pub async fn cancel_download(state: State<'_, AppState>) -> Result<bool, String> {
    info!("🛑 Cancel requested");
    let cancelled = state.session.cancel().await;
    if !cancelled {
        warn!("⚠️ No download is running");
    }
    Ok(cancelled)
}

#[tauri::command]
pub async fn get_download_state(state: State<'_, AppState>) -> Result<DownloadState, String> {
    Ok(state.session.state().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::LogLevel;

    #[test]
    fn test_event_names() {
        let progress = SessionEvent::Progress {
            download_id: "a".to_string(),
            percent: 10.0,
        };
        let log = SessionEvent::Log {
            download_id: "a".to_string(),
            level: LogLevel::Info,
            message: "hi".to_string(),
        };
        let finished = SessionEvent::Finished {
            download_id: "a".to_string(),
            state: DownloadState::Cancelled,
            outcome: None,
        };

        assert_eq!(event_name(&progress), "download_progress");
        assert_eq!(event_name(&log), "download_log");
        assert_eq!(event_name(&finished), "download_finished");
    }
}
