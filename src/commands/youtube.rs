//! YouTube command handlers
//!
//! Preview information for the link typed into the form.

use serde::Serialize;
use tauri::State;
use tracing::{error, info};

use crate::core::models::VideoInfo;
use crate::AppState;

/// Preview shown under the URL field
#[derive(Debug, Clone, Serialize)]
pub struct YoutubeInfoResponse {
    #[serde(flatten)]
    pub info: VideoInfo,
    pub duration_label: String,
    pub views_label: String,
}

impl From<VideoInfo> for YoutubeInfoResponse {
    fn from(info: VideoInfo) -> Self {
        Self {
            duration_label: info.duration_label(),
            views_label: info.views_label(),
            info,
        }
    }
}

/// Get YouTube video information
#[tauri::command]
pub async fn get_youtube_info(
    state: State<'_, AppState>,
    url: String,
) -> Result<YoutubeInfoResponse, String> {
    info!("📺 Getting YouTube video info for: {}", url);

    match state.session.fetch_info(&url).await {
        Ok(info) => {
            info!(
                "✅ Successfully retrieved YouTube info for video: {}",
                info.title
            );
            Ok(info.into())
        }
        Err(e) => {
            error!("❌ Failed to get YouTube info: {}", e);
            Err(e.user_message())
        }
    }
}
