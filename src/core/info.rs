//! Video preview information parsed from `yt-dlp --dump-json`

use crate::core::models::{AppError, AppResult, VideoInfo};

pub fn parse_video_info(json: &serde_json::Value) -> AppResult<VideoInfo> {
    let id = json["id"]
        .as_str()
        .ok_or_else(|| AppError::Info("Missing video ID in yt-dlp output".to_string()))?
        .to_string();

    let title = json["title"].as_str().unwrap_or("N/A").to_string();
    let uploader = json["uploader"]
        .as_str()
        .or_else(|| json["channel"].as_str())
        .map(str::to_string);

    // duration is a float for some extractors
    let duration = json["duration"]
        .as_u64()
        .or_else(|| json["duration"].as_f64().map(|d| d.max(0.0).round() as u64));

    let webpage_url = json["webpage_url"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", id));

    let mut heights: Vec<u32> = json["formats"]
        .as_array()
        .map(|formats| {
            formats
                .iter()
                .filter(|f| f["vcodec"].as_str() != Some("none"))
                .filter_map(|f| f["height"].as_u64())
                .map(|h| h as u32)
                .collect()
        })
        .unwrap_or_default();
    heights.sort_unstable_by(|a, b| b.cmp(a));
    heights.dedup();

    Ok(VideoInfo {
        id,
        title,
        uploader,
        duration,
        view_count: json["view_count"].as_u64(),
        thumbnail: json["thumbnail"].as_str().map(str::to_string),
        webpage_url,
        heights,
    })
}

/// `MM:SS` below an hour, `H:MM:SS` above
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// Thousands-separated view count
pub fn format_views(views: u64) -> String {
    let digits = views.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    out
}

impl VideoInfo {
    pub fn duration_label(&self) -> String {
        self.duration
            .map(format_duration)
            .unwrap_or_else(|| "N/A".to_string())
    }

    pub fn views_label(&self) -> String {
        self.view_count
            .map(format_views)
            .unwrap_or_else(|| "N/A".to_string())
    }
}
