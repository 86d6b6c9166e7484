//! URL and input validation utilities

use url::Url;

use crate::core::models::{AppError, AppResult};

const YOUTUBE_HOSTS: [&str; 5] = [
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "youtu.be",
    "www.youtu.be",
];

/// Parse a URL, rejecting anything that is not http(s)
pub fn validate_url(url: &str) -> AppResult<Url> {
    let parsed = Url::parse(url.trim())
        .map_err(|e| AppError::InvalidRequest(format!("Invalid URL format: {}", e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(AppError::InvalidRequest(format!(
            "Unsupported URL scheme: {}",
            scheme
        ))),
    }
}

/// Check whether the URL points at YouTube (including subdomains such as `music.youtube.com`)
pub fn is_youtube_url(url: &str) -> bool {
    let Ok(parsed) = validate_url(url) else {
        return false;
    };

    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();

    YOUTUBE_HOSTS.contains(&host.as_str())
        || host.ends_with(".youtube.com")
        || host.ends_with(".youtu.be")
}

/// Extract the video id from watch, short-link, embed and shorts URLs
pub fn extract_youtube_id(url: &str) -> Option<String> {
    if !is_youtube_url(url) {
        return None;
    }
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();

    if host.ends_with("youtu.be") {
        return parsed
            .path_segments()?
            .next()
            .filter(|id| !id.is_empty())
            .map(str::to_string);
    }

    if let Some((_, id)) = parsed.query_pairs().find(|(key, _)| key == "v") {
        if !id.is_empty() {
            return Some(id.into_owned());
        }
    }

    let mut segments = parsed.path_segments()?;
    match segments.next() {
        Some("embed") | Some("shorts") | Some("live") => segments
            .next()
            .filter(|id| !id.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

/// Check whether the URL carries a playlist id
pub fn has_playlist(url: &str) -> bool {
    Url::parse(url.trim())
        .map(|parsed| parsed.query_pairs().any(|(key, _)| key == "list"))
        .unwrap_or(false)
}
