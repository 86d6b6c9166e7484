//! Core data models for the downloader application

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Output container chosen in the format selector

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaFormat {
    #[default]
    Mp4,

    Mkv,

    Webm,

    Mp3,
}

/// Whether a format keeps the video stream

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaKind {
    Audio,

    Video,
}

impl MediaFormat {
    pub fn kind(self) -> MediaKind {
        match self {
            Self::Mp3 => MediaKind::Audio,
            Self::Mp4 | Self::Mkv | Self::Webm => MediaKind::Video,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mkv => "mkv",
            Self::Webm => "webm",
            Self::Mp3 => "mp3",
        }
    }
}

impl fmt::Display for MediaFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for MediaFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mp4" => Ok(Self::Mp4),
            "mkv" => Ok(Self::Mkv),
            "webm" => Ok(Self::Webm),
            "mp3" => Ok(Self::Mp3),
            other => Err(AppError::InvalidRequest(format!(
                "Unsupported format: {}",
                other
            ))),
        }
    }
}

/// Resolution preference for video downloads

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(try_from = "String", into = "String")]
pub enum Resolution {
    #[default]
    Best,

    P1080,

    P720,

    P480,

    P360,

    P240,

    P144,
}

impl Resolution {
    pub const ALL: [Resolution; 7] = [
        Self::Best,
        Self::P1080,
        Self::P720,
        Self::P480,
        Self::P360,
        Self::P240,
        Self::P144,
    ];

    /// Maximum frame height, `None` for best available
    pub fn max_height(self) -> Option<u32> {
        match self {
            Self::Best => None,
            Self::P1080 => Some(1080),
            Self::P720 => Some(720),
            Self::P480 => Some(480),
            Self::P360 => Some(360),
            Self::P240 => Some(240),
            Self::P144 => Some(144),
        }
    }

    pub fn label(self) -> String {
        match self.max_height() {
            Some(h) => format!("{}p", h),
            None => "Best".to_string(),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for Resolution {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim();
        if value.eq_ignore_ascii_case("best") {
            return Ok(Self::Best);
        }

        let height = value
            .strip_suffix('p')
            .or_else(|| value.strip_suffix('P'))
            .unwrap_or(value)
            .parse::<u32>()
            .map_err(|_| AppError::InvalidRequest(format!("Invalid resolution: {}", value)))?;

        Self::ALL
            .into_iter()
            .find(|r| r.max_height() == Some(height))
            .ok_or_else(|| AppError::InvalidRequest(format!("Unsupported resolution: {}p", height)))
    }
}

impl TryFrom<String> for Resolution {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.label()
    }
}

/// One download submitted from the form.
///
/// Built from the form state at submit time and consumed by a single
/// invocation; nothing about it is persisted.

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadRequest {
    pub url: String,

    pub format: MediaFormat,

    #[serde(default)]
    pub resolution: Resolution,

    /// Overrides both the output filename and the title tag
    pub title: Option<String>,

    pub output_dir: PathBuf,

    #[serde(default)]
    pub playlist: bool,

    /// yt-dlp output template, used only when no title is given
    #[serde(default)]
    pub filename_template: Option<String>,

    #[serde(default)]
    pub embed_metadata: bool,

    #[serde(default)]
    pub embed_thumbnail: bool,
}

impl DownloadRequest {
    pub fn new(url: impl Into<String>, format: MediaFormat, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            format,
            resolution: Resolution::Best,
            title: None,
            output_dir: output_dir.into(),
            playlist: false,
            filename_template: None,
            embed_metadata: false,
            embed_thumbnail: false,
        }
    }

    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Title override with surrounding whitespace removed, if any is left
    pub fn custom_title(&self) -> Option<&str> {
        self.title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.url.trim().is_empty() {
            return Err(AppError::InvalidRequest(
                "Please enter a YouTube URL".to_string(),
            ));
        }

        if self.output_dir.as_os_str().is_empty() {
            return Err(AppError::InvalidRequest(
                "Please select an output path".to_string(),
            ));
        }

        Ok(())
    }
}

/// Result of a finished download

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DownloadOutcome {
    /// Last file produced; the only one unless a playlist was downloaded
    pub output_path: PathBuf,

    /// Every file produced, in download order
    pub files: Vec<PathBuf>,

    pub format: MediaFormat,

    pub title_tagged: bool,

    /// Non-fatal problems met after the file was written
    pub warnings: Vec<String>,
}

/// Lifecycle of the single in-flight download

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DownloadState {
    Idle,

    FetchingInfo,

    Downloading { percent: f64 },

    Done { output_path: PathBuf },

    Failed { message: String },

    Cancelled,
}

impl DownloadState {
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::FetchingInfo | Self::Downloading { .. })
    }
}

/// Progress update emitted while the external tool runs

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressEvent {
    Percent { value: f64 },

    Destination { path: PathBuf },

    PostProcessing { step: String },

    Log { level: LogLevel, message: String },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,

    Warning,

    Error,
}

/// Video information shown in the preview pane

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct VideoInfo {
    pub id: String,

    pub title: String,

    pub uploader: Option<String>,

    pub duration: Option<u64>,

    pub view_count: Option<u64>,

    pub thumbnail: Option<String>,

    pub webpage_url: String,

    /// Distinct video heights offered by the source, highest first
    pub heights: Vec<u32>,
}

/// Application error types

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Download failed: {reason}")]
    DownloadFailed { reason: String },

    #[error("Failed to write title tag to {}: {reason}", path.display())]
    TagWriteFailed { path: PathBuf, reason: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Could not fetch info: {0}")]
    Info(String),

    #[error("A download is already in progress")]
    Busy,

    #[error("Download cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AppError {
    /// Message shown in the error dialog
    pub fn user_message(&self) -> String {
        match self {
            Self::DownloadFailed { reason } => format!(
                "Download error: {}\nPossible issues: Invalid URL, geo-restriction, or missing FFmpeg/dependencies.",
                reason
            ),
            Self::Info(reason) => format!(
                "Could not fetch info: {}\nCheck URL or network connection.",
                reason
            ),
            other => other.to_string(),
        }
    }
}

/// Result type alias for application operations

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_parsing() {
        assert_eq!("720p".parse::<Resolution>().unwrap(), Resolution::P720);
        assert_eq!("Best".parse::<Resolution>().unwrap(), Resolution::Best);
        assert_eq!("1080".parse::<Resolution>().unwrap(), Resolution::P1080);
        assert!("999p".parse::<Resolution>().is_err());
        assert!("hd".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_format_kind() {
        assert_eq!(MediaFormat::Mp3.kind(), MediaKind::Audio);
        assert_eq!(MediaFormat::Webm.kind(), MediaKind::Video);
        assert_eq!("MKV".parse::<MediaFormat>().unwrap(), MediaFormat::Mkv);
        assert!("avi".parse::<MediaFormat>().is_err());
    }

    #[test]
    fn test_request_requires_url() {
        let request = DownloadRequest::new("   ", MediaFormat::Mp3, "/tmp");
        assert!(matches!(
            request.validate(),
            Err(AppError::InvalidRequest(_))
        ));

        let request = DownloadRequest::new("https://youtu.be/dQw4w9WgXcQ", MediaFormat::Mp3, "");
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_blank_title_is_ignored() {
        let request =
            DownloadRequest::new("https://youtu.be/x", MediaFormat::Mp4, "/tmp").with_title("  ");
        assert_eq!(request.custom_title(), None);

        let request = request.with_title(" My Song ");
        assert_eq!(request.custom_title(), Some("My Song"));
    }

    #[test]
    fn test_tag_failure_message_names_file() {
        let err = AppError::TagWriteFailed {
            path: PathBuf::from("a.mp3"),
            reason: "unsupported".to_string(),
        };
        let message = err.user_message();
        assert!(message.contains("a.mp3"));
        assert!(message.contains("unsupported"));
        assert!(!message.contains("geo-restriction"));
    }

    #[test]
    fn test_download_failure_message_lists_hints() {
        let err = AppError::DownloadFailed {
            reason: "HTTP Error 403".to_string(),
        };
        let message = err.user_message();
        assert!(message.contains("HTTP Error 403"));
        assert!(message.contains("geo-restriction"));
    }
}
