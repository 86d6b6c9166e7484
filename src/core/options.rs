//! yt-dlp invocation options
//!
//! Translates a [`DownloadRequest`] into the stream selector, output template
//! and post-processing flags handed to the external tool.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::models::{DownloadRequest, MediaFormat, MediaKind, Resolution};
use crate::utils::file_utils::sanitize_filename;

pub const DEFAULT_FILENAME_TEMPLATE: &str = "%(title)s.%(ext)s";
pub const AUDIO_CODEC: &str = "mp3";
pub const AUDIO_QUALITY: &str = "192K";

/// Marker printed by yt-dlp once the final file has been moved into place
pub const FINAL_PATH_MARKER: &str = "ytdl-output:";

/// Marker printed before each item downloads, followed by the selected
/// format id (`137+140` when video and audio are fetched separately)
pub const FORMATS_MARKER: &str = "ytdl-formats:";

/// Post-processing steps requested from yt-dlp
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum PostProcessor {
    ExtractAudio { codec: String, quality: String },
    EmbedMetadata,
    EmbedThumbnail,
}

/// Options for a single yt-dlp run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct YtDlpOptions {
    pub url: String,
    pub format_selector: String,
    pub output_template: PathBuf,
    pub merge_output_format: Option<String>,
    pub postprocessors: Vec<PostProcessor>,
    pub no_playlist: bool,
    pub no_check_certificates: bool,
}

impl YtDlpOptions {
    pub fn from_request(request: &DownloadRequest) -> Self {
        let format_selector = format_selector(request.format, request.resolution);
        let output_template = output_template(request);

        let merge_output_format = match request.format.kind() {
            MediaKind::Video => Some(request.format.extension().to_string()),
            MediaKind::Audio => None,
        };

        let mut postprocessors = Vec::new();
        if request.format.kind() == MediaKind::Audio {
            postprocessors.push(PostProcessor::ExtractAudio {
                codec: AUDIO_CODEC.to_string(),
                quality: AUDIO_QUALITY.to_string(),
            });
        }
        if request.embed_metadata {
            postprocessors.push(PostProcessor::EmbedMetadata);
            if request.embed_thumbnail {
                postprocessors.push(PostProcessor::EmbedThumbnail);
            }
        }

        Self {
            url: request.url.trim().to_string(),
            format_selector,
            output_template,
            merge_output_format,
            postprocessors,
            no_playlist: !request.playlist,
            no_check_certificates: true,
        }
    }

    pub fn is_audio_only(&self) -> bool {
        self.postprocessors
            .iter()
            .any(|p| matches!(p, PostProcessor::ExtractAudio { .. }))
    }

    /// Command-line arguments, URL last
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "--format".to_string(),
            self.format_selector.clone(),
            "--output".to_string(),
            self.output_template.to_string_lossy().into_owned(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--progress-template".to_string(),
            "download:%(progress._percent_str)s".to_string(),
            "--print".to_string(),
            format!("before_dl:{}%(format_id)s", FORMATS_MARKER),
            "--print".to_string(),
            format!("after_move:{}%(filepath)s", FINAL_PATH_MARKER),
        ];

        args.push(if self.no_playlist {
            "--no-playlist".to_string()
        } else {
            "--yes-playlist".to_string()
        });

        if self.no_check_certificates {
            args.push("--no-check-certificates".to_string());
        }

        if let Some(ref container) = self.merge_output_format {
            args.push("--merge-output-format".to_string());
            args.push(container.clone());
        }

        for postprocessor in &self.postprocessors {
            match postprocessor {
                PostProcessor::ExtractAudio { codec, quality } => {
                    args.extend([
                        "--extract-audio".to_string(),
                        "--audio-format".to_string(),
                        codec.clone(),
                        "--audio-quality".to_string(),
                        quality.clone(),
                    ]);
                }
                PostProcessor::EmbedMetadata => args.push("--embed-metadata".to_string()),
                PostProcessor::EmbedThumbnail => args.push("--embed-thumbnail".to_string()),
            }
        }

        args.push(self.url.clone());
        args
    }
}

/// Stream selector for the requested format and resolution
pub fn format_selector(format: MediaFormat, resolution: Resolution) -> String {
    match (format.kind(), resolution.max_height()) {
        (MediaKind::Audio, _) => "bestaudio/best".to_string(),
        (MediaKind::Video, None) => "bestvideo*+bestaudio/best".to_string(),
        (MediaKind::Video, Some(height)) => {
            format!("bestvideo[height<={}]+bestaudio/best", height)
        }
    }
}

/// Output template joined onto the request's directory.
///
/// A custom title wins over a custom template; a blank template falls back
/// to the default.
pub fn output_template(request: &DownloadRequest) -> PathBuf {
    let file_template = if let Some(title) = request.custom_title() {
        format!("{}.%(ext)s", sanitize_filename(title))
    } else {
        match request.filename_template.as_deref().map(str::trim) {
            Some(template) if !template.is_empty() => template.to_string(),
            _ => DEFAULT_FILENAME_TEMPLATE.to_string(),
        }
    };

    Path::new(&request.output_dir).join(file_template)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(format: MediaFormat) -> DownloadRequest {
        DownloadRequest::new("https://youtu.be/dQw4w9WgXcQ", format, "/music")
    }

    #[test]
    fn test_audio_request_selects_audio_stream() {
        let options = YtDlpOptions::from_request(&request(MediaFormat::Mp3));

        assert_eq!(options.format_selector, "bestaudio/best");
        assert_eq!(options.merge_output_format, None);
        assert!(options.is_audio_only());
        assert_eq!(
            options.output_template,
            Path::new("/music").join(DEFAULT_FILENAME_TEMPLATE)
        );
    }

    #[test]
    fn test_audio_ignores_resolution() {
        let req = request(MediaFormat::Mp3).with_resolution(Resolution::P144);
        assert_eq!(YtDlpOptions::from_request(&req).format_selector, "bestaudio/best");
    }

    #[test]
    fn test_video_resolution_caps_height() {
        let req = request(MediaFormat::Mp4).with_resolution("720p".parse().unwrap());
        let options = YtDlpOptions::from_request(&req);

        assert_eq!(options.format_selector, "bestvideo[height<=720]+bestaudio/best");
        assert_eq!(options.merge_output_format.as_deref(), Some("mp4"));
        assert!(!options.is_audio_only());
    }

    #[test]
    fn test_best_video_selector() {
        assert_eq!(
            format_selector(MediaFormat::Webm, Resolution::Best),
            "bestvideo*+bestaudio/best"
        );
    }

    #[test]
    fn test_title_overrides_template() {
        let mut req = request(MediaFormat::Mp3).with_title("Night/Drive");
        req.filename_template = Some("%(id)s.%(ext)s".to_string());

        assert_eq!(
            output_template(&req),
            Path::new("/music").join("Night_Drive.%(ext)s")
        );
    }

    #[test]
    fn test_custom_template_and_blank_fallback() {
        let mut req = request(MediaFormat::Mkv);
        req.filename_template = Some("%(uploader)s - %(title)s.%(ext)s".to_string());
        assert_eq!(
            output_template(&req),
            Path::new("/music").join("%(uploader)s - %(title)s.%(ext)s")
        );

        req.filename_template = Some("   ".to_string());
        assert_eq!(
            output_template(&req),
            Path::new("/music").join(DEFAULT_FILENAME_TEMPLATE)
        );
    }

    #[test]
    fn test_args_for_audio() {
        let args = YtDlpOptions::from_request(&request(MediaFormat::Mp3)).to_args();

        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/dQw4w9WgXcQ"));
        assert!(args.contains(&"--extract-audio".to_string()));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert!(args.contains(&"192K".to_string()));
        assert!(!args.contains(&"--merge-output-format".to_string()));
        assert!(args.contains(&"before_dl:ytdl-formats:%(format_id)s".to_string()));
        assert!(args.contains(&"after_move:ytdl-output:%(filepath)s".to_string()));
    }

    #[test]
    fn test_metadata_postprocessors() {
        let mut req = request(MediaFormat::Mp4);
        req.embed_metadata = true;
        req.embed_thumbnail = true;
        req.playlist = true;
        let args = YtDlpOptions::from_request(&req).to_args();

        assert!(args.contains(&"--embed-metadata".to_string()));
        assert!(args.contains(&"--embed-thumbnail".to_string()));
        assert!(args.contains(&"--yes-playlist".to_string()));
    }

    #[test]
    fn test_thumbnail_requires_metadata() {
        let mut req = request(MediaFormat::Mp4);
        req.embed_thumbnail = true;
        let options = YtDlpOptions::from_request(&req);
        assert!(options.postprocessors.is_empty());
    }
}
