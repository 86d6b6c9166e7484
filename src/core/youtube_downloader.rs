//! YouTube Downloader Module
//!
//! Turns a [`DownloadRequest`] into one run of the external `yt-dlp` tool and
//! hands the produced file to the completion step. The tool sits behind the
//! [`MediaBackend`] trait so the invoker can be driven without a network.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::completion::finish_download;
use crate::core::info::parse_video_info;
use crate::core::models::{
    AppError, AppResult, DownloadOutcome, DownloadRequest, LogLevel, ProgressEvent, VideoInfo,
};
use crate::core::options::{YtDlpOptions, FINAL_PATH_MARKER};
use crate::core::progress::{classify_line, OutputLine, ProgressTracker};
use crate::core::tagging::{LoftyTagWriter, TagWriter};
use crate::utils::file_utils::ensure_dir_exists;
use crate::utils::validation::{extract_youtube_id, has_playlist, is_youtube_url};

pub type ProgressSender = mpsc::UnboundedSender<ProgressEvent>;

/// Failure reported by a [`MediaBackend`]
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("Failed to run yt-dlp: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("yt-dlp exited with status {code:?}: {stderr_tail}")]
    Exited {
        code: Option<i32>,
        stderr_tail: String,
    },

    #[error("Failed to parse yt-dlp output: {0}")]
    Output(String),

    #[error("yt-dlp did not report an output file")]
    NoOutputFile,

    #[error("Download cancelled")]
    Cancelled,
}

/// The external download tool
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Raw metadata for a single video
    async fn fetch_info(&self, url: &str) -> Result<serde_json::Value, BackendError>;

    /// Run one download; returns the final files, one per downloaded item
    async fn download(
        &self,
        options: &YtDlpOptions,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Result<Vec<PathBuf>, BackendError>;

    /// Version string if the tool can be executed
    async fn version(&self) -> Option<String>;
}

/// [`MediaBackend`] running the `yt-dlp` executable as a child process.
///
/// The executable path can be swapped at runtime so a settings change applies
/// to the next invocation.
#[derive(Debug)]
pub struct YtDlpBackend {
    binary: RwLock<PathBuf>,
}

impl Default for YtDlpBackend {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

impl YtDlpBackend {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: RwLock::new(binary.into()),
        }
    }

    pub async fn binary(&self) -> PathBuf {
        self.binary.read().await.clone()
    }

    pub async fn set_binary(&self, binary: impl Into<PathBuf>) {
        let binary = binary.into();
        let mut current = self.binary.write().await;
        if *current != binary {
            info!("🔧 yt-dlp executable set to {}", binary.display());
            *current = binary;
        }
    }
}

fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    let start = lines.len().saturating_sub(count);
    lines[start..].join("\n")
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &bytes[start..end.max(start)]
}

/// Path from raw tool output; file names need not be UTF-8
#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

/// Read `reader` to EOF, handing every trimmed line to `on_line`.
///
/// Lines are raw bytes; the pipe keeps being drained whatever they contain.
async fn drain_lines<R, F>(reader: R, mut on_line: F)
where
    R: AsyncRead + Unpin,
    F: FnMut(&[u8]),
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => on_line(trim_ascii(&buf)),
            Err(e) => {
                warn!("Failed to read yt-dlp output: {}", e);
                break;
            }
        }
    }
}

#[async_trait]
impl MediaBackend for YtDlpBackend {
    async fn fetch_info(&self, url: &str) -> Result<serde_json::Value, BackendError> {
        let output = tokio::process::Command::new(self.binary().await)
            .args([
                "--dump-json",
                "--no-warnings",
                "--no-playlist",
                "--skip-download",
                "--no-check-certificates",
                url,
            ])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(BackendError::Spawn)?;

        if !output.status.success() {
            return Err(BackendError::Exited {
                code: output.status.code(),
                stderr_tail: last_lines(&String::from_utf8_lossy(&output.stderr), 3),
            });
        }

        serde_json::from_slice(&output.stdout).map_err(|e| BackendError::Output(e.to_string()))
    }

    async fn download(
        &self,
        options: &YtDlpOptions,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> Result<Vec<PathBuf>, BackendError> {
        let binary = self.binary().await;
        let args = options.to_args();
        debug!("Running {} {:?}", binary.display(), args);

        let mut child = tokio::process::Command::new(&binary)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(BackendError::Spawn)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BackendError::Output("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BackendError::Output("stderr not captured".to_string()))?;

        let progress_tx = progress.clone();
        let stdout_reader = tokio::spawn(async move {
            let mut tracker = ProgressTracker::new();
            let mut last_destination: Option<PathBuf> = None;
            let mut final_paths: Vec<PathBuf> = Vec::new();

            drain_lines(stdout, |raw| {
                if let Some(path) = raw.strip_prefix(FINAL_PATH_MARKER.as_bytes()) {
                    final_paths.push(path_from_bytes(trim_ascii(path)));
                    return;
                }

                match classify_line(&String::from_utf8_lossy(raw)) {
                    OutputLine::FinalPath(path) => final_paths.push(path),
                    OutputLine::Formats(format_id) => tracker.on_formats(&format_id),
                    OutputLine::Progress(ProgressEvent::Percent { value }) => {
                        if let Some(overall) = tracker.on_percent(value) {
                            let _ = progress_tx.send(ProgressEvent::Percent { value: overall });
                        }
                    }
                    OutputLine::Progress(ProgressEvent::Destination { path }) => {
                        last_destination = Some(path.clone());
                        let _ = progress_tx.send(ProgressEvent::Destination { path });
                    }
                    OutputLine::Progress(event) => {
                        let _ = progress_tx.send(event);
                    }
                    OutputLine::Other => {}
                }
            })
            .await;

            // builds without `--print after_move` support only announce destinations
            if final_paths.is_empty() {
                final_paths.extend(last_destination);
            }
            final_paths
        });

        let stderr_tx = progress.clone();
        let stderr_reader = tokio::spawn(async move {
            let mut content = String::new();
            drain_lines(stderr, |raw| {
                let line = String::from_utf8_lossy(raw);
                if line.starts_with("WARNING:") {
                    let _ = stderr_tx.send(ProgressEvent::Log {
                        level: LogLevel::Warning,
                        message: line.to_string(),
                    });
                }
                content.push_str(&line);
                content.push('\n');
            })
            .await;
            content
        });

        let status = tokio::select! {
            status = child.wait() => status.map_err(BackendError::Spawn)?,
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                // helpers spawned by yt-dlp may still hold the pipes open
                stdout_reader.abort();
                stderr_reader.abort();
                return Err(BackendError::Cancelled);
            }
        };

        let reported_paths = stdout_reader.await.unwrap_or_default();
        let stderr_content = stderr_reader.await.unwrap_or_default();

        if !status.success() {
            return Err(BackendError::Exited {
                code: status.code(),
                stderr_tail: last_lines(&stderr_content, 3),
            });
        }

        let audio_only = options.is_audio_only();
        let mut seen = HashSet::new();
        let paths: Vec<PathBuf> = reported_paths
            .into_iter()
            .map(|path| {
                // a destination line names the file before audio extraction
                if audio_only && path.extension().and_then(|e| e.to_str()) != Some("mp3") {
                    path.with_extension("mp3")
                } else {
                    path
                }
            })
            .filter(|path| seen.insert(path.clone()))
            .collect();

        if paths.is_empty() {
            return Err(BackendError::NoOutputFile);
        }

        let _ = progress.send(ProgressEvent::Percent { value: 100.0 });
        Ok(paths)
    }

    async fn version(&self) -> Option<String> {
        let output = tokio::process::Command::new(self.binary().await)
            .arg("--version")
            .output()
            .await
            .ok()?;

        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Download invoker
#[derive(Clone)]
pub struct YoutubeDownloader {
    backend: Arc<dyn MediaBackend>,
    tagger: Arc<dyn TagWriter>,
}

impl Default for YoutubeDownloader {
    fn default() -> Self {
        Self::new(Arc::new(YtDlpBackend::default()), Arc::new(LoftyTagWriter::new()))
    }
}

impl YoutubeDownloader {
    pub fn new(backend: Arc<dyn MediaBackend>, tagger: Arc<dyn TagWriter>) -> Self {
        Self { backend, tagger }
    }

    /// Fetch video information for the preview pane
    pub async fn fetch_video_info(&self, url: &str) -> AppResult<VideoInfo> {
        let url = url.trim();
        if url.is_empty() {
            return Err(AppError::InvalidRequest(
                "Please enter a YouTube URL".to_string(),
            ));
        }
        if !is_youtube_url(url) {
            return Err(AppError::InvalidRequest(
                "The entered URL does not appear to be a valid YouTube URL".to_string(),
            ));
        }

        debug!("🔍 Fetching video info for URL: {}", url);
        let json = self.backend.fetch_info(url).await.map_err(|e| {
            warn!("Info fetch failed: {}", e);
            AppError::Info(e.to_string())
        })?;

        let info = parse_video_info(&json)?;
        info!("📋 Fetched video info: {}", info.title);
        Ok(info)
    }

    /// Run one download and its completion step
    pub async fn download(
        &self,
        request: &DownloadRequest,
        progress: ProgressSender,
        cancel: CancellationToken,
    ) -> AppResult<DownloadOutcome> {
        request.validate()?;

        if !is_youtube_url(&request.url) {
            warn!(
                "URL does not look like YouTube, passing it to yt-dlp anyway: {}",
                request.url
            );
        }

        if has_playlist(&request.url) && !request.playlist {
            info!(
                "📃 Link belongs to a playlist, downloading only video {}",
                extract_youtube_id(&request.url).unwrap_or_else(|| request.url.clone())
            );
        }

        ensure_dir_exists(&request.output_dir)?;

        let options = YtDlpOptions::from_request(request);
        info!(
            "⬇️ Starting {} download: {} -> {}",
            request.format.extension().to_uppercase(),
            options.url,
            options.output_template.display()
        );
        let _ = progress.send(ProgressEvent::Log {
            level: LogLevel::Info,
            message: format!(
                "Starting download of {}...",
                request.format.extension().to_uppercase()
            ),
        });

        let files = match self.backend.download(&options, progress.clone(), cancel).await {
            Ok(files) => files,
            Err(BackendError::Cancelled) => {
                info!("🛑 Download cancelled: {}", options.url);
                return Err(AppError::Cancelled);
            }
            Err(e) => {
                error!("❌ Download failed: {}", e);
                return Err(AppError::DownloadFailed {
                    reason: e.to_string(),
                });
            }
        };

        if files.len() > 1 {
            info!("📃 yt-dlp produced {} files", files.len());
        }
        let outcome = finish_download(files, request, self.tagger.clone()).await;
        for warning in &outcome.warnings {
            let _ = progress.send(ProgressEvent::Log {
                level: LogLevel::Warning,
                message: warning.clone(),
            });
        }

        info!("✅ Download completed: {}", outcome.output_path.display());
        Ok(outcome)
    }
}
