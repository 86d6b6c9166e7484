//! Single-download session
//!
//! Runs the invoker on a background task so the interface stays responsive,
//! forwards progress to an [`EventSink`] and hands the result back over a
//! oneshot channel. Only one download may be in flight at a time.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::core::models::{
    AppError, AppResult, DownloadOutcome, DownloadRequest, DownloadState, LogLevel, ProgressEvent,
    VideoInfo,
};
use crate::core::youtube_downloader::YoutubeDownloader;

/// Events pushed to the interface while a session runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Progress {
        download_id: String,
        percent: f64,
    },
    Log {
        download_id: String,
        level: LogLevel,
        message: String,
    },
    Finished {
        download_id: String,
        state: DownloadState,
        outcome: Option<DownloadOutcome>,
    },
}

/// Receives [`SessionEvent`]s; the GUI forwards them to the window, the CLI prints them
pub trait EventSink: Send + Sync + 'static {
    fn emit(&self, event: SessionEvent);
}

impl<F> EventSink for F
where
    F: Fn(SessionEvent) + Send + Sync + 'static,
{
    fn emit(&self, event: SessionEvent) {
        self(event)
    }
}

/// Handle to a download started by [`DownloadSession::start`]
pub struct DownloadHandle {
    pub download_id: String,
    pub completion: oneshot::Receiver<AppResult<DownloadOutcome>>,
}

impl DownloadHandle {
    /// Wait for the background task to finish
    pub async fn wait(self) -> AppResult<DownloadOutcome> {
        self.completion
            .await
            .unwrap_or_else(|_| Err(AppError::DownloadFailed {
                reason: "download task ended unexpectedly".to_string(),
            }))
    }
}

#[derive(Clone)]
pub struct DownloadSession {
    downloader: YoutubeDownloader,
    state: Arc<RwLock<DownloadState>>,
    cancel: Arc<Mutex<Option<CancellationToken>>>,
}

impl DownloadSession {
    pub fn new(downloader: YoutubeDownloader) -> Self {
        Self {
            downloader,
            state: Arc::new(RwLock::new(DownloadState::Idle)),
            cancel: Arc::new(Mutex::new(None)),
        }
    }

    pub async fn state(&self) -> DownloadState {
        self.state.read().await.clone()
    }

    /// Claim the session for a new operation, rejecting it while one is running
    async fn begin(&self, next: DownloadState) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.is_busy() {
            return Err(AppError::Busy);
        }
        *state = next;
        Ok(())
    }

    /// Fetch preview information; shares the busy flag with downloads
    pub async fn fetch_info(&self, url: &str) -> AppResult<VideoInfo> {
        self.begin(DownloadState::FetchingInfo).await?;
        let result = self.downloader.fetch_video_info(url).await;
        *self.state.write().await = DownloadState::Idle;
        result
    }

    /// Start a download on a background task.
    ///
    /// Fails fast with the validation error for an empty URL; the external
    /// tool is not started in that case.
    pub async fn start(
        &self,
        request: DownloadRequest,
        sink: Arc<dyn EventSink>,
    ) -> AppResult<DownloadHandle> {
        request.validate()?;
        self.begin(DownloadState::Downloading { percent: 0.0 }).await?;

        let download_id = Uuid::new_v4().to_string();
        let token = CancellationToken::new();
        *self.cancel.lock().await = Some(token.clone());

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<ProgressEvent>();
        let (done_tx, done_rx) = oneshot::channel();

        info!("🚀 Download {} started for {}", download_id, request.url);

        let forward_state = self.state.clone();
        let forward_sink = sink.clone();
        let forward_id = download_id.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(event) = progress_rx.recv().await {
                match event {
                    ProgressEvent::Percent { value } => {
                        *forward_state.write().await = DownloadState::Downloading { percent: value };
                        forward_sink.emit(SessionEvent::Progress {
                            download_id: forward_id.clone(),
                            percent: value,
                        });
                    }
                    ProgressEvent::Destination { path } => {
                        forward_sink.emit(SessionEvent::Log {
                            download_id: forward_id.clone(),
                            level: LogLevel::Info,
                            message: format!("Destination: {}", path.display()),
                        });
                    }
                    ProgressEvent::PostProcessing { step } => {
                        forward_sink.emit(SessionEvent::Log {
                            download_id: forward_id.clone(),
                            level: LogLevel::Info,
                            message: step,
                        });
                    }
                    ProgressEvent::Log { level, message } => {
                        forward_sink.emit(SessionEvent::Log {
                            download_id: forward_id.clone(),
                            level,
                            message,
                        });
                    }
                }
            }
        });

        let session = self.clone();
        let task_id = download_id.clone();
        tokio::spawn(async move {
            let result = session
                .downloader
                .download(&request, progress_tx, token)
                .await;
            // sender dropped with the download future, so the forwarder drains and exits
            let _ = forwarder.await;

            let final_state = match &result {
                Ok(outcome) => DownloadState::Done {
                    output_path: outcome.output_path.clone(),
                },
                Err(AppError::Cancelled) => DownloadState::Cancelled,
                Err(e) => DownloadState::Failed {
                    message: e.user_message(),
                },
            };

            {
                // the token goes before the session is released, so a download
                // started right after this one keeps its own
                let mut state = session.state.write().await;
                *session.cancel.lock().await = None;
                *state = final_state.clone();
            }

            if let Err(ref e) = result {
                sink.emit(SessionEvent::Log {
                    download_id: task_id.clone(),
                    level: LogLevel::Error,
                    message: format!("ERROR: {}", e.user_message()),
                });
            }
            sink.emit(SessionEvent::Finished {
                download_id: task_id,
                state: final_state,
                outcome: result.as_ref().ok().cloned(),
            });

            if done_tx.send(result).is_err() {
                debug!("Download result was not awaited");
            }
        });

        Ok(DownloadHandle {
            download_id,
            completion: done_rx,
        })
    }

    /// Cancel the running download; returns whether one was running
    pub async fn cancel(&self) -> bool {
        match self.cancel.lock().await.as_ref() {
            Some(token) => {
                info!("🛑 Cancelling active download");
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Return to idle after a finished, failed or cancelled download
    pub async fn reset(&self) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.is_busy() {
            return Err(AppError::Busy);
        }
        *state = DownloadState::Idle;
        Ok(())
    }
}
