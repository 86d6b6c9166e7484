//! Post-download completion step

use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::models::{AppError, DownloadOutcome, DownloadRequest};
use crate::core::tagging::TagWriter;

/// Write the title tag to every produced file when one was requested and
/// build the outcome.
///
/// Tagging failures never fail the download; they are recorded as warnings.
pub async fn finish_download(
    files: Vec<PathBuf>,
    request: &DownloadRequest,
    tagger: Arc<dyn TagWriter>,
) -> DownloadOutcome {
    let mut outcome = DownloadOutcome {
        output_path: files.last().cloned().unwrap_or_default(),
        files,
        format: request.format,
        title_tagged: false,
        warnings: Vec::new(),
    };

    let Some(title) = request.custom_title().map(str::to_string) else {
        return outcome;
    };

    let targets = outcome.files.clone();
    let result = tokio::task::spawn_blocking(move || {
        targets
            .iter()
            .map(|path| tagger.write_title(path, &title))
            .collect::<Vec<_>>()
    })
    .await;

    match result {
        Ok(results) => {
            let mut all_tagged = !results.is_empty();
            for result in results {
                if let Err(e) = result {
                    warn!("{}", e);
                    outcome.warnings.push(e.user_message());
                    all_tagged = false;
                }
            }
            if all_tagged {
                info!("🏷️ Title tag written to {} file(s)", outcome.files.len());
            }
            outcome.title_tagged = all_tagged;
        }
        Err(join_err) => {
            let e = AppError::TagWriteFailed {
                path: outcome.output_path.clone(),
                reason: join_err.to_string(),
            };
            warn!("{}", e);
            outcome.warnings.push(e.user_message());
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::{AppResult, MediaFormat};
    use std::path::Path;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingTagger {
        calls: Mutex<Vec<(PathBuf, String)>>,
        fail: bool,
    }

    impl TagWriter for RecordingTagger {
        fn write_title(&self, path: &Path, title: &str) -> AppResult<()> {
            self.calls
                .lock()
                .unwrap()
                .push((path.to_path_buf(), title.to_string()));
            if self.fail {
                Err(AppError::TagWriteFailed {
                    path: path.to_path_buf(),
                    reason: "read-only".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn request() -> DownloadRequest {
        DownloadRequest::new("https://youtu.be/x", MediaFormat::Mp3, "/music")
    }

    #[tokio::test]
    async fn test_no_title_skips_tagging() {
        let tagger = Arc::new(RecordingTagger::default());
        let outcome = finish_download(vec!["/music/a.mp3".into()], &request(), tagger.clone()).await;

        assert!(!outcome.title_tagged);
        assert!(outcome.warnings.is_empty());
        assert!(tagger.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_title_is_written() {
        let tagger = Arc::new(RecordingTagger::default());
        let req = request().with_title("  Late Night  ");
        let outcome = finish_download(vec!["/music/a.mp3".into()], &req, tagger.clone()).await;

        assert!(outcome.title_tagged);
        assert_eq!(
            tagger.calls.lock().unwrap().as_slice(),
            &[(PathBuf::from("/music/a.mp3"), "Late Night".to_string())]
        );
    }

    #[tokio::test]
    async fn test_tag_failure_keeps_download() {
        let tagger = Arc::new(RecordingTagger {
            fail: true,
            ..Default::default()
        });
        let req = request().with_title("Late Night");
        let outcome = finish_download(vec!["/music/a.mp3".into()], &req, tagger).await;

        assert_eq!(outcome.output_path, PathBuf::from("/music/a.mp3"));
        assert!(!outcome.title_tagged);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("read-only"));
    }

    #[tokio::test]
    async fn test_every_playlist_file_is_tagged() {
        let tagger = Arc::new(RecordingTagger::default());
        let mut req = request().with_title("Mix");
        req.playlist = true;
        let files = vec![PathBuf::from("/music/1.mp3"), PathBuf::from("/music/2.mp3")];

        let outcome = finish_download(files.clone(), &req, tagger.clone()).await;

        assert!(outcome.title_tagged);
        assert_eq!(outcome.files, files);
        assert_eq!(outcome.output_path, PathBuf::from("/music/2.mp3"));
        let tagged: Vec<PathBuf> = tagger
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect();
        assert_eq!(tagged, files);
    }
}
