//! Title tag writing for finished downloads

use lofty::config::WriteOptions;
use lofty::prelude::*;
use lofty::tag::Tag;
use std::path::Path;
use tracing::debug;

use crate::core::models::{AppError, AppResult};

/// Writes a title into a media file's metadata
pub trait TagWriter: Send + Sync {
    fn write_title(&self, path: &Path, title: &str) -> AppResult<()>;
}

/// [`TagWriter`] backed by lofty; handles ID3v2 (MP3), MP4 ilst and the other
/// containers lofty knows about
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagWriter;

impl LoftyTagWriter {
    pub fn new() -> Self {
        Self
    }

    fn failed(path: &Path, reason: impl ToString) -> AppError {
        AppError::TagWriteFailed {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

impl TagWriter for LoftyTagWriter {
    fn write_title(&self, path: &Path, title: &str) -> AppResult<()> {
        let mut tagged_file = lofty::read_from_path(path).map_err(|e| Self::failed(path, e))?;

        match tagged_file.primary_tag_mut() {
            Some(tag) => {
                tag.set_title(title.to_string());
                tag.save_to_path(path, WriteOptions::default())
                    .map_err(|e| Self::failed(path, e))?;
            }
            None => {
                let mut tag = Tag::new(tagged_file.primary_tag_type());
                tag.set_title(title.to_string());
                tag.save_to_path(path, WriteOptions::default())
                    .map_err(|e| Self::failed(path, e))?;
            }
        }

        debug!("Wrote title tag {:?} to {}", title, path.display());
        Ok(())
    }
}

/// Title currently stored in the file's primary tag
pub fn read_title(path: &Path) -> AppResult<Option<String>> {
    let tagged_file = lofty::read_from_path(path).map_err(|e| AppError::TagWriteFailed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    Ok(tagged_file
        .primary_tag()
        .and_then(|tag| tag.title().map(|t| t.into_owned())))
}
