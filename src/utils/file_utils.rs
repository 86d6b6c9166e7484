//! File system utilities

use std::fs;
use std::path::{Path, PathBuf};

use crate::core::models::{AppError, AppResult};

/// Ensure directory exists
pub fn ensure_dir_exists(path: &Path) -> AppResult<()> {
    if !path.is_dir() {
        fs::create_dir_all(path).map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!("Could not create output directory {}: {}", path.display(), e),
            ))
        })?;
        tracing::info!("Created output directory: {}", path.display());
    }
    Ok(())
}

/// Sanitize filename for filesystem
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .trim()
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    // yt-dlp treats `%` as the start of a template field
    let cleaned = cleaned.replace('%', "%%");
    let cleaned = cleaned.trim_matches('.').trim().to_string();

    if cleaned.is_empty() {
        "download".to_string()
    } else {
        cleaned
    }
}

/// `~/Downloads`, falling back to `./downloads`
pub fn default_download_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.download_dir().map(Path::to_path_buf))
        .or_else(|| directories::BaseDirs::new().map(|dirs| dirs.home_dir().join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("./downloads"))
}

/// `~/Desktop`, falling back to the home directory
pub fn default_desktop_dir() -> PathBuf {
    directories::UserDirs::new()
        .and_then(|dirs| dirs.desktop_dir().map(Path::to_path_buf))
        .or_else(|| directories::BaseDirs::new().map(|dirs| dirs.home_dir().join("Desktop")))
        .unwrap_or_else(|| PathBuf::from("."))
}
