//! Core business logic module
//!
//! This module contains the domain models, the yt-dlp invoker, the
//! completion step and the download session driven by the interface.

pub mod completion;
pub mod config;
pub mod info;
pub mod models;
pub mod options;
pub mod progress;
pub mod session;
pub mod tagging;
pub mod youtube_downloader;


// Re-export commonly used types
pub use config::AppConfig;
pub use session::DownloadSession;
pub use youtube_downloader::YoutubeDownloader;
