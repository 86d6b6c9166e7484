use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Local;
use clap::Parser;

use youtube_link_downloader::core::models::{DownloadState, LogLevel, MediaFormat, Resolution};
use youtube_link_downloader::utils::logging::init_tracing;
use youtube_link_downloader::{
    AppConfig, DownloadSession, EventSink, LoftyTagWriter, SessionEvent, YoutubeDownloader,
    YtDlpBackend,
};

/// Download a YouTube link as video or MP3
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Link to the video (or playlist with --playlist)
    url: String,

    /// Output container: mp4, mkv, webm or mp3
    #[arg(short, long)]
    format: Option<MediaFormat>,

    /// Highest resolution: Best, 1080p, 720p, 480p, 360p, 240p or 144p
    #[arg(short, long)]
    resolution: Option<Resolution>,

    /// Title used for the file name and the title tag
    #[arg(short, long)]
    title: Option<String>,

    /// Folder the file is written to
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// yt-dlp output template, ignored when --title is given
    #[arg(long)]
    template: Option<String>,

    /// Download the whole playlist
    #[arg(long)]
    playlist: bool,

    /// Embed metadata and thumbnail
    #[arg(long)]
    embed_metadata: bool,

    /// Only print the video information
    #[arg(long)]
    info: bool,

    /// Path to the yt-dlp executable
    #[arg(long)]
    yt_dlp: Option<PathBuf>,

    /// Log level: error, warn, info, debug or trace
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let config = AppConfig::get_config_path()
        .map(|path| AppConfig::load_or_default(&path))
        .unwrap_or_default();
    init_tracing(Some(args.log_level.as_deref().unwrap_or("warn")));

    let binary = args.yt_dlp.clone().unwrap_or_else(|| config.ytdlp_path.clone());
    let session = DownloadSession::new(YoutubeDownloader::new(
        Arc::new(YtDlpBackend::new(binary)),
        Arc::new(LoftyTagWriter::new()),
    ));

    if args.info {
        return print_info(&session, &args.url).await;
    }

    let mut request = config.request_for(args.url.clone());
    if let Some(format) = args.format {
        request.format = format;
    }
    if let Some(resolution) = args.resolution {
        request.resolution = resolution;
    }
    if let Some(output) = args.output {
        request.output_dir = output;
    }
    if args.template.is_some() {
        request.filename_template = args.template;
    }
    request.title = args.title;
    request.playlist |= args.playlist;
    request.embed_metadata |= args.embed_metadata;
    request.embed_thumbnail = request.embed_metadata;

    let sink: Arc<dyn EventSink> = Arc::new(print_event);
    let handle = match session.start(request, sink).await {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Error: {}", e.user_message());
            return ExitCode::FAILURE;
        }
    };

    let cancel_session = session.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_session.cancel().await;
        }
    });

    match handle.wait().await {
        Ok(outcome) => {
            for file in &outcome.files {
                println!("Saved {}", file.display());
            }
            ExitCode::SUCCESS
        }
        Err(_) if session.state().await == DownloadState::Cancelled => {
            eprintln!("Download cancelled");
            ExitCode::from(130)
        }
        Err(_) => ExitCode::FAILURE,
    }
}

async fn print_info(session: &DownloadSession, url: &str) -> ExitCode {
    match session.fetch_info(url).await {
        Ok(info) => {
            println!("Title:    {}", info.title);
            if let Some(uploader) = &info.uploader {
                println!("Uploader: {}", uploader);
            }
            println!("Duration: {}", info.duration_label());
            println!("Views:    {}", info.views_label());
            if !info.heights.is_empty() {
                let heights: Vec<String> = info.heights.iter().map(|h| format!("{}p", h)).collect();
                println!("Heights:  {}", heights.join(", "));
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}", e.user_message());
            ExitCode::FAILURE
        }
    }
}

fn print_event(event: SessionEvent) {
    let stamp = Local::now().format("%H:%M:%S");
    match event {
        SessionEvent::Progress { percent, .. } => {
            eprint!("\r[{}] {:5.1}%", stamp, percent);
            let _ = std::io::stderr().flush();
        }
        SessionEvent::Log { level, message, .. } => {
            let marker = match level {
                LogLevel::Info => ' ',
                LogLevel::Warning => '!',
                LogLevel::Error => 'x',
            };
            eprintln!("\r[{}] {} {}", stamp, marker, message);
        }
        SessionEvent::Finished { .. } => eprintln!(),
    }
}
