//! Parsing of yt-dlp's line-oriented console output

use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::core::models::ProgressEvent;
use crate::core::options::{FINAL_PATH_MARKER, FORMATS_MARKER};

/// Classification of one stdout line
#[derive(Debug, Clone, PartialEq)]
pub enum OutputLine {
    Progress(ProgressEvent),
    /// Format id selected for the next item
    Formats(String),
    FinalPath(PathBuf),
    Other,
}

fn destination_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[(download|ExtractAudio)\]\s+Destination:\s+(.+)$")
            .expect("destination regex is valid")
    })
}

fn merger_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\[Merger\]\s+Merging formats into\s+"(.+)"$"#)
            .expect("merger regex is valid")
    })
}

/// Percentage from a `download:NN.N%` progress-template line or a bare `NN.N%` line
pub fn parse_progress_line(line: &str) -> Option<f64> {
    let line = line.trim();
    let pct_str = if let Some(rest) = line.strip_prefix("download:") {
        rest.trim().trim_end_matches('%')
    } else if line.ends_with('%') && !line.starts_with('[') {
        line.trim_end_matches('%').split_whitespace().last()?
    } else {
        return None;
    };

    pct_str
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|pct| pct.is_finite())
        .map(|pct| pct.clamp(0.0, 100.0))
}

pub fn classify_line(line: &str) -> OutputLine {
    let trimmed = line.trim();

    if let Some(path) = trimmed.strip_prefix(FINAL_PATH_MARKER) {
        return OutputLine::FinalPath(PathBuf::from(path.trim()));
    }

    if let Some(format_id) = trimmed.strip_prefix(FORMATS_MARKER) {
        return OutputLine::Formats(format_id.trim().to_string());
    }

    if let Some(value) = parse_progress_line(trimmed) {
        return OutputLine::Progress(ProgressEvent::Percent { value });
    }

    if let Some(caps) = destination_regex().captures(trimmed) {
        let path = PathBuf::from(caps[2].trim());
        return OutputLine::Progress(ProgressEvent::Destination { path });
    }

    if let Some(caps) = merger_regex().captures(trimmed) {
        return OutputLine::Progress(ProgressEvent::PostProcessing {
            step: format!("Merging formats into {}", &caps[1]),
        });
    }

    for step in ["[ExtractAudio]", "[Metadata]", "[EmbedThumbnail]", "[FixupM3u8]"] {
        if trimmed.starts_with(step) {
            return OutputLine::Progress(ProgressEvent::PostProcessing {
                step: trimmed.to_string(),
            });
        }
    }

    OutputLine::Other
}

/// Raw percent drop that marks the start of the next stream
const STREAM_RESET_DROP: f64 = 10.0;

/// Maps yt-dlp's per-stream percentages onto one monotonic bar.
///
/// yt-dlp restarts its percentage for every stream of a merged format, so a
/// `137+140` download reports 0..100 twice. Each stream gets an equal share
/// of the bar and a large drop in the raw value moves to the next share.
#[derive(Debug)]
pub struct ProgressTracker {
    streams: u32,
    current: u32,
    last_raw: Option<f64>,
    max_reported: f64,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    /// Tracker for a single stream until [`Self::on_formats`] says otherwise
    pub fn new() -> Self {
        Self {
            streams: 1,
            current: 0,
            last_raw: None,
            max_reported: 0.0,
        }
    }

    /// A new item is about to download with the given format id
    pub fn on_formats(&mut self, format_id: &str) {
        let streams = format_id
            .split('+')
            .filter(|part| !part.trim().is_empty())
            .count()
            .max(1) as u32;
        *self = Self {
            streams,
            ..Self::new()
        };
    }

    /// Overall percentage to report, or `None` when it would go backwards
    pub fn on_percent(&mut self, pct: f64) -> Option<f64> {
        if let Some(prev) = self.last_raw {
            if pct + STREAM_RESET_DROP < prev && self.current + 1 < self.streams {
                self.current += 1;
            }
        }
        self.last_raw = Some(pct);

        let overall = (f64::from(self.current) * 100.0 + pct) / f64::from(self.streams);
        if overall > self.max_reported || (overall == 0.0 && self.max_reported == 0.0) {
            self.max_reported = overall;
            Some(overall)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_progress_line() {
        assert_eq!(parse_progress_line("download:  45.2%"), Some(45.2));
        assert_eq!(parse_progress_line("download:100%"), Some(100.0));
        assert_eq!(parse_progress_line("  92.5%"), Some(92.5));
        assert_eq!(parse_progress_line("download:  N/A%"), None);
        assert_eq!(parse_progress_line("[info] Writing video subtitles"), None);
        assert_eq!(parse_progress_line(""), None);
    }

    #[test]
    fn test_classify_destination_and_final_path() {
        assert_eq!(
            classify_line("[download] Destination: /tmp/song.webm"),
            OutputLine::Progress(ProgressEvent::Destination {
                path: PathBuf::from("/tmp/song.webm")
            })
        );
        assert_eq!(
            classify_line("ytdl-output:/tmp/song.mp3"),
            OutputLine::FinalPath(PathBuf::from("/tmp/song.mp3"))
        );
        assert_eq!(classify_line("[youtube] dQw4w9WgXcQ: Downloading webpage"), OutputLine::Other);
    }

    #[test]
    fn test_classify_merger() {
        match classify_line(r#"[Merger] Merging formats into "/tmp/clip.mp4""#) {
            OutputLine::Progress(ProgressEvent::PostProcessing { step }) => {
                assert!(step.contains("/tmp/clip.mp4"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_classify_formats_marker() {
        assert_eq!(
            classify_line("ytdl-formats:137+140"),
            OutputLine::Formats("137+140".to_string())
        );
    }

    #[test]
    fn test_single_stream_uses_the_whole_bar() {
        let mut tracker = ProgressTracker::new();
        tracker.on_formats("22");
        assert_eq!(tracker.on_percent(50.0), Some(50.0));
        assert_eq!(tracker.on_percent(100.0), Some(100.0));
    }

    #[test]
    fn test_unknown_format_is_one_stream() {
        let mut tracker = ProgressTracker::new();
        assert_eq!(tracker.on_percent(42.0), Some(42.0));
        assert_eq!(tracker.on_percent(10.0), None);
        assert_eq!(tracker.on_percent(60.0), Some(60.0));
    }

    #[test]
    fn test_tracker_splits_video_and_audio_streams() {
        let mut tracker = ProgressTracker::new();
        tracker.on_formats("137+140");
        assert_eq!(tracker.on_percent(50.0), Some(25.0));
        assert_eq!(tracker.on_percent(100.0), Some(50.0));

        // audio stream restarts at zero
        assert_eq!(tracker.on_percent(0.0), None);
        assert_eq!(tracker.on_percent(50.0), Some(75.0));
        assert_eq!(tracker.on_percent(100.0), Some(100.0));
    }

    #[test]
    fn test_small_jitter_is_not_a_new_stream() {
        let mut tracker = ProgressTracker::new();
        tracker.on_formats("137+140");
        assert_eq!(tracker.on_percent(40.0), Some(20.0));
        assert_eq!(tracker.on_percent(38.0), None);
        assert_eq!(tracker.on_percent(60.0), Some(30.0));
    }

    #[test]
    fn test_next_playlist_item_starts_over() {
        let mut tracker = ProgressTracker::new();
        tracker.on_formats("251");
        assert_eq!(tracker.on_percent(100.0), Some(100.0));

        tracker.on_formats("251");
        assert_eq!(tracker.on_percent(0.0), Some(0.0));
        assert_eq!(tracker.on_percent(30.0), Some(30.0));
    }
}
