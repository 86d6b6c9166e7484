use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "youtube_link_downloader=info,ytdl_cli=info,tauri=info";

/// Build the env filter, honouring `RUST_LOG` and an optional level override from settings
pub fn build_filter(level_override: Option<&str>) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    match level_override {
        Some(level) => EnvFilter::try_new(format!(
            "youtube_link_downloader={level},ytdl_cli={level},tauri=info"
        ))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
        None => EnvFilter::new(DEFAULT_FILTER),
    }
}

/// Install the global subscriber; repeated calls are ignored
pub fn init_tracing(level_override: Option<&str>) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(build_filter(level_override))
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing(None);
        init_tracing(Some("debug"));
    }

    #[test]
    fn test_invalid_level_falls_back() {
        let filter = build_filter(Some("not a level !!"));
        assert!(!filter.to_string().is_empty());
    }
}
