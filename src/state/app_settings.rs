use crate::state::cache::FileStore;
use crate::state::engine::EngineSettings;
use cricket_api::client::ApiEndpoints;
use log::LevelFilter;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Upper bound for the results and upcoming window lengths.
pub const MAX_WINDOW_DAYS: u32 = 366;

#[derive(Debug, Clone)]
pub struct AppSettings {
    pub full_screen: bool,
    pub log_level: LevelFilter,
    pub endpoints: ApiEndpoints,
    pub engine: EngineSettings,
    pub cache_dir: PathBuf,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            full_screen: false,
            log_level: LevelFilter::Error,
            endpoints: ApiEndpoints::default(),
            engine: EngineSettings::default(),
            cache_dir: FileStore::default_dir(),
        }
    }
}

impl AppSettings {
    /// Defaults, overridden by `CRICTUI_*` environment variables.
    pub fn load() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        let secs = |key: &str| get(key).and_then(|v| v.parse::<u64>().ok()).filter(|&s| s > 0);
        let days = |key: &str| {
            get(key)
                .and_then(|v| v.parse::<u32>().ok())
                .filter(|&d| d > 0)
                .map(|d| d.min(MAX_WINDOW_DAYS))
        };

        let mut settings = Self::default();

        let endpoints = &mut settings.endpoints;
        if let Some(url) = get("CRICTUI_FEED_URL") {
            endpoints.feed_url = url;
        }
        if let Some(url) = get("CRICTUI_SCORECARD_URL") {
            endpoints.scorecard_url = url;
        }
        if let Some(id) = get("CRICTUI_CLIENT_ID") {
            endpoints.client_id = id;
        }
        endpoints.proxy_url = get("CRICTUI_PROXY_URL");
        endpoints.bypass_proxy_cache = get("CRICTUI_PROXY_NOCACHE")
            .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));

        let engine = &mut settings.engine;
        if let Some(s) = secs("CRICTUI_LIVE_POLL_SECS") {
            engine.live_period = Duration::from_secs(s);
        }
        if let Some(s) = secs("CRICTUI_IDLE_POLL_SECS") {
            engine.idle_period = Duration::from_secs(s);
        }
        if let Some(s) = secs("CRICTUI_HEAVY_POLL_SECS") {
            engine.heavy_period = Duration::from_secs(s);
        }
        if let Some(d) = days("CRICTUI_RESULTS_DAYS") {
            engine.results_days = d;
        }
        if let Some(d) = days("CRICTUI_UPCOMING_DAYS") {
            engine.upcoming_days = d;
        }

        if let Some(dir) = get("CRICTUI_CACHE_DIR") {
            settings.cache_dir = PathBuf::from(dir);
        }
        if let Some(level) = get("CRICTUI_LOG").and_then(|v| LevelFilter::from_str(&v).ok()) {
            settings.log_level = level;
        }

        settings
    }
}
