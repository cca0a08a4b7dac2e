use crate::agenda::stats::ScreenSize;
use std::fmt::Display;
use std::time::Duration;

#[derive(Debug)]
pub struct Config {
    pub debug_config: DebugConfig,
    pub firebase: FirebaseConfig,
    pub geocoding: GeocodingConfig,
    pub gemini: Option<GeminiConfig>,
    pub lookback_days: u64,
    pub screen_size: ScreenSize,
    /// Keep following the database after the first report.
    pub watch: bool,
}

#[derive(Debug)]
pub struct DebugConfig {
    pub event_limit: Option<usize>,
    pub skip_geocoding: bool,
}

#[derive(Debug, Clone)]
pub struct FirebaseConfig {
    pub database_url: String,
    pub events_path: String,
}

#[derive(Debug, Clone)]
pub struct GeocodingConfig {
    pub search_url: String,
    pub user_agent: String,
    pub request_delay: Duration,
}

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
}

// keeps the key out of logs
impl std::fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"***")
            .field("model", &self.model)
            .finish()
    }
}

impl Display for GeminiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "models/{}", self.model)
    }
}
