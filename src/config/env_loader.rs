use crate::agenda::aggregation::DEFAULT_LOOKBACK_DAYS;
use crate::agenda::stats::ScreenSize;
use crate::config::model::{Config, DebugConfig, FirebaseConfig, GeminiConfig, GeocodingConfig};
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_EVENTS_PATH: &str = "events";
const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";
const DEFAULT_USER_AGENT: &str = "VerbenasTenerife/1.0";
const DEFAULT_GEOCODING_DELAY_MS: u64 = 100;

pub fn load_config() -> Config {
    let database_url = load_required_config("FIREBASE_DATABASE_URL");
    let events_path = load_string_config("FIREBASE_EVENTS_PATH", DEFAULT_EVENTS_PATH);

    let gemini = env::var("GEMINI_API_KEY")
        .ok()
        .filter(|key| !key.trim().is_empty())
        .map(|api_key| GeminiConfig {
            api_key,
            model: load_string_config("GEMINI_MODEL", DEFAULT_GEMINI_MODEL),
        });

    let geocoding_delay_ms = load_parsed_config("GEOCODING_DELAY_MS", "an integer number")
        .unwrap_or(DEFAULT_GEOCODING_DELAY_MS);

    Config {
        debug_config: DebugConfig {
            event_limit: load_parsed_config("DEBUG_EVENT_LIMIT", "an integer number"),
            skip_geocoding: load_bool_config("DEBUG_SKIP_GEOCODING", false),
        },
        firebase: FirebaseConfig {
            database_url,
            events_path,
        },
        geocoding: GeocodingConfig {
            search_url: load_string_config("NOMINATIM_URL", DEFAULT_NOMINATIM_URL),
            user_agent: load_string_config("GEOCODING_USER_AGENT", DEFAULT_USER_AGENT),
            request_delay: Duration::from_millis(geocoding_delay_ms),
        },
        gemini,
        lookback_days: load_parsed_config("LOOKBACK_DAYS", "an integer number")
            .unwrap_or(DEFAULT_LOOKBACK_DAYS),
        screen_size: load_parsed_config("SCREEN_SIZE", "one of 'mobile', 'tablet' or 'desktop'")
            .unwrap_or(ScreenSize::Desktop),
        watch: load_bool_config("WATCH_EVENTS", false),
    }
}

fn load_required_config(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| panic!("{} must be set.", name))
}

fn load_string_config(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn load_bool_config(name: &str, default: bool) -> bool {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .unwrap_or_else(|_| {
            panic!(
                "Invalid config '{}'. Expected either 'true' or 'false'",
                name
            )
        })
}

fn load_parsed_config<T: FromStr>(name: &str, expected: &str) -> Option<T> {
    match env::var(name) {
        Ok(value) => Some(
            value
                .trim()
                .parse()
                .unwrap_or_else(|_| panic!("Invalid config '{}'. Expected {}.", name, expected)),
        ),
        Err(_) => None,
    }
}
