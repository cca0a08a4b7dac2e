use crate::agenda::aggregation::{filter_recent, sort_by_instant};
use crate::agenda::model::Event;
use crate::config::model::GeocodingConfig;
use crate::places::{geocoding_address, location_name};
use chrono::NaiveDate;
use indexmap::IndexMap;
use lazy_static::lazy_static;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

const MAX_RETRIES: u32 = 3;

lazy_static! {
    static ref REST_CLIENT: ClientWithMiddleware = ClientBuilder::new(Client::new())
        .with(RetryTransientMiddleware::new_with_policy(
            ExponentialBackoff::builder().build_with_max_retries(MAX_RETRIES)
        ))
        .build();
}

#[derive(Debug, thiserror::Error)]
pub enum GeocodingError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest_middleware::Error),
    #[error("geocoding service answered with an error: {0}")]
    Status(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
    #[error("invalid coordinates '{0}'")]
    InvalidCoordinates(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn directions_link(&self) -> String {
        format!("https://www.google.com/maps?q={},{}", self.lat, self.lng)
    }
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
}

impl SearchResult {
    fn to_model(&self) -> Result<Coordinates, GeocodingError> {
        let parse = |value: &str| {
            value
                .trim()
                .parse::<f64>()
                .map_err(|_| GeocodingError::InvalidCoordinates(format!("{},{}", self.lat, self.lon)))
        };

        Ok(Coordinates {
            lat: parse(&self.lat)?,
            lng: parse(&self.lon)?,
        })
    }
}

/// A map pin with everything happening at one address.
#[derive(Debug, Clone, PartialEq)]
pub struct MapMarker {
    pub address: String,
    pub location_name: String,
    pub coordinates: Coordinates,
    /// Chronological.
    pub events: Vec<Event>,
}

impl MapMarker {
    pub fn directions_link(&self) -> String {
        self.coordinates.directions_link()
    }
}

/// Upcoming events by geocoding address, addresses in first-seen order.
pub fn group_by_address(events: &[Event], today: NaiveDate, lookback_days: u64) -> Vec<(String, Vec<Event>)> {
    let mut addresses: IndexMap<String, Vec<Event>> = IndexMap::new();

    for event in filter_recent(events, today, lookback_days) {
        addresses
            .entry(geocoding_address(&event))
            .or_default()
            .push(event);
    }

    addresses
        .into_iter()
        .map(|(address, events)| (address, sort_by_instant(&events)))
        .filter(|(_, events)| !events.is_empty())
        .collect()
}

/// An address the geocoder can't do anything with.
pub fn is_valid_address(address: &str) -> bool {
    !address.trim().is_empty() && !address.starts_with(',')
}

pub struct NominatimAPI {
    config: GeocodingConfig,
}

impl NominatimAPI {
    pub fn new(config: GeocodingConfig) -> Self {
        Self { config }
    }

    /// `Ok(None)` when the address is invalid or nothing was found.
    #[instrument(skip(self))]
    pub async fn geocode(&self, address: &str) -> Result<Option<Coordinates>, GeocodingError> {
        if !is_valid_address(address) {
            warn!("Invalid address");
            return Ok(None);
        }

        let json_response = REST_CLIENT
            .get(&self.config.search_url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .header(USER_AGENT, &self.config.user_agent)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let results = serde_json::from_str::<Vec<SearchResult>>(&json_response)?;

        match results.first() {
            Some(result) => result.to_model().map(Some),
            None => {
                warn!("No coordinates found");
                Ok(None)
            }
        }
    }

    /**
    Geocodes every address with upcoming events, one request at a time.
    Addresses that fail or aren't found are left off the map.
    */
    #[instrument(skip(self, events), fields(event_count = %events.len()))]
    pub async fn load_markers(
        &self,
        events: &[Event],
        today: NaiveDate,
        lookback_days: u64,
    ) -> Vec<MapMarker> {
        let addresses = group_by_address(events, today, lookback_days);
        let mut markers = Vec::new();

        info!("Geocoding {} addresses", addresses.len());

        for (index, (address, events)) in addresses.into_iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.config.request_delay).await;
            }

            match self.geocode(&address).await {
                Ok(Some(coordinates)) => markers.push(MapMarker {
                    location_name: location_name(&events[0]),
                    address,
                    coordinates,
                    events,
                }),
                Ok(None) => debug!("Leaving '{}' off the map", address),
                Err(err) => error!("Error geocoding address '{}': {}", address, err),
            }
        }

        markers
    }
}
