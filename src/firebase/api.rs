use super::dto::parse_snapshot;
use super::sse::{SnapshotTree, SseParser, TreeChange};
use crate::agenda::model::Event;
use crate::config::model::FirebaseConfig;
use futures::StreamExt;
use lazy_static::lazy_static;
use reqwest::header::ACCEPT;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const VISIT_COUNT_PATH: &str = "visitCount";
const MAX_RETRIES: u32 = 5;
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

lazy_static! {
    static ref REST_CLIENT: ClientWithMiddleware = ClientBuilder::new(Client::new())
        .with(RetryTransientMiddleware::new_with_policy(
            ExponentialBackoff::builder().build_with_max_retries(MAX_RETRIES)
        ))
        .build();
}

#[derive(Debug, thiserror::Error)]
pub enum APIError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest_middleware::Error),
    #[error("database answered with an error: {0}")]
    Status(#[from] reqwest::Error),
    #[error("invalid response: {0}")]
    InvalidResponse(#[from] serde_json::Error),
}

/// Live view over the events node. Always holds the latest full snapshot.
pub struct EventsSubscription {
    pub snapshots: watch::Receiver<Arc<Vec<Event>>>,
    pub handle: JoinHandle<()>,
}

impl EventsSubscription {
    pub fn latest(&self) -> Arc<Vec<Event>> {
        self.snapshots.borrow().clone()
    }

    /// Waits for the next snapshot. `None` once the stream is gone for good.
    pub async fn changed(&mut self) -> Option<Arc<Vec<Event>>> {
        self.snapshots.changed().await.ok()?;

        Some(self.snapshots.borrow_and_update().clone())
    }
}

impl Drop for EventsSubscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Debug, Clone)]
pub struct FirebaseAPI {
    database_url: String,
    events_path: String,
}

impl FirebaseAPI {
    pub fn new(config: &FirebaseConfig) -> Self {
        Self {
            database_url: config.database_url.trim_end_matches('/').to_string(),
            events_path: config.events_path.trim_matches('/').to_string(),
        }
    }

    fn node_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.database_url, path)
    }

    /// One-shot read of the whole events node.
    #[tracing::instrument(skip(self))]
    pub async fn get_events(&self) -> Result<Vec<Event>, APIError> {
        info!("Getting all events");

        let snapshot = self.get_node(&self.events_path).await?;
        let events = parse_snapshot(&snapshot);

        info!("Got {} events", events.len());

        Ok(events)
    }

    async fn get_node(&self, path: &str) -> Result<Value, APIError> {
        let json_response = REST_CLIENT
            .get(self.node_url(path))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        serde_json::from_str::<Value>(&json_response).map_err(|e| {
            error!("Response parse failed: {:?}", e);
            APIError::InvalidResponse(e)
        })
    }

    /**
    Streams the events node and publishes a full snapshot after every change.
    Reconnects when the stream drops, until every receiver is gone.
    */
    pub fn subscribe(&self) -> EventsSubscription {
        let (sender, snapshots) = watch::channel(Arc::new(Vec::new()));
        let url = self.node_url(&self.events_path);

        let handle = tokio::spawn(async move {
            while !sender.is_closed() {
                match stream_node(&url, &sender).await {
                    Ok(StreamEnd::Closed(reason)) => {
                        error!("Events stream closed by the server: {}", reason);
                        return;
                    }
                    Ok(StreamEnd::Disconnected) => warn!("Events stream ended. Reconnecting"),
                    Err(err) => warn!("Events stream failed: {}. Reconnecting", err),
                }

                tokio::time::sleep(RECONNECT_DELAY).await;
            }

            debug!("No subscribers left");
        });

        EventsSubscription { snapshots, handle }
    }

    pub async fn get_visit_count(&self) -> Result<u64, APIError> {
        Ok(self.get_node(VISIT_COUNT_PATH).await?.as_u64().unwrap_or(0))
    }
}

enum StreamEnd {
    Disconnected,
    Closed(String),
}

async fn stream_node(
    url: &str,
    sender: &watch::Sender<Arc<Vec<Event>>>,
) -> Result<StreamEnd, APIError> {
    let response = REST_CLIENT
        .get(url)
        .header(ACCEPT, "text/event-stream")
        .send()
        .await?
        .error_for_status()?;

    info!("Subscribed to {}", url);

    let mut bytes = response.bytes_stream();
    let mut pending: Vec<u8> = Vec::new();
    let mut parser = SseParser::default();
    let mut tree = SnapshotTree::default();

    while let Some(chunk) = bytes.next().await {
        pending.extend_from_slice(&chunk?);

        let text = take_utf8(&mut pending);

        let mut updated = false;

        for event in parser.feed(&text) {
            match tree.apply(&event) {
                TreeChange::Updated => updated = true,
                TreeChange::Unchanged => {}
                TreeChange::Closed(reason) => return Ok(StreamEnd::Closed(reason)),
            }
        }

        if updated {
            let events = parse_snapshot(tree.root());

            debug!("Publishing snapshot with {} events", events.len());

            if sender.send(Arc::new(events)).is_err() {
                return Ok(StreamEnd::Disconnected);
            }
        }
    }

    Ok(StreamEnd::Disconnected)
}

/// Decodes as much of `pending` as possible, leaving an incomplete trailing
/// character for the next chunk. Invalid bytes become U+FFFD.
fn take_utf8(pending: &mut Vec<u8>) -> String {
    let mut text = String::new();
    let mut start = 0;

    while start < pending.len() {
        match std::str::from_utf8(&pending[start..]) {
            Ok(valid) => {
                text.push_str(valid);
                start = pending.len();
            }
            Err(err) => {
                let valid_up_to = start + err.valid_up_to();
                text.push_str(&String::from_utf8_lossy(&pending[start..valid_up_to]));

                match err.error_len() {
                    Some(invalid) => {
                        warn!("Skipping {} invalid bytes in the event stream", invalid);
                        text.push(char::REPLACEMENT_CHARACTER);
                        start = valid_up_to + invalid;
                    }
                    None => {
                        start = valid_up_to;
                        break;
                    }
                }
            }
        }
    }

    pending.drain(..start);
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn should_keep_a_split_character_for_the_next_chunk() {
        let bytes = "dañ".as_bytes();
        let mut pending = bytes[..bytes.len() - 1].to_vec();

        assert_eq!(take_utf8(&mut pending), "da");
        assert_eq!(pending, [0xC3]);

        pending.push(0xB1);
        assert_eq!(take_utf8(&mut pending), "ñ");
        assert!(pending.is_empty());
    }

    #[test_log::test]
    fn invalid_bytes_should_not_stall_the_stream() {
        let mut pending = b"data: a\xFFb\n".to_vec();
        pending.push(0xC3);

        assert_eq!(take_utf8(&mut pending), "data: a\u{FFFD}b\n");
        assert_eq!(pending, [0xC3]);
    }
}
