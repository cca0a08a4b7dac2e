//! Server-sent events as emitted by the realtime database streaming API.
//!
//! The database first sends a `put` at path `/` with the whole node and then
//! `put`/`patch` messages for each change, so a local copy of the tree is kept
//! and every snapshot handed out is a full one.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{trace, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerEvent {
    pub event: String,
    pub data: String,
}

/// Longest line kept while waiting for its newline. A `put` at `/` carries the
/// whole node on a single `data:` line.
pub const MAX_LINE_LENGTH: usize = 32 * 1024 * 1024;

/// Splits a byte stream into server-sent events.
#[derive(Debug)]
pub struct SseParser {
    buffer: String,
    event: Option<String>,
    data: Vec<String>,
    max_line_length: usize,
}

impl Default for SseParser {
    fn default() -> Self {
        Self::with_max_line_length(MAX_LINE_LENGTH)
    }
}

impl SseParser {
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            buffer: String::new(),
            event: None,
            data: Vec::new(),
            max_line_length,
        }
    }

    /// Lines longer than the limit are discarded together with the event
    /// they belong to.
    pub fn feed(&mut self, chunk: &str) -> Vec<ServerEvent> {
        self.buffer.push_str(chunk);

        let mut events = Vec::new();

        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(event) = self.dispatch() {
                    events.push(event);
                }
                continue;
            }

            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };

            match field {
                "event" => self.event = Some(value.to_string()),
                "data" => self.data.push(value.to_string()),
                _ => trace!("Ignoring SSE field '{}'", field),
            }
        }

        if self.buffer.len() > self.max_line_length {
            warn!(
                "Dropping an SSE line over {} bytes without a newline",
                self.max_line_length
            );
            self.buffer.clear();
            self.event = None;
            self.data.clear();
        }

        events
    }

    fn dispatch(&mut self) -> Option<ServerEvent> {
        let event = self.event.take();
        let data = std::mem::take(&mut self.data);

        if event.is_none() && data.is_empty() {
            return None;
        }

        Some(ServerEvent {
            event: event.unwrap_or_else(|| "message".to_string()),
            data: data.join("\n"),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PathData {
    path: String,
    data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreeChange {
    Updated,
    Unchanged,
    /// The server revoked access or cancelled the stream.
    Closed(String),
}

/// Local copy of a database node kept up to date from stream messages.
#[derive(Debug, Clone, Default)]
pub struct SnapshotTree {
    root: Value,
}

impl SnapshotTree {
    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn apply(&mut self, event: &ServerEvent) -> TreeChange {
        match event.event.as_str() {
            "put" | "patch" => match serde_json::from_str::<PathData>(&event.data) {
                Ok(PathData { path, data }) => {
                    if event.event == "put" {
                        self.put(&path, data);
                    } else {
                        self.patch(&path, data);
                    }
                    TreeChange::Updated
                }
                Err(err) => {
                    warn!("Invalid '{}' payload. Err: {err}", event.event);
                    TreeChange::Unchanged
                }
            },
            "keep-alive" => TreeChange::Unchanged,
            "cancel" | "auth_revoked" => TreeChange::Closed(event.data.clone()),
            other => {
                trace!("Ignoring stream event '{}'", other);
                TreeChange::Unchanged
            }
        }
    }

    pub fn put(&mut self, path: &str, data: Value) {
        let segments = segments(path);

        match segments.split_last() {
            None => self.root = data,
            Some((last, parents)) => {
                let parent = Self::node_mut(&mut self.root, parents);

                if data.is_null() {
                    parent.remove(*last);
                } else {
                    parent.insert(last.to_string(), data);
                }
            }
        }
    }

    pub fn patch(&mut self, path: &str, data: Value) {
        let Value::Object(children) = data else {
            warn!("Ignoring patch at '{}' without an object", path);
            return;
        };

        let node = Self::node_mut(&mut self.root, &segments(path));

        for (key, value) in children {
            if value.is_null() {
                node.remove(&key);
            } else {
                node.insert(key, value);
            }
        }
    }

    /// Walks down `path`, turning anything in the way into an object.
    fn node_mut<'a>(root: &'a mut Value, path: &[&str]) -> &'a mut Map<String, Value> {
        let mut node = root;

        for segment in path {
            node = Self::as_object(node)
                .entry(segment.to_string())
                .or_insert(Value::Null);
        }

        Self::as_object(node)
    }

    fn as_object(value: &mut Value) -> &mut Map<String, Value> {
        if let Value::Array(items) = value {
            // arrays are how the database sends numeric keys
            let map = std::mem::take(items)
                .into_iter()
                .enumerate()
                .filter(|(_, item)| !item.is_null())
                .map(|(index, item)| (index.to_string(), item))
                .collect();
            *value = Value::Object(map);
        }

        if !value.is_object() {
            *value = Value::Object(Map::new());
        }

        match value {
            Value::Object(map) => map,
            _ => unreachable!("value was just made an object"),
        }
    }
}

fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|segment| !segment.is_empty()).collect()
}
