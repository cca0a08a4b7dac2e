use crate::agenda::model::Event;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, warn};

// Note: fields are written by hand in the admin panel, so every one of them
// goes through a lenient deserializer
#[derive(Debug, Deserialize)]
pub struct EventResponse {
    #[serde(default, deserialize_with = "deserialize_str")]
    pub day: String,
    #[serde(default, deserialize_with = "deserialize_str")]
    pub hora: String,
    #[serde(default, deserialize_with = "deserialize_str")]
    pub tipo: String,
    #[serde(default, deserialize_with = "deserialize_opt_str")]
    pub lugar: Option<String>,
    #[serde(default, deserialize_with = "deserialize_str")]
    pub municipio: String,
    #[serde(default, deserialize_with = "deserialize_str")]
    pub orquesta: String,
    #[serde(default, deserialize_with = "deserialize_bool")]
    pub cancelado: bool,
    #[serde(rename = "FechaAgregado", default, deserialize_with = "deserialize_opt_str")]
    pub added_at: Option<String>,
    #[serde(rename = "FechaEditado", default, deserialize_with = "deserialize_opt_str")]
    pub edited_at: Option<String>,
}

impl EventResponse {
    pub fn to_model(self, id: String) -> Event {
        let mut event = Event::new(
            id,
            self.day,
            self.hora,
            self.tipo,
            self.lugar,
            self.municipio,
            self.orquesta,
            self.cancelado,
        );

        event.edited_at = self.edited_at.or_else(|| self.added_at.clone());
        event.added_at = self.added_at;

        event
    }
}

/**
Decodes the `events` node of the database.
The node is keyed by event ID; records that can't be decoded are skipped.
*/
pub fn parse_snapshot(snapshot: &Value) -> Vec<Event> {
    let entries: Vec<(String, &Value)> = match snapshot {
        Value::Object(records) => records.iter().map(|(id, v)| (id.clone(), v)).collect(),
        // numeric keys come back as an array, with holes as nulls
        Value::Array(records) => records
            .iter()
            .enumerate()
            .filter(|(_, v)| !v.is_null())
            .map(|(index, v)| (index.to_string(), v))
            .collect(),
        Value::Null => Vec::new(),
        unknown => {
            warn!("Unexpected events snapshot: {}", unknown);
            Vec::new()
        }
    };

    let events: Vec<Event> = entries
        .into_iter()
        .filter_map(
            |(id, record)| match EventResponse::deserialize(record) {
                Ok(response) => Some(response.to_model(id)),
                Err(err) => {
                    warn!("Skipping event {}. Err: {err}", id);
                    None
                }
            },
        )
        .collect();

    debug!("Decoded {} events", events.len());

    events
}

fn deserialize_str<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_opt_str(d)?.unwrap_or_default())
}

fn deserialize_opt_str<'de, D>(d: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn deserialize_bool<'de, D>(d: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => b,
        Value::String(s) => matches!(s.trim().to_lowercase().as_str(), "true" | "si" | "sí"),
        Value::Number(n) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    })
}
