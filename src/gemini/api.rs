use crate::agenda::model::Event;
use crate::config::model::GeminiConfig;
use lazy_static::lazy_static;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::policies::ExponentialBackoff;
use reqwest_retry::RetryTransientMiddleware;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const SNAPSHOT_PREFIX: &str = "BASE DE DATOS ENTERA: ";
const MAX_RETRIES: u32 = 2;

lazy_static! {
    static ref REST_CLIENT: ClientWithMiddleware = ClientBuilder::new(Client::new())
        .with(RetryTransientMiddleware::new_with_policy(
            ExponentialBackoff::builder().build_with_max_retries(MAX_RETRIES)
        ))
        .build();
}

/// Errors shown to whoever is chatting, hence in Spanish.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Por favor, ingresa un texto.")]
    EmptyInput,
    #[error("Error al obtener la respuesta de la IA: {0}")]
    Request(#[from] reqwest_middleware::Error),
    #[error("Error al obtener la respuesta de la IA: {0}")]
    Status(#[from] reqwest::Error),
    #[error("Error al obtener la respuesta de la IA: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Error: Formato de respuesta de la IA inesperado.")]
    UnexpectedFormat,
    #[error("Respuesta vacía.")]
    EmptyAnswer,
}

#[derive(Debug, Serialize)]
pub struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateRequest {
    /// The whole snapshot goes first, then the question as typed.
    /// Cancelled events are left out.
    pub fn new(events: &[Event], input: &str) -> Result<Self, ChatError> {
        let active: Vec<&Event> = events.iter().filter(|event| event.is_active()).collect();
        let snapshot = serde_json::to_string(&active)?;

        Ok(Self {
            contents: vec![Content {
                parts: vec![
                    Part {
                        text: Some(format!("{SNAPSHOT_PREFIX}{snapshot}")),
                    },
                    Part {
                        text: Some(input.to_string()),
                    },
                ],
            }],
        })
    }
}

impl GenerateResponse {
    fn answer(self) -> Result<String, ChatError> {
        let part = self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .ok_or(ChatError::UnexpectedFormat)?;

        match part.text.map(|text| text.trim().to_string()) {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(ChatError::EmptyAnswer),
        }
    }
}

pub struct GeminiAPI {
    config: GeminiConfig,
}

impl GeminiAPI {
    pub fn new(config: GeminiConfig) -> Self {
        Self { config }
    }

    #[instrument(skip(self, events), fields(event_count = %events.len(), model = %self.config))]
    pub async fn ask(&self, events: &[Event], input: &str) -> Result<String, ChatError> {
        if input.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }

        let body = serde_json::to_string(&GenerateRequest::new(events, input)?)?;

        info!("Asking about {} events", events.len());
        debug!("Request body is {} bytes", body.len());

        let json_response = REST_CLIENT
            .post(format!("{}/{}:generateContent", GEMINI_BASE_URL, self.config))
            .query(&[("key", self.config.api_key.as_str())])
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?
            .error_for_status()
            .inspect_err(|err| error!("Chat request failed: {}", err))?
            .text()
            .await?;

        serde_json::from_str::<GenerateResponse>(&json_response)
            .map_err(|err| {
                error!("Unexpected chat response: {}", err);
                ChatError::UnexpectedFormat
            })?
            .answer()
    }
}
