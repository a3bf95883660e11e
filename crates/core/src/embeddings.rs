use crate::http::{backend_failure, build_client, trim_endpoint};
use crate::models::DEFAULT_TARGET_DIMENSION;
use crate::traits::EmbeddingClient;
use crate::ServiceError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "embedding-001";

/// Offline embedder hashing character trigrams into a fixed number of
/// buckets. Deterministic, so it doubles as a test double.
#[derive(Debug, Clone, Copy)]
pub struct CharacterNgramEmbedder {
    pub dimensions: usize,
}

impl Default for CharacterNgramEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_TARGET_DIMENSION,
        }
    }
}

impl CharacterNgramEmbedder {
    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return vector;
        }

        for window in chars.windows(3) {
            let token = window.iter().collect::<String>();
            let mut hash = 1469598103934665603u64;
            for byte in token.bytes() {
                hash ^= byte as u64;
                hash = hash.wrapping_mul(1099511628211);
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
        if magnitude > 0.0 {
            for value in &mut vector {
                *value /= magnitude;
            }
        }

        vector
    }
}

#[async_trait]
impl EmbeddingClient for CharacterNgramEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        Ok(self.embed_sync(text))
    }

    fn name(&self) -> &str {
        "char-ngram"
    }
}

#[derive(Serialize)]
struct EmbedContentRequest<'a> {
    model: String,
    content: EmbedContent<'a>,
}

#[derive(Serialize)]
struct EmbedContent<'a> {
    parts: [EmbedPart<'a>; 1],
}

#[derive(Serialize)]
struct EmbedPart<'a> {
    text: &'a str,
}

/// Google Generative Language `embedContent` client.
pub struct GeminiEmbedder {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl GeminiEmbedder {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(timeout)?,
            endpoint: trim_endpoint(endpoint),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    fn request_url(&self) -> Result<url::Url, ServiceError> {
        let mut url = url::Url::parse(&format!(
            "{}/v1beta/models/{}:embedContent",
            self.endpoint, self.model
        ))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);
        Ok(url)
    }
}

#[async_trait]
impl EmbeddingClient for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError> {
        let body = EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: EmbedContent {
                parts: [EmbedPart { text }],
            },
        };

        let response = self
            .client
            .post(self.request_url()?)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_failure("gemini", response).await);
        }

        let payload: Value = response.json().await?;
        extract_embedding(&payload)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

/// Pulls the vector out of an `embedContent` payload.
///
/// Accepts `{"embedding": {"values": [..]}}`, a bare `{"embedding": [..]}`,
/// or an `embedding` object whose first array-valued field holds the numbers.
pub fn extract_embedding(payload: &Value) -> Result<Vec<f32>, ServiceError> {
    let embedding = payload
        .get("embedding")
        .ok_or_else(|| ServiceError::InvalidResponse("missing `embedding` field".to_string()))?;

    let values = match embedding {
        Value::Array(values) => values,
        Value::Object(fields) => match fields.get("values") {
            Some(Value::Array(values)) => values,
            _ => fields
                .values()
                .find_map(Value::as_array)
                .ok_or_else(|| {
                    ServiceError::InvalidResponse(
                        "`embedding` object has no array of values".to_string(),
                    )
                })?,
        },
        other => {
            return Err(ServiceError::InvalidResponse(format!(
                "`embedding` has unexpected type: {other}"
            )))
        }
    };

    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            value.as_f64().map(|number| number as f32).ok_or_else(|| {
                ServiceError::InvalidResponse(format!("embedding value {index} is not a number"))
            })
        })
        .collect()
}
