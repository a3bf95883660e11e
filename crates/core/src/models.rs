use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DEFAULT_CHUNK_SIZE: usize = 1_000;
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1_024;
pub const DEFAULT_TARGET_DIMENSION: usize = 384;

/// A positional slice of the extracted document text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
}

impl Chunk {
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    pub filename: String,
    #[serde(deserialize_with = "integral_index")]
    pub chunk_index: usize,
    pub text: String,
    pub uploaded_at: DateTime<Utc>,
}

/// Stores may hand numeric metadata back as floats (`1.0`).
fn integral_index<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
        Ok(value as usize)
    } else {
        Err(D::Error::custom(format!("chunk index {value} is not a whole number")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: RecordMetadata,
}

impl VectorRecord {
    pub fn record_id(filename: &str, run_started_at: DateTime<Utc>, chunk_index: usize) -> String {
        format!(
            "{}_{}_{}",
            filename,
            run_started_at.timestamp_millis(),
            chunk_index
        )
    }
}

/// One hit returned by a vector store query, in rank order.
///
/// `text` is read from the payload on its own, so a hit keeps its context
/// even when the rest of the metadata does not match [`RecordMetadata`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub id: String,
    pub score: f64,
    pub text: Option<String>,
    pub metadata: Option<RecordMetadata>,
}

impl ScoredMatch {
    pub fn from_record(
        id: impl Into<String>,
        score: f64,
        metadata: Option<RecordMetadata>,
    ) -> Self {
        Self {
            id: id.into(),
            score,
            text: metadata.as_ref().map(|metadata| metadata.text.clone()),
            metadata,
        }
    }

    /// Builds a hit from a raw metadata/payload object returned by a store.
    pub fn from_payload(id: impl Into<String>, score: f64, payload: Option<&Value>) -> Self {
        Self {
            id: id.into(),
            score,
            text: payload
                .and_then(|payload| payload.get("text"))
                .and_then(Value::as_str)
                .map(str::to_string),
            metadata: payload
                .cloned()
                .and_then(|payload| serde_json::from_value::<RecordMetadata>(payload).ok()),
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text
            .as_deref()
            .filter(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub answer: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkFailure {
    pub chunk_index: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionReport {
    pub total_chunks: usize,
    pub successful_chunks: usize,
    pub failures: Vec<ChunkFailure>,
}

impl IngestionReport {
    pub fn is_partial(&self) -> bool {
        self.successful_chunks < self.total_chunks
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionOptions {
    pub chunk_size: usize,
    pub batch_size: usize,
}

impl Default for IngestionOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueryOptions {
    pub top_k: usize,
    pub completion: CompletionOptions,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            completion: CompletionOptions::default(),
        }
    }
}
