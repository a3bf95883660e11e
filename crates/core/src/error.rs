use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum VectorError {
    #[error("embedding vector is empty")]
    Empty,

    #[error("target dimension must be greater than zero")]
    ZeroTarget,

    #[error("embedding has a non-finite value at index {0}")]
    NonFinite(usize),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("malformed provider response: {0}")]
    InvalidResponse(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid embedding: {0}")]
    InvalidVector(#[from] VectorError),

    #[error("embedding provider error: {0}")]
    Embedding(ServiceError),

    #[error("no valid vectors were generated from {total_chunks} chunk(s)")]
    NoValidVectors { total_chunks: usize },

    #[error("vector store error: {0}")]
    VectorStore(ServiceError),
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("embedding provider error: {0}")]
    Embedding(ServiceError),

    #[error("invalid query embedding: {0}")]
    InvalidVector(#[from] VectorError),

    #[error("vector store error: {0}")]
    VectorStore(ServiceError),

    #[error("No relevant information found in the database")]
    NoContextFound,

    #[error("completion provider error: {0}")]
    CompletionProvider(String),
}

pub type Result<T, E = IngestError> = std::result::Result<T, E>;
