pub mod chunking;
pub mod completion;
pub mod dimension;
pub mod embeddings;
pub mod error;
pub mod extractor;
pub mod http;
pub mod ingest;
pub mod models;
pub mod query;
pub mod stores;
pub mod traits;

pub use chunking::chunk_text;
pub use completion::{ChatCompletionClient, DEFAULT_COMPLETION_ENDPOINT, DEFAULT_COMPLETION_MODEL};
pub use dimension::{adjust_dimension, validate_embedding};
pub use embeddings::{
    CharacterNgramEmbedder, GeminiEmbedder, DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL,
};
pub use error::{IngestError, QueryError, ServiceError, VectorError};
pub use extractor::{extract_text, LopdfExtractor, PageText, PdfExtractor};
pub use http::DEFAULT_REQUEST_TIMEOUT;
pub use ingest::IngestionPipeline;
pub use models::{
    Chunk, ChunkFailure, CompletionOptions, ConversationTurn, IngestionOptions, IngestionReport,
    QueryOptions, QueryResult, RecordMetadata, Role, ScoredMatch, VectorRecord,
    DEFAULT_BATCH_SIZE, DEFAULT_CHUNK_SIZE, DEFAULT_MAX_TOKENS, DEFAULT_TARGET_DIMENSION,
    DEFAULT_TEMPERATURE, DEFAULT_TOP_K,
};
pub use query::{build_messages, QueryPipeline};
pub use stores::{MemoryStore, PineconeStore, QdrantStore};
pub use traits::{CompletionProvider, EmbeddingClient, VectorStore};
