use anyhow::{bail, Context};
use clap::{Args, ValueEnum};
use pdf_chat_core::{
    CharacterNgramEmbedder, ChatCompletionClient, CompletionOptions, CompletionProvider,
    EmbeddingClient, GeminiEmbedder, IngestionOptions, MemoryStore, PineconeStore, QdrantStore,
    QueryOptions, VectorStore, DEFAULT_COMPLETION_ENDPOINT, DEFAULT_COMPLETION_MODEL,
    DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL,
};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedderKind {
    /// Google Generative Language `embedContent`.
    Gemini,
    /// Offline hashed character trigrams.
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Pinecone,
    Qdrant,
    /// In-process store, lost when the process exits.
    Memory,
}

#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// Address the HTTP server binds to
    #[arg(long, env = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port the HTTP server listens on
    #[arg(long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Largest accepted upload body in bytes
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 25 * 1024 * 1024)]
    pub max_upload_bytes: usize,

    /// Embedding provider
    #[arg(long, env = "EMBEDDER", value_enum, default_value_t = EmbedderKind::Gemini)]
    pub embedder: EmbedderKind,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", default_value = "", hide_env_values = true)]
    pub gemini_api_key: String,

    /// Gemini embedding model
    #[arg(long, env = "GEMINI_EMBEDDING_MODEL", default_value = DEFAULT_GEMINI_MODEL)]
    pub gemini_model: String,

    /// Gemini API base URL
    #[arg(long, env = "GEMINI_BASE_URL", default_value = DEFAULT_GEMINI_ENDPOINT)]
    pub gemini_url: String,

    /// Vector store backend
    #[arg(long, env = "VECTOR_STORE", value_enum, default_value_t = StoreKind::Pinecone)]
    pub store: StoreKind,

    /// Pinecone index host, e.g. https://my-index-abc123.svc.us-east-1.pinecone.io
    #[arg(long, env = "PINECONE_HOST", default_value = "")]
    pub pinecone_host: String,

    /// Pinecone API key
    #[arg(long, env = "PINECONE_API_KEY", default_value = "", hide_env_values = true)]
    pub pinecone_api_key: String,

    /// Pinecone namespace
    #[arg(long, env = "PINECONE_NAMESPACE", default_value = "")]
    pub pinecone_namespace: String,

    /// Qdrant base URL
    #[arg(long, env = "QDRANT_URL", default_value = "http://localhost:6333")]
    pub qdrant_url: String,

    /// Qdrant collection
    #[arg(long, env = "QDRANT_COLLECTION", default_value = "pdf_chunks")]
    pub qdrant_collection: String,

    /// Dimension of the vector index; embeddings are padded or sampled to it
    #[arg(long, env = "TARGET_DIMENSION", default_value_t = pdf_chat_core::DEFAULT_TARGET_DIMENSION)]
    pub target_dimension: usize,

    /// Characters per chunk
    #[arg(long, env = "CHUNK_SIZE", default_value_t = pdf_chat_core::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Concurrent embedding requests per batch
    #[arg(long, env = "BATCH_SIZE", default_value_t = pdf_chat_core::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Number of chunks retrieved per question
    #[arg(long, env = "TOP_K", default_value_t = pdf_chat_core::DEFAULT_TOP_K)]
    pub top_k: usize,

    /// OpenAI-compatible chat completions base URL
    #[arg(long, env = "COMPLETION_BASE_URL", default_value = DEFAULT_COMPLETION_ENDPOINT)]
    pub completion_url: String,

    /// API key for the completion provider
    #[arg(long, env = "GROQ_API_KEY", default_value = "", hide_env_values = true)]
    pub completion_api_key: String,

    /// Completion model
    #[arg(long, env = "COMPLETION_MODEL", default_value = DEFAULT_COMPLETION_MODEL)]
    pub completion_model: String,

    /// Sampling temperature
    #[arg(long, env = "TEMPERATURE", default_value_t = pdf_chat_core::DEFAULT_TEMPERATURE)]
    pub temperature: f32,

    /// Maximum generated tokens
    #[arg(long, env = "MAX_TOKENS", default_value_t = pdf_chat_core::DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,

    /// Timeout in seconds for each call to an external provider
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

impl Settings {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chunk_size == 0 {
            bail!("chunk size must be greater than zero");
        }
        if self.batch_size == 0 {
            bail!("batch size must be greater than zero");
        }
        if self.top_k == 0 {
            bail!("top-k must be greater than zero");
        }
        if self.target_dimension == 0 {
            bail!("target dimension must be greater than zero");
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            bail!("temperature {} is outside 0.0..=2.0", self.temperature);
        }
        if self.request_timeout_secs == 0 {
            bail!("request timeout must be at least one second");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn ingestion_options(&self) -> IngestionOptions {
        IngestionOptions {
            chunk_size: self.chunk_size,
            batch_size: self.batch_size,
        }
    }

    pub fn query_options(&self) -> QueryOptions {
        QueryOptions {
            top_k: self.top_k,
            completion: CompletionOptions {
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            },
        }
    }

    pub fn build_embedder(&self) -> anyhow::Result<Arc<dyn EmbeddingClient>> {
        match self.embedder {
            EmbedderKind::Gemini => {
                if self.gemini_api_key.trim().is_empty() {
                    bail!("GEMINI_API_KEY is required for the gemini embedder");
                }
                let embedder = GeminiEmbedder::new(
                    &self.gemini_url,
                    &self.gemini_api_key,
                    &self.gemini_model,
                    self.request_timeout(),
                )
                .context("building gemini client")?;
                Ok(Arc::new(embedder))
            }
            EmbedderKind::Local => Ok(Arc::new(CharacterNgramEmbedder {
                dimensions: self.target_dimension,
            })),
        }
    }

    pub fn build_store(&self) -> anyhow::Result<Arc<dyn VectorStore>> {
        match self.store {
            StoreKind::Pinecone => {
                if self.pinecone_host.trim().is_empty() || self.pinecone_api_key.trim().is_empty() {
                    bail!("PINECONE_HOST and PINECONE_API_KEY are required for the pinecone store");
                }
                let store = PineconeStore::new(
                    &self.pinecone_host,
                    &self.pinecone_api_key,
                    &self.pinecone_namespace,
                    self.target_dimension,
                    self.request_timeout(),
                )
                .context("building pinecone client")?;
                Ok(Arc::new(store))
            }
            StoreKind::Qdrant => {
                let store = QdrantStore::new(
                    &self.qdrant_url,
                    &self.qdrant_collection,
                    self.target_dimension,
                    self.request_timeout(),
                )
                .context("building qdrant client")?;
                Ok(Arc::new(store))
            }
            StoreKind::Memory => Ok(Arc::new(MemoryStore::new(self.target_dimension))),
        }
    }

    pub fn build_completion(&self) -> anyhow::Result<Arc<dyn CompletionProvider>> {
        if self.completion_api_key.trim().is_empty() {
            bail!("GROQ_API_KEY is required for the completion provider");
        }
        let client = ChatCompletionClient::new(
            &self.completion_url,
            &self.completion_api_key,
            &self.completion_model,
            self.request_timeout(),
        )
        .context("building completion client")?;
        Ok(Arc::new(client))
    }
}
