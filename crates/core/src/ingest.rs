use crate::chunking::chunk_text;
use crate::dimension::{adjust_dimension, validate_embedding};
use crate::extractor::{LopdfExtractor, PdfExtractor};
use crate::models::{
    Chunk, ChunkFailure, IngestionOptions, IngestionReport, RecordMetadata, VectorRecord,
};
use crate::traits::{EmbeddingClient, VectorStore};
use crate::{IngestError, ServiceError};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Chunk, embed and replace the vector store contents with one document.
///
/// Chunks are embedded batch by batch: every request of a batch is in
/// flight at once and the next batch starts only after the previous one has
/// settled. A chunk whose embedding fails is reported and skipped. Runs on
/// the same pipeline are serialized.
pub struct IngestionPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    extractor: Arc<dyn PdfExtractor>,
    options: IngestionOptions,
    run_lock: Mutex<()>,
}

impl IngestionPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        options: IngestionOptions,
    ) -> Result<Self, IngestError> {
        if options.chunk_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "chunk size must be greater than zero".to_string(),
            ));
        }
        if options.batch_size == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "batch size must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            embedder,
            store,
            extractor: Arc::new(LopdfExtractor),
            options,
            run_lock: Mutex::new(()),
        })
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn PdfExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn options(&self) -> IngestionOptions {
        self.options
    }

    /// Extracts the text of `bytes` off the async runtime.
    pub async fn extract(&self, bytes: &[u8]) -> Result<String, IngestError> {
        let extractor = Arc::clone(&self.extractor);
        let owned = bytes.to_vec();
        tokio::task::spawn_blocking(move || extractor.extract_text(&owned))
            .await
            .map_err(|error| IngestError::PdfParse(format!("extraction task failed: {error}")))?
    }

    pub async fn ingest_pdf(
        &self,
        bytes: &[u8],
        filename: &str,
    ) -> Result<IngestionReport, IngestError> {
        let text = self.extract(bytes).await?;
        self.ingest(&text, filename).await
    }

    pub async fn ingest(
        &self,
        document_text: &str,
        filename: &str,
    ) -> Result<IngestionReport, IngestError> {
        if filename.trim().is_empty() {
            return Err(IngestError::InvalidInput("filename is empty".to_string()));
        }

        let _run = self.run_lock.lock().await;

        let chunks = chunk_text(document_text, self.options.chunk_size)?;
        let total_chunks = chunks.len();
        info!(filename, chunk_count = total_chunks, "extracted and split document");

        let run_started_at = Utc::now();
        let target_dimension = self.store.dimension();
        let total_batches = total_chunks.div_ceil(self.options.batch_size);

        let mut records = Vec::with_capacity(total_chunks);
        let mut failures = Vec::new();

        for (batch_index, batch) in chunks.chunks(self.options.batch_size).enumerate() {
            debug!(
                batch = batch_index + 1,
                total_batches,
                first_chunk = batch[0].index,
                last_chunk = batch[batch.len() - 1].index,
                "embedding batch"
            );

            let outcomes = join_all(batch.iter().map(|chunk| {
                self.embed_chunk(chunk, filename, run_started_at, target_dimension)
            }))
            .await;

            for (chunk, outcome) in batch.iter().zip(outcomes) {
                match outcome {
                    Ok(record) => records.push(record),
                    Err(error) => {
                        warn!(filename, chunk_index = chunk.index, %error, "skipping chunk");
                        failures.push(ChunkFailure {
                            chunk_index: chunk.index,
                            reason: error.to_string(),
                        });
                    }
                }
            }

            debug!(batch = batch_index + 1, total_batches, "batch settled");
        }

        if records.is_empty() {
            return Err(IngestError::NoValidVectors { total_chunks });
        }

        self.clear_store().await?;
        self.store
            .upsert(&records)
            .await
            .map_err(IngestError::VectorStore)?;

        info!(
            filename,
            store = self.store.name(),
            total_chunks,
            successful = records.len(),
            "stored document vectors"
        );

        Ok(IngestionReport {
            total_chunks,
            successful_chunks: records.len(),
            failures,
        })
    }

    async fn clear_store(&self) -> Result<(), IngestError> {
        match self.store.delete_all().await {
            Ok(()) => {
                debug!(store = self.store.name(), "previous vectors deleted");
                Ok(())
            }
            Err(ServiceError::NotFound(details)) => {
                warn!(store = self.store.name(), %details, "no vectors to delete, store already empty");
                Ok(())
            }
            Err(error) => Err(IngestError::VectorStore(error)),
        }
    }

    async fn embed_chunk(
        &self,
        chunk: &Chunk,
        filename: &str,
        run_started_at: DateTime<Utc>,
        target_dimension: usize,
    ) -> Result<VectorRecord, IngestError> {
        let embedding = self
            .embedder
            .embed(&chunk.text)
            .await
            .map_err(IngestError::Embedding)?;
        validate_embedding(&embedding)?;

        if embedding.len() != target_dimension {
            debug!(
                chunk_index = chunk.index,
                from = embedding.len(),
                to = target_dimension,
                "adjusting embedding dimension"
            );
        }
        let values = adjust_dimension(embedding, target_dimension)?;

        Ok(VectorRecord {
            id: VectorRecord::record_id(filename, run_started_at, chunk.index),
            values,
            metadata: RecordMetadata {
                filename: filename.to_string(),
                chunk_index: chunk.index,
                text: chunk.text.clone(),
                uploaded_at: run_started_at,
            },
        })
    }
}
