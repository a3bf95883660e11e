use crate::models::{CompletionOptions, ConversationTurn, ScoredMatch, VectorRecord};
use crate::ServiceError;
use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ServiceError>;

    fn name(&self) -> &str;
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Dimension every stored vector must have.
    fn dimension(&self) -> usize;

    /// Removes every record. An already empty store is not an error.
    async fn delete_all(&self) -> Result<(), ServiceError>;

    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), ServiceError>;

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<ScoredMatch>, ServiceError>;

    fn name(&self) -> &str;
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(
        &self,
        messages: &[ConversationTurn],
        options: CompletionOptions,
    ) -> Result<String, ServiceError>;

    fn name(&self) -> &str;
}
