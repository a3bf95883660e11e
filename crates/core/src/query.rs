use crate::dimension::{adjust_dimension, validate_embedding};
use crate::models::{ConversationTurn, QueryOptions, QueryResult, ScoredMatch};
use crate::traits::{CompletionProvider, EmbeddingClient, VectorStore};
use crate::{QueryError, ServiceError};
use std::sync::Arc;
use tracing::{debug, info};

const SYSTEM_PROMPT: &str = "You are a helpful assistant that answers questions based on the provided context. \
Use ONLY the context provided to answer the question. If the information is not \
available in the context, say you don't know.";

pub const CONTEXT_SEPARATOR: &str = "\n\n";

pub struct QueryPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    completion: Arc<dyn CompletionProvider>,
    options: QueryOptions,
}

impl QueryPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        completion: Arc<dyn CompletionProvider>,
        options: QueryOptions,
    ) -> Self {
        Self {
            embedder,
            store,
            completion,
            options,
        }
    }

    pub fn options(&self) -> QueryOptions {
        self.options
    }

    /// Answers `query` from the stored document, carrying `history` through
    /// to the completion provider unchanged.
    pub async fn answer(
        &self,
        query: &str,
        history: &[ConversationTurn],
    ) -> Result<QueryResult, QueryError> {
        if query.trim().is_empty() {
            return Err(QueryError::InvalidQuery("query is empty".to_string()));
        }

        let context = self.retrieve_context(query).await?;
        let messages = build_messages(&context, history, query);

        let answer = self
            .completion
            .complete(&messages, self.options.completion)
            .await
            .map_err(|error| QueryError::CompletionProvider(error.to_string()))?;

        info!(
            provider = self.completion.name(),
            history_turns = history.len(),
            context_chars = context.len(),
            "answered query"
        );

        Ok(QueryResult { answer, context })
    }

    /// Embeds `query` and joins the texts of the top matches in rank order.
    pub async fn retrieve_context(&self, query: &str) -> Result<String, QueryError> {
        let embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(QueryError::Embedding)?;
        validate_embedding(&embedding)?;
        let vector = adjust_dimension(embedding, self.store.dimension())?;

        let matches = match self.store.query(&vector, self.options.top_k, true).await {
            Ok(matches) => matches,
            Err(ServiceError::NotFound(details)) => {
                debug!(%details, "vector store has nothing to search");
                Vec::new()
            }
            Err(error) => return Err(QueryError::VectorStore(error)),
        };

        debug!(store = self.store.name(), matches = matches.len(), "retrieved matches");
        join_context(&matches).ok_or(QueryError::NoContextFound)
    }
}

/// Joins the non-blank match texts with a blank line, keeping rank order.
/// Returns `None` when no match carries text.
pub fn join_context(matches: &[ScoredMatch]) -> Option<String> {
    let texts = matches
        .iter()
        .filter_map(ScoredMatch::text)
        .collect::<Vec<_>>();

    if texts.is_empty() {
        None
    } else {
        Some(texts.join(CONTEXT_SEPARATOR))
    }
}

/// System instruction with the retrieved context, then the prior turns
/// verbatim, then the new user question.
pub fn build_messages(
    context: &str,
    history: &[ConversationTurn],
    query: &str,
) -> Vec<ConversationTurn> {
    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(ConversationTurn::system(format!(
        "{SYSTEM_PROMPT}\n\nContext:\n{context}"
    )));
    messages.extend(history.iter().cloned());
    messages.push(ConversationTurn::user(query));
    messages
}
