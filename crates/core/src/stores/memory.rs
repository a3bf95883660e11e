use crate::models::{ScoredMatch, VectorRecord};
use crate::traits::VectorStore;
use crate::ServiceError;
use async_trait::async_trait;
use tokio::sync::RwLock;

/// In-process store with brute-force cosine similarity.
pub struct MemoryStore {
    dimension: usize,
    records: RwLock<Vec<VectorRecord>>,
}

impl MemoryStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            records: RwLock::new(Vec::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    pub async fn records(&self) -> Vec<VectorRecord> {
        self.records.read().await.clone()
    }
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    let (mut dot, mut left_norm, mut right_norm) = (0f64, 0f64, 0f64);
    for (a, b) in left.iter().zip(right) {
        let (a, b) = (f64::from(*a), f64::from(*b));
        dot += a * b;
        left_norm += a * a;
        right_norm += b * b;
    }

    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    dot / (left_norm.sqrt() * right_norm.sqrt())
}

#[async_trait]
impl VectorStore for MemoryStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn delete_all(&self) -> Result<(), ServiceError> {
        self.records.write().await.clear();
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), ServiceError> {
        if let Some(record) = records.iter().find(|record| record.values.len() != self.dimension) {
            return Err(ServiceError::Request(format!(
                "record {} has dimension {} != {}",
                record.id,
                record.values.len(),
                self.dimension
            )));
        }

        let mut stored = self.records.write().await;
        for record in records {
            match stored.iter_mut().find(|existing| existing.id == record.id) {
                Some(existing) => *existing = record.clone(),
                None => stored.push(record.clone()),
            }
        }
        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<ScoredMatch>, ServiceError> {
        if vector.len() != self.dimension {
            return Err(ServiceError::Request(format!(
                "query vector dim {} is not {}",
                vector.len(),
                self.dimension
            )));
        }

        let stored = self.records.read().await;
        let mut scored = stored
            .iter()
            .map(|record| (cosine_similarity(vector, &record.values), record))
            .collect::<Vec<_>>();
        scored.sort_by(|left, right| right.0.total_cmp(&left.0));

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(score, record)| {
                ScoredMatch::from_record(
                    record.id.clone(),
                    score,
                    include_metadata.then(|| record.metadata.clone()),
                )
            })
            .collect())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordMetadata;
    use chrono::Utc;

    fn record(id: &str, values: Vec<f32>, text: &str) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            values,
            metadata: RecordMetadata {
                filename: "doc.pdf".to_string(),
                chunk_index: 0,
                text: text.to_string(),
                uploaded_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn query_ranks_by_cosine_similarity() {
        let store = MemoryStore::new(2);
        store
            .upsert(&[
                record("a", vec![1.0, 0.0], "east"),
                record("b", vec![0.0, 1.0], "north"),
                record("c", vec![0.7, 0.7], "north-east"),
            ])
            .await
            .unwrap();

        let hits = store.query(&[0.0, 1.0], 2, true).await.unwrap();
        let ids = hits.iter().map(|hit| hit.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["b", "c"]);
        assert_eq!(hits[0].text(), Some("north"));
    }

    #[tokio::test]
    async fn metadata_is_omitted_on_request() {
        let store = MemoryStore::new(2);
        store.upsert(&[record("a", vec![1.0, 0.0], "x")]).await.unwrap();
        let hits = store.query(&[1.0, 0.0], 5, false).await.unwrap();
        assert!(hits[0].metadata.is_none());
    }

    #[tokio::test]
    async fn delete_all_on_empty_store_is_ok() {
        let store = MemoryStore::new(2);
        store.delete_all().await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let store = MemoryStore::new(3);
        assert!(store.upsert(&[record("a", vec![1.0], "x")]).await.is_err());
        assert!(store.query(&[1.0], 1, true).await.is_err());
    }

    #[tokio::test]
    async fn upsert_replaces_same_id() {
        let store = MemoryStore::new(2);
        store.upsert(&[record("a", vec![1.0, 0.0], "old")]).await.unwrap();
        store.upsert(&[record("a", vec![1.0, 0.0], "new")]).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.records().await[0].metadata.text, "new");
    }
}
