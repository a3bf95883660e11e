use crate::http::{backend_failure, build_client, trim_endpoint};
use crate::models::{ScoredMatch, VectorRecord};
use crate::traits::VectorStore;
use crate::ServiceError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use std::time::Duration;
use uuid::Uuid;

pub struct QdrantStore {
    endpoint: String,
    collection: String,
    client: Client,
    vector_size: usize,
}

impl QdrantStore {
    pub fn new(
        endpoint: impl Into<String>,
        collection: impl Into<String>,
        vector_size: usize,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            endpoint: trim_endpoint(endpoint),
            collection: collection.into(),
            client: build_client(timeout)?,
            vector_size,
        })
    }

    fn points_url(&self, suffix: &str) -> String {
        format!(
            "{}/collections/{}/points{}",
            self.endpoint, self.collection, suffix
        )
    }
}

/// Qdrant only accepts unsigned integers or UUIDs as point ids, so record ids
/// are hashed into a stable UUID and kept verbatim in the payload.
pub fn point_id(record_id: &str) -> Uuid {
    let digest = Sha256::digest(record_id.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}

#[async_trait]
impl VectorStore for QdrantStore {
    fn dimension(&self) -> usize {
        self.vector_size
    }

    async fn delete_all(&self) -> Result<(), ServiceError> {
        let response = self
            .client
            .post(self.points_url("/delete?wait=true"))
            .json(&json!({ "filter": {} }))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(backend_failure("qdrant", response).await);
        }
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), ServiceError> {
        let points = records
            .iter()
            .map(|record| {
                if record.values.len() != self.vector_size {
                    return Err(ServiceError::Request(format!(
                        "embedding dimension {} != {}",
                        record.values.len(),
                        self.vector_size
                    )));
                }

                let mut payload = serde_json::to_value(&record.metadata)?;
                if let Value::Object(fields) = &mut payload {
                    fields.insert("record_id".to_string(), Value::String(record.id.clone()));
                }

                Ok(json!({
                    "id": point_id(&record.id),
                    "vector": record.values,
                    "payload": payload,
                }))
            })
            .collect::<Result<Vec<_>, ServiceError>>()?;

        if points.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .put(self.points_url("?wait=true"))
            .json(&json!({ "points": points }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(backend_failure("qdrant", response).await);
        }

        Ok(())
    }

    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        include_metadata: bool,
    ) -> Result<Vec<ScoredMatch>, ServiceError> {
        if vector.len() != self.vector_size {
            return Err(ServiceError::Request(format!(
                "query vector dim {} is not {}",
                vector.len(),
                self.vector_size
            )));
        }

        let response = self
            .client
            .post(self.points_url("/search"))
            .json(&json!({
                "vector": vector,
                "limit": top_k,
                "with_payload": include_metadata,
            }))
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(ServiceError::NotFound(format!(
                "qdrant collection {}",
                self.collection
            )));
        }
        if !response.status().is_success() {
            return Err(backend_failure("qdrant", response).await);
        }

        let parsed: Value = response.json().await?;
        let hits = parsed
            .pointer("/result")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut result = Vec::new();
        for hit in hits {
            let payload = hit.get("payload").cloned().unwrap_or(Value::Null);
            let id = payload
                .pointer("/record_id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| {
                    hit.pointer("/id").map(|id| match id {
                        Value::String(text) => text.clone(),
                        other => other.to_string(),
                    })
                })
                .unwrap_or_default();
            let score = hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0);
            let payload = (!payload.is_null()).then_some(&payload);

            result.push(ScoredMatch::from_payload(id, score, payload));
        }

        Ok(result)
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordMetadata;
    use chrono::Utc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(uri: String) -> QdrantStore {
        QdrantStore::new(uri, "pdf_chunks", 2, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn point_ids_are_stable() {
        assert_eq!(point_id("doc.pdf_1_0"), point_id("doc.pdf_1_0"));
        assert_ne!(point_id("doc.pdf_1_0"), point_id("doc.pdf_1_1"));
    }

    #[tokio::test]
    async fn delete_all_on_missing_collection_is_ok() -> Result<(), Box<dyn std::error::Error>> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/pdf_chunks/points/delete"))
            .and(query_param("wait", "true"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        store(server.uri()).delete_all().await?;
        Ok(())
    }

    #[tokio::test]
    async fn upsert_keeps_record_id_in_payload() -> Result<(), Box<dyn std::error::Error>> {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/collections/pdf_chunks/points"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let record = VectorRecord {
            id: "doc.pdf_1_4".to_string(),
            values: vec![0.5, 0.5],
            metadata: RecordMetadata {
                filename: "doc.pdf".to_string(),
                chunk_index: 4,
                text: "body".to_string(),
                uploaded_at: Utc::now(),
            },
        };
        store(server.uri()).upsert(&[record]).await?;

        let requests = server.received_requests().await.unwrap_or_default();
        let body: Value = serde_json::from_slice(&requests[0].body)?;
        let point = &body["points"][0];
        assert_eq!(point["id"], point_id("doc.pdf_1_4").to_string());
        assert_eq!(point["payload"]["record_id"], "doc.pdf_1_4");
        assert_eq!(point["payload"]["chunkIndex"], 4);
        Ok(())
    }

    #[tokio::test]
    async fn search_maps_payload_back_to_metadata() -> Result<(), Box<dyn std::error::Error>> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/pdf_chunks/points/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [{
                    "id": "6b1c0c3e-0000-0000-0000-000000000000",
                    "score": 0.8,
                    "payload": {
                        "record_id": "doc.pdf_1_2",
                        "filename": "doc.pdf",
                        "chunkIndex": 2,
                        "text": "valve",
                        "uploadedAt": "2024-05-01T10:00:00Z"
                    }
                }]
            })))
            .mount(&server)
            .await;

        let hits = store(server.uri()).query(&[1.0, 0.0], 3, true).await?;
        assert_eq!(hits[0].id, "doc.pdf_1_2");
        assert_eq!(hits[0].text(), Some("valve"));
        assert!((hits[0].score - 0.8).abs() < f64::EPSILON);
        Ok(())
    }

    #[tokio::test]
    async fn search_keeps_text_from_foreign_payloads() -> Result<(), Box<dyn std::error::Error>> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/pdf_chunks/points/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "result": [
                    {"id": 7, "score": 0.9, "payload": {"text": "text only"}},
                    {"id": 8, "score": 0.7, "payload": {
                        "filename": "doc.pdf",
                        "chunkIndex": 1.0,
                        "text": "float index",
                        "uploadedAt": "2024-05-01T10:00:00Z"
                    }},
                    {"id": 9, "score": 0.5}
                ]
            })))
            .mount(&server)
            .await;

        let hits = store(server.uri()).query(&[1.0, 0.0], 3, true).await?;
        assert_eq!(hits[0].id, "7");
        assert_eq!(hits[0].text(), Some("text only"));
        assert_eq!(hits[1].text(), Some("float index"));
        assert_eq!(
            hits[1].metadata.as_ref().map(|metadata| metadata.chunk_index),
            Some(1)
        );
        assert_eq!(hits[2].text(), None);
        assert_eq!(
            crate::query::join_context(&hits).as_deref(),
            Some("text only\n\nfloat index")
        );
        Ok(())
    }

    #[tokio::test]
    async fn search_on_missing_collection_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collections/pdf_chunks/points/search"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = store(server.uri()).query(&[1.0, 0.0], 3, true).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn query_rejects_wrong_dimension() {
        let result = store("http://localhost:1".to_string())
            .query(&[1.0], 3, true)
            .await;
        assert!(matches!(result, Err(ServiceError::Request(_))));
    }
}
