use crate::http::{backend_failure, build_client, trim_endpoint};
use crate::models::{ScoredMatch, VectorRecord};
use crate::traits::VectorStore;
use crate::ServiceError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

const UPSERT_BATCH: usize = 100;

/// Pinecone data-plane client addressed by index host.
pub struct PineconeStore {
    client: Client,
    host: String,
    api_key: String,
    namespace: String,
    dimension: usize,
}

impl PineconeStore {
    pub fn new(
        host: impl Into<String>,
        api_key: impl Into<String>,
        namespace: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client(timeout)?,
            host: trim_endpoint(host),
            api_key: api_key.into(),
            namespace: namespace.into(),
            dimension,
        })
    }

    async fn post(&self, route: &str, body: &Value) -> Result<reqwest::Response, ServiceError> {
        Ok(self
            .client
            .post(format!("{}{}", self.host, route))
            .header("Api-Key", &self.api_key)
            .json(body)
            .send()
            .await?)
    }
}

#[async_trait]
impl VectorStore for PineconeStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn delete_all(&self) -> Result<(), ServiceError> {
        let response = self
            .post(
                "/vectors/delete",
                &json!({ "deleteAll": true, "namespace": self.namespace }),
            )
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            debug!(namespace = %self.namespace, "pinecone namespace already empty");
            return Ok(());
        }
        if !response.status().is_success() {
            return Err(backend_failure("pinecone", response).await);
        }
        Ok(())
    }

    async fn upsert(&self, records: &[VectorRecord]) -> Result<(), ServiceError> {
        for batch in records.chunks(UPSERT_BATCH) {
            let vectors = batch
                .iter()
                .map(|record| {
                    if record.values.len() != self.dimension {
                        return Err(ServiceError::Request(format!(
                            "embedding dimension {} != {}",
                            record.values.len(),
                            self.dimension
                        )));
                    }
                    Ok(json!({
                        "id": record.id,
                        "values": record.values,
                        "metadata": record.metadata,
                    }))
                })
                .collect::<Result<Vec<_>, ServiceError>>()?;

            let response = self
                .post(
                    "/vectors/upsert",
                    &json!({ "vectors": vectors, "namespace": self.namespace }),
                )
                .await?;

            if !response.status().is_success() {
                return Err(backend_failure("pinecone", response).await);
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
        let response = self
            .post(
                "/query",
                &json!({
                    "vector": vector,
                    "topK": top_k,
                    "includeMetadata": include_metadata,
                    "includeValues": false,
                    "namespace": self.namespace,
                }),
            )
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(backend_failure("pinecone", response).await);
        }

        let parsed: Value = response.json().await?;
        let matches = parsed
            .pointer("/matches")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(matches
            .into_iter()
            .map(|hit| {
                ScoredMatch::from_payload(
                    hit.pointer("/id").and_then(Value::as_str).unwrap_or_default(),
                    hit.pointer("/score").and_then(Value::as_f64).unwrap_or(0.0),
                    hit.get("metadata"),
                )
            })
            .collect())
    }

    fn name(&self) -> &str {
        "pinecone"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecordMetadata;
    use chrono::Utc;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(uri: String) -> PineconeStore {
        PineconeStore::new(uri, "pc-key", "docs", 2, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn delete_all_tolerates_missing_namespace() -> Result<(), Box<dyn std::error::Error>> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectors/delete"))
            .and(header("Api-Key", "pc-key"))
            .and(body_partial_json(json!({"deleteAll": true, "namespace": "docs"})))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "code": 5, "message": "Namespace not found"
            })))
            .expect(1)
            .mount(&server)
            .await;

        store(server.uri()).delete_all().await?;
        Ok(())
    }

    #[tokio::test]
    async fn delete_all_propagates_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectors/delete"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let error = store(server.uri()).delete_all().await.unwrap_err();
        assert!(matches!(error, ServiceError::BackendResponse { .. }));
    }

    #[tokio::test]
    async fn upsert_sends_camel_case_metadata() -> Result<(), Box<dyn std::error::Error>> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .and(body_partial_json(json!({"namespace": "docs"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let record = VectorRecord {
            id: "doc.pdf_1_0".to_string(),
            values: vec![0.1, 0.2],
            metadata: RecordMetadata {
                filename: "doc.pdf".to_string(),
                chunk_index: 0,
                text: "hi".to_string(),
                uploaded_at: Utc::now(),
            },
        };
        store(server.uri()).upsert(&[record]).await?;

        let requests = server.received_requests().await.unwrap_or_default();
        let body: Value = serde_json::from_slice(&requests[0].body)?;
        assert_eq!(body["vectors"][0]["id"], "doc.pdf_1_0");
        assert_eq!(body["vectors"][0]["metadata"]["chunkIndex"], 0);
        assert_eq!(body["vectors"][0]["metadata"]["text"], "hi");
        Ok(())
    }

    #[tokio::test]
    async fn query_parses_matches_in_rank_order() -> Result<(), Box<dyn std::error::Error>> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .and(body_partial_json(json!({"topK": 5, "includeMetadata": true})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "matches": [
                    {"id": "a", "score": 0.9, "metadata": {
                        "filename": "doc.pdf", "chunkIndex": 1, "text": "first",
                        "uploadedAt": "2024-01-01T00:00:00Z"}},
                    {"id": "b", "score": 0.4}
                ],
                "namespace": "docs"
            })))
            .mount(&server)
            .await;

        let hits = store(server.uri()).query(&[0.1, 0.2], 5, true).await?;
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text(), Some("first"));
        assert!(hits[1].metadata.is_none());
        Ok(())
    }

    fn record(index: usize) -> VectorRecord {
        VectorRecord {
            id: format!("doc.pdf_1_{index}"),
            values: vec![0.1, 0.2],
            metadata: RecordMetadata {
                filename: "doc.pdf".to_string(),
                chunk_index: index,
                text: format!("chunk {index}"),
                uploaded_at: Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn upsert_is_split_into_slices_of_one_hundred() -> Result<(), Box<dyn std::error::Error>> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/vectors/upsert"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"upsertedCount": 1})))
            .expect(2)
            .mount(&server)
            .await;

        let records = (0..101).map(record).collect::<Vec<_>>();
        store(server.uri()).upsert(&records).await?;

        let requests = server.received_requests().await.unwrap_or_default();
        let sizes = requests
            .iter()
            .map(|request| {
                serde_json::from_slice::<Value>(&request.body)
                    .ok()
                    .and_then(|body| body["vectors"].as_array().map(Vec::len))
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>();
        assert_eq!(sizes, vec![100, 1]);
        Ok(())
    }

    #[tokio::test]
    async fn query_keeps_text_when_metadata_is_partial() -> Result<(), Box<dyn std::error::Error>> {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "matches": [
                    {"id": "a", "score": 0.9, "metadata": {"text": "text only"}},
                    {"id": "b", "score": 0.8, "metadata": {
                        "filename": "doc.pdf", "chunkIndex": 1.0, "text": "float index",
                        "uploadedAt": "2024-01-01T00:00:00Z"}}
                ]
            })))
            .mount(&server)
            .await;

        let hits = store(server.uri()).query(&[0.1, 0.2], 5, true).await?;
        assert_eq!(hits[0].text(), Some("text only"));
        assert!(hits[0].metadata.is_none());
        assert_eq!(hits[1].text(), Some("float index"));
        assert_eq!(
            hits[1].metadata.as_ref().map(|metadata| metadata.chunk_index),
            Some(1)
        );
        assert_eq!(
            crate::query::join_context(&hits).as_deref(),
            Some("text only\n\nfloat index")
        );
        Ok(())
    }
}
