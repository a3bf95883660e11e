use axum::extract::rejection::JsonRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use pdf_chat_core::{
    ConversationTurn, IngestError, IngestionPipeline, QueryError, QueryPipeline,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{error, info, warn, Level};

const UPLOAD_FIELD: &str = "pdf";

#[derive(Clone)]
pub struct AppState {
    pub ingestion: Arc<IngestionPipeline>,
    pub query: Arc<QueryPipeline>,
    pub store_name: String,
}

pub fn create_router(state: AppState, max_upload_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let api = Router::new()
        .route(
            "/upload",
            post(upload_handler).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route(
            "/upload-pdf",
            post(parse_pdf_handler).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/chat", post(chat_handler));

    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .nest("/api", api)
        .with_state(state)
        .layer(trace_layer)
        .layer(cors)
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal { error: String, details: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(error) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error,
                    details: None,
                },
            ),
            ApiError::NotFound(error) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error,
                    details: None,
                },
            ),
            ApiError::Internal { error, details } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody {
                    error,
                    details: Some(details),
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<QueryError> for ApiError {
    fn from(value: QueryError) -> Self {
        match value {
            QueryError::InvalidQuery(_) => ApiError::BadRequest("Query is required".to_string()),
            QueryError::NoContextFound => ApiError::NotFound(QueryError::NoContextFound.to_string()),
            other => {
                error!(error = %other, "query failed");
                ApiError::Internal {
                    error: "Failed to process query".to_string(),
                    details: other.to_string(),
                }
            }
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(value: IngestError) -> Self {
        match value {
            IngestError::InvalidInput(message) => ApiError::BadRequest(message),
            other => {
                error!(error = %other, "pdf ingestion failed");
                ApiError::Internal {
                    error: "Failed to process PDF".to_string(),
                    details: other.to_string(),
                }
            }
        }
    }
}

async fn root_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Server is running" }))
}

async fn health_handler() -> &'static str {
    "OK"
}

struct UploadedPdf {
    filename: String,
    bytes: Vec<u8>,
}

/// Reads the `pdf` field of a multipart body, ignoring any other fields.
async fn read_pdf_field(mut multipart: Multipart) -> Result<UploadedPdf, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| ApiError::BadRequest(format!("Failed to read multipart: {error}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or("upload.pdf")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|error| ApiError::BadRequest(format!("Failed to read file: {error}")))?;

        if bytes.is_empty() {
            break;
        }
        return Ok(UploadedPdf {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    warn!("upload request without a pdf field");
    Err(ApiError::BadRequest("No file uploaded.".to_string()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: String,
    pub total_chunks: usize,
    pub successful_chunks: usize,
}

#[tracing::instrument(skip(state, multipart))]
async fn upload_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let upload = read_pdf_field(multipart).await?;
    info!(filename = %upload.filename, bytes = upload.bytes.len(), "received pdf upload");

    let report = state
        .ingestion
        .ingest_pdf(&upload.bytes, &upload.filename)
        .await?;

    if report.is_partial() {
        warn!(
            filename = %upload.filename,
            failed = report.failures.len(),
            "some chunks could not be embedded"
        );
    }

    Ok(Json(UploadResponse {
        message: format!(
            "PDF processed. {} chunks embedded and stored in {}.",
            report.successful_chunks, state.store_name
        ),
        total_chunks: report.total_chunks,
        successful_chunks: report.successful_chunks,
    }))
}

#[derive(Debug, Serialize)]
pub struct ParseResponse {
    pub message: String,
    pub text: String,
}

#[tracing::instrument(skip(state, multipart))]
async fn parse_pdf_handler(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ParseResponse>, ApiError> {
    let upload = read_pdf_field(multipart).await?;

    let text = state
        .ingestion
        .extract(&upload.bytes)
        .await
        .map_err(|error| {
            error!(filename = %upload.filename, %error, "failed to parse pdf");
            ApiError::Internal {
                error: "Failed to parse PDF.".to_string(),
                details: error.to_string(),
            }
        })?;

    Ok(Json(ParseResponse {
        message: "PDF parsed successfully!".to_string(),
        text,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub context: String,
}

#[tracing::instrument(skip(state, payload))]
async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) =
        payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let query = request
        .query
        .filter(|query| !query.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Query is required".to_string()))?;

    let result = state
        .query
        .answer(&query, &request.conversation_history)
        .await?;

    Ok(Json(ChatResponse {
        answer: result.answer,
        context: result.context,
    }))
}

pub async fn serve(state: AppState, host: &str, port: u16, max_upload_bytes: usize) -> anyhow::Result<()> {
    let router = create_router(state, max_upload_bytes);
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    info!(address = %listener.local_addr()?, "pdf-chat listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        error!(%error, "failed to listen for shutdown signal");
    }
    info!("shutting down");
}
