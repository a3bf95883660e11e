use crate::ServiceError;
use reqwest::{Client, Response};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn build_client(timeout: Duration) -> Result<Client, ServiceError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

pub(crate) fn trim_endpoint(endpoint: impl Into<String>) -> String {
    endpoint.into().trim_end_matches('/').to_string()
}

/// Turns a non-success response into a `BackendResponse`, keeping the
/// provider's own message when the body carries one.
pub(crate) async fn backend_failure(backend: &str, response: Response) -> ServiceError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| provider_message(&value))
        .unwrap_or(body);

    let details = if message.trim().is_empty() {
        status.to_string()
    } else {
        format!("{status}: {}", message.trim())
    };

    ServiceError::BackendResponse {
        backend: backend.to_string(),
        details,
    }
}

fn provider_message(value: &Value) -> Option<String> {
    value
        .pointer("/error/message")
        .or_else(|| value.pointer("/message"))
        .or_else(|| value.pointer("/status/error"))
        .or_else(|| value.get("error"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn nested_error_message_is_preferred() {
        let body = json!({"error": {"message": "invalid api key", "code": 401}});
        assert_eq!(provider_message(&body).as_deref(), Some("invalid api key"));
    }

    #[test]
    fn flat_error_string_is_accepted() {
        let body = json!({"error": "index not found"});
        assert_eq!(provider_message(&body).as_deref(), Some("index not found"));
    }

    #[test]
    fn trailing_slashes_are_trimmed() {
        assert_eq!(trim_endpoint("http://localhost:6333//"), "http://localhost:6333");
    }
}
