use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{Backend, BackendError, BackendRequest, build_http_client};

pub(super) const DEFAULT_GEMINI_URL: &str = "https://generativelanguage.googleapis.com";

/// Error status Google APIs attach to quota and rate-limit failures.
const RESOURCE_EXHAUSTED: &str = "RESOURCE_EXHAUSTED";

/// Backend calling the Gemini `generateContent` REST endpoint.
pub struct GeminiBackend {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiBackend {
    /// Create a backend for the given API base URL, key, and model.
    pub fn new(base_url: String, api_key: String, model: String) -> Result<Self, BackendError> {
        Ok(Self {
            http: build_http_client("tos-decoder/gemini")?,
            base_url,
            api_key,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default, rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

/// Classify a non-success response using the HTTP status and the structured error status.
fn classify_failure(status: StatusCode, body: &str) -> BackendError {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();
    let message = envelope
        .as_ref()
        .map(|envelope| envelope.error.message.clone())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| body.trim().to_string());
    let exhausted = status == StatusCode::TOO_MANY_REQUESTS
        || envelope
            .as_ref()
            .is_some_and(|envelope| envelope.error.status == RESOURCE_EXHAUSTED);

    if exhausted {
        BackendError::QuotaExhausted(message)
    } else if matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
    ) {
        BackendError::Unavailable(format!("Gemini returned {status}: {message}"))
    } else {
        BackendError::GenerationFailed(format!("Gemini returned {status}: {message}"))
    }
}

#[async_trait]
impl Backend for GeminiBackend {
    async fn invoke(&self, request: BackendRequest) -> Result<String, BackendError> {
        let payload = json!({
            "contents": [{ "parts": [{ "text": request.prompt }] }],
            "generationConfig": {
                "maxOutputTokens": request.max_output_tokens,
                "temperature": 0.1,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                BackendError::Unavailable(format!(
                    "failed to reach Gemini at {}: {error}",
                    self.base_url
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let body: GenerateResponse = response.json().await.map_err(|error| {
            BackendError::InvalidResponse(format!("failed to decode Gemini response: {error}"))
        })?;

        let Some(candidate) = body.candidates.into_iter().next() else {
            return Err(BackendError::InvalidResponse(
                "Gemini response contained no candidates".into(),
            ));
        };

        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(BackendError::InvalidResponse(format!(
                "Gemini returned no text (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(text.trim().to_string())
    }

    fn provider(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    const PATH: &str = "/v1beta/models/gemini-test:generateContent";

    fn backend(server: &MockServer) -> GeminiBackend {
        GeminiBackend::new(server.base_url(), "secret".into(), "gemini-test".into())
            .expect("client")
    }

    #[tokio::test]
    async fn gemini_backend_joins_candidate_parts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path(PATH)
                    .header("x-goog-api-key", "secret")
                    .body_contains("\"maxOutputTokens\":1024");
                then.status(200).json_body(json!({
                    "candidates": [{
                        "content": { "parts": [{ "text": "{\"summary\":" }, { "text": "[]}\n" }] },
                        "finishReason": "STOP"
                    }]
                }));
            })
            .await;

        let text = backend(&server)
            .invoke(BackendRequest::new("Consolidate", 1024))
            .await
            .expect("generated text");

        mock.assert();
        assert_eq!(text, "{\"summary\":[]}");
    }

    #[tokio::test]
    async fn gemini_backend_maps_resource_exhausted_to_quota_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(429).json_body(json!({
                    "error": {
                        "code": 429,
                        "message": "Quota exceeded for requests per day.",
                        "status": "RESOURCE_EXHAUSTED"
                    }
                }));
            })
            .await;

        let error = backend(&server)
            .invoke(BackendRequest::new("Summarize", 64))
            .await
            .expect_err("quota error");

        assert!(matches!(
            &error,
            BackendError::QuotaExhausted(message) if message.contains("Quota exceeded")
        ));
    }

    #[tokio::test]
    async fn gemini_backend_reports_empty_candidates_as_invalid() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path(PATH);
                then.status(200).json_body(json!({ "candidates": [] }));
            })
            .await;

        let error = backend(&server)
            .invoke(BackendRequest::new("Summarize", 64))
            .await
            .expect_err("no candidates");

        assert!(matches!(error, BackendError::InvalidResponse(_)));
    }

    #[test]
    fn classify_failure_uses_structured_status_not_message_text() {
        let body = r#"{"error":{"code":400,"message":"quota mentioned but not exhausted","status":"INVALID_ARGUMENT"}}"#;
        let error = classify_failure(StatusCode::BAD_REQUEST, body);
        assert!(matches!(error, BackendError::GenerationFailed(_)));

        let body = r#"{"error":{"code":403,"message":"limit","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(classify_failure(StatusCode::FORBIDDEN, body).is_quota_exhausted());

        let error = classify_failure(StatusCode::UNAUTHORIZED, "bad key");
        assert!(matches!(error, BackendError::Unavailable(message) if message.contains("bad key")));
    }
}
