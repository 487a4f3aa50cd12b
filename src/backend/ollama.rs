use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

use super::{Backend, BackendError, BackendRequest, build_http_client};

pub(super) const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Backend issuing non-streaming `/api/generate` requests to a local Ollama runtime.
pub struct OllamaBackend {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaBackend {
    /// Create a backend for the given runtime URL and model.
    pub fn new(base_url: String, model: String) -> Result<Self, BackendError> {
        Ok(Self {
            http: build_http_client("tos-decoder/ollama")?,
            base_url,
            model,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl Backend for OllamaBackend {
    async fn invoke(&self, request: BackendRequest) -> Result<String, BackendError> {
        let payload = json!({
            "model": self.model,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                "temperature": 0.1,
                "num_predict": request.max_output_tokens,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                BackendError::Unavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::QuotaExhausted(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        if status == StatusCode::NOT_FOUND {
            return Err(BackendError::Unavailable(format!(
                "Ollama endpoint {} returned 404",
                self.endpoint()
            )));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            BackendError::InvalidResponse(format!("failed to decode Ollama response: {error}"))
        })?;

        if !body.done {
            return Err(BackendError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response.trim().to_string())
    }

    fn provider(&self) -> &'static str {
        "ollama"
    }
}
