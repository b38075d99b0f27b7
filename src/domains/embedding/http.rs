//! HTTP embedding provider.
//!
//! Two request shapes are spoken: Titan-style (`{"inputText": ...}`,
//! answered with `{"embedding": [...]}`) and OpenAI-style
//! (`{"model": ..., "input": ...}`, answered with
//! `{"data": [{"embedding": [...]}]}`).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument};

use super::{Embedder, EmbeddingError};
use crate::core::config::EmbeddingConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_ERROR_CHARS: usize = 200;

/// Wire format of the embedding endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingFormat {
    Titan,
    OpenAi,
}

impl EmbeddingFormat {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "titan" | "bedrock" => Some(Self::Titan),
            "openai" | "open_ai" => Some(Self::OpenAi),
            _ => None,
        }
    }

    /// Guess the format from a model id.
    pub fn for_model(model: &str) -> Self {
        if model.starts_with("amazon.titan") {
            Self::Titan
        } else {
            Self::OpenAi
        }
    }
}

/// Embedder backed by an HTTP endpoint.
#[derive(Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
    format: EmbeddingFormat,
}

impl HttpEmbedder {
    /// Build an embedder, or `None` when no endpoint is configured.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Option<Self>, EmbeddingError> {
        let Some(url) = config.url.clone() else {
            return Ok(None);
        };

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| EmbeddingError::request(e.to_string()))?;

        Ok(Some(Self {
            client,
            url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            format: config
                .format
                .unwrap_or_else(|| EmbeddingFormat::for_model(&config.model)),
        }))
    }

    fn request_body(&self, text: &str) -> Value {
        match self.format {
            EmbeddingFormat::Titan => json!({ "inputText": text }),
            EmbeddingFormat::OpenAi => json!({ "model": self.model, "input": text }),
        }
    }
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for HttpEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbedder")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("model", &self.model)
            .field("format", &self.format)
            .finish()
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    #[instrument(skip_all, fields(model = %self.model, chars = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut request = self.client.post(&self.url).json(&self.request_body(text));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| EmbeddingError::request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| EmbeddingError::invalid_response(e.to_string()))?;

        let vector = parse_embedding(&body)?;
        debug!("Received embedding with {} dimensions", vector.len());
        Ok(vector)
    }
}

/// Error for a failed status; the body may be JSON, HTML or empty.
fn status_error(status: reqwest::StatusCode, text: &str) -> EmbeddingError {
    let body: Option<Value> = serde_json::from_str(text).ok();
    let from_json = body.as_ref().and_then(|body| {
        body.get("error")
            .and_then(|e| e.get("message").or(Some(e)))
            .and_then(Value::as_str)
            .or_else(|| body.get("message").and_then(Value::as_str))
            .map(str::to_string)
    });

    let message = from_json.unwrap_or_else(|| {
        let text = text.trim();
        if text.is_empty() {
            "embedding provider returned an error".to_string()
        } else {
            text.chars().take(MAX_ERROR_CHARS).collect()
        }
    });
    EmbeddingError::request(format!("{}: {}", status, message))
}

fn parse_embedding(body: &Value) -> Result<Vec<f32>, EmbeddingError> {
    let raw = body
        .get("embedding")
        .or_else(|| body.pointer("/data/0/embedding"))
        .and_then(Value::as_array)
        .ok_or_else(|| EmbeddingError::invalid_response("no embedding array in response"))?;

    if raw.is_empty() {
        return Err(EmbeddingError::invalid_response("embedding is empty"));
    }

    raw.iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| EmbeddingError::invalid_response("embedding holds a non-number"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: Option<&str>, model: &str) -> EmbeddingConfig {
        EmbeddingConfig {
            url: url.map(str::to_string),
            api_key: None,
            model: model.to_string(),
            format: None,
        }
    }

    #[test]
    fn test_from_config_without_url() {
        let embedder = HttpEmbedder::from_config(&config(None, "m")).unwrap();
        assert!(embedder.is_none());
    }

    #[test]
    fn test_format_follows_model() {
        let titan = HttpEmbedder::from_config(&config(Some("http://localhost/e"), "amazon.titan-embed-text-v2:0"))
            .unwrap()
            .unwrap();
        assert_eq!(titan.request_body("hi"), json!({"inputText": "hi"}));

        let openai = HttpEmbedder::from_config(&config(Some("http://localhost/e"), "text-embedding-3-small"))
            .unwrap()
            .unwrap();
        assert_eq!(
            openai.request_body("hi"),
            json!({"model": "text-embedding-3-small", "input": "hi"})
        );
    }

    #[test]
    fn test_parse_embedding_shapes() {
        assert_eq!(
            parse_embedding(&json!({"embedding": [0.5, 1.0]})).unwrap(),
            vec![0.5, 1.0]
        );
        assert_eq!(
            parse_embedding(&json!({"data": [{"embedding": [0.25]}]})).unwrap(),
            vec![0.25]
        );
    }

    #[test]
    fn test_parse_embedding_rejects_bad_bodies() {
        assert!(parse_embedding(&json!({"vector": [1.0]})).is_err());
        assert!(parse_embedding(&json!({"embedding": []})).is_err());
        assert!(parse_embedding(&json!({"embedding": ["a"]})).is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut cfg = config(Some("http://localhost/e"), "text-embedding-3-small");
        cfg.api_key = Some("sk-live-secret".to_string());
        let embedder = HttpEmbedder::from_config(&cfg).unwrap().unwrap();

        let debug_str = format!("{:?}", embedder);
        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("sk-live-secret"));
    }

    #[test]
    fn test_status_error_keeps_status_for_any_body() {
        let html = "<html><body>502 Bad Gateway</body></html>";
        let err = status_error(reqwest::StatusCode::BAD_GATEWAY, html);
        let EmbeddingError::Request(message) = err else {
            panic!("expected a request error, got {:?}", err);
        };
        assert!(message.starts_with("502 Bad Gateway"));
        assert!(message.contains("<html>"));

        let err = status_error(
            reqwest::StatusCode::UNAUTHORIZED,
            r#"{"error": {"message": "invalid api key"}}"#,
        );
        assert_eq!(err, EmbeddingError::request("401 Unauthorized: invalid api key"));

        let err = status_error(reqwest::StatusCode::SERVICE_UNAVAILABLE, "");
        assert_eq!(
            err,
            EmbeddingError::request("503 Service Unavailable: embedding provider returned an error")
        );
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(EmbeddingFormat::parse("OpenAI"), Some(EmbeddingFormat::OpenAi));
        assert_eq!(EmbeddingFormat::parse("bedrock"), Some(EmbeddingFormat::Titan));
        assert_eq!(EmbeddingFormat::parse("other"), None);
    }
}
