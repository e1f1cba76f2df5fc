use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::utils::error::ChatError;

/// Reply used when the backend answers without a `response` field.
pub const EMPTY_RESPONSE_FALLBACK: &str = "Sorry, I could not generate a response.";

/// Result of one generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    Completed(String),
    /// Backend unreachable or answered with a non-success status.
    Unavailable(String),
    Timeout { after_secs: u64 },
}

impl GenerationOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self, GenerationOutcome::Completed(_))
    }

    /// Text shown to the user and stored as the assistant turn. Failures
    /// become `"Error: ..."` messages.
    pub fn into_reply(self) -> String {
        match self {
            GenerationOutcome::Completed(text) => text,
            GenerationOutcome::Unavailable(reason) => format!("Error: {}", reason),
            GenerationOutcome::Timeout { after_secs } => format!(
                "Error: Connection to LLM failed - request timed out after {}s",
                after_secs
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BackendHealth {
    pub available: bool,
    pub model_present: bool,
}

/// Black-box text completion service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Probe the backend. Never fails; problems are logged and reported as
    /// flags.
    async fn health_check(&self) -> BackendHealth;

    async fn generate(&self, prompt: &str) -> GenerationOutcome;
}

/// Build the completion prompt from rendered history and the new message.
pub fn format_prompt(context: &str, message: &str) -> String {
    if context.is_empty() {
        format!("Human: {}\n\nAssistant:", message)
    } else {
        format!("{}\n\nHuman: {}\n\nAssistant:", context, message)
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
    pub options: GenerateOptions,
}

#[derive(Debug, Serialize)]
pub struct GenerateOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// [`GenerationBackend`] for an Ollama-compatible HTTP API
/// (`GET /api/tags`, `POST /api/generate`).
#[derive(Clone)]
pub struct OllamaGateway {
    client: Client,
    base_url: String,
    config: LlmConfig,
}

impl OllamaGateway {
    pub fn new(config: &LlmConfig) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| ChatError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_request<'a>(&'a self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
            },
        }
    }
}

#[async_trait]
impl GenerationBackend for OllamaGateway {
    async fn health_check(&self) -> BackendHealth {
        let response = match self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!("LLM connection check failed: {}", e);
                return BackendHealth {
                    available: false,
                    model_present: false,
                };
            }
        };

        if !response.status().is_success() {
            warn!(
                "Could not connect to LLM backend (status: {})",
                response.status()
            );
            return BackendHealth {
                available: false,
                model_present: false,
            };
        }

        let models: Vec<String> = match response.json::<TagsResponse>().await {
            Ok(tags) => tags.models.into_iter().map(|m| m.name).collect(),
            Err(e) => {
                warn!("Unreadable model list from LLM backend: {}", e);
                Vec::new()
            }
        };

        let model_present = models.iter().any(|name| name == &self.config.model);
        if model_present {
            info!("LLM backend connected, using model {}", self.config.model);
        } else {
            warn!(
                "Model {} not found. Available models: {:?}",
                self.config.model, models
            );
        }

        BackendHealth {
            available: true,
            model_present,
        }
    }

    async fn generate(&self, prompt: &str) -> GenerationOutcome {
        debug!("Generating reply, prompt length {}", prompt.len());

        let result = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&self.build_request(prompt))
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!("LLM request timed out after {}s", self.config.timeout_seconds);
                return GenerationOutcome::Timeout {
                    after_secs: self.config.timeout_seconds,
                };
            }
            Err(e) => {
                warn!("LLM request failed: {}", e);
                return GenerationOutcome::Unavailable(format!(
                    "Connection to LLM failed - {}",
                    e
                ));
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("LLM backend returned status {}", status);
            return GenerationOutcome::Unavailable(format!(
                "Could not connect to LLM (Status: {})",
                status.as_u16()
            ));
        }

        match response.json::<GenerateResponse>().await {
            Ok(body) => GenerationOutcome::Completed(
                body.response
                    .unwrap_or_else(|| EMPTY_RESPONSE_FALLBACK.to_string()),
            ),
            Err(e) if e.is_timeout() => GenerationOutcome::Timeout {
                after_secs: self.config.timeout_seconds,
            },
            Err(e) => {
                warn!("Failed to parse LLM response: {}", e);
                GenerationOutcome::Unavailable(format!("Connection to LLM failed - {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(base_url: &str) -> LlmConfig {
        LlmConfig {
            base_url: base_url.to_string(),
            model: "llama2:7b-chat".to_string(),
            timeout_seconds: 30,
            temperature: 0.7,
            max_tokens: 500,
        }
    }

    #[test]
    fn test_prompt_without_context() {
        assert_eq!(format_prompt("", "Hello"), "Human: Hello\n\nAssistant:");
    }

    #[test]
    fn test_prompt_with_context() {
        assert_eq!(
            format_prompt("Human: Hi\nAssistant: Hey", "How are you?"),
            "Human: Hi\nAssistant: Hey\n\nHuman: How are you?\n\nAssistant:"
        );
    }

    #[test]
    fn test_request_serialization() {
        let gateway = OllamaGateway::new(&config("http://localhost:11434")).unwrap();
        let value = serde_json::to_value(gateway.build_request("Human: hi")).unwrap();

        assert_eq!(value["model"], "llama2:7b-chat");
        assert_eq!(value["stream"], false);
        assert_eq!(value["options"]["max_tokens"], 500);
        assert!((value["options"]["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let gateway = OllamaGateway::new(&config("http://myserver:11434/")).unwrap();
        assert_eq!(gateway.base_url(), "http://myserver:11434");
    }

    #[test]
    fn test_failure_outcomes_render_as_error_text() {
        let unavailable =
            GenerationOutcome::Unavailable("Could not connect to LLM (Status: 500)".to_string());
        assert!(unavailable.is_failure());
        assert_eq!(
            unavailable.into_reply(),
            "Error: Could not connect to LLM (Status: 500)"
        );

        let timeout = GenerationOutcome::Timeout { after_secs: 30 };
        assert!(timeout.into_reply().starts_with("Error:"));

        let ok = GenerationOutcome::Completed("fine".to_string());
        assert!(!ok.is_failure());
        assert_eq!(ok.into_reply(), "fine");
    }

    #[tokio::test]
    async fn test_generate_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({
                "model": "llama2:7b-chat",
                "prompt": "Human: Test prompt\n\nAssistant:",
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "response": "Test response"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let gateway = OllamaGateway::new(&config(&server.uri())).unwrap();
        let outcome = gateway.generate(&format_prompt("", "Test prompt")).await;

        assert_eq!(outcome, GenerationOutcome::Completed("Test response".to_string()));
    }

    #[tokio::test]
    async fn test_generate_missing_response_uses_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "done": true })))
            .mount(&server)
            .await;

        let gateway = OllamaGateway::new(&config(&server.uri())).unwrap();
        let outcome = gateway.generate("Human: hi\n\nAssistant:").await;

        assert_eq!(
            outcome,
            GenerationOutcome::Completed(EMPTY_RESPONSE_FALLBACK.to_string())
        );
    }

    #[tokio::test]
    async fn test_generate_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let gateway = OllamaGateway::new(&config(&server.uri())).unwrap();
        let reply = gateway.generate("Human: hi\n\nAssistant:").await.into_reply();

        assert_eq!(reply, "Error: Could not connect to LLM (Status: 500)");
    }

    #[tokio::test]
    async fn test_generate_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "response": "too late" }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let mut cfg = config(&server.uri());
        cfg.timeout_seconds = 1;
        let gateway = OllamaGateway::new(&cfg).unwrap();

        let outcome = gateway.generate("Human: hi\n\nAssistant:").await;
        assert_eq!(outcome, GenerationOutcome::Timeout { after_secs: 1 });
    }

    #[tokio::test]
    async fn test_generate_unreachable_backend() {
        // Nothing listens on port 9 (discard) in test environments
        let gateway = OllamaGateway::new(&config("http://127.0.0.1:9")).unwrap();
        let outcome = gateway.generate("Human: hi\n\nAssistant:").await;

        assert!(outcome.is_failure());
        assert!(outcome.into_reply().starts_with("Error: Connection to LLM failed"));
    }

    #[tokio::test]
    async fn test_health_check_model_present() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{ "name": "mistral" }, { "name": "llama2:7b-chat" }]
            })))
            .mount(&server)
            .await;

        let gateway = OllamaGateway::new(&config(&server.uri())).unwrap();
        let health = gateway.health_check().await;

        assert_eq!(
            health,
            BackendHealth {
                available: true,
                model_present: true
            }
        );
    }

    #[tokio::test]
    async fn test_health_check_model_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [{ "name": "mistral" }]
            })))
            .mount(&server)
            .await;

        let gateway = OllamaGateway::new(&config(&server.uri())).unwrap();
        let health = gateway.health_check().await;

        assert!(health.available);
        assert!(!health.model_present);
    }

    #[tokio::test]
    async fn test_health_check_unavailable_does_not_fail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let gateway = OllamaGateway::new(&config(&server.uri())).unwrap();
        let health = gateway.health_check().await;

        assert!(!health.available);
        assert!(!health.model_present);
    }
}
