use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::types::{Oracle, OracleErrorKind, OracleRequest, OracleResponse};
use super::OracleError;

/// Ollama HTTP client for local text generation.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl OllamaClient {
    /// Create a client for `model` on the Ollama instance at `base_url`.
    /// `timeout_secs` bounds every call; an elapsed call is reported as a timeout.
    pub fn new(base_url: &str, model: &str, timeout_secs: u64) -> Result<Self, OracleError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OracleError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client,
            timeout_secs,
        })
    }

    /// Default Ollama instance at localhost:11434 with a 2-minute timeout.
    pub fn default_local(model: &str) -> Result<Self, OracleError> {
        Self::new("http://localhost:11434", model, 120)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn list_models(&self) -> Result<Vec<String>, OracleError> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OracleError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaTagsResponse = response
            .json()
            .map_err(|e| OracleError::ResponseParsing(e.to_string()))?;

        Ok(parsed.models.into_iter().map(|m| m.name).collect())
    }

    pub fn is_model_available(&self) -> Result<bool, OracleError> {
        let models = self.list_models()?;
        Ok(models.iter().any(|m| m.starts_with(&self.model)))
    }

    fn generate(&self, request: &OracleRequest) -> Result<String, OracleError> {
        let url = format!("{}/api/generate", self.base_url);
        let body = OllamaGenerateRequest {
            model: &self.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            stream: false,
            options: OllamaOptions {
                temperature: request.params.temperature,
                num_predict: request.params.max_output_tokens,
                top_k: request.params.top_k,
                top_p: request.params.top_p,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OracleError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: OllamaGenerateResponse = response.json().map_err(|e| {
            if e.is_timeout() {
                OracleError::Timeout(self.timeout_secs)
            } else {
                OracleError::ResponseParsing(e.to_string())
            }
        })?;

        Ok(parsed.response)
    }

    fn map_transport(&self, e: reqwest::Error) -> OracleError {
        if e.is_timeout() {
            OracleError::Timeout(self.timeout_secs)
        } else if e.is_connect() {
            OracleError::Connection(self.base_url.clone())
        } else {
            OracleError::HttpClient(e.to_string())
        }
    }
}

impl Oracle for OllamaClient {
    fn invoke(&self, request: &OracleRequest) -> OracleResponse {
        let result = self.generate(request);
        if let Err(e) = &result {
            tracing::debug!(model = %self.model, error = %e, "Ollama generate failed");
        }
        result.into()
    }
}

/// Request body for Ollama /api/generate
#[derive(Serialize)]
struct OllamaGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

/// Response body from Ollama /api/generate
#[derive(Deserialize)]
struct OllamaGenerateResponse {
    response: String,
}

/// Response body from Ollama /api/tags
#[derive(Deserialize)]
struct OllamaTagsResponse {
    models: Vec<OllamaModel>,
}

#[derive(Deserialize)]
struct OllamaModel {
    name: String,
}

/// Test double that replays scripted responses in call order.
///
/// Once the script is exhausted every call fails with `Unavailable`.
/// Received prompts are kept for assertions.
#[derive(Default)]
pub struct ScriptedOracle {
    script: Mutex<VecDeque<OracleResponse>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(responses: Vec<OracleResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Every call succeeds with the given texts, in order.
    pub fn with_texts<S: Into<String>>(texts: impl IntoIterator<Item = S>) -> Self {
        Self::new(texts.into_iter().map(OracleResponse::success).collect())
    }

    pub fn call_count(&self) -> usize {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl Oracle for ScriptedOracle {
    fn invoke(&self, request: &OracleRequest) -> OracleResponse {
        self.prompts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.prompt.clone());
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| {
                OracleResponse::failure(OracleErrorKind::Unavailable, "script exhausted")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::oracle::types::{GenerationParams, ResponseShape};

    fn request(prompt: &str) -> OracleRequest {
        OracleRequest {
            prompt: prompt.to_string(),
            system: None,
            params: GenerationParams::default(),
            shape: ResponseShape::SingleUnit,
        }
    }

    #[test]
    fn scripted_oracle_replays_in_order() {
        let oracle = ScriptedOracle::with_texts(["first", "second"]);
        assert_eq!(oracle.invoke(&request("a")).text, "first");
        assert_eq!(oracle.invoke(&request("b")).text, "second");
        assert_eq!(oracle.prompts(), vec!["a", "b"]);
    }

    #[test]
    fn scripted_oracle_fails_when_exhausted() {
        let oracle = ScriptedOracle::with_texts(Vec::<String>::new());
        let response = oracle.invoke(&request("a"));
        assert!(!response.is_success());
        assert_eq!(response.error_kind, Some(OracleErrorKind::Unavailable));
        assert_eq!(oracle.call_count(), 1);
    }

    #[test]
    fn ollama_client_constructor() {
        let client = OllamaClient::new("http://localhost:11434", "flan-t5", 90).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
        assert_eq!(client.model(), "flan-t5");
        assert_eq!(client.timeout_secs, 90);
    }

    #[test]
    fn ollama_client_trims_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/", "llama3", 60).unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn default_local_uses_standard_port() {
        let client = OllamaClient::default_local("llama3").unwrap();
        assert_eq!(client.base_url, "http://localhost:11434");
    }

    #[test]
    fn unreachable_service_is_reported_not_raised() {
        // Port 9 (discard) is closed on test hosts; the call must come back as a failure.
        let client = OllamaClient::new("http://127.0.0.1:9", "llama3", 2).unwrap();
        let response = client.invoke(&request("Note: water boils at 100C"));
        assert!(!response.is_success());
        assert!(response.error_message.is_some());
    }

    #[test]
    fn generate_body_carries_sampling_options() {
        let body = OllamaGenerateRequest {
            model: "llama3",
            prompt: "p",
            system: None,
            stream: false,
            options: OllamaOptions {
                temperature: 0.7,
                num_predict: 64,
                top_k: Some(50),
                top_p: None,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["options"]["num_predict"], 64);
        assert_eq!(json["options"]["top_k"], 50);
        assert!(json["options"].get("top_p").is_none());
        assert!(json.get("system").is_none());
        assert_eq!(json["stream"], false);
    }
}
