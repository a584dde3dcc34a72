//! Ollama generation backend over its HTTP API (`/api/generate`, `/api/tags`).

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use erpqa_core::config::OllamaSettings;
use erpqa_core::error::GenerationError;
use erpqa_core::traits::Generator;

const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}

/// Extract the generated text from a non-streaming `/api/generate` body.
pub fn parse_generate_response(body: &str) -> Result<String, GenerationError> {
    let parsed: GenerateResponse = serde_json::from_str(body).map_err(|e| GenerationError::Malformed(e.to_string()))?;
    let text = parsed.response.ok_or_else(|| GenerationError::Malformed("missing `response` field".into()))?;
    if text.trim().is_empty() {
        return Err(GenerationError::EmptyResponse);
    }
    Ok(text)
}

/// Installed model names from a `/api/tags` body.
pub fn parse_tags(body: &str) -> Result<Vec<String>, GenerationError> {
    let parsed: TagsResponse = serde_json::from_str(body).map_err(|e| GenerationError::Malformed(e.to_string()))?;
    Ok(parsed.models.into_iter().map(|m| m.name).collect())
}

/// `llama3.2` is satisfied by `llama3.2` or any tag of it such as `llama3.2:latest`.
pub fn model_matches(installed: &str, wanted: &str) -> bool {
    installed == wanted || installed.strip_prefix(wanted).is_some_and(|rest| rest.starts_with(':'))
}

pub struct OllamaGenerator {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    name: String,
}

impl OllamaGenerator {
    pub fn new(settings: &OllamaSettings) -> Result<Self, GenerationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| GenerationError::Unavailable(e.to_string()))?;
        info!("Using Ollama model {} at {}", settings.model, settings.base_url);
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            name: format!("ollama:{}", settings.model),
        })
    }

    pub fn model(&self) -> &str { &self.model }
    pub fn base_url(&self) -> &str { &self.base_url }

    pub fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .map_err(|e| GenerationError::Unavailable(e.to_string()))?;
        parse_tags(&read_body(response)?)
    }

    /// Reachability check; succeeds when the server answers `/api/tags`.
    pub fn health_check(&self) -> Result<(), GenerationError> {
        self.list_models().map(|_| ())
    }

    pub fn has_model(&self) -> Result<bool, GenerationError> {
        Ok(self.list_models()?.iter().any(|m| model_matches(m, &self.model)))
    }
}

fn read_body(response: reqwest::blocking::Response) -> Result<String, GenerationError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().unwrap_or_default();
        return Err(GenerationError::Status { status: status.as_u16(), body });
    }
    response.text().map_err(|e| GenerationError::Malformed(e.to_string()))
}

impl Generator for OllamaGenerator {
    fn name(&self) -> &str { &self.name }

    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions { temperature: self.temperature, num_predict: self.max_tokens },
        };
        debug!("Generating with {} ({} prompt chars)", self.model, prompt.len());
        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&request)
            .send()
            .map_err(|e| GenerationError::Unavailable(e.to_string()))?;
        parse_generate_response(&read_body(response)?)
    }
}
