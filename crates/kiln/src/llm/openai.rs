//! OpenAI chat completions inferrer.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;

use crate::error::{KilnError, Result};
use crate::validation::ValidationRecord;

use super::prompts;
use super::provider::{FieldInferrer, Inference, InferenceConfig};

/// Infers field types with an OpenAI GPT model.
pub struct OpenAiInferrer {
    client: Client,
    api_key: String,
    config: InferenceConfig,
}

impl OpenAiInferrer {
    /// Create a new inferrer with the given API key.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, InferenceConfig::default())
    }

    /// Create a new inferrer with custom configuration.
    pub fn with_config(api_key: impl Into<String>, config: InferenceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| KilnError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            config,
        })
    }

    /// Create from the `OPENAI_API_KEY` environment variable.
    pub fn from_env(config: InferenceConfig) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| {
            KilnError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;
        Self::with_config(api_key, config)
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    fn build_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|e| KilnError::Config(format!("Invalid API key: {}", e)))?,
        );
        Ok(headers)
    }

    /// Send a message to the chat completions endpoint.
    fn send_message(&self, user_prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "response_format": {"type": "json_object"},
            "messages": [
                {
                    "role": "system",
                    "content": prompts::system_prompt()
                },
                {
                    "role": "user",
                    "content": user_prompt
                }
            ]
        });

        let response = self
            .client
            .post(&self.config.api_url)
            .headers(self.build_headers()?)
            .json(&body)
            .send()
            .map_err(|e| KilnError::Config(format!("API request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(KilnError::Config(format!(
                "OpenAI API error ({}): {}",
                status, error_text
            )));
        }

        let api_response: OpenAiResponse = response
            .json()
            .map_err(|e| KilnError::Config(format!("Failed to parse API response: {}", e)))?;

        api_response
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| KilnError::Config("No response from OpenAI".to_string()))
    }
}

impl FieldInferrer for OpenAiInferrer {
    fn infer(&self, record: &ValidationRecord) -> Result<Inference> {
        let prompt = prompts::field_inference_prompt(record);
        let response = self.send_message(&prompt)?;
        let mut inference: Inference = parse_json_response(&response)?;
        inference.field_type = inference.field_type.trim().to_lowercase();
        inference.variable_name = inference
            .variable_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        Ok(inference)
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Parse JSON from an LLM response, handling markdown code blocks.
fn parse_json_response<T: for<'de> Deserialize<'de>>(response: &str) -> Result<T> {
    let json_str = if response.contains("```json") {
        response
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .unwrap_or(response)
    } else if response.contains("```") {
        response
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .unwrap_or(response)
    } else {
        response.trim()
    };

    serde_json::from_str(json_str)
        .map_err(|e| KilnError::Config(format!("Failed to parse LLM JSON response: {}", e)))
}

/// OpenAI API response structure.
#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_fenced_response() {
        let response = "Here you go:\n```json\n{\"field_type\": \"radio\", \"configuration\": {\"choices\": []}}\n```";
        let inference: Inference = parse_json_response(response).unwrap();
        assert_eq!(inference.field_type, "radio");
        assert_eq!(inference.configuration, json!({"choices": []}));
    }

    #[test]
    fn test_parse_bare_response() {
        let inference: Inference =
            parse_json_response("  {\"field_type\": \"notes\", \"variable_name\": \"q_2\"} ").unwrap();
        assert_eq!(inference.variable_name.as_deref(), Some("q_2"));
    }

    #[test]
    fn test_parse_garbage_is_config_error() {
        let err = parse_json_response::<Inference>("I think it is a radio").unwrap_err();
        assert!(matches!(err, KilnError::Config(_)));
    }

    #[test]
    fn test_new_does_not_touch_network() {
        let inferrer = OpenAiInferrer::new("sk-test").unwrap();
        assert_eq!(inferrer.name(), "openai");
        assert_eq!(inferrer.config().model, "gpt-4o");
    }
}
