/*!
 * Gemini `generateContent` client.
 *
 * Request and response bodies for the REST endpoint plus the `Transport`
 * implementation. The client stays silent: status, body and parse failures
 * are carried in the returned outcome and reported by the worker.
 */

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::errors::ProviderError;

use super::{Transport, TransportOutcome};

/// Longest error body kept in an outcome
const MAX_ERROR_BODY: usize = 200;

/// Client for the `models/{model}:generateContent` endpoint
#[derive(Debug, Clone)]
pub struct Gemini {
    /// HTTP client for API requests
    client: Client,
    /// Base URL, e.g. `https://generativelanguage.googleapis.com/v1beta`
    endpoint: String,
}

/// Request body
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Conversation turns; this pipeline always sends one user turn
    pub contents: Vec<Content>,

    /// Sampling settings
    pub generation_config: GenerationConfig,

    /// System prompt for models that accept one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Content>,
}

/// One content block made of text parts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Content {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub role: Option<String>,

    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A text part
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Part {
    pub text: String,
}

/// Sampling settings
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
}

impl Content {
    /// Role-less content with a single text part
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            role: None,
            parts: vec![Part { text: text.into() }],
        }
    }

    /// System-role content with a single text part
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Some("system".to_string()),
            parts: vec![Part { text: text.into() }],
        }
    }
}

impl GenerateRequest {
    /// Single user turn with the given temperature
    pub fn new(user_prompt: impl Into<String>, temperature: f32) -> Self {
        Self {
            contents: vec![Content::text(user_prompt)],
            generation_config: GenerationConfig { temperature },
            system_instruction: None,
        }
    }

    /// Attach a system instruction
    pub fn system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_instruction = Some(Content::system(system_prompt));
        self
    }

    /// Text of the user turn
    pub fn user_text(&self) -> String {
        self.contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .map(|p| p.text.as_str())
            .collect()
    }
}

impl Gemini {
    /// Create a new client with a fixed request timeout
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Full URL for a model
    pub fn url_for_model(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            model
        )
    }

    /// First text part of the first candidate that has one
    ///
    /// Returns `None` when the response does not have the expected shape.
    pub fn extract_text(response: &Value) -> Option<String> {
        response
            .get("candidates")?
            .as_array()?
            .iter()
            .filter_map(|candidate| candidate.get("content")?.get("parts")?.as_array())
            .flatten()
            .find_map(|part| part.get("text")?.as_str().map(str::to_string))
    }
}

#[async_trait]
impl Transport for Gemini {
    async fn send(&self, key: &str, request: &GenerateRequest, model: &str) -> TransportOutcome {
        let url = self.url_for_model(model);

        let response = match self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", key)
            .json(request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return TransportOutcome::NetworkFault(e.to_string()),
        };

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            let message: String = body.chars().take(MAX_ERROR_BODY).collect();
            return TransportOutcome::HttpError {
                status: status.as_u16(),
                message,
            };
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return TransportOutcome::NetworkFault(e.to_string()),
        };

        match serde_json::from_str::<Value>(&body) {
            Ok(value) => TransportOutcome::from_text(Self::extract_text(&value)),
            // A body that is not JSON carries no usable text
            Err(_) => TransportOutcome::Empty,
        }
    }
}
