/*!
 * Transport layer for the remote generation API.
 *
 * - `gemini`: HTTP client for the `generateContent` endpoint
 * - `mock`: scripted transport for tests
 *
 * One `send` call is exactly one attempt. Nothing here retries; the outcome
 * is returned as a tagged value so the worker can classify it with a single
 * match.
 */

use async_trait::async_trait;
use std::fmt::Debug;

pub mod gemini;
pub mod mock;

pub use gemini::{Content, GenerateRequest, GenerationConfig, Part};

/// Result of one request attempt
#[derive(Debug, Clone, PartialEq)]
pub enum TransportOutcome {
    /// The first text candidate of the response
    Text(String),
    /// The call succeeded but carried no usable text
    Empty,
    /// The server answered with status >= 400
    HttpError {
        /// HTTP status code
        status: u16,
        /// Response body, truncated
        message: String,
    },
    /// Timeout, connection failure or an unreadable body
    NetworkFault(String),
}

impl TransportOutcome {
    /// Build a text outcome, folding blank strings into `Empty`
    pub fn from_text(text: Option<String>) -> Self {
        match text {
            Some(text) if !text.is_empty() => Self::Text(text),
            _ => Self::Empty,
        }
    }
}

/// A single-attempt request sender bound to no particular key
///
/// The key travels with each call so one transport can serve every worker.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Send `request` to `model` authenticated with `key`
    async fn send(&self, key: &str, request: &GenerateRequest, model: &str) -> TransportOutcome;
}
