/*!
 * Error types for the segtrans application.
 *
 * Classified transport failures (rate limits, HTTP errors, network faults)
 * are not errors here: they travel as `TransportOutcome` values and are
 * absorbed by the worker state machine. These types cover the failures that
 * do abort something: building a client, loading configuration or keys, and
 * validating the run inputs.
 */

use thiserror::Error;

/// Errors that can occur when setting up a provider client
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Configuration is missing or inconsistent
    #[error("Configuration error: {0}")]
    Config(String),

    /// No usable API key was found
    #[error("No API keys available (checked {0})")]
    NoKeys(String),

    /// Input directory is missing or not a directory
    #[error("Input folder does not exist: {0}")]
    MissingInput(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
