/*!
 * # segtrans - concurrent segment translator
 *
 * A Rust library for translating directories of numbered text segments
 * through a remote generation API, spread over a pool of API keys.
 *
 * ## Features
 *
 * - One worker per key, all draining one shared queue
 * - Per-job retries with a primary/fallback model switch
 * - Key rotation after repeated rate limiting, with permanent disabling
 * - Residual-ideograph detection with bounded re-translation
 * - Resumable runs: finished outputs are never queued again
 * - In-place repair of glossaries and translations line by line
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `app_controller`: Wires configuration, keys and the transport into a run
 * - `key_pool`: Shared key registry with checkout and disabling
 * - `translation`: Job scanning, prompts, quality gate and the worker pipeline
 * - `providers`: The transport trait, the HTTP client and a scripted double
 * - `file_utils`: File system operations
 * - `errors`: Custom error types for the application
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod file_utils;
pub mod key_pool;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{AppError, ProviderError};
pub use key_pool::KeyPool;
pub use providers::{Transport, TransportOutcome};
pub use translation::{Orchestrator, RunOptions, RunSummary, TaskKind};
