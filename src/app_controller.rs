use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::sync::Arc;

use crate::app_config::Config;
use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::key_pool::load_keys;
use crate::providers::gemini::Gemini;
use crate::providers::Transport;
use crate::translation::pipeline::{ModelPair, Orchestrator, RunOptions, RunSummary};
use crate::translation::prompts::PayloadBuilder;
use crate::translation::quality::QualityGate;

// @module: Application controller wiring configuration into a run

/// Inputs of one run that do not live in the config file
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub options: RunOptions,
    /// Key file overriding `keys.keys_file`
    pub keys_file: Option<PathBuf>,
    /// Comma-delimited keys overriding the environment variable
    pub keys: Option<String>,
    /// File holding the system prompt
    pub system_prompt_file: Option<PathBuf>,
}

impl RunRequest {
    pub fn new(options: RunOptions) -> Self {
        Self {
            options,
            keys_file: None,
            keys: None,
            system_prompt_file: None,
        }
    }
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
    // @field: Draw the progress line
    show_progress: bool,
}

impl Controller {
    /// Create a controller for test purposes with default configuration
    pub fn new_for_test() -> Result<Self> {
        Ok(Self::with_config(Config::default())?.with_progress(false))
    }

    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate().context("Configuration validation failed")?;
        Ok(Self {
            config,
            show_progress: true,
        })
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run against the remote API
    pub async fn run(&self, request: RunRequest) -> Result<RunSummary> {
        let api = &self.config.api;
        let client = Gemini::new(api.endpoint.clone(), api.timeout()).map_err(AppError::from)?;
        self.run_with_transport(Arc::new(client), request).await
    }

    /// Run with any transport; tests pass a scripted one
    pub async fn run_with_transport(
        &self,
        transport: Arc<dyn Transport>,
        request: RunRequest,
    ) -> Result<RunSummary> {
        let options = &request.options;

        if !FileManager::dir_exists(&options.input_dir) {
            return Err(AppError::MissingInput(options.input_dir.display().to_string()).into());
        }

        let keys = self.resolve_keys(&request)?;
        let system_prompt = self.load_system_prompt(&request)?;

        if options.task.uses_glossary() && options.glossary_dir.is_none() {
            info!("No glossary folder given, translating without name lists");
        }

        let api = &self.config.api;
        info!(
            "Starting task {} on {:?} with {} keys (model {} / fallback {})",
            options.task,
            options.input_dir,
            keys.len(),
            api.primary_model,
            api.fallback_model
        );

        let orchestrator = Orchestrator::new(
            transport,
            keys,
            ModelPair::new(api.primary_model.clone(), api.fallback_model.clone()),
        )
        .with_builder(PayloadBuilder::new(system_prompt, api.temperature))
        .with_policy(self.config.retry.clone())
        .with_gate(QualityGate::new(self.config.quality.cjk_threshold))
        .with_progress(self.show_progress);

        let summary = orchestrator.run(options).await?;
        Self::log_summary(&summary);
        Ok(summary)
    }

    /// Keys from the file and the comma list; CLI values win over config
    fn resolve_keys(&self, request: &RunRequest) -> Result<Vec<String>> {
        let keys_file = request
            .keys_file
            .clone()
            .or_else(|| self.config.keys.keys_file.clone());

        let env_name = &self.config.keys.keys_env;
        let list = request
            .keys
            .clone()
            .or_else(|| std::env::var(env_name).ok());

        let keys = load_keys(keys_file.as_deref(), list.as_deref())?;
        if keys.is_empty() {
            let sources = match &keys_file {
                Some(path) => format!("{:?} and ${}", path, env_name),
                None => format!("${}", env_name),
            };
            return Err(AppError::NoKeys(sources).into());
        }

        debug!("Loaded {} keys", keys.len());
        Ok(keys)
    }

    /// System prompt text; a named but missing file is an error
    fn load_system_prompt(&self, request: &RunRequest) -> Result<Option<String>> {
        let Some(path) = &request.system_prompt_file else {
            if request.options.task.needs_system_prompt() {
                warn!("Task {} usually relies on a system prompt", request.options.task);
            }
            return Ok(None);
        };

        if !FileManager::file_exists(path) {
            let message = format!("System prompt file does not exist: {:?}", path);
            return Err(AppError::Config(message).into());
        }

        let prompt = FileManager::read_to_string(path)
            .with_context(|| format!("Failed to read system prompt: {:?}", path))?;
        Ok(Some(prompt))
    }

    fn log_summary(summary: &RunSummary) {
        if summary.total == 0 {
            return;
        }
        let line = format!(
            "Finished {} files in {:.1}s: {} done, {} with warnings, {} failed, {} skipped, {} keys disabled",
            summary.total,
            summary.elapsed.as_secs_f64(),
            summary.succeeded,
            summary.warned,
            summary.failed,
            summary.skipped,
            summary.disabled_keys
        );
        if summary.failed > 0 || summary.completed() < summary.total {
            warn!("{}", line);
        } else {
            info!("{}", line);
        }
    }
}
