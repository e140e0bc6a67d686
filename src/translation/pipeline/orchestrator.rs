/*!
 * Run orchestrator.
 *
 * Builds the job queue, sizes the worker set from the key count, spawns one
 * task per worker and folds their reports into a run summary. Workers share
 * nothing but the queue, the key pool and the progress tracker.
 */

use anyhow::Result;
use futures::future::join_all;
use log::{error, info, warn, Level};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::RetryPolicy;
use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::key_pool::KeyPool;
use crate::providers::Transport;
use crate::translation::jobs::{JobQueue, SegmentRange};
use crate::translation::progress::ProgressTracker;
use crate::translation::prompts::PayloadBuilder;
use crate::translation::quality::QualityGate;
use crate::translation::task::TaskKind;

use super::attempt::ModelPair;
use super::worker::{Worker, WorkerReport, WorkerShared};

/// What to process in one run
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub task: TaskKind,
    pub input_dir: PathBuf,
    /// Output directory; ignored by in-place tasks
    pub output_dir: Option<PathBuf>,
    pub glossary_dir: Option<PathBuf>,
    pub range: SegmentRange,
    /// Requested worker count; capped by the number of keys
    pub max_workers: Option<usize>,
}

impl RunOptions {
    pub fn new(task: TaskKind, input_dir: impl Into<PathBuf>) -> Self {
        Self {
            task,
            input_dir: input_dir.into(),
            output_dir: None,
            glossary_dir: None,
            range: SegmentRange::default(),
            max_workers: None,
        }
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn glossary_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.glossary_dir = Some(dir.into());
        self
    }

    pub fn range(mut self, range: SegmentRange) -> Self {
        self.range = range;
        self
    }

    pub fn max_workers(mut self, workers: usize) -> Self {
        self.max_workers = Some(workers);
        self
    }

    /// Directory outputs land in; segment tasks need an explicit one
    fn resolved_output_dir(&self) -> Result<PathBuf, AppError> {
        if self.task.is_line_fix() {
            return Ok(self.input_dir.clone());
        }
        self.output_dir.clone().ok_or_else(|| {
            AppError::Config(format!("task {} needs an output folder", self.task))
        })
    }
}

/// Totals for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Jobs queued
    pub total: usize,
    /// Files left out at scan time
    pub skipped: usize,
    pub succeeded: usize,
    pub warned: usize,
    pub failed: usize,
    /// Completions counted by the progress tracker
    pub progress_completed: usize,
    /// Workers started
    pub workers: usize,
    pub disabled_keys: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    /// Jobs that reached any terminal outcome
    pub fn completed(&self) -> usize {
        self.succeeded + self.warned + self.failed
    }

    fn absorb(&mut self, report: &WorkerReport) {
        self.succeeded += report.succeeded;
        self.warned += report.warned;
        self.failed += report.failed;
        self.disabled_keys += report.keys_disabled;
    }
}

/// Number of workers for a run: the request, capped by the key count, at least one
pub fn worker_count(requested: Option<usize>, keys: usize) -> usize {
    if keys == 0 {
        return 0;
    }
    requested.unwrap_or(keys).clamp(1, keys)
}

/// Coordinates one run over a directory
#[derive(Debug)]
pub struct Orchestrator {
    transport: Arc<dyn Transport>,
    keys: Vec<String>,
    builder: PayloadBuilder,
    models: ModelPair,
    policy: RetryPolicy,
    gate: QualityGate,
    show_progress: bool,
}

impl Orchestrator {
    pub fn new(transport: Arc<dyn Transport>, keys: Vec<String>, models: ModelPair) -> Self {
        Self {
            transport,
            keys,
            builder: PayloadBuilder::default(),
            models,
            policy: RetryPolicy::default(),
            gate: QualityGate::default(),
            show_progress: true,
        }
    }

    pub fn with_builder(mut self, builder: PayloadBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_gate(mut self, gate: QualityGate) -> Self {
        self.gate = gate;
        self
    }

    /// Draw the progress line on stderr; off in tests
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Process every pending file in `options.input_dir`
    pub async fn run(&self, options: &RunOptions) -> Result<RunSummary> {
        let started = Instant::now();

        if !FileManager::dir_exists(&options.input_dir) {
            return Err(AppError::MissingInput(options.input_dir.display().to_string()).into());
        }

        let pool = Arc::new(KeyPool::new(self.keys.iter().cloned()));
        let key_count = pool.available_count();
        if key_count == 0 {
            return Err(AppError::NoKeys("configured key sources".to_string()).into());
        }

        let output_dir = options.resolved_output_dir()?;
        let scan = if options.task.is_line_fix() {
            JobQueue::scan_in_place(&options.input_dir, options.range)?
        } else {
            FileManager::ensure_dir(&output_dir)?;
            JobQueue::scan(&options.input_dir, &output_dir, options.range)?
        };

        let total = scan.queue.len();
        let mut summary = RunSummary {
            total,
            skipped: scan.skipped,
            ..Default::default()
        };

        if scan.queue.is_empty() {
            info!(
                "Nothing to do for task {} in {:?} ({} files skipped)",
                options.task, options.input_dir, scan.skipped
            );
            summary.elapsed = started.elapsed();
            return Ok(summary);
        }

        let workers = worker_count(options.max_workers, key_count);
        info!(
            "Task {}: {} files queued, {} skipped, {} workers over {} keys",
            options.task, total, scan.skipped, workers, key_count
        );

        let progress = Arc::new(if self.show_progress {
            ProgressTracker::new(total)
        } else {
            ProgressTracker::hidden(total)
        });

        let shared = Arc::new(WorkerShared {
            task: options.task,
            transport: Arc::clone(&self.transport),
            keys: Arc::clone(&pool),
            queue: Arc::new(scan.queue),
            progress: Arc::clone(&progress),
            builder: self.builder.clone(),
            models: self.models.clone(),
            policy: self.policy.clone(),
            gate: self.gate,
            glossary_dir: options.glossary_dir.clone(),
        });

        let mut handles = Vec::with_capacity(workers);
        for id in 0..workers {
            let Some(key) = pool.checkout() else {
                progress.log(
                    Level::Warn,
                    &format!("Key pool ran dry after starting {} workers", id),
                );
                break;
            };
            let worker = Worker::new(id, key, Arc::clone(&shared));
            handles.push(tokio::spawn(worker.run()));
        }
        summary.workers = handles.len();

        let results = join_all(handles).await;
        progress.finish();
        summary.progress_completed = progress.completed();

        // Bar finished; plain logging from here on
        for result in results {
            match result {
                Ok(report) => {
                    if report.retired_early {
                        warn!(
                            "Worker {} stopped early: no usable key left",
                            report.worker_id
                        );
                    }
                    summary.absorb(&report);
                }
                Err(e) => error!("Worker task failed: {}", e),
            }
        }

        summary.elapsed = started.elapsed();

        let left = shared.queue.len();
        if left > 0 {
            warn!("{} files left unprocessed, every key was disabled", left);
        }

        Ok(summary)
    }
}
