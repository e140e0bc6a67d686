/*!
 * Worker: one task, one key, pulling jobs until the queue is empty.
 *
 * The worker owns its key for its whole life. It only lets go of it in two
 * ways: handing it back when the queue runs dry, or disabling it after
 * repeated 429s. In the second case it asks the pool for a replacement and
 * retires when none is left.
 */

use log::Level;
use std::path::PathBuf;
use std::sync::Arc;

use crate::app_config::RetryPolicy;
use crate::file_utils::FileManager;
use crate::key_pool::{key_prefix, KeyPool};
use crate::providers::Transport;
use crate::translation::jobs::{Job, JobQueue};
use crate::translation::progress::ProgressTracker;
use crate::translation::prompts::PayloadBuilder;
use crate::translation::quality::QualityGate;
use crate::translation::task::TaskKind;

use super::attempt::{classify, AttemptState, FailReason, ModelPair, Resolution, Step, Warning};

/// State shared by every worker of a run
#[derive(Debug)]
pub struct WorkerShared {
    pub task: TaskKind,
    pub transport: Arc<dyn Transport>,
    pub keys: Arc<KeyPool>,
    pub queue: Arc<JobQueue>,
    pub progress: Arc<ProgressTracker>,
    pub builder: PayloadBuilder,
    pub models: ModelPair,
    pub policy: RetryPolicy,
    pub gate: QualityGate,
    /// Directory holding a glossary per input file name (translate only)
    pub glossary_dir: Option<PathBuf>,
}

/// Terminal status of one job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Done,
    DoneWithWarning,
    Failed,
}

/// What happens after a job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobEnd {
    /// Take the next job
    Continue(JobStatus),
    /// Stop: the key was disabled and the pool is empty
    Retire(JobStatus),
}

/// Per-worker tally returned when the worker exits
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub succeeded: usize,
    pub warned: usize,
    pub failed: usize,
    /// Keys this worker disabled
    pub keys_disabled: usize,
    /// Worker stopped before the queue was empty
    pub retired_early: bool,
}

impl WorkerReport {
    fn count(&mut self, status: JobStatus) {
        match status {
            JobStatus::Done => self.succeeded += 1,
            JobStatus::DoneWithWarning => self.warned += 1,
            JobStatus::Failed => self.failed += 1,
        }
    }
}

/// A single worker bound to one key
#[derive(Debug)]
pub struct Worker {
    pub(crate) shared: Arc<WorkerShared>,
    pub(crate) key: String,
    pub(crate) report: WorkerReport,
}

impl Worker {
    pub fn new(id: usize, key: String, shared: Arc<WorkerShared>) -> Self {
        Self {
            shared,
            key,
            report: WorkerReport {
                worker_id: id,
                ..Default::default()
            },
        }
    }

    /// Process jobs until the queue is empty or no key is left
    pub async fn run(mut self) -> WorkerReport {
        while let Some(job) = self.shared.queue.pop() {
            let end = if self.shared.task.is_line_fix() {
                self.process_in_place(&job).await
            } else {
                self.process_segment(&job).await
            };

            match end {
                JobEnd::Continue(status) => self.report.count(status),
                JobEnd::Retire(status) => {
                    self.report.count(status);
                    self.report.retired_early = true;
                    return self.report;
                }
            }
        }

        self.shared.keys.give_back(&self.key);
        self.report
    }

    /// Run one segment job to a terminal outcome
    async fn process_segment(&mut self, job: &Job) -> JobEnd {
        let name = job.name();
        let task = self.shared.task;

        let text = match FileManager::read_to_string(&job.input) {
            Ok(text) => text,
            Err(e) => {
                self.complete(
                    Level::Error,
                    format!(
                        "[FAIL_READ] {} (key={}, task={}) err={}",
                        name,
                        key_prefix(&self.key),
                        task,
                        e
                    ),
                );
                return JobEnd::Continue(JobStatus::Failed);
            }
        };
        let glossary = self.load_glossary(job);

        let (resolution, model) = self.resolve(&text, glossary.as_deref(), &name).await;

        match resolution {
            Resolution::Accepted(output) => {
                if let Err(e) = FileManager::write_to_file(&job.output, &output) {
                    self.fail_write(&name, &model, &e);
                    return JobEnd::Continue(JobStatus::Failed);
                }
                self.complete(
                    Level::Info,
                    format!(
                        "[DONE] {} (key={}, model={}, task={})",
                        name,
                        key_prefix(&self.key),
                        model,
                        task
                    ),
                );
                self.throttle().await;
                JobEnd::Continue(JobStatus::Done)
            }

            Resolution::Degraded { text, warning } => {
                let tag = match warning {
                    Warning::ResidualCjk(count) => {
                        format!("cjk={}>={}", count, self.shared.gate.cjk_threshold)
                    }
                    Warning::Empty => "empty output".to_string(),
                };

                match text.filter(|t| !t.is_empty()) {
                    Some(output) => {
                        if let Err(e) = FileManager::write_to_file(&job.output, &output) {
                            self.fail_write(&name, &model, &e);
                            return JobEnd::Continue(JobStatus::Failed);
                        }
                        self.complete(
                            Level::Warn,
                            format!(
                                "[DONE_WARN] {} (key={}, model={}, {})",
                                name,
                                key_prefix(&self.key),
                                model,
                                tag
                            ),
                        );
                    }
                    // Nothing written: a missing output is picked up again next run
                    None => self.complete(
                        Level::Warn,
                        format!(
                            "[DONE_EMPTY] {} (key={}, model={}, task={})",
                            name,
                            key_prefix(&self.key),
                            model,
                            task
                        ),
                    ),
                }
                self.throttle().await;
                JobEnd::Continue(JobStatus::DoneWithWarning)
            }

            // self.key still names the key that was just disabled
            Resolution::Failed(FailReason::KeysExhausted) => {
                self.complete(
                    Level::Error,
                    format!(
                        "[FAIL] {} (key={}, model={}, no usable key left)",
                        name,
                        key_prefix(&self.key),
                        model
                    ),
                );
                JobEnd::Retire(JobStatus::Failed)
            }

            Resolution::Failed(reason) => {
                self.complete(
                    Level::Error,
                    format!(
                        "[FAIL_ERR] {} (key={}, model={}, {})",
                        name,
                        key_prefix(&self.key),
                        model,
                        reason
                    ),
                );
                JobEnd::Continue(JobStatus::Failed)
            }
        }
    }

    /// Read the glossary matching a job, if the run uses one
    fn load_glossary(&self, job: &Job) -> Option<String> {
        if !self.shared.task.uses_glossary() {
            return None;
        }
        let dir = self.shared.glossary_dir.as_ref()?;
        let path = dir.join(job.input.file_name()?);

        if !FileManager::file_exists(&path) {
            self.shared.progress.log(
                Level::Warn,
                &format!("[WARN] No glossary for {} in {:?}", job.name(), dir),
            );
            return None;
        }

        match FileManager::read_to_string(&path) {
            Ok(text) => Some(text),
            Err(e) => {
                self.shared.progress.log(
                    Level::Warn,
                    &format!("[WARN] Unreadable glossary for {}: {}", job.name(), e),
                );
                None
            }
        }
    }

    /// Drive the attempt state machine for one piece of text
    ///
    /// Rotates keys in place when the state machine asks for it. Returns the
    /// result together with the model of the last call.
    pub(crate) async fn resolve(
        &mut self,
        text: &str,
        glossary: Option<&str>,
        label: &str,
    ) -> (Resolution, String) {
        let shared = Arc::clone(&self.shared);
        let mut state = AttemptState::new();

        loop {
            let model = shared.models.name(state.model).to_string();
            let request = shared.builder.build(shared.task, text, glossary, &model);
            let outcome = shared.transport.send(&self.key, &request, &model).await;
            let classified = classify(outcome, shared.task, &shared.gate);
            let detail = classified.describe();

            let (next, step) = state.advance(classified, &shared.policy);
            state = next;

            match step {
                Step::Finish(resolution) => return (resolution, model),

                Step::Retry(delay) => {
                    shared.progress.log(
                        Level::Warn,
                        &format!(
                            "[RETRY] key={} file={} model={} {} (call {})",
                            key_prefix(&self.key),
                            label,
                            model,
                            detail,
                            state.calls
                        ),
                    );
                    tokio::time::sleep(delay).await;
                }

                Step::SwitchModel => {
                    shared.progress.log(
                        Level::Warn,
                        &format!(
                            "[FALLBACK_MODEL] key={} file={} {} -> {} -> {}",
                            key_prefix(&self.key),
                            label,
                            detail,
                            shared.models.primary,
                            shared.models.fallback
                        ),
                    );
                }

                Step::RotateKey => {
                    shared.progress.log(
                        Level::Warn,
                        &format!(
                            "[DISABLE] key={} after {} consecutive 429s, switching key",
                            key_prefix(&self.key),
                            shared.policy.max_attempts
                        ),
                    );
                    shared.keys.disable(&self.key);
                    self.report.keys_disabled += 1;

                    match shared.keys.checkout() {
                        Some(replacement) => {
                            self.key = replacement;
                            state = state.after_rotation();
                        }
                        None => return (Resolution::Failed(FailReason::KeysExhausted), model),
                    }
                }
            }
        }
    }

    fn fail_write(&self, name: &str, model: &str, err: &impl std::fmt::Display) {
        self.complete(
            Level::Error,
            format!(
                "[FAIL_WRITE] {} (key={}, model={}) err={}",
                name,
                key_prefix(&self.key),
                model,
                err
            ),
        );
    }

    /// Count a terminal outcome and print its line
    pub(crate) fn complete(&self, level: Level, message: String) {
        self.shared.progress.record_completion(level, &message);
    }

    /// Inter-job pause after a written result
    async fn throttle(&self) {
        tokio::time::sleep(self.shared.policy.job_delay()).await;
    }
}
