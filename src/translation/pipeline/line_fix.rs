/*!
 * In-place line repair for the fix-name and fix-translation tasks.
 *
 * Each line that still carries ideographs goes through the same attempt
 * state machine as a whole segment. Lines that cannot be fixed keep their
 * original text, and the file is rewritten only when something changed.
 */

use log::Level;

use crate::file_utils::FileManager;
use crate::key_pool::key_prefix;
use crate::translation::glossary::NamePair;
use crate::translation::jobs::Job;
use crate::translation::quality::has_cjk;
use crate::translation::task::TaskKind;

use super::attempt::{FailReason, Resolution};
use super::worker::{JobEnd, JobStatus, Worker};

/// A line selected for repair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineFix {
    /// Glossary entry whose target side is re-translated from its source
    Name(NamePair),
    /// Translated line with leftover ideographs, sent whole
    Text(String),
}

impl LineFix {
    /// Decide whether `line` needs repair under `task`
    pub fn select(task: TaskKind, line: &str) -> Option<Self> {
        match task {
            TaskKind::FixName => NamePair::parse(line).filter(NamePair::needs_fix).map(Self::Name),
            TaskKind::FixTranslation if has_cjk(line) => Some(Self::Text(line.trim().to_string())),
            _ => None,
        }
    }

    /// Text sent to the model
    pub fn prompt_text(&self) -> &str {
        match self {
            Self::Name(pair) => &pair.source,
            Self::Text(text) => text,
        }
    }

    /// Replacement line built from the model output, without line ending
    pub fn apply(&self, output: &str) -> String {
        let output = output.replace(['\r', '\n'], " ").trim().to_string();
        match self {
            Self::Name(pair) => NamePair {
                source: pair.source.clone(),
                target: output,
            }
            .render(),
            Self::Text(_) => output,
        }
    }
}

/// Line ending of `line`, if any
fn line_ending(line: &str) -> &str {
    if line.ends_with("\r\n") {
        "\r\n"
    } else if line.ends_with('\n') {
        "\n"
    } else {
        ""
    }
}

impl Worker {
    /// Repair one file in place
    pub(crate) async fn process_in_place(&mut self, job: &Job) -> JobEnd {
        let name = job.name();
        let task = self.shared.task;

        let content = match FileManager::read_to_string(&job.input) {
            Ok(content) => content,
            Err(e) => {
                self.complete(
                    Level::Error,
                    format!(
                        "[READ_ERR] {} (key={}, task={}): {}",
                        name,
                        key_prefix(&self.key),
                        task,
                        e
                    ),
                );
                return JobEnd::Continue(JobStatus::Failed);
            }
        };

        let mut rewritten = String::with_capacity(content.len());
        let mut fixed = 0usize;
        let mut kept = 0usize;
        let mut out_of_keys = false;
        // Model of the last call, reported on the file's terminal line
        let mut last_model: Option<String> = None;

        for line in content.split_inclusive('\n') {
            let fix = match LineFix::select(task, line) {
                Some(fix) if !out_of_keys => fix,
                _ => {
                    rewritten.push_str(line);
                    continue;
                }
            };

            let (resolution, model) = self.resolve(fix.prompt_text(), None, &name).await;
            last_model = Some(model.clone());
            match resolution {
                Resolution::Accepted(output) | Resolution::Degraded { text: Some(output), .. }
                    if !output.trim().is_empty() =>
                {
                    let replacement = fix.apply(&output);
                    self.shared.progress.log(
                        Level::Info,
                        &format!(
                            "[LINE_FIXED] {} (key={}, model={}): {}",
                            name,
                            key_prefix(&self.key),
                            model,
                            replacement
                        ),
                    );
                    rewritten.push_str(&replacement);
                    rewritten.push_str(line_ending(line));
                    fixed += 1;
                    tokio::time::sleep(self.shared.policy.line_delay()).await;
                }
                Resolution::Failed(FailReason::KeysExhausted) => {
                    self.shared.progress.log(
                        Level::Error,
                        &format!(
                            "[LINE_FAIL] {} (key={}): no usable key left, keeping remaining lines",
                            name,
                            key_prefix(&self.key)
                        ),
                    );
                    rewritten.push_str(line);
                    kept += 1;
                    out_of_keys = true;
                }
                other => {
                    self.shared.progress.log(
                        Level::Warn,
                        &format!(
                            "[LINE_KEEP] {} (key={}, model={}): {:?}, keeping original line",
                            name,
                            key_prefix(&self.key),
                            model,
                            other
                        ),
                    );
                    rewritten.push_str(line);
                    kept += 1;
                }
            }
        }

        // Shared tail of every terminal line for this file
        let fields = format!(
            "key={}, model={}",
            key_prefix(&self.key),
            last_model.as_deref().unwrap_or("none")
        );

        if fixed > 0 {
            if let Err(e) = FileManager::write_to_file(&job.output, &rewritten) {
                self.complete(Level::Error, format!("[WRITE_ERR] {} ({}): {}", name, fields, e));
                return if out_of_keys {
                    JobEnd::Retire(JobStatus::Failed)
                } else {
                    JobEnd::Continue(JobStatus::Failed)
                };
            }
        }

        let status = match (fixed, kept) {
            (0, 0) => {
                self.complete(Level::Info, format!("[SKIP] {} ({}, nothing to fix)", name, fields));
                JobStatus::Done
            }
            (_, 0) => {
                self.complete(
                    Level::Info,
                    format!("[FIXED] {} ({}, {} lines)", name, fields, fixed),
                );
                JobStatus::Done
            }
            _ => {
                self.complete(
                    Level::Warn,
                    format!(
                        "[FIXED_PARTIAL] {} ({}, {} fixed, {} kept)",
                        name, fields, fixed, kept
                    ),
                );
                JobStatus::DoneWithWarning
            }
        };

        if out_of_keys {
            JobEnd::Retire(status)
        } else {
            JobEnd::Continue(status)
        }
    }
}
