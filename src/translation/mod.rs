/*!
 * Segment translation.
 *
 * This module holds everything between a directory of segment files and the
 * transport. It is split into several submodules:
 *
 * - `task`: the task kinds a run can perform
 * - `jobs`: directory scanning and the shared job queue
 * - `glossary`: name glossary parsing and cleanup
 * - `prompts`: payload building per task and model
 * - `quality`: residual-ideograph detection
 * - `progress`: the shared progress line
 * - `pipeline`: workers, the retry state machine and the orchestrator
 */

pub use self::jobs::{Job, JobQueue, SegmentRange};
pub use self::pipeline::{Orchestrator, RunOptions, RunSummary};
pub use self::progress::ProgressTracker;
pub use self::prompts::PayloadBuilder;
pub use self::quality::QualityGate;
pub use self::task::TaskKind;

pub mod glossary;
pub mod jobs;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod quality;
pub mod task;
