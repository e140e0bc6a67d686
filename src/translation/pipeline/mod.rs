/*!
 * Worker pipeline.
 *
 * - `attempt`: the per-job retry state machine, free of IO
 * - `worker`: one task bound to one key, draining the shared queue
 * - `line_fix`: per-line repair for the in-place tasks
 * - `orchestrator`: queue building, worker spawning and the run summary
 */

pub mod attempt;
pub mod line_fix;
pub mod orchestrator;
pub mod worker;

pub use attempt::{
    AttemptState, Classified, FailReason, ModelChoice, ModelPair, Resolution, Step, Warning,
};
pub use orchestrator::{worker_count, Orchestrator, RunOptions, RunSummary};
pub use worker::{JobStatus, Worker, WorkerReport};
