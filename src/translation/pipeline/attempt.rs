/*!
 * Per-job attempt state machine.
 *
 * Each transport outcome is first classified against the task's quality gate,
 * then fed to `AttemptState::advance`, which returns the next state and the
 * step the worker must take. `advance` is pure: no IO, no sleeping, no key
 * handling. The worker performs the step.
 *
 * Budgets (all counted in calls, `max_attempts` each):
 * - content: empty output and residual CJK share one counter; exhausting it
 *   accepts whatever text is available with a warning
 * - rate limit: consecutive 429s; exhausting it rotates the key
 * - transient: network faults and HTTP errors once on the fallback model;
 *   exhausting it fails the job
 *
 * A non-429 HTTP error on the primary model switches to the fallback model
 * once, without touching any budget.
 */

use std::time::Duration;

use crate::app_config::RetryPolicy;
use crate::providers::TransportOutcome;
use crate::translation::quality::QualityGate;
use crate::translation::task::TaskKind;

/// Which of the two configured models an attempt targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelChoice {
    #[default]
    Primary,
    Fallback,
}

/// Primary and fallback model identifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPair {
    pub primary: String,
    pub fallback: String,
}

impl ModelPair {
    pub fn new(primary: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            fallback: fallback.into(),
        }
    }

    pub fn name(&self, choice: ModelChoice) -> &str {
        match choice {
            ModelChoice::Primary => &self.primary,
            ModelChoice::Fallback => &self.fallback,
        }
    }
}

/// Transport outcome judged against the task
#[derive(Debug, Clone, PartialEq)]
pub enum Classified {
    /// Usable output
    Clean(String),
    /// No text came back
    Empty,
    /// Translation still carries source ideographs
    Untranslated { text: String, cjk_chars: usize },
    /// HTTP 429
    RateLimited { message: String },
    /// Any other HTTP status >= 400
    HttpError { status: u16, message: String },
    /// Timeout or connection failure
    NetworkFault(String),
}

impl Classified {
    /// Short tag used in log lines
    pub fn describe(&self) -> String {
        match self {
            Self::Clean(_) => "ok".to_string(),
            Self::Empty => "empty output".to_string(),
            Self::Untranslated { cjk_chars, .. } => format!("cjk_chars={}", cjk_chars),
            Self::RateLimited { message } => format!("429 msg={}", message),
            Self::HttpError { status, message } => format!("status={} msg={}", status, message),
            Self::NetworkFault(err) => format!("network err={}", err),
        }
    }
}

/// Classify one transport outcome for `task`
pub fn classify(outcome: TransportOutcome, task: TaskKind, gate: &QualityGate) -> Classified {
    match outcome {
        TransportOutcome::Text(text) if text.trim().is_empty() => Classified::Empty,
        TransportOutcome::Text(text) => match gate.residual_cjk(task, &text) {
            Some(cjk_chars) => Classified::Untranslated { text, cjk_chars },
            None => Classified::Clean(text),
        },
        TransportOutcome::Empty => Classified::Empty,
        TransportOutcome::HttpError { status: 429, message } => Classified::RateLimited { message },
        TransportOutcome::HttpError { status, message } => {
            Classified::HttpError { status, message }
        }
        TransportOutcome::NetworkFault(err) => Classified::NetworkFault(err),
    }
}

/// Why degraded output was accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Every content attempt came back empty
    Empty,
    /// Output still had this many ideographs after the last attempt
    ResidualCjk(usize),
}

/// Why a job produced nothing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailReason {
    /// HTTP errors on the fallback model used up the budget
    Http { status: u16, message: String },
    /// Network faults used up the budget
    Network(String),
    /// The key was disabled and no replacement was left
    KeysExhausted,
}

impl std::fmt::Display for FailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http { status, message } => write!(f, "status={} msg={}", status, message),
            Self::Network(err) => write!(f, "network err={}", err),
            Self::KeysExhausted => f.write_str("no usable key left"),
        }
    }
}

/// Terminal result of an attempt loop
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Output passed the gate
    Accepted(String),
    /// Content budget ran out; `text` is the latest non-empty output, if any
    Degraded { text: Option<String>, warning: Warning },
    /// Nothing usable
    Failed(FailReason),
}

/// What the worker does next
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// Stop with this result
    Finish(Resolution),
    /// Pause, then call again with the same key and model
    Retry(Duration),
    /// Call again right away on the fallback model
    SwitchModel,
    /// Disable the current key and continue on a fresh one
    RotateKey,
}

/// Mutable per-job state threaded through the attempt loop
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AttemptState {
    /// Model the next call targets
    pub model: ModelChoice,
    /// Empty and residual-CJK results so far
    pub content_failures: u32,
    /// Consecutive 429s on the current key
    pub rate_limit_streak: u32,
    /// Network faults plus HTTP errors on the fallback model
    pub transient_failures: u32,
    /// Calls made for this job, across keys
    pub calls: u32,
    /// Latest non-empty output
    pub last_text: Option<String>,
}

impl AttemptState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one classified outcome
    pub fn advance(mut self, outcome: Classified, policy: &RetryPolicy) -> (Self, Step) {
        self.calls += 1;
        if !matches!(outcome, Classified::RateLimited { .. }) {
            self.rate_limit_streak = 0;
        }

        let step = match outcome {
            Classified::Clean(text) => Step::Finish(Resolution::Accepted(text)),

            Classified::Empty => {
                self.content_failures += 1;
                if self.content_failures < policy.max_attempts {
                    Step::Retry(policy.retry_delay())
                } else {
                    Step::Finish(Resolution::Degraded {
                        text: self.last_text.clone(),
                        warning: Warning::Empty,
                    })
                }
            }

            Classified::Untranslated { text, cjk_chars } => {
                self.content_failures += 1;
                self.last_text = Some(text.clone());
                if self.content_failures < policy.max_attempts {
                    Step::Retry(policy.retry_delay())
                } else {
                    Step::Finish(Resolution::Degraded {
                        text: Some(text),
                        warning: Warning::ResidualCjk(cjk_chars),
                    })
                }
            }

            Classified::RateLimited { .. } => {
                self.rate_limit_streak += 1;
                if self.rate_limit_streak < policy.max_attempts {
                    Step::Retry(policy.rate_limit_delay())
                } else {
                    Step::RotateKey
                }
            }

            Classified::HttpError { status, message } => {
                if self.model == ModelChoice::Primary {
                    self.model = ModelChoice::Fallback;
                    Step::SwitchModel
                } else {
                    self.transient_failures += 1;
                    if self.transient_failures < policy.max_attempts {
                        Step::Retry(policy.retry_delay())
                    } else {
                        Step::Finish(Resolution::Failed(FailReason::Http { status, message }))
                    }
                }
            }

            Classified::NetworkFault(err) => {
                self.transient_failures += 1;
                if self.transient_failures < policy.max_attempts {
                    Step::Retry(policy.retry_delay())
                } else {
                    Step::Finish(Resolution::Failed(FailReason::Network(err)))
                }
            }
        };

        (self, step)
    }

    /// State for restarting the same job on a replacement key
    ///
    /// Budgets start over; the model choice and the latest output carry over.
    pub fn after_rotation(self) -> Self {
        Self {
            model: self.model,
            calls: self.calls,
            last_text: self.last_text,
            ..Self::default()
        }
    }
}
