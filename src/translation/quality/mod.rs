/*!
 * Output acceptance checks.
 *
 * A response only counts as a clean success when it passes the gate for the
 * run's task. Failing the gate never rotates keys: it is a property of the
 * model and the input, not of the credential.
 */

pub mod cjk;

pub use cjk::{count_cjk_chars, has_cjk, is_cjk};

use super::task::TaskKind;

/// Residual-source check applied to translate output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QualityGate {
    /// Ideograph count at which output counts as incomplete
    pub cjk_threshold: usize,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self { cjk_threshold: 4 }
    }
}

impl QualityGate {
    pub fn new(cjk_threshold: usize) -> Self {
        Self { cjk_threshold }
    }

    /// Residual ideograph count when `text` fails the gate for `task`
    pub fn residual_cjk(&self, task: TaskKind, text: &str) -> Option<usize> {
        if !task.checks_residual_cjk() {
            return None;
        }
        let count = count_cjk_chars(text);
        (count >= self.cjk_threshold).then_some(count)
    }
}
