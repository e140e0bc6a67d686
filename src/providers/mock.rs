/*!
 * Mock transport for testing.
 *
 * - `ScriptedTransport::working()` - always answers with a clean translation
 * - `ScriptedTransport::always(outcome)` - answers every call the same way
 * - `ScriptedTransport::new(responder)` - computes each answer from the call
 *
 * Per-key scripts queued with `with_script` are consumed first, then the
 * responder takes over. Every call is recorded.
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

use super::{GenerateRequest, Transport, TransportOutcome};

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    /// Key the call was authenticated with
    pub key: String,
    /// Model the call targeted
    pub model: String,
    /// User prompt text
    pub prompt: String,
}

/// Computes an outcome for a call
pub type Responder = Arc<dyn Fn(&MockCall) -> TransportOutcome + Send + Sync>;

/// Transport double driven by scripts and a responder
pub struct ScriptedTransport {
    responder: Responder,
    scripts: Mutex<HashMap<String, VecDeque<TransportOutcome>>>,
    calls: Mutex<Vec<MockCall>>,
}

impl fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedTransport")
            .field("calls", &self.calls.lock().len())
            .finish()
    }
}

impl ScriptedTransport {
    /// Create a transport answering with `responder`
    pub fn new(responder: impl Fn(&MockCall) -> TransportOutcome + Send + Sync + 'static) -> Self {
        Self {
            responder: Arc::new(responder),
            scripts: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Always succeed with a translation free of CJK text
    pub fn working() -> Self {
        Self::new(|call| {
            TransportOutcome::Text(format!("[TRANSLATED] {} chars", call.prompt.chars().count()))
        })
    }

    /// Answer every call with the same outcome
    pub fn always(outcome: TransportOutcome) -> Self {
        Self::new(move |_| outcome.clone())
    }

    /// Queue outcomes returned for `key` before the responder is consulted
    pub fn with_script(self, key: &str, outcomes: Vec<TransportOutcome>) -> Self {
        self.scripts
            .lock()
            .entry(key.to_string())
            .or_default()
            .extend(outcomes);
        self
    }

    /// All calls made so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Calls made with a given key
    pub fn calls_for_key(&self, key: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.key == key).count()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, key: &str, request: &GenerateRequest, model: &str) -> TransportOutcome {
        let call = MockCall {
            key: key.to_string(),
            model: model.to_string(),
            prompt: request.user_text(),
        };
        self.calls.lock().push(call.clone());

        let scripted = self
            .scripts
            .lock()
            .get_mut(key)
            .and_then(|queue| queue.pop_front());

        scripted.unwrap_or_else(|| (self.responder)(&call))
    }
}
