//! Transport layer abstraction.

use crate::error::{ReconcileError, ReconcileResult};
use mosync_protocol::{object_path, Method, Payload, ResponseTree};
use parking_lot::Mutex;
use std::collections::VecDeque;

/// A transport performs one authenticated round trip to the management API.
///
/// Implementations own request construction, authentication, pooling and
/// timeouts. They do not retry and do not interpret the response beyond
/// parsing it; a timeout is an ordinary [`ReconcileError::Transport`].
pub trait RestTransport: Send + Sync {
    /// Issues `method` on `path`. `payload` is sent only with POST.
    fn call(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Payload>,
    ) -> ReconcileResult<ResponseTree>;

    /// Deletes the object named `dn`.
    ///
    /// The default issues `DELETE` on the object's path. Transports for API
    /// generations with a dedicated delete call override this.
    fn delete_by_identity(&self, dn: &str, class_name: &str) -> ReconcileResult<ResponseTree> {
        let _ = class_name;
        self.call(Method::Delete, &object_path(dn), None)
    }
}

/// One call seen by a [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// Method issued.
    pub method: Method,
    /// Path requested.
    pub path: String,
    /// Body sent, if any.
    pub payload: Option<Payload>,
}

/// A transport that replays scripted responses, for testing.
///
/// Responses are consumed in order; once the script is empty the fallback
/// (if set) answers every call.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<ReconcileResult<ResponseTree>>>,
    fallback: Mutex<Option<ReconcileResult<ResponseTree>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    /// Creates a mock transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response.
    pub fn push_response(&self, response: ResponseTree) {
        self.script.lock().push_back(Ok(response));
    }

    /// Queues a transport-level failure.
    pub fn push_error(&self, error: ReconcileError) {
        self.script.lock().push_back(Err(error));
    }

    /// Sets the answer given once the script is exhausted.
    pub fn set_fallback(&self, result: ReconcileResult<ResponseTree>) {
        *self.fallback.lock() = Some(result);
    }

    /// Returns every call made so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Returns the number of calls made so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

impl RestTransport for MockTransport {
    fn call(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Payload>,
    ) -> ReconcileResult<ResponseTree> {
        self.calls.lock().push(RecordedCall {
            method,
            path: path.to_string(),
            payload: payload.cloned(),
        });

        if let Some(next) = self.script.lock().pop_front() {
            return next;
        }
        self.fallback
            .lock()
            .clone()
            .unwrap_or_else(|| Err(ReconcileError::transport("no scripted response")))
    }
}
