//! HTTP transport implementation.
//!
//! The actual HTTP client is abstracted via a trait so that any library
//! (ureq, reqwest, hyper) can carry the requests, including whatever
//! session authentication the endpoint needs.

use crate::error::{ReconcileError, ReconcileResult};
use crate::transport::RestTransport;
use mosync_protocol::{Method, Payload, ResponseTree};
use parking_lot::RwLock;
use tracing::trace;

/// HTTP client abstraction.
pub trait HttpClient: Send + Sync {
    /// Sends one request and returns the response body.
    ///
    /// Error statuses whose body holds an API response must be returned as
    /// `Ok`, so the body can be interpreted. `Err` is reserved for failures
    /// with no usable body.
    fn execute(&self, method: Method, url: &str, body: Option<&str>) -> Result<String, String>;
}

/// JSON-over-HTTP transport.
pub struct HttpTransport<C: HttpClient> {
    /// Base URL of the management API (e.g., "https://apic.example.com").
    base_url: String,
    /// HTTP client implementation.
    client: C,
    /// Last transport error message.
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpTransport<C> {
    /// Creates a new HTTP transport.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the HTTP client.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Returns the last transport error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    fn fail(&self, message: String) -> ReconcileError {
        *self.last_error.write() = Some(message.clone());
        ReconcileError::transport(message)
    }
}

impl<C: HttpClient> RestTransport for HttpTransport<C> {
    fn call(
        &self,
        method: Method,
        path: &str,
        payload: Option<&Payload>,
    ) -> ReconcileResult<ResponseTree> {
        let url = format!("{}{}", self.base_url, path);
        let body = payload
            .filter(|_| method.has_body())
            .map(Payload::to_json);
        trace!(%method, %url, body = body.as_deref().unwrap_or(""), "sending request");

        let response = self
            .client
            .execute(method, &url, body.as_deref())
            .map_err(|e| self.fail(format!("{method} {url}: {e}")))?;

        let tree = ResponseTree::parse(&response)
            .map_err(|e| self.fail(format!("{method} {url}: unreadable response: {e}")))?;

        *self.last_error.write() = None;
        Ok(tree)
    }
}
