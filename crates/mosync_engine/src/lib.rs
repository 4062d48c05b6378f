//! # mosync engine
//!
//! Reconciles a declared managed object against a REST management API.
//!
//! This crate provides:
//! - `ManagedObjectSpec`, the typed unit of reconciliation
//! - Create/Read/Update/Delete handlers on `Reconciler`
//! - Response interpretation with a per-operation severity table
//! - Retry policies with optional jittered backoff
//! - State projection for drift detection
//! - A transport abstraction with HTTP and scripted implementations
//!
//! ## Architecture
//!
//! Every operation runs the same sequence:
//! 1. Issue one REST call through the transport
//! 2. Interpret the response envelope (absent, present, or rejected)
//! 3. Project the authoritative attributes back onto the spec
//!
//! Steps 1 and 2 run inside the operation's retry policy.
//!
//! ## Key Invariants
//!
//! - `dn` and `class_name` never change for the life of a spec
//! - Identity is set only after a successful Create, Update, or Read that
//!   found the object
//! - Identity is cleared only after a successful Delete or a Read that found
//!   the object gone
//! - Remote codes 1 and 107 are success for Delete and errors elsewhere

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod http;
mod interpret;
mod object;
mod operation;
mod project;
mod reconciler;
mod retry;
mod transport;

pub use config::{DeleteStrategy, ReconcileConfig};
pub use error::{ReconcileError, ReconcileResult};
pub use http::{HttpClient, HttpTransport};
pub use interpret::{classify, interpret, severity, Interpretation, Outcome, Severity};
pub use object::{ManagedObjectSpec, ObjectConfig};
pub use operation::Operation;
pub use project::{project, project_absent};
pub use reconciler::{ReconcileStats, Reconciler};
pub use retry::{with_retry, Backoff, RetryPolicy};
pub use transport::{MockTransport, RecordedCall, RestTransport};

pub use mosync_protocol::{
    object_path, ErrorEntry, LifecycleStatus, Method, Payload, ResponseTree,
};
