//! # mosync protocol
//!
//! Wire types for reconciling managed objects against a REST management API.
//!
//! This crate provides:
//! - `ResponseTree`, the `imdata` response envelope, with error-entry
//!   extraction and raw attribute search
//! - `Payload`, the nested write body `{ <class>: { attributes: {...} } }`
//! - `LifecycleStatus`, the closed set of `status` hints a write may carry
//! - `Method` and `object_path` for addressing an object by distinguished name
//! - Decoration filters that clean raw values serialized by the transport
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod filter;
mod payload;
mod request;
mod tree;

pub use error::{ProtocolError, ProtocolResult};
pub use filter::{normalize_raw, strip_quotes, strip_square_brackets};
pub use payload::{LifecycleStatus, Payload};
pub use request::{object_path, Method};
pub use tree::{ErrorEntry, ResponseTree, ATTRIBUTES, ERROR_CLASS, IMDATA};
