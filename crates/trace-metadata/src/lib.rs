//! Trace context propagation across header-less storage events.
//!
//! An upload request arrives with a W3C `traceparent` header, but the resize
//! step it eventually triggers is invoked by a storage event that carries no
//! headers at all. This crate provides the minimal pieces needed to carry the
//! causal link through object metadata instead:
//!
//! - [`TraceContext`] - parsed `traceparent` (trace id, span id, sampled flag)
//! - [`to_metadata`] / [`from_metadata`] - encode to and decode from the
//!   `TraceId` / `ParentId` object metadata keys
//! - [`DependencySpan`] - a timed record of one pipeline stage
//! - [`TelemetrySink`] - where completed stages go, with an OpenTelemetry-backed
//!   implementation ([`OtelDependencySink`]) and an in-memory one
//!   ([`RecordingSink`])
//!
//! Propagation is best-effort throughout: a missing or malformed context is
//! never an error for the pipeline, it just yields `None`.
//!
//! # Example
//!
//! ```
//! use trace_metadata::{TraceContext, from_metadata, to_metadata};
//!
//! let ctx: TraceContext = "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"
//!     .parse()
//!     .unwrap();
//!
//! let metadata = to_metadata(&ctx);
//! let restored = from_metadata(&metadata).unwrap();
//!
//! assert_eq!(restored.trace_id(), ctx.trace_id());
//! assert_eq!(restored.span_id(), ctx.span_id());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod context;
mod metadata;
mod sink;
mod span;

pub use context::{TraceContext, TraceHeaderError};
pub use metadata::{ObjectMetadata, PARENT_ID_KEY, TRACE_ID_KEY, from_metadata, to_metadata};
pub use sink::{OtelDependencySink, RecordingSink, SUCCESS_ATTRIBUTE, TelemetrySink};
pub use span::{DependencySpan, SpanTimer};

// Identifier types used throughout the public API.
pub use opentelemetry::trace::{SpanId, TraceId};
