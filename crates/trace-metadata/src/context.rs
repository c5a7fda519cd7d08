//! W3C `traceparent` parsing and the immutable [`TraceContext`] value.
//!
//! The header format is `{version}-{trace-id}-{parent-id}-{trace-flags}`:
//! two hex characters of version, 32 of trace id, 16 of parent id and two
//! of flags, all separated by hyphens.

use opentelemetry::trace::{SpanContext, SpanId, TraceFlags, TraceId, TraceState};
use opentelemetry_sdk::trace::IdGenerator;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const FIELD_COUNT: usize = 4;
const INVALID_VERSION: u8 = 0xff;

/// Reasons a trace header is rejected.
///
/// A malformed header is never fatal to the caller: propagation is advisory,
/// so callers log the error and continue without trace context.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TraceHeaderError {
    /// The header did not split into exactly four hyphen-separated fields.
    #[error("malformed trace header: expected 4 fields, found {found}")]
    FieldCount {
        /// Number of fields actually present.
        found: usize,
    },

    /// A field had the wrong length or contained non-hex characters.
    #[error("malformed trace header: {field} must be {expected_len} hex characters")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Required length in hex characters.
        expected_len: usize,
    },

    /// Version `ff` is reserved as invalid.
    #[error("malformed trace header: version ff is invalid")]
    InvalidVersion,

    /// The trace id or parent id was all zeroes.
    #[error("malformed trace header: {0} must not be all zeroes")]
    ZeroIdentifier(&'static str),
}

/// Causal position of an operation within a distributed trace.
///
/// Holds the trace identifier, the identifier of the span that issued the
/// current call, and the sampling decision. Values are immutable: deriving a
/// context for a new span goes through [`TraceContext::child`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceContext {
    trace_id: TraceId,
    span_id: SpanId,
    sampled: bool,
}

impl TraceContext {
    /// Creates a context from its parts.
    pub fn new(trace_id: TraceId, span_id: SpanId, sampled: bool) -> Self {
        Self {
            trace_id,
            span_id,
            sampled,
        }
    }

    /// Parses a W3C `traceparent` header value.
    ///
    /// The parser is more lenient than the W3C grammar: uppercase hex digits
    /// and surrounding whitespace are accepted. Identifiers are always
    /// rendered back in lowercase.
    ///
    /// # Errors
    ///
    /// Returns [`TraceHeaderError`] when the field count, a field length, a
    /// hex digit, the version or an all-zero identifier violates the format.
    ///
    /// # Example
    ///
    /// ```
    /// use trace_metadata::TraceContext;
    ///
    /// let ctx = TraceContext::parse("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01").unwrap();
    /// assert_eq!(ctx.trace_id_hex(), "4bf92f3577b34da6a3ce929d0e0e4736");
    /// assert_eq!(ctx.span_id_hex(), "00f067aa0ba902b7");
    /// assert!(ctx.is_sampled());
    /// ```
    pub fn parse(raw: &str) -> Result<Self, TraceHeaderError> {
        let fields: Vec<&str> = raw.trim().split('-').collect();
        if fields.len() != FIELD_COUNT {
            return Err(TraceHeaderError::FieldCount {
                found: fields.len(),
            });
        }

        let [version] = decode_field::<1>(fields[0], "version")?;
        if version == INVALID_VERSION {
            return Err(TraceHeaderError::InvalidVersion);
        }

        let trace_id = decode_field::<16>(fields[1], "trace-id")?;
        let span_id = decode_field::<8>(fields[2], "parent-id")?;
        let [flags] = decode_field::<1>(fields[3], "trace-flags")?;

        let trace_id = TraceId::from_bytes(trace_id);
        if trace_id == TraceId::INVALID {
            return Err(TraceHeaderError::ZeroIdentifier("trace-id"));
        }

        let span_id = SpanId::from_bytes(span_id);
        if span_id == SpanId::INVALID {
            return Err(TraceHeaderError::ZeroIdentifier("parent-id"));
        }

        Ok(Self {
            trace_id,
            span_id,
            sampled: flags & TraceFlags::SAMPLED.to_u8() != 0,
        })
    }

    /// Generates a fresh, sampled root context.
    pub fn generate<G>(generator: &G) -> Self
    where
        G: IdGenerator + ?Sized,
    {
        Self {
            trace_id: generator.new_trace_id(),
            span_id: generator.new_span_id(),
            sampled: true,
        }
    }

    /// Converts a valid OpenTelemetry span context.
    ///
    /// Returns `None` for invalid contexts (zero trace or span id).
    pub fn from_span_context(span_context: &SpanContext) -> Option<Self> {
        span_context.is_valid().then(|| Self {
            trace_id: span_context.trace_id(),
            span_id: span_context.span_id(),
            sampled: span_context.is_sampled(),
        })
    }

    /// Returns the trace identifier.
    pub fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    /// Returns the identifier of the span that issued the current call.
    pub fn span_id(&self) -> SpanId {
        self.span_id
    }

    /// Returns whether the trace is sampled.
    pub fn is_sampled(&self) -> bool {
        self.sampled
    }

    /// Trace identifier as 32 lowercase hex characters.
    pub fn trace_id_hex(&self) -> String {
        self.trace_id.to_string()
    }

    /// Span identifier as 16 lowercase hex characters.
    pub fn span_id_hex(&self) -> String {
        self.span_id.to_string()
    }

    /// Returns the context of a span issued within this trace.
    pub fn child(&self, span_id: SpanId) -> Self {
        Self {
            trace_id: self.trace_id,
            span_id,
            sampled: self.sampled,
        }
    }

    /// Renders the context as a version `00` `traceparent` header value.
    pub fn to_traceparent(&self) -> String {
        let flags = if self.sampled { "01" } else { "00" };
        format!("00-{}-{}-{}", self.trace_id, self.span_id, flags)
    }

    /// Converts to a remote OpenTelemetry span context, suitable as a parent.
    pub fn to_span_context(&self) -> SpanContext {
        let flags = if self.sampled {
            TraceFlags::SAMPLED
        } else {
            TraceFlags::default()
        };

        SpanContext::new(
            self.trace_id,
            self.span_id,
            flags,
            true,
            TraceState::default(),
        )
    }
}

impl FromStr for TraceContext {
    type Err = TraceHeaderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TraceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_traceparent())
    }
}

fn decode_field<const N: usize>(
    field: &str,
    name: &'static str,
) -> Result<[u8; N], TraceHeaderError> {
    decode_hex::<N>(field).ok_or(TraceHeaderError::InvalidField {
        field: name,
        expected_len: N * 2,
    })
}

/// Decodes exactly `N * 2` hex characters into a byte array.
pub(crate) fn decode_hex<const N: usize>(input: &str) -> Option<[u8; N]> {
    let mut bytes = [0u8; N];
    hex::decode_to_slice(input, &mut bytes).ok()?;
    Some(bytes)
}
