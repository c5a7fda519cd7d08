//! Encoding trace context into object metadata and back.
//!
//! Storage events carry no headers, so the upload stores the trace id and the
//! id of its own span as user metadata on the object. Version and flags are
//! not carried: the consumer only needs the causal link.

use crate::context::{TraceContext, decode_hex};
use opentelemetry::trace::{SpanId, TraceId};
use std::collections::HashMap;

/// Metadata key holding the 32 hex character trace id.
pub const TRACE_ID_KEY: &str = "TraceId";

/// Metadata key holding the 16 hex character id of the span that wrote the object.
pub const PARENT_ID_KEY: &str = "ParentId";

/// User metadata attached to a stored object.
pub type ObjectMetadata = HashMap<String, String>;

/// Encodes a trace context as object metadata.
///
/// # Example
///
/// ```
/// use trace_metadata::{TraceContext, from_metadata, to_metadata};
///
/// let ctx = TraceContext::parse("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01").unwrap();
/// let metadata = to_metadata(&ctx);
/// assert_eq!(metadata["TraceId"], "4bf92f3577b34da6a3ce929d0e0e4736");
/// assert_eq!(metadata["ParentId"], "00f067aa0ba902b7");
///
/// let decoded = from_metadata(&metadata).unwrap();
/// assert_eq!(decoded.trace_id(), ctx.trace_id());
/// ```
pub fn to_metadata(ctx: &TraceContext) -> ObjectMetadata {
    HashMap::from([
        (TRACE_ID_KEY.to_string(), ctx.trace_id_hex()),
        (PARENT_ID_KEY.to_string(), ctx.span_id_hex()),
    ])
}

/// Decodes a trace context from object metadata.
///
/// Returns `None` when either key is missing or holds an invalid identifier.
/// Keys are matched case-insensitively since S3 lowercases user metadata keys.
/// The decoded context is marked sampled.
pub fn from_metadata(metadata: &ObjectMetadata) -> Option<TraceContext> {
    let trace_id = lookup(metadata, TRACE_ID_KEY)
        .and_then(|value| decode_hex::<16>(value.trim()))
        .map(TraceId::from_bytes)
        .filter(|id| *id != TraceId::INVALID)?;

    let span_id = lookup(metadata, PARENT_ID_KEY)
        .and_then(|value| decode_hex::<8>(value.trim()))
        .map(SpanId::from_bytes)
        .filter(|id| *id != SpanId::INVALID)?;

    Some(TraceContext::new(trace_id, span_id, true))
}

fn lookup<'a>(metadata: &'a ObjectMetadata, key: &str) -> Option<&'a str> {
    metadata
        .get(key)
        .or_else(|| {
            metadata
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(key))
                .map(|(_, v)| v)
        })
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn metadata(pairs: &[(&str, &str)]) -> ObjectMetadata {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    proptest! {
        #[test]
        fn metadata_roundtrip_preserves_ids(
            trace_bytes in prop::array::uniform16(any::<u8>()),
            span_bytes in prop::array::uniform8(any::<u8>()),
            sampled in prop::bool::ANY,
        ) {
            let trace_id = TraceId::from_bytes(trace_bytes);
            let span_id = SpanId::from_bytes(span_bytes);
            prop_assume!(trace_id != TraceId::INVALID && span_id != SpanId::INVALID);

            let ctx = TraceContext::new(trace_id, span_id, sampled);
            let decoded = from_metadata(&to_metadata(&ctx)).unwrap();

            prop_assert_eq!(decoded.trace_id(), ctx.trace_id());
            prop_assert_eq!(decoded.span_id(), ctx.span_id());
        }
    }

    #[test]
    fn test_to_metadata_has_exactly_two_keys() {
        let ctx =
            TraceContext::parse("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-00").unwrap();
        let metadata = to_metadata(&ctx);

        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata[TRACE_ID_KEY], "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(metadata[PARENT_ID_KEY], "00f067aa0ba902b7");
    }

    #[test]
    fn test_from_metadata_absent_keys() {
        assert!(from_metadata(&ObjectMetadata::new()).is_none());
        assert!(
            from_metadata(&metadata(&[(TRACE_ID_KEY, "4bf92f3577b34da6a3ce929d0e0e4736")]))
                .is_none()
        );
        assert!(from_metadata(&metadata(&[(PARENT_ID_KEY, "00f067aa0ba902b7")])).is_none());
    }

    #[test]
    fn test_from_metadata_invalid_values() {
        assert!(
            from_metadata(&metadata(&[
                (TRACE_ID_KEY, "not-a-trace-id"),
                (PARENT_ID_KEY, "00f067aa0ba902b7"),
            ]))
            .is_none()
        );
        assert!(
            from_metadata(&metadata(&[
                (TRACE_ID_KEY, "00000000000000000000000000000000"),
                (PARENT_ID_KEY, "00f067aa0ba902b7"),
            ]))
            .is_none()
        );
        assert!(
            from_metadata(&metadata(&[
                (TRACE_ID_KEY, "4bf92f3577b34da6a3ce929d0e0e4736"),
                (PARENT_ID_KEY, "00f067aa0ba902"),
            ]))
            .is_none()
        );
    }

    #[test]
    fn test_from_metadata_lowercased_keys() {
        let ctx = from_metadata(&metadata(&[
            ("traceid", "4bf92f3577b34da6a3ce929d0e0e4736"),
            ("parentid", "00f067aa0ba902b7"),
        ]))
        .unwrap();

        assert_eq!(ctx.trace_id_hex(), "4bf92f3577b34da6a3ce929d0e0e4736");
        assert_eq!(ctx.span_id_hex(), "00f067aa0ba902b7");
        assert!(ctx.is_sampled());
    }

    #[test]
    fn test_from_metadata_ignores_unrelated_keys() {
        let ctx = from_metadata(&metadata(&[
            (TRACE_ID_KEY, "4bf92f3577b34da6a3ce929d0e0e4736"),
            (PARENT_ID_KEY, "00f067aa0ba902b7"),
            ("Owner", "someone"),
        ]));
        assert!(ctx.is_some());
    }
}
