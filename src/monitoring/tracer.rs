/*!
 * Structured Tracing
 * Subscriber setup and per-primitive spans using the tracing crate
 *
 * Features:
 * - JSON-formatted logs for structured parsing
 * - `log` records from the table and queue code routed into the same
 *   subscriber
 * - One span per kernel primitive call, tagged with the calling pid
 */

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, span, Level};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - KERNEL_TRACE_JSON: Enable JSON output (default: false)
///
/// Safe to call more than once; later calls leave the first subscriber in
/// place.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Check if JSON output is requested
    let use_json = std::env::var("KERNEL_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_line_number(true)
                    .with_file(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::NONE)
                    .compact(),
            )
            .try_init()
    };

    if installed.is_ok() {
        debug!(json = use_json, "Structured tracing initialized");
    }
}

static NEXT_CALL_ID: AtomicU64 = AtomicU64::new(1);

/// Span covering one kernel primitive call. A blocking primitive keeps
/// its span open across the context switches it waits through.
pub struct PrimitiveSpan {
    span: tracing::Span,
    start: Instant,
    primitive: &'static str,
    call_id: u64,
}

impl PrimitiveSpan {
    pub fn new(primitive: &'static str, pid: u32) -> Self {
        let call_id = NEXT_CALL_ID.fetch_add(1, Ordering::Relaxed);
        let span = span!(
            Level::DEBUG,
            "primitive",
            call_id,
            primitive,
            pid,
            result = tracing::field::Empty,
            error = tracing::field::Empty,
            return_value = tracing::field::Empty,
        );

        Self {
            span,
            start: Instant::now(),
            primitive,
            call_id,
        }
    }

    #[cfg(test)]
    fn call_id(&self) -> u64 {
        self.call_id
    }

    /// Record the return value
    pub fn record_return<V: std::fmt::Debug>(&self, value: V) {
        self.span.record("result", "success");
        self.span.record("return_value", format!("{:?}", value).as_str());
    }

    /// Record an error
    pub fn record_error(&self, error: &dyn std::fmt::Display) {
        self.span.record("result", "error");
        self.span.record("error", error.to_string().as_str());
    }
}

impl Drop for PrimitiveSpan {
    fn drop(&mut self) {
        let _entered = self.span.enter();
        debug!(
            call_id = self.call_id,
            primitive = self.primitive,
            host_us = self.start.elapsed().as_micros() as u64,
            "primitive completed"
        );
    }
}

/// Span for a primitive called by `pid`
#[inline]
pub fn span_primitive(primitive: &'static str, pid: u32) -> PrimitiveSpan {
    PrimitiveSpan::new(primitive, pid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_test_tracing() {
        let _ = tracing_subscriber::registry()
            .with(EnvFilter::new("debug"))
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init();
    }

    #[test]
    fn test_primitive_span_ids_increase() {
        init_test_tracing();

        let first = span_primitive("fork", 2);
        first.record_return(3);
        let second = span_primitive("join", 2);
        second.record_error(&"no children");
        assert!(second.call_id() > first.call_id());
    }

    #[test]
    fn test_init_tracing_twice() {
        init_tracing();
        init_tracing();
    }
}
