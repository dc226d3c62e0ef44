//! Sinks - where signpost events are recorded
//!
//! A sink is the only side effect of instrumentation. Recording is
//! fire-and-forget: the tracers never wait on a sink, never retry, and never
//! let a failing sink reach the reducer or the effect it is observing.

use crate::event::{TraceEvent, TraceEventKind};
use std::borrow::Cow;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;

/// Subsystem of the default process sink
pub const DEFAULT_SUBSYSTEM: &str = "composable-signpost";

/// Category of the default process sink
pub const DEFAULT_CATEGORY: &str = "Reducer Instrumentation";

/// Errors a sink may report
///
/// Tracers discard these; they exist so sinks can say what went wrong in
/// their own logs and tests.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The backing recorder cannot be reached
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    /// The event was refused
    #[error("event rejected: {0}")]
    Rejected(String),
}

/// Append-only recording surface for signpost events
///
/// Implementations must tolerate concurrent writers: events from distinct
/// effects arrive from whatever task is polling them.
pub trait Sink: Send + Sync {
    /// Record one event
    ///
    /// # Errors
    ///
    /// Returns a [`SinkError`] if the event could not be recorded. Callers in
    /// this crate drop the error.
    fn record(&self, event: &TraceEvent<'_>) -> Result<(), SinkError>;
}

impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn record(&self, event: &TraceEvent<'_>) -> Result<(), SinkError> {
        (**self).record(event)
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn record(&self, event: &TraceEvent<'_>) -> Result<(), SinkError> {
        (**self).record(event)
    }
}

/// Record an event, discarding errors and panics from the sink
pub(crate) fn record_quietly(sink: &dyn Sink, event: &TraceEvent<'_>) {
    match panic::catch_unwind(AssertUnwindSafe(|| sink.record(event))) {
        Ok(Ok(())) => {},
        Ok(Err(error)) => {
            tracing::trace!(kind = event.kind.as_str(), %error, "Signpost sink failed, event dropped");
        },
        Err(_) => {
            tracing::trace!(kind = event.kind.as_str(), "Signpost sink panicked, event dropped");
        },
    }
}

/// The default process sink: one `tracing` event per signpost
///
/// Dispatches and outputs are logged at `DEBUG`, effect start and end at
/// `INFO`, all under the `composable_signpost` target with the sink's
/// subsystem and category as fields.
///
/// # Example
///
/// ```
/// use composable_signpost::{SignpostConfig, TracingSink};
/// use std::sync::Arc;
///
/// let config = SignpostConfig::default()
///     .with_sink(Arc::new(TracingSink::new("com.example.app", "Checkout")));
/// ```
#[derive(Debug, Clone)]
pub struct TracingSink {
    subsystem: Cow<'static, str>,
    category: Cow<'static, str>,
}

impl TracingSink {
    /// Create a sink keyed by a subsystem/category pair
    #[must_use]
    pub fn new(
        subsystem: impl Into<Cow<'static, str>>,
        category: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            subsystem: subsystem.into(),
            category: category.into(),
        }
    }

    /// The subsystem this sink logs under
    #[must_use]
    pub fn subsystem(&self) -> &str {
        &self.subsystem
    }

    /// The category this sink logs under
    #[must_use]
    pub fn category(&self) -> &str {
        &self.category
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSYSTEM, DEFAULT_CATEGORY)
    }
}

impl Sink for TracingSink {
    fn record(&self, event: &TraceEvent<'_>) -> Result<(), SinkError> {
        let subsystem = self.subsystem.as_ref();
        let category = self.category.as_ref();
        let prefix = event.prefix.rendered();
        let action = event.action;
        let signpost_id = event.signpost_id.map(|id| id.get());
        let kind = event.kind.as_str();

        match event.kind {
            TraceEventKind::ActionDispatched => tracing::debug!(
                target: "composable_signpost",
                subsystem, category, kind, action,
                "Action {prefix}{action}"
            ),
            TraceEventKind::EffectStarted => tracing::info!(
                target: "composable_signpost",
                subsystem, category, kind, action, signpost_id,
                "Effect {prefix}Started from {action}"
            ),
            TraceEventKind::EffectOutput => tracing::debug!(
                target: "composable_signpost",
                subsystem, category, kind, action, signpost_id,
                "Effect Output: {prefix}Output from {action}"
            ),
            TraceEventKind::EffectCompleted => tracing::info!(
                target: "composable_signpost",
                subsystem, category, kind, action, signpost_id,
                "Effect {prefix}Finished"
            ),
            TraceEventKind::EffectCancelled => tracing::info!(
                target: "composable_signpost",
                subsystem, category, kind, action, signpost_id,
                "Effect {prefix}Cancelled"
            ),
        }

        Ok(())
    }
}

/// Sink that discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl Sink for NoopSink {
    fn record(&self, _event: &TraceEvent<'_>) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Sink that forwards every event to several sinks
///
/// Every sink sees every event, even when an earlier one fails. The first
/// error is reported.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn Sink>>,
}

impl FanoutSink {
    /// Create an empty fanout
    #[must_use]
    pub const fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    /// Add a sink
    #[must_use]
    pub fn with(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Number of sinks events are forwarded to
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns true if there is nowhere to forward to
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl std::fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

impl Sink for FanoutSink {
    fn record(&self, event: &TraceEvent<'_>) -> Result<(), SinkError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(error) = sink.record(event) {
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Prefix;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSink(AtomicUsize);

    impl Sink for CountingSink {
        fn record(&self, _event: &TraceEvent<'_>) -> Result<(), SinkError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct RefusingSink;

    impl Sink for RefusingSink {
        fn record(&self, _event: &TraceEvent<'_>) -> Result<(), SinkError> {
            Err(SinkError::Rejected("full".to_string()))
        }
    }

    struct ExplodingSink;

    impl Sink for ExplodingSink {
        #[allow(clippy::panic)]
        fn record(&self, _event: &TraceEvent<'_>) -> Result<(), SinkError> {
            panic!("sink exploded")
        }
    }

    fn dispatched(prefix: &Prefix) -> TraceEvent<'_> {
        TraceEvent {
            kind: TraceEventKind::ActionDispatched,
            prefix,
            action: ".refresh",
            signpost_id: None,
        }
    }

    #[test]
    fn fanout_reaches_every_sink_and_reports_first_error() {
        let counter = Arc::new(CountingSink(AtomicUsize::new(0)));
        let fanout = FanoutSink::new()
            .with(Arc::clone(&counter) as Arc<dyn Sink>)
            .with(Arc::new(RefusingSink))
            .with(Arc::clone(&counter) as Arc<dyn Sink>);

        let prefix = Prefix::default();
        let result = fanout.record(&dispatched(&prefix));

        assert_eq!(result, Err(SinkError::Rejected("full".to_string())));
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
        assert_eq!(fanout.len(), 3);
    }

    #[test]
    fn record_quietly_swallows_errors_and_panics() {
        let prefix = Prefix::new("quiet");
        record_quietly(&RefusingSink, &dispatched(&prefix));
        record_quietly(&ExplodingSink, &dispatched(&prefix));
    }

    #[test]
    fn tracing_sink_never_fails() {
        let prefix = Prefix::new("trace");
        let sink = TracingSink::default();
        assert_eq!(sink.subsystem(), DEFAULT_SUBSYSTEM);
        assert_eq!(sink.category(), DEFAULT_CATEGORY);
        for kind in [
            TraceEventKind::ActionDispatched,
            TraceEventKind::EffectStarted,
            TraceEventKind::EffectOutput,
            TraceEventKind::EffectCompleted,
            TraceEventKind::EffectCancelled,
        ] {
            let event = TraceEvent {
                kind,
                prefix: &prefix,
                action: ".load",
                signpost_id: Some(crate::SignpostId::new(1)),
            };
            assert!(sink.record(&event).is_ok());
        }
    }

    #[test]
    fn tracing_sink_writes_messages() {
        let buffer = Arc::new(Mutex::new(Vec::<u8>::new()));
        let writer = Arc::clone(&buffer);
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || SharedWriter(Arc::clone(&writer)))
            .finish();

        let prefix = Prefix::new("Search");
        tracing::subscriber::with_default(subscriber, || {
            let sink = TracingSink::default();
            let _ = sink.record(&dispatched(&prefix));
            let _ = sink.record(&TraceEvent {
                kind: TraceEventKind::EffectCompleted,
                prefix: &prefix,
                action: ".refresh",
                signpost_id: Some(crate::SignpostId::new(3)),
            });
        });

        let output = buffer
            .lock()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();
        assert!(output.contains("Action [Search] .refresh"));
        assert!(output.contains("Effect [Search] Finished"));
        assert!(output.contains("Reducer Instrumentation"));
    }

    struct SharedWriter(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for SharedWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if let Ok(mut bytes) = self.0.lock() {
                bytes.extend_from_slice(buf);
            }
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
