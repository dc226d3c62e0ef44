//! Metrics sink
//!
//! Turns signposts into `metrics` counters, an in-flight gauge and an effect
//! lifetime histogram, so long-lived or leaked effects show up on dashboards
//! and not only in logs.
//!
//! | Metric                               | Type      | Labels              |
//! |--------------------------------------|-----------|---------------------|
//! | `signpost.actions.dispatched`        | counter   | `prefix`            |
//! | `signpost.effects.started`           | counter   | `prefix`            |
//! | `signpost.effects.outputs`           | counter   | `prefix`            |
//! | `signpost.effects.completed`         | counter   | `prefix`            |
//! | `signpost.effects.cancelled`         | counter   | `prefix`            |
//! | `signpost.effects.in_flight`         | gauge     | `prefix`            |
//! | `signpost.effects.duration_seconds`  | histogram | `prefix`, `outcome` |
//!
//! Without an installed recorder the macros are no-ops.

use crate::event::{SignpostId, TraceEvent, TraceEventKind};
use crate::sink::{Sink, SinkError};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Instant;

/// Register descriptions for every signpost metric
///
/// Call once after installing a recorder.
pub fn describe_metrics() {
    describe_counter!("signpost.actions.dispatched", "Actions dispatched to signposted reducers");
    describe_counter!("signpost.effects.started", "Effects subscribed to");
    describe_counter!("signpost.effects.outputs", "Actions emitted by effects");
    describe_counter!("signpost.effects.completed", "Effects that finished normally");
    describe_counter!("signpost.effects.cancelled", "Effects dropped before finishing");
    describe_gauge!("signpost.effects.in_flight", "Effects started but not yet finished");
    describe_histogram!(
        "signpost.effects.duration_seconds",
        metrics::Unit::Seconds,
        "Time from effect start to completion or cancellation"
    );
}

/// Sink recording signposts as metrics
#[derive(Debug, Default)]
pub struct MetricsSink {
    started: Mutex<HashMap<SignpostId, Instant>>,
}

impl MetricsSink {
    /// Create a metrics sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of effects started and not yet finished
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.started.lock().map_or(0, |started| started.len())
    }

    fn lock_started(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<SignpostId, Instant>>, SinkError> {
        self.started
            .lock()
            .map_err(|_| SinkError::Unavailable("metrics sink state poisoned".to_string()))
    }
}

impl Sink for MetricsSink {
    fn record(&self, event: &TraceEvent<'_>) -> Result<(), SinkError> {
        let prefix = event.prefix.name().to_string();

        match event.kind {
            TraceEventKind::ActionDispatched => {
                counter!("signpost.actions.dispatched", "prefix" => prefix).increment(1);
            },
            TraceEventKind::EffectStarted => {
                counter!("signpost.effects.started", "prefix" => prefix.clone()).increment(1);
                gauge!("signpost.effects.in_flight", "prefix" => prefix).increment(1.0);
                if let Some(id) = event.signpost_id {
                    self.lock_started()?.insert(id, Instant::now());
                }
            },
            TraceEventKind::EffectOutput => {
                counter!("signpost.effects.outputs", "prefix" => prefix).increment(1);
            },
            TraceEventKind::EffectCompleted | TraceEventKind::EffectCancelled => {
                let (name, outcome) = if event.kind == TraceEventKind::EffectCompleted {
                    ("signpost.effects.completed", "completed")
                } else {
                    ("signpost.effects.cancelled", "cancelled")
                };
                counter!(name, "prefix" => prefix.clone()).increment(1);
                gauge!("signpost.effects.in_flight", "prefix" => prefix.clone()).decrement(1.0);

                let started = match event.signpost_id {
                    Some(id) => self.lock_started()?.remove(&id),
                    None => None,
                };
                if let Some(started) = started {
                    histogram!(
                        "signpost.effects.duration_seconds",
                        "prefix" => prefix,
                        "outcome" => outcome
                    )
                    .record(started.elapsed().as_secs_f64());
                }
            },
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Prefix;

    fn event(kind: TraceEventKind, prefix: &Prefix, id: u64) -> TraceEvent<'_> {
        TraceEvent {
            kind,
            prefix,
            action: ".load",
            signpost_id: Some(SignpostId::new(id)),
        }
    }

    #[test]
    fn tracks_in_flight_effects() {
        let sink = MetricsSink::new();
        let prefix = Prefix::new("Feed");

        assert!(sink.record(&event(TraceEventKind::EffectStarted, &prefix, 1)).is_ok());
        assert!(sink.record(&event(TraceEventKind::EffectStarted, &prefix, 2)).is_ok());
        assert!(sink.record(&event(TraceEventKind::EffectOutput, &prefix, 1)).is_ok());
        assert_eq!(sink.in_flight(), 2);

        assert!(sink.record(&event(TraceEventKind::EffectCompleted, &prefix, 1)).is_ok());
        assert_eq!(sink.in_flight(), 1);

        assert!(sink.record(&event(TraceEventKind::EffectCancelled, &prefix, 2)).is_ok());
        assert_eq!(sink.in_flight(), 0);
    }

    #[test]
    fn dispatch_does_not_touch_in_flight() {
        let sink = MetricsSink::new();
        let prefix = Prefix::default();
        let dispatched = TraceEvent {
            kind: TraceEventKind::ActionDispatched,
            prefix: &prefix,
            action: ".refresh",
            signpost_id: None,
        };
        assert!(sink.record(&dispatched).is_ok());
        assert_eq!(sink.in_flight(), 0);
        describe_metrics();
    }

    #[test]
    fn shared_sink_tracks_effects_from_separate_signposters() {
        use crate::config::SignpostConfig;
        use crate::effect::Signposter;
        use futures::Stream;
        use std::pin::Pin;
        use std::sync::Arc;

        let sink = Arc::new(MetricsSink::new());
        let config = || SignpostConfig::new("Feed", Arc::clone(&sink) as Arc<dyn Sink>);
        let (outer, inner) = (Signposter::new(config()), Signposter::new(config()));

        let mut a = outer.trace_stream(Box::pin(futures::stream::pending::<u8>()), ".a");
        let mut b = inner.trace_stream(Box::pin(futures::stream::pending::<u8>()), ".b");
        assert_ne!(a.signpost_id(), b.signpost_id());

        let mut task = tokio_test::task::spawn(());
        task.enter(|cx, _| {
            assert!(Pin::new(&mut a).poll_next(cx).is_pending());
            assert!(Pin::new(&mut b).poll_next(cx).is_pending());
        });
        assert_eq!(sink.in_flight(), 2);

        drop(a);
        assert_eq!(sink.in_flight(), 1);
        drop(b);
        assert_eq!(sink.in_flight(), 0);
    }
}
