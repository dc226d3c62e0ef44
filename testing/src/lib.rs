//! # Composable Signpost Testing
//!
//! Testing utilities for signpost instrumentation.
//!
//! This crate provides:
//! - `RecordingSink`: captures every event for later inspection
//! - `FailingSink` / `PanickingSink`: sinks that misbehave on purpose
//! - Lifecycle assertions over recorded events
//! - `ReducerTest`: Given-When-Then builder that instruments and drives a reducer
//! - Deterministic clock and proptest strategies
//!
//! ## Example
//!
//! ```ignore
//! use composable_signpost_testing::{RecordingSink, assertions};
//!
//! let sink = Arc::new(RecordingSink::new());
//! let reducer = SearchReducer.signpost_with(
//!     SignpostConfig::new("Search", sink.clone()),
//! );
//!
//! // ... dispatch and drive effects ...
//!
//! assertions::assert_well_formed(&sink.records());
//! ```

use chrono::{DateTime, Utc};
use composable_signpost_core::environment::Clock;


pub use reducer_test::ReducerTest;

/// Mock implementations
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use composable_signpost::{SignpostId, Sink, SinkError, TraceEvent, TraceEventKind};
    use composable_signpost_core::environment::SystemClock;
    use serde::{Deserialize, Serialize};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use composable_signpost_testing::mocks::FixedClock;
    /// use composable_signpost_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// let time1 = clock.now();
    /// let time2 = clock.now();
    /// assert_eq!(time1, time2); // Always the same!
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// One recorded signpost, owned
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TraceRecord {
        /// Lifecycle point
        pub kind: TraceEventKind,
        /// Rendered prefix, exactly as written in front of log messages
        pub prefix: String,
        /// Formatted action
        pub action: String,
        /// Effect correlation id
        pub signpost_id: Option<SignpostId>,
        /// When the sink received the event
        pub recorded_at: DateTime<Utc>,
    }

    /// Sink capturing every event in memory
    ///
    /// # Example
    ///
    /// ```
    /// use composable_signpost::{Prefix, Sink, TraceEvent, TraceEventKind};
    /// use composable_signpost_testing::RecordingSink;
    ///
    /// let sink = RecordingSink::new();
    /// let prefix = Prefix::new("Feed");
    /// let _ = sink.record(&TraceEvent {
    ///     kind: TraceEventKind::ActionDispatched,
    ///     prefix: &prefix,
    ///     action: ".refresh",
    ///     signpost_id: None,
    /// });
    ///
    /// assert_eq!(sink.kinds(), vec![TraceEventKind::ActionDispatched]);
    /// assert_eq!(sink.records()[0].prefix, "[Feed] ");
    /// ```
    pub struct RecordingSink {
        records: Mutex<Vec<TraceRecord>>,
        clock: Arc<dyn Clock>,
    }

    impl RecordingSink {
        /// Create a sink timestamping with the system clock
        #[must_use]
        pub fn new() -> Self {
            Self::with_clock(Arc::new(SystemClock))
        }

        /// Create a sink timestamping with the given clock
        #[must_use]
        pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
            Self {
                records: Mutex::new(Vec::new()),
                clock,
            }
        }

        fn guard(&self) -> MutexGuard<'_, Vec<TraceRecord>> {
            self.records.lock().unwrap_or_else(PoisonError::into_inner)
        }

        /// Every event recorded so far, in arrival order
        #[must_use]
        pub fn records(&self) -> Vec<TraceRecord> {
            self.guard().clone()
        }

        /// The kinds of every event recorded so far
        #[must_use]
        pub fn kinds(&self) -> Vec<TraceEventKind> {
            self.guard().iter().map(|record| record.kind).collect()
        }

        /// Events of one effect instance
        #[must_use]
        pub fn for_signpost(&self, id: SignpostId) -> Vec<TraceRecord> {
            self.guard()
                .iter()
                .filter(|record| record.signpost_id == Some(id))
                .cloned()
                .collect()
        }

        /// Distinct effect ids, in order of first appearance
        #[must_use]
        pub fn signpost_ids(&self) -> Vec<SignpostId> {
            let mut ids = Vec::new();
            for id in self.guard().iter().filter_map(|record| record.signpost_id) {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            }
            ids
        }

        /// Number of recorded events
        #[must_use]
        pub fn len(&self) -> usize {
            self.guard().len()
        }

        /// Returns true if nothing was recorded
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.guard().is_empty()
        }

        /// Forget everything recorded so far
        pub fn clear(&self) {
            self.guard().clear();
        }
    }

    impl Default for RecordingSink {
        fn default() -> Self {
            Self::new()
        }
    }

    impl std::fmt::Debug for RecordingSink {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("RecordingSink")
                .field("records", &self.len())
                .finish_non_exhaustive()
        }
    }

    impl Sink for RecordingSink {
        fn record(&self, event: &TraceEvent<'_>) -> Result<(), SinkError> {
            let record = TraceRecord {
                kind: event.kind,
                prefix: event.prefix.rendered().to_string(),
                action: event.action.to_string(),
                signpost_id: event.signpost_id,
                recorded_at: self.clock.now(),
            };
            self.guard().push(record);
            Ok(())
        }
    }

    /// Sink that refuses every event
    #[derive(Debug, Default)]
    pub struct FailingSink {
        attempts: AtomicUsize,
    }

    impl FailingSink {
        /// Create a failing sink
        #[must_use]
        pub const fn new() -> Self {
            Self {
                attempts: AtomicUsize::new(0),
            }
        }

        /// How many events were offered to this sink
        #[must_use]
        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl Sink for FailingSink {
        fn record(&self, _event: &TraceEvent<'_>) -> Result<(), SinkError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(SinkError::Unavailable("trace viewer disconnected".to_string()))
        }
    }

    /// Sink that panics on every event
    #[derive(Debug, Default)]
    pub struct PanickingSink {
        attempts: AtomicUsize,
    }

    impl PanickingSink {
        /// Create a panicking sink
        #[must_use]
        pub const fn new() -> Self {
            Self {
                attempts: AtomicUsize::new(0),
            }
        }

        /// How many events were offered to this sink
        #[must_use]
        pub fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    impl Sink for PanickingSink {
        #[allow(clippy::panic)] // Misbehaving on purpose
        fn record(&self, event: &TraceEvent<'_>) -> Result<(), SinkError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            panic!("sink panicked on {}", event.kind)
        }
    }
}

/// Assertions over recorded signposts
pub mod assertions {
    use super::mocks::TraceRecord;
    use composable_signpost::{SignpostId, TraceEventKind};

    /// Assert one effect's events are `Started`, `outputs` × `Output`, then `terminal`
    ///
    /// # Panics
    ///
    /// Panics if the sequence differs.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_lifecycle(records: &[TraceRecord], outputs: usize, terminal: TraceEventKind) {
        let kinds: Vec<_> = records.iter().map(|record| record.kind).collect();
        let mut expected = Vec::with_capacity(outputs + 2);
        expected.push(TraceEventKind::EffectStarted);
        expected.extend(std::iter::repeat_n(TraceEventKind::EffectOutput, outputs));
        expected.push(terminal);
        assert_eq!(kinds, expected, "unexpected lifecycle for {records:?}");
    }

    /// Assert every effect's events form a valid lifecycle
    ///
    /// For each signpost id: exactly one `Started`, first; any number of
    /// `Output`; at most one terminal event, last. Effects still running
    /// (no terminal yet) are accepted.
    ///
    /// # Panics
    ///
    /// Panics on the first malformed lifecycle.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_well_formed(records: &[TraceRecord]) {
        let mut ids: Vec<SignpostId> = Vec::new();
        for record in records {
            if let Some(id) = record.signpost_id {
                if !ids.contains(&id) {
                    ids.push(id);
                }
            } else {
                assert_eq!(
                    record.kind,
                    TraceEventKind::ActionDispatched,
                    "effect event without signpost id: {record:?}"
                );
            }
        }

        for id in ids {
            let kinds: Vec<_> = records
                .iter()
                .filter(|record| record.signpost_id == Some(id))
                .map(|record| record.kind)
                .collect();

            assert_eq!(
                kinds.first(),
                Some(&TraceEventKind::EffectStarted),
                "signpost {id} does not start with EffectStarted: {kinds:?}"
            );

            for (idx, kind) in kinds.iter().enumerate().skip(1) {
                match kind {
                    TraceEventKind::EffectOutput => {},
                    TraceEventKind::EffectCompleted | TraceEventKind::EffectCancelled => {
                        assert_eq!(
                            idx,
                            kinds.len() - 1,
                            "signpost {id} has events after {kind}: {kinds:?}"
                        );
                    },
                    other => panic!("signpost {id} has unexpected {other} at {idx}: {kinds:?}"),
                }
            }
        }
    }

    /// Assert the dispatched actions, in order
    ///
    /// # Panics
    ///
    /// Panics if the formatted actions of `ActionDispatched` events differ.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_dispatched(records: &[TraceRecord], expected: &[&str]) {
        let dispatched: Vec<_> = records
            .iter()
            .filter(|record| record.kind == TraceEventKind::ActionDispatched)
            .map(|record| record.action.as_str())
            .collect();
        assert_eq!(dispatched, expected);
    }
}

/// Property-based testing utilities
pub mod properties {
    use proptest::prelude::*;

    /// A scripted effect: the actions it emits and when (if ever) it is dropped
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct EffectScript {
        /// Actions emitted, in order
        pub outputs: Vec<u16>,
        /// Drop the effect after this many outputs, if less than `outputs.len()`
        pub cancel_after: Option<usize>,
    }

    impl EffectScript {
        /// Whether the script drops the effect before it finishes
        #[must_use]
        pub fn cancels(&self) -> bool {
            self.cancel_after
                .is_some_and(|after| after < self.outputs.len())
        }

        /// Outputs delivered before the effect ends
        #[must_use]
        pub fn delivered(&self) -> &[u16] {
            match self.cancel_after {
                Some(after) if after < self.outputs.len() => &self.outputs[..after],
                _ => &self.outputs,
            }
        }
    }

    /// Strategy producing effect scripts of up to 32 outputs
    pub fn effect_script() -> impl Strategy<Value = EffectScript> {
        (
            proptest::collection::vec(any::<u16>(), 0..32),
            proptest::option::of(0_usize..40),
        )
            .prop_map(|(outputs, cancel_after)| EffectScript {
                outputs,
                cancel_after,
            })
    }
}

/// Install a `tracing` subscriber honouring `RUST_LOG`, once per process
///
/// Handy when debugging a test that goes through the default `TracingSink`.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// Re-export commonly used items
pub use mocks::{FailingSink, FixedClock, PanickingSink, RecordingSink, TraceRecord, test_clock};

#[cfg(test)]
mod tests {
    use super::*;
    use composable_signpost::{Prefix, SignpostId, Sink, TraceEvent, TraceEventKind};
    use std::sync::Arc;

    fn record(sink: &RecordingSink, kind: TraceEventKind, id: Option<u64>) {
        let prefix = Prefix::new("T");
        let _ = sink.record(&TraceEvent {
            kind,
            prefix: &prefix,
            action: ".tick",
            signpost_id: id.map(SignpostId::new),
        });
    }

    #[test]
    fn test_fixed_clock() {
        let clock = test_clock();
        let time1 = clock.now();
        let time2 = clock.now();
        assert_eq!(time1, time2);
    }

    #[test]
    fn test_recording_sink_uses_clock() {
        let sink = RecordingSink::with_clock(Arc::new(test_clock()));
        record(&sink, TraceEventKind::ActionDispatched, None);

        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].recorded_at, test_clock().now());
        assert_eq!(records[0].prefix, "[T] ");
        assert_eq!(records[0].action, ".tick");
    }

    #[test]
    fn test_recording_sink_groups_by_signpost() {
        let sink = RecordingSink::new();
        record(&sink, TraceEventKind::EffectStarted, Some(2));
        record(&sink, TraceEventKind::EffectStarted, Some(1));
        record(&sink, TraceEventKind::EffectCompleted, Some(2));

        assert_eq!(sink.signpost_ids(), vec![SignpostId::new(2), SignpostId::new(1)]);
        assert_eq!(sink.for_signpost(SignpostId::new(2)).len(), 2);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_failing_sinks_count_attempts() {
        let failing = mocks::FailingSink::new();
        let prefix = Prefix::default();
        let event = TraceEvent {
            kind: TraceEventKind::EffectOutput,
            prefix: &prefix,
            action: "",
            signpost_id: Some(SignpostId::new(1)),
        };
        assert!(failing.record(&event).is_err());
        assert_eq!(failing.attempts(), 1);
    }

    #[test]
    fn test_assert_well_formed_accepts_running_effects() {
        let sink = RecordingSink::new();
        record(&sink, TraceEventKind::ActionDispatched, None);
        record(&sink, TraceEventKind::EffectStarted, Some(1));
        record(&sink, TraceEventKind::EffectOutput, Some(1));
        record(&sink, TraceEventKind::EffectStarted, Some(2));
        record(&sink, TraceEventKind::EffectCompleted, Some(1));

        assertions::assert_well_formed(&sink.records());
        assertions::assert_lifecycle(
            &sink.for_signpost(SignpostId::new(1)),
            1,
            TraceEventKind::EffectCompleted,
        );
        assertions::assert_dispatched(&sink.records(), &[".tick"]);
    }

    #[test]
    #[should_panic(expected = "has events after")]
    fn test_assert_well_formed_rejects_events_after_terminal() {
        let sink = RecordingSink::new();
        record(&sink, TraceEventKind::EffectStarted, Some(1));
        record(&sink, TraceEventKind::EffectCancelled, Some(1));
        record(&sink, TraceEventKind::EffectOutput, Some(1));
        assertions::assert_well_formed(&sink.records());
    }

    #[test]
    fn test_records_serialize() {
        let sink = RecordingSink::with_clock(Arc::new(test_clock()));
        record(&sink, TraceEventKind::EffectStarted, Some(9));
        let json = serde_json::to_value(sink.records()).unwrap_or_default();
        assert_eq!(json[0]["kind"], "EffectStarted");
        assert_eq!(json[0]["signpost_id"], 9);
    }

    #[test]
    fn test_effect_script_delivered() {
        let script = properties::EffectScript {
            outputs: vec![1, 2, 3],
            cancel_after: Some(1),
        };
        assert!(script.cancels());
        assert_eq!(script.delivered(), &[1]);

        let script = properties::EffectScript {
            outputs: vec![1, 2, 3],
            cancel_after: Some(3),
        };
        assert!(!script.cancels());
        assert_eq!(script.delivered(), &[1, 2, 3]);
    }
}
