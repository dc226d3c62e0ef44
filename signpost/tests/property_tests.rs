//! Property tests: instrumentation never changes what an effect emits

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)] // Test code can use unwrap/expect/panic

use composable_signpost::{SignpostConfig, Signposter, TraceEventKind};
use composable_signpost_testing::properties::{EffectScript, effect_script};
use composable_signpost_testing::{RecordingSink, assertions};
use futures::StreamExt;
use futures::executor::block_on;
use proptest::prelude::*;
use std::sync::Arc;

/// Run a script through a traced stream, returning what the consumer saw
fn play(script: &EffectScript, sink: &Arc<RecordingSink>) -> Vec<u16> {
    let signposter = Signposter::new(SignpostConfig::new("Prop", Arc::clone(sink) as _));
    let mut traced = signposter.trace_stream(
        Box::pin(futures::stream::iter(script.outputs.clone())),
        ".play",
    );

    block_on(async {
        let mut seen = Vec::new();
        let limit = if script.cancels() {
            script.cancel_after.unwrap_or_default()
        } else {
            usize::MAX
        };
        while seen.len() < limit {
            match traced.next().await {
                Some(value) => seen.push(value),
                None => break,
            }
        }
        drop(traced);
        seen
    })
}

proptest! {
    #[test]
    fn traced_stream_delivers_the_same_values(script in effect_script()) {
        let sink = Arc::new(RecordingSink::new());
        let seen = play(&script, &sink);
        prop_assert_eq!(seen.as_slice(), script.delivered());
    }

    #[test]
    fn traced_stream_lifecycle_is_well_formed(script in effect_script()) {
        let sink = Arc::new(RecordingSink::new());
        let seen = play(&script, &sink);
        let records = sink.records();

        assertions::assert_well_formed(&records);

        if script.cancel_after == Some(0) && script.cancels() {
            // Dropped before it was ever polled.
            prop_assert!(records.is_empty());
        } else {
            let terminal = if script.cancels() {
                TraceEventKind::EffectCancelled
            } else {
                TraceEventKind::EffectCompleted
            };
            assertions::assert_lifecycle(&records, seen.len(), terminal);
        }
    }
}
