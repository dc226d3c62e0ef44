//! Effect lifecycle tracing
//!
//! [`SignpostStream`] is a decorator over an effect's action stream. It
//! forwards every poll result untouched and records a signpost at each
//! lifecycle point:
//!
//! | Underlying event            | Signpost          |
//! |-----------------------------|-------------------|
//! | first poll (subscription)   | `EffectStarted`   |
//! | `Poll::Ready(Some(action))` | `EffectOutput`    |
//! | `Poll::Ready(None)`         | `EffectCompleted` |
//! | dropped while running       | `EffectCancelled` |
//!
//! Cancellation in this architecture is dropping: a runtime aborting the task,
//! a superseding dispatch replacing the effect, or teardown. A stream that is
//! dropped before its first poll was never subscribed and records nothing.

use crate::config::SignpostConfig;
use crate::event::{Prefix, SignpostId, TraceEvent, TraceEventKind};
use crate::sink::{Sink, record_quietly};
use composable_signpost_core::effect::{ActionStream, Effect};
use futures::stream::{FusedStream, Stream};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

/// An instrumentation context: prefix and sink
///
/// Shared by a [`SignpostReducer`](crate::SignpostReducer) and every effect it
/// traces. Can also be used directly to trace effects built outside a reducer.
///
/// # Example
///
/// ```
/// use composable_signpost::{NoopSink, SignpostConfig, Signposter};
/// use composable_signpost_core::effect::Effect;
/// use std::sync::Arc;
///
/// let signposter = Signposter::new(
///     SignpostConfig::default().with_prefix("Sync").with_sink(Arc::new(NoopSink)),
/// );
///
/// let effect: Effect<u32> = Effect::Future(Box::pin(async { Some(1) }));
/// let traced = signposter.trace_effect(effect, ".refresh");
/// assert!(matches!(traced, Effect::Stream(_)));
/// ```
pub struct Signposter {
    prefix: Arc<Prefix>,
    sink: Arc<dyn Sink>,
}

impl Signposter {
    /// Create a context from configuration
    ///
    /// The prefix is rendered here, once.
    #[must_use]
    pub fn new(config: SignpostConfig) -> Self {
        Self {
            prefix: Arc::new(Prefix::new(config.prefix)),
            sink: config.sink,
        }
    }

    /// The prefix every event is tagged with
    #[must_use]
    pub fn prefix(&self) -> &Prefix {
        &self.prefix
    }

    /// The sink events are recorded to
    #[must_use]
    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }

    /// Record that an action was dispatched
    pub fn action_dispatched(&self, action_output: &str) {
        record_quietly(
            self.sink.as_ref(),
            &TraceEvent {
                kind: TraceEventKind::ActionDispatched,
                prefix: &self.prefix,
                action: action_output,
                signpost_id: None,
            },
        );
    }

    /// Wrap an effect so its lifecycle is recorded
    ///
    /// Every effect other than `Effect::None` becomes an `Effect::Stream`
    /// yielding exactly the same actions.
    ///
    /// `Effect::None` is returned unchanged and records nothing, not even a
    /// Started/Finished pair. A runtime never subscribes to it, so there is no
    /// lifecycle to observe. Wrap an explicit empty stream with
    /// [`Signposter::trace_stream`] to get that pair anyway.
    #[must_use]
    pub fn trace_effect<Action>(
        &self,
        effect: Effect<Action>,
        action_output: impl Into<Arc<str>>,
    ) -> Effect<Action>
    where
        Action: Send + 'static,
    {
        if effect.is_none() {
            return effect;
        }
        Effect::Stream(Box::pin(
            self.trace_stream(effect.into_stream(), action_output),
        ))
    }

    /// Wrap an action stream so its lifecycle is recorded
    #[must_use]
    pub fn trace_stream<Action>(
        &self,
        stream: ActionStream<Action>,
        action_output: impl Into<Arc<str>>,
    ) -> SignpostStream<Action> {
        let hooks = Hooks {
            sink: Arc::clone(&self.sink),
            prefix: Arc::clone(&self.prefix),
            action: action_output.into(),
            signpost_id: SignpostId::next(),
        };
        SignpostStream::new(stream, hooks)
    }

}

impl Default for Signposter {
    fn default() -> Self {
        Self::new(SignpostConfig::default())
    }
}

impl std::fmt::Debug for Signposter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signposter")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

/// Hook table fired by a [`SignpostStream`]
struct Hooks {
    sink: Arc<dyn Sink>,
    prefix: Arc<Prefix>,
    action: Arc<str>,
    signpost_id: SignpostId,
}

impl Hooks {
    fn fire(&self, kind: TraceEventKind) {
        record_quietly(
            self.sink.as_ref(),
            &TraceEvent {
                kind,
                prefix: &self.prefix,
                action: &self.action,
                signpost_id: Some(self.signpost_id),
            },
        );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Idle,
    Running,
    Finished,
}

/// Action stream that records its own lifecycle
///
/// Created by [`Signposter::trace_stream`] and [`Signposter::trace_effect`].
/// Adds no buffering: each signpost is recorded inside the poll that observed
/// the underlying event, just before the result is handed back.
#[must_use = "streams do nothing unless polled"]
pub struct SignpostStream<Action> {
    inner: ActionStream<Action>,
    hooks: Hooks,
    lifecycle: Lifecycle,
}

impl<Action> SignpostStream<Action> {
    fn new(inner: ActionStream<Action>, hooks: Hooks) -> Self {
        Self {
            inner,
            hooks,
            lifecycle: Lifecycle::Idle,
        }
    }

    /// Correlation id shared by this stream's events
    #[must_use]
    pub const fn signpost_id(&self) -> SignpostId {
        self.hooks.signpost_id
    }

    /// The formatted action this effect was produced by
    #[must_use]
    pub fn action_output(&self) -> &str {
        &self.hooks.action
    }
}

impl<Action> Stream for SignpostStream<Action> {
    type Item = Action;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Action>> {
        let this = &mut *self;
        match this.lifecycle {
            Lifecycle::Finished => return Poll::Ready(None),
            Lifecycle::Idle => {
                this.lifecycle = Lifecycle::Running;
                this.hooks.fire(TraceEventKind::EffectStarted);
            },
            Lifecycle::Running => {},
        }

        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(action)) => {
                this.hooks.fire(TraceEventKind::EffectOutput);
                Poll::Ready(Some(action))
            },
            Poll::Ready(None) => {
                this.lifecycle = Lifecycle::Finished;
                this.hooks.fire(TraceEventKind::EffectCompleted);
                Poll::Ready(None)
            },
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.lifecycle == Lifecycle::Finished {
            (0, Some(0))
        } else {
            self.inner.size_hint()
        }
    }
}

impl<Action> FusedStream for SignpostStream<Action> {
    fn is_terminated(&self) -> bool {
        self.lifecycle == Lifecycle::Finished
    }
}

impl<Action> Drop for SignpostStream<Action> {
    fn drop(&mut self) {
        // A sink panicking while we unwind would abort the process.
        if std::thread::panicking() {
            return;
        }
        if self.lifecycle == Lifecycle::Running {
            self.lifecycle = Lifecycle::Finished;
            self.hooks.fire(TraceEventKind::EffectCancelled);
        }
    }
}

impl<Action> std::fmt::Debug for SignpostStream<Action> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignpostStream")
            .field("prefix", &self.hooks.prefix)
            .field("action", &self.hooks.action)
            .field("signpost_id", &self.hooks.signpost_id)
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

/// Effect-level entry point, mirroring [`SignpostExt`](crate::SignpostExt) for reducers
pub trait EffectSignpostExt<Action> {
    /// Record this effect's lifecycle through `signposter`, tagged with `action_output`
    #[must_use]
    fn signpost(self, signposter: &Signposter, action_output: impl Into<Arc<str>>) -> Effect<Action>;
}

impl<Action> EffectSignpostExt<Action> for Effect<Action>
where
    Action: Send + 'static,
{
    fn signpost(self, signposter: &Signposter, action_output: impl Into<Arc<str>>) -> Effect<Action> {
        signposter.trace_effect(self, action_output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::SinkError;
    use futures::StreamExt;
    use std::sync::Mutex;

    #[derive(Default)]
    struct KindLog(Mutex<Vec<(TraceEventKind, Option<SignpostId>)>>);

    impl KindLog {
        fn kinds(&self) -> Vec<TraceEventKind> {
            self.0
                .lock()
                .map(|events| events.iter().map(|(kind, _)| *kind).collect())
                .unwrap_or_default()
        }
    }

    impl Sink for KindLog {
        fn record(&self, event: &TraceEvent<'_>) -> Result<(), SinkError> {
            if let Ok(mut events) = self.0.lock() {
                events.push((event.kind, event.signpost_id));
            }
            Ok(())
        }
    }

    fn signposter(log: &Arc<KindLog>) -> Signposter {
        Signposter::new(SignpostConfig::default().with_sink(Arc::clone(log) as Arc<dyn Sink>))
    }

    #[tokio::test]
    async fn completed_stream_records_full_lifecycle() {
        let log = Arc::new(KindLog::default());
        let traced = signposter(&log)
            .trace_stream(Box::pin(futures::stream::iter([1, 2, 3])), ".load");

        let items: Vec<i32> = traced.collect().await;

        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(
            log.kinds(),
            vec![
                TraceEventKind::EffectStarted,
                TraceEventKind::EffectOutput,
                TraceEventKind::EffectOutput,
                TraceEventKind::EffectOutput,
                TraceEventKind::EffectCompleted,
            ]
        );
    }

    #[test]
    fn unpolled_stream_records_nothing() {
        let log = Arc::new(KindLog::default());
        let traced = signposter(&log).trace_stream(Box::pin(futures::stream::iter([1])), ".load");
        drop(traced);
        assert!(log.kinds().is_empty());
    }

    #[test]
    fn none_effect_is_untouched() {
        let log = Arc::new(KindLog::default());
        let traced = signposter(&log).trace_effect(Effect::<u8>::None, ".noop");
        assert!(traced.is_none());
        assert!(log.kinds().is_empty());
    }

    #[test]
    fn polling_after_completion_records_nothing_more() {
        let log = Arc::new(KindLog::default());
        let mut traced =
            signposter(&log).trace_stream(Box::pin(futures::stream::empty::<u8>()), ".load");

        let mut task = tokio_test::task::spawn(());
        task.enter(|cx, _| {
            assert_eq!(Pin::new(&mut traced).poll_next(cx), Poll::Ready(None));
            assert_eq!(Pin::new(&mut traced).poll_next(cx), Poll::Ready(None));
        });
        assert!(traced.is_terminated());
        drop(traced);

        assert_eq!(
            log.kinds(),
            vec![TraceEventKind::EffectStarted, TraceEventKind::EffectCompleted]
        );
    }

    #[test]
    fn each_stream_gets_its_own_id() {
        let log = Arc::new(KindLog::default());
        let signposter = signposter(&log);
        let first = signposter.trace_stream(Box::pin(futures::stream::empty::<u8>()), ".a");
        let second = signposter.trace_stream(Box::pin(futures::stream::empty::<u8>()), ".b");
        assert_ne!(first.signpost_id(), second.signpost_id());
        assert_eq!(second.action_output(), ".b");
    }

    #[test]
    fn separate_signposters_never_share_ids() {
        let log = Arc::new(KindLog::default());
        let outer = signposter(&log);
        let inner = signposter(&log);
        let a = outer.trace_stream(Box::pin(futures::stream::empty::<u8>()), ".a");
        let b = inner.trace_stream(Box::pin(futures::stream::empty::<u8>()), ".b");
        assert_ne!(a.signpost_id(), b.signpost_id());
    }

    struct ExplodingSink(std::sync::atomic::AtomicUsize);

    impl Sink for ExplodingSink {
        #[allow(clippy::panic)]
        fn record(&self, event: &TraceEvent<'_>) -> Result<(), SinkError> {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            panic!("sink exploded on {}", event.kind)
        }
    }

    #[test]
    #[allow(clippy::panic)]
    fn panicking_effect_does_not_fire_cancel_while_unwinding() {
        let sink = Arc::new(ExplodingSink(std::sync::atomic::AtomicUsize::new(0)));
        let signposter =
            Signposter::new(SignpostConfig::default().with_sink(Arc::clone(&sink) as Arc<dyn Sink>));

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut traced = signposter.trace_stream(
                Box::pin(futures::stream::poll_fn(|_| -> Poll<Option<u8>> {
                    panic!("effect failed")
                })),
                ".load",
            );
            futures::executor::block_on(traced.next())
        }));

        assert!(outcome.is_err());
        // Only EffectStarted reached the sink.
        assert_eq!(sink.0.load(std::sync::atomic::Ordering::SeqCst), 1);
    }
}
