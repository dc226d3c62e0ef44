//! Reducer instrumentation
//!
//! [`SignpostReducer`] wraps any reducer whose actions implement
//! [`Describe`]. Each invocation formats the action, records
//! `ActionDispatched`, runs the wrapped reducer, and traces every effect it
//! returned with the same prefix and formatted action.

use crate::config::SignpostConfig;
use crate::effect::Signposter;
use composable_signpost_core::describe::Describe;
use composable_signpost_core::effect::Effect;
use composable_signpost_core::format::format_action;
use composable_signpost_core::reducer::Reducer;
use smallvec::SmallVec;
use std::sync::Arc;

/// Reducer wrapper recording signposts for actions and their effects
///
/// State mutation is entirely the wrapped reducer's: the wrapper only reads
/// the action before handing it over.
///
/// # Example
///
/// ```
/// use composable_signpost::{NoopSink, SignpostConfig, SignpostReducer};
/// use composable_signpost_core::describe::{Describe, Shape};
/// use composable_signpost_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
/// use std::sync::Arc;
///
/// enum CounterAction {
///     Increment,
/// }
///
/// impl Describe for CounterAction {
///     fn describe(&self) -> Shape<'_> {
///         Shape::unit("CounterAction", "increment")
///     }
/// }
///
/// struct CounterReducer;
///
/// impl Reducer for CounterReducer {
///     type State = i32;
///     type Action = CounterAction;
///     type Environment = ();
///
///     fn reduce(&self, state: &mut i32, _action: CounterAction, _env: &()) -> SmallVec<[Effect<CounterAction>; 4]> {
///         *state += 1;
///         smallvec![Effect::None]
///     }
/// }
///
/// let reducer = SignpostReducer::new(
///     CounterReducer,
///     SignpostConfig::new("Counter", Arc::new(NoopSink)),
/// );
///
/// let mut state = 0;
/// reducer.reduce(&mut state, CounterAction::Increment, &());
/// assert_eq!(state, 1);
/// ```
#[derive(Debug)]
pub struct SignpostReducer<R> {
    inner: R,
    signposter: Signposter,
}

impl<R> SignpostReducer<R> {
    /// Wrap a reducer
    #[must_use]
    pub fn new(inner: R, config: SignpostConfig) -> Self {
        Self {
            inner,
            signposter: Signposter::new(config),
        }
    }

    /// The wrapped reducer
    #[must_use]
    pub const fn inner(&self) -> &R {
        &self.inner
    }

    /// Unwrap, discarding instrumentation
    #[must_use]
    pub fn into_inner(self) -> R {
        self.inner
    }

    /// The instrumentation context shared with traced effects
    #[must_use]
    pub const fn signposter(&self) -> &Signposter {
        &self.signposter
    }
}

impl<R> Reducer for SignpostReducer<R>
where
    R: Reducer,
    R::Action: Describe + Send + 'static,
{
    type State = R::State;
    type Action = R::Action;
    type Environment = R::Environment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        let action_output: Arc<str> = Arc::from(format_action(&action));

        let span = tracing::trace_span!(
            "signpost.reduce",
            prefix = self.signposter.prefix().name(),
            action = &*action_output,
        );
        let _enter = span.enter();

        self.signposter.action_dispatched(&action_output);

        self.inner
            .reduce(state, action, env)
            .into_iter()
            .map(|effect| self.signposter.trace_effect(effect, Arc::clone(&action_output)))
            .collect()
    }
}

/// Extension trait adding `.signpost(...)` to every reducer
///
/// # Example
///
/// ```ignore
/// use composable_signpost::SignpostExt;
///
/// let reducer = SearchReducer.signpost("Search");
/// ```
pub trait SignpostExt: Reducer + Sized {
    /// Instrument with the given prefix and the default tracing sink
    #[must_use]
    fn signpost(self, prefix: impl Into<String>) -> SignpostReducer<Self> {
        SignpostReducer::new(self, SignpostConfig::default().with_prefix(prefix))
    }

    /// Instrument with explicit configuration
    #[must_use]
    fn signpost_with(self, config: SignpostConfig) -> SignpostReducer<Self> {
        SignpostReducer::new(self, config)
    }
}

impl<R: Reducer> SignpostExt for R {}
