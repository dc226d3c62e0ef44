//! # Composable Signpost Core
//!
//! Core traits and types shared by the signpost instrumentation layer.
//!
//! This crate provides the abstractions the instrumentation wraps and the
//! explicit structural description used to render actions for diagnostics.
//!
//! ## Core Concepts
//!
//! - **Reducer**: Function `(State, Action, Environment) → Effects`, mutating state in place
//! - **Effect**: Side effect descriptions, each viewable as a stream of output actions
//! - **Describe**: Explicit structural description of a value (variant, tuple, scalar, opaque)
//! - **`format_action`**: Renders a described value into a compact path string
//!
//! ## Example
//!
//! ```
//! use composable_signpost_core::describe::{Describe, Shape};
//! use composable_signpost_core::format::format_action;
//!
//! enum LoadAction {
//!     Loading,
//!     Success(i32),
//! }
//!
//! impl Describe for LoadAction {
//!     fn describe(&self) -> Shape<'_> {
//!         match self {
//!             Self::Loading => Shape::unit("LoadAction", "loading"),
//!             Self::Success(value) => Shape::case("success", value),
//!         }
//!     }
//! }
//!
//! assert_eq!(format_action(&LoadAction::Loading), ".loading");
//! assert_eq!(format_action(&LoadAction::Success(42)), ".success(42)");
//! ```

pub use smallvec::{SmallVec, smallvec};

/// Structural description of values
pub mod describe;

/// Action formatting from structural descriptions
pub mod format;

/// Reducer module - The core trait for business logic
///
/// Reducers are functions: `(State, Action, Environment) → (State, Effects)`
///
/// They contain all business logic and are deterministic and testable.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait - core abstraction for business logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// # Example
    ///
    /// ```
    /// use composable_signpost_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
    ///
    /// struct CounterReducer;
    ///
    /// impl Reducer for CounterReducer {
    ///     type State = i64;
    ///     type Action = i64;
    ///     type Environment = ();
    ///
    ///     fn reduce(
    ///         &self,
    ///         state: &mut i64,
    ///         action: i64,
    ///         _env: &(),
    ///     ) -> SmallVec<[Effect<i64>; 4]> {
    ///         *state += action;
    ///         smallvec![Effect::None]
    ///     }
    /// }
    ///
    /// let mut state = 1;
    /// let effects = CounterReducer.reduce(&mut state, 2, &());
    /// assert_eq!(state, 3);
    /// assert_eq!(effects.len(), 1);
    /// ```
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// The effects to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - Side effect descriptions
///
/// Effects describe side effects to be performed by the runtime.
/// They are values (not execution). Whatever the variant, an effect can be
/// viewed as a single asynchronous source of output actions with
/// [`Effect::into_stream`], which is what lifecycle instrumentation observes.
pub mod effect {
    use futures::stream::{self, Stream, StreamExt};
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    /// A boxed stream of actions, the common shape of every effect
    pub type ActionStream<Action> = Pin<Box<dyn Stream<Item = Action> + Send>>;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what should happen,
    /// returned from reducers and executed by the runtime.
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Run effects sequentially
        Sequential(Vec<Effect<Action>>),

        /// Delayed action (for timeouts, retries)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>` - if Some, the action is fed back into the reducer
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),

        /// Long-running source of actions
        ///
        /// Every item is fed back into the reducer. Dropping the stream cancels it.
        Stream(ActionStream<Action>),
    }

    // Manual Debug implementation since Future and Stream don't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                },
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
                Effect::Stream(_) => write!(f, "Effect::Stream(<stream>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Returns true for [`Effect::None`]
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }
    }

    impl<Action> Effect<Action>
    where
        Action: Send + 'static,
    {
        /// View this effect as a stream of the actions it produces
        ///
        /// The stream yields exactly the actions the runtime would feed back,
        /// in the same order, and ends when the effect has finished:
        ///
        /// - `None` ends immediately
        /// - `Future` yields its action, if any
        /// - `Delay` yields its action once the duration elapsed
        /// - `Sequential` yields each child's actions in turn
        /// - `Parallel` interleaves children as they become ready
        /// - `Stream` is returned as is
        #[must_use]
        pub fn into_stream(self) -> ActionStream<Action> {
            match self {
                Effect::None => Box::pin(stream::empty()),
                Effect::Parallel(effects) => Box::pin(stream::select_all(
                    effects.into_iter().map(Effect::into_stream),
                )),
                Effect::Sequential(effects) => {
                    Box::pin(stream::iter(effects).flat_map(Effect::into_stream))
                },
                Effect::Delay { duration, action } => Box::pin(stream::once(async move {
                    tokio::time::sleep(duration).await;
                    *action
                })),
                Effect::Future(fut) => {
                    Box::pin(stream::once(fut).filter_map(futures::future::ready))
                },
                Effect::Stream(actions) => actions,
            }
        }
    }
}

/// Environment module - Dependency injection traits
///
/// All external dependencies are abstracted behind traits and injected
/// via the Environment parameter.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// # Examples
    ///
    /// ```ignore
    /// // Production - uses system clock
    /// struct SystemClock;
    /// impl Clock for SystemClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         Utc::now()
    ///     }
    /// }
    ///
    /// // Test - fixed time for deterministic tests
    /// struct FixedClock { time: DateTime<Utc> }
    /// impl Clock for FixedClock {
    ///     fn now(&self) -> DateTime<Utc> {
    ///         self.time
    ///     }
    /// }
    /// ```
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Wall clock backed by [`Utc::now`]
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
