//! # Composable Signpost
//!
//! Lifecycle instrumentation for reducers and their effects.
//!
//! Wrapping a reducer records a signpost every time an action is dispatched
//! and at every stage of each effect the reducer returns: started, each
//! output, finished or cancelled. Effects that never finish are easy to spot,
//! for example a long-lived subscription started on appear and never torn
//! down on disappear.
//!
//! Instrumentation is strictly observational. Traced effects emit the same
//! actions in the same order and end the same way, and a failing sink is
//! ignored.
//!
//! ## Core Components
//!
//! - **`SignpostReducer`**: Reducer decorator recording dispatches and tracing effects
//! - **`SignpostStream`**: Effect decorator recording start/output/finish/cancel
//! - **`Sink`**: Where events go (`TracingSink` by default, `MetricsSink`, `FanoutSink`)
//! - **`SignpostConfig`**: Prefix and sink, always injected explicitly
//!
//! ## Example
//!
//! ```ignore
//! use composable_signpost::{Describe, SignpostConfig, SignpostExt};
//!
//! #[derive(Describe, Clone, Debug)]
//! #[describe(rename_all = "camelCase")]
//! enum SearchAction {
//!     QueryChanged(String),
//!     Response(Result<Vec<Item>, SearchError>),
//! }
//!
//! // Logs "Action [Search] .queryChanged(rust)" on dispatch, then
//! // "Effect [Search] Started from .queryChanged(rust)", one
//! // "Effect Output: ..." per response, and "Effect [Search] Finished".
//! let reducer = SearchReducer.signpost("Search");
//!
//! // Or route events somewhere else:
//! let reducer = SearchReducer.signpost_with(
//!     SignpostConfig::default()
//!         .with_prefix("Search")
//!         .with_sink(Arc::new(MetricsSink::new())),
//! );
//! ```

/// Instrumentation configuration
pub mod config;

/// Effect lifecycle tracing
pub mod effect;

/// Signpost events
pub mod event;

/// Metrics sink
pub mod metrics;

/// Reducer instrumentation
pub mod reducer;

/// Event sinks
pub mod sink;

pub use composable_signpost_core::describe::Describe;
pub use composable_signpost_core::format::format_action;
pub use composable_signpost_macros::Describe;

pub use config::{ConfigError, PREFIX_ENV_VAR, SignpostConfig};
pub use effect::{EffectSignpostExt, SignpostStream, Signposter};
pub use event::{Prefix, SignpostId, TraceEvent, TraceEventKind, ZERO_WIDTH_SPACE};
pub use crate::metrics::MetricsSink;
pub use reducer::{SignpostExt, SignpostReducer};
pub use sink::{
    DEFAULT_CATEGORY, DEFAULT_SUBSYSTEM, FanoutSink, NoopSink, Sink, SinkError, TracingSink,
};
