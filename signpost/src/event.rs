//! Signpost events and the prefix that tags them

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Rendering of an empty prefix
///
/// Trace viewers show an empty argument as "N/A"; a zero-width space keeps
/// the column visually blank instead.
pub const ZERO_WIDTH_SPACE: &str = "\u{200B}";

/// Caller-supplied tag naming an instrumentation context
///
/// The rendered form is computed once, when the prefix is created:
/// `"[name] "` for a non-empty name, [`ZERO_WIDTH_SPACE`] otherwise.
///
/// # Example
///
/// ```
/// use composable_signpost::{Prefix, ZERO_WIDTH_SPACE};
///
/// assert_eq!(Prefix::new("Search").rendered(), "[Search] ");
/// assert_eq!(Prefix::new("").rendered(), ZERO_WIDTH_SPACE);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix {
    name: String,
    rendered: Arc<str>,
}

impl Prefix {
    /// Create a prefix from its name
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let rendered: Arc<str> = if name.is_empty() {
            Arc::from(ZERO_WIDTH_SPACE)
        } else {
            Arc::from(format!("[{name}] "))
        };
        Self { name, rendered }
    }

    /// The name as supplied by the caller
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The form written in front of every message
    #[must_use]
    pub fn rendered(&self) -> &str {
        &self.rendered
    }

    /// Returns true if no name was supplied
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

impl Default for Prefix {
    fn default() -> Self {
        Self::new(String::new())
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rendered)
    }
}

/// The lifecycle point a [`TraceEvent`] marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TraceEventKind {
    /// An action reached the reducer
    ActionDispatched,
    /// An effect was subscribed to
    EffectStarted,
    /// An effect emitted an action
    EffectOutput,
    /// An effect finished normally
    EffectCompleted,
    /// An effect was dropped before finishing
    EffectCancelled,
}

impl TraceEventKind {
    /// Stable name used in logs and metrics
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ActionDispatched => "action_dispatched",
            Self::EffectStarted => "effect_started",
            Self::EffectOutput => "effect_output",
            Self::EffectCompleted => "effect_completed",
            Self::EffectCancelled => "effect_cancelled",
        }
    }

    /// Returns true for the events that end an effect's lifecycle
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::EffectCompleted | Self::EffectCancelled)
    }

    /// Returns true for events belonging to an effect
    #[must_use]
    pub const fn is_effect(self) -> bool {
        !matches!(self, Self::ActionDispatched)
    }
}

impl fmt::Display for TraceEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of process-wide unique signpost ids
static NEXT_SIGNPOST_ID: AtomicU64 = AtomicU64::new(1);

/// Correlates every event of one traced effect instance
///
/// Ids handed out by [`SignpostId::next`] are unique across every tracer in
/// the process, so stacked or sibling tracers sharing a sink never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SignpostId(u64);

impl SignpostId {
    /// Wrap a raw id
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocate a fresh id, never handed out before in this process
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SIGNPOST_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// The raw id
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SignpostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One diagnostic event handed to a [`Sink`](crate::Sink)
#[derive(Debug, Clone, Copy)]
pub struct TraceEvent<'a> {
    /// Which lifecycle point this is
    pub kind: TraceEventKind,
    /// Prefix of the instrumentation context
    pub prefix: &'a Prefix,
    /// The formatted action that was dispatched (or that produced the effect)
    pub action: &'a str,
    /// Effect correlation id; `None` for [`TraceEventKind::ActionDispatched`]
    pub signpost_id: Option<SignpostId>,
}
