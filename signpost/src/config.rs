//! Instrumentation configuration
//!
//! A [`SignpostConfig`] names the instrumentation context (its prefix) and the
//! sink events are written to. The sink is always passed in explicitly; the
//! default configuration simply constructs a [`TracingSink`].

use crate::sink::{Sink, TracingSink};
use std::sync::Arc;
use thiserror::Error;

/// Environment variable read by [`SignpostConfig::from_env`]
pub const PREFIX_ENV_VAR: &str = "SIGNPOST_PREFIX";

/// Configuration errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The prefix contains characters that would corrupt log lines
    #[error("invalid signpost prefix {0:?}: control characters are not allowed")]
    InvalidPrefix(String),
}

/// Configuration for a signposted reducer
///
/// # Example
///
/// ```
/// use composable_signpost::{NoopSink, SignpostConfig};
/// use std::sync::Arc;
///
/// let config = SignpostConfig::default()
///     .with_prefix("Search")
///     .with_sink(Arc::new(NoopSink));
///
/// assert_eq!(config.prefix, "Search");
/// ```
#[derive(Clone)]
pub struct SignpostConfig {
    /// Name of the instrumentation context (empty for none)
    pub prefix: String,
    /// Where events are recorded
    pub sink: Arc<dyn Sink>,
}

impl SignpostConfig {
    /// Create a configuration with the given prefix and sink
    #[must_use]
    pub fn new(prefix: impl Into<String>, sink: Arc<dyn Sink>) -> Self {
        Self {
            prefix: prefix.into(),
            sink,
        }
    }

    /// Set the prefix
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the sink
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sink = sink;
        self
    }

    /// Load the prefix from `SIGNPOST_PREFIX`, keeping the default sink
    ///
    /// An unset variable yields the empty prefix.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPrefix`] if the prefix contains control
    /// characters.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through a variable lookup function
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPrefix`] if the prefix contains control
    /// characters.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config = Self::default().with_prefix(lookup(PREFIX_ENV_VAR).unwrap_or_default());
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPrefix`] if the prefix contains control
    /// characters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prefix.chars().any(char::is_control) {
            return Err(ConfigError::InvalidPrefix(self.prefix.clone()));
        }
        Ok(())
    }
}

impl Default for SignpostConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            sink: Arc::new(TracingSink::default()),
        }
    }
}

impl std::fmt::Debug for SignpostConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignpostConfig")
            .field("prefix", &self.prefix)
            .field("sink", &"<dyn Sink>")
            .finish()
    }
}
