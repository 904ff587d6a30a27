//! Error types for the reactive runtime.

use thiserror::Error;

use crate::reactive::{ContainerId, SubscriberId};

/// Boxed error returned by fallible effect callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by reads, writes and effect runs.
#[derive(Debug, Error)]
pub enum ReactiveError {
    /// The underlying store refused a write to a sealed field.
    ///
    /// No subscriber is triggered when this is returned.
    #[error("field `{field}` of container {container:?} is read-only")]
    ReadOnlyField {
        /// Container that rejected the write.
        container: ContainerId,
        /// Field that was written.
        field: String,
    },

    /// An effect callback returned an error while running.
    ///
    /// When raised during a trigger, this propagates out of the write that
    /// caused it (under [`ErrorPolicy::FailFast`](crate::config::ErrorPolicy)).
    #[error("effect {effect:?} failed: {source}")]
    EffectFailed {
        /// The effect that failed.
        effect: SubscriberId,
        /// The error returned by the callback.
        #[source]
        source: BoxError,
    },

    /// A runtime configuration could not be parsed.
    #[error("invalid runtime configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl ReactiveError {
    /// Returns the id of the effect that failed, if this is an effect failure.
    ///
    /// For nested failures this is the outermost effect.
    pub fn failed_effect(&self) -> Option<SubscriberId> {
        match self {
            Self::EffectFailed { effect, .. } => Some(*effect),
            _ => None,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;
