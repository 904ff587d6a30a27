//! Runtime Configuration
//!
//! Behavioral switches for the reactive runtime. Configuration is held per
//! thread: effects re-run on the thread that performed the write, so the
//! writer's configuration decides how the re-runs behave.
//!
//! Configuration can be built in code or parsed from JSON:
//!
//! ```rust
//! use trellis_core::config::{ErrorPolicy, RuntimeConfig};
//!
//! let config = RuntimeConfig::from_json(r#"{ "error_policy": "isolate" }"#).unwrap();
//! assert_eq!(config.error_policy, ErrorPolicy::Isolate);
//! assert!(config.prune_stale_dependencies);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What happens when an effect fails while a write is propagating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Stop at the first failing subscriber and return its error from the
    /// write. Subscribers later in the snapshot do not run.
    #[default]
    FailFast,

    /// Log each failure and keep running the remaining subscribers.
    /// The write itself succeeds.
    Isolate,
}

/// Runtime configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Policy applied to effect failures during a trigger.
    pub error_policy: ErrorPolicy,

    /// Drop an effect's previous subscriptions before each run so that its
    /// dependency set is exactly what the latest run read.
    ///
    /// When disabled, subscriptions accumulate across runs and an effect
    /// keeps re-running for fields it no longer reads.
    pub prune_stale_dependencies: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            error_policy: ErrorPolicy::FailFast,
            prune_stale_dependencies: true,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from a JSON document. Missing keys take their
    /// default values.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the error policy.
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }

    /// Enable or disable stale dependency pruning.
    pub fn with_pruning(mut self, enabled: bool) -> Self {
        self.prune_stale_dependencies = enabled;
        self
    }
}
