//! Cell configuration.

use std::time::Duration;

use smol_str::SmolStr;
use tokio::runtime::Handle;

/// Policy applied to each producer invocation that runs for too long.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// No timeout - the invocation runs until completion or cancellation.
    #[default]
    None,
    /// Cancel the invocation after the specified duration. The generation
    /// resolves as cancelled.
    Cancel(Duration),
    /// Log a warning after the duration but let the invocation continue.
    Warn(Duration),
}

/// Configuration of an [`AsyncUpdatableCache`](crate::AsyncUpdatableCache).
#[derive(Debug, Clone)]
pub struct CellConfig {
    /// Name used in tracing spans and as the `cell` metrics label.
    pub name: SmolStr,
    /// Timeout policy for producer invocations.
    pub timeout_policy: TimeoutPolicy,
    /// Runtime that producer invocations are spawned on.
    /// None means the runtime of the caller that triggers the refresh.
    pub runtime: Option<Handle>,
}

impl Default for CellConfig {
    fn default() -> Self {
        Self {
            name: SmolStr::new_static("freshcell"),
            timeout_policy: TimeoutPolicy::None,
            runtime: None,
        }
    }
}

impl CellConfig {
    /// Create a new builder for CellConfig.
    pub fn builder() -> CellConfigBuilder {
        CellConfigBuilder::default()
    }
}

/// Builder for CellConfig.
#[derive(Debug, Clone, Default)]
pub struct CellConfigBuilder {
    config: CellConfig,
}

impl CellConfigBuilder {
    /// Create a new builder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cell name.
    pub fn name(self, name: impl Into<SmolStr>) -> Self {
        Self {
            config: CellConfig {
                name: name.into(),
                ..self.config
            },
        }
    }

    /// Set timeout policy.
    pub fn timeout_policy(self, policy: TimeoutPolicy) -> Self {
        Self {
            config: CellConfig {
                timeout_policy: policy,
                ..self.config
            },
        }
    }

    /// Set timeout with cancel policy.
    pub fn timeout(self, duration: Duration) -> Self {
        self.timeout_policy(TimeoutPolicy::Cancel(duration))
    }

    /// Spawn producer invocations on the given runtime.
    pub fn runtime(self, handle: Handle) -> Self {
        Self {
            config: CellConfig {
                runtime: Some(handle),
                ..self.config
            },
        }
    }

    /// Build the CellConfig.
    pub fn build(self) -> CellConfig {
        self.config
    }
}
