//! QueueBuilder: assembles a [`SerialQueue`] and fails fast on setup errors.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;

use super::SerialQueue;
use crate::config::{IdleHook, QueueConfig};
use crate::error::ConfigError;

/// Builder for [`SerialQueue`].
///
/// # Example
/// ```ignore
/// let queue = SerialQueue::builder()
///     .delay(Duration::from_millis(200))
///     .on_idle(|| tracing::info!("all caught up"))
///     .build()?;
/// ```
#[derive(Default)]
pub struct QueueBuilder {
    config: QueueConfig,
    on_idle: Option<IdleHook>,
}

impl QueueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all plain settings at once.
    pub fn config(mut self, config: QueueConfig) -> Self {
        self.config = config;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.config.delay = delay;
        self
    }

    /// Hook called each time a run ends (see [`IdleHook`]).
    pub fn on_idle<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_idle = Some(Arc::new(hook));
        self
    }

    /// Build the queue on the tokio runtime currently in scope.
    ///
    /// # Errors
    /// [`ConfigError::NoRuntime`] when called outside of a runtime.
    pub fn build(self) -> Result<SerialQueue, ConfigError> {
        let runtime = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
        Ok(SerialQueue::from_parts(self.config, self.on_idle, runtime))
    }
}
