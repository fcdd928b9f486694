//! Queue configuration.
//!
//! [`QueueConfig`] holds the plain settings and can be loaded from JSON.
//! The idle hook is a closure and therefore lives outside of it; see
//! [`crate::QueueBuilder::on_idle`].
//!
//! ## JSON shape
//! ```json
//! { "delay_ms": 250 }
//! ```
//! - `delay_ms` accepts any JSON number. Fractions round to the nearest
//!   millisecond; negative or non-finite values are rejected.
//! - Missing fields take their defaults, unknown fields are rejected.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Callback fired once at the end of every run, whether it drained or broke.
///
/// It marks that a run ended, not that the queue is still idle: a submit
/// landing just before the hook is called starts the next run, and the hook
/// may then see [`SerialQueue::is_processing`](crate::SerialQueue::is_processing)
/// return `true`. It is always called before the run's
/// [`IdleSignal`](crate::IdleSignal) resolves.
pub type IdleHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueueConfig {
    /// Pause inserted after every task, before the next one starts.
    ///
    /// `Duration::ZERO` still yields to the scheduler once between tasks.
    #[serde(rename = "delay_ms", with = "delay_ms")]
    pub delay: Duration,
}

impl QueueConfig {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

mod delay_ms {
    use std::time::Duration;

    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(delay: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(u64::try_from(delay.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        if !raw.is_finite() || raw < 0.0 {
            return Err(D::Error::custom(format!(
                "delay_ms must be a non-negative number, got {raw}"
            )));
        }
        Ok(Duration::from_millis(raw.round() as u64))
    }
}
