//! pacer-core
//!
//! A serial task runner for tokio. Callers submit async actions; the queue
//! runs them one at a time, in submission order, with a configurable pause
//! between them. Useful for putting a single-connection channel or a
//! throttled API behind many uncoordinated callers.
//!
//! # Modules
//! - **domain**: ticket ids and the [`Action`] trait
//! - **queue**: [`SerialQueue`], its [`Phase`] machine, [`Ticket`] and [`IdleSignal`]
//! - **config**: [`QueueConfig`] and the idle hook type
//! - **error**: [`ConfigError`] and per-task [`TaskError`]
//! - **observability**: [`QueueStatus`] snapshots
//!
//! # Example
//! ```no_run
//! use std::time::Duration;
//! use pacer_core::{SerialQueue, TaskError};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let queue = SerialQueue::builder()
//!         .delay(Duration::from_millis(250))
//!         .on_idle(|| println!("queue drained"))
//!         .build()?;
//!
//!     let a = queue.submit(|| async { Ok::<_, String>("first") });
//!     let b = queue.submit(|| async { Err::<&str, _>("second failed".to_string()) });
//!
//!     assert_eq!(a.await, Ok("first"));
//!     assert!(matches!(b.await, Err(TaskError::Failed(_))));
//!
//!     queue.idle_signal().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod observability;
pub mod queue;

pub use config::{IdleHook, QueueConfig};
pub use domain::{Action, TicketId};
pub use error::{ConfigError, TaskError};
pub use observability::{QueueCounts, QueueStatus};
pub use queue::{IdleSignal, Phase, QueueBuilder, SerialQueue, Ticket};

// Lets implementors write `#[pacer_core::async_trait]` without their own
// dependency on the macro crate.
pub use async_trait::async_trait;
