//! Task record: one pending submission and its completion channel.

use std::any::Any;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use super::Ticket;
use crate::domain::{Action, TicketId};
use crate::error::TaskError;

/// How a record settled, as far as the queue cares.
///
/// The value itself only travels to the ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Settled {
    Succeeded,
    Failed,
    Panicked(String),
    /// The action's task was torn down by the runtime before finishing.
    Aborted,
}

/// Type-erased side of a submission.
///
/// The queue owns the record and decides when it runs; the record owns the
/// action and the sender half of the ticket. Exactly one of `run` or
/// `cancel` is called.
#[async_trait]
pub(crate) trait Settle: Send {
    async fn run(self: Box<Self>) -> Settled;

    fn cancel(self: Box<Self>);
}

struct PendingAction<A: Action> {
    action: A,
    tx: oneshot::Sender<Result<A::Output, TaskError<A::Error>>>,
}

#[async_trait]
impl<A: Action> Settle for PendingAction<A> {
    async fn run(self: Box<Self>) -> Settled {
        let PendingAction { action, tx } = *self;

        // Own task, so a panic lands in the JoinError instead of the driver.
        let (result, settled) = match tokio::spawn(action.run()).await {
            Ok(Ok(value)) => (Ok(value), Settled::Succeeded),
            Ok(Err(err)) => (Err(TaskError::Failed(err)), Settled::Failed),
            Err(join) if join.is_panic() => {
                let message = panic_message(join.into_panic());
                (Err(TaskError::Panicked(message.clone())), Settled::Panicked(message))
            }
            Err(_) => (Err(TaskError::Cancelled), Settled::Aborted),
        };

        // The submitter may have dropped its ticket; that is fine.
        let _ = tx.send(result);
        settled
    }

    fn cancel(self: Box<Self>) {
        let _ = self.tx.send(Err(TaskError::Cancelled));
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// A submission waiting in (or just taken from) the pending list.
pub(crate) struct TaskRecord {
    pub id: TicketId,
    pub enqueued_at: DateTime<Utc>,
    job: Box<dyn Settle>,
}

impl TaskRecord {
    /// Wrap an action and hand back the ticket that observes it.
    pub fn new<A: Action>(action: A) -> (Self, Ticket<A::Output, A::Error>) {
        let id = TicketId::generate();
        let (tx, rx) = oneshot::channel();
        let record = Self {
            id,
            enqueued_at: Utc::now(),
            job: Box::new(PendingAction { action, tx }),
        };
        (record, Ticket::new(id, rx))
    }

    /// Milliseconds spent in the pending list so far.
    pub fn waited_ms(&self) -> i64 {
        (Utc::now() - self.enqueued_at).num_milliseconds()
    }

    pub async fn run(self) -> Settled {
        self.job.run().await
    }

    pub fn cancel(self) {
        self.job.cancel();
    }
}
