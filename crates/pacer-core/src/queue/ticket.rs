use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::domain::TicketId;
use crate::error::TaskError;

/// Handle on the eventual result of a submitted task.
///
/// Await it to get the action's value, its error, or
/// [`TaskError::Cancelled`] if the task was discarded by a break.
/// Dropping a ticket does not withdraw the task; it still runs in turn.
pub struct Ticket<T, E> {
    id: TicketId,
    rx: oneshot::Receiver<Result<T, TaskError<E>>>,
}

impl<T, E> Ticket<T, E> {
    pub(crate) fn new(id: TicketId, rx: oneshot::Receiver<Result<T, TaskError<E>>>) -> Self {
        Self { id, rx }
    }

    pub fn id(&self) -> TicketId {
        self.id
    }
}

impl<T, E> Future for Ticket<T, E> {
    type Output = Result<T, TaskError<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A dropped sender means the record went away without settling
        // (runtime shutdown); report it like a discarded task.
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(TaskError::Cancelled)))
    }
}

impl<T, E> fmt::Debug for Ticket<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ticket").field("id", &self.id).finish()
    }
}
