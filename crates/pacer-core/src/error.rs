use thiserror::Error;

/// Errors raised while building or configuring a queue.
///
/// These are the only errors that reach the caller synchronously; everything
/// a task does wrong is reported through its own ticket.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The queue spawns its driver on the runtime it was built in.
    #[error("no tokio runtime in scope; build the queue from within a runtime")]
    NoRuntime,

    #[error("invalid queue config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Why a ticket did not resolve to a value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskError<E> {
    /// The action ran and returned an error.
    #[error("task failed: {0}")]
    Failed(E),

    /// The action panicked. The queue keeps going.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was still pending when a break was handled and never ran.
    #[error("task cancelled before it ran")]
    Cancelled,
}

impl<E> TaskError<E> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }

    /// The action's own error, if that is what happened.
    pub fn into_failure(self) -> Option<E> {
        match self {
            TaskError::Failed(e) => Some(e),
            _ => None,
        }
    }

    /// Short stable label (snake_case) for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Failed(_) => "task_failed",
            TaskError::Panicked(_) => "task_panicked",
            TaskError::Cancelled => "task_cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TaskError::Failed("boom"), "task_failed", "task failed: boom")]
    #[case(TaskError::Panicked("oops".to_string()), "task_panicked", "task panicked: oops")]
    #[case(TaskError::Cancelled, "task_cancelled", "task cancelled before it ran")]
    fn labels_and_messages(
        #[case] err: TaskError<&'static str>,
        #[case] label: &str,
        #[case] message: &str,
    ) {
        assert_eq!(err.as_label(), label);
        assert_eq!(err.to_string(), message);
    }

    #[test]
    fn only_failures_carry_a_payload() {
        assert_eq!(TaskError::Failed(7).into_failure(), Some(7));
        assert_eq!(TaskError::<i32>::Cancelled.into_failure(), None);
        assert!(TaskError::<i32>::Cancelled.is_cancelled());
        assert!(!TaskError::Failed(7).is_cancelled());
    }
}
