//! Processing phase of the queue.

use serde::{Deserialize, Serialize};

/// Where the driver currently is.
///
/// State transitions:
/// - Idle -> Active (a submission finds the queue idle)
/// - Active -> Delaying (the running action settled)
/// - Delaying -> Active (more tasks pending)
/// - Delaying -> Idle (nothing pending)
/// - Active | Delaying -> Breaking (break requested) -> Idle
///
/// There is no terminal state; a queue can be reused for its whole lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Nothing pending, nothing running, no driver alive.
    #[default]
    Idle,

    /// A driver is alive and is (or is about to be) awaiting an action.
    Active,

    /// The last action settled; waiting out the inter-task delay.
    Delaying,

    /// Discarding pending tasks after a break.
    Breaking,
}

impl Phase {
    /// True while a driver owns the queue.
    pub fn is_processing(self) -> bool {
        !matches!(self, Phase::Idle)
    }

    /// Whether a new submission should be enqueued (rather than cancelled
    /// on the spot).
    pub fn accepts_submissions(self) -> bool {
        !matches!(self, Phase::Breaking)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(Phase::Idle, false, true)]
    #[case(Phase::Active, true, true)]
    #[case(Phase::Delaying, true, true)]
    #[case(Phase::Breaking, true, false)]
    fn phase_predicates(#[case] phase: Phase, #[case] processing: bool, #[case] accepts: bool) {
        assert_eq!(phase.is_processing(), processing);
        assert_eq!(phase.accepts_submissions(), accepts);
    }

    #[test]
    fn serializes_as_snake_case() {
        assert_eq!(serde_json::to_string(&Phase::Delaying).unwrap(), "\"delaying\"");
    }
}
