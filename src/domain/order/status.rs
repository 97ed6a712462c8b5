use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Order Status State Machine
// ============================================================================
//
// The transition table and the parent aggregation policy live here as pure
// functions, decoupled from persistence. Every status write in the system
// goes through `can_transition_to`; the parent of a zone order family is
// never set directly, only recomputed via `aggregate_parent_status`.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// The statuses this status may legally move to.
    pub fn allowed_next(self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Preparing, Cancelled],
            Preparing => &[Ready, Cancelled],
            Ready => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        self.allowed_next().contains(&next)
    }

    /// Terminal documents are never rewritten.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recompute a parent's status from the committed statuses of all its
/// children. Pure and deterministic: the same sibling set always yields the
/// same parent status, regardless of the order transitions were applied in.
///
/// Policy, first match wins:
/// - `Cancelled` iff every child is cancelled
/// - `Completed` iff every child is terminal and at least one completed
/// - `Ready` iff every child is ready-or-terminal and at least one is ready
/// - `Preparing` iff at least one child is preparing or ready
/// - `Pending` otherwise
pub fn aggregate_parent_status(children: &[OrderStatus]) -> OrderStatus {
    use OrderStatus::*;

    if children.is_empty() {
        return Pending;
    }

    let all_cancelled = children.iter().all(|s| *s == Cancelled);
    if all_cancelled {
        return Cancelled;
    }

    let all_terminal = children.iter().all(|s| s.is_terminal());
    if all_terminal && children.iter().any(|s| *s == Completed) {
        return Completed;
    }

    let all_ready_or_terminal = children
        .iter()
        .all(|s| matches!(s, Ready | Completed | Cancelled));
    if all_ready_or_terminal && children.iter().any(|s| *s == Ready) {
        return Ready;
    }

    if children.iter().any(|s| matches!(s, Preparing | Ready)) && !all_terminal {
        return Preparing;
    }

    Pending
}
