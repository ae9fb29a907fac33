//! Wall-clock budget tracking.
//!
//! Every stage of the pipeline checks the same `Deadline` value before
//! starting new unit work. Centralizing the arithmetic here keeps the
//! time-budget logic from drifting between call sites.

use std::time::{Duration, Instant};

/// A wall-clock cutoff after which a stage must stop initiating new work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Option<Instant>,
}

impl Deadline {
    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Some(Instant::now() + budget),
        }
    }

    /// A deadline that never expires.
    pub fn never() -> Self {
        Self { at: None }
    }

    /// Whether the cutoff has passed.
    pub fn expired(&self) -> bool {
        self.at.map(|at| Instant::now() >= at).unwrap_or(false)
    }

    /// Time left before the cutoff. `None` means unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.at.map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// The earlier of two deadlines (global vs. stage vs. caller-supplied).
    pub fn min(self, other: Deadline) -> Deadline {
        let at = match (self.at, other.at) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        };
        Deadline { at }
    }
}
