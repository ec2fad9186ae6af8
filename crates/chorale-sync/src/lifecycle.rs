//! Session lifecycle state machine.
//!
//! `waiting → active ⇄ paused → completed`, with `completed` absorbing.
//! Only [`SessionStatus::apply`] moves the status; denormalized fields
//! such as the sentence cursor are updated by the dispatcher even when
//! the formal transition is rejected (the server does not gate field
//! updates on transition legality, and neither do we).

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Waiting for the host to start practice.
    #[default]
    Waiting,
    /// Practice is running.
    Active,
    /// Practice is paused.
    Paused,
    /// The session has ended. Terminal.
    Completed,
}

/// Inbound events that drive status transitions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// `practice_started`
    PracticeStarted,
    /// `session_paused`
    Paused,
    /// `session_resumed`
    Resumed,
    /// `session_ended`
    Ended,
}

impl SessionStatus {
    /// The wire string for this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
        }
    }

    /// Parse a snapshot status string leniently: anything unrecognized
    /// falls back to `Waiting` so a newer server cannot wedge the
    /// mirror. Returns the fallback alongside whether it was exact.
    pub fn from_wire(s: &str) -> (Self, bool) {
        match s {
            "waiting" => (Self::Waiting, true),
            "active" => (Self::Active, true),
            "paused" => (Self::Paused, true),
            "completed" => (Self::Completed, true),
            _ => (Self::Waiting, false),
        }
    }

    /// Whether this status is terminal.
    pub fn is_terminal(self) -> bool {
        self == Self::Completed
    }

    /// Apply a lifecycle event. Returns `true` if the status changed.
    ///
    /// Illegal `(state, event)` pairs leave the status unchanged;
    /// `Completed` absorbs everything.
    pub fn apply(&mut self, event: LifecycleEvent) -> bool {
        let next = match (*self, event) {
            (Self::Waiting, LifecycleEvent::PracticeStarted) => Self::Active,
            (Self::Active, LifecycleEvent::Paused) => Self::Paused,
            (Self::Paused, LifecycleEvent::Resumed) => Self::Active,
            // The server sends `session_ended` as an unconditional
            // terminator; accept it from any non-terminal state.
            (Self::Waiting | Self::Active | Self::Paused, LifecycleEvent::Ended) => {
                Self::Completed
            }
            _ => return false,
        };
        *self = next;
        true
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
