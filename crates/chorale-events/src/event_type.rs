//! The [`EventType`] enum — all inbound event type discriminators.
//!
//! Every variant has an exact `#[serde(rename)]` matching the server's
//! snake_case string literal (e.g., `"participant_joined"`). The
//! dispatcher routes on this enum; strings outside this set are
//! reported as [`DecodeError::UnknownType`](crate::DecodeError::UnknownType)
//! and dropped without affecting session state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::DecodeError;

/// All inbound session event types.
///
/// Each variant serializes to the exact snake_case string the session
/// server emits in the envelope `type` field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    // -- Sync --
    /// Full session snapshot, sent immediately after (re)connect.
    #[serde(rename = "session_state")]
    SessionState,

    // -- Roster --
    /// A participant joined the session.
    #[serde(rename = "participant_joined")]
    ParticipantJoined,
    /// A participant left the session.
    #[serde(rename = "participant_left")]
    ParticipantLeft,

    // -- Practice --
    /// The host started practice; carries the story content.
    #[serde(rename = "practice_started")]
    PracticeStarted,
    /// A participant reported practice progress.
    #[serde(rename = "participant_progress")]
    ParticipantProgress,
    /// The current sentence cursor moved.
    #[serde(rename = "sentence_changed")]
    SentenceChanged,

    // -- Peer feedback --
    /// Gesture analysis results for a peer's delivery.
    #[serde(rename = "peer_gesture_analysis")]
    PeerGestureAnalysis,
    /// Private feedback addressed to the local user.
    #[serde(rename = "peer_feedback_received")]
    PeerFeedbackReceived,
    /// Feedback shared publicly with the whole session.
    #[serde(rename = "peer_feedback_shared")]
    PeerFeedbackShared,

    // -- Chat --
    /// A chat message from a participant.
    #[serde(rename = "chat_message")]
    ChatMessage,

    // -- Lifecycle --
    /// The session was paused.
    #[serde(rename = "session_paused")]
    SessionPaused,
    /// The session resumed.
    #[serde(rename = "session_resumed")]
    SessionResumed,
    /// The session ended; carries the final state.
    #[serde(rename = "session_ended")]
    SessionEnded,

    // -- Errors --
    /// Server-reported application error (not a transport error).
    #[serde(rename = "error")]
    Error,
}

impl EventType {
    /// The wire string for this event type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SessionState => "session_state",
            Self::ParticipantJoined => "participant_joined",
            Self::ParticipantLeft => "participant_left",
            Self::PracticeStarted => "practice_started",
            Self::ParticipantProgress => "participant_progress",
            Self::SentenceChanged => "sentence_changed",
            Self::PeerGestureAnalysis => "peer_gesture_analysis",
            Self::PeerFeedbackReceived => "peer_feedback_received",
            Self::PeerFeedbackShared => "peer_feedback_shared",
            Self::ChatMessage => "chat_message",
            Self::SessionPaused => "session_paused",
            Self::SessionResumed => "session_resumed",
            Self::SessionEnded => "session_ended",
            Self::Error => "error",
        }
    }

    /// All variants, in wire-documentation order.
    pub fn all() -> &'static [EventType] {
        &[
            Self::SessionState,
            Self::ParticipantJoined,
            Self::ParticipantLeft,
            Self::PracticeStarted,
            Self::ParticipantProgress,
            Self::SentenceChanged,
            Self::PeerGestureAnalysis,
            Self::PeerFeedbackReceived,
            Self::PeerFeedbackShared,
            Self::ChatMessage,
            Self::SessionPaused,
            Self::SessionResumed,
            Self::SessionEnded,
            Self::Error,
        ]
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| DecodeError::UnknownType(s.to_owned()))
    }
}
