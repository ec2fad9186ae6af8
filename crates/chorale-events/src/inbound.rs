//! Inbound envelope decoding — [`ServerEvent`] and its payload structs.
//!
//! The server sends flat JSON envelopes: the discriminating `type`
//! field and the payload fields live side by side in one object.
//! [`ServerEvent::parse`] does the full decode in two steps so the
//! caller can tell an unrecognized `type` (drop for forward
//! compatibility) from a recognized type with a malformed payload
//! (protocol violation).
//!
//! Unknown extra fields are ignored everywhere; the server is free to
//! grow the protocol without breaking older clients.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DecodeError;
use crate::event_type::EventType;

/// Story content delivered by `practice_started` (and optionally in a
/// snapshot): an ordered sequence of sentences plus a title.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoryContent {
    /// Story title.
    #[serde(default)]
    pub title: String,
    /// Ordered practice sentences.
    #[serde(default)]
    pub sentences: Vec<String>,
}

impl StoryContent {
    /// Number of sentences in the story.
    pub fn sentence_count(&self) -> usize {
        self.sentences.len()
    }
}

/// A participant entry inside a `session_state` snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WireParticipant {
    /// Display name.
    #[serde(default)]
    pub username: String,
    /// Connection status string, informational only.
    #[serde(default = "default_status")]
    pub status: String,
    /// Join timestamp (ISO 8601), when the server includes it.
    #[serde(default)]
    pub connected_at: Option<String>,
    /// Last-reported practice cursor.
    #[serde(default)]
    pub current_sentence_index: u32,
    /// Last-reported performance payload, opaque to the client.
    #[serde(default)]
    pub performance: Value,
}

fn default_status() -> String {
    "connected".to_owned()
}

/// A chat log entry inside a `session_state` snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WireChatMessage {
    /// Entry kind as the server labels it (`"system"`, `"chat"`, ...).
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    /// Sender id; absent for system entries.
    #[serde(default)]
    pub from_user_id: Option<String>,
    /// Message text.
    #[serde(default)]
    pub message: String,
    /// Timestamp (ISO 8601).
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// The `state` object inside a `session_state` snapshot.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Session lifecycle status string (`"waiting"`, `"active"`, ...).
    #[serde(default)]
    pub session_status: String,
    /// Participant roster keyed by user id.
    #[serde(default)]
    pub participants: HashMap<String, WireParticipant>,
    /// Current sentence cursor.
    #[serde(default)]
    pub current_sentence: u32,
    /// Story content, if practice has started.
    #[serde(default)]
    pub story_content: Option<StoryContent>,
    /// Chat log so far.
    #[serde(default)]
    pub chat_messages: Vec<WireChatMessage>,
}

/// Payload for `session_state` — the resync path after (re)connect.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionStatePayload {
    /// Session identifier.
    pub session_id: String,
    /// Full session snapshot.
    pub state: SessionSnapshot,
    /// The local user's id, as the server knows it.
    #[serde(default)]
    pub your_user_id: Option<String>,
}

/// Payload for `participant_joined`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticipantJoinedPayload {
    /// Joining user's id.
    pub user_id: String,
    /// Joining user's display name.
    #[serde(default)]
    pub username: String,
    /// Join timestamp (ISO 8601).
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Payload for `participant_left`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticipantLeftPayload {
    /// Leaving user's id.
    pub user_id: String,
    /// Leaving user's display name.
    #[serde(default)]
    pub username: String,
    /// Leave timestamp (ISO 8601).
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Payload for `practice_started`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PracticeStartedPayload {
    /// The story to practice.
    pub story_content: StoryContent,
    /// User id of the host who started practice.
    #[serde(default)]
    pub started_by: Option<String>,
    /// Initial sentence cursor.
    #[serde(default)]
    pub current_sentence: u32,
    /// Start timestamp (ISO 8601).
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Payload for `participant_progress`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParticipantProgressPayload {
    /// Reporting user's id.
    pub user_id: String,
    /// The sentence the participant is on.
    #[serde(default)]
    pub sentence_index: u32,
    /// Opaque performance payload.
    #[serde(default)]
    pub performance: Value,
    /// Report timestamp (ISO 8601).
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Payload for `peer_gesture_analysis`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeerGestureAnalysisPayload {
    /// Analyzed peer's id.
    pub from_user_id: String,
    /// Opaque analysis result from the gesture pipeline.
    #[serde(default)]
    pub analysis: Value,
    /// Sentence the analysis applies to.
    #[serde(default)]
    pub sentence_index: Option<u32>,
    /// Analysis timestamp (ISO 8601).
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Payload shared by `peer_feedback_received` and `peer_feedback_shared`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeerFeedbackPayload {
    /// Feedback author's id.
    pub from_user_id: String,
    /// Feedback target's id (present on the shared variant).
    #[serde(default)]
    pub target_user_id: Option<String>,
    /// Feedback kind (e.g. `"pronunciation"`, `"pacing"`).
    #[serde(default)]
    pub feedback_type: String,
    /// Feedback text.
    #[serde(default)]
    pub message: String,
    /// Sentence the feedback refers to.
    #[serde(default)]
    pub sentence_index: u32,
    /// Feedback timestamp (ISO 8601).
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Payload for `chat_message`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessagePayload {
    /// Sender's id.
    pub from_user_id: String,
    /// Message text.
    #[serde(default)]
    pub message: String,
    /// Send timestamp (ISO 8601).
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Payload for `sentence_changed`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SentenceChangedPayload {
    /// The new sentence cursor value, stored verbatim.
    pub new_sentence_index: u32,
}

/// Payload for `session_ended`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionEndedPayload {
    /// Final session state, passed through to the session-end consumer.
    #[serde(default)]
    pub final_state: Value,
}

/// Payload for `error` — a server-reported application error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerErrorPayload {
    /// Human-readable error message.
    #[serde(default)]
    pub message: String,
}

/// A decoded inbound envelope.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerEvent {
    /// `session_state`
    SessionState(SessionStatePayload),
    /// `participant_joined`
    ParticipantJoined(ParticipantJoinedPayload),
    /// `participant_left`
    ParticipantLeft(ParticipantLeftPayload),
    /// `practice_started`
    PracticeStarted(PracticeStartedPayload),
    /// `participant_progress`
    ParticipantProgress(ParticipantProgressPayload),
    /// `peer_gesture_analysis`
    PeerGestureAnalysis(PeerGestureAnalysisPayload),
    /// `peer_feedback_received`
    PeerFeedbackReceived(PeerFeedbackPayload),
    /// `peer_feedback_shared`
    PeerFeedbackShared(PeerFeedbackPayload),
    /// `chat_message`
    ChatMessage(ChatMessagePayload),
    /// `session_paused`
    SessionPaused,
    /// `session_resumed`
    SessionResumed,
    /// `sentence_changed`
    SentenceChanged(SentenceChangedPayload),
    /// `session_ended`
    SessionEnded(SessionEndedPayload),
    /// `error`
    ServerError(ServerErrorPayload),
}

impl ServerEvent {
    /// Decode a raw text frame into a typed event.
    ///
    /// Two-step decode: JSON parse + `type` lookup first, then payload
    /// deserialization from the same object. Errors carry enough
    /// context for the dispatcher to log them distinctly.
    pub fn parse(raw: &str) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_str(raw)?;
        if !value.is_object() {
            return Err(DecodeError::NotAnObject);
        }
        let type_str = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingType)?;
        let event_type = EventType::from_str(type_str)?;
        Self::from_parts(event_type, value)
    }

    fn from_parts(event_type: EventType, value: Value) -> Result<Self, DecodeError> {
        fn payload<T: serde::de::DeserializeOwned>(
            event_type: EventType,
            value: Value,
        ) -> Result<T, DecodeError> {
            serde_json::from_value(value).map_err(|source| DecodeError::Payload {
                event_type,
                source,
            })
        }

        Ok(match event_type {
            EventType::SessionState => Self::SessionState(payload(event_type, value)?),
            EventType::ParticipantJoined => Self::ParticipantJoined(payload(event_type, value)?),
            EventType::ParticipantLeft => Self::ParticipantLeft(payload(event_type, value)?),
            EventType::PracticeStarted => Self::PracticeStarted(payload(event_type, value)?),
            EventType::ParticipantProgress => {
                Self::ParticipantProgress(payload(event_type, value)?)
            }
            EventType::PeerGestureAnalysis => {
                Self::PeerGestureAnalysis(payload(event_type, value)?)
            }
            EventType::PeerFeedbackReceived => {
                Self::PeerFeedbackReceived(payload(event_type, value)?)
            }
            EventType::PeerFeedbackShared => {
                Self::PeerFeedbackShared(payload(event_type, value)?)
            }
            EventType::ChatMessage => Self::ChatMessage(payload(event_type, value)?),
            EventType::SessionPaused => Self::SessionPaused,
            EventType::SessionResumed => Self::SessionResumed,
            EventType::SentenceChanged => Self::SentenceChanged(payload(event_type, value)?),
            EventType::SessionEnded => Self::SessionEnded(payload(event_type, value)?),
            EventType::Error => Self::ServerError(payload(event_type, value)?),
        })
    }

    /// The event type discriminator for this event.
    pub fn event_type(&self) -> EventType {
        match self {
            Self::SessionState(_) => EventType::SessionState,
            Self::ParticipantJoined(_) => EventType::ParticipantJoined,
            Self::ParticipantLeft(_) => EventType::ParticipantLeft,
            Self::PracticeStarted(_) => EventType::PracticeStarted,
            Self::ParticipantProgress(_) => EventType::ParticipantProgress,
            Self::PeerGestureAnalysis(_) => EventType::PeerGestureAnalysis,
            Self::PeerFeedbackReceived(_) => EventType::PeerFeedbackReceived,
            Self::PeerFeedbackShared(_) => EventType::PeerFeedbackShared,
            Self::ChatMessage(_) => EventType::ChatMessage,
            Self::SessionPaused => EventType::SessionPaused,
            Self::SessionResumed => EventType::SessionResumed,
            Self::SentenceChanged(_) => EventType::SentenceChanged,
            Self::SessionEnded(_) => EventType::SessionEnded,
            Self::ServerError(_) => EventType::Error,
        }
    }
}
