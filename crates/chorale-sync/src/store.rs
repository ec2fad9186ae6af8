//! The session state store — the authoritative local mirror.
//!
//! Created empty at channel-open time, replaced wholesale by a
//! `session_state` snapshot, then incrementally mutated by the
//! dispatcher. All mutation happens on the run loop; the store itself
//! carries no locking. `Clone` gives rendering layers a cheap
//! point-in-time snapshot.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use chorale_events::{SessionStatePayload, StoryContent, WireChatMessage};

use crate::lifecycle::SessionStatus;

/// One connected user in the session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Unique key within the session (set semantics).
    pub user_id: String,
    /// Display name, fixed at join time.
    pub username: String,
    /// Join timestamp (ISO 8601), when known.
    pub connected_at: Option<String>,
    /// Connection status string, informational only.
    pub status: String,
    /// Last-reported practice cursor.
    pub current_sentence_index: u32,
    /// Last-reported performance payload, opaque.
    pub performance: Value,
}

/// An entry in the session's chat/feed log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChatEntry {
    /// Informational entry (joins, leaves).
    System {
        /// Entry text.
        text: String,
        /// Timestamp (ISO 8601).
        timestamp: Option<String>,
    },
    /// A participant's chat message.
    Chat {
        /// Sender's id.
        from_user_id: String,
        /// Message text.
        text: String,
        /// Timestamp (ISO 8601).
        timestamp: Option<String>,
    },
    /// Feedback shared publicly with the session.
    FeedbackShared {
        /// Feedback author's id.
        from_user_id: String,
        /// Feedback target's id.
        target_user_id: Option<String>,
        /// Feedback kind.
        feedback_type: String,
        /// Feedback text.
        text: String,
        /// Timestamp (ISO 8601).
        timestamp: Option<String>,
    },
}

/// A private feedback notification addressed to the local user.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedbackNote {
    /// Synthetic local id, monotonically increasing, used for dismissal.
    pub id: u64,
    /// Feedback author's id.
    pub from_user_id: String,
    /// Feedback kind.
    pub kind: String,
    /// Feedback text.
    pub text: String,
    /// Sentence the feedback refers to.
    pub sentence_index: u32,
    /// Timestamp (ISO 8601).
    pub timestamp: Option<String>,
}

/// A progress report keyed by user id.
///
/// Progress for users not (yet) in the roster lands here without
/// creating a placeholder [`Participant`]; roster members are updated
/// in place as well.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticipantProgress {
    /// The sentence the participant reported.
    pub sentence_index: u32,
    /// Opaque performance payload.
    pub performance: Value,
    /// Report timestamp (ISO 8601).
    pub timestamp: Option<String>,
}

/// The local mirror of one collaborative session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStore {
    /// Session identifier, set by the first snapshot.
    pub session_id: Option<String>,
    /// The local user's id, as reported by the server.
    pub local_user_id: Option<String>,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Shared sentence cursor. Stored verbatim from events; bounds are
    /// an upstream contract, not validated here.
    pub current_sentence_index: u32,
    /// Story content, set once by `practice_started`.
    pub story_content: Option<StoryContent>,
    /// Roster in arrival order, at most one entry per user id.
    pub participants: Vec<Participant>,
    /// Append-only chat/feed log in arrival order.
    pub chat_log: Vec<ChatEntry>,
    /// Private feedback inbox; append-only except explicit dismissal.
    pub feedback_inbox: Vec<FeedbackNote>,
    /// Last progress report per user id (roster or not).
    pub progress: HashMap<String, ParticipantProgress>,
    next_feedback_id: u64,
}

impl SessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a participant by id.
    pub fn participant(&self, user_id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.user_id == user_id)
    }

    /// Number of participants in the roster.
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// Replace the mirror wholesale from a `session_state` snapshot.
    ///
    /// Roster, chat log, cursor, status, and story content all come
    /// from the snapshot; prior local values are discarded. The private
    /// feedback inbox and its id counter are local-only state and
    /// survive resync, so dismissal ids stay stable across reconnects.
    pub fn apply_snapshot(&mut self, payload: SessionStatePayload) {
        self.session_id = Some(payload.session_id);
        if payload.your_user_id.is_some() {
            self.local_user_id = payload.your_user_id;
        }

        let state = payload.state;
        let (status, exact) = SessionStatus::from_wire(&state.session_status);
        if !exact {
            tracing::warn!(status = %state.session_status, "unrecognized session status in snapshot");
        }
        self.status = status;
        self.current_sentence_index = state.current_sentence;
        self.story_content = state.story_content;

        let mut roster: Vec<Participant> = state
            .participants
            .into_iter()
            .map(|(user_id, p)| Participant {
                user_id,
                username: p.username,
                connected_at: p.connected_at,
                status: p.status,
                current_sentence_index: p.current_sentence_index,
                performance: p.performance,
            })
            .collect();
        // Maps carry no order; sort by join time, then id, for a
        // deterministic roster.
        roster.sort_by(|a, b| {
            (a.connected_at.as_deref(), a.user_id.as_str())
                .cmp(&(b.connected_at.as_deref(), b.user_id.as_str()))
        });
        self.participants = roster;

        self.chat_log = state
            .chat_messages
            .into_iter()
            .map(wire_chat_to_entry)
            .collect();
        self.progress.clear();
    }

    /// Idempotent roster insert. Returns `true` if the participant was
    /// actually added; a repeated join for a known id is a no-op.
    pub fn insert_participant(&mut self, participant: Participant) -> bool {
        if self.participant(&participant.user_id).is_some() {
            return false;
        }
        self.participants.push(participant);
        true
    }

    /// Remove a participant by id. No-op if absent.
    pub fn remove_participant(&mut self, user_id: &str) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| p.user_id != user_id);
        self.participants.len() != before
    }

    /// Append a system entry to the chat log.
    pub fn push_system(&mut self, text: impl Into<String>, timestamp: Option<String>) {
        self.chat_log.push(ChatEntry::System {
            text: text.into(),
            timestamp,
        });
    }

    /// Append a chat entry.
    pub fn push_chat(
        &mut self,
        from_user_id: impl Into<String>,
        text: impl Into<String>,
        timestamp: Option<String>,
    ) {
        self.chat_log.push(ChatEntry::Chat {
            from_user_id: from_user_id.into(),
            text: text.into(),
            timestamp,
        });
    }

    /// Append a publicly shared feedback entry.
    pub fn push_feedback_shared(
        &mut self,
        from_user_id: impl Into<String>,
        target_user_id: Option<String>,
        feedback_type: impl Into<String>,
        text: impl Into<String>,
        timestamp: Option<String>,
    ) {
        self.chat_log.push(ChatEntry::FeedbackShared {
            from_user_id: from_user_id.into(),
            target_user_id,
            feedback_type: feedback_type.into(),
            text: text.into(),
            timestamp,
        });
    }

    /// Append a private feedback note, assigning a fresh synthetic id.
    pub fn push_feedback_note(
        &mut self,
        from_user_id: impl Into<String>,
        kind: impl Into<String>,
        text: impl Into<String>,
        sentence_index: u32,
        timestamp: Option<String>,
    ) -> u64 {
        self.next_feedback_id += 1;
        let id = self.next_feedback_id;
        self.feedback_inbox.push(FeedbackNote {
            id,
            from_user_id: from_user_id.into(),
            kind: kind.into(),
            text: text.into(),
            sentence_index,
            timestamp,
        });
        id
    }

    /// Dismiss a private feedback note by its synthetic id. Does not
    /// touch the chat log. Returns `true` if a note was removed.
    pub fn dismiss_feedback(&mut self, id: u64) -> bool {
        let before = self.feedback_inbox.len();
        self.feedback_inbox.retain(|n| n.id != id);
        self.feedback_inbox.len() != before
    }

    /// Record a progress report. Roster members are updated in place;
    /// unknown ids get only the keyed record (no placeholder entry).
    pub fn record_progress(
        &mut self,
        user_id: &str,
        sentence_index: u32,
        performance: Value,
        timestamp: Option<String>,
    ) {
        if let Some(p) = self.participants.iter_mut().find(|p| p.user_id == user_id) {
            p.current_sentence_index = sentence_index;
            p.performance = performance.clone();
        }
        let _ = self.progress.insert(
            user_id.to_owned(),
            ParticipantProgress {
                sentence_index,
                performance,
                timestamp,
            },
        );
    }

    /// Store the shared cursor verbatim (no clamping).
    pub fn set_current_sentence(&mut self, index: u32) {
        self.current_sentence_index = index;
    }

    /// Set story content and cursor from `practice_started`.
    pub fn start_practice(&mut self, story: StoryContent, current_sentence: u32) {
        self.story_content = Some(story);
        self.current_sentence_index = current_sentence;
    }
}

fn wire_chat_to_entry(msg: WireChatMessage) -> ChatEntry {
    match msg.from_user_id {
        Some(from) if msg.kind.as_deref() != Some("system") => ChatEntry::Chat {
            from_user_id: from,
            text: msg.message,
            timestamp: msg.timestamp,
        },
        _ => ChatEntry::System {
            text: msg.message,
            timestamp: msg.timestamp,
        },
    }
}
