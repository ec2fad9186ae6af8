//! Outbound command envelopes — [`ClientCommand`].
//!
//! Commands are internally tagged with `type` so they serialize to
//! the exact wire shape the session server expects, e.g.
//! `{"type":"session_control","action":"pause_session"}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::inbound::StoryContent;

/// A session-control action, issued by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    /// Pause the running session.
    PauseSession,
    /// Resume a paused session.
    ResumeSession,
    /// Advance the shared sentence cursor.
    NextSentence,
    /// End the session for everyone.
    EndSession,
}

impl ControlAction {
    /// The wire string for this action.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PauseSession => "pause_session",
            Self::ResumeSession => "resume_session",
            Self::NextSentence => "next_sentence",
            Self::EndSession => "end_session",
        }
    }
}

/// An outbound command envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Start practice with the given story (host only).
    StartPractice {
        /// The story to practice.
        story_content: StoryContent,
    },
    /// Session control action (host only).
    SessionControl {
        /// The action to perform.
        action: ControlAction,
    },
    /// Report the local user's practice progress.
    SentenceProgress {
        /// Sentence the local user is on.
        sentence_index: u32,
        /// Opaque performance payload.
        performance: Value,
    },
    /// Send private feedback to a peer.
    PeerFeedback {
        /// Feedback target's id.
        target_user_id: String,
        /// Feedback kind.
        feedback_type: String,
        /// Feedback text.
        message: String,
        /// Sentence the feedback refers to.
        sentence_index: u32,
    },
    /// Send a chat message to the session.
    ChatMessage {
        /// Message text.
        message: String,
    },
}

impl ClientCommand {
    /// Whether this command may only be issued by the session host.
    pub fn host_only(&self) -> bool {
        matches!(self, Self::StartPractice { .. } | Self::SessionControl { .. })
    }

    /// Serialize to the JSON text envelope sent over the channel.
    pub fn to_wire(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn session_control_wire_shape() {
        let cmd = ClientCommand::SessionControl {
            action: ControlAction::PauseSession,
        };
        let wire: Value = serde_json::from_str(&cmd.to_wire().unwrap()).unwrap();
        assert_eq!(wire, json!({"type":"session_control","action":"pause_session"}));
    }

    #[test]
    fn start_practice_wire_shape() {
        let cmd = ClientCommand::StartPractice {
            story_content: StoryContent {
                title: "T".into(),
                sentences: vec!["one".into()],
            },
        };
        let wire: Value = serde_json::from_str(&cmd.to_wire().unwrap()).unwrap();
        assert_eq!(wire["type"], "start_practice");
        assert_eq!(wire["story_content"]["sentences"][0], "one");
    }

    #[test]
    fn sentence_progress_wire_shape() {
        let cmd = ClientCommand::SentenceProgress {
            sentence_index: 4,
            performance: json!({"wpm": 120}),
        };
        let wire: Value = serde_json::from_str(&cmd.to_wire().unwrap()).unwrap();
        assert_eq!(wire["type"], "sentence_progress");
        assert_eq!(wire["sentence_index"], 4);
        assert_eq!(wire["performance"]["wpm"], 120);
    }

    #[test]
    fn peer_feedback_wire_shape() {
        let cmd = ClientCommand::PeerFeedback {
            target_user_id: "u2".into(),
            feedback_type: "pacing".into(),
            message: "nice".into(),
            sentence_index: 1,
        };
        let wire: Value = serde_json::from_str(&cmd.to_wire().unwrap()).unwrap();
        assert_eq!(wire["type"], "peer_feedback");
        assert_eq!(wire["target_user_id"], "u2");
    }

    #[test]
    fn chat_message_wire_shape() {
        let cmd = ClientCommand::ChatMessage {
            message: "hello".into(),
        };
        let wire: Value = serde_json::from_str(&cmd.to_wire().unwrap()).unwrap();
        assert_eq!(wire, json!({"type":"chat_message","message":"hello"}));
    }

    #[test]
    fn host_only_commands() {
        assert!(ClientCommand::StartPractice {
            story_content: StoryContent::default()
        }
        .host_only());
        assert!(ClientCommand::SessionControl {
            action: ControlAction::EndSession
        }
        .host_only());
        assert!(!ClientCommand::ChatMessage { message: "m".into() }.host_only());
        assert!(!ClientCommand::SentenceProgress {
            sentence_index: 0,
            performance: Value::Null
        }
        .host_only());
        assert!(!ClientCommand::PeerFeedback {
            target_user_id: "u".into(),
            feedback_type: "f".into(),
            message: "m".into(),
            sentence_index: 0
        }
        .host_only());
    }

    #[test]
    fn control_action_strings() {
        assert_eq!(ControlAction::PauseSession.as_str(), "pause_session");
        assert_eq!(ControlAction::ResumeSession.as_str(), "resume_session");
        assert_eq!(ControlAction::NextSentence.as_str(), "next_sentence");
        assert_eq!(ControlAction::EndSession.as_str(), "end_session");
    }

    #[test]
    fn control_action_serde_matches_as_str() {
        for action in [
            ControlAction::PauseSession,
            ControlAction::ResumeSession,
            ControlAction::NextSentence,
            ControlAction::EndSession,
        ] {
            let json = serde_json::to_string(&action).unwrap();
            assert_eq!(json, format!("\"{}\"", action.as_str()));
        }
    }
}
