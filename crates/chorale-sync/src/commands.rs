//! Outbound commands, gated by role.
//!
//! Every action builds a [`ClientCommand`] envelope and pushes it
//! through a [`CommandSink`] — fire and forget. There is no
//! acknowledgement, no retry, and no buffering while the channel is
//! closed; a caller needing guaranteed delivery must build that above
//! this layer. Host-only commands are rejected locally (never sent)
//! when the caller is not the host.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use chorale_events::{ClientCommand, ControlAction, StoryContent};

use crate::channel::ChannelHandle;

/// Where outbound envelopes go. Implemented by [`ChannelHandle`];
/// tests substitute a recording fake.
pub trait CommandSink {
    /// Hand a serialized envelope to the transport. Returns whether it
    /// was accepted for sending.
    fn send_text(&self, text: String) -> bool;
}

impl CommandSink for Arc<ChannelHandle> {
    fn send_text(&self, text: String) -> bool {
        self.send(text)
    }
}

/// Builds and sends outbound command envelopes.
pub struct CommandSender<S: CommandSink> {
    sink: S,
    is_host: bool,
}

impl<S: CommandSink> CommandSender<S> {
    /// Create a sender. `is_host` comes from the session catalog and
    /// is fixed for the life of the session.
    pub fn new(sink: S, is_host: bool) -> Self {
        Self { sink, is_host }
    }

    /// Whether this sender holds host permissions.
    pub fn is_host(&self) -> bool {
        self.is_host
    }

    /// Start practice with the given story. Host only; requires
    /// non-empty story content.
    pub fn start_practice(&self, story: &StoryContent) -> bool {
        if story.sentences.is_empty() {
            warn!("start_practice requires story content, not sending");
            return false;
        }
        self.send_gated(ClientCommand::StartPractice {
            story_content: story.clone(),
        })
    }

    /// Pause the session. Host only.
    pub fn pause_session(&self) -> bool {
        self.control(ControlAction::PauseSession)
    }

    /// Resume the session. Host only.
    pub fn resume_session(&self) -> bool {
        self.control(ControlAction::ResumeSession)
    }

    /// Advance the shared sentence cursor. Host only.
    pub fn next_sentence(&self) -> bool {
        self.control(ControlAction::NextSentence)
    }

    /// End the session. Host only.
    pub fn end_session(&self) -> bool {
        self.control(ControlAction::EndSession)
    }

    /// Report the local user's progress. Open to any participant.
    pub fn sentence_progress(&self, sentence_index: u32, performance: Value) -> bool {
        self.send(ClientCommand::SentenceProgress {
            sentence_index,
            performance,
        })
    }

    /// Send a chat message. Surrounding whitespace is trimmed; a
    /// message that is empty after trimming is rejected locally.
    pub fn chat(&self, message: &str) -> bool {
        let trimmed = message.trim();
        if trimmed.is_empty() {
            debug!("empty chat message, not sending");
            return false;
        }
        self.send(ClientCommand::ChatMessage {
            message: trimmed.to_owned(),
        })
    }

    /// Send private feedback to a peer. The wire protocol does not
    /// restrict this to hosts; any caller-level policy lives above.
    pub fn peer_feedback(
        &self,
        target_user_id: impl Into<String>,
        feedback_type: impl Into<String>,
        message: impl Into<String>,
        sentence_index: u32,
    ) -> bool {
        self.send(ClientCommand::PeerFeedback {
            target_user_id: target_user_id.into(),
            feedback_type: feedback_type.into(),
            message: message.into(),
            sentence_index,
        })
    }

    fn control(&self, action: ControlAction) -> bool {
        self.send_gated(ClientCommand::SessionControl { action })
    }

    fn send_gated(&self, command: ClientCommand) -> bool {
        if command.host_only() && !self.is_host {
            warn!(command = ?command, "host-only command from non-host, not sending");
            return false;
        }
        self.send(command)
    }

    fn send(&self, command: ClientCommand) -> bool {
        match command.to_wire() {
            Ok(text) => self.sink.send_text(text),
            Err(e) => {
                warn!(error = %e, "failed to serialize command");
                false
            }
        }
    }
}
