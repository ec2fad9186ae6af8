//! Message dispatch — decodes inbound envelopes and routes them to the
//! store's reducers.
//!
//! [`dispatch`] is pure with respect to I/O: it takes the raw text
//! frame and a mutable store, and never touches a channel. Decode
//! failures and unknown event types are logged and dropped without
//! mutating state; nothing here panics or propagates an error, so one
//! malformed message cannot take down the dispatcher for subsequent
//! messages.

use serde_json::Value;
use tracing::{debug, warn};

use chorale_events::{DecodeError, EventType, PeerGestureAnalysisPayload, ServerEvent};

use crate::lifecycle::LifecycleEvent;
use crate::store::SessionStore;

/// What a dispatched message did.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// The event was decoded and applied.
    Applied(EventType),
    /// `session_ended` transitioned the session to `completed` just
    /// now; carries the `final_state` payload for the one-shot
    /// session-end notification.
    SessionEnded(Value),
    /// The `type` was unrecognized; dropped for forward compatibility.
    UnknownType(String),
    /// The message could not be decoded; dropped.
    DecodeFailed,
}

/// Decode one raw frame and apply it to the store.
#[tracing::instrument(skip_all, fields(event_type))]
pub fn dispatch(store: &mut SessionStore, raw: &str) -> DispatchOutcome {
    let event = match ServerEvent::parse(raw) {
        Ok(event) => event,
        Err(DecodeError::UnknownType(t)) => {
            warn!(event_type = %t, "unknown event type, ignoring");
            return DispatchOutcome::UnknownType(t);
        }
        Err(e) => {
            warn!(error = %e, "dropping undecodable message");
            return DispatchOutcome::DecodeFailed;
        }
    };

    let event_type = event.event_type();
    let _ = tracing::Span::current().record("event_type", event_type.as_str());
    debug!("applying event");

    match event {
        ServerEvent::SessionState(payload) => {
            store.apply_snapshot(payload);
        }
        ServerEvent::ParticipantJoined(p) => {
            // One system entry per event received, whether or not the
            // roster insert was a no-op.
            let inserted = store.insert_participant(crate::store::Participant {
                user_id: p.user_id,
                username: p.username.clone(),
                connected_at: p.timestamp.clone(),
                status: "connected".into(),
                current_sentence_index: 0,
                performance: Value::Null,
            });
            if !inserted {
                debug!("repeated join for known participant");
            }
            store.push_system(format!("{} joined the session", p.username), p.timestamp);
        }
        ServerEvent::ParticipantLeft(p) => {
            let _ = store.remove_participant(&p.user_id);
            store.push_system(format!("{} left the session", p.username), p.timestamp);
        }
        ServerEvent::PracticeStarted(p) => {
            store.start_practice(p.story_content, p.current_sentence);
            let _ = store.status.apply(LifecycleEvent::PracticeStarted);
        }
        ServerEvent::ParticipantProgress(p) => {
            store.record_progress(&p.user_id, p.sentence_index, p.performance, p.timestamp);
        }
        ServerEvent::PeerGestureAnalysis(p) => {
            let (text, sentence_index, timestamp) = gesture_note(&p);
            let _ = store.push_feedback_note(
                p.from_user_id,
                "gesture_analysis",
                text,
                sentence_index,
                timestamp,
            );
        }
        ServerEvent::PeerFeedbackReceived(p) => {
            let _ = store.push_feedback_note(
                p.from_user_id,
                p.feedback_type,
                p.message,
                p.sentence_index,
                p.timestamp,
            );
        }
        ServerEvent::PeerFeedbackShared(p) => {
            store.push_feedback_shared(
                p.from_user_id,
                p.target_user_id,
                p.feedback_type,
                p.message,
                p.timestamp,
            );
        }
        ServerEvent::ChatMessage(p) => {
            store.push_chat(p.from_user_id, p.message, p.timestamp);
        }
        ServerEvent::SessionPaused => {
            let _ = store.status.apply(LifecycleEvent::Paused);
        }
        ServerEvent::SessionResumed => {
            let _ = store.status.apply(LifecycleEvent::Resumed);
        }
        ServerEvent::SentenceChanged(p) => {
            // Defensive apply: the cursor lands even when the session
            // is paused or already completed.
            store.set_current_sentence(p.new_sentence_index);
        }
        ServerEvent::SessionEnded(p) => {
            if store.status.apply(LifecycleEvent::Ended) {
                return DispatchOutcome::SessionEnded(p.final_state);
            }
            debug!("repeated session_ended for completed session");
        }
        ServerEvent::ServerError(p) => {
            warn!(message = %p.message, "server reported an application error");
        }
    }

    DispatchOutcome::Applied(event_type)
}

/// Render a gesture analysis payload as an inbox note.
fn gesture_note(p: &PeerGestureAnalysisPayload) -> (String, u32, Option<String>) {
    let text = p
        .analysis
        .get("summary")
        .and_then(Value::as_str)
        .map_or_else(|| p.analysis.to_string(), ToOwned::to_owned);
    (text, p.sentence_index.unwrap_or(0), p.timestamp.clone())
}
