//! # chorale-events
//!
//! Wire protocol for collaborative practice sessions.
//!
//! - **Inbound**: `type`-discriminated JSON envelopes from the session
//!   server, decoded into [`ServerEvent`] with typed payload structs
//! - **Outbound**: [`ClientCommand`] envelopes serialized with an
//!   internally-tagged `type` field
//! - **Errors**: [`DecodeError`] distinguishes malformed JSON, unknown
//!   event types, and known types with malformed payloads
//!
//! This crate is pure serde — no I/O, no channel dependency — so the
//! sync core's dispatcher can be unit tested against raw strings.

#![deny(unsafe_code)]

pub mod errors;
pub mod event_type;
pub mod inbound;
pub mod outbound;

pub use errors::{DecodeError, Result};
pub use event_type::EventType;
pub use inbound::{
    ChatMessagePayload, ParticipantJoinedPayload, ParticipantLeftPayload,
    ParticipantProgressPayload, PeerFeedbackPayload, PeerGestureAnalysisPayload,
    PracticeStartedPayload, SentenceChangedPayload, ServerErrorPayload, ServerEvent,
    SessionEndedPayload, SessionSnapshot, SessionStatePayload, StoryContent, WireChatMessage,
    WireParticipant,
};
pub use outbound::{ClientCommand, ControlAction};
