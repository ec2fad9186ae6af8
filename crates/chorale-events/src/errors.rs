//! Error types for wire protocol decoding.
//!
//! [`DecodeError`] separates the failure modes the dispatcher treats
//! differently: malformed JSON is dropped with a warning, an unknown
//! `type` is ignored for forward compatibility, and a known type with
//! a bad payload is logged as a protocol violation.

use thiserror::Error;

use crate::event_type::EventType;

/// Errors that can occur while decoding an inbound envelope.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The raw payload was not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload was valid JSON but not an object.
    #[error("envelope is not a JSON object")]
    NotAnObject,

    /// The envelope has no string `type` field.
    #[error("envelope has no `type` field")]
    MissingType,

    /// The `type` value is not a recognized event type.
    #[error("unknown event type: {0}")]
    UnknownType(String),

    /// The `type` was recognized but the remaining fields did not
    /// match the expected payload shape.
    #[error("malformed {event_type} payload: {source}")]
    Payload {
        /// The recognized event type.
        event_type: EventType,
        /// The underlying deserialization error.
        source: serde_json::Error,
    },
}

/// Convenience type alias for decode results.
pub type Result<T> = std::result::Result<T, DecodeError>;
