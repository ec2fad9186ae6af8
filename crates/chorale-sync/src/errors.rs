//! Error types for the sync client.

use thiserror::Error;

/// Errors that can occur while establishing or driving a session.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The endpoint descriptor could not be turned into a URL.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The WebSocket connection could not be established.
    #[error("connect to {url} failed: {source}")]
    Connect {
        /// The URL that was dialed.
        url: String,
        /// The underlying transport error.
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },

    /// The channel was torn down while an operation was in flight.
    #[error("channel closed")]
    ChannelClosed,
}

/// Convenience type alias for sync results.
pub type Result<T> = std::result::Result<T, SyncError>;
