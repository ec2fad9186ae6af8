//! Session endpoint descriptor and URL assembly.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::errors::SyncError;

/// Characters that must be escaped in a query component.
const QUERY_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'&')
    .add(b'=')
    .add(b'+')
    .add(b'%');

/// Where and as whom to join a collaborative session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionEndpoint {
    /// Scheme + host, e.g. `ws://localhost:8000` or `wss://app.example`.
    pub base_url: String,
    /// Session identifier from the session catalog.
    pub session_id: String,
    /// Local user's id.
    pub user_id: String,
    /// Local user's display name (percent-encoded into the URL).
    pub username: String,
}

impl SessionEndpoint {
    /// Create a descriptor.
    pub fn new(
        base_url: impl Into<String>,
        session_id: impl Into<String>,
        user_id: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            session_id: session_id.into(),
            user_id: user_id.into(),
            username: username.into(),
        }
    }

    /// Build the WebSocket URL for this session:
    /// `{base}/api/ws/collaborative/{session_id}?user_id={user_id}&username={username}`.
    pub fn ws_url(&self) -> Result<String, SyncError> {
        if self.session_id.is_empty() {
            return Err(SyncError::InvalidEndpoint("empty session id".into()));
        }
        if self.user_id.is_empty() {
            return Err(SyncError::InvalidEndpoint("empty user id".into()));
        }
        let base = self.base_url.trim_end_matches('/');
        if !base.starts_with("ws://") && !base.starts_with("wss://") {
            return Err(SyncError::InvalidEndpoint(format!(
                "base URL must be ws:// or wss://, got {base}"
            )));
        }
        let username = utf8_percent_encode(&self.username, QUERY_SET);
        Ok(format!(
            "{base}/api/ws/collaborative/{}?user_id={}&username={username}",
            self.session_id, self.user_id
        ))
    }
}
