//! # chorale-sync
//!
//! Synchronization client for collaborative practice sessions.
//!
//! Keeps a local mirror of a multi-participant live session consistent
//! with the server's event stream over a persistent `WebSocket`:
//!
//! - [`channel`]: owned channel handle with explicit
//!   `Closed | Connecting | Open` state and lifecycle events
//! - [`supervisor`]: fixed-delay reconnection after unintended closes
//! - [`dispatch`]: decode + route inbound envelopes to state reducers
//! - [`store`]: the authoritative local mirror (roster, chat log,
//!   feedback inbox, practice progress)
//! - [`lifecycle`]: the `waiting → active → paused → completed`
//!   session state machine
//! - [`commands`]: role-gated, fire-and-forget outbound commands
//! - [`client`]: the assembled [`SessionClient`]
//!
//! Rendering layers are pure consumers of [`SessionStore`] snapshots;
//! nothing in this crate draws or styles anything.

#![deny(unsafe_code)]

pub mod channel;
pub mod client;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod endpoint;
pub mod errors;
pub mod lifecycle;
pub mod store;
pub mod supervisor;

pub use channel::{ChannelEvent, ChannelHandle, ChannelState, CloseReason};
pub use client::{ConnectionStatus, SessionClient, SessionRole};
pub use commands::{CommandSender, CommandSink};
pub use config::SyncConfig;
pub use dispatch::{DispatchOutcome, dispatch};
pub use endpoint::SessionEndpoint;
pub use errors::{Result, SyncError};
pub use lifecycle::{LifecycleEvent, SessionStatus};
pub use store::{ChatEntry, FeedbackNote, Participant, ParticipantProgress, SessionStore};
pub use supervisor::ReconnectSupervisor;
