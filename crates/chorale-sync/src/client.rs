//! The assembled session client.
//!
//! [`SessionClient::connect`] wires the channel handle, reconnection
//! supervisor, dispatcher, and store together and spawns the run loop
//! that drives them. Rendering layers read [`SessionClient::snapshot`]
//! and watch [`SessionClient::connection_status`]; user input flows
//! back through [`SessionClient::sender`].

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::channel::{ChannelEvent, ChannelHandle, CloseReason};
use crate::commands::CommandSender;
use crate::config::SyncConfig;
use crate::dispatch::{DispatchOutcome, dispatch};
use crate::endpoint::SessionEndpoint;
use crate::errors::Result;
use crate::store::SessionStore;
use crate::supervisor::ReconnectSupervisor;

/// The local user's role, fixed by the session catalog before the
/// client is created.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionRole {
    /// May issue session-control commands.
    Host,
    /// Regular participant.
    Participant,
}

impl SessionRole {
    /// Whether this role holds host permissions.
    pub fn is_host(self) -> bool {
        self == Self::Host
    }
}

/// Connection status surfaced to the rendering layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No live connection and none in flight.
    Disconnected,
    /// A connection attempt is in flight.
    Connecting,
    /// The channel is open.
    Connected,
    /// The transport failed; reconnection may be in progress.
    Error,
}

/// A live collaborative session: one channel, one store.
///
/// Sessions in the same process are fully independent; nothing is
/// shared between instances.
#[derive(Debug)]
pub struct SessionClient {
    channel: Arc<ChannelHandle>,
    store: Arc<RwLock<SessionStore>>,
    supervisor: Arc<Mutex<ReconnectSupervisor>>,
    status_rx: watch::Receiver<ConnectionStatus>,
    end_rx: Mutex<Option<oneshot::Receiver<Value>>>,
    role: SessionRole,
}

impl SessionClient {
    /// Connect to a session and start the run loop.
    ///
    /// A failed first connect is returned as an error — the supervisor
    /// only watches unintended closes of an established handle.
    pub async fn connect(
        endpoint: SessionEndpoint,
        role: SessionRole,
        config: SyncConfig,
    ) -> Result<Self> {
        let (channel, events_rx) = ChannelHandle::new(&config);
        let (supervisor, tick_rx) = ReconnectSupervisor::new(config.reconnect_delay());
        let supervisor = Arc::new(Mutex::new(supervisor));
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);
        let (end_tx, end_rx) = oneshot::channel();
        let store = Arc::new(RwLock::new(SessionStore::new()));

        channel.open(&endpoint).await?;

        let _ = tokio::spawn(run_loop(
            Arc::clone(&channel),
            endpoint,
            events_rx,
            tick_rx,
            Arc::clone(&supervisor),
            Arc::clone(&store),
            status_tx,
            end_tx,
        ));

        Ok(Self {
            channel,
            store,
            supervisor,
            status_rx,
            end_rx: Mutex::new(Some(end_rx)),
            role,
        })
    }

    /// Whether the local user is the session host.
    pub fn is_host(&self) -> bool {
        self.role.is_host()
    }

    /// A point-in-time copy of the session mirror.
    pub fn snapshot(&self) -> SessionStore {
        self.store.read().clone()
    }

    /// Watch the connection status.
    pub fn connection_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    /// A command sender bound to this session's channel and role.
    pub fn sender(&self) -> CommandSender<Arc<ChannelHandle>> {
        CommandSender::new(Arc::clone(&self.channel), self.role.is_host())
    }

    /// Take the one-shot session-end receiver. Yields the `final_state`
    /// payload when the session reaches `completed`. Returns `None` on
    /// every call after the first.
    pub fn take_session_end(&self) -> Option<oneshot::Receiver<Value>> {
        self.end_rx.lock().take()
    }

    /// Dismiss a private feedback note by its synthetic id.
    pub fn dismiss_feedback(&self, id: u64) -> bool {
        self.store.write().dismiss_feedback(id)
    }

    /// Intentional teardown: synchronously marks the channel closed and
    /// cancels any pending reconnect timer. The store stays intact for
    /// final inspection; drop the client to discard it.
    pub fn close(&self) {
        self.supervisor.lock().cancel();
        self.channel.close();
    }
}

impl Drop for SessionClient {
    fn drop(&mut self) {
        self.close();
    }
}

/// Drive channel events and reconnect ticks until teardown.
#[allow(clippy::too_many_arguments)]
#[tracing::instrument(skip_all, name = "session_run_loop")]
async fn run_loop(
    channel: Arc<ChannelHandle>,
    endpoint: SessionEndpoint,
    mut events_rx: mpsc::Receiver<ChannelEvent>,
    mut tick_rx: mpsc::Receiver<()>,
    supervisor: Arc<Mutex<ReconnectSupervisor>>,
    store: Arc<RwLock<SessionStore>>,
    status_tx: watch::Sender<ConnectionStatus>,
    end_tx: oneshot::Sender<Value>,
) {
    let mut end_tx = Some(end_tx);
    loop {
        tokio::select! {
            event = events_rx.recv() => {
                let Some(event) = event else { break };
                match event {
                    ChannelEvent::Opened => {
                        info!("channel open");
                        let _ = status_tx.send_replace(ConnectionStatus::Connected);
                        supervisor.lock().on_open();
                    }
                    ChannelEvent::Message(text) => {
                        let outcome = dispatch(&mut store.write(), &text);
                        if let DispatchOutcome::SessionEnded(final_state) = outcome {
                            info!("session completed");
                            if let Some(tx) = end_tx.take() {
                                let _ = tx.send(final_state);
                            }
                        }
                    }
                    ChannelEvent::TransportError(e) => {
                        warn!(error = %e, "transport error");
                        let _ = status_tx.send_replace(ConnectionStatus::Error);
                    }
                    ChannelEvent::Closed(CloseReason::Local) => {
                        debug!("local close, run loop exiting");
                        let _ = status_tx.send_replace(ConnectionStatus::Disconnected);
                        supervisor.lock().cancel();
                        break;
                    }
                    ChannelEvent::Closed(reason) => {
                        debug!(?reason, "channel closed");
                        let _ = status_tx.send_replace(ConnectionStatus::Disconnected);
                        if channel.close_requested() {
                            supervisor.lock().cancel();
                            break;
                        }
                        supervisor.lock().on_unintended_close();
                    }
                }
            }
            tick = tick_rx.recv() => {
                let Some(()) = tick else { break };
                let _ = status_tx.send_replace(ConnectionStatus::Connecting);
                debug!("reconnecting");
                // A failed attempt emits Closed(ConnectFailed), which
                // arms the next timer. Retries have no cap.
                if let Err(e) = channel.open(&endpoint).await {
                    warn!(error = %e, "reconnect attempt failed");
                }
            }
        }
    }
}
