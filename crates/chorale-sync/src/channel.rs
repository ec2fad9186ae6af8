//! The channel handle — owns one bidirectional WebSocket to a session
//! endpoint.
//!
//! The handle has an explicit state (`Closed | Connecting | Open`), an
//! outbound send queue, and a lifecycle event stream consumed by the
//! client run loop. `open` spawns a reader and a writer task per
//! connection, both governed by a per-connection `CancellationToken`;
//! each connection emits exactly one [`ChannelEvent::Closed`].
//!
//! `close()` is intentional teardown: it synchronously marks the
//! handle closed and permanently suppresses reconnection for this
//! handle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::endpoint::SessionEndpoint;
use crate::errors::{Result, SyncError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connection state of a channel handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    /// No live connection.
    Closed,
    /// A connection attempt is in flight.
    Connecting,
    /// The channel is open and accepting sends.
    Open,
}

/// Why a connection closed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CloseReason {
    /// The connection attempt itself failed.
    ConnectFailed,
    /// The server sent a close frame.
    Remote {
        /// Close code, if the frame carried one.
        code: Option<u16>,
        /// Close reason text.
        reason: String,
    },
    /// The transport failed or the stream ended without a close frame.
    Transport,
    /// `close()` was called locally.
    Local,
}

/// Lifecycle and message events emitted by the channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChannelEvent {
    /// The connection is established.
    Opened,
    /// A text frame arrived.
    Message(String),
    /// The connection closed. Exactly one per connection.
    Closed(CloseReason),
    /// A transport error occurred (always followed by `Closed`).
    TransportError(String),
}

/// Handle to one session channel.
#[derive(Debug)]
pub struct ChannelHandle {
    state: Mutex<ChannelState>,
    writer: Mutex<Option<mpsc::Sender<String>>>,
    events_tx: mpsc::Sender<ChannelEvent>,
    close_requested: AtomicBool,
    cancel: Mutex<CancellationToken>,
    generation: AtomicU64,
    dropped_sends: AtomicU64,
    send_buffer: usize,
}

impl ChannelHandle {
    /// Create a handle and the event stream its connections feed.
    pub fn new(config: &SyncConfig) -> (Arc<Self>, mpsc::Receiver<ChannelEvent>) {
        let (events_tx, events_rx) = mpsc::channel(config.event_buffer);
        let handle = Arc::new(Self {
            state: Mutex::new(ChannelState::Closed),
            writer: Mutex::new(None),
            events_tx,
            close_requested: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
            generation: AtomicU64::new(0),
            dropped_sends: AtomicU64::new(0),
            send_buffer: config.send_buffer,
        });
        (handle, events_rx)
    }

    /// Current connection state.
    pub fn state(&self) -> ChannelState {
        *self.state.lock()
    }

    /// Whether `close()` has been called on this handle.
    pub fn close_requested(&self) -> bool {
        self.close_requested.load(Ordering::SeqCst)
    }

    /// Count of sends dropped because the channel was closed or the
    /// send queue was full.
    pub fn dropped_sends(&self) -> u64 {
        self.dropped_sends.load(Ordering::Relaxed)
    }

    /// Establish the connection and start the reader/writer tasks.
    ///
    /// A no-op `Ok` while already `Connecting` or `Open`. Fails
    /// permanently once `close()` has been called. On a failed attempt
    /// the handle emits `TransportError` then `Closed(ConnectFailed)`
    /// (so the supervisor sees the failure) and also returns the error
    /// to the caller.
    pub async fn open(self: &Arc<Self>, endpoint: &SessionEndpoint) -> Result<()> {
        if self.close_requested() {
            return Err(SyncError::ChannelClosed);
        }
        let url = endpoint.ws_url()?;
        {
            let mut state = self.state.lock();
            if *state != ChannelState::Closed {
                debug!(state = ?*state, "open is a no-op while a channel exists");
                return Ok(());
            }
            *state = ChannelState::Connecting;
        }

        debug!(%url, "connecting");
        match connect_async(url.as_str()).await {
            Ok((ws, _response)) => {
                if self.close_requested() {
                    // close() raced the connect; tear the socket down.
                    *self.state.lock() = ChannelState::Closed;
                    drop(ws);
                    return Err(SyncError::ChannelClosed);
                }
                let (ws_tx, ws_rx) = ws.split();
                let (send_tx, send_rx) = mpsc::channel(self.send_buffer);
                let cancel = CancellationToken::new();
                let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
                *self.cancel.lock() = cancel.clone();
                *self.writer.lock() = Some(send_tx);
                *self.state.lock() = ChannelState::Open;

                let _ = tokio::spawn(writer_loop(ws_tx, send_rx, cancel.clone()));
                let _ = tokio::spawn(reader_loop(ws_rx, Arc::clone(self), generation, cancel));

                if self.events_tx.send(ChannelEvent::Opened).await.is_err() {
                    return Err(SyncError::ChannelClosed);
                }
                Ok(())
            }
            Err(e) => {
                *self.state.lock() = ChannelState::Closed;
                warn!(%url, error = %e, "connect failed");
                let _ = self
                    .events_tx
                    .send(ChannelEvent::TransportError(e.to_string()))
                    .await;
                let _ = self
                    .events_tx
                    .send(ChannelEvent::Closed(CloseReason::ConnectFailed))
                    .await;
                Err(SyncError::Connect {
                    url,
                    source: Box::new(e),
                })
            }
        }
    }

    /// Queue a text frame for sending.
    ///
    /// Returns `false` with no network action if the channel is not
    /// open or the send queue is full. Never queues across
    /// connections.
    pub fn send(&self, text: String) -> bool {
        if *self.state.lock() != ChannelState::Open {
            let _ = self.dropped_sends.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        let accepted = self
            .writer
            .lock()
            .as_ref()
            .is_some_and(|tx| tx.try_send(text).is_ok());
        if !accepted {
            let _ = self.dropped_sends.fetch_add(1, Ordering::Relaxed);
        }
        accepted
    }

    /// Intentional teardown.
    ///
    /// Synchronously marks the handle closed, cancels the connection
    /// tasks, and emits `Closed(Local)`. Reconnection is suppressed
    /// permanently; the session store is left intact for the owner to
    /// inspect and discard. Idempotent.
    pub fn close(&self) {
        if self.close_requested.swap(true, Ordering::SeqCst) {
            return;
        }
        let was_live = {
            let mut state = self.state.lock();
            let live = *state != ChannelState::Closed;
            *state = ChannelState::Closed;
            live
        };
        *self.writer.lock() = None;
        self.cancel.lock().cancel();
        if was_live {
            let _ = self
                .events_tx
                .try_send(ChannelEvent::Closed(CloseReason::Local));
        }
    }

    /// Reader-side close bookkeeping. Only the generation that owns
    /// the connection may reset the state, so a stale reader cannot
    /// clobber a newer connection.
    fn mark_connection_closed(&self, generation: u64) -> bool {
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        *self.state.lock() = ChannelState::Closed;
        *self.writer.lock() = None;
        true
    }
}

/// Pump queued outbound frames into the sink until cancelled.
async fn writer_loop(
    mut sink: SplitSink<WsStream, Message>,
    mut rx: mpsc::Receiver<String>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                // Best-effort close handshake on intentional teardown.
                let _ = sink.close().await;
                break;
            }
            msg = rx.recv() => match msg {
                Some(text) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        debug!(error = %e, "write failed, stopping writer");
                        break;
                    }
                }
                None => break,
            }
        }
    }
}

/// Pump inbound frames into the event stream until the connection
/// ends. Emits exactly one `Closed` unless the close was local.
async fn reader_loop(
    mut stream: SplitStream<WsStream>,
    handle: Arc<ChannelHandle>,
    generation: u64,
    cancel: CancellationToken,
) {
    let reason = loop {
        tokio::select! {
            () = cancel.cancelled() => {
                // Local close already did the bookkeeping and emitted
                // Closed(Local).
                return;
            }
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    if handle
                        .events_tx
                        .send(ChannelEvent::Message(text.to_string()))
                        .await
                        .is_err()
                    {
                        // Consumer is gone; nothing left to notify.
                        return;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    break CloseReason::Remote {
                        code: frame.as_ref().map(|f| u16::from(f.code)),
                        reason: frame.map(|f| f.reason.to_string()).unwrap_or_default(),
                    };
                }
                // Ping/pong and binary frames carry no session events.
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    let _ = handle
                        .events_tx
                        .send(ChannelEvent::TransportError(e.to_string()))
                        .await;
                    break CloseReason::Transport;
                }
                None => break CloseReason::Transport,
            }
        }
    };

    if handle.mark_connection_closed(generation) {
        let _ = handle.events_tx.send(ChannelEvent::Closed(reason)).await;
    }
}
