//! End-to-end tests against a real loopback WebSocket server.

use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{Request, Response};

use chorale_sync::{
    ConnectionStatus, SessionClient, SessionEndpoint, SessionRole, SessionStatus, SyncConfig,
};

const TIMEOUT: Duration = Duration::from_secs(5);

/// One accepted server-side connection.
///
/// Dropping `tx` (or the whole struct) closes the connection from the
/// server side with a close frame.
struct ServerConn {
    /// Request path + query the client dialed.
    path: String,
    /// Text frames to push to the client.
    tx: mpsc::Sender<String>,
    /// Text frames received from the client.
    rx: mpsc::Receiver<String>,
}

impl ServerConn {
    async fn send(&self, value: &Value) {
        self.tx
            .send(value.to_string())
            .await
            .expect("server connection alive");
    }

    async fn recv(&mut self) -> Value {
        let text = timeout(TIMEOUT, self.rx.recv())
            .await
            .expect("frame within timeout")
            .expect("connection alive");
        serde_json::from_str(&text).expect("client sent JSON")
    }
}

/// Minimal session server: accepts connections and hands each to the
/// test as a [`ServerConn`].
struct TestServer {
    base_url: String,
    conns: mpsc::Receiver<ServerConn>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        let (conn_tx, conns) = mpsc::channel(8);

        let _ = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let conn_tx = conn_tx.clone();
                let _ = tokio::spawn(async move {
                    if let Some(conn) = accept_conn(stream).await {
                        let _ = conn_tx.send(conn).await;
                    }
                });
            }
        });

        Self {
            base_url: format!("ws://{addr}"),
            conns,
        }
    }

    async fn next_conn(&mut self) -> ServerConn {
        timeout(TIMEOUT, self.conns.recv())
            .await
            .expect("connection within timeout")
            .expect("accept loop alive")
    }

    fn endpoint(&self) -> SessionEndpoint {
        SessionEndpoint::new(self.base_url.clone(), "sess1", "u1", "Alice")
    }
}

async fn accept_conn(stream: TcpStream) -> Option<ServerConn> {
    let path = Arc::new(Mutex::new(String::new()));
    let path_capture = Arc::clone(&path);
    let ws = accept_hdr_async(stream, move |req: &Request, resp: Response| {
        *path_capture.lock() = req.uri().to_string();
        Ok(resp)
    })
    .await
    .ok()?;

    let (out_tx, mut out_rx) = mpsc::channel::<String>(32);
    let (in_tx, in_rx) = mpsc::channel::<String>(32);
    let _ = tokio::spawn(async move {
        let (mut sink, mut stream) = ws.split();
        loop {
            tokio::select! {
                out = out_rx.recv() => match out {
                    Some(text) => {
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    // Test dropped the handle: close from the server side.
                    None => {
                        let _ = sink.close().await;
                        break;
                    }
                },
                frame = stream.next() => match frame {
                    Some(Ok(Message::Text(t))) => {
                        if in_tx.send(t.to_string()).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    _ => break,
                }
            }
        }
    });

    let path = path.lock().clone();
    Some(ServerConn {
        path,
        tx: out_tx,
        rx: in_rx,
    })
}

fn fast_config() -> SyncConfig {
    SyncConfig {
        reconnect_delay_ms: 100,
        ..SyncConfig::default()
    }
}

async fn wait_until(client: &SessionClient, pred: impl Fn(&chorale_sync::SessionStore) -> bool) {
    for _ in 0..200 {
        if pred(&client.snapshot()) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("store condition not met within timeout");
}

fn snapshot_msg() -> Value {
    json!({
        "type": "session_state",
        "session_id": "sess1",
        "state": {
            "session_status": "waiting",
            "participants": { "u1": { "username": "A" } },
            "current_sentence": 0,
            "chat_messages": []
        },
        "your_user_id": "u1"
    })
}

#[tokio::test]
async fn client_dials_the_documented_url() {
    let mut server = TestServer::start().await;
    let endpoint = SessionEndpoint::new(server.base_url.clone(), "sess1", "u1", "Alice B");
    let client = SessionClient::connect(endpoint, SessionRole::Participant, fast_config())
        .await
        .expect("connect");
    let conn = server.next_conn().await;
    assert_eq!(
        conn.path,
        "/api/ws/collaborative/sess1?user_id=u1&username=Alice%20B"
    );
    client.close();
}

#[tokio::test]
async fn end_to_end_scenario() {
    let mut server = TestServer::start().await;
    let client = SessionClient::connect(server.endpoint(), SessionRole::Participant, fast_config())
        .await
        .expect("connect");
    let end_rx = client.take_session_end().expect("first take");
    assert!(client.take_session_end().is_none(), "single consumer only");

    let conn = server.next_conn().await;
    conn.send(&snapshot_msg()).await;
    conn.send(&json!({"type":"chat_message","from_user_id":"u2","message":"hi"}))
        .await;
    conn.send(&json!({"type":"session_ended","final_state":{"reason":"done"}}))
        .await;

    let final_state = timeout(TIMEOUT, end_rx)
        .await
        .expect("session end within timeout")
        .expect("sender not dropped");
    assert_eq!(final_state["reason"], "done");

    let snap = client.snapshot();
    assert_eq!(snap.participant_count(), 1);
    assert_eq!(snap.participant("u1").unwrap().username, "A");
    assert_eq!(snap.current_sentence_index, 0);
    assert_eq!(snap.chat_log.len(), 1);
    assert_eq!(snap.status, SessionStatus::Completed);
    client.close();
}

#[tokio::test]
async fn snapshot_replaces_prior_local_state() {
    let mut server = TestServer::start().await;
    let client = SessionClient::connect(server.endpoint(), SessionRole::Participant, fast_config())
        .await
        .expect("connect");
    let conn = server.next_conn().await;

    conn.send(&json!({"type":"participant_joined","user_id":"u5","username":"E"}))
        .await;
    conn.send(&json!({"type":"participant_joined","user_id":"u6","username":"F"}))
        .await;
    conn.send(&json!({"type":"chat_message","from_user_id":"u5","message":"before"}))
        .await;
    wait_until(&client, |s| s.participant_count() == 2).await;

    conn.send(&snapshot_msg()).await;
    wait_until(&client, |s| {
        s.participant_count() == 1 && s.chat_log.is_empty()
    })
    .await;

    let snap = client.snapshot();
    assert!(snap.participant("u5").is_none());
    assert_eq!(snap.session_id.as_deref(), Some("sess1"));
    client.close();
}

#[tokio::test]
async fn cursor_is_stored_verbatim() {
    let mut server = TestServer::start().await;
    let client = SessionClient::connect(server.endpoint(), SessionRole::Participant, fast_config())
        .await
        .expect("connect");
    let conn = server.next_conn().await;

    conn.send(&json!({
        "type": "practice_started",
        "story_content": { "title": "T", "sentences": ["a", "b", "c", "d"] },
        "started_by": "u1",
        "current_sentence": 0
    }))
    .await;
    conn.send(&json!({"type":"sentence_changed","new_sentence_index":2}))
        .await;
    wait_until(&client, |s| s.current_sentence_index == 2).await;

    assert_eq!(client.snapshot().status, SessionStatus::Active);
    client.close();
}

#[tokio::test]
async fn lifecycle_is_terminal_but_fields_still_apply() {
    let mut server = TestServer::start().await;
    let client = SessionClient::connect(server.endpoint(), SessionRole::Participant, fast_config())
        .await
        .expect("connect");
    let conn = server.next_conn().await;

    conn.send(&json!({
        "type": "practice_started",
        "story_content": { "title": "T", "sentences": ["a"] },
        "current_sentence": 0
    }))
    .await;
    conn.send(&json!({"type":"session_ended","final_state":{}}))
        .await;
    wait_until(&client, |s| s.status == SessionStatus::Completed).await;

    conn.send(&json!({"type":"session_paused"})).await;
    conn.send(&json!({"type":"session_resumed"})).await;
    conn.send(&json!({"type":"sentence_changed","new_sentence_index":7}))
        .await;
    wait_until(&client, |s| s.current_sentence_index == 7).await;

    assert_eq!(client.snapshot().status, SessionStatus::Completed);
    client.close();
}

#[tokio::test]
async fn host_commands_reach_the_wire() {
    let mut server = TestServer::start().await;
    let client = SessionClient::connect(server.endpoint(), SessionRole::Host, fast_config())
        .await
        .expect("connect");
    let mut conn = server.next_conn().await;

    let sender = client.sender();
    assert!(sender.pause_session());
    assert!(sender.chat("  hello  "));

    let first = conn.recv().await;
    assert_eq!(first["type"], "session_control");
    assert_eq!(first["action"], "pause_session");
    let second = conn.recv().await;
    assert_eq!(second["type"], "chat_message");
    assert_eq!(second["message"], "hello");
    client.close();
}

#[tokio::test]
async fn non_host_control_never_reaches_the_wire() {
    let mut server = TestServer::start().await;
    let client = SessionClient::connect(server.endpoint(), SessionRole::Participant, fast_config())
        .await
        .expect("connect");
    let mut conn = server.next_conn().await;

    let sender = client.sender();
    assert!(!sender.pause_session());
    assert!(!sender.end_session());
    assert!(!sender.start_practice(&chorale_events::StoryContent {
        title: "T".into(),
        sentences: vec!["a".into()],
    }));
    // The next frame the server sees must be the chat, proving the
    // gated commands were never sent.
    assert!(sender.chat("only this"));
    let frame = conn.recv().await;
    assert_eq!(frame["type"], "chat_message");
    assert_eq!(frame["message"], "only this");
    client.close();
}

#[tokio::test]
async fn reconnects_after_server_drop() {
    let mut server = TestServer::start().await;
    let client = SessionClient::connect(server.endpoint(), SessionRole::Participant, fast_config())
        .await
        .expect("connect");
    let conn = server.next_conn().await;

    let mut status = client.connection_status();
    let _ = timeout(TIMEOUT, status.wait_for(|s| *s == ConnectionStatus::Connected))
        .await
        .expect("connected")
        .expect("status channel alive");

    // Server-side drop: unintended close from the client's view.
    drop(conn);
    let _ = timeout(
        TIMEOUT,
        status.wait_for(|s| *s == ConnectionStatus::Disconnected),
    )
    .await
    .expect("disconnected")
    .expect("status channel alive");

    // One fixed-delay attempt later the client is back.
    let conn2 = server.next_conn().await;
    let _ = timeout(TIMEOUT, status.wait_for(|s| *s == ConnectionStatus::Connected))
        .await
        .expect("reconnected")
        .expect("status channel alive");

    // The fresh connection resyncs through a snapshot as usual.
    conn2.send(&snapshot_msg()).await;
    wait_until(&client, |s| s.participant_count() == 1).await;
    client.close();
}

#[tokio::test]
async fn intentional_close_suppresses_reconnect() {
    let mut server = TestServer::start().await;
    let client = SessionClient::connect(server.endpoint(), SessionRole::Participant, fast_config())
        .await
        .expect("connect");
    let conn = server.next_conn().await;
    conn.send(&snapshot_msg()).await;
    wait_until(&client, |s| s.participant_count() == 1).await;

    client.close();

    // Well past the reconnect delay: no new connection may arrive.
    let reconnected = timeout(Duration::from_millis(500), server.next_conn()).await;
    assert!(reconnected.is_err(), "close() must suppress reconnection");

    // The store stays intact for final inspection.
    assert_eq!(client.snapshot().participant_count(), 1);

    // Sends after teardown are refused locally.
    assert!(!client.sender().chat("too late"));
}
