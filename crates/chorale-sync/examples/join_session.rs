//! Join a collaborative session and tail it from the terminal.
//!
//! ```sh
//! cargo run --example join_session -- ws://localhost:8000 SESSION_ID USER_ID USERNAME [--host]
//! ```

use std::time::Duration;

use chorale_sync::{ChatEntry, SessionClient, SessionEndpoint, SessionRole, SyncConfig};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,chorale_sync=debug".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(base_url), Some(session_id), Some(user_id), Some(username)) =
        (args.next(), args.next(), args.next(), args.next())
    else {
        eprintln!("usage: join_session <base-url> <session-id> <user-id> <username> [--host]");
        std::process::exit(2);
    };
    let role = if args.any(|a| a == "--host") {
        SessionRole::Host
    } else {
        SessionRole::Participant
    };

    let endpoint = SessionEndpoint::new(base_url, session_id, user_id, username);
    let client = SessionClient::connect(endpoint, role, SyncConfig::default())
        .await
        .unwrap_or_else(|err| {
            eprintln!("failed to connect: {err}");
            std::process::exit(1);
        });
    println!("connected (host: {})", client.is_host());

    let mut end_rx = client.take_session_end().expect("first take");
    let mut status_rx = client.connection_status();
    let mut printed = 0;

    // Poll the mirror for new chat entries until the session ends.
    loop {
        tokio::select! {
            end = &mut end_rx => {
                match end {
                    Ok(final_state) => println!("session ended: {final_state}"),
                    Err(_) => println!("client torn down before session end"),
                }
                break;
            }
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("[connection: {:?}]", *status_rx.borrow_and_update());
            }
            () = tokio::time::sleep(Duration::from_millis(250)) => {}
        }

        let snap = client.snapshot();
        for entry in snap.chat_log.iter().skip(printed) {
            match entry {
                ChatEntry::System { text, .. } => println!("-- {text}"),
                ChatEntry::Chat { from_user_id, text, .. } => println!("<{from_user_id}> {text}"),
                ChatEntry::FeedbackShared { from_user_id, text, .. } => {
                    println!("** feedback from {from_user_id}: {text}");
                }
            }
        }
        printed = snap.chat_log.len();
    }
}
