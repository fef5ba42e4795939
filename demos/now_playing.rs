//! # Now Playing Example
//!
//! Connects to a remote player and prints the current track whenever the
//! mirrored state changes. The first command or explicit authentication
//! triggers the player's approval prompt.
//!
//! ## Running
//!
//! ```sh
//! PLAYER_HOST=127.0.0.1 PLAYER_MODE=push cargo run --example now_playing
//! ```
//!
//! `PLAYER_MODE` accepts `push` (default) or `poll`. Press `Ctrl+C` to exit.

use remote_player_client::{
    ClientServices, KeyringCredentialStore, PlayerState, RemotePlayerClient, RemotePlayerConfig,
    SyncMode,
};
use std::sync::Arc;

fn describe(state: &PlayerState) -> String {
    match &state.song {
        Some(track) => format!(
            "{} {} - {} [{:.0}/{:.0}s] vol {}%{}",
            if state.is_playing { "▶" } else { "⏸" },
            track.artist,
            track.title,
            state.position_seconds,
            track.duration_seconds,
            state.volume_percent,
            if state.muted { " (muted)" } else { "" },
        ),
        None => "nothing playing".to_owned(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing so library logs are visible.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // ── Configuration ───────────────────────────────────────────────
    let host = std::env::var("PLAYER_HOST").unwrap_or_else(|_| "127.0.0.1".to_owned());
    let mode = match std::env::var("PLAYER_MODE").as_deref() {
        Ok("poll") => SyncMode::Poll,
        _ => SyncMode::Push,
    };
    let config = RemotePlayerConfig::new("now-playing-demo")
        .with_host(host)
        .with_mode(mode);

    // Tokens survive restarts in the OS keyring, so the approval prompt is
    // shown only once.
    let credentials = Arc::new(KeyringCredentialStore::new("now-playing-demo"));
    let services = ClientServices::default().with_credentials(credentials);

    tracing::info!("Connecting to {} in {:?} mode", config.origin(), mode);
    let client = RemotePlayerClient::start(config, services)?;
    client.authenticate().await?;

    // ── Event loop ──────────────────────────────────────────────────
    let mut state = client.subscribe();
    let mut connection = client.subscribe_connection();
    loop {
        tokio::select! {
            changed = state.changed() => {
                if changed.is_err() {
                    break;
                }
                let line = describe(&state.borrow_and_update());
                println!("{line}");
            }
            changed = connection.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = connection.borrow_and_update().clone();
                tracing::info!("Connection: {status:?}");
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl+C received, shutting down");
                break;
            }
        }
    }

    // ── Clean shutdown ──────────────────────────────────────────────
    client.shutdown().await;
    Ok(())
}
