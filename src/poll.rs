//! Poll mode: periodic authoritative fetches.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::backoff::Backoff;
use crate::connection::{wait_for_shutdown, ConnectionState, SyncContext};
use crate::error::Result;
use crate::protocol::{RepeatModeResponse, ShuffleResponse, SongInfo};
use crate::state::PolledState;

/// Fetch `/song`, `/shuffle` and `/repeat-mode` concurrently.
pub(crate) async fn fetch_snapshot(api: &ApiClient) -> Result<PolledState> {
    let (song, shuffle, repeat) = tokio::try_join!(
        api.get_optional_json::<SongInfo>("/song"),
        api.get_json::<ShuffleResponse>("/shuffle"),
        api.get_json::<RepeatModeResponse>("/repeat-mode"),
    )?;
    Ok(PolledState {
        song,
        shuffle: shuffle.state,
        repeat_mode: repeat.mode,
    })
}

/// Poll until shutdown. The first fetch runs immediately.
///
/// Every failure stretches the next delay with backoff. Only connection
/// failures clear the store and publish [`ConnectionState::ReconnectScheduled`];
/// errors the remote player answered with leave both alone.
pub(crate) async fn run_poll(ctx: Arc<SyncContext>, mut shutdown: watch::Receiver<bool>) {
    let mut backoff = Backoff::new(ctx.config.max_reconnect_delay);
    ctx.set_status(ConnectionState::Connecting);
    debug!(interval = ?ctx.config.poll_interval, "poll loop started");

    loop {
        let fetched = tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => break,
            result = fetch_snapshot(&ctx.api) => result,
        };

        let delay = match fetched {
            Ok(polled) => {
                backoff.reset();
                ctx.store.merge_polled(&polled);
                ctx.set_status(ConnectionState::Connected);
                ctx.config.poll_interval
            }
            Err(e) if e.is_connection_error() => {
                warn!("poll failed, remote player unreachable: {e}");
                ctx.schedule_retry(&mut backoff)
            }
            // The player answered, so the mirror and status stay as they are.
            Err(e) => {
                let delay = backoff.next_delay();
                warn!(
                    attempt = backoff.attempt(),
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "poll rejected by remote player: {e}"
                );
                delay
            }
        };

        tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    debug!("poll loop exited");
}
