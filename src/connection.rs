//! Background synchronization with the remote player.
//!
//! A single task keeps the [`PlayerStore`] in sync: in push mode it holds the
//! event stream open and folds every message into the store, in poll mode it
//! fetches the query endpoints on an interval (see [`crate::poll`]). Either
//! way, losing the remote player clears the store and schedules a retry with
//! bounded exponential backoff.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::backoff::Backoff;
use crate::config::{RemotePlayerConfig, SyncMode};
use crate::error::{RemotePlayerError, Result};
use crate::protocol::PlayerEvent;
use crate::store::PlayerStore;
use crate::transport::{Connector, EventStream};

/// Lifecycle of the link to the remote player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No sync task is running.
    #[default]
    Disconnected,
    /// Opening the event stream, or waiting for the first poll.
    Connecting,
    /// The event stream is open, or the last poll succeeded.
    Connected,
    /// The link failed; the next attempt starts after `delay`.
    ReconnectScheduled {
        /// Number of consecutive failures, starting at 1.
        attempt: u32,
        delay: Duration,
    },
}

// ── Shared context ──────────────────────────────────────────────────

/// Everything the sync task needs, shared with the client handle.
pub(crate) struct SyncContext {
    pub(crate) config: RemotePlayerConfig,
    pub(crate) store: Arc<PlayerStore>,
    pub(crate) api: ApiClient,
    pub(crate) connector: Arc<dyn Connector>,
    status: watch::Sender<ConnectionState>,
}

impl SyncContext {
    pub(crate) fn new(
        config: RemotePlayerConfig,
        store: Arc<PlayerStore>,
        api: ApiClient,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let (status, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            store,
            api,
            connector,
            status,
        }
    }

    pub(crate) fn status(&self) -> ConnectionState {
        *self.status.borrow()
    }

    pub(crate) fn subscribe_status(&self) -> watch::Receiver<ConnectionState> {
        self.status.subscribe()
    }

    pub(crate) fn set_status(&self, state: ConnectionState) {
        let previous = self.status.send_replace(state);
        if previous != state {
            debug!(?previous, current = ?state, "connection state changed");
        }
    }

    /// Clear the mirror, pick the next backoff delay and publish it.
    pub(crate) fn schedule_retry(&self, backoff: &mut Backoff) -> Duration {
        self.store.reset();
        let delay = backoff.next_delay();
        self.set_status(ConnectionState::ReconnectScheduled {
            attempt: backoff.attempt(),
            delay,
        });
        delay
    }
}

// ── Manager ─────────────────────────────────────────────────────────

/// Owns the sync task and its shutdown signal.
pub(crate) struct ConnectionManager {
    ctx: Arc<SyncContext>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectionManager {
    pub(crate) fn new(ctx: Arc<SyncContext>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            ctx,
            shutdown_tx,
            task: Mutex::new(None),
        }
    }

    pub(crate) fn context(&self) -> &Arc<SyncContext> {
        &self.ctx
    }

    pub(crate) fn is_shut_down(&self) -> bool {
        *self.shutdown_tx.borrow()
    }

    /// Mark the manager as shut down. The sync task sees this on its next
    /// `select!`; nothing is awaited here.
    pub(crate) fn signal_shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Spawn the sync task unless it is already running.
    pub(crate) fn start(&self) -> Result<()> {
        if self.is_shut_down() {
            return Err(RemotePlayerError::NotRunning);
        }
        let mut task = self.task.lock().unwrap_or_else(PoisonError::into_inner);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            debug!("sync task already running");
            return Ok(());
        }

        let ctx = Arc::clone(&self.ctx);
        let shutdown = self.shutdown_tx.subscribe();
        info!(mode = ?ctx.config.mode, "starting sync task");
        *task = Some(match ctx.config.mode {
            SyncMode::Push => tokio::spawn(run_push(ctx, shutdown)),
            SyncMode::Poll => tokio::spawn(crate::poll::run_poll(ctx, shutdown)),
        });
        Ok(())
    }

    /// Signal the sync task to stop and wait up to `timeout` for it.
    ///
    /// The task is aborted if it does not exit in time. The store is cleared
    /// either way.
    pub(crate) async fn stop(&self, timeout: Duration) {
        self.signal_shutdown();

        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(mut task) = task {
            match tokio::time::timeout(timeout, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(join_err)) => {
                    warn!("sync task terminated with join error: {join_err}");
                }
                Err(_) => {
                    warn!("sync task did not exit within timeout; aborting task");
                    task.abort();
                    if let Err(join_err) = task.await {
                        debug!("sync task aborted: {join_err}");
                    }
                }
            }
        }

        self.ctx.store.reset();
        self.ctx.set_status(ConnectionState::Disconnected);
    }

    pub(crate) fn has_task(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Abort the sync task without waiting.
    pub(crate) fn abort(&self) {
        self.signal_shutdown();
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

/// Resolves once shutdown has been requested (or the signal's sender is gone).
pub(crate) async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

// ── Push loop ───────────────────────────────────────────────────────

enum StreamEnd {
    Shutdown,
    Closed,
    Failed(RemotePlayerError),
}

/// Connect, pump events, and reconnect with backoff until shutdown.
async fn run_push(ctx: Arc<SyncContext>, mut shutdown: watch::Receiver<bool>) {
    let url = ctx.config.event_stream_url();
    let mut backoff = Backoff::new(ctx.config.max_reconnect_delay);
    debug!(%url, "push loop started");

    loop {
        ctx.set_status(ConnectionState::Connecting);
        let connect = tokio::time::timeout(ctx.config.connect_timeout, ctx.connector.connect(&url));
        let connected = tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => break,
            result = connect => result.unwrap_or(Err(RemotePlayerError::Timeout)),
        };

        match connected {
            Ok(mut stream) => {
                backoff.reset();
                ctx.set_status(ConnectionState::Connected);
                info!(%url, "event stream open");

                match pump(&ctx, stream.as_mut(), &mut shutdown).await {
                    StreamEnd::Shutdown => {
                        if let Err(e) = stream.close().await {
                            debug!("error closing event stream: {e}");
                        }
                        break;
                    }
                    StreamEnd::Closed => info!("event stream closed by remote player"),
                    StreamEnd::Failed(e) => warn!("event stream failed: {e}"),
                }
            }
            Err(e) => warn!(%url, "failed to open event stream: {e}"),
        }

        let delay = ctx.schedule_retry(&mut backoff);
        info!(
            attempt = backoff.attempt(),
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            "reconnect scheduled"
        );
        tokio::select! {
            _ = wait_for_shutdown(&mut shutdown) => break,
            () = tokio::time::sleep(delay) => {}
        }
    }

    debug!("push loop exited");
}

async fn pump(
    ctx: &SyncContext,
    stream: &mut dyn EventStream,
    shutdown: &mut watch::Receiver<bool>,
) -> StreamEnd {
    loop {
        tokio::select! {
            _ = wait_for_shutdown(shutdown) => return StreamEnd::Shutdown,
            incoming = stream.recv() => match incoming {
                Some(Ok(text)) => handle_message(&ctx.store, &text),
                Some(Err(e)) => return StreamEnd::Failed(e),
                None => return StreamEnd::Closed,
            },
        }
    }
}

/// Parse one pushed message and fold it into the store.
///
/// Malformed messages are logged and dropped.
pub(crate) fn handle_message(store: &PlayerStore, text: &str) {
    match serde_json::from_str::<PlayerEvent>(text) {
        Ok(event) => store.apply_event(&event),
        Err(e) => warn!("dropping malformed player event: {e}"),
    }
}
