//! Async client for a remote media player.
//!
//! [`RemotePlayerClient`] is the composition root: it owns the state store,
//! the authenticated API client and the background sync task, and exposes the
//! playback commands. Observers read the mirrored state through
//! [`snapshot`](RemotePlayerClient::snapshot) or a
//! [`subscribe`](RemotePlayerClient::subscribe)d watch receiver.
//!
//! # Example
//!
//! ```rust,no_run
//! # async fn example() -> remote_player_client::Result<()> {
//! use remote_player_client::{ClientServices, RemotePlayerClient, RemotePlayerConfig};
//!
//! let client = RemotePlayerClient::start(
//!     RemotePlayerConfig::new("my-widget"),
//!     ClientServices::default(),
//! )?;
//!
//! let mut state = client.subscribe();
//! while state.changed().await.is_ok() {
//!     let snapshot = state.borrow_and_update().clone();
//!     if let Some(song) = &snapshot.song {
//!         println!("{} - {} ({:.0}s)", song.artist, song.title, snapshot.position_seconds);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::ApiClient;
use crate::auth::Authenticator;
use crate::config::{RemotePlayerConfig, SyncMode};
use crate::connection::{ConnectionManager, ConnectionState, SyncContext};
use crate::credentials::{CredentialStore, MemoryCredentialStore};
use crate::error::{RemotePlayerError, Result};
use crate::notify::{Notifier, TracingNotifier};
use crate::poll::fetch_snapshot;
use crate::protocol::{Command, VolumeResponse};
use crate::state::PlayerState;
use crate::store::PlayerStore;
use crate::transport::Connector;

// ── Services ────────────────────────────────────────────────────────

/// Collaborators injected into the client.
///
/// With the `transport-websocket` feature (on by default), `Default` gives an
/// in-memory credential store, a tracing notifier and the WebSocket
/// connector.
#[derive(Clone)]
pub struct ClientServices {
    pub credentials: Arc<dyn CredentialStore>,
    pub notifier: Arc<dyn Notifier>,
    pub connector: Arc<dyn Connector>,
}

impl ClientServices {
    /// Services using `connector`, an in-memory credential store and a
    /// tracing notifier.
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            credentials: Arc::new(MemoryCredentialStore::new()),
            notifier: Arc::new(TracingNotifier),
            connector,
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: Arc<dyn CredentialStore>) -> Self {
        self.credentials = credentials;
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    #[must_use]
    pub fn with_connector(mut self, connector: Arc<dyn Connector>) -> Self {
        self.connector = connector;
        self
    }
}

#[cfg(feature = "transport-websocket")]
impl Default for ClientServices {
    fn default() -> Self {
        Self::new(Arc::new(crate::transports::WebSocketConnector::new()))
    }
}

impl std::fmt::Debug for ClientServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientServices").finish_non_exhaustive()
    }
}

// ── Client handle ───────────────────────────────────────────────────

/// Handle to a remote media player.
///
/// Created via [`RemotePlayerClient::start`], which spawns the background
/// sync task. Commands are relayed to the remote player over HTTP and return
/// once it has accepted them.
///
/// In [`SyncMode::Push`] commands never touch the local state: the remote
/// player reports the result over the event stream. In [`SyncMode::Poll`] a
/// successful command applies its expected effect locally right away and
/// schedules a confirming fetch after the configured settle delay; a newer
/// command replaces a pending fetch.
pub struct RemotePlayerClient {
    manager: ConnectionManager,
    /// Confirming fetch scheduled by the last command in poll mode.
    refetch: Mutex<Option<JoinHandle<()>>>,
    shutdown_timeout: Duration,
}

impl RemotePlayerClient {
    /// Build the client and start syncing with the remote player.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`RemotePlayerError::Network`] if the HTTP client cannot be
    /// initialized.
    pub fn start(config: RemotePlayerConfig, services: ClientServices) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        let auth = Arc::new(Authenticator::new(
            http.clone(),
            &config,
            services.credentials,
            services.notifier,
        ));
        let api = ApiClient::new(http, config.api_base(), auth);
        let store = Arc::new(PlayerStore::new());
        let shutdown_timeout = config.shutdown_timeout;

        let ctx = Arc::new(SyncContext::new(config, store, api, services.connector));
        let client = Self {
            manager: ConnectionManager::new(ctx),
            refetch: Mutex::new(None),
            shutdown_timeout,
        };
        client.connect()?;
        Ok(client)
    }

    // ── State accessors ─────────────────────────────────────────────

    /// Clone of the current mirrored state.
    pub fn snapshot(&self) -> PlayerState {
        self.ctx().store.snapshot()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<PlayerState> {
        self.ctx().store.subscribe()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.ctx().status()
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        self.ctx().subscribe_status()
    }

    pub fn mode(&self) -> SyncMode {
        self.ctx().config.mode
    }

    pub fn config(&self) -> &RemotePlayerConfig {
        &self.ctx().config
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    /// Make sure the sync task is running. Does nothing if it already is.
    ///
    /// # Errors
    ///
    /// Returns [`RemotePlayerError::NotRunning`] after
    /// [`shutdown`](Self::shutdown).
    pub fn connect(&self) -> Result<()> {
        self.manager.start()
    }

    /// Stop syncing, close the event stream and cancel every pending timer.
    ///
    /// Waits up to the configured shutdown timeout for the sync task before
    /// aborting it. The mirrored state is cleared. Calling this twice is
    /// harmless.
    pub async fn shutdown(&self) {
        debug!("RemotePlayerClient: shutdown requested");
        // Flag first so a command still in flight cannot queue another fetch.
        self.manager.signal_shutdown();
        self.cancel_refetch();
        self.manager.stop(self.shutdown_timeout).await;
    }

    /// Ask the remote player for a token now.
    ///
    /// Normally this happens on demand when a request is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`RemotePlayerError::Auth`] if the user denies the prompt or
    /// the remote player cannot be reached.
    pub async fn authenticate(&self) -> Result<()> {
        self.ensure_running()?;
        self.ctx().api.authenticator().authenticate().await
    }

    /// Fetch the current track, shuffle and repeat state and merge it.
    pub async fn refresh(&self) -> Result<()> {
        self.ensure_running()?;
        let ctx = self.ctx();
        let polled = fetch_snapshot(&ctx.api).await?;
        ctx.store.merge_polled(&polled);
        Ok(())
    }

    /// Fetch the current volume, store it and return it.
    ///
    /// The query endpoints do not report volume, so poll-mode hosts call this
    /// when they need it.
    pub async fn refresh_volume(&self) -> Result<u8> {
        self.ensure_running()?;
        let ctx = self.ctx();
        let response: VolumeResponse = ctx.api.get_json("/volume").await?;
        let mut volume = 0;
        ctx.store.update(|state| {
            state.set_volume(response.state);
            volume = state.volume_percent;
        });
        Ok(volume)
    }

    // ── Commands ────────────────────────────────────────────────────

    pub async fn toggle_playback(&self) -> Result<()> {
        self.execute(Command::TogglePlayback).await
    }

    pub async fn next_track(&self) -> Result<()> {
        self.execute(Command::NextTrack).await
    }

    pub async fn previous_track(&self) -> Result<()> {
        self.execute(Command::PreviousTrack).await
    }

    pub async fn toggle_shuffle(&self) -> Result<()> {
        self.execute(Command::ToggleShuffle).await
    }

    pub async fn toggle_mute(&self) -> Result<()> {
        self.execute(Command::ToggleMute).await
    }

    /// Advance the repeat mode: none, all, one, then none again.
    pub async fn cycle_repeat(&self) -> Result<()> {
        self.execute(Command::CycleRepeat).await
    }

    /// Seek to `seconds` into the current track. Negative values seek to 0.
    ///
    /// # Errors
    ///
    /// Returns [`RemotePlayerError::InvalidArgument`] for NaN or infinite
    /// input without contacting the remote player.
    pub async fn seek(&self, seconds: f64) -> Result<()> {
        if !seconds.is_finite() {
            return Err(RemotePlayerError::InvalidArgument(format!(
                "seek target must be finite, got {seconds}"
            )));
        }
        self.execute(Command::SeekTo {
            seconds: seconds.max(0.0),
        })
        .await
    }

    /// Set the volume in percent. Values above 100 are clamped.
    pub async fn set_volume(&self, percent: u8) -> Result<()> {
        self.execute(Command::SetVolume {
            percent: percent.min(100),
        })
        .await
    }

    // ── Internal helpers ────────────────────────────────────────────

    fn ctx(&self) -> &Arc<SyncContext> {
        self.manager.context()
    }

    fn ensure_running(&self) -> Result<()> {
        if self.manager.is_shut_down() {
            return Err(RemotePlayerError::NotRunning);
        }
        Ok(())
    }

    async fn execute(&self, command: Command) -> Result<()> {
        self.ensure_running()?;
        let ctx = self.ctx();
        let body = command.body()?;

        if let Err(e) = ctx.api.post(command.path(), body.as_ref()).await {
            warn!(path = command.path(), "command failed: {e}");
            return Err(e);
        }
        debug!(?command, "command accepted");

        if ctx.config.mode == SyncMode::Poll {
            self.apply_and_refetch(&command);
        }
        Ok(())
    }

    /// Apply `command` to the mirror and replace any pending confirming
    /// fetch with a new one.
    ///
    /// Runs under the refetch lock, which `shutdown` takes after raising the
    /// shutdown flag, so nothing is applied or spawned once shutdown began.
    fn apply_and_refetch(&self, command: &Command) {
        let ctx = Arc::clone(self.ctx());
        let delay = ctx.config.settle_delay;

        let mut pending = self.refetch.lock().unwrap_or_else(PoisonError::into_inner);
        if self.manager.is_shut_down() {
            debug!(?command, "client shut down, skipping optimistic update");
            return;
        }
        ctx.store.update(|state| state.apply_optimistic(command));
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match fetch_snapshot(&ctx.api).await {
                Ok(polled) => ctx.store.merge_polled(&polled),
                Err(e) => warn!("confirming fetch failed: {e}"),
            }
        }));
    }

    fn cancel_refetch(&self) {
        if let Some(task) = self
            .refetch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

impl std::fmt::Debug for RemotePlayerClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemotePlayerClient")
            .field("mode", &self.mode())
            .field("connection", &self.connection_state())
            .field("has_task", &self.manager.has_task())
            .finish()
    }
}

impl Drop for RemotePlayerClient {
    fn drop(&mut self) {
        // No executor is available to drive a graceful close here.
        self.cancel_refetch();
        self.manager.abort();
    }
}
