//! Bearer-token acquisition through the remote player's consent prompt.
//!
//! The remote player issues a token when the user approves a prompt it shows
//! after `POST /auth/{client_name}`. The request stays open until the user
//! decides, so only one prompt may be in flight at a time: attempts are
//! serialized by a mutex, and a generation counter lets late arrivals reuse
//! the outcome of an attempt that finished while they were waiting.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::RemotePlayerConfig;
use crate::credentials::CredentialStore;
use crate::error::{RemotePlayerError, Result};
use crate::notify::{Notifier, Severity};
use crate::protocol::AuthResponse;

const AUTH_FAILED_MESSAGE: &str = "Authentication failed. Did you deny the request?";

/// Cached bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Credential {
    /// Not loaded from persistence yet.
    Unknown,
    /// Known to be missing or invalidated.
    Absent,
    Present(String),
}

#[derive(Debug)]
struct CredentialSlot {
    credential: Credential,
    /// Bumped every time an authentication attempt completes.
    generation: u64,
}

/// Obtains, caches and persists the bearer token.
pub(crate) struct Authenticator {
    http: reqwest::Client,
    auth_url: String,
    storage_key: String,
    notification_title: String,
    timeout: Duration,
    store: Arc<dyn CredentialStore>,
    notifier: Arc<dyn Notifier>,
    slot: Mutex<CredentialSlot>,
    flight: Mutex<()>,
}

impl Authenticator {
    pub(crate) fn new(
        http: reqwest::Client,
        config: &RemotePlayerConfig,
        store: Arc<dyn CredentialStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            http,
            auth_url: config.auth_url(),
            storage_key: config.credential_key(),
            notification_title: config.client_name.clone(),
            timeout: config.auth_timeout,
            store,
            notifier,
            slot: Mutex::new(CredentialSlot {
                credential: Credential::Unknown,
                generation: 0,
            }),
            flight: Mutex::new(()),
        }
    }

    /// The cached token together with the generation it belongs to.
    ///
    /// Loads the token from persistence on first use. A failed load is logged
    /// and treated as "no token".
    pub(crate) async fn current_token(&self) -> (Option<String>, u64) {
        let mut slot = self.slot.lock().await;
        if slot.credential == Credential::Unknown {
            slot.credential = match self.store.get(&self.storage_key).await {
                Ok(Some(token)) if !token.is_empty() => {
                    debug!("loaded persisted access token");
                    Credential::Present(token)
                }
                Ok(_) => Credential::Absent,
                Err(e) => {
                    warn!("failed to load persisted access token: {e}");
                    Credential::Absent
                }
            };
        }
        let token = match &slot.credential {
            Credential::Present(token) => Some(token.clone()),
            Credential::Unknown | Credential::Absent => None,
        };
        (token, slot.generation)
    }

    /// Run the consent flow now.
    ///
    /// Callers that arrive while another attempt is in flight wait for it and
    /// share its outcome instead of prompting again.
    pub(crate) async fn authenticate(&self) -> Result<()> {
        let seen = self.slot.lock().await.generation;
        self.authenticate_after(seen).await
    }

    /// Re-authenticate because the token from generation `seen` was rejected.
    ///
    /// If an attempt has completed since `seen`, its outcome is returned
    /// without sending another request.
    pub(crate) async fn authenticate_after(&self, seen: u64) -> Result<()> {
        let _flight = self.flight.lock().await;

        {
            let slot = self.slot.lock().await;
            if slot.generation != seen {
                debug!(
                    generation = slot.generation,
                    "authentication already completed by another request"
                );
                return match slot.credential {
                    Credential::Present(_) => Ok(()),
                    Credential::Unknown | Credential::Absent => {
                        Err(RemotePlayerError::Auth(AUTH_FAILED_MESSAGE.into()))
                    }
                };
            }
        }

        info!(url = %self.auth_url, "requesting access token");
        match self.request_token().await {
            Ok(token) => {
                self.store_token(token).await;
                info!("authenticated with remote player");
                Ok(())
            }
            Err(e) => {
                error!("authentication failed: {e}");
                self.clear_token().await;
                self.notifier.notify(
                    &self.notification_title,
                    AUTH_FAILED_MESSAGE,
                    Severity::Error,
                );
                Err(RemotePlayerError::Auth(e.to_string()))
            }
        }
    }

    async fn request_token(&self) -> Result<String> {
        let response = self
            .http
            .post(&self.auth_url)
            .header(CONTENT_TYPE, "application/json")
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemotePlayerError::RemoteApi {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let parsed: AuthResponse = serde_json::from_slice(&bytes)?;
        if parsed.access_token.is_empty() {
            return Err(RemotePlayerError::Protocol(
                "auth response carried an empty access token".into(),
            ));
        }
        Ok(parsed.access_token)
    }

    async fn store_token(&self, token: String) {
        if let Err(e) = self.store.set(&self.storage_key, &token).await {
            warn!("failed to persist access token: {e}");
        }
        let mut slot = self.slot.lock().await;
        slot.credential = Credential::Present(token);
        slot.generation = slot.generation.wrapping_add(1);
    }

    async fn clear_token(&self) {
        {
            let mut slot = self.slot.lock().await;
            slot.credential = Credential::Absent;
            slot.generation = slot.generation.wrapping_add(1);
        }
        if let Err(e) = self.store.delete(&self.storage_key).await {
            warn!("failed to delete persisted access token: {e}");
        }
    }
}

impl std::fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Authenticator")
            .field("auth_url", &self.auth_url)
            .field("storage_key", &self.storage_key)
            .finish_non_exhaustive()
    }
}
