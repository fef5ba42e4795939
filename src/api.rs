//! Authenticated requests against the remote player's REST API.

use std::sync::Arc;

use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::Authenticator;
use crate::error::{RemotePlayerError, Result};

/// HTTP client bound to the versioned API base.
///
/// Every request carries the cached bearer token when one is known. A `401`
/// triggers one re-authentication and one retry; a second `401` is returned
/// as [`RemotePlayerError::Auth`].
#[derive(Debug, Clone)]
pub(crate) struct ApiClient {
    http: reqwest::Client,
    base: String,
    auth: Arc<Authenticator>,
}

impl ApiClient {
    pub(crate) fn new(http: reqwest::Client, base: String, auth: Arc<Authenticator>) -> Self {
        Self { http, base, auth }
    }

    pub(crate) fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    /// Send a request and return the successful response.
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base, path);

        let (token, generation) = self.auth.current_token().await;
        let response = self.send(&method, &url, body, token.as_deref()).await?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            debug!(%method, path, "request unauthorized, re-authenticating");
            self.auth.authenticate_after(generation).await?;
            let (token, _) = self.auth.current_token().await;
            let retried = self.send(&method, &url, body, token.as_deref()).await?;
            if retried.status() == StatusCode::UNAUTHORIZED {
                warn!(%method, path, "request still unauthorized after re-authentication");
                return Err(RemotePlayerError::Auth(format!(
                    "{method} {path} rejected the new access token"
                )));
            }
            retried
        } else {
            response
        };

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        warn!(%method, path, status = status.as_u16(), "remote API error: {body}");
        Err(RemotePlayerError::RemoteApi {
            status: status.as_u16(),
            body,
        })
    }

    /// `GET` a JSON document.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_optional_json(path).await?.ok_or_else(|| {
            RemotePlayerError::Protocol(format!("GET {path} returned an empty body"))
        })
    }

    /// `GET` a JSON document that may be absent (`204` or an empty body).
    pub(crate) async fn get_optional_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> Result<Option<T>> {
        let response = self.request(Method::GET, path, None).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// `POST` with an optional JSON body, discarding the response.
    pub(crate) async fn post(&self, path: &str, body: Option<&Value>) -> Result<()> {
        self.request(Method::POST, path, body).await?;
        Ok(())
    }

    async fn send(
        &self,
        method: &Method,
        url: &str,
        body: Option<&Value>,
        token: Option<&str>,
    ) -> Result<Response> {
        let mut request = self.http.request(method.clone(), url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        Ok(request.send().await?)
    }
}
