//! Remote resource client.
//!
//! The API is JSON over HTTPS: `GET` for reads, `POST`/`PUT` for writes, an
//! optional bearer token, and either a JSON `{message}` or a plain-text body
//! on failure. Every failure is classified into a [`SyncError`] here so the
//! coordinator never sees transport details.

use crate::auth::Credentials;
use crate::config::Config;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Method;
use serde_json::Value;
use skul_sync_engine::{Error as EngineError, OpMethod};
use std::sync::Arc;
use std::time::Duration;

/// Header carrying the per-operation deduplication token.
pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// The coordinator's only view of the server.
#[async_trait]
pub trait RemoteClient: Send + Sync {
    /// `GET <path>`; returns the raw JSON body (`null` when empty).
    async fn fetch(&self, path: &str) -> Result<Value>;

    /// Send a write; returns the server's JSON response (`null` when empty).
    async fn submit(
        &self,
        method: OpMethod,
        path: &str,
        body: &Value,
        idempotency_key: &str,
    ) -> Result<Value>;

    /// Drop stored credentials after the server reported them expired.
    fn clear_credentials(&self);

    /// `GET <path>` only to learn whether the server answers.
    ///
    /// Any HTTP status counts as an answer. Implementations must not act on
    /// the response, so an expired token found here is left in place.
    async fn check_reachable(&self, path: &str) -> Result<()> {
        match self.fetch(path).await {
            Err(err @ (SyncError::NetworkUnreachable(_) | SyncError::Timeout(_))) => Err(err),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl<T: RemoteClient + ?Sized> RemoteClient for Arc<T> {
    async fn fetch(&self, path: &str) -> Result<Value> {
        (**self).fetch(path).await
    }

    async fn submit(
        &self,
        method: OpMethod,
        path: &str,
        body: &Value,
        idempotency_key: &str,
    ) -> Result<Value> {
        (**self).submit(method, path, body, idempotency_key).await
    }

    fn clear_credentials(&self) {
        (**self).clear_credentials()
    }

    async fn check_reachable(&self, path: &str) -> Result<()> {
        (**self).check_reachable(path).await
    }
}

/// [`RemoteClient`] over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpRemoteClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Credentials,
    timeout: Duration,
}

impl HttpRemoteClient {
    /// Create a client for `base_url`.
    pub fn new(
        base_url: impl Into<String>,
        credentials: Credentials,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::NetworkUnreachable(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            timeout,
        })
    }

    /// Create a client from configuration.
    pub fn from_config(config: &Config, credentials: Credentials) -> Result<Self> {
        Self::new(&config.api_base_url, credentials, config.request_timeout)
    }

    /// Credentials used by this client.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.credentials.header_value() {
            Some(header) => request.header(AUTHORIZATION, header),
            None => request,
        }
    }

    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let err = SyncError::from_status(status.as_u16(), body);
            if matches!(err, SyncError::AuthExpired) {
                self.credentials.clear();
            }
            return Err(err);
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        // Plain-text acknowledgements are passed through as a JSON string.
        Ok(serde_json::from_str(&body).unwrap_or(Value::String(body)))
    }

    fn transport_error(&self, err: reqwest::Error) -> SyncError {
        if err.is_timeout() {
            SyncError::Timeout(self.timeout)
        } else {
            SyncError::NetworkUnreachable(err.to_string())
        }
    }
}

#[async_trait]
impl RemoteClient for HttpRemoteClient {
    async fn fetch(&self, path: &str) -> Result<Value> {
        tracing::debug!(path = %path, "GET");
        self.execute(self.http.get(self.url(path))).await
    }

    async fn submit(
        &self,
        method: OpMethod,
        path: &str,
        body: &Value,
        idempotency_key: &str,
    ) -> Result<Value> {
        tracing::debug!(path = %path, method = %method, key = %idempotency_key, "submit");
        let verb = Method::from_bytes(method.http_verb().as_bytes())
            .map_err(|e| SyncError::Engine(EngineError::InvalidPayload(e.to_string())))?;
        let request = self
            .http
            .request(verb, self.url(path))
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .json(body);
        self.execute(request).await
    }

    fn clear_credentials(&self) {
        self.credentials.clear();
    }

    async fn check_reachable(&self, path: &str) -> Result<()> {
        let response = self
            .authorized(self.http.get(self.url(path)))
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;
        tracing::trace!(path = %path, status = %response.status(), "Server answered");
        Ok(())
    }
}
