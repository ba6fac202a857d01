//! services/notifier/src/adapters/rest.rs
//!
//! This module contains the REST fallback adapter. It implements the
//! `RemoteSyncService` port from the `core` crate using `reqwest`, and is only
//! called while the push connection is down.

use async_trait::async_trait;
use notification_core::ports::{PortError, PortResult, RemoteSyncService};
use reqwest::{Client, Method, StatusCode, Url};
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that syncs notification actions through the REST API.
#[derive(Clone)]
pub struct RestSyncAdapter {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl RestSyncAdapter {
    /// Creates a new `RestSyncAdapter`. `base_url` is the API root, without the
    /// `/notifications` suffix.
    pub fn new(client: Client, base_url: impl Into<String>, auth_token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    /// `{base}/notifications/{segments...}`, each segment percent-encoded.
    fn url(&self, segments: &[&str]) -> PortResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| PortError::Unexpected(format!("bad API base '{}': {}", self.base_url, e)))?;
        url.path_segments_mut()
            .map_err(|_| PortError::Unexpected(format!("bad API base '{}'", self.base_url)))?
            .pop_if_empty()
            .push("notifications")
            .extend(segments);
        Ok(url)
    }

    async fn call(&self, method: Method, segments: &[&str]) -> PortResult<()> {
        let url = self.url(segments)?;
        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| PortError::Unavailable(e.to_string()))?;

        match response.status() {
            status if status.is_success() => {
                debug!("{} {} -> {}", method, url, status);
                Ok(())
            }
            StatusCode::NOT_FOUND => Err(PortError::NotFound(url.to_string())),
            status => Err(PortError::Unexpected(format!(
                "{} {} returned {}",
                method, url, status
            ))),
        }
    }
}

//=========================================================================================
// `RemoteSyncService` Trait Implementation
//=========================================================================================

#[async_trait]
impl RemoteSyncService for RestSyncAdapter {
    async fn mark_read(&self, notification_id: &str) -> PortResult<()> {
        self.call(Method::PATCH, &[notification_id, "read"]).await
    }

    async fn mark_all_read(&self) -> PortResult<()> {
        self.call(Method::PATCH, &["read-all"]).await
    }

    async fn delete(&self, notification_id: &str) -> PortResult<()> {
        self.call(Method::DELETE, &[notification_id]).await
    }

    async fn clear_all(&self) -> PortResult<()> {
        self.call(Method::DELETE, &[]).await
    }
}
