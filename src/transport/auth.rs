//! Private channel authorization
//!
//! Private channels must be signed by the application backend before the
//! Pusher server accepts the subscription. The transport asks a
//! [`ChannelAuthorizer`] for the signature once it knows its socket id.

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::error::{RealtimeError, RealtimeResult};

/// Produces the `auth` token for a private channel subscription
#[async_trait]
pub trait ChannelAuthorizer: Send + Sync {
    async fn authorize(&self, socket_id: &str, channel: &str) -> RealtimeResult<String>;
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    auth: String,
}

/// Authorizer that posts to the backend's broadcasting auth endpoint
pub struct HttpAuthorizer {
    client: reqwest::Client,
    endpoint: Url,
    bearer_token: Option<String>,
}

impl HttpAuthorizer {
    pub fn new(endpoint: Url, bearer_token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            bearer_token,
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl ChannelAuthorizer for HttpAuthorizer {
    async fn authorize(&self, socket_id: &str, channel: &str) -> RealtimeResult<String> {
        let mut request = self
            .client
            .post(self.endpoint.clone())
            .form(&[("socket_id", socket_id), ("channel_name", channel)]);

        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RealtimeError::subscription(channel, format!("auth request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RealtimeError::subscription(
                channel,
                format!("auth endpoint returned {}", status),
            ));
        }

        let body: AuthResponse = response
            .json()
            .await
            .map_err(|e| RealtimeError::subscription(channel, format!("invalid auth response: {}", e)))?;

        Ok(body.auth)
    }
}

/// Authorizer returning a fixed token; useful against local servers that
/// skip signature checks.
pub struct StaticAuthorizer(pub String);

#[async_trait]
impl ChannelAuthorizer for StaticAuthorizer {
    async fn authorize(&self, _socket_id: &str, _channel: &str) -> RealtimeResult<String> {
        Ok(self.0.clone())
    }
}
