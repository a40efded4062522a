use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use thiserror::Error;

use crate::config::PushConfig;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("push delivery failed: {0}")]
    Upstream(String),
}

/// Where a push notification is addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushTarget {
    /// One live transport session.
    Connection(String),
    /// Every live session subscribed to a group.
    Group(String),
}

/// Seam to the external real-time fan-out service. Delivery guarantees are
/// owned by that service, not by this crate.
#[async_trait]
pub trait PushChannel: Send + Sync {
    async fn publish(
        &self,
        event: &str,
        target: PushTarget,
        arguments: Vec<Value>,
    ) -> Result<(), PushError>;
}

/// Pushes over the hub's REST surface:
/// `POST {endpoint}/api/v1/hubs/{hub}/connections/{id}` (or
/// `/groups/{name}`) with `{"target": event, "arguments": [...]}`.
pub struct HttpPushChannel {
    client: Client,
    endpoint: String,
    hub: String,
    access_key: Option<String>,
}

impl HttpPushChannel {
    pub fn new(config: &PushConfig) -> Self {
        Self {
            client: Client::new(),
            endpoint: config.endpoint.as_str().trim_end_matches('/').to_string(),
            hub: config.hub.clone(),
            access_key: config.access_key.clone(),
        }
    }

    fn url_for(&self, target: &PushTarget) -> String {
        match target {
            PushTarget::Connection(id) => {
                format!("{}/api/v1/hubs/{}/connections/{id}", self.endpoint, self.hub)
            }
            PushTarget::Group(name) => {
                format!("{}/api/v1/hubs/{}/groups/{name}", self.endpoint, self.hub)
            }
        }
    }
}

#[async_trait]
impl PushChannel for HttpPushChannel {
    async fn publish(
        &self,
        event: &str,
        target: PushTarget,
        arguments: Vec<Value>,
    ) -> Result<(), PushError> {
        let mut request = self
            .client
            .post(self.url_for(&target))
            .json(&json!({ "target": event, "arguments": arguments }));
        if let Some(key) = &self.access_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|err| PushError::Upstream(err.to_string()))?;
        if !response.status().is_success() {
            return Err(PushError::Upstream(format!(
                "hub returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
