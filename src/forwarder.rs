//! Message forwarding: decode one inbound message and deliver it downstream
//!
//! Every per-message failure is contained here. A malformed or undeliverable
//! message is logged and dropped; nothing propagates back into the session
//! loop, which depends on the delivery phase continuing to pump messages.

use crate::error::ForwardError;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};
use url::Url;

/// Bound on one outbound delivery attempt. The only limit on a stuck
/// delivery; there is no retry and no queue.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Longest response-body excerpt that makes it into the log.
pub const EXCERPT_MAX_CHARS: usize = 200;

/// One message as received from the broker, alive for a single forward
/// attempt (successful or not).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

/// Sink for messages pumped out of a broker session.
///
/// The session manager dispatches through this seam so tests can substitute
/// a recorder for the real forwarder.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn handle(&self, message: InboundMessage);
}

/// Decode a raw payload into a JSON value (pure function). Any valid JSON
/// document is accepted; the structure is forwarded untouched.
pub fn decode_payload(payload: &[u8]) -> Result<Value, ForwardError> {
    serde_json::from_slice(payload).map_err(ForwardError::Decode)
}

/// Truncate a response body for logging, on a char boundary (pure function).
pub fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(EXCERPT_MAX_CHARS) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

/// Turns one received message into zero or one outbound HTTP request.
pub struct Forwarder {
    target: Option<Url>,
    client: reqwest::Client,
}

impl Forwarder {
    pub fn new(target: Option<Url>) -> Self {
        Self {
            target,
            client: reqwest::Client::new(),
        }
    }

    /// POST the decoded event to the target and log the outcome.
    async fn deliver(&self, target: &Url, event: &Value) -> Result<(), ForwardError> {
        let response = self
            .client
            .post(target.clone())
            .json(event)
            .timeout(HTTP_TIMEOUT)
            .send()
            .await
            .map_err(ForwardError::Delivery)?;

        let status = response.status();
        // Reading the body counts against the same delivery attempt
        let body = response.text().await.map_err(ForwardError::Delivery)?;
        info!(
            target: "bridge",
            "POST {} -> {} {}",
            target,
            status.as_u16(),
            excerpt(&body)
        );
        Ok(())
    }
}

#[async_trait]
impl EventSink for Forwarder {
    async fn handle(&self, message: InboundMessage) {
        info!(
            target: "bridge",
            "MQTT topic={} payload={}",
            message.topic,
            String::from_utf8_lossy(&message.payload)
        );

        let event = match decode_payload(&message.payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(target: "bridge", "{e}");
                return;
            }
        };

        let Some(target) = &self.target else {
            // No delivery target configured: log-only mode, message consumed.
            return;
        };

        if let Err(e) = self.deliver(target, &event).await {
            error!(target: "bridge", "{e}");
        }
    }
}
