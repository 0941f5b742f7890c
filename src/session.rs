//! Broker session lifecycle: connect, subscribe, pump, reconnect
//!
//! The session manager owns the broker connection for as long as the process
//! runs. The lifecycle is an explicit state machine
//! (`Disconnected -> Connecting -> Subscribed -> Disconnected`) driven by
//! typed [`SessionEvent`]s routed out of the raw MQTT event stream. On any
//! transport failure the loop logs the cause, waits a fixed backoff, and
//! starts over with a fresh session object. There is no terminal state and
//! no retry cap.

use crate::config::{BridgeConfig, ConnectionDescriptor};
use crate::error::SessionError;
use crate::forwarder::{EventSink, InboundMessage};
use rumqttc::v5::mqttbytes::v5::Packet;
use rumqttc::v5::{mqttbytes::QoS, AsyncClient, Event, EventLoop, MqttOptions};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::sleep;
use tracing::{debug, error, info};

/// Fixed delay between reconnection attempts. Single tunable of the retry
/// policy; injectable via [`SessionManager::with_backoff`] for fast tests.
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(3);

/// Keep-alive interval for the broker session.
const KEEP_ALIVE: Duration = Duration::from_secs(30);

/// Where the session currently stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Subscribed,
}

/// Typed transition events, routed out of the raw MQTT event stream.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Broker acknowledged the connection; ready to subscribe.
    Connected,
    /// A publish arrived on a subscribed topic.
    MessageReceived { topic: String, payload: Vec<u8> },
    /// Broker closed the session.
    Disconnected,
    /// Protocol chatter (SubAck, PingResp, outgoing packets) that needs no
    /// handling here.
    Infrastructure,
}

/// Map a raw rumqttc event onto a session transition (pure function).
pub fn route_event(event: &Event) -> SessionEvent {
    match event {
        Event::Incoming(packet) => match packet {
            Packet::ConnAck(_) => SessionEvent::Connected,
            Packet::Publish(publish) => SessionEvent::MessageReceived {
                topic: String::from_utf8_lossy(&publish.topic).to_string(),
                payload: publish.payload.to_vec(),
            },
            Packet::Disconnect(_) => SessionEvent::Disconnected,
            _ => SessionEvent::Infrastructure,
        },
        Event::Outgoing(_) => SessionEvent::Infrastructure,
    }
}

/// Keeps a live subscribed session to the broker for as long as the process
/// runs, dispatching every received message to the sink.
pub struct SessionManager<S> {
    descriptor: ConnectionDescriptor,
    topic: String,
    sink: S,
    backoff: Duration,
    state: SessionState,
}

impl<S: EventSink> SessionManager<S> {
    pub fn new(config: &BridgeConfig, sink: S) -> Self {
        Self {
            descriptor: config.broker.clone(),
            topic: config.topic.clone(),
            sink,
            backoff: RECONNECT_BACKOFF,
            state: SessionState::Disconnected,
        }
    }

    /// Override the reconnect backoff (used by tests).
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Build a fresh client/event-loop pair for one connection attempt.
    ///
    /// Each attempt gets a unique client id so a half-dead predecessor
    /// session cannot bump the new one off the broker.
    fn create_connection(&self) -> (AsyncClient, EventLoop) {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        let client_id = format!("mqtt-http-bridge-{timestamp}");

        let mut options = MqttOptions::new(client_id, &self.descriptor.host, self.descriptor.port);
        options.set_keep_alive(KEEP_ALIVE);

        AsyncClient::new(options, 10)
    }

    /// Drive one session from connect until it fails.
    ///
    /// Subscribes to the topic pattern on ConnAck, then hands every publish
    /// to the sink in arrival order. Returns only when the session is no
    /// longer usable; the caller decides what happens next.
    pub async fn drive_session(&mut self) -> SessionError {
        self.state = SessionState::Connecting;
        let (client, mut event_loop) = self.create_connection();

        loop {
            let event = match event_loop.poll().await {
                Ok(event) => event,
                Err(e) => return SessionError::Connection(Box::new(e)),
            };

            match route_event(&event) {
                SessionEvent::Connected => {
                    info!(target: "bridge", "MQTT connected, subscribing: {}", self.topic);
                    if let Err(e) = client.subscribe(self.topic.as_str(), QoS::AtMostOnce).await {
                        return SessionError::Subscribe(Box::new(e));
                    }
                    self.state = SessionState::Subscribed;
                }
                SessionEvent::MessageReceived { topic, payload } => {
                    self.sink.handle(InboundMessage { topic, payload }).await;
                }
                SessionEvent::Disconnected => return SessionError::Disconnected,
                SessionEvent::Infrastructure => debug!("mqtt event: {event:?}"),
            }
        }
    }

    /// Run the session forever: connect, pump, and on any failure back off
    /// and start over. Only process termination ends this loop.
    pub async fn run(&mut self) {
        loop {
            info!(target: "bridge", "Connecting to MQTT {} ...", self.descriptor);
            let failure = self.drive_session().await;
            self.state = SessionState::Disconnected;
            error!(
                target: "bridge",
                "MQTT loop: {failure} (retrying in {:?})",
                self.backoff
            );
            sleep(self.backoff).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use rumqttc::v5::mqttbytes::v5::{
        ConnAck, ConnectReturnCode, Disconnect, DisconnectReasonCode, Publish,
    };
    use rumqttc::Outgoing;

    #[test]
    fn test_route_connack_to_connected() {
        let event = Event::Incoming(Packet::ConnAck(ConnAck {
            session_present: false,
            code: ConnectReturnCode::Success,
            properties: None,
        }));
        assert!(matches!(route_event(&event), SessionEvent::Connected));
    }

    #[test]
    fn test_route_publish_to_message_received() {
        let event = Event::Incoming(Packet::Publish(Publish {
            dup: false,
            qos: QoS::AtMostOnce,
            retain: false,
            topic: Bytes::from("application/1/device/2/event/up"),
            pkid: 1,
            payload: Bytes::from(r#"{"temp": 21.5}"#),
            properties: None,
        }));

        match route_event(&event) {
            SessionEvent::MessageReceived { topic, payload } => {
                assert_eq!(topic, "application/1/device/2/event/up");
                assert_eq!(payload, br#"{"temp": 21.5}"#);
            }
            other => panic!("expected MessageReceived, got {other:?}"),
        }
    }

    #[test]
    fn test_route_disconnect_to_disconnected() {
        let event = Event::Incoming(Packet::Disconnect(Disconnect {
            reason_code: DisconnectReasonCode::NormalDisconnection,
            properties: None,
        }));
        assert!(matches!(route_event(&event), SessionEvent::Disconnected));
    }

    #[test]
    fn test_route_outgoing_to_infrastructure() {
        let event = Event::Outgoing(Outgoing::PingReq);
        assert!(matches!(route_event(&event), SessionEvent::Infrastructure));
    }

    #[test]
    fn test_reconnect_backoff_is_three_seconds() {
        assert_eq!(RECONNECT_BACKOFF, Duration::from_secs(3));
    }

    #[test]
    fn test_manager_starts_disconnected() {
        struct NullSink;

        #[async_trait::async_trait]
        impl EventSink for NullSink {
            async fn handle(&self, _message: InboundMessage) {}
        }

        let config = crate::config::BridgeConfig::from_parts("tcp://localhost", "t/#", None)
            .expect("valid config");
        let manager = SessionManager::new(&config, NullSink);
        assert_eq!(*manager.state(), SessionState::Disconnected);
    }
}
