//! MQTT to HTTP bridge
//!
//! Subscribes to a broker topic pattern, decodes each payload as JSON, and
//! forwards it to an HTTP endpoint. Two components compose into one control
//! loop:
//!
//! - [`session::SessionManager`] owns the broker connection lifecycle:
//!   connect, subscribe, pump events, and reconnect forever with a fixed
//!   backoff on any transport failure.
//! - [`forwarder::Forwarder`] consumes each received message, decodes it,
//!   and performs the outbound delivery, containing every per-message
//!   failure so one bad message never stalls the loop.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use mqtt_http_bridge::{BridgeConfig, Forwarder, SessionManager};
//!
//! # async fn run() -> Result<(), mqtt_http_bridge::ConfigError> {
//! let config = BridgeConfig::from_parts(
//!     "tcp://mosquitto:1883",
//!     "application/+/device/+/event/up",
//!     Some("http://modbus:8080/write"),
//! )?;
//!
//! let forwarder = Forwarder::new(config.target.clone());
//! let mut session = SessionManager::new(&config, forwarder);
//! session.run().await; // runs until the process is terminated
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod forwarder;
pub mod logging;
pub mod session;

pub use config::{parse_connection, BridgeConfig, ConfigError, ConnectionDescriptor};
pub use error::{BridgeError, BridgeResult, ForwardError, SessionError};
pub use forwarder::{EventSink, Forwarder, InboundMessage};
pub use session::{SessionEvent, SessionManager, SessionState, RECONNECT_BACKOFF};
