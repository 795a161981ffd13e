//! Async Rust client for Econest HEMS energy-monitor telemetry.
//!
//! Econest devices push a proprietary little-endian binary stream over a
//! long-lived WebSocket. This crate decodes that stream into per-channel
//! power/energy samples and maintains a dynamically-growing set of named
//! metrics, fanned out to a host-supplied sink.
//!
//! # Features
//!
//! - **Push telemetry**: real-time samples straight from the device, no
//!   polling
//! - **Dynamic discovery**: metrics appear as the device reports them, no
//!   channel count configured up front
//! - **Self-healing**: heartbeat-supervised sessions with an
//!   always-reconnect policy
//! - **Testable seams**: gateway, transport, and sink are traits
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use econest::{DeviceConfig, Econest, MetricKey, MetricSink};
//!
//! struct StdoutSink;
//!
//! impl MetricSink for StdoutSink {
//!     fn register(&self, key: &MetricKey, value: i64) {
//!         println!("discovered {key} = {value}");
//!     }
//!
//!     fn publish(&self, key: &MetricKey, value: i64) {
//!         println!("{key} = {value}");
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = DeviceConfig::new("1200", "192.168.1.40");
//!     let supervisor = Econest::supervise(config, StdoutSink);
//!     // Blocks until supervisor.stop() is called from another task.
//!     supervisor.run().await;
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
pub mod registry;
pub mod sink;
pub mod wire;

// Connection architecture
pub mod gateway;
pub mod session;
pub mod supervisor;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_utils;

// Core exports
pub use config::{DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_RECONNECT_DELAY, DeviceConfig};
pub use error::{EconestError, Result};
pub use registry::{
    ChannelScope, MetricField, MetricKey, MetricRegistry, MetricState, MetricUpdate,
};
pub use sink::{MetricSink, TracingSink};
pub use wire::{ChannelSample, FrameHeader, SamplePayload, SubDeviceSamples, decode_sample_frame};

// Connection exports
pub use gateway::{Gateway, HttpGateway};
pub use session::{ConnectionSession, SampleConsumer, StreamEndpoint};
pub use supervisor::SessionSupervisor;
pub use transport::{
    Dialer, MessageStream, ProbeSink, StreamTransport, TransportMessage, WsDialer,
};

/// Unified entry point for supervised telemetry streams.
///
/// Wires the default collaborators (HTTP gateway, WebSocket transport)
/// into a [`SessionSupervisor`]. Hosts that need different plumbing can
/// build a supervisor directly from their own [`Gateway`]/[`Dialer`]
/// implementations.
pub struct Econest;

impl Econest {
    /// Build a supervisor for the configured device with the stock HTTP
    /// handshake and WebSocket transport.
    ///
    /// The returned supervisor has not started yet; call
    /// [`SessionSupervisor::run`] to begin streaming and
    /// [`SessionSupervisor::stop`] to shut down.
    pub fn supervise<S: MetricSink>(
        config: DeviceConfig,
        sink: S,
    ) -> SessionSupervisor<HttpGateway, WsDialer, S> {
        let gateway = HttpGateway::new(&config);
        SessionSupervisor::new(config, gateway, WsDialer, sink)
    }
}
