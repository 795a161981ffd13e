//! Transport abstraction for the streaming connection.
//!
//! The session never touches a socket directly; it drives a
//! [`StreamTransport`] obtained from a [`Dialer`]. Splitting the transport
//! hands the read half to the receive loop and the write half to the
//! heartbeat loop, so the two in-session tasks each own their side
//! exclusively and never contend on the handle.
//!
//! `Ok(None)` from [`MessageStream::next_message`] means the peer closed
//! the stream cleanly; transport faults surface as errors.

use std::sync::Arc;

use async_trait::async_trait;
use url::Url;

use crate::Result;

pub mod ws;

pub use ws::{WsDialer, WsTransport};

/// One message received from the streaming transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportMessage {
    /// Binary payload; the only kind carrying telemetry frames.
    Binary(Vec<u8>),
    /// Text payload; not part of the sample protocol.
    Text(String),
    /// Control traffic (pong replies and the like) with no payload
    /// semantics.
    Control,
}

/// Read half of an established transport.
#[async_trait]
pub trait MessageStream: Send {
    /// Await the next message.
    ///
    /// Returns:
    /// - `Ok(Some(message))` - next message from the peer
    /// - `Ok(None)` - stream closed cleanly
    /// - `Err(e)` - transport failure
    async fn next_message(&mut self) -> Result<Option<TransportMessage>>;
}

/// Write half of an established transport, restricted to liveness probes.
#[async_trait]
pub trait ProbeSink: Send {
    /// Send one liveness probe. A failure marks the connection unhealthy
    /// as a whole.
    async fn send_probe(&mut self) -> Result<()>;
}

/// An established bidirectional streaming connection.
pub trait StreamTransport: Send + 'static {
    type Rx: MessageStream + Send + 'static;
    type Tx: ProbeSink + Send + 'static;

    /// Consume the transport into its independently-owned halves.
    fn split(self) -> (Self::Tx, Self::Rx);
}

/// Opens streaming connections.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    type Transport: StreamTransport;

    /// Open a connection to the given endpoint URL.
    async fn dial(&self, url: &Url) -> Result<Self::Transport>;
}

#[async_trait]
impl<D: Dialer + ?Sized> Dialer for Arc<D> {
    type Transport = D::Transport;

    async fn dial(&self, url: &Url) -> Result<Self::Transport> {
        (**self).dial(url).await
    }
}
