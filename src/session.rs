//! One streaming connection lifetime.
//!
//! A [`ConnectionSession`] walks `Connecting -> Streaming -> Closed` exactly
//! once. Connecting performs the gateway handshake and dials the streaming
//! socket, trying each candidate address in preference order. Streaming
//! runs two concurrent activities over the split transport: the receive
//! loop (owns the read half, feeds decoded frames to the consumer) and the
//! heartbeat loop (owns the write half, probes liveness on a fixed period).
//! Either activity ending tears the other down through a shared
//! cancellation scope, and the session joins both before reporting its
//! outcome.
//!
//! Decode failures never end a session: undecodable messages are logged
//! and dropped, exactly like frames of a kind this client does not handle.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::config::DeviceConfig;
use crate::gateway::Gateway;
use crate::transport::{Dialer, MessageStream, ProbeSink, StreamTransport, TransportMessage};
use crate::wire::{SamplePayload, decode_sample_frame};
use crate::{EconestError, Result};

/// Receives every successfully decoded frame, in arrival order.
pub trait SampleConsumer: Send {
    fn on_sample(&mut self, sample: SamplePayload);
}

/// Resolved streaming endpoint: the address that won the handshake plus the
/// session token it issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEndpoint {
    pub address: String,
    pub session_token: String,
}

impl StreamEndpoint {
    /// The device's streaming URL for this endpoint.
    pub fn stream_url(&self) -> Result<Url> {
        let raw = format!("ws://{}/ws/interface?uuid={}", self.address, self.session_token);
        Url::parse(&raw).map_err(|e| {
            EconestError::connection_failed_with_source(
                format!("invalid streaming endpoint {raw}"),
                Box::new(e),
            )
        })
    }
}

/// Run a future to completion unless the token fires first.
async fn or_cancelled<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        _ = cancel.cancelled() => Err(EconestError::Cancelled),
        result = fut => result,
    }
}

/// One connect-stream-close lifetime against a device.
pub struct ConnectionSession<G, D> {
    gateway: Arc<G>,
    dialer: Arc<D>,
    candidates: Vec<String>,
    heartbeat_interval: Duration,
}

impl<G, D> ConnectionSession<G, D>
where
    G: Gateway,
    D: Dialer,
{
    pub fn new(config: &DeviceConfig, gateway: Arc<G>, dialer: Arc<D>) -> Self {
        Self {
            gateway,
            dialer,
            candidates: config.candidate_addresses(),
            heartbeat_interval: config.heartbeat_interval,
        }
    }

    /// Run the session to completion.
    ///
    /// Returns `Ok(())` when the peer closed the stream cleanly,
    /// [`EconestError::Cancelled`] when the owner requested a stop, and a
    /// connection-tier error otherwise. Success is deliberately
    /// indistinguishable from "streamed until disconnect".
    pub async fn run<C: SampleConsumer>(
        self,
        consumer: &mut C,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let transport = self.establish(cancel).await?;
        let (tx, rx) = transport.split();

        // Shared teardown scope for the two in-session loops: the owner's
        // token cancels it, and a heartbeat failure cancels it without
        // touching the owner's token.
        let link = cancel.child_token();
        let heartbeat =
            tokio::spawn(Self::heartbeat_loop(tx, link.clone(), self.heartbeat_interval));

        let streamed = Self::receive_loop(rx, consumer, &link).await;

        // Single join point: whichever loop ended first, stop the other and
        // collect it before reporting.
        link.cancel();
        let probed = match heartbeat.await {
            Ok(result) => result,
            Err(join_error) => {
                warn!("Heartbeat task panicked: {}", join_error);
                Ok(())
            }
        };

        if cancel.is_cancelled() {
            return Err(EconestError::Cancelled);
        }
        match streamed {
            // The receive loop was stopped by the link scope, not the owner:
            // the heartbeat tore the session down. Report its failure.
            Err(EconestError::Cancelled) => match probed {
                Err(e) => Err(e),
                Ok(()) => Ok(()),
            },
            other => other,
        }
    }

    /// Connecting state: handshake and dial against each candidate address
    /// in preference order.
    async fn establish(&self, cancel: &CancellationToken) -> Result<D::Transport> {
        for address in &self.candidates {
            if cancel.is_cancelled() {
                return Err(EconestError::Cancelled);
            }
            debug!("Trying candidate address {}", address);

            let session_token =
                match or_cancelled(cancel, self.gateway.register_session(address)).await {
                    Ok(token) => token,
                    Err(EconestError::Cancelled) => return Err(EconestError::Cancelled),
                    Err(e) => {
                        debug!("Registration at {} failed: {}", address, e);
                        continue;
                    }
                };

            match or_cancelled(cancel, self.gateway.enable_streaming(&session_token, address)).await
            {
                Ok(()) => {}
                Err(EconestError::Cancelled) => return Err(EconestError::Cancelled),
                Err(e) => {
                    debug!("Enabling streaming at {} failed: {}", address, e);
                    continue;
                }
            }

            let endpoint = StreamEndpoint { address: address.clone(), session_token };
            let url = endpoint.stream_url()?;
            match or_cancelled(cancel, self.dialer.dial(&url)).await {
                Ok(transport) => {
                    info!("Streaming session established at {}", address);
                    return Ok(transport);
                }
                Err(EconestError::Cancelled) => return Err(EconestError::Cancelled),
                Err(e) => {
                    warn!("Connecting to {} failed: {}", address, e);
                    continue;
                }
            }
        }

        Err(EconestError::connection_failed("all candidate addresses exhausted"))
    }

    /// Streaming state, receive side. Ends only when the link scope fires,
    /// the peer closes the stream, or the transport fails.
    async fn receive_loop<R, C>(mut rx: R, consumer: &mut C, link: &CancellationToken) -> Result<()>
    where
        R: MessageStream,
        C: SampleConsumer,
    {
        let mut frame_count = 0u64;
        loop {
            let message = tokio::select! {
                _ = link.cancelled() => return Err(EconestError::Cancelled),
                message = rx.next_message() => message?,
            };

            match message {
                Some(TransportMessage::Binary(data)) => match decode_sample_frame(&data) {
                    Ok(sample) => {
                        frame_count += 1;
                        trace!(
                            "Frame {}: timestamp={}, sub_devices={}",
                            frame_count,
                            sample.timestamp,
                            sample.sub_devices.len()
                        );
                        consumer.on_sample(sample);
                    }
                    Err(EconestError::UnsupportedFrameKind { kind }) => {
                        trace!("Skipping frame of kind {}", kind);
                    }
                    Err(e) => {
                        warn!("Dropping undecodable frame: {}", e);
                    }
                },
                Some(TransportMessage::Text(text)) => {
                    debug!("Ignoring text message ({} bytes)", text.len());
                }
                Some(TransportMessage::Control) => {
                    trace!("Control message");
                }
                None => {
                    info!("Stream closed by peer after {} frames", frame_count);
                    return Ok(());
                }
            }
        }
    }

    /// Streaming state, probe side. A failed probe marks the connection
    /// unhealthy and cancels the link scope so the receive loop stops too.
    async fn heartbeat_loop<T: ProbeSink>(
        mut tx: T,
        link: CancellationToken,
        period: Duration,
    ) -> Result<()> {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = link.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    if let Err(e) = tx.send_probe().await {
                        warn!("Heartbeat probe failed: {}", e);
                        link.cancel();
                        return Err(e);
                    }
                    trace!("Heartbeat sent");
                }
            }
        }
    }
}
