//! Always-reconnect supervision of streaming sessions.
//!
//! The supervisor owns the metric registry and the retry policy. It runs
//! one [`ConnectionSession`] at a time; whenever a session ends, for any
//! reason, it waits a fixed delay and starts the next one. There is no
//! bounded retry count: device reboots and network blips self-heal without
//! operator intervention, and consumers see staleness as unchanged metric
//! values rather than an explicit offline state. Only [`stop`] ends the
//! loop.
//!
//! [`stop`]: SessionSupervisor::stop

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DeviceConfig;
use crate::gateway::Gateway;
use crate::registry::MetricRegistry;
use crate::session::{ConnectionSession, SampleConsumer};
use crate::sink::MetricSink;
use crate::transport::Dialer;
use crate::wire::SamplePayload;
use crate::EconestError;

/// Wires decoded frames into the registry and fans updates out to the sink.
///
/// The registry lock is released before any sink call; updates for one
/// frame are dispatched in emission order before the next frame arrives.
struct RegistryFanout<S> {
    registry: Arc<Mutex<MetricRegistry>>,
    sink: Arc<S>,
}

impl<S: MetricSink> SampleConsumer for RegistryFanout<S> {
    fn on_sample(&mut self, sample: SamplePayload) {
        let updates = {
            let mut registry = match self.registry.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            registry.observe(&sample)
        };
        for update in updates {
            if update.is_new {
                self.sink.register(&update.key, update.value);
            } else {
                self.sink.publish(&update.key, update.value);
            }
        }
    }
}

/// Long-running service driving sessions against one device.
pub struct SessionSupervisor<G, D, S> {
    config: DeviceConfig,
    gateway: Arc<G>,
    dialer: Arc<D>,
    sink: Arc<S>,
    registry: Arc<Mutex<MetricRegistry>>,
    cancel: CancellationToken,
}

impl<G, D, S> SessionSupervisor<G, D, S>
where
    G: Gateway,
    D: Dialer,
    S: MetricSink,
{
    pub fn new(config: DeviceConfig, gateway: G, dialer: D, sink: S) -> Self {
        Self {
            config,
            gateway: Arc::new(gateway),
            dialer: Arc::new(dialer),
            sink: Arc::new(sink),
            registry: Arc::new(Mutex::new(MetricRegistry::new())),
            cancel: CancellationToken::new(),
        }
    }

    /// Shared handle to the registry for external readers.
    ///
    /// The registry outlives individual sessions; a reconnect never clears
    /// previously discovered metrics.
    pub fn registry(&self) -> Arc<Mutex<MetricRegistry>> {
        Arc::clone(&self.registry)
    }

    /// Run sessions until [`stop`](Self::stop) is called.
    ///
    /// Session outcomes are logged and absorbed; this method only returns
    /// on an explicit stop.
    pub async fn run(&self) {
        info!("Supervising telemetry stream from {}", self.config.device_name());

        loop {
            if self.cancel.is_cancelled() {
                break;
            }

            let session = ConnectionSession::new(
                &self.config,
                Arc::clone(&self.gateway),
                Arc::clone(&self.dialer),
            );
            let mut consumer = RegistryFanout {
                registry: Arc::clone(&self.registry),
                sink: Arc::clone(&self.sink),
            };

            match session.run(&mut consumer, &self.cancel).await {
                Ok(()) => info!("Session ended after clean close"),
                Err(EconestError::Cancelled) => debug!("Session cancelled"),
                Err(e) => warn!("Session ended: {}", e),
            }

            if self.cancel.is_cancelled() {
                break;
            }
            debug!("Reconnecting in {:?}", self.config.reconnect_delay);
            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = tokio::time::sleep(self.config.reconnect_delay) => {}
            }
        }

        info!("Supervisor stopped");
    }

    /// Request a stop: cancels the in-flight session (if any) and prevents
    /// further reconnect attempts. Safe to call more than once.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}
