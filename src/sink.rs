//! Metric egress boundary.
//!
//! The core never renders a metric; it hands every update to a
//! [`MetricSink`] supplied by the host platform. The split mirrors the
//! registry's insert-or-update contract: [`MetricSink::register`] fires
//! once per key when it is first observed, [`MetricSink::publish`] on every
//! later value change.

use tracing::{debug, info};

use crate::registry::MetricKey;

/// One-way egress for metric updates.
///
/// Implementations must be cheap and non-blocking; they are called from the
/// receive loop between frames. Updates for one frame arrive in the frame's
/// field order, before any update of the next frame.
pub trait MetricSink: Send + Sync + 'static {
    /// A key was observed for the first time.
    fn register(&self, key: &MetricKey, value: i64);

    /// A known key's value was refreshed.
    fn publish(&self, key: &MetricKey, value: i64);
}

/// Sink that forwards updates to the `tracing` subscriber.
///
/// Useful as a development stand-in before wiring a real host platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl MetricSink for TracingSink {
    fn register(&self, key: &MetricKey, value: i64) {
        info!("Discovered metric {} = {}", key, value);
    }

    fn publish(&self, key: &MetricKey, value: i64) {
        debug!("Metric {} = {}", key, value);
    }
}
