//! Dynamically-growing metric registry.
//!
//! The device never announces how many sub-devices or channels it will
//! report; the registry learns the metric set from the frames themselves.
//! [`MetricRegistry::observe`] expands a decoded [`SamplePayload`] into its
//! flat metric updates in a fixed order and inserts or overwrites each key,
//! reporting per key whether it was seen for the first time. Entries are
//! never removed: a device that briefly reports fewer sub-devices leaves
//! the missing metrics in place with their last values.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use crate::wire::{ChannelSample, SamplePayload};

/// Which measurement of a channel a metric tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricField {
    Power,
    Energy,
}

impl MetricField {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricField::Power => "Power",
            MetricField::Energy => "Energy",
        }
    }
}

/// Channel position within a frame.
///
/// `device` is the 0-based sub-device index in arrival order; `channel` is
/// the 1-based channel number within the sub-device, matching the labels
/// the device vendor uses in its own UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelScope {
    Main,
    Sub { device: usize, channel: usize },
}

impl fmt::Display for ChannelScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelScope::Main => f.write_str("ecoMain"),
            ChannelScope::Sub { device, channel } => {
                write!(f, "ecoSub_{device}-channel_{channel}")
            }
        }
    }
}

/// Stable identifier for one tracked metric.
///
/// Displays as the human-readable name the host platform shows, e.g.
/// `ecoMain-Power` or `ecoSub_0-channel_10-Energy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetricKey {
    pub scope: ChannelScope,
    pub field: MetricField,
}

impl MetricKey {
    pub fn new(scope: ChannelScope, field: MetricField) -> Self {
        Self { scope, field }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.scope, self.field.as_str())
    }
}

/// Latest tracked state of one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricState {
    pub last_value: i64,
}

/// One entry of the flat update sequence emitted for a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricUpdate {
    pub key: MetricKey,
    pub value: i64,
    /// True exactly when this observation created the key.
    pub is_new: bool,
}

/// Insert-or-update map from [`MetricKey`] to latest value.
#[derive(Debug, Default)]
pub struct MetricRegistry {
    metrics: HashMap<MetricKey, MetricState>,
}

impl MetricRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand a payload into its metric updates, in fixed order: main
    /// channel Power then Energy, then per sub-device in arrival order,
    /// per channel 1..=10, Power then Energy.
    pub fn observe(&mut self, sample: &SamplePayload) -> Vec<MetricUpdate> {
        let mut updates = Vec::with_capacity(2 + 20 * sample.sub_devices.len());

        self.record(ChannelScope::Main, &sample.main, &mut updates);
        for (device, sub) in sample.sub_devices.iter().enumerate() {
            for (index, channel) in sub.channels.iter().enumerate() {
                let scope = ChannelScope::Sub { device, channel: index + 1 };
                self.record(scope, channel, &mut updates);
            }
        }

        updates
    }

    fn record(&mut self, scope: ChannelScope, sample: &ChannelSample, out: &mut Vec<MetricUpdate>) {
        out.push(self.upsert(MetricKey::new(scope, MetricField::Power), i64::from(sample.power)));
        out.push(self.upsert(MetricKey::new(scope, MetricField::Energy), i64::from(sample.energy)));
    }

    fn upsert(&mut self, key: MetricKey, value: i64) -> MetricUpdate {
        match self.metrics.entry(key) {
            Entry::Occupied(mut entry) => {
                entry.get_mut().last_value = value;
                MetricUpdate { key, value, is_new: false }
            }
            Entry::Vacant(entry) => {
                entry.insert(MetricState { last_value: value });
                MetricUpdate { key, value, is_new: true }
            }
        }
    }

    /// Latest value for a key, if it has ever been observed.
    pub fn get(&self, key: &MetricKey) -> Option<i64> {
        self.metrics.get(key).map(|state| state.last_value)
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Iterate over all known metrics in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (&MetricKey, &MetricState)> {
        self.metrics.iter()
    }
}
