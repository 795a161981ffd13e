//! Device configuration and address resolution.
//!
//! An Econest device is reachable under up to three addresses: its
//! mDNS-registered device name, the same name with a `.local` suffix, and
//! the raw host or IP it was configured with. Handshake and streaming both
//! walk [`DeviceConfig::candidate_addresses`] in that fixed preference
//! order.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Prefix the device firmware registers its hostname under.
pub const DEVICE_NAME_PREFIX: &str = "econest-hems-";

/// Period between liveness probes on an established stream.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(10);

/// Fixed wait between the end of one session and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(10);

fn default_heartbeat_interval() -> Duration {
    DEFAULT_HEARTBEAT_INTERVAL
}

fn default_reconnect_delay() -> Duration {
    DEFAULT_RECONNECT_DELAY
}

/// Configuration for one Econest device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device serial number, with or without the `econest-hems-` prefix.
    pub serial_number: String,

    /// Raw host or IP fallback address.
    pub host: String,

    /// Period between heartbeat probes while streaming.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval: Duration,

    /// Wait between session attempts.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay: Duration,

    /// Registration password override for firmware that changes the
    /// factory default.
    #[serde(default)]
    pub register_password: Option<String>,
}

impl DeviceConfig {
    /// Create a configuration with default timing for the given device.
    pub fn new(serial_number: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            serial_number: serial_number.into(),
            host: host.into(),
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            register_password: None,
        }
    }

    /// Canonical device name: the serial number carrying the
    /// `econest-hems-` prefix exactly once.
    pub fn device_name(&self) -> String {
        if self.serial_number.starts_with(DEVICE_NAME_PREFIX) {
            self.serial_number.clone()
        } else {
            format!("{}{}", DEVICE_NAME_PREFIX, self.serial_number)
        }
    }

    /// Bare serial number without the device-name prefix, as used for the
    /// registration user field.
    pub fn bare_serial(&self) -> &str {
        self.serial_number.strip_prefix(DEVICE_NAME_PREFIX).unwrap_or(&self.serial_number)
    }

    /// Candidate addresses in fixed preference order: device name, local
    /// alias, raw host.
    pub fn candidate_addresses(&self) -> Vec<String> {
        let name = self.device_name();
        vec![name.clone(), format!("{name}.local"), self.host.clone()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_name_gains_prefix_once() {
        let bare = DeviceConfig::new("1200", "192.168.1.40");
        assert_eq!(bare.device_name(), "econest-hems-1200");

        let prefixed = DeviceConfig::new("econest-hems-1200", "192.168.1.40");
        assert_eq!(prefixed.device_name(), "econest-hems-1200");
    }

    #[test]
    fn bare_serial_strips_prefix() {
        let prefixed = DeviceConfig::new("econest-hems-1200", "192.168.1.40");
        assert_eq!(prefixed.bare_serial(), "1200");

        let bare = DeviceConfig::new("1200", "192.168.1.40");
        assert_eq!(bare.bare_serial(), "1200");
    }

    #[test]
    fn candidates_follow_preference_order() {
        let config = DeviceConfig::new("1200", "192.168.1.40");
        assert_eq!(
            config.candidate_addresses(),
            vec![
                "econest-hems-1200".to_string(),
                "econest-hems-1200.local".to_string(),
                "192.168.1.40".to_string(),
            ]
        );
    }

    #[test]
    fn defaults_match_device_firmware_timing() {
        let config = DeviceConfig::new("1200", "192.168.1.40");
        assert_eq!(config.heartbeat_interval, Duration::from_secs(10));
        assert_eq!(config.reconnect_delay, Duration::from_secs(10));
        assert!(config.register_password.is_none());
    }
}
