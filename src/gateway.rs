//! Device gateway: the HTTP handshake that authorizes streaming.
//!
//! Before a streaming session can start the device requires two calls
//! against the same address the socket will use: a registration that
//! returns the session token, and a data-control call that switches
//! real-time streaming on. The [`Gateway`] trait is the seam the session
//! consumes; [`HttpGateway`] is the real implementation speaking the
//! device's JSON-over-HTTP endpoints.
//!
//! The device also exposes two auxiliary operations carried here for
//! completeness: a sample-log sync trigger and a plain connectivity probe
//! used to validate configuration.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::DeviceConfig;
use crate::{EconestError, Result};

/// Factory-default registration password of the device firmware.
const REGISTER_PASSWORD: &str = "cyber2019";

/// Per-request cap on handshake calls; the device answers on the local
/// network or not at all.
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Handshake collaborator consumed by the session.
#[async_trait]
pub trait Gateway: Send + Sync + 'static {
    /// Register against one candidate address, returning the session token
    /// the streaming socket must present.
    async fn register_session(&self, address: &str) -> Result<String>;

    /// Enable real-time streaming for a registered session.
    async fn enable_streaming(&self, session_token: &str, address: &str) -> Result<()>;
}

#[derive(Serialize)]
struct RegisterRequest<'a> {
    user: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct RegisterResponse {
    uuid: Option<String>,
}

#[derive(Serialize)]
struct DataControlRequest<'a> {
    uuid: &'a str,
    #[serde(rename = "rtdataEnable")]
    rtdata_enable: u8,
    #[serde(rename = "syncEnable")]
    sync_enable: u8,
    #[serde(rename = "logdataEnable")]
    logdata_enable: u8,
}

#[derive(Serialize)]
struct SyncRequest<'a> {
    uuid: &'a str,
    #[serde(rename = "timestampFrom")]
    timestamp_from: u32,
    #[serde(rename = "timestampTo")]
    timestamp_to: u32,
}

/// JSON-over-HTTP gateway implementation.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    user: String,
    password: String,
}

impl HttpGateway {
    /// Build a gateway for the configured device.
    pub fn new(config: &DeviceConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            user: config.bare_serial().to_string(),
            password: config
                .register_password
                .clone()
                .unwrap_or_else(|| REGISTER_PASSWORD.to_string()),
        }
    }

    async fn post_ok<B: Serialize>(
        &self,
        address: &str,
        endpoint: &str,
        body: &B,
    ) -> Result<reqwest::Response> {
        let url = format!("http://{address}/{endpoint}");
        trace!("POST {}", url);
        let response =
            self.client.post(&url).timeout(HTTP_TIMEOUT).json(body).send().await.map_err(|e| {
                EconestError::handshake_failed_with_source(address, "request failed", Box::new(e))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(EconestError::handshake_failed(address, format!("status {status}")));
        }
        Ok(response)
    }

    /// Trigger a sample-log synchronization for the window `[from, to]`.
    ///
    /// The firmware treats `0, 0` as "everything it has buffered".
    pub async fn sync_samples(
        &self,
        session_token: &str,
        address: &str,
        from: u32,
        to: u32,
    ) -> Result<()> {
        let body = SyncRequest { uuid: session_token, timestamp_from: from, timestamp_to: to };
        self.post_ok(address, "sync", &body).await?;
        debug!("Sample sync accepted by {}", address);
        Ok(())
    }

    /// Probe the candidate addresses for basic reachability.
    ///
    /// Returns true if any candidate answers its system-info endpoint.
    /// Intended for configuration validation, not the streaming path.
    pub async fn check_connection(&self, addresses: &[String]) -> bool {
        for address in addresses {
            let url = format!("http://{address}/system-info");
            trace!("GET {}", url);
            match self.client.get(&url).timeout(HTTP_TIMEOUT).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!("Device reachable at {}", address);
                    return true;
                }
                Ok(response) => {
                    debug!("Probe of {} answered status {}", address, response.status());
                }
                Err(e) => {
                    debug!("Probe of {} failed: {}", address, e);
                }
            }
        }
        false
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn register_session(&self, address: &str) -> Result<String> {
        let body = RegisterRequest { user: &self.user, password: &self.password };
        let response = self.post_ok(address, "register", &body).await?;

        let parsed: RegisterResponse = response.json().await.map_err(|e| {
            EconestError::handshake_failed_with_source(
                address,
                "unreadable registration response",
                Box::new(e),
            )
        })?;

        match parsed.uuid {
            Some(uuid) => {
                debug!("Registered session at {}", address);
                Ok(uuid)
            }
            None => {
                Err(EconestError::handshake_failed(address, "registration response missing uuid"))
            }
        }
    }

    async fn enable_streaming(&self, session_token: &str, address: &str) -> Result<()> {
        let body = DataControlRequest {
            uuid: session_token,
            rtdata_enable: 1,
            sync_enable: 0,
            logdata_enable: 0,
        };
        self.post_ok(address, "data-ctrl", &body).await?;
        debug!("Real-time streaming enabled at {}", address);
        Ok(())
    }
}
