//! Shared test helpers: wire-format encoders and scripted doubles for the
//! gateway, transport, and sink seams.

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;
use url::Url;

use crate::gateway::Gateway;
use crate::registry::MetricKey;
use crate::session::SampleConsumer;
use crate::sink::MetricSink;
use crate::transport::{Dialer, MessageStream, ProbeSink, StreamTransport, TransportMessage};
use crate::wire::{
    CHANNELS_PER_SUB_DEVICE, ChannelSample, SAMPLE_FRAME_KIND, SamplePayload, SubDeviceSamples,
};
use crate::{EconestError, Result};

/// Build a payload whose sub-devices each repeat one channel sample across
/// all ten channels.
pub fn sample_payload(
    timestamp: u32,
    main: ChannelSample,
    subs: &[(u8, ChannelSample)],
) -> SamplePayload {
    SamplePayload {
        timestamp,
        main,
        sub_devices: subs
            .iter()
            .map(|(number, channel)| SubDeviceSamples {
                number: *number,
                channels: [*channel; CHANNELS_PER_SUB_DEVICE],
            })
            .collect(),
    }
}

/// Encode a payload behind an arbitrary header.
pub fn encode_frame(
    version: u32,
    checksum: u32,
    kind: u32,
    length: u32,
    payload: &SamplePayload,
) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&version.to_le_bytes());
    bytes.extend_from_slice(&checksum.to_le_bytes());
    bytes.extend_from_slice(&kind.to_le_bytes());
    bytes.extend_from_slice(&length.to_le_bytes());

    bytes.extend_from_slice(&payload.timestamp.to_le_bytes());
    bytes.push(payload.sub_devices.len() as u8);
    bytes.extend_from_slice(&payload.main.power.to_le_bytes());
    bytes.extend_from_slice(&payload.main.energy.to_le_bytes());

    for sub in &payload.sub_devices {
        bytes.push(sub.number);
        for channel in &sub.channels {
            bytes.extend_from_slice(&channel.power.to_le_bytes());
            bytes.extend_from_slice(&channel.energy.to_le_bytes());
        }
    }

    bytes
}

/// Encode a payload as a well-formed sample frame.
pub fn encode_sample_frame(payload: &SamplePayload) -> Vec<u8> {
    encode_frame(1, 0, SAMPLE_FRAME_KIND, 0, payload)
}

/// Consumer that stores every decoded sample.
#[derive(Debug, Default)]
pub struct CollectingConsumer {
    pub samples: Vec<SamplePayload>,
}

impl SampleConsumer for CollectingConsumer {
    fn on_sample(&mut self, sample: SamplePayload) {
        self.samples.push(sample);
    }
}

type ScriptItem = Result<Option<TransportMessage>>;

/// Test-side handle feeding messages into a [`MockTransport`].
///
/// Dropping the feed without [`close`](MockFeed::close) also ends the
/// stream cleanly.
#[derive(Debug, Clone)]
pub struct MockFeed {
    tx: mpsc::UnboundedSender<ScriptItem>,
}

impl MockFeed {
    pub fn binary(&self, data: Vec<u8>) {
        let _ = self.tx.send(Ok(Some(TransportMessage::Binary(data))));
    }

    pub fn text(&self, text: &str) {
        let _ = self.tx.send(Ok(Some(TransportMessage::Text(text.to_string()))));
    }

    pub fn close(&self) {
        let _ = self.tx.send(Ok(None));
    }

    pub fn fail(&self) {
        let _ = self.tx.send(Err(EconestError::transport_error("scripted read failure")));
    }
}

/// Channel-scripted transport double.
#[derive(Debug)]
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<ScriptItem>,
    probe_failure_after: Option<usize>,
}

impl MockTransport {
    pub fn pair() -> (MockFeed, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (MockFeed { tx }, Self { incoming: rx, probe_failure_after: None })
    }

    /// Let `n` probes succeed, then fail every later one.
    pub fn failing_probes_after(mut self, n: usize) -> Self {
        self.probe_failure_after = Some(n);
        self
    }
}

pub struct MockRx {
    incoming: mpsc::UnboundedReceiver<ScriptItem>,
}

pub struct MockProbe {
    failure_after: Option<usize>,
    sent: usize,
}

impl StreamTransport for MockTransport {
    type Rx = MockRx;
    type Tx = MockProbe;

    fn split(self) -> (MockProbe, MockRx) {
        (
            MockProbe { failure_after: self.probe_failure_after, sent: 0 },
            MockRx { incoming: self.incoming },
        )
    }
}

#[async_trait]
impl MessageStream for MockRx {
    async fn next_message(&mut self) -> Result<Option<TransportMessage>> {
        match self.incoming.recv().await {
            Some(item) => item,
            None => Ok(None),
        }
    }
}

#[async_trait]
impl ProbeSink for MockProbe {
    async fn send_probe(&mut self) -> Result<()> {
        self.sent += 1;
        match self.probe_limit_reached() {
            true => Err(EconestError::transport_error("scripted probe failure")),
            false => Ok(()),
        }
    }
}

impl MockProbe {
    fn probe_limit_reached(&self) -> bool {
        self.failure_after.is_some_and(|after| self.sent > after)
    }
}

/// Dialer handing out pre-scripted transports in order.
#[derive(Debug, Default)]
pub struct MockDialer {
    transports: Mutex<VecDeque<MockTransport>>,
    dialed: Mutex<Vec<String>>,
}

impl MockDialer {
    pub fn with_transports(transports: Vec<MockTransport>) -> Self {
        Self { transports: Mutex::new(transports.into()), dialed: Mutex::new(Vec::new()) }
    }

    /// URLs dialed so far, in order.
    pub fn dialed_urls(&self) -> Vec<String> {
        self.dialed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Dialer for MockDialer {
    type Transport = MockTransport;

    async fn dial(&self, url: &Url) -> Result<MockTransport> {
        self.dialed.lock().unwrap().push(url.to_string());
        self.transports
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| EconestError::connection_failed("no scripted transport left"))
    }
}

/// Gateway double with per-address scripted failures.
#[derive(Debug, Default)]
pub struct ScriptedGateway {
    fail_register: HashSet<String>,
    fail_enable: HashSet<String>,
}

impl ScriptedGateway {
    pub fn failing_register_at(addresses: &[&str]) -> Self {
        Self {
            fail_register: addresses.iter().map(|address| address.to_string()).collect(),
            fail_enable: HashSet::new(),
        }
    }

    pub fn failing_enable_at(addresses: &[&str]) -> Self {
        Self {
            fail_register: HashSet::new(),
            fail_enable: addresses.iter().map(|address| address.to_string()).collect(),
        }
    }
}

#[async_trait]
impl Gateway for ScriptedGateway {
    async fn register_session(&self, address: &str) -> Result<String> {
        if self.fail_register.contains(address) {
            return Err(EconestError::handshake_failed(address, "scripted registration failure"));
        }
        Ok(format!("uuid-{address}"))
    }

    async fn enable_streaming(&self, _session_token: &str, address: &str) -> Result<()> {
        if self.fail_enable.contains(address) {
            return Err(EconestError::handshake_failed(address, "scripted data-ctrl failure"));
        }
        Ok(())
    }
}

/// One call observed by a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkEvent {
    pub key: String,
    pub value: i64,
    pub is_new: bool,
}

/// Sink double recording every register/publish call in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl MetricSink for RecordingSink {
    fn register(&self, key: &MetricKey, value: i64) {
        self.events.lock().unwrap().push(SinkEvent {
            key: key.to_string(),
            value,
            is_new: true,
        });
    }

    fn publish(&self, key: &MetricKey, value: i64) {
        self.events.lock().unwrap().push(SinkEvent {
            key: key.to_string(),
            value,
            is_new: false,
        });
    }
}
