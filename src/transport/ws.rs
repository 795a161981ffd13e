//! WebSocket transport over tokio-tungstenite.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace};
use url::Url;

use super::{Dialer, MessageStream, ProbeSink, StreamTransport, TransportMessage};
use crate::{EconestError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Dialer for the device's `ws://` streaming endpoint.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsDialer;

/// Established WebSocket connection.
pub struct WsTransport {
    inner: WsStream,
}

/// Write half carrying heartbeat pings.
pub struct WsProbeSender {
    sink: SplitSink<WsStream, Message>,
}

/// Read half yielding device messages.
pub struct WsMessageReceiver {
    stream: SplitStream<WsStream>,
}

#[async_trait]
impl Dialer for WsDialer {
    type Transport = WsTransport;

    async fn dial(&self, url: &Url) -> Result<WsTransport> {
        let (stream, _response) = connect_async(url.as_str()).await.map_err(|e| {
            EconestError::connection_failed_with_source(
                format!("websocket connect to {url} failed"),
                Box::new(e),
            )
        })?;
        debug!("WebSocket connection established to {}", url);
        Ok(WsTransport { inner: stream })
    }
}

impl StreamTransport for WsTransport {
    type Rx = WsMessageReceiver;
    type Tx = WsProbeSender;

    fn split(self) -> (WsProbeSender, WsMessageReceiver) {
        let (sink, stream) = self.inner.split();
        (WsProbeSender { sink }, WsMessageReceiver { stream })
    }
}

#[async_trait]
impl ProbeSink for WsProbeSender {
    async fn send_probe(&mut self) -> Result<()> {
        self.sink.send(Message::Ping(Vec::new())).await.map_err(|e| {
            EconestError::transport_error_with_source("heartbeat probe failed", Box::new(e))
        })
    }
}

#[async_trait]
impl MessageStream for WsMessageReceiver {
    async fn next_message(&mut self) -> Result<Option<TransportMessage>> {
        match self.stream.next().await {
            None => Ok(None),
            Some(Ok(Message::Binary(data))) => Ok(Some(TransportMessage::Binary(data))),
            Some(Ok(Message::Text(text))) => Ok(Some(TransportMessage::Text(text))),
            Some(Ok(Message::Close(frame))) => {
                debug!("WebSocket closed by peer: {:?}", frame);
                Ok(None)
            }
            Some(Ok(other)) => {
                trace!("Control frame: {:?}", other);
                Ok(Some(TransportMessage::Control))
            }
            Some(Err(e)) => Err(EconestError::transport_error_with_source(
                "websocket read failed",
                Box::new(e),
            )),
        }
    }
}
