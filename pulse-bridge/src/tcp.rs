use std::time::Duration;

use async_trait::async_trait;
use pulse_core::SerializableMap;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::{
    AppBridgeConfig, BridgeMessage, Connector, Envelope, FrameCodec, Hello, SharedObject,
    Transport, TransportError,
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens [`TcpTransport`]s to a companion app listening on `addr`.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: String,
    timeout: Duration,
    codec: FrameCodec,
}

impl TcpConnector {
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: DEFAULT_TIMEOUT,
            codec: FrameCodec::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Caps the size of every envelope sent to or accepted from the companion.
    pub fn with_max_frame_bytes(mut self, max_bytes: u32) -> Self {
        self.codec = FrameCodec::new(max_bytes);
        self
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Transport = TcpTransport;

    async fn open(&self, config: &AppBridgeConfig) -> Result<TcpTransport, TransportError> {
        config.validate()?;

        Ok(TcpTransport {
            addr: self.addr.clone(),
            hello: Hello::from(config),
            timeout: self.timeout,
            codec: self.codec,
            stream: None,
        })
    }
}

/// Framed request/response channel to the companion app.
///
/// Requests are answered strictly in order. Once an exchange fails midway the
/// socket is dropped, since a late reply would be read as the answer to the
/// next request.
pub struct TcpTransport {
    addr: String,
    hello: Hello,
    timeout: Duration,
    codec: FrameCodec,
    stream: Option<TcpStream>,
}

impl TcpTransport {
    async fn call(&mut self, body: BridgeMessage) -> Result<BridgeMessage, TransportError> {
        let result = self.exchange(body).await;

        if let Err(e) = &result
            && e.breaks_link()
        {
            warn!(addr = %self.addr, error = %e, "dropping companion connection");
            self.stream = None;
        }

        result
    }

    async fn exchange(&mut self, body: BridgeMessage) -> Result<BridgeMessage, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::Closed)?;
        let request = Envelope::request(body);
        let codec = self.codec;
        let timeout = self.timeout;

        let response = tokio::time::timeout(timeout, async {
            codec.write(stream, &request).await?;
            codec.read(stream).await
        })
        .await
        .map_err(|_| TransportError::Timeout(timeout))??;

        if !response.answers(&request) {
            return Err(TransportError::UnexpectedResponse);
        }

        Ok(response.body)
    }

    async fn handshake(&mut self) -> Result<(), TransportError> {
        match self.call(BridgeMessage::Hello(self.hello.clone())).await? {
            BridgeMessage::HelloAck => Ok(()),
            BridgeMessage::Error(err) => Err(TransportError::Rejected(format!(
                "{:?}: {}",
                err.code, err.message
            ))),
            _ => Err(TransportError::UnexpectedResponse),
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(&mut self) -> Result<(), TransportError> {
        if self.stream.is_some() {
            return Ok(());
        }

        let stream = tokio::time::timeout(self.timeout, TcpStream::connect(self.addr.as_str()))
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
            .map_err(|e| TransportError::Unreachable(format!("{}: {e}", self.addr)))?;

        debug!(addr = %self.addr, "tcp stream established");
        self.stream = Some(stream);

        if let Err(e) = self.handshake().await {
            self.stream = None;
            return Err(e);
        }

        Ok(())
    }

    async fn disconnect(&mut self) -> Result<(), TransportError> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };

        let goodbye = Envelope::request(BridgeMessage::Goodbye);
        let codec = self.codec;

        tokio::time::timeout(self.timeout, async {
            codec.write(&mut stream, &goodbye).await?;
            stream.shutdown().await?;
            Ok::<_, TransportError>(())
        })
        .await
        .map_err(|_| TransportError::Timeout(self.timeout))?
    }

    async fn add_object_to_shared_stream(
        &mut self,
        stream_key: &str,
        object: SerializableMap,
    ) -> Result<(), TransportError> {
        let object_json = serde_json::to_string(&object)?;
        let request = BridgeMessage::Publish(SharedObject {
            stream_key: stream_key.to_owned(),
            object_json,
        });

        match self.call(request).await? {
            BridgeMessage::PublishAck => Ok(()),
            BridgeMessage::Error(err) => Err(TransportError::Rejected(format!(
                "{stream_key}: {:?}: {}",
                err.code, err.message
            ))),
            _ => Err(TransportError::UnexpectedResponse),
        }
    }
}
