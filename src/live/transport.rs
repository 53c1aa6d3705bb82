use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::messages::{ClientMessage, ServerMessage, Setup};
use super::LiveError;

/// Channel capacity for outbound frames.
const OUTBOUND_CAPACITY: usize = 64;

/// An established bidirectional stream
///
/// Dropping `outbound` closes the stream; `inbound` yields `None` once the
/// remote side has closed it.
pub struct LiveConnection {
    pub outbound: mpsc::Sender<ClientMessage>,
    pub inbound: mpsc::Receiver<Result<ServerMessage, LiveError>>,
}

/// Opens streams to the live endpoint
#[async_trait]
pub trait LiveConnector: Send + Sync {
    /// Perform the handshake and send `setup` as the first message
    async fn connect(&self, setup: Setup) -> Result<LiveConnection, LiveError>;
}

/// WebSocket transport for the hosted live endpoint
pub struct WebSocketConnector {
    url: String,
    api_key: String,
}

impl WebSocketConnector {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
        }
    }

    fn endpoint(&self) -> String {
        if self.api_key.is_empty() {
            return self.url.clone();
        }
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}key={}", self.url, separator, self.api_key)
    }
}

#[async_trait]
impl LiveConnector for WebSocketConnector {
    async fn connect(&self, setup: Setup) -> Result<LiveConnection, LiveError> {
        info!("Connecting to live endpoint {} (model {})", self.url, setup.model);

        let (ws_stream, _response) = tokio_tungstenite::connect_async(self.endpoint())
            .await
            .map_err(|e| LiveError::ConnectionFailed(e.to_string()))?;

        let (mut ws_sink, mut ws_stream) = ws_stream.split();

        let setup_json = serde_json::to_string(&ClientMessage::Setup(setup))
            .map_err(|e| LiveError::Serialization(e.to_string()))?;
        ws_sink
            .send(Message::Text(setup_json.into()))
            .await
            .map_err(|e| LiveError::ConnectionFailed(e.to_string()))?;

        info!("Connected to live endpoint");

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<ClientMessage>(OUTBOUND_CAPACITY);
        let (inbound_tx, inbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    outgoing = outbound_rx.recv() => {
                        let Some(message) = outgoing else {
                            // Session dropped its sender: hang up
                            let _ = ws_sink.send(Message::Close(None)).await;
                            break;
                        };

                        let json = match serde_json::to_string(&message) {
                            Ok(j) => j,
                            Err(e) => {
                                error!("Failed to serialize client message: {}", e);
                                continue;
                            }
                        };

                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            let _ = inbound_tx.send(Err(LiveError::WebSocket(e.to_string()))).await;
                            break;
                        }
                    }

                    incoming = ws_stream.next() => {
                        let payload = match incoming {
                            Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
                            Some(Ok(Message::Binary(data))) => data.to_vec(),
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    warn!("Failed to send pong: {}", e);
                                }
                                continue;
                            }
                            Some(Ok(Message::Close(frame))) => {
                                info!("Live stream closed by server: {:?}", frame);
                                break;
                            }
                            Some(Ok(_)) => continue,
                            Some(Err(e)) => {
                                let _ = inbound_tx.send(Err(LiveError::WebSocket(e.to_string()))).await;
                                break;
                            }
                            None => break,
                        };

                        match serde_json::from_slice::<ServerMessage>(&payload) {
                            Ok(message) => {
                                if inbound_tx.send(Ok(message)).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!("Failed to parse server message: {}", e);
                            }
                        }
                    }
                }
            }

            debug!("Live transport task finished");
        });

        Ok(LiveConnection {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
