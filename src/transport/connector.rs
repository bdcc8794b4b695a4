//! Socket connectors
//!
//! The multiplexer talks to a socket through a pair of channels so that the
//! WebSocket implementation can be swapped out (and faked in tests).

use futures::future::BoxFuture;
use futures::{FutureExt, SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::error::{Error, Result};

use super::protocol::InboundMessage;

/// A connected socket seen as two channels
///
/// Dropping `outbound` closes the socket. `inbound` ends when the peer closes
/// or the connection fails.
pub struct SocketChannel {
    /// Text frames to send
    pub outbound: mpsc::Sender<String>,
    /// Frames received
    pub inbound: mpsc::Receiver<InboundMessage>,
}

/// Opens stream sockets
pub trait Connector: Send + Sync + 'static {
    /// Connect to `url`; resolves once the socket is open
    fn connect(&self, url: Url, authorization: Option<String>)
        -> BoxFuture<'static, Result<SocketChannel>>;
}

/// WebSocket connector backed by `tokio-tungstenite`
#[derive(Debug, Clone)]
pub struct WsConnector {
    capacity: usize,
}

impl WsConnector {
    /// Create a connector buffering up to `capacity` frames per direction
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(256)
    }
}

impl Connector for WsConnector {
    fn connect(
        &self,
        url: Url,
        authorization: Option<String>,
    ) -> BoxFuture<'static, Result<SocketChannel>> {
        let capacity = self.capacity;

        async move {
            let mut request = url.as_str().into_client_request()?;
            if let Some(auth) = authorization {
                let value = HeaderValue::from_str(&auth)
                    .map_err(|e| Error::InvalidConfig(format!("authorization header: {e}")))?;
                request.headers_mut().insert(AUTHORIZATION, value);
            }

            let (ws, _) = connect_async(request).await?;
            let (mut ws_tx, mut ws_rx) = ws.split();

            let (out_tx, mut out_rx) = mpsc::channel::<String>(capacity);
            let (in_tx, in_rx) = mpsc::channel(capacity);

            tokio::spawn(async move {
                while let Some(text) = out_rx.recv().await {
                    if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                        tracing::debug!(error = %e, "Socket write failed");
                        break;
                    }
                }
                let _ = ws_tx.close().await;
            });

            let peer = url.clone();
            tokio::spawn(async move {
                while let Some(message) = ws_rx.next().await {
                    let inbound = match message {
                        Ok(Message::Text(text)) => InboundMessage::Text(text.as_str().to_owned()),
                        Ok(Message::Binary(data)) => InboundMessage::Binary(data),
                        Ok(Message::Close(frame)) => {
                            tracing::debug!(url = %peer, frame = ?frame, "Socket closed by peer");
                            break;
                        }
                        Ok(_) => continue,
                        Err(e) => {
                            tracing::warn!(url = %peer, error = %e, "Socket read failed");
                            break;
                        }
                    };

                    if in_tx.send(inbound).await.is_err() {
                        break;
                    }
                }
            });

            Ok::<_, Error>(SocketChannel {
                outbound: out_tx,
                inbound: in_rx,
            })
        }
        .boxed()
    }
}
