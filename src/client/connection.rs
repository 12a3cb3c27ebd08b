//! WebSocket client for the sync server.
//!
//! A writer task serializes [`ClientEvent`]s onto the socket; a reader task
//! decodes text frames into [`ServerEvent`]s and hands them to the
//! application over a channel. Dropping the client ends the writer, which
//! closes the socket.

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

use crate::models::{ClientEvent, ServerEvent};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("connection closed")]
    Closed,
}

pub struct SyncClient {
    outgoing: mpsc::UnboundedSender<ClientEvent>,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl SyncClient {
    /// Connect to `url` (e.g. `ws://127.0.0.1:3000/ws`). Returns the client
    /// and the stream of events the server sends.
    pub async fn connect(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<ServerEvent>), ClientError> {
        let (stream, _) = connect_async(url).await?;
        let (mut sink, mut source) = stream.split();
        debug!("Connected to {}", url);

        let (out_tx, mut out_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let (in_tx, in_rx) = mpsc::unbounded_channel::<ServerEvent>();

        let writer = tokio::spawn(async move {
            while let Some(event) = out_rx.recv().await {
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Failed to encode client event: {}", e);
                        continue;
                    }
                };
                if sink.send(Message::text(text)).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader = tokio::spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            if in_tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Undecodable server frame: {}", e),
                    },
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        });

        Ok((Self { outgoing: out_tx, writer, reader }, in_rx))
    }

    pub fn send(&self, event: ClientEvent) -> Result<(), ClientError> {
        self.outgoing.send(event).map_err(|_| ClientError::Closed)
    }

    /// Close the socket and stop both tasks.
    pub async fn close(self) {
        let Self { outgoing, writer, reader } = self;
        drop(outgoing);
        let _ = writer.await;
        reader.abort();
    }
}
