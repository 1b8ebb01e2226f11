//! The broker transport seam and its tokio-tungstenite implementation.
//!
//! The connection task never touches a socket directly: it talks STOMP
//! frames over a [`BrokerLink`] channel pair, and a pump task owns the
//! websocket. Tests substitute a channel-backed fake behind the same
//! [`Transport`] trait.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use retro_stomp::{Frame, Inbound, codec};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};

use crate::error::RealtimeError;

/// Items the session pushes toward the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A full STOMP frame.
    Frame(Frame),
    /// A lone EOL keep-alive.
    Heartbeat,
}

/// One open link to the broker.
///
/// Dropping `outbound` asks the pump to close the socket; `inbound`
/// yielding `None` means the link is gone.
pub struct BrokerLink {
    /// Frames and heart-beats toward the broker.
    pub outbound: mpsc::Sender<Outbound>,
    /// Parsed frames and heart-beats from the broker.
    pub inbound: mpsc::Receiver<Inbound>,
}

/// Opens broker links. The seam tests inject a fake through.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Open one link to the broker at `url`.
    async fn open(&self, url: &str) -> Result<BrokerLink, RealtimeError>;
}

/// Capacity of the outbound frame channel.
const OUTBOUND_CAPACITY: usize = 64;

/// Capacity of the inbound frame channel.
const INBOUND_CAPACITY: usize = 256;

/// Real websocket transport over tokio-tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketTransport;

#[async_trait]
impl Transport for WebSocketTransport {
    async fn open(&self, url: &str) -> Result<BrokerLink, RealtimeError> {
        let (ws, _) = connect_async(url)
            .await
            .map_err(|e| RealtimeError::ConnectFailed {
                context: e.to_string(),
            })?;

        let (mut ws_tx, mut ws_rx) = ws.split();
        let (out_tx, mut out_rx) = mpsc::channel::<Outbound>(OUTBOUND_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel::<Inbound>(INBOUND_CAPACITY);

        // Pump task: encode outbound items, decode inbound messages, answer
        // Ping with Pong. Ends on Close, socket error, or either channel
        // side going away.
        let _pump = tokio::spawn(async move {
            loop {
                tokio::select! {
                    item = out_rx.recv() => {
                        match item {
                            Some(Outbound::Frame(frame)) => {
                                let msg = ws_message(codec::encode(&frame));
                                if ws_tx.send(msg).await.is_err() {
                                    break;
                                }
                            }
                            Some(Outbound::Heartbeat) => {
                                let msg = ws_message(codec::heartbeat_bytes());
                                if ws_tx.send(msg).await.is_err() {
                                    break;
                                }
                            }
                            None => {
                                // Session dropped the link: close politely.
                                let _ = ws_tx.send(Message::Close(None)).await;
                                break;
                            }
                        }
                    }
                    msg = ws_rx.next() => {
                        let Some(msg) = msg else { break };
                        match msg {
                            Ok(Message::Text(text)) => {
                                if !forward(&in_tx, text.as_bytes()).await {
                                    break;
                                }
                            }
                            Ok(Message::Binary(data)) => {
                                if !forward(&in_tx, &data).await {
                                    break;
                                }
                            }
                            Ok(Message::Ping(data)) => {
                                if ws_tx.send(Message::Pong(data)).await.is_err() {
                                    break;
                                }
                            }
                            Ok(Message::Close(_)) => {
                                debug!("broker sent close frame");
                                break;
                            }
                            Ok(_) => {}
                            Err(e) => {
                                warn!("websocket error: {e}");
                                break;
                            }
                        }
                    }
                }
            }
        });

        Ok(BrokerLink {
            outbound: out_tx,
            inbound: in_rx,
        })
    }
}

/// Wire bytes as a websocket message: text when valid UTF-8, which every
/// frame the client builds is.
fn ws_message(bytes: Vec<u8>) -> Message {
    match String::from_utf8(bytes) {
        Ok(text) => Message::Text(text.into()),
        Err(raw) => Message::Binary(raw.into_bytes().into()),
    }
}

/// Decode one payload and forward it. Returns `false` when the session side
/// is gone and the pump should stop.
async fn forward(in_tx: &mpsc::Sender<Inbound>, payload: &[u8]) -> bool {
    match codec::decode(payload) {
        Ok(inbound) => in_tx.send(inbound).await.is_ok(),
        Err(e) => {
            // Unparseable frame: drop it, keep the link. The channel is
            // best-effort and the next frame may be fine.
            warn!("dropping unparseable broker frame: {e}");
            true
        }
    }
}
