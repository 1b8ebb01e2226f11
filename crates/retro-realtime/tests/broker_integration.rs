//! End-to-end exercise of the session over a real websocket, against an
//! in-process STOMP broker stub.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use retro_auth::MemoryTokenStore;
use retro_realtime::{RealtimeConfig, RealtimeSession};
use retro_stomp::{Command, Frame, Inbound, codec};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Bind an ephemeral port and serve STOMP-over-websocket clients on it.
async fn boot_broker() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let _listener_task = tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let _client_task = tokio::spawn(serve_client(stream));
        }
    });
    addr
}

/// Minimal broker behavior: answer CONNECT, publish one canned message on
/// every SUBSCRIBE, confirm DISCONNECT receipts.
async fn serve_client(stream: TcpStream) {
    let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
    let (mut tx, mut rx) = ws.split();
    while let Some(Ok(msg)) = rx.next().await {
        let payload = match &msg {
            Message::Text(t) => t.as_bytes().to_vec(),
            Message::Binary(b) => b.to_vec(),
            Message::Ping(p) => {
                let _ = tx.send(Message::Pong(p.clone())).await;
                continue;
            }
            Message::Close(_) => break,
            _ => continue,
        };
        let Ok(Inbound::Frame(frame)) = codec::decode(&payload) else {
            continue;
        };
        match frame.command {
            Command::Connect => {
                assert_eq!(frame.get_header("accept-version"), Some("1.2"));
                let connected = Frame::new(Command::Connected)
                    .header("version", "1.2")
                    .header("heart-beat", "0,0");
                let _ = tx.send(text(&connected)).await;
            }
            Command::Subscribe => {
                let sub_id = frame.get_header("id").unwrap().to_string();
                let destination = frame.get_header("destination").unwrap().to_string();
                let mut message = Frame::new(Command::Message)
                    .header("subscription", &sub_id)
                    .header("destination", &destination)
                    .header("message-id", "m-1")
                    .header("content-type", "application/json");
                message.body = br#"{"id":7,"message":"ship it"}"#.to_vec();
                let _ = tx.send(text(&message)).await;
            }
            Command::Disconnect => {
                if let Some(receipt) = frame.get_header("receipt") {
                    let confirm = Frame::new(Command::Receipt).header("receipt-id", receipt);
                    let _ = tx.send(text(&confirm)).await;
                }
            }
            _ => {}
        }
    }
}

fn text(frame: &Frame) -> Message {
    Message::Text(String::from_utf8(codec::encode(frame)).unwrap().into())
}

fn session_against(addr: SocketAddr) -> RealtimeSession {
    let cfg = RealtimeConfig {
        broker_url: Some(format!("ws://{addr}/websocket/websocket")),
        ..Default::default()
    };
    RealtimeSession::new(cfg, Arc::new(MemoryTokenStore::with_token("jwt")))
}

#[tokio::test]
async fn connect_subscribe_receive_disconnect() {
    init_tracing();
    let addr = boot_broker().await;
    let session = session_against(addr);

    let (cb_tx, mut cb_rx) = mpsc::unbounded_channel();
    session.connect(Arc::new(move || {
        let _ = cb_tx.send(());
    }));
    tokio::time::timeout(Duration::from_secs(5), cb_rx.recv())
        .await
        .expect("connect timed out")
        .expect("callback dropped");
    assert!(session.is_connected());

    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel();
    session.subscribe_to_thoughts("team-1", Arc::new(move |v| {
        let _ = msg_tx.send(v);
    }));

    let payload = tokio::time::timeout(Duration::from_secs(5), msg_rx.recv())
        .await
        .expect("message timed out")
        .expect("handler dropped");
    assert_eq!(payload["id"], 7);
    assert_eq!(payload["message"], "ship it");

    session.disconnect();
    tokio::time::timeout(Duration::from_secs(5), async {
        while session.is_connected() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session never deactivated");
}

#[tokio::test]
async fn subscribe_after_disconnect_is_dropped_quietly() {
    init_tracing();
    let addr = boot_broker().await;
    let session = session_against(addr);

    let (cb_tx, mut cb_rx) = mpsc::unbounded_channel();
    session.connect(Arc::new(move || {
        let _ = cb_tx.send(());
    }));
    tokio::time::timeout(Duration::from_secs(5), cb_rx.recv())
        .await
        .expect("connect timed out")
        .expect("callback dropped");

    session.disconnect();
    tokio::time::timeout(Duration::from_secs(5), async {
        while session.is_connected() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("session never deactivated");

    // Late subscribe must neither panic nor resurrect the connection.
    let (msg_tx, mut msg_rx) = mpsc::unbounded_channel::<serde_json::Value>();
    session.subscribe_to_end_retro("team-1", Arc::new(move |v| {
        let _ = msg_tx.send(v);
    }));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(msg_rx.try_recv().is_err());
    assert!(!session.is_connected());
}
