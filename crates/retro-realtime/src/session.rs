//! The realtime session: public API plus the spawned connection task.
//!
//! [`RealtimeSession`] is the whole caller-facing surface. `connect` spawns
//! one task that owns the broker link for the session's lifetime; every
//! later call (`subscribe_to_*`, `disconnect`) is a command sent into that
//! task. The task walks INACTIVE → CONNECTING → CONNECTED, and a lost link
//! sends it back to CONNECTING after a fixed delay, forever, until
//! `disconnect` deactivates it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use retro_auth::TokenStore;
use retro_stomp::{Command, Frame, HeartBeat, Inbound};
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::RealtimeConfig;
use crate::dispatch::SubscriptionRegistry;
use crate::topic::{Category, Topic};
use crate::transport::{BrokerLink, Outbound, Transport, WebSocketTransport};

pub use crate::dispatch::MessageHandler;

/// Callback invoked each time the broker handshake completes. Callers
/// re-issue their subscriptions from here, so it fires once per successful
/// activation, including reconnects.
pub type ConnectCallback = Arc<dyn Fn() + Send + Sync>;

/// How long to wait for the broker's CONNECTED reply.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// How long to wait for the RECEIPT confirming a DISCONNECT.
const RECEIPT_TIMEOUT: Duration = Duration::from_secs(2);

/// Consecutive silent heart-beat windows tolerated before the link is
/// declared dead.
const MAX_MISSED_HEARTBEATS: u32 = 2;

/// Capacity of the command channel into the connection task.
const COMMAND_CAPACITY: usize = 32;

/// Stand-in period for a disabled heart-beat direction; its select arm is
/// guarded out, so it never fires.
const DISABLED_PERIOD: Duration = Duration::from_secs(3600);

// ─────────────────────────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────────────────────────

/// A realtime client session for one RetroQuest board.
///
/// Cheap handle over shared state; dropping it cancels any active
/// connection task.
pub struct RealtimeSession {
    shared: Arc<Shared>,
}

impl RealtimeSession {
    /// Session over the real websocket transport.
    pub fn new(config: RealtimeConfig, tokens: Arc<dyn TokenStore>) -> Self {
        Self::with_transport(config, tokens, Arc::new(WebSocketTransport))
    }

    /// Session over an injected transport. Tests use this to stand up a
    /// channel-backed broker.
    pub fn with_transport(
        config: RealtimeConfig,
        tokens: Arc<dyn TokenStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                tokens,
                transport,
                active: Mutex::new(None),
                connected: AtomicBool::new(false),
            }),
        }
    }

    /// Activate the session. Must run inside a tokio runtime.
    ///
    /// Spawns the connection task, which dials the broker, performs the
    /// STOMP handshake, and invokes `on_connected` once live. The task
    /// redials on every lost link with a fixed delay and calls
    /// `on_connected` again after each successful handshake. A second
    /// `connect` while active is ignored with a log.
    pub fn connect(&self, on_connected: ConnectCallback) {
        let mut guard = self.shared.active.lock();
        if guard.is_some() {
            warn!("realtime session already active; ignoring connect");
            return;
        }
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let cancel = CancellationToken::new();
        *guard = Some(Active {
            command_tx,
            cancel: cancel.clone(),
        });
        drop(guard);

        let shared = self.shared.clone();
        let _task = tokio::spawn(run(shared, command_rx, on_connected, cancel));
    }

    /// Deactivate the session: graceful DISCONNECT, then the task exits.
    /// No-op when the session is not active.
    pub fn disconnect(&self) {
        let guard = self.shared.active.lock();
        let Some(active) = guard.as_ref() else {
            debug!("disconnect with no active session");
            return;
        };
        if active.command_tx.try_send(SessionCommand::Disconnect).is_err() {
            // Task is wedged or already winding down: cancel instead.
            active.cancel.cancel();
        }
    }

    /// Whether the broker handshake has completed on the current link.
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Subscribe to a team's thought events.
    pub fn subscribe_to_thoughts(&self, team_id: &str, handler: MessageHandler) {
        self.subscribe(team_id, Category::Thoughts, handler);
    }

    /// Subscribe to a team's action-item events.
    pub fn subscribe_to_action_items(&self, team_id: &str, handler: MessageHandler) {
        self.subscribe(team_id, Category::ActionItems, handler);
    }

    /// Subscribe to a team's end-of-retro signal.
    pub fn subscribe_to_end_retro(&self, team_id: &str, handler: MessageHandler) {
        self.subscribe(team_id, Category::EndRetro, handler);
    }

    /// Common subscribe path. The bearer credential is read from the store
    /// at this moment, not at connect time, so a token refreshed since the
    /// session came up is what goes on the wire.
    ///
    /// Subscriptions are never deduplicated: each call registers its own
    /// handler, matching what callers expect from the broker's fan-out.
    fn subscribe(&self, team_id: &str, category: Category, handler: MessageHandler) {
        let topic = Topic::new(team_id, category);
        let guard = self.shared.active.lock();
        let Some(active) = guard.as_ref() else {
            warn!(%topic, "subscribe before connect; dropping");
            return;
        };
        if !self.shared.connected.load(Ordering::SeqCst) {
            warn!(%topic, "subscribe while broker link is down; dropping");
            return;
        }
        let authorization = self.shared.tokens.bearer();
        let command = SessionCommand::Subscribe {
            topic: topic.clone(),
            authorization,
            handler,
        };
        if active.command_tx.try_send(command).is_err() {
            warn!(%topic, "session command queue full; dropping subscribe");
        }
    }
}

impl Drop for RealtimeSession {
    fn drop(&mut self) {
        if let Some(active) = self.shared.active.lock().as_ref() {
            active.cancel.cancel();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shared state and commands
// ─────────────────────────────────────────────────────────────────────────────

struct Shared {
    config: RealtimeConfig,
    tokens: Arc<dyn TokenStore>,
    transport: Arc<dyn Transport>,
    active: Mutex<Option<Active>>,
    connected: AtomicBool,
}

impl Shared {
    fn clear_active(&self) {
        *self.active.lock() = None;
    }
}

/// Handle to a live connection task.
struct Active {
    command_tx: mpsc::Sender<SessionCommand>,
    cancel: CancellationToken,
}

enum SessionCommand {
    Subscribe {
        topic: Topic,
        authorization: Option<String>,
        handler: MessageHandler,
    },
    Disconnect,
}

/// Why `drive` gave the link back.
enum LinkOutcome {
    /// The link died; redial after the reconnect delay.
    Dropped,
    /// The caller asked for teardown; the task exits.
    Deactivated,
}

// ─────────────────────────────────────────────────────────────────────────────
// Connection task
// ─────────────────────────────────────────────────────────────────────────────

async fn run(
    shared: Arc<Shared>,
    mut command_rx: mpsc::Receiver<SessionCommand>,
    on_connected: ConnectCallback,
    cancel: CancellationToken,
) {
    let url = shared.config.broker_url();
    let delay = Duration::from_millis(shared.config.reconnect_delay_ms);

    loop {
        match shared.transport.open(&url).await {
            Ok(mut link) => {
                let outcome =
                    drive(&shared, &mut link, &mut command_rx, &on_connected, &cancel).await;
                shared.connected.store(false, Ordering::SeqCst);
                match outcome {
                    LinkOutcome::Deactivated => break,
                    LinkOutcome::Dropped => warn!(url = %url, "broker link lost; reconnecting"),
                }
            }
            Err(e) => warn!(url = %url, "connect attempt failed: {e}"),
        }

        // Fixed delay, unbounded retries.
        tokio::select! {
            () = cancel.cancelled() => break,
            () = time::sleep(delay) => {}
        }
    }

    shared.connected.store(false, Ordering::SeqCst);
    shared.clear_active();
    info!("realtime session deactivated");
}

/// Drive one open link: handshake, then serve commands and inbound frames
/// until the link dies or the caller disconnects.
async fn drive(
    shared: &Shared,
    link: &mut BrokerLink,
    command_rx: &mut mpsc::Receiver<SessionCommand>,
    on_connected: &ConnectCallback,
    cancel: &CancellationToken,
) -> LinkOutcome {
    let cfg = &shared.config;
    let offer = HeartBeat::new(cfg.heartbeat_send_ms, cfg.heartbeat_recv_ms);
    let authorization = shared.tokens.bearer();
    let connect = Frame::connect(&cfg.broker_host, &offer, authorization.as_deref());
    if link.outbound.send(Outbound::Frame(connect)).await.is_err() {
        return LinkOutcome::Dropped;
    }

    // ─── CONNECTING: wait for the broker's CONNECTED reply ───────────────
    let deadline = Instant::now() + HANDSHAKE_TIMEOUT;
    let server_hb = loop {
        tokio::select! {
            () = cancel.cancelled() => return LinkOutcome::Deactivated,
            cmd = command_rx.recv() => match cmd {
                Some(SessionCommand::Subscribe { topic, .. }) => {
                    warn!(%topic, "subscribe before handshake completed; dropping");
                }
                Some(SessionCommand::Disconnect) | None => return LinkOutcome::Deactivated,
            },
            inbound = link.inbound.recv() => match inbound {
                None => return LinkOutcome::Dropped,
                Some(Inbound::Heartbeat) => {}
                Some(Inbound::Frame(frame)) => match frame.command {
                    Command::Connected => break server_heartbeat(&frame),
                    Command::Error => {
                        warn!(reason = %error_reason(&frame), "broker rejected handshake");
                        return LinkOutcome::Dropped;
                    }
                    other => debug!(command = other.as_str(), "frame before CONNECTED; ignoring"),
                },
            },
            () = time::sleep_until(deadline) => {
                warn!("broker handshake timed out");
                return LinkOutcome::Dropped;
            }
        }
    };

    // ─── CONNECTED ───────────────────────────────────────────────────────
    let negotiated = offer.negotiate(&server_hb);
    let mut registry = SubscriptionRegistry::new();
    shared.connected.store(true, Ordering::SeqCst);
    info!(url = %cfg.broker_url(), "broker session established");
    on_connected();

    let send_enabled = negotiated.send_interval.is_some();
    let recv_enabled = negotiated.recv_interval.is_some();
    let mut hb_send = keepalive_interval(negotiated.send_interval);
    let mut hb_check = keepalive_interval(negotiated.recv_interval);
    let mut alive = false;
    let mut missed: u32 = 0;

    loop {
        tokio::select! {
            () = cancel.cancelled() => {
                graceful_close(link).await;
                return LinkOutcome::Deactivated;
            }
            cmd = command_rx.recv() => match cmd {
                Some(SessionCommand::Subscribe { topic, authorization, handler }) => {
                    let id = registry.register(topic.clone(), handler);
                    debug!(%topic, id = %id, "subscribing");
                    let frame = Frame::subscribe(&id, &topic.path(), authorization.as_deref());
                    if link.outbound.send(Outbound::Frame(frame)).await.is_err() {
                        return LinkOutcome::Dropped;
                    }
                }
                Some(SessionCommand::Disconnect) | None => {
                    graceful_close(link).await;
                    return LinkOutcome::Deactivated;
                }
            },
            inbound = link.inbound.recv() => {
                let Some(inbound) = inbound else {
                    warn!("broker link closed");
                    return LinkOutcome::Dropped;
                };
                alive = true;
                match inbound {
                    Inbound::Heartbeat => {}
                    Inbound::Frame(frame) => match frame.command {
                        Command::Message => registry.dispatch(&frame),
                        Command::Error => {
                            warn!(reason = %error_reason(&frame), "broker reported error");
                        }
                        Command::Receipt => {
                            debug!(receipt = frame.get_header("receipt-id"), "receipt");
                        }
                        other => debug!(command = other.as_str(), "unexpected frame; ignoring"),
                    },
                }
            }
            _ = hb_send.tick(), if send_enabled => {
                if link.outbound.send(Outbound::Heartbeat).await.is_err() {
                    return LinkOutcome::Dropped;
                }
            }
            _ = hb_check.tick(), if recv_enabled => {
                if alive {
                    alive = false;
                    missed = 0;
                } else {
                    missed += 1;
                    if missed >= MAX_MISSED_HEARTBEATS {
                        warn!("broker went quiet; dropping link");
                        return LinkOutcome::Dropped;
                    }
                }
            }
        }
    }
}

/// Send DISCONNECT and wait briefly for the confirming RECEIPT. Teardown
/// proceeds either way.
async fn graceful_close(link: &mut BrokerLink) {
    let receipt_id = format!("close-{}", Uuid::now_v7());
    let frame = Frame::disconnect(&receipt_id);
    if link.outbound.send(Outbound::Frame(frame)).await.is_err() {
        debug!("link already gone during disconnect");
        return;
    }

    let confirmed = time::timeout(RECEIPT_TIMEOUT, async {
        while let Some(inbound) = link.inbound.recv().await {
            if let Inbound::Frame(frame) = inbound {
                if frame.command == Command::Receipt
                    && frame.get_header("receipt-id") == Some(receipt_id.as_str())
                {
                    return true;
                }
            }
        }
        false
    })
    .await;

    match confirmed {
        Ok(true) => debug!("broker confirmed disconnect"),
        _ => debug!("no disconnect receipt from broker"),
    }
}

/// The broker's heart-beat offer from a CONNECTED frame. A missing or
/// malformed header means no heart-beating.
fn server_heartbeat(frame: &Frame) -> HeartBeat {
    match frame.get_header("heart-beat").map(HeartBeat::parse) {
        Some(Ok(hb)) => hb,
        Some(Err(e)) => {
            warn!("ignoring malformed broker heart-beat header: {e}");
            HeartBeat::DISABLED
        }
        None => HeartBeat::DISABLED,
    }
}

fn error_reason(frame: &Frame) -> String {
    frame
        .get_header("message")
        .map(str::to_string)
        .unwrap_or_else(|| frame.body_text().into_owned())
}

/// Interval whose first tick lands one period out, not immediately.
fn keepalive_interval(period: Option<Duration>) -> time::Interval {
    let period = period.unwrap_or(DISABLED_PERIOD);
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
