//! services/notifier/src/client/transport.rs
//!
//! The Transport Connector: one background task that keeps a single push
//! connection alive, feeds inbound messages into the shared state and writes
//! queued actions to the socket.
//!
//! Lifecycle decisions come from `notification_core::reconnect`; this module
//! only performs the effects and turns socket activity into events.

use crate::client::protocol::{ClientMessage, ServerMessage};
use crate::client::state::ClientState;
use futures::{FutureExt, SinkExt, StreamExt};
use notification_core::reconnect::{self, ABNORMAL_CLOSURE};
use notification_core::{ConnectionEvent, ConnectionState, Effect};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{self, Message, Utf8Bytes};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Close code used when the server closes without one.
const NO_STATUS_RECEIVED: u16 = 1005;

//=========================================================================================
// Link (cloneable send handle)
//=========================================================================================

/// A cheap handle for writing to the live connection.
#[derive(Clone)]
pub struct Link {
    outbound: mpsc::UnboundedSender<ClientMessage>,
    status: watch::Receiver<ConnectionState>,
}

impl Link {
    pub fn state(&self) -> ConnectionState {
        *self.status.borrow()
    }

    pub fn is_open(&self) -> bool {
        self.state().is_open()
    }

    /// Queues `message` on the open socket. Returns `false` when the link is
    /// not open, so the caller can fall back to REST.
    pub fn send(&self, message: ClientMessage) -> bool {
        self.is_open() && self.outbound.send(message).is_ok()
    }

    /// Waits for the next state change.
    pub async fn changed(&mut self) -> Option<ConnectionState> {
        self.status.changed().await.ok()?;
        Some(*self.status.borrow_and_update())
    }
}

//=========================================================================================
// Connector (owner of the background task)
//=========================================================================================

pub struct Connector {
    link: Link,
    reconnect: Arc<Notify>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl Connector {
    /// Spawns the connection task and starts connecting immediately.
    pub fn spawn(state: Arc<ClientState>, url: String, backlog_limit: u32) -> Self {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        // The task connects right away, so the link never reports a stale idle.
        let (status_tx, status) = watch::channel(ConnectionState::Connecting { attempt: 0 });
        let reconnect = Arc::new(Notify::new());
        let shutdown = CancellationToken::new();

        let driver = Driver {
            state,
            url,
            backlog_limit,
            outbound_rx,
            status: status_tx,
            reconnect: reconnect.clone(),
            shutdown: shutdown.clone(),
            socket: None,
            pending_delay: None,
        };
        let task = tokio::spawn(driver.run());

        Self {
            link: Link { outbound, status },
            reconnect,
            shutdown,
            task,
        }
    }

    pub fn link(&self) -> Link {
        self.link.clone()
    }

    /// Manual retry after the connector gave up or the server closed normally.
    /// Ignored unless the connector is idle: a trigger sent while connected
    /// must not survive into a later deliberate close.
    pub fn reconnect(&self) -> bool {
        if self.link.state() != ConnectionState::Idle {
            debug!("Ignoring reconnect request, connection is {:?}.", self.link.state());
            return false;
        }
        self.reconnect.notify_one();
        true
    }

    /// Cancels a pending reconnect timer, closes an open socket with code 1000
    /// and waits for the task to finish.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Err(e) = (&mut self.task).await {
            error!("Connection task ended abnormally: {:?}", e);
        }
    }
}

//=========================================================================================
// Driver (the background task)
//=========================================================================================

struct Driver {
    state: Arc<ClientState>,
    url: String,
    backlog_limit: u32,
    outbound_rx: mpsc::UnboundedReceiver<ClientMessage>,
    status: watch::Sender<ConnectionState>,
    reconnect: Arc<Notify>,
    shutdown: CancellationToken,
    socket: Option<WsStream>,
    pending_delay: Option<Duration>,
}

/// What woke the session loop.
enum Step {
    Shutdown,
    Outbound(ClientMessage),
    Frame(Option<Result<Message, tungstenite::Error>>),
}

impl Driver {
    async fn run(mut self) {
        let mut current = ConnectionState::Idle;
        let mut event = ConnectionEvent::Connect;

        loop {
            let (next, effects) = reconnect::transition(current, event);
            if next != current {
                debug!("Push connection {:?} -> {:?} on {:?}", current, next, event);
            }
            current = next;
            if current.is_open() {
                // Drop a trigger that raced the previous idle period.
                let _ = self.reconnect.notified().now_or_never();
            }
            self.status.send_replace(current);

            let mut follow_up = None;
            for effect in effects {
                if let Some(ev) = self.perform(effect).await {
                    follow_up = Some(ev);
                }
            }

            event = match follow_up {
                Some(ev) => ev,
                None => match self.wait(current).await {
                    Some(ev) => ev,
                    None => break,
                },
            };
        }

        debug!("Push connection task stopped.");
    }

    async fn perform(&mut self, effect: Effect) -> Option<ConnectionEvent> {
        match effect {
            Effect::OpenSocket => Some(self.open().await),
            Effect::RequestBacklog => {
                let request = ClientMessage::GetNotifications {
                    limit: self.backlog_limit,
                };
                self.write(&request).await
            }
            Effect::ScheduleReconnect { delay } => {
                info!("Push connection lost, reconnecting in {} ms.", delay.as_millis());
                self.pending_delay = Some(delay);
                None
            }
            Effect::CancelReconnect => {
                self.pending_delay = None;
                None
            }
            Effect::CloseSocket { code } => {
                if let Some(mut ws) = self.socket.take() {
                    let frame = CloseFrame {
                        code: CloseCode::from(code),
                        reason: Utf8Bytes::from_static("client shutdown"),
                    };
                    if let Err(e) = ws.close(Some(frame)).await {
                        debug!("Close handshake failed: {}", e);
                    }
                }
                None
            }
            Effect::GiveUp => {
                warn!(
                    "Push connection failed {} times, staying offline.",
                    reconnect::MAX_RECONNECT_ATTEMPTS
                );
                None
            }
        }
    }

    async fn open(&mut self) -> ConnectionEvent {
        let result = tokio::select! {
            _ = self.shutdown.cancelled() => return ConnectionEvent::Shutdown,
            result = tokio_tungstenite::connect_async(self.url.as_str()) => result,
        };
        match result {
            Ok((ws, _response)) => {
                info!("Push connection established.");
                self.socket = Some(ws);
                ConnectionEvent::Opened
            }
            Err(e) => {
                warn!("Push connection failed: {}", e);
                ConnectionEvent::Closed { code: ABNORMAL_CLOSURE }
            }
        }
    }

    /// Waits for whatever the current state is waiting on. `None` ends the task.
    async fn wait(&mut self, current: ConnectionState) -> Option<ConnectionEvent> {
        match current {
            ConnectionState::Open => Some(self.session().await),
            ConnectionState::Backoff { .. } => {
                let delay = self.pending_delay.take().unwrap_or_default();
                tokio::select! {
                    _ = self.shutdown.cancelled() => Some(ConnectionEvent::Shutdown),
                    _ = tokio::time::sleep(delay) => Some(ConnectionEvent::TimerFired),
                }
            }
            ConnectionState::Idle => {
                if self.shutdown.is_cancelled() {
                    return None;
                }
                tokio::select! {
                    _ = self.shutdown.cancelled() => None,
                    _ = self.reconnect.notified() => Some(ConnectionEvent::Connect),
                }
            }
            ConnectionState::Connecting { .. } => {
                // Opening always reports back through `perform`.
                Some(ConnectionEvent::Closed { code: ABNORMAL_CLOSURE })
            }
        }
    }

    /// Runs the open connection until it closes or the client shuts down.
    async fn session(&mut self) -> ConnectionEvent {
        loop {
            let Some(ws) = self.socket.as_mut() else {
                return ConnectionEvent::Closed { code: ABNORMAL_CLOSURE };
            };

            let step = tokio::select! {
                _ = self.shutdown.cancelled() => Step::Shutdown,
                Some(message) = self.outbound_rx.recv() => Step::Outbound(message),
                frame = ws.next() => Step::Frame(frame),
            };

            match step {
                Step::Shutdown => return ConnectionEvent::Shutdown,
                Step::Outbound(message) => {
                    if let Some(ev) = self.write(&message).await {
                        return ev;
                    }
                }
                Step::Frame(Some(Ok(Message::Text(text)))) => {
                    let message = match serde_json::from_str::<ServerMessage>(text.as_str()) {
                        Ok(message) => message,
                        Err(e) => {
                            warn!("Dropping malformed push message: {}", e);
                            continue;
                        }
                    };
                    if let Some(reply) = self.state.handle_server_message(message).await {
                        if let Some(ev) = self.write(&reply).await {
                            return ev;
                        }
                    }
                }
                Step::Frame(Some(Ok(Message::Close(frame)))) => {
                    let code = frame
                        .map(|f| u16::from(f.code))
                        .unwrap_or(NO_STATUS_RECEIVED);
                    info!("Push server closed the connection with code {}.", code);
                    self.socket = None;
                    return ConnectionEvent::Closed { code };
                }
                Step::Frame(Some(Ok(_))) => {}
                Step::Frame(Some(Err(e))) => {
                    warn!("Push connection error: {}", e);
                    self.socket = None;
                    return ConnectionEvent::Closed { code: ABNORMAL_CLOSURE };
                }
                Step::Frame(None) => {
                    self.socket = None;
                    return ConnectionEvent::Closed { code: ABNORMAL_CLOSURE };
                }
            }
        }
    }

    /// Sends one message. A failed write ends the connection.
    async fn write(&mut self, message: &ClientMessage) -> Option<ConnectionEvent> {
        let ws = self.socket.as_mut()?;
        let json = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to encode {:?}: {}", message, e);
                return None;
            }
        };
        if let Err(e) = ws.send(Message::Text(json.into())).await {
            warn!("Failed to send on push connection: {}", e);
            self.socket = None;
            return Some(ConnectionEvent::Closed { code: ABNORMAL_CLOSURE });
        }
        None
    }
}

impl Drop for Connector {
    fn drop(&mut self) {
        // Dropping without `shutdown()` still stops the task.
        self.shutdown.cancel();
    }
}
