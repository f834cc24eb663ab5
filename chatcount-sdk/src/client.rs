//! Connection manager for the chat server.
//!
//! Owns the socket lifecycle: connect, log in, run the read loop, restart and
//! shut down. Each session runs on its own spawned task (the worker); a
//! supervisor task serializes `start`/`restart`/`shutdown` requests so that at
//! most one socket is ever live.
//!
//! ```text
//! Disconnected ──start──▶ Connecting ──handshake ok──▶ Connected
//!      ▲                      │                            │
//!      └──── error / EOF ─────┴──── error / EOF / shutdown ┘
//!                         restart: Connected ─▶ (close) ─▶ Connecting
//! ```
//!
//! ## Reconnection
//!
//! There is no automatic reconnect. A failed connect or a dropped session
//! leaves the manager `Disconnected` until the host calls
//! [`ConnectionManager::start`] or [`ConnectionManager::restart`] again.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::controller::CounterController;
use crate::error::ConnectionError;
use crate::event::Event;
use crate::frame::{Frame, FrameReader};
use crate::irc::Message;
use crate::keepalive;
use crate::ports::{Credentials, SettingsStore};
use crate::reply::ReplySender;
use crate::router::CommandRouter;

/// Default chat server (plaintext).
pub const DEFAULT_SERVER: &str = "irc.chat.twitch.tv:6667";

/// Lifecycle of the single socket session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Closing,
}

/// Configuration for connecting to the chat server.
#[derive(Debug, Clone)]
pub struct ConnectConfig {
    /// Server address (host:port).
    pub server_addr: String,
    /// Capabilities requested during login.
    pub capabilities: Vec<String>,
    pub connect_timeout: Duration,
    /// Send our own `PING` after this long without traffic.
    pub ping_interval: Duration,
    /// Drop the session when nothing at all has arrived for this long.
    /// Checked only once our own `PING` is out.
    pub ping_timeout: Duration,
    /// Minimum spacing between outbound replies.
    pub message_delay: Duration,
    /// Answer chat commands in the channel.
    pub reply: bool,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER.to_string(),
            capabilities: vec!["twitch.tv/tags".to_string(), "twitch.tv/commands".to_string()],
            connect_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(60),
            ping_timeout: Duration::from_secs(120),
            message_delay: Duration::from_millis(1500),
            reply: true,
        }
    }
}

/// Login frames in the order the server expects them: credential, identity,
/// capability request, channel join.
pub fn handshake_frames(creds: &Credentials, capabilities: &[String]) -> Vec<Message> {
    vec![
        Message::new("PASS").with_param(&creds.token),
        Message::new("NICK").with_param(&creds.nick),
        Message::new("CAP")
            .with_param("REQ")
            .with_trailing(&capabilities.join(" ")),
        Message::new("JOIN").with_param(&creds.channel),
    ]
}

#[derive(Debug)]
enum Control {
    Start,
    Restart,
    Shutdown(Option<oneshot::Sender<()>>),
}

/// A handle to the connection supervisor. Cheap to clone; every method
/// returns immediately except the explicitly async ones.
#[derive(Clone)]
pub struct ConnectionManager {
    control_tx: mpsc::UnboundedSender<Control>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl ConnectionManager {
    /// Spawn the supervisor on the current tokio runtime. Nothing connects
    /// until [`start`](Self::start) is called.
    ///
    /// Credentials and command bindings are read from `settings` at the
    /// beginning of every session, so a restart picks up changed settings.
    pub fn spawn(
        config: ConnectConfig,
        controller: Arc<CounterController>,
        settings: Arc<dyn SettingsStore>,
    ) -> (Self, mpsc::Receiver<Event>) {
        let (event_tx, event_rx) = mpsc::channel(256);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let shared = Arc::new(Shared {
            config,
            controller,
            settings,
            state_tx,
            event_tx,
        });
        tokio::spawn(supervise(shared, control_rx));

        (
            Self {
                control_tx,
                state_rx,
            },
            event_rx,
        )
    }

    /// Open a session. No-op while one is connecting or connected.
    pub fn start(&self) -> Result<(), ConnectionError> {
        self.send(Control::Start)
    }

    /// Close the current session (if any), wait for its worker to exit, then
    /// start a fresh one.
    pub fn restart(&self) -> Result<(), ConnectionError> {
        self.send(Control::Restart)
    }

    /// Close the current session. Safe to call when nothing is open.
    pub fn shutdown(&self) -> Result<(), ConnectionError> {
        self.send(Control::Shutdown(None))
    }

    /// Like [`shutdown`](Self::shutdown), but resolves once the worker has
    /// exited and its socket is closed.
    pub async fn close(&self) -> Result<(), ConnectionError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(Control::Shutdown(Some(ack_tx)))?;
        ack_rx.await.map_err(|_| ConnectionError::ManagerClosed)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Resolve once the state equals `target` (immediately if it already does).
    pub async fn wait_for_state(&self, target: ConnectionState) -> Result<(), ConnectionError> {
        let mut rx = self.state_rx.clone();
        rx.wait_for(|state| *state == target)
            .await
            .map(|_| ())
            .map_err(|_| ConnectionError::ManagerClosed)
    }

    fn send(&self, control: Control) -> Result<(), ConnectionError> {
        self.control_tx
            .send(control)
            .map_err(|_| ConnectionError::ManagerClosed)
    }
}

struct Shared {
    config: ConnectConfig,
    controller: Arc<CounterController>,
    settings: Arc<dyn SettingsStore>,
    state_tx: watch::Sender<ConnectionState>,
    event_tx: mpsc::Sender<Event>,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, next: ConnectionState) {
        let changed = self.state_tx.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
        if changed {
            tracing::debug!(state = ?next, "Connection state changed");
            self.emit(Event::State(next));
        }
    }

    fn emit(&self, event: Event) {
        if let Err(e) = self.event_tx.try_send(event) {
            tracing::debug!(error = %e, "Dropping event");
        }
    }
}

struct Worker {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Worker {
    /// Signal the worker and wait until it has exited. Its socket is closed
    /// by the time this returns.
    async fn stop(self) {
        let _ = self.stop_tx.send(());
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Connection worker panicked");
        }
    }
}

async fn supervise(shared: Arc<Shared>, mut control_rx: mpsc::UnboundedReceiver<Control>) {
    let mut worker: Option<Worker> = None;

    while let Some(control) = control_rx.recv().await {
        match control {
            Control::Start => {
                let state = shared.state();
                if matches!(state, ConnectionState::Connecting | ConnectionState::Connected) {
                    tracing::debug!(state = ?state, "Start ignored, session already active");
                    continue;
                }
                // A previous worker may still be unwinding after an error.
                if let Some(old) = worker.take() {
                    old.stop().await;
                }
                worker = Some(spawn_worker(&shared));
            }
            Control::Restart => {
                if let Some(old) = worker.take() {
                    tracing::info!("Restarting connection");
                    shared.set_state(ConnectionState::Closing);
                    old.stop().await;
                }
                worker = Some(spawn_worker(&shared));
            }
            Control::Shutdown(ack) => {
                if let Some(old) = worker.take() {
                    shared.set_state(ConnectionState::Closing);
                    old.stop().await;
                }
                shared.set_state(ConnectionState::Disconnected);
                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
            }
        }
    }

    // Every handle is gone.
    if let Some(old) = worker.take() {
        old.stop().await;
    }
}

fn spawn_worker(shared: &Arc<Shared>) -> Worker {
    shared.set_state(ConnectionState::Connecting);
    let (stop_tx, stop_rx) = oneshot::channel();
    let shared = shared.clone();

    let task = tokio::spawn(async move {
        let reason = match run_session(&shared, stop_rx).await {
            Ok(reason) => {
                tracing::info!(reason = %reason, "Disconnected");
                reason
            }
            Err(e) => {
                tracing::warn!(error = %e, "Connection failed");
                e.to_string()
            }
        };
        shared.set_state(ConnectionState::Disconnected);
        shared.emit(Event::Disconnected { reason });
    });

    Worker { stop_tx, task }
}

/// One socket session, from connect to close. Returns the reason it ended
/// normally; socket failures come back as errors. The socket is dropped, and
/// so closed, when this returns.
async fn run_session(
    shared: &Shared,
    mut stop_rx: oneshot::Receiver<()>,
) -> Result<String, ConnectionError> {
    let config = &shared.config;
    let creds = shared.settings.load_credentials().normalized();
    let router = CommandRouter::new(&creds.nick, shared.settings.load_bindings());

    tracing::info!(
        server = %config.server_addr,
        nick = %creds.nick,
        channel = %creds.channel,
        bindings = router.bindings().len(),
        "Connecting"
    );

    let connect = TcpStream::connect(&config.server_addr);
    let tcp = tokio::select! {
        result = tokio::time::timeout(config.connect_timeout, connect) => {
            match result {
                Ok(Ok(tcp)) => tcp,
                Ok(Err(source)) => {
                    return Err(ConnectionError::Connect {
                        addr: config.server_addr.clone(),
                        source,
                    });
                }
                Err(_) => return Err(ConnectionError::ConnectTimeout(config.server_addr.clone())),
            }
        }
        _ = &mut stop_rx => return Ok("shutdown before connect".to_string()),
    };
    let (reader, mut writer) = tcp.into_split();

    for frame in handshake_frames(&creds, &config.capabilities) {
        writer
            .write_all(frame.to_frame().as_bytes())
            .await
            .map_err(ConnectionError::Handshake)?;
    }
    writer.flush().await.map_err(ConnectionError::Handshake)?;
    shared.set_state(ConnectionState::Connected);
    tracing::info!(channel = %creds.channel, "Connected");

    let mut frames = FrameReader::new(reader);
    let mut replies = ReplySender::new(&creds.channel, config.message_delay);
    let mut last_activity = Instant::now();
    let mut ping_sent = false;

    loop {
        let deadline = if ping_sent {
            last_activity + config.ping_timeout.max(config.ping_interval)
        } else {
            last_activity + config.ping_interval
        };

        tokio::select! {
            frame = frames.next_frame() => {
                last_activity = Instant::now();
                ping_sent = false;
                match frame? {
                    Frame::EndOfStream => return Ok("connection closed by server".to_string()),
                    Frame::Malformed(e) => {
                        tracing::warn!(error = %e, "Dropping malformed frame");
                    }
                    Frame::Line(line) => {
                        tracing::trace!(line = %line, "<<");
                        let msg = Message::parse(&line);
                        if msg.command.is_empty() {
                            tracing::debug!(line = %line, "Ignoring unparseable frame");
                            continue;
                        }
                        dispatch(shared, &router, &mut replies, &mut writer, msg).await?;
                    }
                }
            }
            _ = &mut stop_rx => {
                tracing::debug!("Shutdown requested, closing socket");
                return Ok("shutdown".to_string());
            }
            _ = tokio::time::sleep_until(deadline) => {
                if ping_sent {
                    return Err(ConnectionError::Timeout);
                }
                let ping = Message::new("PING").with_trailing("keepalive").to_frame();
                writer
                    .write_all(ping.as_bytes())
                    .await
                    .map_err(ConnectionError::Transmit)?;
                ping_sent = true;
            }
        }
    }
}

/// Handle one parsed frame, in arrival order: liveness checks first, then
/// server notices, then chat commands.
async fn dispatch<W>(
    shared: &Shared,
    router: &CommandRouter,
    replies: &mut ReplySender,
    writer: &mut W,
    msg: Message,
) -> Result<(), ConnectionError>
where
    W: AsyncWrite + Unpin,
{
    if let Some(payload) = keepalive::answer(&msg, writer).await? {
        shared.emit(Event::PingAnswered { payload });
        return Ok(());
    }

    match msg.command.as_str() {
        "001" => {
            let nick = msg.params.first().cloned().unwrap_or_default();
            tracing::info!(nick = %nick, "Logged in");
            shared.emit(Event::Registered { nick });
        }
        "NOTICE" => {
            let text = msg.trailing.clone().unwrap_or_default();
            tracing::warn!(text = %text, "Server notice");
            shared.emit(Event::ServerNotice { text });
        }
        "RECONNECT" => {
            tracing::warn!("Server requested a reconnect; waiting for a manual restart");
            shared.emit(Event::Reconnect);
        }
        "PRIVMSG" => {
            let action = router.route(&msg);
            let Some(value) = shared.controller.apply(action) else {
                return Ok(());
            };
            let from = msg.sender_nick().unwrap_or_default().to_string();
            let moderator = msg.is_moderator();
            tracing::info!(
                from = %from,
                action = ?action,
                value,
                moderator,
                "Applied chat command"
            );
            shared.emit(Event::Command {
                from,
                text: msg.trailing.clone().unwrap_or_default(),
                action,
                value,
                moderator,
            });

            if shared.config.reply {
                let text = shared.controller.display_text(value);
                match replies.reply(writer, shared.state(), &text, msg.id()).await {
                    Err(ConnectionError::NotConnected) => {
                        tracing::debug!(value, "Session closing, reply skipped");
                    }
                    other => other?,
                }
            }
        }
        other => {
            tracing::trace!(command = %other, "Unhandled frame");
        }
    }
    Ok(())
}
