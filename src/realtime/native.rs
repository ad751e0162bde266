//! Native realtime manager: `tokio-tungstenite`.
//!
//! - Background tokio task owning the single live connection
//! - Lifecycle driven by the pure [`Lifecycle`] state machine
//! - Exponential reconnect backoff, cancellable by teardown
//! - Every decoded server event is routed to the cache before it is
//!   forwarded to the consumer stream
//! - Shuts itself down when the session credential is revoked

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream, Stream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::cache::CacheStore;
use crate::error::RealtimeError;
use crate::network::realtime_url;
use crate::realtime::{
    Action, ConnectionState, EventRouter, Lifecycle, RealtimeConfig, RealtimeEvent, ServerEvent,
    StopReason, Transition,
};
use crate::session::{Session, SessionEvent};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

// ─── Commands from public API to background task ─────────────────────────────

enum Command {
    Shutdown,
}

// ─── Background task state ───────────────────────────────────────────────────

struct TaskState {
    config: RealtimeConfig,
    session: Session,
    router: EventRouter,
    lifecycle: Lifecycle,
    event_tx: mpsc::Sender<RealtimeEvent>,
    cmd_rx: mpsc::Receiver<Command>,
    session_rx: broadcast::Receiver<SessionEvent>,
    session_open: bool,
    state_tx: Arc<watch::Sender<ConnectionState>>,
}

impl TaskState {
    fn emit(&self, event: RealtimeEvent) {
        let _ = self.event_tx.try_send(event);
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(self.lifecycle.state());
    }

    fn handle(&mut self, transition: Transition) -> Action {
        let action = self.lifecycle.handle_event(transition);
        self.publish_state();
        action
    }

    /// Map a session notification to a lifecycle input.
    fn session_transition(
        &mut self,
        event: Result<SessionEvent, broadcast::error::RecvError>,
    ) -> Option<Transition> {
        match event {
            Ok(SessionEvent::Expired) | Ok(SessionEvent::LoggedOut) => {
                Some(Transition::CredentialRevoked)
            }
            Ok(SessionEvent::LoggedIn) => None,
            Err(broadcast::error::RecvError::Lagged(_)) => {
                if self.session.token().is_none() {
                    Some(Transition::CredentialRevoked)
                } else {
                    None
                }
            }
            Err(broadcast::error::RecvError::Closed) => {
                self.session_open = false;
                None
            }
        }
    }

    /// Decode one text frame, route it, and forward it.
    fn dispatch(&self, text: &str) {
        match ServerEvent::parse(text) {
            Ok(event) => {
                self.router.route(&event);
                self.emit(RealtimeEvent::Server(event));
            }
            Err(e) => {
                tracing::warn!("Dropping malformed realtime frame: {} (raw: {})", e, text);
            }
        }
    }
}

// ─── Public RealtimeManager ──────────────────────────────────────────────────

/// Owner of the session's single realtime connection.
///
/// Hold one per authenticated session (typically at the application root):
/// [`start`](Self::start) on login, [`shutdown`](Self::shutdown) on logout.
pub struct RealtimeManager {
    config: RealtimeConfig,
    session: Session,
    router: EventRouter,
    cmd_tx: Option<mpsc::Sender<Command>>,
    event_rx: tokio::sync::Mutex<mpsc::Receiver<RealtimeEvent>>,
    event_tx: mpsc::Sender<RealtimeEvent>,
    task_handle: Option<JoinHandle<()>>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
}

impl RealtimeManager {
    /// Create a manager. Does not connect yet.
    pub fn new(config: RealtimeConfig, session: Session, cache: Arc<dyn CacheStore>) -> Self {
        let (event_tx, event_rx) = mpsc::channel(config.event_channel_capacity.max(1));
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            session,
            router: EventRouter::new(cache),
            cmd_tx: None,
            event_rx: tokio::sync::Mutex::new(event_rx),
            event_tx,
            task_handle: None,
            state_tx: Arc::new(state_tx),
        }
    }

    /// Start the connection if a credential is present.
    ///
    /// A no-op while a connection task is alive, so there is never more than
    /// one connection per manager. After the reconnect budget is exhausted,
    /// calling `start` again begins a fresh attempt sequence.
    pub fn start(&mut self) {
        if self.is_running() {
            tracing::debug!("Realtime manager already running, ignoring start");
            return;
        }
        if self.session.token().is_none() {
            tracing::info!("No session credential, realtime updates stay disconnected");
            self.state_tx.send_replace(ConnectionState::Disconnected);
            return;
        }

        let (cmd_tx, cmd_rx) = mpsc::channel(8);
        self.cmd_tx = Some(cmd_tx);

        let task = TaskState {
            config: self.config.clone(),
            session: self.session.clone(),
            router: self.router.clone(),
            lifecycle: Lifecycle::new(self.config.backoff),
            event_tx: self.event_tx.clone(),
            cmd_rx,
            session_rx: self.session.subscribe(),
            session_open: true,
            state_tx: Arc::clone(&self.state_tx),
        };

        self.task_handle = Some(tokio::spawn(run_task(task)));
    }

    /// Tear down: cancel any pending reconnect and close the live connection.
    ///
    /// Safe to call in any state, any number of times.
    pub async fn shutdown(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(Command::Shutdown).await;
        }

        if let Some(mut handle) = self.task_handle.take() {
            if tokio::time::timeout(Duration::from_secs(5), &mut handle)
                .await
                .is_err()
            {
                tracing::warn!("Realtime task did not stop in time, aborting");
                handle.abort();
            }
        }

        self.state_tx.send_replace(ConnectionState::Disconnected);
    }

    /// Whether a connection task is alive (connecting, open, or backing off).
    pub fn is_running(&self) -> bool {
        self.task_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Watch connection state changes.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Get a stream of events from the realtime connection.
    ///
    /// The returned stream borrows `self`, so it must be dropped
    /// before calling `shutdown()`.
    pub fn events(&self) -> Pin<Box<dyn Stream<Item = RealtimeEvent> + Send + '_>> {
        Box::pin(futures_util::stream::unfold(
            &self.event_rx,
            |rx| async move {
                let mut guard = rx.lock().await;
                guard.recv().await.map(|event| (event, rx))
            },
        ))
    }
}

impl Drop for RealtimeManager {
    fn drop(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            handle.abort();
        }
    }
}

// ─── Background task ─────────────────────────────────────────────────────────

async fn run_task(mut task: TaskState) {
    let mut action = task.handle(Transition::Start { credential: true });

    loop {
        action = match action {
            Action::Connect => connect_and_run(&mut task).await,
            Action::Schedule { attempt, delay } => backoff(&mut task, attempt, delay).await,
            Action::Stop(reason) => {
                finish(&task, reason);
                return;
            }
            Action::Ignore => {
                tracing::debug!("Lifecycle settled in {:?}", task.lifecycle.state());
                finish(&task, StopReason::TornDown);
                return;
            }
        };
    }
}

/// Connect, then pump messages until the connection ends.
async fn connect_and_run(task: &mut TaskState) -> Action {
    let Some(token) = task.session.token() else {
        return task.handle(Transition::CredentialRevoked);
    };
    let url = realtime_url(&task.config.url, &token);

    let connect = attempt_connect(&url, task.config.connect_timeout);
    tokio::pin!(connect);

    let connected = loop {
        tokio::select! {
            result = &mut connect => break result,
            _ = task.cmd_rx.recv() => {
                return task.handle(Transition::Teardown);
            }
            event = task.session_rx.recv(), if task.session_open => {
                if let Some(transition) = task.session_transition(event) {
                    return task.handle(transition);
                }
            }
        }
    };

    let (sink, stream) = match connected {
        Ok(parts) => parts,
        Err(e) => {
            tracing::error!("Realtime {}", e);
            task.emit(RealtimeEvent::Disconnected(e));
            return task.handle(Transition::Lost);
        }
    };

    task.handle(Transition::Opened);
    tracing::info!("Realtime connection open");
    task.emit(RealtimeEvent::Connected);

    let transition = run_connected(task, sink, stream).await;
    task.handle(transition)
}

/// The connected loop. Runs until the connection breaks or is torn down.
async fn run_connected(task: &mut TaskState, mut sink: WsSink, mut stream: WsSource) -> Transition {
    loop {
        tokio::select! {
            // ── a) Incoming frame ────────────────────────────────────────
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let text_str: &str = text.as_ref();
                        task.dispatch(text_str);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(frame))) => {
                        let (code, reason) = extract_close(frame.as_ref());
                        tracing::info!("Realtime connection closed by server: {} {}", code, reason);
                        task.emit(RealtimeEvent::Disconnected(RealtimeError::Closed {
                            code: Some(code),
                            reason,
                        }));
                        return Transition::Lost;
                    }
                    Some(Ok(_)) => {} // Binary, Frame
                    Some(Err(e)) => {
                        let reason = e.to_string();
                        tracing::error!("Realtime connection error: {}", reason);
                        task.emit(RealtimeEvent::Disconnected(RealtimeError::Closed {
                            code: None,
                            reason,
                        }));
                        return Transition::Lost;
                    }
                    None => {
                        task.emit(RealtimeEvent::Disconnected(RealtimeError::Closed {
                            code: None,
                            reason: "Stream ended".into(),
                        }));
                        return Transition::Lost;
                    }
                }
            }

            // ── b) Teardown from the public API ──────────────────────────
            _ = task.cmd_rx.recv() => {
                close_gracefully(&mut sink, "Client shutdown").await;
                return Transition::Teardown;
            }

            // ── c) Session credential changes ────────────────────────────
            event = task.session_rx.recv(), if task.session_open => {
                if let Some(transition) = task.session_transition(event) {
                    close_gracefully(&mut sink, "Session ended").await;
                    return transition;
                }
            }
        }
    }
}

/// Wait out a reconnect delay, unless torn down first.
async fn backoff(task: &mut TaskState, attempt: u32, delay: Duration) -> Action {
    tracing::info!(
        "Realtime reconnect attempt {}/{} in {}ms",
        attempt,
        task.lifecycle.policy().max_attempts,
        delay.as_millis()
    );
    task.emit(RealtimeEvent::Reconnecting { attempt, delay });

    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            () = &mut sleep => {
                let credential = task.session.token().is_some();
                return task.handle(Transition::BackoffElapsed { credential });
            }
            _ = task.cmd_rx.recv() => {
                return task.handle(Transition::Teardown);
            }
            event = task.session_rx.recv(), if task.session_open => {
                if let Some(transition) = task.session_transition(event) {
                    return task.handle(transition);
                }
            }
        }
    }
}

fn finish(task: &TaskState, reason: StopReason) {
    task.publish_state();
    match reason {
        StopReason::AttemptsExhausted => {
            let attempts = task.lifecycle.policy().max_attempts;
            tracing::warn!(
                "Realtime reconnect gave up after {} attempts; live updates unavailable",
                attempts
            );
            task.emit(RealtimeEvent::GaveUp { attempts });
        }
        StopReason::NoCredential => {
            tracing::info!("Realtime connection stopped: no session credential");
        }
        StopReason::TornDown => {
            tracing::info!("Realtime connection torn down");
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Attempt to establish a WebSocket connection within `timeout`.
async fn attempt_connect(
    url: &str,
    timeout: Duration,
) -> Result<(WsSink, WsSource), RealtimeError> {
    let (ws_stream, _) = tokio::time::timeout(timeout, connect_async(url))
        .await
        .map_err(|_| RealtimeError::ConnectionFailed("timeout".into()))?
        .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

    Ok(ws_stream.split())
}

async fn close_gracefully(sink: &mut WsSink, reason: &str) {
    let _ = sink
        .send(Message::Close(Some(CloseFrame {
            code: CloseCode::Normal,
            reason: reason.to_string().into(),
        })))
        .await;
}

/// Extract close code and reason from an optional CloseFrame.
fn extract_close(frame: Option<&CloseFrame>) -> (u16, String) {
    match frame {
        Some(f) => (f.code.into(), f.reason.to_string()),
        None => (1006, "No close frame".into()),
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
