//! Client handle and WebSocket event loop.
//!
//! [`Client`] is a cheap, cloneable handle. Every method posts a command to
//! a single event loop task that owns the [`Engine`] and the WebSocket, so
//! nothing ever blocks on the connection and every outbound message goes
//! through the engine's scheduler.
//!
//! # Event Loop
//!
//! The spawned task selects over:
//!
//! - Commands from client handles
//! - Inbound WebSocket messages (while a socket exists)
//! - The engine's next timer deadline
//!
//! After each wake-up it performs the engine's [`Action`]s and publishes
//! state changes and [`Notification`]s.

// ============================================================================
// Imports
// ============================================================================

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{sleep_until, timeout};
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};
use url::Url;

use crate::engine::{
    Action, CloseInfo, ConnectionState, Engine, EngineOptions, Hook, HookTarget, Listener,
    Notification, PushSynchronizer, TokioClock,
};
use crate::error::{Error, Result};
use crate::identifiers::{HookId, IdSource, Key, ListenerId, SubscriptionId};
use crate::protocol::{PushRates, Request};

// ============================================================================
// Constants
// ============================================================================

/// Buffered notifications per subscriber before the oldest are dropped.
const NOTIFICATION_CAPACITY: usize = 64;

/// Close code sent on an intentional disconnect.
const NORMAL_CLOSE: u16 = 1000;

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Deferred engine operation.
type EngineTask = Box<dyn FnOnce(&mut Engine) + Send>;

// ============================================================================
// ClientCommand
// ============================================================================

/// Internal commands for the event loop.
enum ClientCommand {
    /// Send a request through the scheduler.
    Send(Request),
    /// Run an operation against the engine.
    Run(EngineTask),
    /// Open the connection.
    Open,
    /// Close the connection without reconnecting.
    Close,
    /// Close and stop the event loop.
    Shutdown,
}

// ============================================================================
// Client
// ============================================================================

/// Handle to a VPCA connection.
///
/// Methods return immediately; registration handles are allocated up front
/// and the registration itself is applied by the event loop in call order.
///
/// # Errors
///
/// Every method that posts a command returns [`Error::ConnectionClosed`]
/// once the event loop has shut down.
#[derive(Clone)]
pub struct Client {
    /// Channel for sending commands to the event loop.
    command_tx: mpsc::UnboundedSender<ClientCommand>,
    /// Handle allocator shared with the engine.
    ids: Arc<IdSource>,
    /// Last published connection state.
    state: Arc<RwLock<ConnectionState>>,
    /// Notification fan-out.
    notifications: broadcast::Sender<Notification>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Spawns the event loop for `endpoint`.
    ///
    /// The connection is not opened until [`open`](Self::open) is called.
    pub(crate) fn spawn(endpoint: Url, options: EngineOptions) -> Self {
        let ids = Arc::new(IdSource::new());
        let engine = Engine::new(options)
            .with_clock(Arc::new(TokioClock))
            .with_ids(Arc::clone(&ids));

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let state = Arc::new(RwLock::new(ConnectionState::Closed));
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);

        let event_loop = EventLoop {
            endpoint,
            engine,
            socket: None,
            state: Arc::clone(&state),
            notifications: notifications.clone(),
        };
        tokio::spawn(event_loop.run(command_rx));

        Self {
            command_tx,
            ids,
            state,
            notifications,
        }
    }

    fn post(&self, command: ClientCommand) -> Result<()> {
        self.command_tx
            .send(command)
            .map_err(|_| Error::ConnectionClosed)
    }

    fn run(&self, task: impl FnOnce(&mut Engine) + Send + 'static) -> Result<()> {
        self.post(ClientCommand::Run(Box::new(task)))
    }
}

// ============================================================================
// Client - Connection
// ============================================================================

impl Client {
    /// Returns the last published connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Subscribes to notifications.
    #[must_use]
    pub fn notifications(&self) -> broadcast::Receiver<Notification> {
        self.notifications.subscribe()
    }

    /// Opens the connection, reconnecting automatically on unintentional
    /// closes.
    pub fn open(&self) -> Result<()> {
        self.post(ClientCommand::Open)
    }

    /// Closes the connection without reconnecting.
    pub fn close(&self) -> Result<()> {
        self.post(ClientCommand::Close)
    }

    /// Closes the connection and stops the event loop.
    ///
    /// Every handle fails with [`Error::ConnectionClosed`] afterwards.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(ClientCommand::Shutdown);
    }

    /// Waits until the connection is open.
    ///
    /// # Errors
    ///
    /// - [`Error::Connection`] if `wait` elapses or reconnects are exhausted
    /// - [`Error::ConnectionClosed`] if the event loop stopped
    pub async fn wait_open(&self, wait: Duration) -> Result<()> {
        let mut notifications = self.notifications();
        if self.state() == ConnectionState::Open {
            return Ok(());
        }

        let opened = async {
            loop {
                match notifications.recv().await {
                    Ok(Notification::ConnectionOpened) => return Ok(()),
                    Ok(Notification::ReconnectExhausted { attempts }) => {
                        return Err(Error::connection(format!(
                            "gave up after {attempts} reconnect attempts"
                        )));
                    }
                    Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        if self.state() == ConnectionState::Open {
                            return Ok(());
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(Error::ConnectionClosed);
                    }
                }
            }
        };

        timeout(wait, opened).await.map_err(|_| {
            Error::connection(format!("not open after {}ms", wait.as_millis()))
        })?
    }
}

// ============================================================================
// Client - Outbound
// ============================================================================

impl Client {
    /// Sends a request through the scheduler.
    pub fn send(&self, request: Request) -> Result<()> {
        self.post(ClientCommand::Send(request))
    }

    /// Parses raw JSON and sends it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] or [`Error::Protocol`] if `text` is not a
    /// JSON object.
    pub fn send_text(&self, text: &str) -> Result<()> {
        self.send(Request::parse(text)?)
    }

    /// Re-fetches a parameter value.
    pub fn refresh(&self, key: impl Into<Key>) -> Result<()> {
        self.send(Request::get_parameter(&key.into()))
    }

    /// Fetches all values of a group.
    pub fn request_group(&self, group: impl Into<Key>) -> Result<()> {
        self.send(Request::get_group(&group.into()))
    }

    /// Writes a parameter value.
    pub fn set_parameter(
        &self,
        key: impl Into<Key>,
        units: u32,
        value: impl std::fmt::Display,
    ) -> Result<()> {
        self.send(Request::set_parameter(&key.into(), units, value))
    }

    /// Switches the server language.
    pub fn set_language(&self, language: &str) -> Result<()> {
        self.send(Request::set_language(language))
    }
}

// ============================================================================
// Client - Listeners
// ============================================================================

impl Client {
    /// Registers a persistent listener for parameter values.
    pub fn register_listener(&self, key: impl Into<Key>, listener: Listener) -> Result<ListenerId> {
        let id = self.ids.listener();
        let key = key.into();
        self.run(move |engine| engine.attach_listener(id, key, listener))?;
        Ok(id)
    }

    /// Removes parameter listeners registered under `key` with `listener`.
    pub fn deregister_listener(&self, key: impl Into<Key>, listener: Listener) -> Result<()> {
        let key = key.into();
        self.run(move |engine| {
            engine.deregister_listener(&key, &listener);
        })
    }

    /// Registers a persistent listener for group values.
    pub fn register_group_listener(
        &self,
        group: impl Into<Key>,
        listener: Listener,
    ) -> Result<ListenerId> {
        let id = self.ids.listener();
        let group = group.into();
        self.run(move |engine| engine.attach_group_listener(id, group, listener))?;
        Ok(id)
    }

    /// Removes group listeners registered under `group` with `listener`.
    pub fn deregister_group_listener(&self, group: impl Into<Key>, listener: Listener) -> Result<()> {
        let group = group.into();
        self.run(move |engine| {
            engine.deregister_group_listener(&group, &listener);
        })
    }

    /// Removes a listener of any kind by handle.
    pub fn remove_listener(&self, id: ListenerId) -> Result<()> {
        self.run(move |engine| {
            engine.remove_listener(id);
        })
    }

    /// Fetches parameter metadata; `listener` fires once.
    pub fn request_metadata(&self, key: impl Into<Key>, listener: Listener) -> Result<ListenerId> {
        let id = self.ids.listener();
        let key = key.into();
        self.run(move |engine| engine.attach_metadata_request(id, key, listener))?;
        Ok(id)
    }

    /// Fetches group metadata; `listener` fires once.
    pub fn request_group_metadata(
        &self,
        group: impl Into<Key>,
        listener: Listener,
    ) -> Result<ListenerId> {
        let id = self.ids.listener();
        let group = group.into();
        self.run(move |engine| engine.attach_group_metadata_request(id, group, listener))?;
        Ok(id)
    }

    /// Asks for the available languages; `listener` fires once.
    pub fn request_languages(&self, listener: Listener) -> Result<ListenerId> {
        let id = self.ids.listener();
        self.run(move |engine| engine.attach_language_request(id, listener))?;
        Ok(id)
    }

    /// Asks the server to persist its log; `listener`, if given, fires once.
    pub fn flush_log(&self, listener: Option<Listener>) -> Result<Option<ListenerId>> {
        let waiter = listener.map(|listener| (self.ids.listener(), listener));
        let id = waiter.as_ref().map(|(id, _)| *id);
        self.run(move |engine| engine.attach_log_flush(waiter))?;
        Ok(id)
    }
}

// ============================================================================
// Client - Push
// ============================================================================

impl Client {
    /// Starts a parameter push stream.
    ///
    /// See [`Engine::request_push`].
    pub fn request_push(
        &self,
        key: impl Into<Key>,
        rates: PushRates,
        listener: Listener,
    ) -> Result<SubscriptionId> {
        let id = self.ids.subscription();
        let key = key.into();
        self.run(move |engine| engine.attach_push(id, key, rates, listener))?;
        Ok(id)
    }

    /// Starts a group push stream.
    pub fn request_group_push(&self, group: impl Into<Key>, rates: PushRates) -> Result<()> {
        self.send(Request::subscribe_group(&group.into(), rates))
    }

    /// Drops push subscriptions and parameter listeners for `key` with
    /// `listener`.
    pub fn unsubscribe(&self, key: impl Into<Key>, listener: Listener) -> Result<()> {
        let key = key.into();
        self.run(move |engine| {
            engine.unsubscribe(&key, &listener);
        })
    }

    /// Drops one push subscription by handle.
    pub fn cancel_push(&self, id: SubscriptionId) -> Result<()> {
        self.run(move |engine| {
            engine.cancel_push(id);
        })
    }

    /// Cancels every push stream on the server.
    pub fn clear_push(&self) -> Result<()> {
        self.send(Request::clear_subscriptions())
    }

    /// Re-registers every tracked push stream, now or after the debounce.
    pub fn refresh_push_requests(&self, immediate: bool) -> Result<()> {
        self.run(move |engine| engine.refresh_push_requests(immediate))
    }

    /// Registers a callback run after every push refresh.
    pub fn register_push_synchronizer(&self, synchronizer: PushSynchronizer) -> Result<ListenerId> {
        let id = self.ids.listener();
        self.run(move |engine| engine.attach_push_synchronizer(id, synchronizer))?;
        Ok(id)
    }
}

// ============================================================================
// Client - Hooks
// ============================================================================

impl Client {
    /// Attaches a hook.
    pub fn add_hook(&self, target: HookTarget, hook: Hook) -> Result<HookId> {
        let id = self.ids.hook();
        self.run(move |engine| engine.attach_hook(id, target, hook))?;
        Ok(id)
    }

    /// Attaches a hook by name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownHook`] for an unknown name; nothing is
    /// attached.
    pub fn add_named_hook(&self, name: &str, hook: Hook) -> Result<HookId> {
        let target = name.parse::<HookTarget>().inspect_err(|_| {
            warn!(name, "Rejected hook for unknown event");
        })?;
        self.add_hook(target, hook)
    }

    /// Detaches a hook.
    pub fn remove_hook(&self, id: HookId) -> Result<()> {
        self.run(move |engine| {
            engine.remove_hook(id);
        })
    }
}

// ============================================================================
// EventLoop
// ============================================================================

/// State owned by the event loop task.
struct EventLoop {
    endpoint: Url,
    engine: Engine,
    socket: Option<WsStream>,
    state: Arc<RwLock<ConnectionState>>,
    notifications: broadcast::Sender<Notification>,
}

impl EventLoop {
    async fn run(mut self, mut command_rx: mpsc::UnboundedReceiver<ClientCommand>) {
        debug!(endpoint = %self.endpoint, "Event loop started");

        loop {
            let deadline = self.engine.next_deadline();
            let has_socket = self.socket.is_some();

            tokio::select! {
                command = command_rx.recv() => {
                    match command {
                        Some(ClientCommand::Send(request)) => self.engine.send(request),
                        Some(ClientCommand::Run(task)) => task(&mut self.engine),
                        Some(ClientCommand::Open) => self.engine.open(),
                        Some(ClientCommand::Close) => self.engine.close(),
                        Some(ClientCommand::Shutdown) | None => {
                            debug!("Shutdown requested");
                            self.engine.close();
                            self.perform_actions().await;
                            self.publish();
                            break;
                        }
                    }
                }

                message = next_message(&mut self.socket), if has_socket => {
                    self.handle_inbound(message);
                }

                () = wait_until(deadline) => {
                    self.engine.handle_timers();
                }
            }

            self.perform_actions().await;
            self.publish();
        }

        debug!("Event loop terminated");
    }

    /// Performs engine actions until none remain.
    async fn perform_actions(&mut self) {
        loop {
            let actions = self.engine.take_actions();
            if actions.is_empty() {
                break;
            }
            for action in actions {
                self.perform(action).await;
            }
        }
    }

    async fn perform(&mut self, action: Action) {
        match action {
            Action::Connect => self.connect().await,
            Action::Transmit(text) => self.transmit(text).await,
            Action::Disconnect => self.disconnect().await,
        }
    }

    async fn connect(&mut self) {
        debug!(endpoint = %self.endpoint, "Connecting");
        match dial(&self.endpoint).await {
            Ok(socket) => {
                self.socket = Some(socket);
                self.engine.transport_opened();
            }
            Err(e) => self.fail(&e),
        }
    }

    async fn transmit(&mut self, text: String) {
        let Some(socket) = self.socket.as_mut() else {
            warn!("Transmit with no socket, dropping");
            return;
        };

        trace!(len = text.len(), "Sending frame");
        if let Err(e) = send_frame(socket, text).await {
            self.fail(&e);
        }
    }

    async fn disconnect(&mut self) {
        if let Some(mut socket) = self.socket.take() {
            if let Err(e) = socket.close(None).await {
                debug!(error = %e, "Close handshake failed");
            }
            self.engine
                .transport_closed(CloseInfo::new(Some(NORMAL_CLOSE), "client closed"));
        } else {
            self.engine.transport_closed(CloseInfo::default());
        }
    }

    fn handle_inbound(&mut self, message: Option<std::result::Result<WsMessage, WsError>>) {
        match message {
            Some(Ok(WsMessage::Text(text))) => self.engine.handle_data(&text),

            Some(Ok(WsMessage::Binary(bytes))) => match std::str::from_utf8(&bytes) {
                Ok(text) => self.engine.handle_data(text),
                Err(e) => warn!(error = %e, "Dropping non-UTF-8 binary message"),
            },

            Some(Ok(WsMessage::Close(frame))) => {
                let info = frame.map_or_else(CloseInfo::default, |frame| {
                    CloseInfo::new(Some(u16::from(frame.code)), frame.reason.as_str())
                });
                info!(code = ?info.code, "WebSocket closed by remote");
                self.socket = None;
                self.engine.transport_closed(info);
            }

            Some(Err(e)) => self.fail(&Error::from(e)),

            None => {
                debug!("WebSocket stream ended");
                self.socket = None;
                self.engine.transport_closed(CloseInfo::default());
            }

            // Ping, Pong, raw frames
            Some(Ok(_)) => {}
        }
    }

    /// Drops the socket and reports the failure to the engine.
    fn fail(&mut self, e: &Error) {
        debug!(error = %e, recoverable = e.is_recoverable(), "Transport failed");
        let reason = e.to_string();
        self.socket = None;
        self.engine.transport_error(&reason);
        self.engine.transport_closed(CloseInfo::new(None, reason));
    }

    /// Publishes the state and pending notifications.
    fn publish(&mut self) {
        *self.state.write() = self.engine.state();
        for notification in self.engine.take_notifications() {
            // No receivers is fine.
            let _ = self.notifications.send(notification);
        }
    }
}

async fn dial(endpoint: &Url) -> Result<WsStream> {
    let (socket, _response) = connect_async(endpoint.as_str()).await?;
    Ok(socket)
}

async fn send_frame(socket: &mut WsStream, text: String) -> Result<()> {
    socket.send(WsMessage::Text(text.into())).await?;
    Ok(())
}

async fn next_message(socket: &mut Option<WsStream>) -> Option<std::result::Result<WsMessage, WsError>> {
    match socket {
        Some(socket) => socket.next().await,
        None => pending().await,
    }
}

async fn wait_until(deadline: Option<std::time::Instant>) {
    match deadline {
        Some(deadline) => sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================
