//! `PlaydeckServer` builder and host loop.
//!
//! This ties the layers together: WebSocket transport → `Connection`
//! (handshake) → `Roster` → `ControlSurface`.
//!
//! # Threading model
//!
//! The core types are single-threaded, so the server keeps all of them on
//! the task that calls [`PlaydeckServer::run`]. Socket I/O happens on
//! helper tasks that only move bytes:
//!
//! ```text
//!  upgrade task ─Accepted──┐
//!  reader task ──Message───┼──→ host loop (Roster, Connections, ControlSurface)
//!  reader task ──Closed────┘          │
//!                                     └──PortCommand──→ writer task ──→ socket
//! ```
//!
//! Each host event is handled to completion before the next one is read,
//! so event handlers never race each other.

use std::cell::RefCell;
use std::collections::HashMap;
use std::future::Future;
use std::ops::ControlFlow;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use playdeck_protocol::{Codec, InboundMessage, JsonCodec};
use playdeck_roster::Roster;
use playdeck_session::{Connection, ProtocolViolation};
use playdeck_transport::{
    Connection as _, ConnectionId, Handshake, Transport, WebSocketConnection,
    WebSocketHandshake, WebSocketTransport,
};
use tokio::sync::{mpsc, oneshot};

use crate::port::{ChannelPort, PortCommand};
use crate::{ControlListener, ControlSurface, PlaydeckError};

/// Address used when none is configured.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// How long a peer gets to answer our close frame before the socket is
/// dropped anyway.
pub const DEFAULT_CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Pause after a failed accept, so a persistent error (e.g. out of file
/// descriptors) doesn't spin.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the WebSocket listener binds to. Port `0` picks a free one.
    pub bind_addr: String,
    /// Grace period for the close handshake on server-side disconnects.
    pub close_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            close_timeout: DEFAULT_CLOSE_TIMEOUT,
        }
    }
}

/// Builder for configuring and starting a Playdeck server.
///
/// # Example
///
/// ```rust,ignore
/// use playdeck::prelude::*;
///
/// let server = PlaydeckServer::builder()
///     .bind("0.0.0.0:8080")
///     .build(LoggingListener)
///     .await?;
/// server.run().await
/// ```
pub struct PlaydeckServerBuilder {
    config: ServerConfig,
}

impl PlaydeckServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Sets how long a closing peer may take to answer our close frame.
    pub fn close_timeout(mut self, timeout: Duration) -> Self {
        self.config.close_timeout = timeout;
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds the transport and creates the roster and control surface.
    ///
    /// `listener` is started by the control surface when the first player
    /// completes its handshake.
    pub async fn build(
        self,
        listener: impl ControlListener + 'static,
    ) -> Result<PlaydeckServer, PlaydeckError> {
        let transport = WebSocketTransport::bind(&self.config.bind_addr).await?;
        let roster = Roster::new();
        let surface = ControlSurface::new(&roster, listener);

        Ok(PlaydeckServer {
            transport,
            roster,
            surface,
            codec: JsonCodec,
            close_timeout: self.config.close_timeout,
        })
    }
}

impl Default for PlaydeckServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound Playdeck server.
///
/// Subscribe to [`roster()`](Self::roster) events before calling
/// [`run()`](Self::run) to react to players coming and going.
pub struct PlaydeckServer {
    transport: WebSocketTransport,
    roster: Rc<Roster>,
    surface: Rc<ControlSurface>,
    codec: JsonCodec,
    close_timeout: Duration,
}

/// Something that happened on a socket task, delivered to the host loop.
enum HostEvent {
    Accepted(WebSocketConnection),
    Message { id: ConnectionId, data: Vec<u8> },
    Closed { id: ConnectionId },
}

/// Connections the host loop can still route frames to.
type LiveConnections = Rc<RefCell<HashMap<ConnectionId, Rc<Connection>>>>;

impl PlaydeckServer {
    /// Creates a new builder.
    pub fn builder() -> PlaydeckServerBuilder {
        PlaydeckServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// The live player roster.
    pub fn roster(&self) -> &Rc<Roster> {
        &self.roster
    }

    /// The control surface watching the roster.
    pub fn control_surface(&self) -> &Rc<ControlSurface> {
        &self.surface
    }

    /// Runs the host loop until the process is terminated.
    pub async fn run(self) -> Result<(), PlaydeckError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the host loop until `shutdown` completes, then stops listening
    /// and disconnects every remaining connection.
    ///
    /// The returned future is not `Send`: await it directly, or spawn it
    /// on a [`tokio::task::LocalSet`].
    pub async fn run_until(self, shutdown: impl Future<Output = ()>) -> Result<(), PlaydeckError> {
        let PlaydeckServer {
            transport,
            roster,
            surface: _surface,
            codec,
            close_timeout,
        } = self;

        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let accept_task = tokio::spawn(accept_loop(transport, events_tx.clone()));

        let live: LiveConnections = Rc::default();
        tracing::info!("Playdeck server running");

        tokio::pin!(shutdown);
        loop {
            let event = tokio::select! {
                _ = &mut shutdown => break,
                event = events_rx.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            match event {
                HostEvent::Accepted(socket) => {
                    let connection = attach_socket(socket, codec, close_timeout, &events_tx);
                    track(&live, &connection);
                    roster.add_connection(connection);
                }
                HostEvent::Message { id, data } => {
                    let connection = live.borrow().get(&id).cloned();
                    let Some(connection) = connection else {
                        tracing::trace!(conn_id = %id, "dropping frame for closed connection");
                        continue;
                    };
                    match codec.decode::<InboundMessage>(&data) {
                        Ok(message) => connection.handle_message(message),
                        Err(e) => connection.reject(ProtocolViolation::Malformed(e.to_string())),
                    }
                }
                HostEvent::Closed { id } => {
                    let connection = live.borrow_mut().remove(&id);
                    if let Some(connection) = connection {
                        connection.handle_disconnect();
                    }
                }
            }
        }

        // Dropping the accept task drops the listener.
        accept_task.abort();
        let _ = accept_task.await;

        let remaining: Vec<Rc<Connection>> = live.borrow_mut().drain().map(|(_, c)| c).collect();
        tracing::info!(connections = remaining.len(), "Playdeck server shutting down");
        for connection in remaining {
            connection.disconnect();
        }
        Ok(())
    }
}

/// Registers `connection` with the host loop. It is dropped from `live`
/// as soon as it disconnects, whoever caused that.
fn track(live: &LiveConnections, connection: &Rc<Connection>) {
    live.borrow_mut().insert(connection.id(), Rc::clone(connection));

    let weak = Rc::downgrade(live);
    connection.on_disconnected().subscribe_fn(move |id: &ConnectionId| {
        if let Some(live) = weak.upgrade() {
            live.borrow_mut().remove(id);
        }
        ControlFlow::Continue(())
    });
}

/// Starts the reader and writer tasks for a fresh socket and wraps it in a
/// [`Connection`].
fn attach_socket(
    socket: WebSocketConnection,
    codec: JsonCodec,
    close_timeout: Duration,
    events: &mpsc::UnboundedSender<HostEvent>,
) -> Rc<Connection> {
    let id = socket.id();
    let peer = socket.peer_addr().to_string();
    let socket = Arc::new(socket);
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
    let (closing_tx, closing_rx) = oneshot::channel();

    tokio::spawn(read_loop(
        Arc::clone(&socket),
        closing_rx,
        close_timeout,
        events.clone(),
    ));
    tokio::spawn(write_loop(socket, outbound_rx, closing_tx, close_timeout));

    Connection::new(id, ChannelPort::new(peer, codec, outbound_tx))
}

async fn accept_loop(mut transport: WebSocketTransport, events: mpsc::UnboundedSender<HostEvent>) {
    while !events.is_closed() {
        let handshake = accept_next(&mut transport).await;
        tokio::spawn(upgrade(handshake, events.clone()));
    }
}

/// Waits for the next peer, backing off after each failed accept.
async fn accept_next<T: Transport>(transport: &mut T) -> T::Handshake {
    loop {
        match transport.accept().await {
            Ok(handshake) => return handshake,
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

/// Completes one WebSocket upgrade off the accept loop.
async fn upgrade(handshake: WebSocketHandshake, events: mpsc::UnboundedSender<HostEvent>) {
    let peer = handshake.peer_addr();
    match handshake.complete().await {
        Ok(socket) => {
            let _ = events.send(HostEvent::Accepted(socket));
        }
        Err(e) => {
            tracing::warn!(%peer, error = %e, "WebSocket handshake failed");
        }
    }
}

/// Forwards inbound frames until the peer goes away or the writer signals
/// that we closed. Always ends with a `Closed` event.
async fn read_loop(
    socket: Arc<WebSocketConnection>,
    mut closing: oneshot::Receiver<()>,
    close_timeout: Duration,
    events: mpsc::UnboundedSender<HostEvent>,
) {
    let id = socket.id();
    loop {
        let received = tokio::select! {
            received = socket.recv() => received,
            _ = &mut closing => {
                // Let the peer answer the close frame, but not forever.
                let drained = tokio::time::timeout(close_timeout, async {
                    while let Ok(Some(_)) = socket.recv().await {}
                })
                .await;
                if drained.is_err() {
                    tracing::debug!(conn_id = %id, "peer did not answer close, dropping socket");
                }
                break;
            }
        };
        match received {
            Ok(Some(data)) => {
                if events.send(HostEvent::Message { id, data }).is_err() {
                    return;
                }
            }
            Ok(None) => {
                tracing::debug!(conn_id = %id, "socket closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(conn_id = %id, error = %e, "recv error");
                break;
            }
        }
    }
    let _ = events.send(HostEvent::Closed { id });
}

/// Writes queued frames. Dropping `closing` on exit tells the reader to
/// stop as well.
async fn write_loop(
    socket: Arc<WebSocketConnection>,
    mut outbound: mpsc::UnboundedReceiver<PortCommand>,
    closing: oneshot::Sender<()>,
    close_timeout: Duration,
) {
    let id = socket.id();
    while let Some(command) = outbound.recv().await {
        match command {
            PortCommand::Send(frame) => {
                if let Err(e) = socket.send(&frame).await {
                    tracing::debug!(conn_id = %id, error = %e, "send failed");
                    break;
                }
            }
            PortCommand::Close => {
                match tokio::time::timeout(close_timeout, socket.close()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::debug!(conn_id = %id, error = %e, "close failed"),
                    Err(_) => tracing::debug!(conn_id = %id, "close frame not flushed in time"),
                }
                break;
            }
        }
    }
    let _ = closing.send(());
}
