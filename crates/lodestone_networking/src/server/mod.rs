//! # TCP Session Server
//!
//! The network worker half of spec.md §5's two-worker model: accepts
//! connections, frames/decodes messages, and hands decoded actions to the
//! simulation worker (owned elsewhere, in `lodestone_server`) through an
//! unbounded inbound channel. All mutation of world state happens on the
//! *other* worker — this module never touches a `Simulation` or
//! `ChunkStore` directly, only `Session`/`SessionTable` bookkeeping and the
//! socket itself.
//!
//! Adapted from `oroboros_networking/src/server/mod.rs`'s event-queue,
//! tick-and-broadcast shape: that version read raw UDP packets off a
//! crossbeam channel filled by a separate I/O thread and dispatched them
//! through a `Packet` enum; here tokio's per-connection task *is* the I/O
//! thread, and the "decode" step is the length-prefixed MessagePack codec
//! in `crate::codec` rather than a hand-rolled binary packet format.

pub mod connection;
pub mod tick;

pub use connection::{ConnectionId, ConnectionIdAllocator};
pub use tick::{TickLoop, TickStats};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use lodestone_shared::{constants, Message, PlayerId};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Notify};

use crate::codec::{read_frame, write_frame, Frame};
use crate::session::{Session, SessionTable};

/// Where to bind the listening socket (spec.md §6).
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Bind address, e.g. `"0.0.0.0"`.
    pub bind_address: String,
    /// TCP port.
    pub port: u16,
    /// Idle time with no decoded frame before a session is torn down.
    pub idle_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: constants::DEFAULT_BIND_ADDRESS.to_string(),
            port: constants::DEFAULT_PORT,
            idle_timeout: Duration::from_secs(constants::IDLE_TIMEOUT_SECS),
        }
    }
}

/// One decoded event handed from a connection task to whoever drains the
/// inbound channel at the start of a tick (spec.md §5).
#[derive(Debug)]
pub enum Inbound {
    /// A session sent a (post-auth-gate) message.
    Message(ConnectionId, Message),
    /// A session's socket closed, errored, or idled out. Carries the
    /// player id it had authenticated as, if any, so the consumer can
    /// persist and broadcast `PLAYER_LEAVE` without a second table lookup
    /// (the session is already gone from the table by the time this
    /// arrives).
    Disconnected(ConnectionId, Option<PlayerId>),
}

/// The TCP listener and the shared session table it feeds.
pub struct NetworkServer {
    listener: TcpListener,
    sessions: Arc<SessionTable>,
    conn_ids: Arc<ConnectionIdAllocator>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    idle_timeout: Duration,
    shutdown: Arc<Notify>,
}

impl NetworkServer {
    /// Binds the listening socket and returns the server plus the receiving
    /// end of its inbound-event channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the address can't be parsed or the socket can't
    /// be bound (spec.md §6: a bind failure is a nonzero exit code).
    pub async fn bind(config: &ServerConfig) -> std::io::Result<(Self, mpsc::UnboundedReceiver<Inbound>)> {
        let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
            .parse()
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?;
        let listener = TcpListener::bind(addr).await?;
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let server = Self {
            listener,
            sessions: Arc::new(SessionTable::new()),
            conn_ids: Arc::new(ConnectionIdAllocator::default()),
            inbound_tx,
            idle_timeout: config.idle_timeout,
            shutdown: Arc::new(Notify::new()),
        };
        Ok((server, inbound_rx))
    }

    /// A handle to the session table, for the broadcast router and the
    /// AUTH handshake (both live in `lodestone_server`, which drains
    /// `Inbound` and needs to send replies).
    #[must_use]
    pub fn sessions(&self) -> Arc<SessionTable> {
        self.sessions.clone()
    }

    /// A handle that can be `notify_one()`d to stop accepting new
    /// connections (spec.md §5: "On shutdown: stop accepting").
    #[must_use]
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Runs the accept loop until the shutdown handle is notified.
    ///
    /// Existing connections keep running their own read/write tasks after
    /// the accept loop stops; they close along with the process once
    /// `lodestone_server`'s shutdown flush finishes and `main` returns.
    pub async fn serve(self) {
        loop {
            tokio::select! {
                () = self.shutdown.notified() => {
                    tracing::info!("network server: no longer accepting new connections");
                    break;
                }
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let id = self.conn_ids.next();
                            tracing::info!(connection = id.get(), %addr, "accepted connection");
                            tokio::spawn(handle_connection(
                                stream,
                                addr,
                                id,
                                self.sessions.clone(),
                                self.inbound_tx.clone(),
                                self.idle_timeout,
                            ));
                        }
                        Err(err) => {
                            tracing::warn!(error = %err, "accept failed");
                        }
                    }
                }
            }
        }
    }
}

/// Drives one accepted socket: a writer task draining the session's
/// outbox, and a reader loop decoding frames and forwarding authenticated
/// traffic to `inbound_tx` (spec.md §4.3's "unauthenticated sessions may
/// only send AUTH" gate is enforced here, before the message ever reaches
/// the inbound queue).
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    id: ConnectionId,
    sessions: Arc<SessionTable>,
    inbound_tx: mpsc::UnboundedSender<Inbound>,
    idle_timeout: Duration,
) {
    if let Err(err) = stream.set_nodelay(true) {
        tracing::warn!(connection = id.get(), error = %err, "failed to set TCP_NODELAY");
    }
    let (mut reader, mut writer) = stream.into_split();
    let (outbox_tx, mut outbox_rx) = mpsc::unbounded_channel();
    sessions.insert(Session::new(id, addr, outbox_tx));

    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbox_rx.recv().await {
            if write_frame(&mut writer, &message).await.is_err() {
                break;
            }
        }
    });

    loop {
        match tokio::time::timeout(idle_timeout, read_frame(&mut reader)).await {
            Ok(Ok(Some(Frame::Message(message)))) => {
                let authenticated = sessions.with_session_mut(id, |s| s.is_authenticated()).unwrap_or(false);
                if !authenticated && !matches!(message, Message::Auth { .. }) {
                    tracing::debug!(connection = id.get(), "ignored message from unauthenticated session");
                    continue;
                }
                if inbound_tx.send(Inbound::Message(id, message)).is_err() {
                    break;
                }
            }
            Ok(Ok(Some(Frame::Malformed))) => {
                tracing::debug!(connection = id.get(), "dropped a malformed frame, resynchronizing");
            }
            Ok(Ok(None)) => {
                tracing::info!(connection = id.get(), "connection closed by peer");
                break;
            }
            Ok(Err(err)) => {
                tracing::info!(connection = id.get(), error = %err, "connection I/O error");
                break;
            }
            Err(_elapsed) => {
                tracing::info!(connection = id.get(), "connection idle timeout");
                break;
            }
        }
    }

    writer_task.abort();
    let player_id = sessions.remove(id);
    let _ = inbound_tx.send(Inbound::Disconnected(id, player_id));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bind_picks_an_ephemeral_port_and_accepts() {
        let config = ServerConfig { bind_address: "127.0.0.1".to_string(), port: 0, idle_timeout: Duration::from_secs(60) };
        let (server, mut inbound_rx) = NetworkServer::bind(&config).await.expect("bind on an ephemeral port");
        let local_addr = server.listener.local_addr().expect("bound address");
        let sessions = server.sessions();

        let serve_handle = tokio::spawn(server.serve());

        let mut client = TcpStream::connect(local_addr).await.expect("connect");
        write_frame(&mut client, &Message::Auth { name: "scout".to_string() }).await.expect("write auth");

        let event = inbound_rx.recv().await.expect("inbound event");
        match event {
            Inbound::Message(_, Message::Auth { name }) => assert_eq!(name, "scout"),
            other => panic!("unexpected inbound event: {other:?}"),
        }
        assert_eq!(sessions.len(), 1);

        serve_handle.abort();
    }

    #[tokio::test]
    async fn messages_before_auth_are_dropped_not_disconnected() {
        let config = ServerConfig { bind_address: "127.0.0.1".to_string(), port: 0, idle_timeout: Duration::from_secs(60) };
        let (server, mut inbound_rx) = NetworkServer::bind(&config).await.expect("bind");
        let local_addr = server.listener.local_addr().expect("bound address");
        let serve_handle = tokio::spawn(server.serve());

        let mut client = TcpStream::connect(local_addr).await.expect("connect");
        write_frame(&mut client, &Message::Sync { client_time: 1.0, server_time: None, tick: None }).await.expect("write sync");
        write_frame(&mut client, &Message::Auth { name: "late".to_string() }).await.expect("write auth");

        let event = inbound_rx.recv().await.expect("inbound event");
        assert!(matches!(event, Inbound::Message(_, Message::Auth { .. })), "the pre-auth SYNC should have been dropped silently");

        serve_handle.abort();
    }
}
