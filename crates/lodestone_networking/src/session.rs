//! Per-connection session state and the shared session table (spec.md §4.3,
//! §5 "shared-resource policy").
//!
//! A session's socket and read buffer live on its own connection task
//! (`server::handle_connection`); only the bookkeeping the broadcast router
//! and the authentication handshake need to see from the outside — the
//! subscribed-chunk set, the assigned player id, the outbound channel —
//! lives here, behind a short-critical-section lock as spec.md §5 requires.

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;

use lodestone_shared::{Message, PlayerId};
use lodestone_world::ChunkCoord;
use parking_lot::RwLock;
use tokio::sync::mpsc;

use crate::server::connection::ConnectionId;

/// Outbound channel into a session's write task. Send errors (the peer's
/// connection task has already torn down) are not the sender's problem —
/// the reader loop or idle-timeout check will notice and remove the
/// session shortly.
pub type Outbox = mpsc::UnboundedSender<Message>;

/// One connected client, authenticated or not.
pub struct Session {
    id: ConnectionId,
    addr: SocketAddr,
    outbox: Outbox,
    player_id: Option<PlayerId>,
    subscribed_chunks: HashSet<ChunkCoord>,
}

impl Session {
    /// Creates a freshly-accepted, unauthenticated session.
    #[must_use]
    pub fn new(id: ConnectionId, addr: SocketAddr, outbox: Outbox) -> Self {
        Self { id, addr, outbox, player_id: None, subscribed_chunks: HashSet::new() }
    }

    /// This session's connection id.
    #[must_use]
    pub const fn id(&self) -> ConnectionId {
        self.id
    }

    /// The peer's socket address.
    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Whether AUTH has completed. Spec.md §4.3: unauthenticated sessions
    /// may only send AUTH; everything else is silently ignored.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.player_id.is_some()
    }

    /// The assigned player id, once authenticated.
    #[must_use]
    pub const fn player_id(&self) -> Option<PlayerId> {
        self.player_id
    }

    /// Completes the AUTH handshake, assigning this session a player id.
    pub fn authenticate(&mut self, player_id: PlayerId) {
        self.player_id = Some(player_id);
    }

    /// The chunks this session is currently subscribed to.
    #[must_use]
    pub const fn subscribed_chunks(&self) -> &HashSet<ChunkCoord> {
        &self.subscribed_chunks
    }

    /// Replaces the subscription set, e.g. after a `PLAYER_MOVE`
    /// recomputes the player's area of interest. Returns the chunks newly
    /// in range (for `CHUNK_DATA`) via `router::newly_entered_chunks`
    /// against the previous set, which the caller should capture before
    /// calling this.
    pub fn set_subscribed_chunks(&mut self, chunks: HashSet<ChunkCoord>) {
        self.subscribed_chunks = chunks;
    }

    /// Queues a message for delivery to this session's socket.
    pub fn send(&self, message: Message) {
        let _ = self.outbox.send(message);
    }

    /// Hook for server-side movement validation. Spec.md §9 Open Question 5
    /// defers real validation to a future implementer; this server trusts
    /// client-reported positions, so the hook always accepts.
    #[allow(clippy::unused_self, clippy::missing_const_for_fn)]
    pub fn validate_move(&self, _x: f64, _y: f64) -> Result<(), MoveRejected> {
        Ok(())
    }
}

/// Reason a future [`Session::validate_move`] implementation could reject a
/// move. No variant exists yet — movement validation is out of scope today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveRejected {}

impl std::fmt::Display for MoveRejected {
    fn fmt(&self, _f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {}
    }
}

impl std::error::Error for MoveRejected {}

/// The set of all connected sessions, keyed by connection id, with a
/// secondary index from player id once authenticated.
///
/// Wrapped in a single `RwLock` rather than a concurrent map: spec.md §5
/// calls for "a short-critical-section lock when iterating sessions", and
/// the broadcast router's iteration-then-send pattern is exactly that —
/// one lock acquisition per broadcast, not one per session.
#[derive(Default)]
pub struct SessionTable {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    by_connection: HashMap<ConnectionId, Session>,
    by_player: HashMap<PlayerId, ConnectionId>,
}

impl SessionTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly-accepted connection.
    pub fn insert(&self, session: Session) {
        self.inner.write().by_connection.insert(session.id(), session);
    }

    /// Removes a connection on disconnect. Returns the player id it had
    /// authenticated as, if any, so the caller can persist and broadcast
    /// `PLAYER_LEAVE`.
    pub fn remove(&self, id: ConnectionId) -> Option<PlayerId> {
        let mut inner = self.inner.write();
        let session = inner.by_connection.remove(&id)?;
        if let Some(player_id) = session.player_id() {
            inner.by_player.remove(&player_id);
        }
        session.player_id()
    }

    /// Records the connection-to-player mapping after a successful AUTH.
    /// The session itself must already have been mutated via
    /// [`Self::with_session_mut`] to hold the same `player_id`.
    pub fn index_player(&self, id: ConnectionId, player_id: PlayerId) {
        self.inner.write().by_player.insert(player_id, id);
    }

    /// Runs `f` with mutable access to one session, if it's still present.
    pub fn with_session_mut<R>(&self, id: ConnectionId, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        self.inner.write().by_connection.get_mut(&id).map(f)
    }

    /// Sends `message` to one session by connection id, if present.
    pub fn send_to(&self, id: ConnectionId, message: Message) {
        if let Some(session) = self.inner.read().by_connection.get(&id) {
            session.send(message);
        }
    }

    /// Sends `message` to one session by player id, if connected.
    pub fn send_to_player(&self, player_id: PlayerId, message: Message) {
        let inner = self.inner.read();
        if let Some(id) = inner.by_player.get(&player_id) {
            if let Some(session) = inner.by_connection.get(id) {
                session.send(message);
            }
        }
    }

    /// Sends `message` to every session for which `predicate` returns true.
    /// `exclude` (if given) is skipped regardless of the predicate — used
    /// for "broadcast to peers sharing a chunk, excluding the mover"
    /// (spec.md §4.3).
    pub fn broadcast_if(&self, exclude: Option<ConnectionId>, predicate: impl Fn(&Session) -> bool, message: &Message) {
        let inner = self.inner.read();
        for session in inner.by_connection.values() {
            if Some(session.id()) == exclude {
                continue;
            }
            if predicate(session) {
                session.send(message.clone());
            }
        }
    }

    /// Number of currently connected sessions (authenticated or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().by_connection.len()
    }

    /// Whether no sessions are connected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every currently connected connection id. Idle-timeout teardown
    /// (spec.md §9 Open Question 4) doesn't consult this table at all —
    /// each connection task enforces its own timeout via
    /// `tokio::time::timeout` around its read loop — but this is useful
    /// for diagnostics and tests that want to assert on who's connected.
    #[must_use]
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.inner.read().by_connection.keys().copied().collect()
    }

    /// Every currently authenticated player id, for AUTH's `PLAYER_JOIN`
    /// backfill (spec.md §4.3).
    #[must_use]
    pub fn authenticated_player_ids(&self) -> Vec<PlayerId> {
        self.inner.read().by_player.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::connection::ConnectionIdAllocator;

    fn session(alloc: &ConnectionIdAllocator) -> (Session, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = alloc.next();
        (Session::new(id, "127.0.0.1:9000".parse().unwrap(), tx), rx)
    }

    #[test]
    fn fresh_session_is_unauthenticated() {
        let alloc = ConnectionIdAllocator::default();
        let (session, _rx) = session(&alloc);
        assert!(!session.is_authenticated());
        assert!(session.player_id().is_none());
    }

    #[test]
    fn authenticate_sets_player_id() {
        let alloc = ConnectionIdAllocator::default();
        let (mut session, _rx) = session(&alloc);
        session.authenticate(PlayerId(7));
        assert!(session.is_authenticated());
        assert_eq!(session.player_id(), Some(PlayerId(7)));
    }

    #[test]
    fn authenticated_player_ids_excludes_unauthenticated_sessions() {
        let alloc = ConnectionIdAllocator::default();
        let table = SessionTable::new();
        let (mut a, _a_rx) = session(&alloc);
        let (b, _b_rx) = session(&alloc);
        a.authenticate(PlayerId(3));
        let a_id = a.id();
        table.insert(a);
        table.insert(b);
        table.index_player(a_id, PlayerId(3));

        assert_eq!(table.authenticated_player_ids(), vec![PlayerId(3)]);
    }

    #[test]
    fn send_to_player_reaches_the_right_session() {
        let alloc = ConnectionIdAllocator::default();
        let table = SessionTable::new();
        let (mut a, mut a_rx) = session(&alloc);
        let (b, mut b_rx) = session(&alloc);
        a.authenticate(PlayerId(1));
        let a_id = a.id();
        table.insert(a);
        table.insert(b);
        table.index_player(a_id, PlayerId(1));

        table.send_to_player(PlayerId(1), Message::Sync { client_time: 1.0, server_time: None, tick: None });
        assert!(a_rx.try_recv().is_ok());
        assert!(b_rx.try_recv().is_err());
    }

    #[test]
    fn broadcast_if_excludes_the_named_connection() {
        let alloc = ConnectionIdAllocator::default();
        let table = SessionTable::new();
        let (a, mut a_rx) = session(&alloc);
        let (b, mut b_rx) = session(&alloc);
        let a_id = a.id();
        table.insert(a);
        table.insert(b);

        table.broadcast_if(Some(a_id), |_| true, &Message::Sync { client_time: 0.0, server_time: None, tick: None });
        assert!(a_rx.try_recv().is_err());
        assert!(b_rx.try_recv().is_ok());
    }

    #[test]
    fn remove_clears_both_indices() {
        let alloc = ConnectionIdAllocator::default();
        let table = SessionTable::new();
        let (mut a, _rx) = session(&alloc);
        a.authenticate(PlayerId(9));
        let a_id = a.id();
        table.insert(a);
        table.index_player(a_id, PlayerId(9));

        assert_eq!(table.remove(a_id), Some(PlayerId(9)));
        assert!(table.is_empty());
        table.send_to_player(PlayerId(9), Message::Sync { client_time: 0.0, server_time: None, tick: None });
    }
}
