//! # Lodestone Networking
//!
//! The TCP server half of spec.md §4.3/§5: a length-prefixed MessagePack
//! wire codec, per-connection session bookkeeping, area-of-interest
//! broadcast routing, and the tokio accept loop that ties them together.
//!
//! This crate owns sockets and session state only. It has no dependency
//! on `lodestone_simulation`/`lodestone_catalog`/`lodestone_persistence` —
//! decoded messages are handed to the caller (`lodestone_server`) through
//! an unbounded channel and drained at the start of each tick, matching
//! spec.md §5's rule that all world-state mutation happens on the
//! simulation worker. `lodestone_server` is also where the AUTH handshake
//! (create-or-load player, assign id, send `AUTH_RESPONSE`) lives, since
//! that needs the persistence store and the live player set.
//!
//! Rebuilt from `oroboros_networking`'s "Ghost Protocol": that crate was a
//! UDP reliability layer with snapshot interpolation and client-side
//! prediction for a twitch-combat game. None of that machinery survives —
//! this protocol is TCP (ordered, reliable by construction) carrying a
//! self-describing map, so there is no sequence-number/ack/snapshot-delta
//! layer to build. What does survive, adapted: the fixed-rate `TickLoop`
//! (`server::tick`, near-verbatim) and the connection-identity/
//! accept-and-broadcast shape of `server::mod`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod codec;
pub mod router;
pub mod server;
pub mod session;

pub use codec::{read_frame, write_frame, Frame, MAX_FRAME_LEN};
pub use router::{area_of_interest, in_aoi, newly_entered_chunks, shares_a_chunk};
pub use server::{ConnectionId, Inbound, NetworkServer, ServerConfig, TickLoop, TickStats};
pub use session::{Outbox, Session, SessionTable};
