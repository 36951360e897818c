//! Wire framing: `length_prefix || payload` (spec.md §4.3, §6).
//!
//! The spec notes the reference implementation mixes 2-byte and 4-byte
//! prefixes across files and leaves the choice to the implementer
//! (SPEC_FULL.md §9 Open Question 1). This crate picks a 2-byte
//! big-endian length prefix throughout, capping any single message at
//! 65,535 bytes — comfortably above a `CHUNK_DATA` for one 32×32 chunk
//! (`lodestone_world::chunk::TILES_PER_CHUNK` tiles at 2 bytes each, plus a
//! modest entity list).
//!
//! The payload is a MessagePack `{t: <int>, d: <map>}` envelope (spec.md
//! §4.3): `t` is [`Message::wire_type`]'s integer discriminant, `d` the
//! variant's fields. `Message` derives serde's externally-tagged
//! representation (`{"<Variant>": {...}}`) for its own convenience; this
//! module re-tags that single-key map into the wire envelope on the way out
//! and reverses the process on the way in, via `rmpv::Value` rather than
//! `Message` itself, since the `{t, d}` shape isn't expressible through a
//! serde derive alone.

use lodestone_shared::Message;
use rmpv::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest payload this framing can carry.
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

fn io_err(err: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, err.to_string())
}

/// Re-tags `message`'s externally-tagged MessagePack encoding into the
/// `{t, d}` wire envelope.
fn encode_envelope(message: &Message) -> std::io::Result<Vec<u8>> {
    let tagged = rmp_serde::to_vec_named(message).map_err(io_err)?;
    let tagged: Value = rmp_serde::from_slice(&tagged).map_err(io_err)?;
    let Value::Map(mut pairs) = tagged else {
        return Err(io_err("externally-tagged message did not encode as a map"));
    };
    let (_, data) = pairs.pop().ok_or_else(|| io_err("externally-tagged message map was empty"))?;

    let envelope = Value::Map(vec![
        (Value::from("t"), Value::from(message.wire_type())),
        (Value::from("d"), data),
    ]);
    rmp_serde::to_vec_named(&envelope).map_err(io_err)
}

/// Reverses [`encode_envelope`]: reads the `{t, d}` map and rebuilds the
/// `{"<Variant>": d}` shape serde's derived `Deserialize` for [`Message`]
/// expects.
fn decode_envelope(payload: &[u8]) -> Option<Message> {
    let envelope: Value = rmp_serde::from_slice(payload).ok()?;
    let Value::Map(pairs) = envelope else { return None };

    let mut wire_type = None;
    let mut data = None;
    for (key, value) in pairs {
        match key.as_str() {
            Some("t") => wire_type = value.as_u64(),
            Some("d") => data = Some(value),
            _ => {}
        }
    }

    let variant_name = Message::variant_name_for_wire_type(wire_type?.try_into().ok()?)?;
    let tagged = Value::Map(vec![(Value::from(variant_name), data?)]);
    let tagged_bytes = rmp_serde::to_vec_named(&tagged).ok()?;
    rmp_serde::from_slice(&tagged_bytes).ok()
}

/// One decoded frame, or a note that the bytes on the wire didn't decode.
#[derive(Debug)]
pub enum Frame {
    /// A successfully decoded message.
    Message(Message),
    /// The length prefix was read fine but the payload didn't deserialize
    /// as a [`Message`]. Per spec.md §7 this is not fatal: the stream
    /// resynchronizes at the next length prefix, so the caller should log
    /// and keep reading rather than tearing the connection down.
    Malformed,
}

/// Encodes `message` and writes `len_prefix || payload` to `writer`.
///
/// # Errors
///
/// Returns an error if `message` encodes to more than [`MAX_FRAME_LEN`]
/// bytes, or if the underlying write fails.
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, message: &Message) -> std::io::Result<()> {
    let payload = encode_envelope(message)?;
    if payload.len() > MAX_FRAME_LEN {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("encoded message is {} bytes, over the {MAX_FRAME_LEN}-byte frame limit", payload.len()),
        ));
    }
    #[allow(clippy::cast_possible_truncation)]
    let len = payload.len() as u16;
    writer.write_all(&len.to_be_bytes()).await?;
    writer.write_all(&payload).await?;
    writer.flush().await
}

/// Reads one frame from `reader`.
///
/// Returns `Ok(None)` on a clean EOF at a frame boundary (the peer closed
/// the socket between messages). A decode failure on a complete frame is
/// reported as `Ok(Some(Frame::Malformed))`, not an error — see
/// [`Frame::Malformed`].
///
/// # Errors
///
/// Returns an error for any I/O failure, including an EOF in the middle of
/// a frame (a truncated read is a dead connection, not a resynchronizable
/// framing error).
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> std::io::Result<Option<Frame>> {
    let mut len_bytes = [0u8; 2];
    match reader.read_exact(&mut len_bytes).await {
        Ok(()) => {}
        Err(err) if err.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err),
    }
    let len = u16::from_be_bytes(len_bytes) as usize;

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;

    match decode_envelope(&payload) {
        Some(message) => Ok(Some(Frame::Message(message))),
        None => Ok(Some(Frame::Malformed)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_a_message_through_the_frame() {
        let msg = Message::ChunkRequest { cx: 1, cy: -2 };
        let mut buf = Vec::new();
        write_frame(&mut buf, &msg).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let frame = read_frame(&mut cursor).await.unwrap().expect("one frame");
        match frame {
            Frame::Message(Message::ChunkRequest { cx, cy }) => {
                assert_eq!(cx, 1);
                assert_eq!(cy, -2);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn two_frames_back_to_back_decode_independently() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &Message::Sync { client_time: 1.0, server_time: None, tick: None }).await.unwrap();
        write_frame(&mut buf, &Message::Sync { client_time: 2.0, server_time: None, tick: None }).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let first = read_frame(&mut cursor).await.unwrap().expect("first frame");
        let second = read_frame(&mut cursor).await.unwrap().expect("second frame");
        let Frame::Message(Message::Sync { client_time: a, .. }) = first else { panic!("expected sync") };
        let Frame::Message(Message::Sync { client_time: b, .. }) = second else { panic!("expected sync") };
        assert_eq!(a, 1.0);
        assert_eq!(b, 2.0);
    }

    #[tokio::test]
    async fn clean_eof_at_a_boundary_is_none() {
        let mut cursor = std::io::Cursor::new(Vec::<u8>::new());
        assert!(read_frame(&mut cursor).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn truncated_payload_is_an_io_error_not_malformed() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &Message::ChunkRequest { cx: 0, cy: 0 }).await.unwrap();
        buf.truncate(buf.len() - 1);
        let mut cursor = std::io::Cursor::new(buf);
        assert!(read_frame(&mut cursor).await.is_err());
    }

    #[tokio::test]
    async fn wire_payload_is_a_t_d_envelope() {
        let mut buf = Vec::new();
        write_frame(&mut buf, &Message::ChunkRequest { cx: 1, cy: -2 }).await.unwrap();
        let payload = &buf[2..];

        let value: Value = rmp_serde::from_slice(payload).unwrap();
        let Value::Map(pairs) = value else { panic!("expected a map") };
        assert_eq!(pairs.len(), 2);
        let keys: Vec<&str> = pairs.iter().map(|(k, _)| k.as_str().unwrap()).collect();
        assert!(keys.contains(&"t"));
        assert!(keys.contains(&"d"));

        let t = pairs.iter().find(|(k, _)| k.as_str() == Some("t")).unwrap().1.as_u64().unwrap();
        assert_eq!(t, Message::ChunkRequest { cx: 1, cy: -2 }.wire_type() as u64);
    }

    #[tokio::test]
    async fn garbage_payload_resynchronizes_instead_of_failing() {
        let mut buf = Vec::new();
        let garbage = vec![0xFFu8; 10];
        #[allow(clippy::cast_possible_truncation)]
        buf.extend_from_slice(&(garbage.len() as u16).to_be_bytes());
        buf.extend_from_slice(&garbage);
        write_frame(&mut buf, &Message::ChunkRequest { cx: 5, cy: 5 }).await.unwrap();

        let mut cursor = std::io::Cursor::new(buf);
        let first = read_frame(&mut cursor).await.unwrap().expect("garbage frame");
        assert!(matches!(first, Frame::Malformed));
        let second = read_frame(&mut cursor).await.unwrap().expect("good frame after resync");
        assert!(matches!(second, Frame::Message(Message::ChunkRequest { cx: 5, cy: 5 })));
    }
}
