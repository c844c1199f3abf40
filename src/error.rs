//! Crate-wide error type.
//!
//! One variant per the error taxonomy in the protocol design: every
//! non-`CacheMiss` failure unwinds to the dispatch loop and is terminal for
//! the connection, since delta-decoder state is inconsistent once a packet
//! fails to decode cleanly.

use std::io;

/// Errors produced while reading, framing, or decoding the FreeCiv wire
/// protocol.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The transport returned EOF while a frame was only partially read.
    #[error("connection closed mid-frame")]
    ConnectionClosed,

    /// A primitive value (typically a null-terminated string) ran past the
    /// end of the available bytes before completing.
    #[error("truncated value in packet type {packet_type}: {reason}")]
    Truncated {
        /// Packet type being decoded when the truncation was detected.
        packet_type: u16,
        /// Short description of what ran out of bytes.
        reason: String,
    },

    /// The payload did not match the packet's schema: cursor mismatch,
    /// invalid array-diff index, or similar structural violation.
    #[error("malformed packet type {packet_type} at offset {offset}: {reason}")]
    MalformedPacket {
        /// Packet type being decoded.
        packet_type: u16,
        /// Byte offset within the payload where the fault was detected.
        offset: usize,
        /// Short reason string.
        reason: String,
    },

    /// No schema is registered for the received packet type.
    #[error("unknown packet type {0}")]
    UnknownPacketType(u16),

    /// The packet type is registered in the schema but no handler is bound
    /// to it in the dispatch registry.
    #[error("no handler registered for packet type {0}")]
    MissingHandler(u16),

    /// The server rejected the join request (`you_can_join = false`).
    #[error("join denied: {0}")]
    JoinDenied(String),

    /// The handshake did not complete within the configured deadline.
    #[error("timed out waiting for join reply")]
    JoinTimeout,

    /// A compression group's DEFLATE stream failed to decompress.
    #[error("failed to decompress packet group: {0}")]
    DecompressionFailed(String),

    /// An I/O error from the underlying transport not otherwise classified.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
