//! Length-prefixed frame reader: the layer below the primitive codec that
//! turns a byte stream into `(packet_type, payload)` pairs, transparently
//! expanding DEFLATE compression groups and jumbo frames.

use crate::error::{Error, Result};
use byteorder::{ReadBytesExt, WriteBytesExt, BE, LE};
use flate2::read::ZlibDecoder;
use std::collections::VecDeque;
use std::io::{self, Read, Write};

/// Sentinel added to a frame's length field to mark it as a compressed
/// group rather than a plain frame.
pub const COMPRESSION_BORDER: u16 = 0x8000;
/// Sentinel length value marking a jumbo (oversized) frame.
pub const JUMBO_SIZE: u16 = 0xFFFF;

/// Width, in bytes, of the packet-type tag on the wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeWidth {
    One,
    Two,
}

impl TypeWidth {
    pub(crate) fn bytes(self) -> usize {
        match self {
            TypeWidth::One => 1,
            TypeWidth::Two => 2,
        }
    }

    /// The length prefix is always big-endian, but the post-join two-byte
    /// type tag is transmitted little-endian — confirmed against
    /// `tools/validate_packet_files.py`'s `"<H"` unpack in the source
    /// client, which otherwise reads the length prefix as `"!H"` (network
    /// order). A one-byte tag has no endianness to get wrong.
    fn read<R: Read>(self, reader: &mut R) -> io::Result<u16> {
        match self {
            TypeWidth::One => Ok(reader.read_u8()? as u16),
            TypeWidth::Two => reader.read_u16::<LE>(),
        }
    }

    fn write<W: Write>(self, writer: &mut W, packet_type: u16) -> io::Result<()> {
        match self {
            TypeWidth::One => writer.write_u8(packet_type as u8),
            TypeWidth::Two => writer.write_u16::<LE>(packet_type),
        }
    }
}

/// Reads framed `(packet_type, payload)` pairs off an underlying
/// transport, handling type-width flips, compression groups, and jumbo
/// frames transparently.
pub struct FrameReader<R: Read> {
    inner: R,
    type_width: TypeWidth,
    pending: VecDeque<(u16, Vec<u8>)>,
}

impl<R: Read> FrameReader<R> {
    /// Wrap `inner`, starting in the handshake's one-byte type-width mode.
    pub fn new(inner: R) -> Self {
        FrameReader { inner, type_width: TypeWidth::One, pending: VecDeque::new() }
    }

    /// Current type-tag width.
    pub fn type_width(&self) -> TypeWidth {
        self.type_width
    }

    /// Flip to the two-byte type-tag width used for the remainder of the
    /// connection after a successful join. Idempotent.
    pub fn widen_type_tag(&mut self) {
        self.type_width = TypeWidth::Two;
    }

    /// Read bytes into `buf`, looping over short reads and surfacing a
    /// zero-length read as [`Error::ConnectionClosed`].
    fn read_exact_coalesced(&mut self, buf: &mut [u8]) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => return Err(Error::ConnectionClosed),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(())
    }

    /// Return the next `(packet_type, payload)` frame, transparently
    /// expanding a compression group into its constituent frames and
    /// draining them one at a time on subsequent calls.
    pub fn next_frame(&mut self) -> Result<(u16, Vec<u8>)> {
        if let Some(frame) = self.pending.pop_front() {
            return Ok(frame);
        }

        let mut len_buf = [0u8; 2];
        self.read_exact_coalesced(&mut len_buf)?;
        let length = u16::from_be_bytes(len_buf);

        if length == JUMBO_SIZE {
            return self.read_jumbo_frame();
        }

        if length & COMPRESSION_BORDER != 0 {
            let compressed_len = (length - COMPRESSION_BORDER) as usize;
            let mut compressed = vec![0u8; compressed_len];
            self.read_exact_coalesced(&mut compressed)?;
            self.expand_compression_group(&compressed)?;
            return self
                .pending
                .pop_front()
                .ok_or_else(|| Error::DecompressionFailed("compression group contained no frames".into()));
        }

        let header_size = 2 + self.type_width.bytes();
        let packet_type = self.type_width.read(&mut self.inner).map_err(|e| self.classify_io(e))?;
        let payload_len = (length as usize).checked_sub(header_size).ok_or_else(|| Error::MalformedPacket {
            packet_type,
            offset: 0,
            reason: format!("frame length {length} shorter than header size {header_size}"),
        })?;
        let mut payload = vec![0u8; payload_len];
        self.read_exact_coalesced(&mut payload)?;
        Ok((packet_type, payload))
    }

    fn classify_io(&self, e: io::Error) -> Error {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::ConnectionClosed
        } else {
            Error::Io(e)
        }
    }

    fn read_jumbo_frame(&mut self) -> Result<(u16, Vec<u8>)> {
        let mut true_len_buf = [0u8; 4];
        self.read_exact_coalesced(&mut true_len_buf)?;
        let true_length = u32::from_be_bytes(true_len_buf) as usize;

        let jumbo_header_size = 2 + 4 + self.type_width.bytes();
        let packet_type = self.type_width.read(&mut self.inner).map_err(|e| self.classify_io(e))?;
        let payload_len = true_length.checked_sub(jumbo_header_size).ok_or_else(|| Error::MalformedPacket {
            packet_type,
            offset: 0,
            reason: format!("jumbo true_length {true_length} shorter than header size {jumbo_header_size}"),
        })?;
        let mut payload = vec![0u8; payload_len];
        self.read_exact_coalesced(&mut payload)?;
        Ok((packet_type, payload))
    }

    /// Decompress a DEFLATE (zlib-wrapped) group and parse its contents as
    /// a back-to-back sequence of normal frames, queuing each for later
    /// emission by `next_frame`.
    fn expand_compression_group(&mut self, compressed: &[u8]) -> Result<()> {
        let mut decoder = ZlibDecoder::new(compressed);
        let mut expanded = Vec::new();
        decoder
            .read_to_end(&mut expanded)
            .map_err(|e| Error::DecompressionFailed(e.to_string()))?;

        let mut cursor = io::Cursor::new(expanded.as_slice());
        while (cursor.position() as usize) < expanded.len() {
            let length = cursor.read_u16::<BE>().map_err(|e| Error::DecompressionFailed(e.to_string()))?;
            if length == JUMBO_SIZE || length & COMPRESSION_BORDER != 0 {
                return Err(Error::DecompressionFailed(
                    "nested jumbo or compression group inside a compression group".into(),
                ));
            }
            let header_size = 2 + self.type_width.bytes();
            let packet_type = self.type_width.read(&mut cursor).map_err(|e| Error::DecompressionFailed(e.to_string()))?;
            let payload_len = (length as usize)
                .checked_sub(header_size)
                .ok_or_else(|| Error::DecompressionFailed(format!("inner frame length {length} too short")))?;
            let mut payload = vec![0u8; payload_len];
            cursor
                .read_exact(&mut payload)
                .map_err(|e| Error::DecompressionFailed(e.to_string()))?;
            self.pending.push_back((packet_type, payload));
        }
        Ok(())
    }
}

/// Writes `(packet_type, payload)` frames to a transport using plain
/// (uncompressed, non-jumbo) framing — the only mode this client ever
/// needs to emit, since it only originates small, latency-sensitive
/// packets (join request, chat).
pub struct FrameWriter<W: Write> {
    inner: W,
    type_width: TypeWidth,
}

impl<W: Write> FrameWriter<W> {
    /// Wrap `inner`, starting in the handshake's one-byte type-width mode.
    pub fn new(inner: W) -> Self {
        FrameWriter { inner, type_width: TypeWidth::One }
    }

    /// Flip to the two-byte type-tag width, mirroring [`FrameReader::widen_type_tag`].
    pub fn widen_type_tag(&mut self) {
        self.type_width = TypeWidth::Two;
    }

    /// Current type-tag width.
    pub fn type_width(&self) -> TypeWidth {
        self.type_width
    }

    /// Write one frame and flush it to the transport.
    pub fn write_frame(&mut self, packet_type: u16, payload: &[u8]) -> Result<()> {
        let bytes = build_frame(self.type_width, packet_type, payload)?;
        self.inner.write_all(&bytes)?;
        self.inner.flush()?;
        Ok(())
    }
}

/// Serialize `(packet_type, payload)` as a plain (non-jumbo,
/// non-compressed) frame at the given type-width. Shared by
/// [`FrameWriter::write_frame`] and by packet capture, which re-encodes
/// frames this way regardless of how they actually arrived on the wire.
pub fn build_frame(type_width: TypeWidth, packet_type: u16, payload: &[u8]) -> Result<Vec<u8>> {
    let header_size = 2 + type_width.bytes();
    let length = header_size
        .checked_add(payload.len())
        .and_then(|n| u16::try_from(n).ok())
        .ok_or_else(|| Error::MalformedPacket {
            packet_type,
            offset: 0,
            reason: "payload too large for a non-jumbo frame".into(),
        })?;
    let mut buf = Vec::with_capacity(length as usize);
    buf.write_u16::<BE>(length)?;
    type_width.write(&mut buf, packet_type)?;
    buf.write_all(payload)?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn normal_frame(type_width: TypeWidth, packet_type: u16, payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        let header_size = 2 + type_width.bytes();
        buf.write_u16::<BE>((header_size + payload.len()) as u16).unwrap();
        type_width.write(&mut buf, packet_type).unwrap();
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn reads_a_plain_one_byte_type_frame() {
        let bytes = normal_frame(TypeWidth::One, 5, b"hello");
        let mut reader = FrameReader::new(Cursor::new(bytes));
        let (packet_type, payload) = reader.next_frame().unwrap();
        assert_eq!(packet_type, 5);
        assert_eq!(payload, b"hello");
    }

    #[test]
    fn widened_type_tag_is_two_bytes() {
        let bytes = normal_frame(TypeWidth::Two, 300, b"x");
        let mut reader = FrameReader::new(Cursor::new(bytes));
        reader.widen_type_tag();
        let (packet_type, payload) = reader.next_frame().unwrap();
        assert_eq!(packet_type, 300);
        assert_eq!(payload, b"x");
    }

    #[test]
    fn zero_length_read_is_connection_closed() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.next_frame().unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[test]
    fn jumbo_frame_round_trips_full_payload() {
        let payload = vec![0xABu8; 100_000];
        let mut buf = Vec::new();
        buf.write_u16::<BE>(JUMBO_SIZE).unwrap();
        let jumbo_header_size = 2 + 4 + 1;
        buf.write_u32::<BE>((jumbo_header_size + payload.len()) as u32).unwrap();
        buf.write_u8(9).unwrap();
        buf.extend_from_slice(&payload);

        let mut reader = FrameReader::new(Cursor::new(buf));
        let (packet_type, decoded_payload) = reader.next_frame().unwrap();
        assert_eq!(packet_type, 9);
        assert_eq!(decoded_payload.len(), 100_000);
        assert!(decoded_payload.iter().all(|&b| b == 0xAB));
    }

    #[test]
    fn compression_group_expands_into_multiple_frames() {
        use flate2::write::ZlibEncoder;
        use flate2::Compression;

        let mut group = Vec::new();
        group.extend(normal_frame(TypeWidth::One, 1, b"a"));
        group.extend(normal_frame(TypeWidth::One, 2, b"bb"));

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&group).unwrap();
        let compressed = encoder.finish().unwrap();

        let mut buf = Vec::new();
        buf.write_u16::<BE>(COMPRESSION_BORDER + compressed.len() as u16).unwrap();
        buf.extend_from_slice(&compressed);

        let mut reader = FrameReader::new(Cursor::new(buf));
        let (t1, p1) = reader.next_frame().unwrap();
        assert_eq!((t1, p1), (1, b"a".to_vec()));
        let (t2, p2) = reader.next_frame().unwrap();
        assert_eq!((t2, p2), (2, b"bb".to_vec()));
    }

    #[test]
    fn writer_and_reader_agree_on_plain_frame() {
        let mut buf = Vec::new();
        {
            let mut writer = FrameWriter::new(&mut buf);
            writer.write_frame(4, b"join").unwrap();
        }
        let mut reader = FrameReader::new(Cursor::new(buf));
        let (packet_type, payload) = reader.next_frame().unwrap();
        assert_eq!(packet_type, 4);
        assert_eq!(payload, b"join");
    }
}
