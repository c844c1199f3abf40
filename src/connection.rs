//! The connection state machine: join handshake followed by a steady-state
//! dispatch loop, generalizing citp's `CitpTcp` (buffered reader/writer
//! pair wrapping a stream) to the FreeCiv handshake.

use crate::cache::DeltaCache;
use crate::capture::{prepare_capture_dir, FrameCapture};
use crate::config::{self, ClientConfig};
use crate::delta;
use crate::error::{Error, Result};
use crate::frame::{build_frame, FrameReader, FrameWriter};
use crate::game_state::GameState;
use crate::handler::HandlerRegistry;
use crate::schema::{self, packet_type};
use crate::value::{FieldValue, PacketFields};
use std::io::{BufReader, BufWriter, Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// A FreeCiv connection: framing, the delta cache, the handler registry,
/// and the accumulated [`GameState`], bound to a buffered reader/writer
/// pair over one transport.
pub struct Connection<R: Read, W: Write> {
    frame_reader: FrameReader<BufReader<R>>,
    frame_writer: FrameWriter<BufWriter<W>>,
    cache: DeltaCache,
    handlers: HandlerRegistry,
    state: GameState,
    config: ClientConfig,
    capture_in: Option<FrameCapture>,
    capture_out: Option<FrameCapture>,
    joined: bool,
}

impl Connection<TcpStream, TcpStream> {
    /// Open a TCP connection to `config.server_host:config.server_port`.
    /// Does not perform the join handshake; call [`Connection::join`]
    /// afterward.
    pub fn connect(config: ClientConfig) -> Result<Self> {
        let stream = TcpStream::connect((config.server_host.as_str(), config.server_port))?;
        let writer = stream.try_clone()?;
        Connection::from_parts(stream, writer, config)
    }
}

impl<R: Read, W: Write> Connection<R, W> {
    /// Wrap an already-established reader/writer pair (e.g. two ends of a
    /// `TcpStream::try_clone`, or an in-memory duplex in tests).
    pub fn from_parts(reader: R, writer: W, config: ClientConfig) -> Result<Self> {
        if let Some(dir) = &config.packet_capture_dir {
            prepare_capture_dir(dir)?;
        }
        let capture_in = config.packet_capture_dir.as_ref().map(|d| FrameCapture::new(d.clone(), "in"));
        let capture_out = config.packet_capture_dir.as_ref().map(|d| FrameCapture::new(d.clone(), "out"));

        Ok(Connection {
            frame_reader: FrameReader::new(BufReader::new(reader)),
            frame_writer: FrameWriter::new(BufWriter::new(writer)),
            cache: DeltaCache::new(),
            handlers: HandlerRegistry::with_defaults(),
            state: GameState::new(),
            config,
            capture_in,
            capture_out,
            joined: false,
        })
    }

    /// The accumulated game state, as of the last dispatched packet.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Whether the join handshake has completed successfully.
    pub fn is_joined(&self) -> bool {
        self.joined
    }

    /// Send `SERVER_JOIN_REQ` and wait for `SERVER_JOIN_REPLY`, skipping
    /// any `PROCESSING_STARTED` packets the server sends first — mirrors
    /// `original_source/fc_client/client.py::join_game`. On success, both
    /// the reader and writer permanently switch to the two-byte packet
    /// type tag, mirroring
    /// `original_source/fc_client/handlers.py::handle_server_join_reply`.
    pub fn join(&mut self) -> Result<()> {
        let mut request = PacketFields::new();
        request.push("username", FieldValue::Str(self.config.username.clone()));
        request.push("capability", FieldValue::Str(self.config.capability_string.clone()));
        request.push("version_label", FieldValue::Str(config::VERSION_LABEL.to_string()));
        request.push("major", FieldValue::U32(config::MAJOR_VERSION));
        request.push("minor", FieldValue::U32(config::MINOR_VERSION));
        request.push("patch", FieldValue::U32(config::PATCH_VERSION));

        let req_spec = schema::lookup(packet_type::SERVER_JOIN_REQ)
            .expect("SERVER_JOIN_REQ is always registered");
        let payload = delta::encode_packet(req_spec, &request, &mut self.cache)?;
        self.write_frame(packet_type::SERVER_JOIN_REQ, &payload)?;
        info!(username = %self.config.username, "sent join request");

        let deadline = Instant::now() + Duration::from_millis(self.config.join_timeout_ms);

        loop {
            if Instant::now() >= deadline {
                return Err(Error::JoinTimeout);
            }

            let (received_type, received_payload) = match self.frame_reader.next_frame() {
                Ok(frame) => frame,
                Err(Error::Io(e))
                    if matches!(e.kind(), std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut) =>
                {
                    return Err(Error::JoinTimeout);
                }
                Err(e) => return Err(e),
            };
            self.record_inbound(received_type, &received_payload);

            if received_type == packet_type::PROCESSING_STARTED {
                debug!("skipping PROCESSING_STARTED before join reply");
                continue;
            }
            if received_type != packet_type::SERVER_JOIN_REPLY {
                debug!(packet_type = received_type, "skipping packet received before join reply");
                continue;
            }

            let reply_spec = schema::lookup(packet_type::SERVER_JOIN_REPLY)
                .expect("SERVER_JOIN_REPLY is always registered");
            let fields = delta::decode_packet(reply_spec, &received_payload, &mut self.cache)?;
            let you_can_join = fields.get_bool("you_can_join")?;
            let message = fields.get_str("message")?.to_string();

            if you_can_join {
                info!(%message, "join accepted");
                self.frame_reader.widen_type_tag();
                self.frame_writer.widen_type_tag();
                self.joined = true;
                return Ok(());
            }
            warn!(%message, "join denied");
            return Err(Error::JoinDenied(message));
        }
    }

    /// Read and dispatch exactly one packet. Returns `Ok(false)` once the
    /// connection has closed cleanly; propagates every other error.
    pub fn dispatch_next(&mut self) -> Result<bool> {
        let (received_type, payload) = match self.frame_reader.next_frame() {
            Ok(frame) => frame,
            Err(Error::ConnectionClosed) => return Ok(false),
            Err(e) => return Err(e),
        };
        self.record_inbound(received_type, &payload);

        let Some(spec) = schema::lookup(received_type) else {
            if self.config.shutdown_on_unknown_packet {
                error!(packet_type = received_type, "unknown packet type, closing connection");
                return Err(Error::UnknownPacketType(received_type));
            }
            warn!(packet_type = received_type, "unknown packet type, skipping");
            return Ok(true);
        };

        let fields = match delta::decode_packet(spec, &payload, &mut self.cache) {
            Ok(fields) => fields,
            Err(e) => {
                error!(packet_type = received_type, error = %e, "failed to decode packet");
                return Err(e);
            }
        };

        if !self.handlers.dispatch(received_type, &mut self.state, &fields)? {
            error!(packet_type = received_type, name = spec.name, "no handler registered for known packet type");
            return Err(Error::MissingHandler(received_type));
        }
        Ok(true)
    }

    /// Dispatch packets until the connection closes.
    pub fn run(&mut self) -> Result<()> {
        while self.dispatch_next()? {}
        Ok(())
    }

    /// Write `payload` as one `CHAT_MSG` frame; the only packet type this
    /// client ever originates besides the join request, per spec.md's
    /// Non-goals restricting outbound encoding.
    pub fn send_chat_msg(&mut self, message: &str) -> Result<()> {
        let mut fields = PacketFields::new();
        fields.push("message", FieldValue::Str(message.to_string()));
        fields.push("tile", FieldValue::I32(-1));
        fields.push("event", FieldValue::I16(0));
        fields.push("turn", FieldValue::I32(-1));
        fields.push("phase", FieldValue::I16(-1));
        fields.push("conn_id", FieldValue::I32(-1));

        let spec = schema::lookup(packet_type::CHAT_MSG).expect("CHAT_MSG is always registered");
        let payload = delta::encode_packet(spec, &fields, &mut self.cache)?;
        self.write_frame(packet_type::CHAT_MSG, &payload)
    }

    fn write_frame(&mut self, packet_type: u16, payload: &[u8]) -> Result<()> {
        if let Some(capture) = &mut self.capture_out {
            let raw = build_frame(self.frame_writer.type_width(), packet_type, payload)?;
            capture.record(packet_type, &raw).map_err(Error::Io)?;
        }
        self.frame_writer.write_frame(packet_type, payload)
    }

    fn record_inbound(&mut self, packet_type: u16, payload: &[u8]) {
        if let Some(capture) = &mut self.capture_in {
            if let Ok(raw) = build_frame(self.frame_reader.type_width(), packet_type, payload) {
                let _ = capture.record(packet_type, &raw);
            }
        }
    }
}
