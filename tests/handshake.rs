//! Integration test for the join handshake and the type-width flip, driven
//! through an in-memory duplex rather than a real socket.

use freeciv_client::config::{self, ClientConfig};
use freeciv_client::delta;
use freeciv_client::frame::{build_frame, TypeWidth};
use freeciv_client::schema::{self, packet_type};
use freeciv_client::value::{FieldValue, PacketFields};
use freeciv_client::{cache::DeltaCache, Connection};
use std::io::Cursor;

fn encode(packet: u16, fields: &PacketFields) -> Vec<u8> {
    let spec = schema::lookup(packet).unwrap();
    let mut cache = DeltaCache::new();
    delta::encode_packet(spec, fields, &mut cache).unwrap()
}

#[test]
fn join_then_game_info_uses_widened_little_endian_type_tag() {
    let mut join_reply = PacketFields::new();
    join_reply.push("you_can_join", FieldValue::Bool(true));
    join_reply.push("message", FieldValue::Str("welcome".into()));
    join_reply.push("capability", FieldValue::Str(config::CAPABILITY.to_string()));
    join_reply.push("challenge_file", FieldValue::Str(String::new()));
    let join_reply_payload = encode(packet_type::SERVER_JOIN_REPLY, &join_reply);

    let mut game_info = PacketFields::new();
    for field in schema::lookup(packet_type::GAME_INFO).unwrap().fields.iter() {
        game_info.push(field.name, field.default_value());
    }
    let game_info_payload = encode(packet_type::GAME_INFO, &game_info);

    let mut scripted = Vec::new();
    scripted.extend(build_frame(TypeWidth::One, packet_type::SERVER_JOIN_REPLY, &join_reply_payload).unwrap());
    scripted.extend(build_frame(TypeWidth::Two, packet_type::GAME_INFO, &game_info_payload).unwrap());

    let config = ClientConfig::new("example.org", "alice");
    let mut connection = Connection::from_parts(Cursor::new(scripted), Vec::new(), config).unwrap();

    connection.join().unwrap();
    assert!(connection.is_joined());

    assert!(connection.dispatch_next().unwrap());
    assert!(connection.state().game_info.is_some());

    assert!(!connection.dispatch_next().unwrap());
}

#[test]
fn join_denied_prevents_type_width_flip() {
    let mut join_reply = PacketFields::new();
    join_reply.push("you_can_join", FieldValue::Bool(false));
    join_reply.push("message", FieldValue::Str("server full".into()));
    join_reply.push("capability", FieldValue::Str(config::CAPABILITY.to_string()));
    join_reply.push("challenge_file", FieldValue::Str(String::new()));
    let payload = encode(packet_type::SERVER_JOIN_REPLY, &join_reply);

    let scripted = build_frame(TypeWidth::One, packet_type::SERVER_JOIN_REPLY, &payload).unwrap();
    let config = ClientConfig::new("example.org", "alice");
    let mut connection = Connection::from_parts(Cursor::new(scripted), Vec::new(), config).unwrap();

    let err = connection.join().unwrap_err();
    assert!(matches!(err, freeciv_client::Error::JoinDenied(_)));
    assert!(!connection.is_joined());
}
