//! Packet handlers: one function per packet type this client understands,
//! registered onto a [`crate::handler::HandlerRegistry`].

mod chat;
mod game_info;
mod lifecycle;
mod nation;
mod ruleset;
mod server_info;

use crate::handler::HandlerRegistry;
use crate::schema::packet_type;

/// Register every handler this client implements. `SERVER_JOIN_REQ` and
/// `SERVER_JOIN_REPLY` are deliberately absent: the handshake is handled
/// directly by [`crate::connection::Connection::join`], not through the
/// steady-state dispatch loop.
pub fn register_all(registry: &mut HandlerRegistry) {
    registry.register(packet_type::PROCESSING_STARTED, lifecycle::handle_processing_started);
    registry.register(packet_type::PROCESSING_FINISHED, lifecycle::handle_processing_finished);
    registry.register(packet_type::FREEZE_CLIENT, lifecycle::handle_freeze_client);
    registry.register(packet_type::THAW_CLIENT, lifecycle::handle_thaw_client);

    registry.register(packet_type::SERVER_INFO, server_info::handle_server_info);

    registry.register(packet_type::GAME_INFO, game_info::handle_game_info);
    registry.register(packet_type::CHAT_MSG, chat::handle_chat_msg);

    registry.register(packet_type::RULESET_CONTROL, ruleset::handle_ruleset_control);
    registry.register(packet_type::RULESET_SUMMARY, ruleset::handle_ruleset_summary);
    registry.register(packet_type::RULESET_DESCRIPTION_PART, ruleset::handle_ruleset_description_part);
    registry.register(packet_type::RULESET_GAME, ruleset::handle_ruleset_game);
    registry.register(packet_type::RULESET_DISASTER, ruleset::handle_ruleset_disaster);

    registry.register(packet_type::RULESET_NATION_SETS, nation::handle_ruleset_nation_sets);
    registry.register(packet_type::RULESET_NATION_GROUPS, nation::handle_ruleset_nation_groups);
    registry.register(packet_type::RULESET_NATION, nation::handle_ruleset_nation);
    registry.register(packet_type::NATION_AVAILABILITY, nation::handle_nation_availability);
}
