//! Handlers for packets that carry no meaningful payload of their own —
//! processing markers and compression-group bracketing.

use crate::error::Result;
use crate::game_state::GameState;
use crate::value::PacketFields;
use tracing::debug;

pub fn handle_processing_started(_state: &mut GameState, _fields: &PacketFields) -> Result<()> {
    debug!("server started processing");
    Ok(())
}

pub fn handle_processing_finished(_state: &mut GameState, _fields: &PacketFields) -> Result<()> {
    debug!("server finished processing");
    Ok(())
}

/// Signals the start of a compression group; the server queues packets
/// until the matching `THAW_CLIENT`. Compression-group expansion already
/// happens transparently in [`crate::frame::FrameReader`], so this is
/// purely informational here.
pub fn handle_freeze_client(_state: &mut GameState, _fields: &PacketFields) -> Result<()> {
    debug!("server began a compression group");
    Ok(())
}

pub fn handle_thaw_client(_state: &mut GameState, _fields: &PacketFields) -> Result<()> {
    debug!("server ended a compression group");
    Ok(())
}
