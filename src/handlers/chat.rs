//! `CHAT_MSG` handling.

use crate::error::Result;
use crate::game_state::{ChatHistoryEntry, GameState};
use crate::value::PacketFields;
use std::time::SystemTime;
use tracing::info;

pub fn handle_chat_msg(state: &mut GameState, fields: &PacketFields) -> Result<()> {
    let entry = ChatHistoryEntry {
        timestamp: SystemTime::now(),
        message: fields.get_str("message")?.to_string(),
        tile: fields.get_i32("tile")?,
        event: fields.get_i16("event")?,
        turn: fields.get_i32("turn")?,
        phase: fields.get_i16("phase")?,
        conn_id: fields.get_i32("conn_id")?,
    };

    info!(
        turn = entry.turn,
        phase = entry.phase,
        event = entry.event,
        tile = entry.tile,
        conn_id = entry.conn_id,
        message = %entry.message,
        "chat message received",
    );

    state.chat_history.push(entry);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldValue;

    #[test]
    fn appends_to_chat_history() {
        let mut state = GameState::new();
        let mut fields = PacketFields::new();
        fields.push("message", FieldValue::Str("hello".into()));
        fields.push("tile", FieldValue::I32(1));
        fields.push("event", FieldValue::I16(2));
        fields.push("turn", FieldValue::I32(3));
        fields.push("phase", FieldValue::I16(0));
        fields.push("conn_id", FieldValue::I32(-1));

        handle_chat_msg(&mut state, &fields).unwrap();
        assert_eq!(state.chat_history.len(), 1);
        assert_eq!(state.chat_history[0].message, "hello");
        assert_eq!(state.chat_history[0].turn, 3);
    }
}
