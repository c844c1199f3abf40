//! `GAME_INFO` handling: discovered technologies and wonder ownership,
//! both carried as array-diff fields.

use crate::error::Result;
use crate::game_state::{GameInfo, GameState};
use crate::value::PacketFields;
use tracing::info;

pub fn handle_game_info(state: &mut GameState, fields: &PacketFields) -> Result<()> {
    let global_advances = fields.get_bool_array("global_advances")?.to_vec();
    let great_wonder_owners = fields.get_i8_array("great_wonder_owners")?.to_vec();
    let global_advance_count = fields.get_u16("global_advance_count")?;

    let discovered = global_advances.iter().filter(|&&b| b).count();
    let owned = great_wonder_owners.iter().filter(|&&o| o >= 0).count();
    info!(
        discovered,
        total = global_advances.len(),
        global_advance_count,
        owned,
        wonders = great_wonder_owners.len(),
        "game info updated",
    );

    state.game_info = Some(GameInfo { global_advance_count, global_advances, great_wonder_owners });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldValue;

    #[test]
    fn counts_discovered_advances_and_owned_wonders() {
        let mut state = GameState::new();
        let mut fields = PacketFields::new();
        fields.push("global_advance_count", FieldValue::U16(3));
        fields.push("global_advances", FieldValue::BoolArray(vec![true, false, true]));
        fields.push("great_wonder_owners", FieldValue::I8Array(vec![-1, 2, -1]));

        handle_game_info(&mut state, &fields).unwrap();
        let info = state.game_info.unwrap();
        assert_eq!(info.global_advances.iter().filter(|&&b| b).count(), 2);
        assert_eq!(info.great_wonder_owners.iter().filter(|&&o| o >= 0).count(), 1);
    }
}
