//! `SERVER_INFO` handling.

use crate::error::Result;
use crate::game_state::{GameState, ServerInfo};
use crate::value::PacketFields;
use tracing::info;

pub fn handle_server_info(state: &mut GameState, fields: &PacketFields) -> Result<()> {
    let info = ServerInfo {
        version_label: fields.get_str("version_label")?.to_string(),
        major_version: fields.get_u32("major_version")?,
        minor_version: fields.get_u32("minor_version")?,
        patch_version: fields.get_u32("patch_version")?,
        emerg_version: fields.get_u32("emerg_version")?,
    };

    info!(
        version = %format!(
            "{}.{}.{}-{}",
            info.major_version, info.minor_version, info.patch_version, info.emerg_version
        ),
        label = %info.version_label,
        "server identified itself",
    );

    state.server_info = Some(info);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::FieldValue;

    #[test]
    fn stores_server_version() {
        let mut state = GameState::new();
        let mut fields = PacketFields::new();
        fields.push("version_label", FieldValue::Str("-dev".into()));
        fields.push("major_version", FieldValue::U32(3));
        fields.push("minor_version", FieldValue::U32(3));
        fields.push("patch_version", FieldValue::U32(90));
        fields.push("emerg_version", FieldValue::U32(0));

        handle_server_info(&mut state, &fields).unwrap();
        let info = state.server_info.unwrap();
        assert_eq!(info.minor_version, 3);
        assert_eq!(info.version_label, "-dev");
    }
}
