//! Handlers for the ruleset-definition packets sent during initialization:
//! `RULESET_CONTROL`, `RULESET_SUMMARY`, `RULESET_DESCRIPTION_PART`,
//! `RULESET_GAME`, and `RULESET_DISASTER`.

use crate::error::Result;
use crate::game_state::{DisasterType, GameState, RulesetControl, RulesetGame};
use crate::value::PacketFields;
use tracing::{info, warn};

pub fn handle_ruleset_control(state: &mut GameState, fields: &PacketFields) -> Result<()> {
    let ruleset = RulesetControl {
        num_unit_classes: fields.get_u16("num_unit_classes")?,
        num_unit_types: fields.get_u16("num_unit_types")?,
        num_impr_types: fields.get_u16("num_impr_types")?,
        num_tech_classes: fields.get_u16("num_tech_classes")?,
        num_tech_types: fields.get_u16("num_tech_types")?,
        num_extra_types: fields.get_u16("num_extra_types")?,
        num_base_types: fields.get_u16("num_base_types")?,
        num_road_types: fields.get_u16("num_road_types")?,
        num_resource_types: fields.get_u16("num_resource_types")?,
        num_goods_types: fields.get_u16("num_goods_types")?,
        num_disaster_types: fields.get_u16("num_disaster_types")?,
        num_achievement_types: fields.get_u16("num_achievement_types")?,
        num_multipliers: fields.get_u16("num_multipliers")?,
        num_styles: fields.get_u16("num_styles")?,
        num_music_styles: fields.get_u16("num_music_styles")?,
        government_count: fields.get_u16("government_count")?,
        nation_count: fields.get_u16("nation_count")?,
        num_city_styles: fields.get_u16("num_city_styles")?,
        terrain_count: fields.get_u16("terrain_count")?,
        num_specialist_types: fields.get_u16("num_specialist_types")?,
        num_nation_groups: fields.get_u16("num_nation_groups")?,
        num_nation_sets: fields.get_u16("num_nation_sets")?,
        preferred_tileset: fields.get_str("preferred_tileset")?.to_string(),
        preferred_soundset: fields.get_str("preferred_soundset")?.to_string(),
        preferred_musicset: fields.get_str("preferred_musicset")?.to_string(),
        popup_tech_help: fields.get_bool("popup_tech_help")?,
        name: fields.get_str("name")?.to_string(),
        version: fields.get_str("version")?.to_string(),
        alt_dir: fields.get_str("alt_dir")?.to_string(),
        desc_length: fields.get_u32("desc_length")?,
        num_counters: fields.get_u16("num_counters")?,
    };

    info!(
        name = %ruleset.name,
        version = %ruleset.version,
        units = ruleset.num_unit_types,
        techs = ruleset.num_tech_types,
        nations = ruleset.nation_count,
        "ruleset control received",
    );

    state.ruleset_control = Some(ruleset);
    state.ruleset_description_parts.clear();
    state.ruleset_description = None;
    Ok(())
}

pub fn handle_ruleset_summary(state: &mut GameState, fields: &PacketFields) -> Result<()> {
    let text = fields.get_str("text")?.to_string();
    info!(bytes = text.len(), "ruleset summary received");
    state.ruleset_summary = Some(text);
    Ok(())
}

/// Accumulates chunks until their combined UTF-8 byte length reaches the
/// `desc_length` declared by the preceding `RULESET_CONTROL`, then joins
/// them into the final description and clears the accumulator.
pub fn handle_ruleset_description_part(state: &mut GameState, fields: &PacketFields) -> Result<()> {
    let chunk = fields.get_str("text")?.to_string();
    state.ruleset_description_parts.push(chunk);

    let total_bytes: usize = state.ruleset_description_parts.iter().map(|p| p.len()).sum();

    let Some(control) = state.ruleset_control.as_ref() else {
        warn!(parts = state.ruleset_description_parts.len(), total_bytes, "description part before ruleset control");
        return Ok(());
    };

    let expected = control.desc_length as usize;
    if total_bytes >= expected {
        let complete = state.assemble_ruleset_description().to_string();
        state.ruleset_description_parts.clear();
        info!(chars = complete.len(), "ruleset description assembly complete");
    }
    Ok(())
}

pub fn handle_ruleset_game(state: &mut GameState, fields: &PacketFields) -> Result<()> {
    let ruleset_game = RulesetGame {
        default_specialist: fields.get_u16("default_specialist")?,
        global_init_techs_count: fields.get_u16("global_init_techs_count")?,
        global_init_techs: fields.get_u16_array("global_init_techs")?.to_vec(),
        global_init_buildings_count: fields.get_u16("global_init_buildings_count")?,
        global_init_buildings: fields.get_u16_array("global_init_buildings")?.to_vec(),
        veteran_levels: fields.get_u8("veteran_levels")?,
        veteran_name: fields.get_str_array("veteran_name")?.to_vec(),
        power_fact: fields.get_u16_array("power_fact")?.to_vec(),
        move_bonus: fields.get_u32_array("move_bonus")?.to_vec(),
        base_raise_chance: fields.get_u8_array("base_raise_chance")?.to_vec(),
        work_raise_chance: fields.get_u8_array("work_raise_chance")?.to_vec(),
        background_red: fields.get_u8("background_red")?,
        background_green: fields.get_u8("background_green")?,
        background_blue: fields.get_u8("background_blue")?,
    };

    info!(
        default_specialist = ruleset_game.default_specialist,
        veteran_levels = ruleset_game.veteran_levels,
        "ruleset game configuration received",
    );

    state.ruleset_game = Some(ruleset_game);
    Ok(())
}

/// Bit position to display name, in bit order; mirrors
/// [`crate::game_state::DISASTER_EFFECT_NAMES`].
fn effect_names(effects: u8) -> Vec<&'static str> {
    crate::game_state::DISASTER_EFFECT_NAMES
        .iter()
        .enumerate()
        .filter(|(bit, _)| effects & (1 << bit) != 0)
        .map(|(_, name)| *name)
        .collect()
}

pub fn handle_ruleset_disaster(state: &mut GameState, fields: &PacketFields) -> Result<()> {
    let disaster = DisasterType {
        id: fields.get_u8("id")?,
        name: fields.get_str("name")?.to_string(),
        rule_name: fields.get_str("rule_name")?.to_string(),
        reqs_count: fields.get_u8("reqs_count")?,
        reqs: fields.get_requirement_array("reqs")?.to_vec(),
        frequency: fields.get_u16("frequency")?,
        effects: fields.get_u8("effects")?,
    };

    info!(
        id = disaster.id,
        name = %disaster.name,
        frequency = disaster.frequency,
        effects = %effect_names(disaster.effects).join(", "),
        "disaster type received",
    );

    state.disasters.insert(disaster.id, disaster);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::RequirementRecord;
    use crate::value::FieldValue;

    #[test]
    fn description_assembles_once_length_reached() {
        let mut state = GameState::new();
        let mut control_fields = default_control_fields();
        control_fields
            .iter_mut()
            .find(|(n, _)| *n == "desc_length")
            .map(|(_, v)| *v = FieldValue::U32(5));
        let control_fields = PacketFields::from_pairs(control_fields);
        handle_ruleset_control(&mut state, &control_fields).unwrap();

        let mut part1 = PacketFields::new();
        part1.push("text", FieldValue::Str("ab".into()));
        handle_ruleset_description_part(&mut state, &part1).unwrap();
        assert!(state.ruleset_description.is_none());

        let mut part2 = PacketFields::new();
        part2.push("text", FieldValue::Str("cde".into()));
        handle_ruleset_description_part(&mut state, &part2).unwrap();
        assert_eq!(state.ruleset_description.as_deref(), Some("abcde"));
        assert!(state.ruleset_description_parts.is_empty());
    }

    #[test]
    fn disaster_effects_decode_to_names() {
        let mut state = GameState::new();
        let mut fields = PacketFields::new();
        fields.push("id", FieldValue::U8(1));
        fields.push("name", FieldValue::Str("Fire".into()));
        fields.push("rule_name", FieldValue::Str("fire".into()));
        fields.push("reqs_count", FieldValue::U8(0));
        fields.push("reqs", FieldValue::RequirementArray(Vec::<RequirementRecord>::new()));
        fields.push("frequency", FieldValue::U16(5));
        fields.push("effects", FieldValue::U8(0b101));

        handle_ruleset_disaster(&mut state, &fields).unwrap();
        assert_eq!(effect_names(0b101), vec!["DestroyBuilding", "EmptyFoodStock"]);
        assert!(state.disasters.contains_key(&1));
    }

    fn default_control_fields() -> Vec<(String, FieldValue)> {
        vec![
            ("num_unit_classes", FieldValue::U16(0)),
            ("num_unit_types", FieldValue::U16(0)),
            ("num_impr_types", FieldValue::U16(0)),
            ("num_tech_classes", FieldValue::U16(0)),
            ("num_tech_types", FieldValue::U16(0)),
            ("num_extra_types", FieldValue::U16(0)),
            ("num_base_types", FieldValue::U16(0)),
            ("num_road_types", FieldValue::U16(0)),
            ("num_resource_types", FieldValue::U16(0)),
            ("num_goods_types", FieldValue::U16(0)),
            ("num_disaster_types", FieldValue::U16(0)),
            ("num_achievement_types", FieldValue::U16(0)),
            ("num_multipliers", FieldValue::U16(0)),
            ("num_styles", FieldValue::U16(0)),
            ("num_music_styles", FieldValue::U16(0)),
            ("government_count", FieldValue::U16(0)),
            ("nation_count", FieldValue::U16(0)),
            ("num_city_styles", FieldValue::U16(0)),
            ("terrain_count", FieldValue::U16(0)),
            ("num_specialist_types", FieldValue::U16(0)),
            ("num_nation_groups", FieldValue::U16(0)),
            ("num_nation_sets", FieldValue::U16(0)),
            ("preferred_tileset", FieldValue::Str(String::new())),
            ("preferred_soundset", FieldValue::Str(String::new())),
            ("preferred_musicset", FieldValue::Str(String::new())),
            ("popup_tech_help", FieldValue::Bool(false)),
            ("name", FieldValue::Str("Civ2Civ3".into())),
            ("version", FieldValue::Str("3.3".into())),
            ("alt_dir", FieldValue::Str(String::new())),
            ("desc_length", FieldValue::U32(0)),
            ("num_counters", FieldValue::U16(0)),
        ]
        .into_iter()
        .map(|(n, v)| (n.to_string(), v))
        .collect()
    }
}
