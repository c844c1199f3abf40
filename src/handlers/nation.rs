//! Handlers for nation-related ruleset packets: `RULESET_NATION_SETS`,
//! `RULESET_NATION_GROUPS`, `RULESET_NATION`, and `NATION_AVAILABILITY`.

use crate::error::Result;
use crate::game_state::{GameState, Nation, NationAvailability, NationGroup, NationSet};
use crate::value::PacketFields;
use tracing::info;

pub fn handle_ruleset_nation_sets(state: &mut GameState, fields: &PacketFields) -> Result<()> {
    let names = fields.get_str_array("names")?;
    let rule_names = fields.get_str_array("rule_names")?;
    let descriptions = fields.get_str_array("descriptions")?;

    let nation_sets: Vec<NationSet> = names
        .iter()
        .zip(rule_names.iter())
        .zip(descriptions.iter())
        .map(|((name, rule_name), description)| NationSet {
            name: name.clone(),
            rule_name: rule_name.clone(),
            description: description.clone(),
        })
        .collect();

    info!(count = nation_sets.len(), "nation sets received");
    state.nation_sets = nation_sets;
    Ok(())
}

pub fn handle_ruleset_nation_groups(state: &mut GameState, fields: &PacketFields) -> Result<()> {
    let names = fields.get_str_array("groups")?;
    let hidden = fields.get_bool_array("hidden")?;

    let nation_groups: Vec<NationGroup> = names
        .iter()
        .zip(hidden.iter())
        .map(|(name, hidden)| NationGroup { name: name.clone(), hidden: *hidden })
        .collect();

    info!(count = nation_groups.len(), "nation groups received");
    state.nation_groups = nation_groups;
    Ok(())
}

pub fn handle_ruleset_nation(state: &mut GameState, fields: &PacketFields) -> Result<()> {
    let nation = Nation {
        id: fields.get_u16("id")?,
        translation_domain: fields.get_str("translation_domain")?.to_string(),
        adjective: fields.get_str("adjective")?.to_string(),
        rule_name: fields.get_str("rule_name")?.to_string(),
        noun_plural: fields.get_str("noun_plural")?.to_string(),
        graphic_str: fields.get_str("graphic_str")?.to_string(),
        graphic_alt: fields.get_str("graphic_alt")?.to_string(),
        legend: fields.get_str("legend")?.to_string(),
        style: fields.get_u8("style")?,
        leader_count: fields.get_u16("leader_count")?,
        leader_name: fields.get_str_array("leader_name")?.to_vec(),
        leader_is_male: fields.get_bool_array("leader_is_male")?.to_vec(),
        is_playable: fields.get_bool("is_playable")?,
        barbarian_type: fields.get_u8("barbarian_type")?,
        nsets: fields.get_u16("nsets")?,
        sets: fields.get_u16_array("sets")?.to_vec(),
        ngroups: fields.get_u16("ngroups")?,
        groups: fields.get_u16_array("groups")?.to_vec(),
        init_government_id: fields.get_i16("init_government_id")?,
        init_techs_count: fields.get_u16("init_techs_count")?,
        init_techs: fields.get_u16_array("init_techs")?.to_vec(),
        init_units_count: fields.get_u16("init_units_count")?,
        init_units: fields.get_u16_array("init_units")?.to_vec(),
        init_buildings_count: fields.get_u16("init_buildings_count")?,
        init_buildings: fields.get_u16_array("init_buildings")?.to_vec(),
    };

    info!(id = nation.id, adjective = %nation.adjective, "nation received");
    state.nations.insert(nation.id, nation);
    Ok(())
}

pub fn handle_nation_availability(state: &mut GameState, fields: &PacketFields) -> Result<()> {
    let availability = NationAvailability {
        ncount: fields.get_u16("ncount")?,
        is_pickable: fields.get_bool_array("is_pickable")?.to_vec(),
        nationset_change: fields.get_bool("nationset_change")?,
    };

    let available_count = availability.is_pickable.iter().filter(|&&p| p).count();
    info!(
        available = available_count,
        total = availability.ncount,
        nationset_change = availability.nationset_change,
        "nation availability updated",
    );

    state.nation_availability = Some(availability);
    Ok(())
}
