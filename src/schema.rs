//! Declarative per-packet-type field lists: the "schema is data" table the
//! delta decoder is driven by.

use crate::value::{FieldValue, WireType};
use std::collections::HashMap;
use std::sync::LazyLock;

/// Well-known packet-type numbers referenced by the registry and the
/// handshake state machine.
///
/// Values confirmed against the source client and its handler docstrings
/// are noted as such; a few (`SERVER_INFO`, `CHAT_MSG`, `RULESET_SUMMARY`,
/// `RULESET_DESCRIPTION_PART`) were never given an explicit number in the
/// retrieved source and are placeholders pending validation against a real
/// server capture (see `DESIGN.md`).
pub mod packet_type {
    pub const PROCESSING_STARTED: u16 = 0;
    pub const PROCESSING_FINISHED: u16 = 1;
    pub const SERVER_JOIN_REQ: u16 = 4;
    pub const SERVER_JOIN_REPLY: u16 = 5;
    /// Placeholder: not given an explicit number in the source corpus.
    pub const SERVER_INFO: u16 = 6;
    pub const GAME_INFO: u16 = 16;
    /// Placeholder: not given an explicit number in the source corpus.
    pub const CHAT_MSG: u16 = 25;
    pub const FREEZE_CLIENT: u16 = 130;
    pub const THAW_CLIENT: u16 = 131;
    /// Placeholder: not given an explicit number in the source corpus.
    pub const RULESET_SUMMARY: u16 = 139;
    /// Placeholder: not given an explicit number in the source corpus.
    pub const RULESET_DESCRIPTION_PART: u16 = 140;
    pub const RULESET_GAME: u16 = 141;
    pub const RULESET_NATION_GROUPS: u16 = 147;
    pub const RULESET_NATION: u16 = 148;
    pub const RULESET_CONTROL: u16 = 155;
    pub const RULESET_DISASTER: u16 = 224;
    pub const RULESET_NATION_SETS: u16 = 236;
    pub const NATION_AVAILABILITY: u16 = 237;
    pub const RULESET_CLAUSE: u16 = 512;
}

/// Specification for a single packet field.
#[derive(Clone, Debug)]
pub struct FieldSpec {
    /// Field name, used as the key in the decoded [`crate::value::PacketFields`].
    pub name: &'static str,
    /// Wire type of a scalar field, or of one array element.
    pub wire_type: WireType,
    /// Participates in the cache key; always transmitted, never represented
    /// in the bitvector.
    pub is_key: bool,
    /// Boolean header folding: the value is carried entirely by its
    /// bitvector bit and consumes zero payload bytes.
    pub is_bool_foldable: bool,
    /// Whether this field is an array.
    pub is_array: bool,
    /// Fixed maximum element count, used by `array_diff` fields. Zero when
    /// the count instead comes from `count_field`.
    pub array_size: usize,
    /// Array-diff encoding: `(index, value)` pairs terminated by a
    /// sentinel, rather than a flat fixed-size run of elements.
    pub array_diff: bool,
    /// For non-diff variable-length arrays (and `REQUIREMENT` arrays): the
    /// name of an earlier sibling field in the same packet whose decoded
    /// value gives this array's element count. No length prefix of its own
    /// is read from the payload.
    pub count_field: Option<&'static str>,
}

impl FieldSpec {
    /// A plain scalar field.
    pub const fn scalar(name: &'static str, wire_type: WireType) -> Self {
        FieldSpec {
            name,
            wire_type,
            is_key: false,
            is_bool_foldable: false,
            is_array: false,
            array_size: 0,
            array_diff: false,
            count_field: None,
        }
    }

    /// A key field: always transmitted, participates in the cache key.
    pub const fn key(name: &'static str, wire_type: WireType) -> Self {
        FieldSpec { is_key: true, ..FieldSpec::scalar(name, wire_type) }
    }

    /// A boolean field using header folding. Only meaningful on
    /// delta-encoded packets: the bitvector bit itself carries the value,
    /// so the field consumes zero payload bytes.
    pub const fn folded_bool(name: &'static str) -> Self {
        FieldSpec { is_bool_foldable: true, ..FieldSpec::scalar(name, WireType::Bool8) }
    }

    /// A fixed-size array, transmitted in full whenever its bit is set.
    pub const fn fixed_array(name: &'static str, element_type: WireType, array_size: usize) -> Self {
        FieldSpec {
            is_array: true,
            array_size,
            ..FieldSpec::scalar(name, element_type)
        }
    }

    /// An array-diff field: a large fixed-size array of which only a few
    /// entries typically change per update.
    pub const fn array_diff(name: &'static str, element_type: WireType, array_size: usize) -> Self {
        FieldSpec {
            is_array: true,
            array_size,
            array_diff: true,
            ..FieldSpec::scalar(name, element_type)
        }
    }

    /// A variable-length array whose element count is the value of an
    /// already-decoded sibling field (e.g. `leader_name` sized by
    /// `leader_count`, or a `REQUIREMENT` array sized by a `*_reqs_count`
    /// field).
    pub const fn counted_array(
        name: &'static str,
        element_type: WireType,
        count_field: &'static str,
    ) -> Self {
        FieldSpec {
            is_array: true,
            count_field: Some(count_field),
            ..FieldSpec::scalar(name, element_type)
        }
    }

    /// The typed zero value used when a field is absent from both the
    /// payload and the delta cache.
    pub fn default_value(&self) -> FieldValue {
        if self.is_array {
            return match self.wire_type {
                WireType::Bool8 => FieldValue::BoolArray(Vec::new()),
                WireType::Uint8 => FieldValue::U8Array(Vec::new()),
                WireType::Sint8 => FieldValue::I8Array(Vec::new()),
                WireType::Uint16 | WireType::Sint16 => FieldValue::U16Array(Vec::new()),
                WireType::Uint32 => FieldValue::U32Array(Vec::new()),
                WireType::Sint32 => FieldValue::I32Array(Vec::new()),
                WireType::String => FieldValue::StrArray(Vec::new()),
                WireType::Requirement => FieldValue::RequirementArray(Vec::new()),
            };
        }
        match self.wire_type {
            WireType::Uint8 => FieldValue::U8(0),
            WireType::Sint8 => FieldValue::I8(-1),
            WireType::Bool8 => FieldValue::Bool(false),
            WireType::Uint16 => FieldValue::U16(0),
            WireType::Sint16 => FieldValue::I16(-1),
            WireType::Uint32 => FieldValue::U32(0),
            WireType::Sint32 => FieldValue::I32(-1),
            WireType::String => FieldValue::Str(String::new()),
            WireType::Requirement => FieldValue::Requirement(Default::default()),
        }
    }

    /// The default value of a single array element, used to fill an
    /// array-diff field's baseline when no cached array of the right
    /// length exists.
    pub fn default_element(&self) -> FieldValue {
        match self.wire_type {
            WireType::Uint8 => FieldValue::U8(0),
            WireType::Sint8 => FieldValue::I8(-1),
            WireType::Bool8 => FieldValue::Bool(false),
            WireType::Uint16 => FieldValue::U16(0),
            WireType::Sint16 => FieldValue::I16(-1),
            WireType::Uint32 => FieldValue::U32(0),
            WireType::Sint32 => FieldValue::I32(-1),
            WireType::String => FieldValue::Str(String::new()),
            WireType::Requirement => FieldValue::Requirement(Default::default()),
        }
    }
}

/// Complete specification for a packet type.
#[derive(Clone, Debug)]
pub struct PacketSpec {
    /// Numeric packet type.
    pub packet_type: u16,
    /// Human-readable name, for logging.
    pub name: &'static str,
    /// Whether this packet type is delta-encoded. Packets with
    /// `has_delta = false` (e.g. the handshake packets) carry every field
    /// directly, in order, with no bitvector and no cache interaction.
    pub has_delta: bool,
    /// Fields in declared wire order.
    pub fields: &'static [FieldSpec],
}

impl PacketSpec {
    /// Key fields, in declared order.
    pub fn key_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| f.is_key)
    }

    /// Non-key (delta-encoded) fields, in declared order.
    pub fn non_key_fields(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter().filter(|f| !f.is_key)
    }

    /// Number of bits the bitvector must carry.
    pub fn bitvector_bit_count(&self) -> usize {
        self.non_key_fields().count()
    }

    /// Number of bytes the bitvector occupies on the wire.
    pub fn bitvector_byte_count(&self) -> usize {
        self.bitvector_bit_count().div_ceil(8)
    }

    /// Declared field order (key and non-key, as on the wire), for
    /// introspection/testing.
    pub fn field_order(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }
}

use WireType::*;

static CHAT_MSG_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("message", String),
    FieldSpec::scalar("tile", Sint32),
    FieldSpec::scalar("event", Sint16),
    FieldSpec::scalar("turn", Sint32),
    FieldSpec::scalar("phase", Sint16),
    FieldSpec::scalar("conn_id", Sint32),
];

static SERVER_JOIN_REQ_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("username", String),
    FieldSpec::scalar("capability", String),
    FieldSpec::scalar("version_label", String),
    FieldSpec::scalar("major", Uint32),
    FieldSpec::scalar("minor", Uint32),
    FieldSpec::scalar("patch", Uint32),
];

static SERVER_JOIN_REPLY_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("you_can_join", Bool8),
    FieldSpec::scalar("message", String),
    FieldSpec::scalar("capability", String),
    FieldSpec::scalar("challenge_file", String),
];

static SERVER_INFO_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("version_label", String),
    FieldSpec::scalar("major_version", Uint32),
    FieldSpec::scalar("minor_version", Uint32),
    FieldSpec::scalar("patch_version", Uint32),
    FieldSpec::scalar("emerg_version", Uint32),
];

/// `A_LAST`: the observed maximum tech-advance count in the source
/// client's `global_advances` array.
pub const A_LAST: usize = 401;
/// `B_LAST`: the observed maximum wonder count in the source client's
/// `great_wonder_owners` array.
pub const B_LAST: usize = 200;

static GAME_INFO_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("global_advance_count", Uint16),
    FieldSpec::array_diff("global_advances", Bool8, A_LAST),
    FieldSpec::array_diff("great_wonder_owners", Sint8, B_LAST),
];

static RULESET_CONTROL_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("num_unit_classes", Uint16),
    FieldSpec::scalar("num_unit_types", Uint16),
    FieldSpec::scalar("num_impr_types", Uint16),
    FieldSpec::scalar("num_tech_classes", Uint16),
    FieldSpec::scalar("num_tech_types", Uint16),
    FieldSpec::scalar("num_extra_types", Uint16),
    FieldSpec::scalar("num_base_types", Uint16),
    FieldSpec::scalar("num_road_types", Uint16),
    FieldSpec::scalar("num_resource_types", Uint16),
    FieldSpec::scalar("num_goods_types", Uint16),
    FieldSpec::scalar("num_disaster_types", Uint16),
    FieldSpec::scalar("num_achievement_types", Uint16),
    FieldSpec::scalar("num_multipliers", Uint16),
    FieldSpec::scalar("num_styles", Uint16),
    FieldSpec::scalar("num_music_styles", Uint16),
    FieldSpec::scalar("government_count", Uint16),
    FieldSpec::scalar("nation_count", Uint16),
    FieldSpec::scalar("num_city_styles", Uint16),
    FieldSpec::scalar("terrain_count", Uint16),
    FieldSpec::scalar("num_specialist_types", Uint16),
    FieldSpec::scalar("num_nation_groups", Uint16),
    FieldSpec::scalar("num_nation_sets", Uint16),
    FieldSpec::scalar("preferred_tileset", String),
    FieldSpec::scalar("preferred_soundset", String),
    FieldSpec::scalar("preferred_musicset", String),
    FieldSpec::folded_bool("popup_tech_help"),
    FieldSpec::scalar("name", String),
    FieldSpec::scalar("version", String),
    FieldSpec::scalar("alt_dir", String),
    FieldSpec::scalar("desc_length", Uint32),
    FieldSpec::scalar("num_counters", Uint16),
];

static RULESET_SUMMARY_FIELDS: &[FieldSpec] = &[FieldSpec::scalar("text", String)];
static RULESET_DESCRIPTION_PART_FIELDS: &[FieldSpec] = &[FieldSpec::scalar("text", String)];

static RULESET_NATION_SETS_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("nsets", Uint32),
    FieldSpec::counted_array("names", String, "nsets"),
    FieldSpec::counted_array("rule_names", String, "nsets"),
    FieldSpec::counted_array("descriptions", String, "nsets"),
];

static RULESET_NATION_GROUPS_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("ngroups", Uint32),
    FieldSpec::counted_array("groups", String, "ngroups"),
    FieldSpec::counted_array("hidden", Bool8, "ngroups"),
];

static RULESET_NATION_FIELDS: &[FieldSpec] = &[
    FieldSpec::key("id", Uint16),
    FieldSpec::scalar("translation_domain", String),
    FieldSpec::scalar("adjective", String),
    FieldSpec::scalar("rule_name", String),
    FieldSpec::scalar("noun_plural", String),
    FieldSpec::scalar("graphic_str", String),
    FieldSpec::scalar("graphic_alt", String),
    FieldSpec::scalar("legend", String),
    FieldSpec::scalar("style", Uint8),
    FieldSpec::scalar("leader_count", Uint16),
    FieldSpec::counted_array("leader_name", String, "leader_count"),
    FieldSpec::counted_array("leader_is_male", Bool8, "leader_count"),
    FieldSpec::scalar("is_playable", Bool8),
    FieldSpec::scalar("barbarian_type", Uint8),
    FieldSpec::scalar("nsets", Uint16),
    FieldSpec::counted_array("sets", Uint16, "nsets"),
    FieldSpec::scalar("ngroups", Uint16),
    FieldSpec::counted_array("groups", Uint16, "ngroups"),
    FieldSpec::scalar("init_government_id", Sint16),
    FieldSpec::scalar("init_techs_count", Uint16),
    FieldSpec::counted_array("init_techs", Uint16, "init_techs_count"),
    FieldSpec::scalar("init_units_count", Uint16),
    FieldSpec::counted_array("init_units", Uint16, "init_units_count"),
    FieldSpec::scalar("init_buildings_count", Uint16),
    FieldSpec::counted_array("init_buildings", Uint16, "init_buildings_count"),
];

static NATION_AVAILABILITY_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("ncount", Uint16),
    FieldSpec::counted_array("is_pickable", Bool8, "ncount"),
    FieldSpec::scalar("nationset_change", Bool8),
];

static RULESET_GAME_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("default_specialist", Uint16),
    FieldSpec::scalar("global_init_techs_count", Uint16),
    FieldSpec::counted_array("global_init_techs", Uint16, "global_init_techs_count"),
    FieldSpec::scalar("global_init_buildings_count", Uint16),
    FieldSpec::counted_array("global_init_buildings", Uint16, "global_init_buildings_count"),
    FieldSpec::scalar("veteran_levels", Uint8),
    FieldSpec::counted_array("veteran_name", String, "veteran_levels"),
    FieldSpec::counted_array("power_fact", Uint16, "veteran_levels"),
    FieldSpec::counted_array("move_bonus", Uint32, "veteran_levels"),
    FieldSpec::counted_array("base_raise_chance", Uint8, "veteran_levels"),
    FieldSpec::counted_array("work_raise_chance", Uint8, "veteran_levels"),
    FieldSpec::scalar("background_red", Uint8),
    FieldSpec::scalar("background_green", Uint8),
    FieldSpec::scalar("background_blue", Uint8),
];

static RULESET_DISASTER_FIELDS: &[FieldSpec] = &[
    FieldSpec::key("id", Uint8),
    FieldSpec::scalar("name", String),
    FieldSpec::scalar("rule_name", String),
    FieldSpec::scalar("reqs_count", Uint8),
    FieldSpec::counted_array("reqs", Requirement, "reqs_count"),
    FieldSpec::scalar("frequency", Uint16),
    FieldSpec::scalar("effects", Uint8),
];

static RULESET_CLAUSE_FIELDS: &[FieldSpec] = &[
    FieldSpec::scalar("type", Uint8),
    FieldSpec::folded_bool("enabled"),
    FieldSpec::scalar("giver_reqs_count", Uint8),
    FieldSpec::counted_array("giver_reqs", Requirement, "giver_reqs_count"),
    FieldSpec::scalar("receiver_reqs_count", Uint8),
    FieldSpec::counted_array("receiver_reqs", Requirement, "receiver_reqs_count"),
];

/// The process-wide, immutable packet schema registry.
pub static REGISTRY: LazyLock<HashMap<u16, PacketSpec>> = LazyLock::new(|| {
    use packet_type::*;
    let specs = [
        PacketSpec { packet_type: PROCESSING_STARTED, name: "PROCESSING_STARTED", has_delta: false, fields: &[] },
        PacketSpec { packet_type: PROCESSING_FINISHED, name: "PROCESSING_FINISHED", has_delta: false, fields: &[] },
        PacketSpec { packet_type: SERVER_JOIN_REQ, name: "SERVER_JOIN_REQ", has_delta: false, fields: SERVER_JOIN_REQ_FIELDS },
        PacketSpec { packet_type: SERVER_JOIN_REPLY, name: "SERVER_JOIN_REPLY", has_delta: false, fields: SERVER_JOIN_REPLY_FIELDS },
        PacketSpec { packet_type: SERVER_INFO, name: "SERVER_INFO", has_delta: true, fields: SERVER_INFO_FIELDS },
        PacketSpec { packet_type: GAME_INFO, name: "GAME_INFO", has_delta: true, fields: GAME_INFO_FIELDS },
        PacketSpec { packet_type: CHAT_MSG, name: "CHAT_MSG", has_delta: true, fields: CHAT_MSG_FIELDS },
        PacketSpec { packet_type: FREEZE_CLIENT, name: "FREEZE_CLIENT", has_delta: false, fields: &[] },
        PacketSpec { packet_type: THAW_CLIENT, name: "THAW_CLIENT", has_delta: false, fields: &[] },
        PacketSpec { packet_type: RULESET_SUMMARY, name: "RULESET_SUMMARY", has_delta: false, fields: RULESET_SUMMARY_FIELDS },
        PacketSpec { packet_type: RULESET_DESCRIPTION_PART, name: "RULESET_DESCRIPTION_PART", has_delta: false, fields: RULESET_DESCRIPTION_PART_FIELDS },
        PacketSpec { packet_type: RULESET_GAME, name: "RULESET_GAME", has_delta: true, fields: RULESET_GAME_FIELDS },
        PacketSpec { packet_type: RULESET_NATION_GROUPS, name: "RULESET_NATION_GROUPS", has_delta: false, fields: RULESET_NATION_GROUPS_FIELDS },
        PacketSpec { packet_type: RULESET_NATION, name: "RULESET_NATION", has_delta: false, fields: RULESET_NATION_FIELDS },
        PacketSpec { packet_type: RULESET_CONTROL, name: "RULESET_CONTROL", has_delta: true, fields: RULESET_CONTROL_FIELDS },
        PacketSpec { packet_type: RULESET_DISASTER, name: "RULESET_DISASTER", has_delta: true, fields: RULESET_DISASTER_FIELDS },
        PacketSpec { packet_type: RULESET_NATION_SETS, name: "RULESET_NATION_SETS", has_delta: false, fields: RULESET_NATION_SETS_FIELDS },
        PacketSpec { packet_type: NATION_AVAILABILITY, name: "NATION_AVAILABILITY", has_delta: false, fields: NATION_AVAILABILITY_FIELDS },
        PacketSpec { packet_type: RULESET_CLAUSE, name: "RULESET_CLAUSE", has_delta: true, fields: RULESET_CLAUSE_FIELDS },
    ];
    specs.into_iter().map(|s| (s.packet_type, s)).collect()
});

/// Look up a packet's schema by its numeric type, if registered.
pub fn lookup(packet_type: u16) -> Option<&'static PacketSpec> {
    REGISTRY.get(&packet_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_msg_bitvector_is_six_bits() {
        let spec = lookup(packet_type::CHAT_MSG).unwrap();
        assert_eq!(spec.bitvector_bit_count(), 6);
        assert_eq!(spec.bitvector_byte_count(), 1);
    }

    #[test]
    fn ruleset_clause_key_fields_are_empty() {
        let spec = lookup(packet_type::RULESET_CLAUSE).unwrap();
        assert_eq!(spec.key_fields().count(), 0);
    }

    #[test]
    fn ruleset_nation_has_one_key_field() {
        let spec = lookup(packet_type::RULESET_NATION).unwrap();
        let keys: Vec<_> = spec.key_fields().map(|f| f.name).collect();
        assert_eq!(keys, vec!["id"]);
    }

    #[test]
    fn game_info_bitvector_bit_count() {
        let spec = lookup(packet_type::GAME_INFO).unwrap();
        assert_eq!(spec.bitvector_bit_count(), 3);
    }
}
