//! Delta decoding: the `bitvector + per-field change list` layer that sits
//! on top of the plain primitive codec for packets whose schema has
//! `has_delta = true`.
//!
//! Packets with `has_delta = false` skip this module entirely; their
//! fields are read directly, in declared order, by [`crate::connection`].

use crate::cache::DeltaCache;
use crate::error::{Error, Result};
use crate::primitive::{ReadFromBytes, RequirementRecord, WriteToBytes};
use crate::schema::{FieldSpec, PacketSpec};
use crate::value::{FieldValue, PacketFields, WireType};
use byteorder::{ReadBytesExt, WriteBytesExt, BE};
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

fn truncated(packet_type: u16, reason: impl Into<String>) -> Error {
    Error::Truncated { packet_type, reason: reason.into() }
}

fn malformed(packet_type: u16, offset: usize, reason: impl Into<String>) -> Error {
    Error::MalformedPacket { packet_type, offset, reason: reason.into() }
}

fn io_err(packet_type: u16, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        truncated(packet_type, e.to_string())
    } else {
        Error::Io(e)
    }
}

/// Read one scalar value of `wire_type` from `cursor`.
fn read_scalar<R: Read>(cursor: &mut R, wire_type: WireType, packet_type: u16) -> Result<FieldValue> {
    let v = match wire_type {
        WireType::Uint8 => FieldValue::U8(u8::read_from_bytes(cursor).map_err(|e| io_err(packet_type, e))?),
        WireType::Sint8 => FieldValue::I8(i8::read_from_bytes(cursor).map_err(|e| io_err(packet_type, e))?),
        WireType::Bool8 => FieldValue::Bool(cursor.read_u8().map_err(|e| io_err(packet_type, e))? != 0),
        WireType::Uint16 => FieldValue::U16(u16::read_from_bytes(cursor).map_err(|e| io_err(packet_type, e))?),
        WireType::Sint16 => FieldValue::I16(i16::read_from_bytes(cursor).map_err(|e| io_err(packet_type, e))?),
        WireType::Uint32 => FieldValue::U32(u32::read_from_bytes(cursor).map_err(|e| io_err(packet_type, e))?),
        WireType::Sint32 => FieldValue::I32(i32::read_from_bytes(cursor).map_err(|e| io_err(packet_type, e))?),
        WireType::String => FieldValue::Str(String::read_from_bytes(cursor).map_err(|e| io_err(packet_type, e))?),
        WireType::Requirement => {
            FieldValue::Requirement(RequirementRecord::read_from_bytes(cursor).map_err(|e| io_err(packet_type, e))?)
        }
    };
    Ok(v)
}

fn write_scalar<W: Write>(writer: &mut W, value: &FieldValue) -> Result<()> {
    match value {
        FieldValue::U8(v) => v.write_to_bytes(writer)?,
        FieldValue::I8(v) => v.write_to_bytes(writer)?,
        FieldValue::Bool(v) => writer.write_u8(*v as u8)?,
        FieldValue::U16(v) => v.write_to_bytes(writer)?,
        FieldValue::I16(v) => v.write_to_bytes(writer)?,
        FieldValue::U32(v) => v.write_to_bytes(writer)?,
        FieldValue::I32(v) => v.write_to_bytes(writer)?,
        FieldValue::Str(v) => v.write_to_bytes(writer)?,
        FieldValue::Requirement(v) => v.write_to_bytes(writer)?,
        _ => unreachable!("write_scalar called on an array value"),
    }
    Ok(())
}

/// Read `count` scalar elements and wrap them into the array [`FieldValue`]
/// variant matching `wire_type`.
fn read_element_run<R: Read>(
    cursor: &mut R,
    wire_type: WireType,
    count: usize,
    packet_type: u16,
) -> Result<FieldValue> {
    Ok(match wire_type {
        WireType::Bool8 => {
            let mut v = Vec::with_capacity(count);
            for _ in 0..count {
                v.push(cursor.read_u8().map_err(|e| io_err(packet_type, e))? != 0);
            }
            FieldValue::BoolArray(v)
        }
        WireType::Uint8 => {
            let mut v = Vec::with_capacity(count);
            for _ in 0..count {
                v.push(u8::read_from_bytes(&mut *cursor).map_err(|e| io_err(packet_type, e))?);
            }
            FieldValue::U8Array(v)
        }
        WireType::Sint8 => {
            let mut v = Vec::with_capacity(count);
            for _ in 0..count {
                v.push(i8::read_from_bytes(&mut *cursor).map_err(|e| io_err(packet_type, e))?);
            }
            FieldValue::I8Array(v)
        }
        WireType::Uint16 | WireType::Sint16 => {
            let mut v = Vec::with_capacity(count);
            for _ in 0..count {
                v.push(u16::read_from_bytes(&mut *cursor).map_err(|e| io_err(packet_type, e))?);
            }
            FieldValue::U16Array(v)
        }
        WireType::Uint32 => {
            let mut v = Vec::with_capacity(count);
            for _ in 0..count {
                v.push(u32::read_from_bytes(&mut *cursor).map_err(|e| io_err(packet_type, e))?);
            }
            FieldValue::U32Array(v)
        }
        WireType::Sint32 => {
            let mut v = Vec::with_capacity(count);
            for _ in 0..count {
                v.push(i32::read_from_bytes(&mut *cursor).map_err(|e| io_err(packet_type, e))?);
            }
            FieldValue::I32Array(v)
        }
        WireType::String => {
            let mut v = Vec::with_capacity(count);
            for _ in 0..count {
                v.push(String::read_from_bytes(&mut *cursor).map_err(|e| io_err(packet_type, e))?);
            }
            FieldValue::StrArray(v)
        }
        WireType::Requirement => {
            let mut v = Vec::with_capacity(count);
            for _ in 0..count {
                v.push(RequirementRecord::read_from_bytes(&mut *cursor).map_err(|e| io_err(packet_type, e))?);
            }
            FieldValue::RequirementArray(v)
        }
    })
}

/// Explode an array [`FieldValue`] into a per-element vector of scalar
/// [`FieldValue`]s, for array-diff baseline manipulation.
fn array_to_elements(value: &FieldValue) -> Vec<FieldValue> {
    match value {
        FieldValue::BoolArray(v) => v.iter().map(|b| FieldValue::Bool(*b)).collect(),
        FieldValue::U8Array(v) => v.iter().map(|b| FieldValue::U8(*b)).collect(),
        FieldValue::I8Array(v) => v.iter().map(|b| FieldValue::I8(*b)).collect(),
        FieldValue::U16Array(v) => v.iter().map(|b| FieldValue::U16(*b)).collect(),
        FieldValue::U32Array(v) => v.iter().map(|b| FieldValue::U32(*b)).collect(),
        FieldValue::I32Array(v) => v.iter().map(|b| FieldValue::I32(*b)).collect(),
        FieldValue::StrArray(v) => v.iter().map(|b| FieldValue::Str(b.clone())).collect(),
        FieldValue::RequirementArray(v) => v.iter().map(|b| FieldValue::Requirement(*b)).collect(),
        other => vec![other.clone()],
    }
}

/// Re-pack a per-element vector of scalar [`FieldValue`]s into the array
/// variant for `wire_type`.
fn elements_to_array(elements: Vec<FieldValue>, wire_type: WireType) -> FieldValue {
    match wire_type {
        WireType::Bool8 => FieldValue::BoolArray(
            elements.into_iter().map(|e| matches!(e, FieldValue::Bool(true))).collect(),
        ),
        WireType::Uint8 => FieldValue::U8Array(
            elements
                .into_iter()
                .map(|e| match e {
                    FieldValue::U8(v) => v,
                    _ => unreachable!(),
                })
                .collect(),
        ),
        WireType::Sint8 => FieldValue::I8Array(
            elements
                .into_iter()
                .map(|e| match e {
                    FieldValue::I8(v) => v,
                    _ => unreachable!(),
                })
                .collect(),
        ),
        WireType::Uint16 | WireType::Sint16 => FieldValue::U16Array(
            elements
                .into_iter()
                .map(|e| match e {
                    FieldValue::U16(v) => v,
                    _ => unreachable!(),
                })
                .collect(),
        ),
        WireType::Uint32 => FieldValue::U32Array(
            elements
                .into_iter()
                .map(|e| match e {
                    FieldValue::U32(v) => v,
                    _ => unreachable!(),
                })
                .collect(),
        ),
        WireType::Sint32 => FieldValue::I32Array(
            elements
                .into_iter()
                .map(|e| match e {
                    FieldValue::I32(v) => v,
                    _ => unreachable!(),
                })
                .collect(),
        ),
        WireType::String => FieldValue::StrArray(
            elements
                .into_iter()
                .map(|e| match e {
                    FieldValue::Str(v) => v,
                    _ => unreachable!(),
                })
                .collect(),
        ),
        WireType::Requirement => FieldValue::RequirementArray(
            elements
                .into_iter()
                .map(|e| match e {
                    FieldValue::Requirement(v) => v,
                    _ => unreachable!(),
                })
                .collect(),
        ),
    }
}

/// Decode one array-diff field: a stream of `(index, value)` pairs applied
/// onto `baseline`, terminated by `index == baseline.len()`.
///
/// Mirrors the source client's array-diff sub-protocol exactly: the index
/// width is one byte when the array's declared size is at most 255,
/// otherwise a big-endian two-byte value.
fn decode_array_diff(
    cursor: &mut Cursor<&[u8]>,
    field: &FieldSpec,
    mut baseline: Vec<FieldValue>,
    packet_type: u16,
) -> Result<Vec<FieldValue>> {
    let array_size = field.array_size;
    let wide_index = array_size > 255;
    loop {
        let offset = cursor.position() as usize;
        let index = if wide_index {
            cursor.read_u16::<BE>().map_err(|e| io_err(packet_type, e))? as usize
        } else {
            cursor.read_u8().map_err(|e| io_err(packet_type, e))? as usize
        };
        if index == array_size {
            break;
        }
        if index > array_size {
            return Err(malformed(
                packet_type,
                offset,
                format!("array-diff index {index} exceeds array size {array_size} for field {:?}", field.name),
            ));
        }
        let value = read_scalar(cursor, field.wire_type, packet_type)?;
        if index >= baseline.len() {
            return Err(malformed(
                packet_type,
                offset,
                format!("array-diff index {index} outside baseline of length {} for field {:?}", baseline.len(), field.name),
            ));
        }
        baseline[index] = value;
    }
    Ok(baseline)
}

/// Encode an array-diff field against `baseline`, emitting only the
/// elements of `current` that differ.
fn encode_array_diff<W: Write>(
    writer: &mut W,
    field: &FieldSpec,
    baseline: &[FieldValue],
    current: &[FieldValue],
) -> Result<()> {
    let wide_index = field.array_size > 255;
    for (index, (old, new)) in baseline.iter().zip(current.iter()).enumerate() {
        if old == new {
            continue;
        }
        if wide_index {
            writer.write_u16::<BE>(index as u16)?;
        } else {
            writer.write_u8(index as u8)?;
        }
        write_scalar(writer, new)?;
    }
    if wide_index {
        writer.write_u16::<BE>(field.array_size as u16)?;
    } else {
        writer.write_u8(field.array_size as u8)?;
    }
    Ok(())
}

/// Read the bitvector: `num_bits` little-endian-ordered bits (bit 0 of byte
/// 0 is field index 0), packed into `ceil(num_bits / 8)` bytes.
fn read_bitvector(cursor: &mut Cursor<&[u8]>, num_bits: usize, packet_type: u16) -> Result<Vec<bool>> {
    let num_bytes = num_bits.div_ceil(8);
    let mut bytes = vec![0u8; num_bytes];
    cursor.read_exact(&mut bytes).map_err(|e| io_err(packet_type, e))?;
    let mut bits = Vec::with_capacity(num_bits);
    for i in 0..num_bits {
        let byte = bytes[i / 8];
        bits.push((byte >> (i % 8)) & 1 != 0);
    }
    Ok(bits)
}

fn write_bitvector<W: Write>(writer: &mut W, bits: &[bool]) -> Result<()> {
    let num_bytes = bits.len().div_ceil(8);
    let mut bytes = vec![0u8; num_bytes];
    for (i, bit) in bits.iter().enumerate() {
        if *bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    writer.write_all(&bytes)?;
    Ok(())
}

/// Resolve a `count_field` reference against the fields already decoded
/// earlier in this packet.
fn resolve_count(built: &HashMap<&str, FieldValue>, count_field: &str, packet_type: u16) -> Result<usize> {
    match built.get(count_field) {
        Some(FieldValue::U8(v)) => Ok(*v as usize),
        Some(FieldValue::U16(v)) => Ok(*v as usize),
        Some(FieldValue::U32(v)) => Ok(*v as usize),
        Some(FieldValue::I32(v)) if *v >= 0 => Ok(*v as usize),
        Some(_) => Err(malformed(packet_type, 0, format!("count field {count_field:?} is not an unsigned integer"))),
        None => Err(malformed(packet_type, 0, format!("count field {count_field:?} not decoded before its array"))),
    }
}

/// Decode a packet payload according to `spec`, dispatching to the delta
/// path when `spec.has_delta` and to a direct field-by-field read
/// otherwise. This is the single entry point [`crate::connection`] calls
/// for every packet type in the registry.
pub fn decode_packet(spec: &PacketSpec, payload: &[u8], cache: &mut DeltaCache) -> Result<PacketFields> {
    if spec.has_delta {
        DeltaDecoder::decode(spec, payload, cache)
    } else {
        decode_plain(spec, payload)
    }
}

/// Read every field of a non-delta packet directly, in declared order:
/// no bitvector, no key/non-key split, no cache interaction. Array fields
/// on these packets are always `count_field`-driven (no plain packet in
/// the registry uses array-diff).
fn decode_plain(spec: &PacketSpec, payload: &[u8]) -> Result<PacketFields> {
    let packet_type = spec.packet_type;
    let mut cursor = Cursor::new(payload);
    let mut built: HashMap<&str, FieldValue> = HashMap::new();
    let mut fields = PacketFields::new();

    for field in spec.fields {
        let value = if field.is_array {
            let count_field = field.count_field.unwrap_or_else(|| {
                panic!("plain-packet array field {:?} has no count_field", field.name)
            });
            let count = resolve_count(&built, count_field, packet_type)?;
            read_element_run(&mut cursor, field.wire_type, count, packet_type)?
        } else {
            read_scalar(&mut cursor, field.wire_type, packet_type)?
        };
        built.insert(field.name, value.clone());
        fields.push(field.name, value);
    }

    let consumed = cursor.position() as usize;
    if consumed != payload.len() {
        return Err(malformed(packet_type, consumed, "trailing bytes after packet"));
    }

    Ok(fields)
}

/// Encode a packet's fields back to wire bytes, the inverse of
/// [`decode_packet`].
pub fn encode_packet(spec: &PacketSpec, fields: &PacketFields, cache: &mut DeltaCache) -> Result<Vec<u8>> {
    if spec.has_delta {
        DeltaDecoder::encode(spec, fields, cache)
    } else {
        encode_plain(spec, fields)
    }
}

fn encode_plain(spec: &PacketSpec, fields: &PacketFields) -> Result<Vec<u8>> {
    let packet_type = spec.packet_type;
    let mut out = Vec::new();
    for field in spec.fields {
        let value = fields
            .get(field.name)
            .cloned()
            .ok_or_else(|| malformed(packet_type, 0, format!("missing field {:?}", field.name)))?;
        if field.is_array {
            for element in array_to_elements(&value) {
                write_scalar(&mut out, &element)?;
            }
        } else {
            write_scalar(&mut out, &value)?;
        }
    }
    Ok(out)
}

/// Decodes delta-encoded packet payloads, consulting and updating a
/// [`DeltaCache`] as it goes.
pub struct DeltaDecoder;

impl DeltaDecoder {
    /// Decode one delta-encoded packet payload against `cache`, returning
    /// the packet's full, assembled field set in declared order and
    /// updating the cache's baseline for this packet's key.
    pub fn decode(spec: &PacketSpec, payload: &[u8], cache: &mut DeltaCache) -> Result<PacketFields> {
        assert!(spec.has_delta, "DeltaDecoder::decode called on a non-delta packet spec");
        let mut cursor = Cursor::new(payload);
        let packet_type = spec.packet_type;

        let mut key_values = Vec::new();
        let mut built: HashMap<&str, FieldValue> = HashMap::new();
        for field in spec.key_fields() {
            let value = read_scalar(&mut cursor, field.wire_type, packet_type)?;
            key_values.push(value.clone());
            built.insert(field.name, value);
        }

        let non_key: Vec<&FieldSpec> = spec.non_key_fields().collect();
        let bits = read_bitvector(&mut cursor, non_key.len(), packet_type)?;

        let baseline = cache.get(packet_type, &key_values).cloned();

        for (field, present) in non_key.iter().zip(bits.iter()) {
            let value = if field.is_bool_foldable {
                FieldValue::Bool(*present)
            } else if *present {
                if field.is_array {
                    if field.array_diff {
                        let cached = baseline
                            .as_ref()
                            .and_then(|b| b.get(field.name))
                            .map(array_to_elements)
                            .filter(|v| v.len() == field.array_size)
                            .unwrap_or_else(|| vec![field.default_element(); field.array_size]);
                        let elements = decode_array_diff(&mut cursor, field, cached, packet_type)?;
                        elements_to_array(elements, field.wire_type)
                    } else {
                        let count_field = field.count_field.unwrap_or_else(|| {
                            panic!("array field {:?} is missing both array_diff and count_field", field.name)
                        });
                        let count = resolve_count(&built, count_field, packet_type)?;
                        read_element_run(&mut cursor, field.wire_type, count, packet_type)?
                    }
                } else {
                    read_scalar(&mut cursor, field.wire_type, packet_type)?
                }
            } else {
                baseline
                    .as_ref()
                    .and_then(|b| b.get(field.name))
                    .cloned()
                    .unwrap_or_else(|| field.default_value())
            };
            built.insert(field.name, value);
        }

        let mut fields = PacketFields::new();
        let mut cache_entry = HashMap::new();
        for field in spec.fields {
            let value = built.remove(field.name).expect("every declared field was assigned above");
            cache_entry.insert(field.name.to_string(), value.clone());
            fields.push(field.name, value);
        }
        cache.update(packet_type, key_values, cache_entry);

        let consumed = cursor.position() as usize;
        if consumed != payload.len() {
            return Err(malformed(packet_type, consumed, "trailing bytes after packet"));
        }

        Ok(fields)
    }

    /// Encode `fields` as a delta update against whatever baseline `cache`
    /// currently holds for this packet's key, updating the cache to the
    /// new full state. Used when this client itself needs to emit a
    /// delta-encoded packet (rare for a client, but symmetric with
    /// `decode` and exercised by the round-trip tests).
    pub fn encode(spec: &PacketSpec, fields: &PacketFields, cache: &mut DeltaCache) -> Result<Vec<u8>> {
        assert!(spec.has_delta, "DeltaDecoder::encode called on a non-delta packet spec");
        let packet_type = spec.packet_type;
        let mut out = Vec::new();

        let mut key_values = Vec::new();
        for field in spec.key_fields() {
            let value = fields
                .get(field.name)
                .cloned()
                .ok_or_else(|| malformed(packet_type, 0, format!("missing key field {:?}", field.name)))?;
            write_scalar(&mut out, &value)?;
            key_values.push(value);
        }

        let baseline = cache.get(packet_type, &key_values).cloned();
        let non_key: Vec<&FieldSpec> = spec.non_key_fields().collect();

        let mut bits = Vec::with_capacity(non_key.len());
        let mut payload = Vec::new();
        for field in &non_key {
            let current = fields.get(field.name).cloned().unwrap_or_else(|| field.default_value());
            let previous = baseline.as_ref().and_then(|b| b.get(field.name)).cloned();

            if field.is_bool_foldable {
                bits.push(matches!(current, FieldValue::Bool(true)));
                continue;
            }

            let changed = previous.as_ref() != Some(&current);
            bits.push(changed);
            if !changed {
                continue;
            }

            if field.is_array {
                if field.array_diff {
                    let baseline_elems = previous
                        .as_ref()
                        .map(array_to_elements)
                        .filter(|v| v.len() == field.array_size)
                        .unwrap_or_else(|| vec![field.default_element(); field.array_size]);
                    let current_elems = array_to_elements(&current);
                    encode_array_diff(&mut payload, field, &baseline_elems, &current_elems)?;
                } else {
                    for element in array_to_elements(&current) {
                        write_scalar(&mut payload, &element)?;
                    }
                }
            } else {
                write_scalar(&mut payload, &current)?;
            }
        }

        write_bitvector(&mut out, &bits)?;
        out.extend_from_slice(&payload);

        let mut cache_entry = HashMap::new();
        for field in spec.fields {
            let value = fields.get(field.name).cloned().unwrap_or_else(|| field.default_value());
            cache_entry.insert(field.name.to_string(), value);
        }
        cache.update(packet_type, key_values, cache_entry);

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{lookup, packet_type};

    #[test]
    fn chat_msg_round_trips_through_decode() {
        let spec = lookup(packet_type::CHAT_MSG).unwrap();
        let mut cache = DeltaCache::new();
        let mut fields = PacketFields::new();
        fields.push("message", FieldValue::Str("hello".into()));
        fields.push("tile", FieldValue::I32(42));
        fields.push("event", FieldValue::I16(1));
        fields.push("turn", FieldValue::I32(7));
        fields.push("phase", FieldValue::I16(0));
        fields.push("conn_id", FieldValue::I32(-1));

        let bytes = DeltaDecoder::encode(spec, &fields, &mut cache).unwrap();
        let mut cache2 = DeltaCache::new();
        let decoded = DeltaDecoder::decode(spec, &bytes, &mut cache2).unwrap();
        assert_eq!(decoded.get_str("message").unwrap(), "hello");
        assert_eq!(decoded.get_i32("tile").unwrap(), 42);
    }

    #[test]
    fn trailing_bytes_after_delta_packet_are_malformed() {
        let spec = lookup(packet_type::CHAT_MSG).unwrap();
        let mut cache = DeltaCache::new();
        let mut fields = PacketFields::new();
        fields.push("message", FieldValue::Str("hello".into()));
        fields.push("tile", FieldValue::I32(42));
        fields.push("event", FieldValue::I16(1));
        fields.push("turn", FieldValue::I32(7));
        fields.push("phase", FieldValue::I16(0));
        fields.push("conn_id", FieldValue::I32(-1));

        let mut bytes = DeltaDecoder::encode(spec, &fields, &mut cache).unwrap();
        bytes.push(0xFF);

        let err = DeltaDecoder::decode(spec, &bytes, &mut DeltaCache::new()).unwrap_err();
        assert!(matches!(err, Error::MalformedPacket { packet_type: pt, .. } if pt == packet_type::CHAT_MSG));
    }

    #[test]
    fn trailing_bytes_after_plain_packet_are_malformed() {
        let spec = lookup(packet_type::RULESET_NATION_GROUPS).unwrap();
        let mut fields = PacketFields::new();
        fields.push("ngroups", FieldValue::U32(1));
        fields.push("groups", FieldValue::StrArray(vec!["Ancient".into()]));
        fields.push("hidden", FieldValue::BoolArray(vec![false]));

        let mut bytes = encode_packet(spec, &fields, &mut DeltaCache::new()).unwrap();
        bytes.push(0xFF);

        let err = decode_packet(spec, &bytes, &mut DeltaCache::new()).unwrap_err();
        assert!(matches!(err, Error::MalformedPacket { packet_type: pt, .. } if pt == packet_type::RULESET_NATION_GROUPS));
    }

    #[test]
    fn unset_fields_fall_back_to_cached_baseline() {
        let spec = lookup(packet_type::CHAT_MSG).unwrap();
        let mut cache = DeltaCache::new();

        let mut full = PacketFields::new();
        full.push("message", FieldValue::Str("first".into()));
        full.push("tile", FieldValue::I32(1));
        full.push("event", FieldValue::I16(1));
        full.push("turn", FieldValue::I32(1));
        full.push("phase", FieldValue::I16(1));
        full.push("conn_id", FieldValue::I32(1));
        let bytes1 = DeltaDecoder::encode(spec, &full, &mut cache).unwrap();
        let decoded1 = DeltaDecoder::decode(spec, &bytes1, &mut DeltaCache::new()).unwrap();
        assert_eq!(decoded1.get_str("message").unwrap(), "first");

        let mut partial = PacketFields::new();
        partial.push("message", FieldValue::Str("first".into()));
        partial.push("tile", FieldValue::I32(1));
        partial.push("event", FieldValue::I16(1));
        partial.push("turn", FieldValue::I32(99));
        partial.push("phase", FieldValue::I16(1));
        partial.push("conn_id", FieldValue::I32(1));
        let bytes2 = DeltaDecoder::encode(spec, &partial, &mut cache).unwrap();

        let mut server_side_cache = DeltaCache::new();
        let _ = DeltaDecoder::decode(spec, &bytes1, &mut server_side_cache).unwrap();
        let decoded2 = DeltaDecoder::decode(spec, &bytes2, &mut server_side_cache).unwrap();
        assert_eq!(decoded2.get_i32("turn").unwrap(), 99);
        assert_eq!(decoded2.get_str("message").unwrap(), "first");
    }

    #[test]
    fn array_diff_applies_sparse_changes_onto_baseline() {
        let spec = lookup(packet_type::GAME_INFO).unwrap();
        let mut cache = DeltaCache::new();

        let mut full = PacketFields::new();
        full.push("global_advance_count", FieldValue::U16(crate::schema::A_LAST as u16));
        full.push("global_advances", FieldValue::BoolArray(vec![false; crate::schema::A_LAST]));
        full.push("great_wonder_owners", FieldValue::I8Array(vec![-1; crate::schema::B_LAST]));
        let bytes1 = DeltaDecoder::encode(spec, &full, &mut cache).unwrap();
        let server_side = &mut DeltaCache::new();
        let _ = DeltaDecoder::decode(spec, &bytes1, server_side).unwrap();

        let mut changed = PacketFields::new();
        changed.push("global_advance_count", FieldValue::U16(crate::schema::A_LAST as u16));
        let mut advances = vec![false; crate::schema::A_LAST];
        advances[5] = true;
        changed.push("global_advances", FieldValue::BoolArray(advances));
        changed.push("great_wonder_owners", FieldValue::I8Array(vec![-1; crate::schema::B_LAST]));
        let bytes2 = DeltaDecoder::encode(spec, &changed, &mut cache).unwrap();

        let decoded2 = DeltaDecoder::decode(spec, &bytes2, server_side).unwrap();
        let decoded_advances = decoded2.get_bool_array("global_advances").unwrap();
        assert!(decoded_advances[5]);
        assert!(!decoded_advances[0]);
    }

    #[test]
    fn array_diff_sentinel_only_means_no_change() {
        let spec = lookup(packet_type::GAME_INFO).unwrap();
        let field = spec.fields.iter().find(|f| f.name == "global_advances").unwrap();
        let baseline = vec![FieldValue::Bool(false); crate::schema::A_LAST];
        let mut cursor = Cursor::new(&[crate::schema::A_LAST as u8][..]);
        let result = decode_array_diff(&mut cursor, field, baseline.clone(), packet_type::GAME_INFO).unwrap();
        assert_eq!(result, baseline);
    }

    #[test]
    fn array_diff_out_of_range_index_is_malformed() {
        let spec = lookup(packet_type::RULESET_GAME).unwrap();
        let field = spec.fields.iter().find(|f| f.name == "base_raise_chance");
        assert!(field.is_none(), "base_raise_chance is count_field-driven, not array_diff");

        let ginfo_field = lookup(packet_type::GAME_INFO)
            .unwrap()
            .fields
            .iter()
            .find(|f| f.name == "great_wonder_owners")
            .unwrap()
            .clone();
        let baseline = vec![FieldValue::I8(-1); crate::schema::B_LAST];
        let bogus_index = (crate::schema::B_LAST + 1) as u8;
        let mut cursor = Cursor::new(&[bogus_index][..]);
        let err = decode_array_diff(&mut cursor, &ginfo_field, baseline, packet_type::GAME_INFO).unwrap_err();
        assert!(matches!(err, Error::MalformedPacket { .. }));
    }

    #[test]
    fn counted_array_reads_sibling_field_count() {
        let spec = lookup(packet_type::RULESET_DISASTER).unwrap();
        let mut cache = DeltaCache::new();
        let mut fields = PacketFields::new();
        fields.push("id", FieldValue::U8(3));
        fields.push("name", FieldValue::Str("Flood".into()));
        fields.push("rule_name", FieldValue::Str("flood".into()));
        fields.push("reqs_count", FieldValue::U8(2));
        fields.push(
            "reqs",
            FieldValue::RequirementArray(vec![
                RequirementRecord { kind: 1, value: 5, range: 0, survives: false, present: true, quiet: false },
                RequirementRecord { kind: 2, value: -1, range: 1, survives: true, present: false, quiet: true },
            ]),
        );
        fields.push("frequency", FieldValue::U16(10));
        fields.push("effects", FieldValue::U8(1));

        let bytes = DeltaDecoder::encode(spec, &fields, &mut cache).unwrap();
        let decoded = DeltaDecoder::decode(spec, &bytes, &mut DeltaCache::new()).unwrap();
        let reqs = decoded.get_requirement_array("reqs").unwrap();
        assert_eq!(reqs.len(), 2);
        assert_eq!(reqs[0].value, 5);
        assert_eq!(reqs[1].range, 1);
    }

    #[test]
    fn plain_packet_counted_array_round_trips() {
        let spec = lookup(packet_type::RULESET_NATION_GROUPS).unwrap();
        let mut fields = PacketFields::new();
        fields.push("ngroups", FieldValue::U32(2));
        fields.push("groups", FieldValue::StrArray(vec!["Ancient".into(), "African".into()]));
        fields.push("hidden", FieldValue::BoolArray(vec![false, true]));

        let bytes = encode_packet(spec, &fields, &mut DeltaCache::new()).unwrap();
        let decoded = decode_packet(spec, &bytes, &mut DeltaCache::new()).unwrap();
        assert_eq!(decoded.get_str_array("groups").unwrap(), ["Ancient", "African"]);
        assert_eq!(decoded.get_bool_array("hidden").unwrap(), [false, true]);
    }

    #[test]
    fn bool_folded_field_consumes_zero_payload_bytes() {
        let spec = lookup(packet_type::RULESET_CONTROL).unwrap();
        let field = spec.fields.iter().find(|f| f.name == "popup_tech_help").unwrap();
        assert!(field.is_bool_foldable);
        assert!(!field.is_array);
    }
}
