//! MultiBuildBeta blueprint grammar
//!
//! Encoding: standard base64 (whitespace ignored) of a gzip stream holding a
//! UTF-8 JSON document:
//! - `version`: payload format version
//! - `name`: optional label
//! - `referencePos`: `{ x, y }`
//! - `copiedBuildings`, `copiedBelts`, `copiedInserters`: objects keyed by
//!   integer entity id
//!
//! Decoding is a single pass over the input. The gzip stream must be a single
//! member with no optional header fields and nothing after its trailer. The
//! trailer CRC and length cover the decompressed payload. The header MTIME,
//! XFL and OS bytes are not covered by any checksum, and neither are the
//! padding bits of the final deflate byte, so flips there go unnoticed.
//! Structural checks catch well-formed but inconsistent payloads such as
//! dangling inserter targets or invalid prototype ids.

use super::{DecodeLimits, GrammarHandler, VersionBounds};
use crate::domain::{BetaBlueprint, BuildingEntry, DecodedBlueprint, ModVersion, Position};
use crate::error::DecodeError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::bufread::GzDecoder;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;

/// Mod name the grammar is registered under
pub const MOD_NAME: &str = "MultiBuildBeta";

/// Payload format versions this grammar understands
const SUPPORTED_FORMAT_VERSIONS: &[u32] = &[1];

/// First two bytes of every gzip member
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Header length of a gzip member without optional fields
const GZIP_HEADER_LEN: usize = 10;

/// Gzip compression method byte for deflate
const GZIP_METHOD_DEFLATE: u8 = 8;

/// Oldest mod version whose blueprints use this encoding
const MIN_MOD_VERSION: ModVersion = ModVersion::new(2, 0, 0);

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBlueprint {
    version: u32,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    reference_pos: Position,
    #[serde(default)]
    copied_buildings: BTreeMap<String, RawBuilding>,
    #[serde(default)]
    copied_belts: BTreeMap<String, RawBelt>,
    #[serde(default)]
    copied_inserters: BTreeMap<String, RawInserter>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBuilding {
    proto_id: i64,
    #[serde(default)]
    model_index: u32,
    #[serde(default)]
    cursor_relative_pos: Position,
    #[serde(default)]
    cursor_relative_yaw: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBelt {
    proto_id: i64,
    #[serde(default)]
    output_id: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawInserter {
    proto_id: i64,
    #[serde(default)]
    pick_target: i64,
    #[serde(default)]
    insert_target: i64,
}

/// Grammar for blueprints produced by the MultiBuildBeta mod
#[derive(Debug, Clone)]
pub struct MultiBuildBetaGrammar {
    supported: VersionBounds,
}

impl MultiBuildBetaGrammar {
    /// Create the grammar with its default supported versions (>= 2.0.0)
    pub fn new() -> Self {
        Self {
            supported: VersionBounds::at_least(MIN_MOD_VERSION),
        }
    }

    /// Override the supported mod versions
    pub fn with_supported_versions(mut self, supported: VersionBounds) -> Self {
        self.supported = supported;
        self
    }
}

impl Default for MultiBuildBetaGrammar {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarHandler for MultiBuildBetaGrammar {
    fn mod_name(&self) -> &str {
        MOD_NAME
    }

    fn supported_versions(&self) -> VersionBounds {
        self.supported.clone()
    }

    fn decode(
        &self,
        encoded: &str,
        _version: &ModVersion,
        limits: &DecodeLimits,
    ) -> Result<DecodedBlueprint, DecodeError> {
        if encoded.len() > limits.max_encoded_len {
            return Err(DecodeError::malformed(format!(
                "encoded blueprint exceeds {} bytes",
                limits.max_encoded_len
            )));
        }

        let compressed = decode_base64(encoded)?;
        let json = decompress(&compressed, limits.max_decompressed_len)?;
        let raw: RawBlueprint = serde_json::from_slice(&json)
            .map_err(|e| DecodeError::malformed(format!("invalid blueprint data: {}", e)))?;

        build_blueprint(raw, limits).map(DecodedBlueprint::MultiBuildBeta)
    }
}

fn decode_base64(encoded: &str) -> Result<Vec<u8>, DecodeError> {
    let compact: Vec<u8> = encoded
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    STANDARD
        .decode(&compact)
        .map_err(|e| DecodeError::malformed(format!("invalid base64: {}", e)))
}

fn check_gzip_header(bytes: &[u8]) -> Result<(), DecodeError> {
    if bytes.len() < GZIP_MAGIC.len() || bytes[..GZIP_MAGIC.len()] != GZIP_MAGIC {
        return Err(DecodeError::malformed("missing gzip header"));
    }
    if bytes.len() < GZIP_HEADER_LEN {
        return Err(DecodeError::malformed("truncated gzip header"));
    }
    if bytes[2] != GZIP_METHOD_DEFLATE {
        return Err(DecodeError::malformed(format!(
            "unsupported gzip compression method {}",
            bytes[2]
        )));
    }
    // FNAME, FEXTRA, FCOMMENT and FHCRC are never written; reserved bits must be zero
    if bytes[3] != 0 {
        return Err(DecodeError::malformed(format!(
            "unsupported gzip header flags {:#04x}",
            bytes[3]
        )));
    }
    Ok(())
}

fn decompress(bytes: &[u8], limit: usize) -> Result<Vec<u8>, DecodeError> {
    check_gzip_header(bytes)?;

    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .by_ref()
        .take((limit as u64).saturating_add(1))
        .read_to_end(&mut out)
        .map_err(|e| DecodeError::malformed(format!("corrupt compressed data: {}", e)))?;

    if out.len() > limit {
        return Err(DecodeError::malformed(format!(
            "decompressed data exceeds {} bytes",
            limit
        )));
    }

    let trailing = decoder.into_inner();
    if !trailing.is_empty() {
        return Err(DecodeError::malformed(format!(
            "trailing data after gzip stream ({} bytes)",
            trailing.len()
        )));
    }

    Ok(out)
}

fn parse_id(kind: &str, key: &str) -> Result<i64, DecodeError> {
    key.parse::<i64>()
        .ok()
        .filter(|id| id.to_string() == key)
        .ok_or_else(|| {
            DecodeError::malformed(format!("{} id '{}' is not a canonical integer", kind, key))
        })
}

fn checked_proto_id(kind: &str, id: i64, proto_id: i64) -> Result<u32, DecodeError> {
    u32::try_from(proto_id)
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| {
            DecodeError::malformed(format!(
                "{} {} has invalid protoId {}",
                kind, id, proto_id
            ))
        })
}

fn build_blueprint(raw: RawBlueprint, limits: &DecodeLimits) -> Result<BetaBlueprint, DecodeError> {
    if !SUPPORTED_FORMAT_VERSIONS.contains(&raw.version) {
        return Err(DecodeError::malformed(format!(
            "unsupported payload version {}",
            raw.version
        )));
    }

    let total = raw.copied_buildings.len() + raw.copied_belts.len() + raw.copied_inserters.len();
    if total == 0 {
        return Err(DecodeError::malformed("blueprint contains no entities"));
    }
    if total > limits.max_entities {
        return Err(DecodeError::malformed(format!(
            "blueprint has {} entities, limit is {}",
            total, limits.max_entities
        )));
    }

    let mut buildings = Vec::with_capacity(raw.copied_buildings.len());
    let mut building_counts: BTreeMap<u32, usize> = BTreeMap::new();
    for (key, building) in &raw.copied_buildings {
        let id = parse_id("building", key)?;
        let proto_id = checked_proto_id("building", id, building.proto_id)?;
        *building_counts.entry(proto_id).or_insert(0) += 1;
        buildings.push(BuildingEntry {
            id,
            proto_id,
            model_index: building.model_index,
            position: building.cursor_relative_pos,
            yaw: building.cursor_relative_yaw,
        });
    }
    buildings.sort_by_key(|b| b.id);

    let building_ids: BTreeSet<i64> = buildings.iter().map(|b| b.id).collect();

    let mut belt_ids = BTreeSet::new();
    for key in raw.copied_belts.keys() {
        belt_ids.insert(parse_id("belt", key)?);
    }
    for (key, belt) in &raw.copied_belts {
        let id = parse_id("belt", key)?;
        checked_proto_id("belt", id, belt.proto_id)?;
        if belt.output_id != 0 && !belt_ids.contains(&belt.output_id) {
            return Err(DecodeError::malformed(format!(
                "belt {} outputs to unknown belt {}",
                id, belt.output_id
            )));
        }
    }

    for (key, inserter) in &raw.copied_inserters {
        let id = parse_id("inserter", key)?;
        checked_proto_id("inserter", id, inserter.proto_id)?;
        for target in [inserter.pick_target, inserter.insert_target] {
            if target != 0 && !building_ids.contains(&target) {
                return Err(DecodeError::malformed(format!(
                    "inserter {} references unknown building {}",
                    id, target
                )));
            }
        }
    }

    Ok(BetaBlueprint {
        format_version: raw.version,
        name: raw.name.filter(|n| !n.trim().is_empty()),
        reference_pos: raw.reference_pos,
        buildings,
        belt_count: raw.copied_belts.len(),
        inserter_count: raw.copied_inserters.len(),
        building_counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const FIXTURE: &str = r#"{
        "version": 1,
        "name": "Iron smelting",
        "referencePos": { "x": 12.5, "y": -3.0 },
        "copiedBuildings": {
            "2": { "protoId": 2302, "modelIndex": 62, "cursorRelativePos": { "x": 4.0, "y": 0.0 }, "cursorRelativeYaw": 90.0 },
            "1": { "protoId": 2302, "modelIndex": 62, "cursorRelativePos": { "x": 0.0, "y": 0.0 } },
            "3": { "protoId": 2101, "modelIndex": 51, "cursorRelativePos": { "x": 8.0, "y": 2.0 } }
        },
        "copiedBelts": {
            "10": { "protoId": 2001, "outputId": 11 },
            "11": { "protoId": 2001 }
        },
        "copiedInserters": {
            "20": { "protoId": 2011, "pickTarget": 1, "insertTarget": 3 }
        }
    }"#;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn encode(json: &str) -> String {
        STANDARD.encode(gzip(json.as_bytes()))
    }

    fn decode(encoded: &str) -> Result<DecodedBlueprint, DecodeError> {
        MultiBuildBetaGrammar::new().decode(
            encoded,
            &ModVersion::new(2, 0, 6),
            &DecodeLimits::default(),
        )
    }

    fn decode_beta(encoded: &str) -> BetaBlueprint {
        match decode(encoded).unwrap() {
            DecodedBlueprint::MultiBuildBeta(bp) => bp,
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    fn detail(err: DecodeError) -> String {
        match err {
            DecodeError::MalformedEncoding { detail } => detail,
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_decode_fixture() {
        let bp = decode_beta(&encode(FIXTURE));
        assert_eq!(bp.format_version, 1);
        assert_eq!(bp.name.as_deref(), Some("Iron smelting"));
        assert_eq!(bp.reference_pos, Position { x: 12.5, y: -3.0 });
        assert_eq!(bp.buildings.len(), 3);
        assert_eq!(bp.belt_count, 2);
        assert_eq!(bp.inserter_count, 1);
        assert_eq!(bp.entity_count(), 6);
        assert_eq!(bp.building_counts.get(&2302), Some(&2));
        assert_eq!(bp.building_counts.get(&2101), Some(&1));
    }

    #[test]
    fn test_buildings_sorted_by_numeric_id() {
        let bp = decode_beta(&encode(FIXTURE));
        let ids: Vec<i64> = bp.buildings.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(bp.buildings[1].yaw, 90.0);
        assert_eq!(bp.buildings[1].position, Position { x: 4.0, y: 0.0 });
    }

    #[test]
    fn test_whitespace_in_encoding_ignored() {
        let encoded = encode(FIXTURE);
        let (head, tail) = encoded.split_at(encoded.len() / 2);
        let wrapped = format!("  {}\n{}\r\n", head, tail);
        assert_eq!(decode(&wrapped).unwrap(), decode(&encoded).unwrap());
    }

    #[test]
    fn test_decode_is_idempotent() {
        let encoded = encode(FIXTURE);
        assert_eq!(decode(&encoded).unwrap(), decode(&encoded).unwrap());
    }

    #[test]
    fn test_crc_bit_flip_fails() {
        let mut bytes = gzip(FIXTURE.as_bytes());
        let crc_offset = bytes.len() - 8;
        bytes[crc_offset] ^= 0x01;
        let err = decode(&STANDARD.encode(&bytes)).unwrap_err();
        assert!(detail(err).contains("corrupt compressed data"));
    }

    #[test]
    fn test_magic_bit_flip_fails() {
        let mut bytes = gzip(FIXTURE.as_bytes());
        bytes[0] ^= 0x01;
        let err = decode(&STANDARD.encode(&bytes)).unwrap_err();
        assert_eq!(detail(err), "missing gzip header");
    }

    #[test]
    fn test_truncated_stream_fails() {
        let bytes = gzip(FIXTURE.as_bytes());
        let truncated = &bytes[..bytes.len() / 2];
        assert!(decode(&STANDARD.encode(truncated)).is_err());
    }

    #[test]
    fn test_trailing_data_after_stream_fails() {
        let mut bytes = gzip(FIXTURE.as_bytes());
        bytes.extend_from_slice(b"GARBAGE-APPENDED-AFTER-STREAM");
        let err = decode(&STANDARD.encode(&bytes)).unwrap_err();
        assert_eq!(detail(err), "trailing data after gzip stream (29 bytes)");
    }

    #[test]
    fn test_second_gzip_member_fails() {
        let mut bytes = gzip(FIXTURE.as_bytes());
        bytes.extend_from_slice(&gzip(FIXTURE.as_bytes()));
        let err = decode(&STANDARD.encode(&bytes)).unwrap_err();
        assert!(detail(err).starts_with("trailing data after gzip stream"));
    }

    #[test]
    fn test_header_fields_checked() {
        let mut bytes = gzip(FIXTURE.as_bytes());
        bytes[2] = 7;
        let err = decode(&STANDARD.encode(&bytes)).unwrap_err();
        assert_eq!(detail(err), "unsupported gzip compression method 7");

        let mut bytes = gzip(FIXTURE.as_bytes());
        bytes[3] = 0x08;
        let err = decode(&STANDARD.encode(&bytes)).unwrap_err();
        assert_eq!(detail(err), "unsupported gzip header flags 0x08");

        let err = decode(&STANDARD.encode([0x1f, 0x8b, 0x08])).unwrap_err();
        assert_eq!(detail(err), "truncated gzip header");
    }

    #[test]
    fn test_every_covered_bit_flip_fails() {
        let bytes = gzip(FIXTURE.as_bytes());
        // MTIME, XFL and OS carry no checksum; the last deflate byte may hold padding bits
        let unchecked = |i: usize| (4..GZIP_HEADER_LEN).contains(&i) || i == bytes.len() - 9;

        for index in (0..bytes.len()).filter(|i| !unchecked(*i)) {
            for bit in 0..8 {
                let mut corrupted = bytes.clone();
                corrupted[index] ^= 1 << bit;
                assert!(
                    decode(&STANDARD.encode(&corrupted)).is_err(),
                    "flipping bit {} of byte {} still decoded",
                    bit,
                    index
                );
            }
        }
    }

    #[test]
    fn test_non_canonical_ids_rejected() {
        for key in ["01", " 1", "+1", "-0", "1 "] {
            let json = format!(
                r#"{{"version": 1, "copiedBuildings": {{"1": {{"protoId": 2302}}, "{}": {{"protoId": 2302}}}}}}"#,
                key
            );
            let err = decode(&encode(&json)).unwrap_err();
            assert_eq!(
                detail(err),
                format!("building id '{}' is not a canonical integer", key)
            );
        }

        let err = decode(&encode(
            r#"{"version": 1, "copiedBelts": {"02": {"protoId": 2001}}}"#,
        ))
        .unwrap_err();
        assert!(detail(err).contains("belt id '02'"));

        let err = decode(&encode(
            r#"{"version": 1,
                "copiedBuildings": {"1": {"protoId": 2302}},
                "copiedInserters": {"007": {"protoId": 2011, "pickTarget": 1}}}"#,
        ))
        .unwrap_err();
        assert!(detail(err).contains("inserter id '007'"));
    }

    #[test]
    fn test_negative_ids_accepted() {
        let bp = decode_beta(&encode(
            r#"{"version": 1, "copiedBuildings": {"-3": {"protoId": 2302}, "1": {"protoId": 2302}}}"#,
        ));
        let ids: Vec<i64> = bp.buildings.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![-3, 1]);
    }

    #[test]
    fn test_unbounded_decompression_limit() {
        let limits = DecodeLimits {
            max_decompressed_len: usize::MAX,
            ..DecodeLimits::default()
        };
        let decoded = MultiBuildBetaGrammar::new()
            .decode(&encode(FIXTURE), &ModVersion::new(2, 0, 6), &limits)
            .unwrap();
        assert_eq!(decoded, decode(&encode(FIXTURE)).unwrap());
    }

    #[test]
    fn test_invalid_base64() {
        let err = decode("not base64 !!!").unwrap_err();
        assert!(detail(err).contains("invalid base64"));
    }

    #[test]
    fn test_plain_base64_without_gzip() {
        let err = decode(&STANDARD.encode(FIXTURE)).unwrap_err();
        assert_eq!(detail(err), "missing gzip header");
    }

    #[test]
    fn test_invalid_json() {
        let err = decode(&encode("{ not json")).unwrap_err();
        assert!(detail(err).contains("invalid blueprint data"));
    }

    #[test]
    fn test_unsupported_payload_version() {
        let err = decode(&encode(r#"{"version": 7, "copiedBelts": {"1": {"protoId": 2001}}}"#))
            .unwrap_err();
        assert!(detail(err).contains("unsupported payload version 7"));
    }

    #[test]
    fn test_empty_selection() {
        let err = decode(&encode(r#"{"version": 1}"#)).unwrap_err();
        assert_eq!(detail(err), "blueprint contains no entities");
    }

    #[test]
    fn test_non_integer_id() {
        let err = decode(&encode(
            r#"{"version": 1, "copiedBuildings": {"abc": {"protoId": 2302}}}"#,
        ))
        .unwrap_err();
        assert!(detail(err).contains("building id 'abc'"));
    }

    #[test]
    fn test_invalid_proto_id() {
        let err = decode(&encode(
            r#"{"version": 1, "copiedBuildings": {"1": {"protoId": 0}}}"#,
        ))
        .unwrap_err();
        assert!(detail(err).contains("invalid protoId 0"));
    }

    #[test]
    fn test_dangling_inserter_target() {
        let err = decode(&encode(
            r#"{"version": 1,
                "copiedBuildings": {"1": {"protoId": 2302}},
                "copiedInserters": {"5": {"protoId": 2011, "pickTarget": 1, "insertTarget": 9}}}"#,
        ))
        .unwrap_err();
        assert!(detail(err).contains("inserter 5 references unknown building 9"));
    }

    #[test]
    fn test_dangling_belt_output() {
        let err = decode(&encode(
            r#"{"version": 1, "copiedBelts": {"1": {"protoId": 2001, "outputId": 2}}}"#,
        ))
        .unwrap_err();
        assert!(detail(err).contains("belt 1 outputs to unknown belt 2"));
    }

    #[test]
    fn test_entity_limit() {
        let limits = DecodeLimits {
            max_entities: 2,
            ..DecodeLimits::default()
        };
        let err = MultiBuildBetaGrammar::new()
            .decode(&encode(FIXTURE), &ModVersion::new(2, 0, 6), &limits)
            .unwrap_err();
        assert!(detail(err).contains("limit is 2"));
    }

    #[test]
    fn test_decompression_limit() {
        let padding = " ".repeat(64 * 1024);
        let json = format!(
            r#"{{"version": 1, {} "copiedBelts": {{"1": {{"protoId": 2001}}}}}}"#,
            padding
        );
        let limits = DecodeLimits {
            max_decompressed_len: 1024,
            ..DecodeLimits::default()
        };
        let err = MultiBuildBetaGrammar::new()
            .decode(&encode(&json), &ModVersion::new(2, 0, 6), &limits)
            .unwrap_err();
        assert!(detail(err).contains("decompressed data exceeds 1024 bytes"));
    }

    #[test]
    fn test_encoded_length_limit() {
        let limits = DecodeLimits {
            max_encoded_len: 16,
            ..DecodeLimits::default()
        };
        let err = MultiBuildBetaGrammar::new()
            .decode(&encode(FIXTURE), &ModVersion::new(2, 0, 6), &limits)
            .unwrap_err();
        assert!(detail(err).contains("exceeds 16 bytes"));
    }

    #[test]
    fn test_default_supported_versions() {
        let grammar = MultiBuildBetaGrammar::new();
        assert!(!grammar.supported_versions().contains(&ModVersion::new(1, 9, 0)));
        assert!(grammar.supported_versions().contains(&ModVersion::new(2, 0, 0)));
        assert_eq!(grammar.mod_name(), "MultiBuildBeta");
    }
}
