//! Integration tests for bpcheck
//!
//! These tests verify:
//! - Blueprint decoding through the grammar registry
//! - Validation messages for wrong blueprint formats
//! - Compatibility ranges resolved from a TOML catalog
//! - The post-commit parse job under concurrent triggers

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::Write;

const FIXTURE: &str = r#"{
    "version": 1,
    "name": "Green circuits",
    "referencePos": { "x": 0.0, "y": 0.0 },
    "copiedBuildings": {
        "1": { "protoId": 2303, "modelIndex": 49, "cursorRelativePos": { "x": 0.0, "y": 0.0 } },
        "2": { "protoId": 2303, "modelIndex": 49, "cursorRelativePos": { "x": 5.0, "y": 0.0 } }
    },
    "copiedBelts": {
        "5": { "protoId": 2001, "outputId": 6 },
        "6": { "protoId": 2001 }
    },
    "copiedInserters": {
        "9": { "protoId": 2011, "pickTarget": 1, "insertTarget": 2 }
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

mod decoding {
    use super::*;
    use bpcheck::domain::{DecodedBlueprint, DiagnosticKind, ModVersion, ParseResult};
    use bpcheck::grammar::{DecodeLimits, GrammarRegistry, UnknownModPolicy};

    fn v206() -> ModVersion {
        ModVersion::new(2, 0, 6)
    }

    #[test]
    fn test_fixture_decodes_to_expected_payload() {
        let registry = GrammarRegistry::with_defaults();
        let result = registry.decode(&encode(FIXTURE), "MultiBuildBeta", &v206());

        match result {
            ParseResult::Success(DecodedBlueprint::MultiBuildBeta(bp)) => {
                assert_eq!(bp.name.as_deref(), Some("Green circuits"));
                assert_eq!(bp.buildings.len(), 2);
                assert_eq!(bp.belt_count, 2);
                assert_eq!(bp.inserter_count, 1);
                assert_eq!(bp.building_counts.get(&2303), Some(&2));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_single_bit_corruption_fails() {
        let mut bytes = gzip(FIXTURE.as_bytes());
        let crc_byte = bytes.len() - 8;
        bytes[crc_byte] ^= 0x01;
        let corrupted = STANDARD.encode(bytes);

        let registry = GrammarRegistry::with_defaults();
        let result = registry.decode(&corrupted, "MultiBuildBeta", &v206());
        let diagnostic = result.diagnostic().expect("corrupted blueprint must fail");
        assert_eq!(diagnostic.kind, DiagnosticKind::MalformedEncoding);
        assert_eq!(diagnostic.mod_version, "2.0.6");
    }

    #[test]
    fn test_appended_bytes_fail() {
        let mut bytes = gzip(FIXTURE.as_bytes());
        bytes.extend_from_slice(b"GARBAGE-APPENDED-AFTER-STREAM");

        let registry = GrammarRegistry::with_defaults();
        let result = registry.decode(&STANDARD.encode(bytes), "MultiBuildBeta", &v206());
        let diagnostic = result.diagnostic().expect("extended blueprint must fail");
        assert!(diagnostic.detail.contains("trailing data after gzip stream"));
    }

    #[test]
    fn test_header_flag_corruption_fails() {
        let registry = GrammarRegistry::with_defaults();
        for bit in 0..8 {
            let mut bytes = gzip(FIXTURE.as_bytes());
            bytes[3] ^= 1 << bit;
            let result = registry.decode(&STANDARD.encode(bytes), "MultiBuildBeta", &v206());
            assert!(!result.is_success(), "flag bit {}", bit);
        }
    }

    #[test]
    fn test_aliased_entity_ids_fail() {
        let json = r#"{
            "version": 1,
            "copiedBuildings": {
                "1": { "protoId": 2303 },
                "01": { "protoId": 2303 },
                " 1": { "protoId": 2303 }
            }
        }"#;
        let registry = GrammarRegistry::with_defaults();
        let result = registry.decode(&encode(json), "MultiBuildBeta", &v206());
        assert!(result
            .diagnostic()
            .unwrap()
            .detail
            .contains("is not a canonical integer"));
    }

    #[test]
    fn test_unregistered_mod_passes_through() {
        let registry = GrammarRegistry::with_defaults();
        let result = registry.decode("anything at all", "MultiBuild", &v206());
        assert_eq!(result, ParseResult::Success(DecodedBlueprint::PassThrough));
    }

    #[test]
    fn test_strict_policy_rejects_unregistered_mod() {
        let registry = GrammarRegistry::with_defaults().with_policy(UnknownModPolicy::Reject);
        let result = registry.decode("anything at all", "MultiBuild", &v206());
        assert_eq!(
            result.diagnostic().map(|d| d.kind),
            Some(DiagnosticKind::UnknownMod)
        );
    }

    #[test]
    fn test_empty_input_fails_for_every_mod() {
        let registry = GrammarRegistry::with_defaults();
        for mod_name in ["MultiBuildBeta", "MultiBuild", "Unheard"] {
            let result = registry.decode("  \n", mod_name, &v206());
            assert_eq!(
                result.diagnostic().map(|d| d.kind),
                Some(DiagnosticKind::MalformedEncoding),
                "{}",
                mod_name
            );
        }
    }

    #[test]
    fn test_unsupported_mod_version() {
        let registry = GrammarRegistry::with_defaults();
        let result = registry.decode(&encode(FIXTURE), "MultiBuildBeta", &ModVersion::new(1, 2, 0));
        assert_eq!(
            result.diagnostic().map(|d| d.kind),
            Some(DiagnosticKind::UnsupportedModVersion)
        );
    }

    #[test]
    fn test_decompression_limit() {
        let limits = DecodeLimits {
            max_decompressed_len: 64,
            ..DecodeLimits::default()
        };
        let registry = GrammarRegistry::with_defaults().with_limits(limits);
        let result = registry.decode(&encode(FIXTURE), "MultiBuildBeta", &v206());
        assert!(result.diagnostic().unwrap().detail.contains("exceeds"));
    }

    #[test]
    fn test_decode_is_idempotent() {
        let registry = GrammarRegistry::with_defaults();
        let encoded = encode(FIXTURE);
        let first = registry.decode(&encoded, "MultiBuildBeta", &v206());
        let second = registry.decode(&encoded, "MultiBuildBeta", &v206());
        assert_eq!(first, second);
        assert!(first.is_success());
    }
}

mod validation {
    use super::*;
    use bpcheck::domain::BlueprintField;
    use bpcheck::grammar::GrammarRegistry;
    use bpcheck::validation::{validate, BlueprintDraft};

    #[test]
    fn test_valid_draft() {
        let encoded = encode(FIXTURE);
        let draft = BlueprintDraft {
            title: "Green circuits",
            encoded_blueprint: &encoded,
            mod_name: "MultiBuildBeta",
            mod_version: "2.0.6",
        };
        let validated = validate(&draft, &GrammarRegistry::with_defaults()).unwrap();
        assert!(!validated.decoded.is_pass_through());
    }

    #[test]
    fn test_wrong_format_attached_to_encoded_field() {
        let draft = BlueprintDraft {
            title: "Green circuits",
            encoded_blueprint: "definitely not base64 gzip",
            mod_name: "MultiBuildBeta",
            mod_version: "2.0.7",
        };
        let errors = validate(&draft, &GrammarRegistry::with_defaults()).unwrap_err();
        assert_eq!(
            errors.get(BlueprintField::EncodedBlueprint),
            &["Wrong blueprint format for mod version: MultiBuildBeta - 2.0.7".to_string()]
        );
        assert_eq!(
            errors.full_messages(),
            vec![
                "Encoded blueprint Wrong blueprint format for mod version: MultiBuildBeta - 2.0.7"
                    .to_string()
            ]
        );
    }
}

mod compatibility {
    use bpcheck::catalog::ModCatalog;
    use bpcheck::compat::{compatibility_range, is_latest, CompatibilityResolver};
    use bpcheck::domain::{ModRelease, ModVersion};
    use chrono::Utc;

    const CATALOG: &str = r#"
[[mods]]
name = "MultiBuildBeta"
latest = "3.1.0"
latest_updated_at = "2021-05-01T00:00:00Z"

[[mods.releases]]
version = "1.0.0"
breaking = true

[[mods.releases]]
version = "2.0.0"
breaking = true

[[mods.releases]]
version = "2.0.6"

[[mods.releases]]
version = "2.0.7"
breaking = true

[[mods.releases]]
version = "2.9.0"

[[mods.releases]]
version = "2.10.0"

[[mods.releases]]
version = "3.0.0"
breaking = true

[[mods.releases]]
version = "3.1.0"
"#;

    fn v(s: &str) -> ModVersion {
        ModVersion::parse(s).unwrap()
    }

    #[test]
    fn test_version_ordering() {
        assert!(v("1.0.0") < v("2.0.6"));
        assert!(v("2.0.6") < v("2.0.7"));
        assert!(v("1.0.0") < v("2.0.7"));
        assert!(v("2.9.0") < v("2.10.0"));
    }

    #[test]
    fn test_legacy_merge_from_catalog() {
        let catalog = ModCatalog::from_toml_str(CATALOG).unwrap();
        let game_mod = catalog.get("MultiBuildBeta").unwrap();

        let range = compatibility_range(&game_mod, &v("2.0.6")).unwrap();
        assert_eq!(range.lower, game_mod.range_for(&v("2.0.6")).unwrap().lower);
        assert_eq!(range.upper, game_mod.range_for(&v("3.1.0")).unwrap().upper);
        assert_eq!(range.to_string(), "2.0.0 - 3.1.0");
    }

    #[test]
    fn test_non_legacy_from_catalog() {
        let catalog = ModCatalog::from_toml_str(CATALOG).unwrap();
        let game_mod = catalog.get("MultiBuildBeta").unwrap();

        let range = compatibility_range(&game_mod, &v("2.0.7")).unwrap();
        assert_eq!(range, game_mod.range_for(&v("2.0.7")).unwrap());
        assert_eq!(range.to_string(), "2.0.7 - 2.10.0");
    }

    #[test]
    fn test_band_ordering_is_semantic() {
        let catalog = ModCatalog::from_toml_str(CATALOG).unwrap();
        let game_mod = catalog.get("MultiBuildBeta").unwrap();
        let range = compatibility_range(&game_mod, &v("2.10.0")).unwrap();
        assert_eq!(range.upper, v("2.10.0"));
        assert!(range.contains(&v("2.9.0")));
    }

    #[test]
    fn test_publication_moves_latest_for_new_snapshots_only() {
        let catalog = ModCatalog::from_toml_str(CATALOG).unwrap();
        let before = catalog.get("MultiBuildBeta").unwrap();

        catalog
            .publish("MultiBuildBeta", ModRelease::new(v("3.2.0")), Utc::now())
            .unwrap();
        let after = catalog.get("MultiBuildBeta").unwrap();

        let resolver = CompatibilityResolver::new();
        assert!(is_latest(&before, &v("3.1.0")));
        assert!(!is_latest(&after, &v("3.1.0")));
        assert_eq!(
            resolver
                .compatibility_range(&before, &v("2.0.6"))
                .unwrap()
                .to_string(),
            "2.0.0 - 3.1.0"
        );
        assert_eq!(
            resolver
                .compatibility_range(&after, &v("2.0.6"))
                .unwrap()
                .to_string(),
            "2.0.0 - 3.2.0"
        );
    }
}

mod parse_job {
    use super::*;
    use bpcheck::domain::{BlueprintId, BlueprintRecord, DecodedBlueprint, ModVersion, ParsedOutcome};
    use bpcheck::grammar::GrammarRegistry;
    use bpcheck::job::{InMemoryStore, JobConfig, ParseJobRunner};
    use std::sync::Arc;
    use std::time::Duration;

    fn record(encoded: String) -> BlueprintRecord {
        BlueprintRecord {
            id: BlueprintId(42),
            title: "Green circuits".to_string(),
            encoded_blueprint: encoded,
            mod_name: "MultiBuildBeta".to_string(),
            mod_version: ModVersion::new(2, 0, 6),
            revision: 0,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_triggers_store_latest_encoding_once() {
        let store = Arc::new(InMemoryStore::new());
        let runner = Arc::new(ParseJobRunner::with_config(
            Arc::clone(&store),
            Arc::new(GrammarRegistry::with_defaults()),
            JobConfig::default().with_base_delay(Duration::from_millis(1)),
        ));

        let first = store.commit(record("broken".to_string())).await;
        let second = store.commit(record(encode(FIXTURE))).await;

        let mut handles = Vec::new();
        for i in 0..20 {
            let runner = Arc::clone(&runner);
            let commit = if i % 2 == 0 { first.clone() } else { second.clone() };
            handles.push(tokio::spawn(async move { runner.after_commit(&commit).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.parsed_write_count(), 1);
        let parsed = store.parsed(BlueprintId(42)).await.unwrap();
        assert_eq!(parsed.revision, 2);
        match parsed.outcome {
            ParsedOutcome::Decoded(DecodedBlueprint::MultiBuildBeta(bp)) => {
                assert_eq!(bp.buildings.len(), 2);
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_parse_keeps_commit() {
        let store = Arc::new(InMemoryStore::new());
        let runner = ParseJobRunner::new(
            Arc::clone(&store),
            Arc::new(GrammarRegistry::with_defaults()),
        );

        let commit = store.commit(record("broken".to_string())).await;
        let outcome = runner.after_commit(&commit).await.unwrap();

        assert!(outcome.wrote());
        let parsed = store.parsed(BlueprintId(42)).await.unwrap();
        let failure = parsed.failure().unwrap();
        assert_eq!(
            failure.validation_message(),
            "Wrong blueprint format for mod version: MultiBuildBeta - 2.0.6"
        );
    }
}
