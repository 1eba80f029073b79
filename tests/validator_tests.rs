//! Tests for the workflow document validator
//!
//! - Structural pass: missing fields, wrong container kinds
//! - Settings pass: string-only saveData* settings, enumerations
//! - Node pass: duplicate names, whitelist, positions, credentials, strict ids
//! - Connection pass: dangling sources and targets, AI ports
//! - Security pass, metadata and determinism

use n8n_ci::node_types::NodeTypeSet;
use n8n_ci::validator::*;
use serde_json::{json, Value};

fn minimal() -> Value {
    json!({
        "name": "T",
        "nodes": [
            {"id": "1", "name": "Start", "type": "n8n-nodes-base.manualTrigger", "position": [0, 0]}
        ],
        "connections": {},
        "settings": {
            "saveDataSuccessExecution": "all",
            "saveDataErrorExecution": "all"
        }
    })
}

fn two_node() -> Value {
    json!({
        "name": "Two",
        "nodes": [
            {"id": "a", "name": "Start", "type": "n8n-nodes-base.manualTrigger", "position": [0, 0]},
            {"id": "b", "name": "Shape", "type": "n8n-nodes-base.set", "position": [250, 0]}
        ],
        "connections": {
            "Start": {"main": [[{"node": "Shape", "type": "main", "index": 0}]]}
        },
        "settings": {
            "executionOrder": "v1",
            "saveExecutionProgress": true,
            "saveDataSuccessExecution": "none",
            "saveDataErrorExecution": "all"
        }
    })
}

fn errors_at<'a>(report: &'a ValidationReport, path: &str) -> Vec<&'a Issue> {
    report.errors.iter().filter(|e| e.path == path).collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// Minimal documents
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_minimal_document_is_clean() {
    let report = validate(&minimal(), &ValidatorOptions::strict());

    assert!(report.valid);
    assert_eq!(report.status, ReportStatus::Passed);
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);
    assert_eq!(report.summary, Summary { errors: 0, warnings: 0 });
}

#[test]
fn test_connected_document_is_clean() {
    let report = validate(&two_node(), &ValidatorOptions::strict());
    assert!(report.valid, "{:?}", report.errors);
    assert!(report.warnings.is_empty());
}

#[test]
fn test_mapping_position_with_string_coordinate_only_warns() {
    let mut doc = minimal();
    doc["nodes"][0]["position"] = json!({"x": "0", "y": 0});

    let report = validate(&doc, &ValidatorOptions::strict());

    assert!(report.valid);
    assert_eq!(report.status, ReportStatus::PassedWithWarnings);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].path, "nodes[0].position.x");
    assert_eq!(report.warnings[0].kind, IssueKind::Advisory);
    assert_eq!(report.metadata.position_shapes, PositionShapes { pair: 0, mapping: 1 });
}

#[test]
fn test_pair_position_with_string_coordinate_only_warns() {
    let mut doc = minimal();
    doc["nodes"][0]["position"] = json!([0, "10"]);

    let report = validate(&doc, &ValidatorOptions::permissive());
    assert!(report.valid);
    assert_eq!(report.warnings[0].path, "nodes[0].position[1]");
}

#[test]
fn test_bad_position_shape_is_an_error() {
    let mut doc = minimal();
    doc["nodes"][0]["position"] = json!([1, 2, 3]);

    let report = validate(&doc, &ValidatorOptions::permissive());
    assert!(!report.valid);
    assert_eq!(errors_at(&report, "nodes[0].position").len(), 1);
}

// ═══════════════════════════════════════════════════════════════════════════
// Structural pass
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_each_missing_field_reported_once() {
    for field in ["name", "nodes", "connections", "settings"] {
        let mut doc = minimal();
        doc.as_object_mut().unwrap().remove(field);

        let report = validate(&doc, &ValidatorOptions::permissive());

        assert!(!report.valid);
        assert_eq!(report.errors.len(), 1, "{}: {:?}", field, report.errors);
        assert_eq!(report.errors[0].path, field);
        assert_eq!(report.errors[0].kind, IssueKind::Structural);
        assert_eq!(report.errors[0].message, format!("Missing required field: {}", field));
    }
}

#[test]
fn test_empty_object_reports_all_missing_fields() {
    let report = validate(&json!({}), &ValidatorOptions::strict());
    let paths: Vec<&str> = report.errors.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["name", "nodes", "connections", "settings"]);
}

#[test]
fn test_wrong_container_kinds() {
    let doc = json!({
        "name": "T",
        "nodes": {"Start": {}},
        "connections": [],
        "settings": "all"
    });

    let report = validate(&doc, &ValidatorOptions::permissive());

    assert_eq!(errors_at(&report, "nodes").len(), 1);
    assert_eq!(errors_at(&report, "connections").len(), 1);
    assert_eq!(errors_at(&report, "settings").len(), 1);
    assert_eq!(report.errors.len(), 3);
}

#[test]
fn test_passes_do_not_short_circuit() {
    let mut doc = two_node();
    doc.as_object_mut().unwrap().remove("name");
    doc["settings"]["saveDataErrorExecution"] = json!(false);
    doc["connections"]["Start"]["main"][0][0]["node"] = json!("Ghost");

    let report = validate(&doc, &ValidatorOptions::permissive());

    assert_eq!(errors_at(&report, "name").len(), 1);
    assert_eq!(errors_at(&report, "settings.saveDataErrorExecution").len(), 1);
    assert_eq!(errors_at(&report, "connections.Start.main[0][0]").len(), 1);
}

#[test]
fn test_non_object_top_level() {
    let report = validate(&json!([1, 2]), &ValidatorOptions::permissive());
    assert!(!report.valid);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, IssueKind::Parse);
}

#[test]
fn test_parse_failure_is_single_error() {
    let report = validate_str("{\"name\": ", &ValidatorOptions::strict());

    assert!(!report.valid);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].kind, IssueKind::Parse);
    assert!(report.errors[0].message.starts_with("Invalid JSON syntax"));
    assert!(report.warnings.is_empty());
    assert_eq!(report.metadata.node_count, 0);
}

// ═══════════════════════════════════════════════════════════════════════════
// Settings pass
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_boolean_save_data_setting_names_field() {
    let mut doc = minimal();
    doc["settings"]["saveDataSuccessExecution"] = json!(true);

    let report = validate(&doc, &ValidatorOptions::permissive());

    assert!(!report.valid);
    let errors = errors_at(&report, "settings.saveDataSuccessExecution");
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("saveDataSuccessExecution"));
    assert!(errors[0].message.contains("not boolean"));
    assert_eq!(errors[0].kind, IssueKind::Value);
}

#[test]
fn test_save_data_accepted_values() {
    for value in ["all", "none"] {
        let mut doc = minimal();
        doc["settings"]["saveDataSuccessExecution"] = json!(value);
        let report = validate(&doc, &ValidatorOptions::permissive());
        assert!(errors_at(&report, "settings.saveDataSuccessExecution").is_empty());
    }
}

#[test]
fn test_save_data_rejects_other_strings() {
    let mut doc = minimal();
    doc["settings"]["saveDataSuccessExecution"] = json!("yes");

    let report = validate(&doc, &ValidatorOptions::permissive());
    let errors = errors_at(&report, "settings.saveDataSuccessExecution");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("all, none"));
    assert!(errors[0].message.contains("yes"));
}

#[test]
fn test_optional_settings_are_type_checked() {
    let mut doc = minimal();
    doc["settings"]["executionOrder"] = json!("v2");
    doc["settings"]["saveExecutionProgress"] = json!("true");

    let report = validate(&doc, &ValidatorOptions::permissive());

    assert_eq!(errors_at(&report, "settings.executionOrder").len(), 1);
    assert_eq!(errors_at(&report, "settings.saveExecutionProgress").len(), 1);
}

#[test]
fn test_missing_required_setting() {
    let mut doc = minimal();
    doc["settings"] = json!({"saveDataSuccessExecution": "all"});

    let report = validate(&doc, &ValidatorOptions::permissive());
    let errors = errors_at(&report, "settings.saveDataErrorExecution");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, IssueKind::Structural);
}

// ═══════════════════════════════════════════════════════════════════════════
// Node pass
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_duplicate_names_flag_later_occurrences_only() {
    let mut doc = minimal();
    let node = doc["nodes"][0].clone();
    let nodes = doc["nodes"].as_array_mut().unwrap();
    for id in ["2", "3"] {
        let mut copy = node.clone();
        copy["id"] = json!(id);
        nodes.push(copy);
    }

    let report = validate(&doc, &ValidatorOptions::permissive());

    assert!(errors_at(&report, "nodes[0].name").is_empty());
    assert_eq!(errors_at(&report, "nodes[1].name").len(), 1);
    assert_eq!(errors_at(&report, "nodes[2].name").len(), 1);
    assert!(report.errors[0].message.contains("Duplicate node name: Start"));
}

#[test]
fn test_missing_node_fields() {
    let mut doc = minimal();
    doc["nodes"] = json!([{"id": "1"}]);

    let report = validate(&doc, &ValidatorOptions::permissive());

    for field in ["name", "type", "position"] {
        assert_eq!(errors_at(&report, &format!("nodes[0].{}", field)).len(), 1);
    }
}

#[test]
fn test_whitelist_names_type_and_node() {
    let mut doc = minimal();
    doc["nodes"][0]["type"] = json!("n8n-nodes-base.openai");

    let report = validate(&doc, &ValidatorOptions::strict());
    let errors = errors_at(&report, "nodes[0].type");

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, IssueKind::Reference);
    assert!(errors[0].message.contains("n8n-nodes-base.openai"));
    assert!(errors[0].message.contains("\"Start\""));
    assert!(errors[0].message.contains("@n8n/n8n-nodes-langchain.lmChatOpenAi"));
}

#[test]
fn test_whitelist_falls_back_to_index() {
    let mut doc = minimal();
    doc["nodes"][0].as_object_mut().unwrap().remove("name");
    doc["nodes"][0]["type"] = json!("webhook");

    let report = validate(&doc, &ValidatorOptions::strict());
    let errors = errors_at(&report, "nodes[0].type");

    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("at index 0"));
    assert!(errors[0].message.contains("n8n-nodes-base.webhook"));
}

#[test]
fn test_permissive_has_no_whitelist() {
    let mut doc = minimal();
    doc["nodes"][0]["type"] = json!("community.customThing");
    assert!(validate(&doc, &ValidatorOptions::permissive()).valid);
}

#[test]
fn test_injected_whitelist() {
    let allowed: NodeTypeSet = ["community.customThing"].into_iter().collect();
    let options = ValidatorOptions::permissive().with_allowed_node_types(allowed);

    let mut doc = minimal();
    assert!(!validate(&doc, &options).valid);

    doc["nodes"][0]["type"] = json!("community.customThing");
    assert!(validate(&doc, &options).valid);
}

#[test]
fn test_credentials_warn_without_failing() {
    let mut doc = minimal();
    doc["nodes"][0]["credentials"] = json!({"slackApi": {"id": "9", "name": "Slack"}});

    let report = validate(&doc, &ValidatorOptions::permissive());

    assert!(report.valid);
    assert!(report.warnings.iter().any(|w| w.path == "nodes[0].credentials"));
    assert!(report.metadata.has_credentials);
    assert!(report.metadata.credential_types.contains("slackApi"));
}

#[test]
fn test_strict_node_id_rules() {
    let mut doc = two_node();
    doc["nodes"][1]["id"] = json!("a");
    doc["nodes"].as_array_mut().unwrap().push(json!({
        "name": "Third", "type": "n8n-nodes-base.set", "position": [500, 0]
    }));

    let strict = validate(&doc, &ValidatorOptions::strict());
    assert!(errors_at(&strict, "nodes[0].id").is_empty());
    assert_eq!(errors_at(&strict, "nodes[1].id").len(), 1);
    assert_eq!(errors_at(&strict, "nodes[2].id").len(), 1);

    let permissive = validate(&doc, &ValidatorOptions::permissive());
    assert!(permissive.valid, "{:?}", permissive.errors);
}

// ═══════════════════════════════════════════════════════════════════════════
// Connection pass
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_dangling_target_is_named() {
    let mut doc = two_node();
    doc["connections"]["Start"]["main"][0][0]["node"] = json!("Ghost");

    let report = validate(&doc, &ValidatorOptions::permissive());
    let errors = errors_at(&report, "connections.Start.main[0][0]");

    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].kind, IssueKind::Reference);
    assert!(errors[0].message.contains("Ghost"));
}

#[test]
fn test_dangling_source() {
    let mut doc = two_node();
    doc["connections"]["Nobody"] = json!({"main": [[{"node": "Shape", "type": "main", "index": 0}]]});

    let report = validate(&doc, &ValidatorOptions::permissive());
    assert_eq!(errors_at(&report, "connections.Nobody").len(), 1);
    assert_eq!(report.errors.len(), 1);
}

#[test]
fn test_ai_ports_and_empty_slots() {
    let doc = json!({
        "name": "Agent",
        "nodes": [
            {"id": "1", "name": "Chat", "type": "@n8n/n8n-nodes-langchain.chatTrigger", "position": [0, 0]},
            {"id": "2", "name": "Agent", "type": "@n8n/n8n-nodes-langchain.agent", "position": [250, 0]},
            {"id": "3", "name": "Model", "type": "@n8n/n8n-nodes-langchain.lmChatOpenAi", "position": [250, 200]}
        ],
        "connections": {
            "Chat": {"main": [[{"node": "Agent", "type": "main", "index": 0}], []]},
            "Model": {"ai_languageModel": [[{"node": "Agent", "type": "ai_languageModel", "index": 0}]]}
        },
        "settings": {"saveDataSuccessExecution": "all", "saveDataErrorExecution": "none"}
    });

    let report = validate(&doc, &ValidatorOptions::strict());
    assert!(report.valid, "{:?}", report.errors);
}

#[test]
fn test_connections_skipped_without_node_list() {
    let mut doc = two_node();
    doc["nodes"] = json!("not a list");

    let report = validate(&doc, &ValidatorOptions::permissive());
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].path, "nodes");
}

// ═══════════════════════════════════════════════════════════════════════════
// Security pass
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_sensitive_patterns_warn_once_each() {
    let mut doc = minimal();
    doc["nodes"][0]["parameters"] = json!({
        "headerName": "API_KEY",
        "other": "api-key",
        "value": "Password"
    });

    let report = validate(&doc, &ValidatorOptions::permissive());

    assert!(report.valid);
    let advisory: Vec<&str> = report.warnings.iter().map(|w| w.message.as_str()).collect();
    assert_eq!(advisory.len(), 2, "{:?}", advisory);
    assert!(advisory.iter().any(|m| m.contains("api[_-]?key")));
    assert!(advisory.iter().any(|m| m.contains("password")));
}

// ═══════════════════════════════════════════════════════════════════════════
// Metadata, determinism, files
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_metadata() {
    let report = validate(&two_node(), &ValidatorOptions::permissive());
    let meta = &report.metadata;

    assert_eq!(meta.name.as_deref(), Some("Two"));
    assert_eq!(meta.node_count, 2);
    assert_eq!(meta.node_types.len(), 2);
    assert_eq!(meta.trigger_nodes.len(), 1);
    assert_eq!(meta.trigger_nodes[0].name.as_deref(), Some("Start"));
    assert!(!meta.has_credentials);
    assert_eq!(meta.position_shapes, PositionShapes { pair: 2, mapping: 0 });
}

#[test]
fn test_validation_is_deterministic() {
    let mut doc = two_node();
    doc["settings"]["saveDataSuccessExecution"] = json!(true);
    doc["nodes"][1]["credentials"] = json!({"b": {}, "a": {}});

    let first = serde_json::to_string(&validate(&doc, &ValidatorOptions::strict())).unwrap();
    let second = serde_json::to_string(&validate(&doc, &ValidatorOptions::strict())).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_report_serializes_status_and_kinds() {
    let mut doc = minimal();
    doc["settings"]["saveDataSuccessExecution"] = json!(true);

    let value = serde_json::to_value(validate(&doc, &ValidatorOptions::permissive())).unwrap();
    assert_eq!(value["status"], "failed");
    assert_eq!(value["errors"][0]["kind"], "value");
    assert_eq!(value["summary"]["errors"], 1);
    assert!(value.get("file").is_none());
}

#[test]
fn test_validate_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("flow.json");
    std::fs::write(&path, serde_json::to_string_pretty(&minimal()).unwrap()).unwrap();

    let report = validate_file(&path, &ValidatorOptions::strict());
    assert!(report.valid);
    assert_eq!(report.file.as_deref(), Some(path.display().to_string().as_str()));

    let missing = validate_file(&dir.path().join("missing.json"), &ValidatorOptions::strict());
    assert!(!missing.valid);
    assert_eq!(missing.errors.len(), 1);
    assert!(missing.errors[0].message.starts_with("Failed to read file"));
}

#[test]
fn test_error_text_joins_messages() {
    let report = validate(&json!({"name": "T"}), &ValidatorOptions::permissive());
    let text = report.error_text();
    assert_eq!(text.lines().count(), 3);
    assert!(text.contains("Missing required field: nodes (at: nodes)"));
}
