//! Workflow document validator.
//!
//! A pure function over an untrusted JSON document. Passes run
//! independently and collect every issue they find; only a parse failure
//! (or a non-object top level) stops early. The verdict is `valid` iff no
//! errors were collected.

pub mod report;
pub mod rules;

use std::collections::HashSet;
use std::path::Path;

use serde_json::{Map, Value};

use crate::node_types::NodeTypeSet;

pub use report::*;
use rules::*;

/// Rule selection for a validation run.
#[derive(Debug, Clone, Default)]
pub struct ValidatorOptions {
    /// When set, every node type must be a member.
    pub allowed_node_types: Option<NodeTypeSet>,
    /// Enables node-id presence and uniqueness rules.
    pub strict: bool,
}

impl ValidatorOptions {
    /// Structural, settings, reference and advisory rules only.
    pub fn permissive() -> Self {
        Self::default()
    }

    /// Built-in whitelist plus node-id rules.
    pub fn strict() -> Self {
        Self {
            allowed_node_types: Some(NodeTypeSet::builtin()),
            strict: true,
        }
    }

    pub fn with_allowed_node_types(mut self, types: NodeTypeSet) -> Self {
        self.allowed_node_types = Some(types);
        self
    }
}

/// Validate an already-parsed document.
pub fn validate(document: &Value, options: &ValidatorOptions) -> ValidationReport {
    let Some(root) = document.as_object() else {
        return ValidationReport::new(
            vec![Issue::new(
                IssueKind::Parse,
                format!(
                    "Workflow document must be a JSON object, got {}",
                    json_type_name(document)
                ),
                "",
            )],
            Vec::new(),
            WorkflowMetadata::default(),
        );
    };

    let mut issues = Issues::default();

    check_structure(root, &mut issues);
    check_settings(root, &mut issues);
    let node_names = check_nodes(root, options, &mut issues);
    check_connections(root, node_names.as_ref(), &mut issues);
    check_sensitive_data(document, &mut issues);

    ValidationReport::new(issues.errors, issues.warnings, WorkflowMetadata::collect(document))
}

/// Validate raw JSON text. Parse failures become a single error.
pub fn validate_str(text: &str, options: &ValidatorOptions) -> ValidationReport {
    match serde_json::from_str::<Value>(text) {
        Ok(document) => validate(&document, options),
        Err(e) => ValidationReport::new(
            vec![Issue::new(
                IssueKind::Parse,
                format!("Invalid JSON syntax: {}", e),
                "",
            )],
            Vec::new(),
            WorkflowMetadata::default(),
        ),
    }
}

/// Validate a file on disk. Read failures become a single error.
pub fn validate_file(path: &Path, options: &ValidatorOptions) -> ValidationReport {
    let report = match std::fs::read_to_string(path) {
        Ok(text) => validate_str(&text, options),
        Err(e) => ValidationReport::new(
            vec![Issue::new(
                IssueKind::Structural,
                format!("Failed to read file: {}", e),
                "",
            )],
            Vec::new(),
            WorkflowMetadata::default(),
        ),
    };
    report.with_file(path.display().to_string())
}

#[derive(Default)]
struct Issues {
    errors: Vec<Issue>,
    warnings: Vec<Issue>,
}

impl Issues {
    fn error(&mut self, kind: IssueKind, message: impl Into<String>, path: impl Into<String>) {
        self.errors.push(Issue::new(kind, message, path));
    }

    fn warn(&mut self, message: impl Into<String>, path: impl Into<String>) {
        self.warnings.push(Issue::new(IssueKind::Advisory, message, path));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Structural pass
// ═══════════════════════════════════════════════════════════════════════════

fn check_structure(root: &Map<String, Value>, issues: &mut Issues) {
    for field in REQUIRED_FIELDS {
        if !root.contains_key(*field) {
            issues.error(
                IssueKind::Structural,
                format!("Missing required field: {}", field),
                *field,
            );
        }
    }

    if root.get("nodes").is_some_and(|v| !v.is_array()) {
        issues.error(IssueKind::Structural, "Field \"nodes\" must be an array", "nodes");
    }
    if root.get("connections").is_some_and(|v| !v.is_object()) {
        issues.error(
            IssueKind::Structural,
            "Field \"connections\" must be an object",
            "connections",
        );
    }
    if root.get("settings").is_some_and(|v| !v.is_object()) {
        issues.error(IssueKind::Structural, "Field \"settings\" must be an object", "settings");
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Settings pass
// ═══════════════════════════════════════════════════════════════════════════

fn check_settings(root: &Map<String, Value>, issues: &mut Issues) {
    let Some(settings) = root.get("settings").and_then(Value::as_object) else {
        return;
    };

    for rule in SETTINGS_RULES {
        let path = format!("settings.{}", rule.key);

        let Some(value) = settings.get(rule.key) else {
            if rule.required {
                issues.error(
                    IssueKind::Structural,
                    format!("Missing required setting: {}", rule.key),
                    path,
                );
            }
            continue;
        };

        // Reported on its own so the generic type message never doubles it.
        if value.is_boolean() && STRING_ONLY_SETTINGS.contains(&rule.key) {
            issues.error(
                IssueKind::Value,
                format!(
                    "{} must be a string (\"all\" or \"none\"), not boolean",
                    rule.key
                ),
                path,
            );
            continue;
        }

        if !rule.value_type.matches(value) {
            issues.error(
                IssueKind::Value,
                format!(
                    "Setting \"{}\" must be of type {}, got {}",
                    rule.key,
                    rule.value_type.name(),
                    json_type_name(value)
                ),
                path,
            );
            continue;
        }

        if let Some(s) = value.as_str() {
            if !rule.values.is_empty() && !rule.values.contains(&s) {
                issues.error(
                    IssueKind::Value,
                    format!(
                        "Setting \"{}\" must be one of: {}. Got: {}",
                        rule.key,
                        rule.values.join(", "),
                        display_value(value)
                    ),
                    path,
                );
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Node pass
// ═══════════════════════════════════════════════════════════════════════════

/// Returns the set of node names, or `None` when `nodes` is not a list.
fn check_nodes(
    root: &Map<String, Value>,
    options: &ValidatorOptions,
    issues: &mut Issues,
) -> Option<HashSet<String>> {
    let nodes = root.get("nodes").and_then(Value::as_array)?;

    let mut names = HashSet::new();
    let mut ids = HashSet::new();

    for (index, node) in nodes.iter().enumerate() {
        let node_path = format!("nodes[{}]", index);

        let Some(fields) = node.as_object() else {
            issues.error(
                IssueKind::Structural,
                format!("Node must be an object, got {}", json_type_name(node)),
                node_path,
            );
            continue;
        };

        for field in NODE_REQUIRED_FIELDS {
            if !fields.contains_key(*field) {
                issues.error(
                    IssueKind::Structural,
                    format!("Node missing required field: {}", field),
                    format!("{}.{}", node_path, field),
                );
            }
        }

        let name = fields.get("name").and_then(Value::as_str);
        match (fields.get("name"), name) {
            (Some(_), Some(name)) => {
                if !names.insert(name.to_string()) {
                    issues.error(
                        IssueKind::Structural,
                        format!("Duplicate node name: {}", name),
                        format!("{}.name", node_path),
                    );
                }
            }
            (Some(other), None) => issues.error(
                IssueKind::Value,
                format!("Node name must be a string, got {}", json_type_name(other)),
                format!("{}.name", node_path),
            ),
            (None, _) => {}
        }

        let label = match name {
            Some(name) => format!("\"{}\"", name),
            None => format!("at index {}", index),
        };

        if options.strict {
            check_node_id(fields, &node_path, &mut ids, issues);
        }

        if let Some(node_type) = fields.get("type") {
            match node_type.as_str() {
                Some(node_type) => {
                    if let Some(allowed) = &options.allowed_node_types {
                        if !allowed.contains(node_type) {
                            let hint = allowed
                                .suggest(node_type)
                                .map(|s| format!(" (use \"{}\" instead)", s))
                                .unwrap_or_default();
                            issues.error(
                                IssueKind::Reference,
                                format!(
                                    "Invalid node type \"{}\" in node {}{}",
                                    node_type, label, hint
                                ),
                                format!("{}.type", node_path),
                            );
                        }
                    }
                }
                None => issues.error(
                    IssueKind::Value,
                    format!("Node type must be a string, got {}", json_type_name(node_type)),
                    format!("{}.type", node_path),
                ),
            }
        }

        if let Some(position) = fields.get("position") {
            check_position(position, &node_path, issues);
        }

        if let Some(creds) = fields.get("credentials").and_then(Value::as_object) {
            if !creds.is_empty() {
                issues.warn(
                    format!(
                        "Node {} contains credentials that will be removed on import",
                        label
                    ),
                    format!("{}.credentials", node_path),
                );
            }
        }
    }

    Some(names)
}

fn check_node_id(
    fields: &Map<String, Value>,
    node_path: &str,
    seen: &mut HashSet<String>,
    issues: &mut Issues,
) {
    let path = format!("{}.id", node_path);
    match fields.get("id") {
        None => issues.error(IssueKind::Structural, "Node missing required field: id", path),
        Some(Value::String(id)) if id.is_empty() => {
            issues.error(IssueKind::Value, "Node id must not be empty", path)
        }
        Some(Value::String(id)) => {
            if !seen.insert(id.clone()) {
                issues.error(IssueKind::Structural, format!("Duplicate node ID: {}", id), path);
            }
        }
        Some(other) => issues.error(
            IssueKind::Value,
            format!("Node id must be a string, got {}", json_type_name(other)),
            path,
        ),
    }
}

fn check_position(position: &Value, node_path: &str, issues: &mut Issues) {
    match (PositionShape::of(position), position) {
        (Some(PositionShape::Pair), Value::Array(coords)) => {
            for (i, axis) in ["x", "y"].iter().enumerate() {
                if !coords[i].is_number() {
                    issues.warn(
                        format!("Node position.{} should be a number", axis),
                        format!("{}.position[{}]", node_path, i),
                    );
                }
            }
        }
        (Some(PositionShape::Mapping), Value::Object(coords)) => {
            for axis in ["x", "y"] {
                if !coords.get(axis).is_some_and(Value::is_number) {
                    issues.warn(
                        format!("Node position.{} should be a number", axis),
                        format!("{}.position.{}", node_path, axis),
                    );
                }
            }
        }
        _ => issues.error(
            IssueKind::Value,
            "Node position must be an [x, y] pair or an {x, y} object",
            format!("{}.position", node_path),
        ),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Connection pass
// ═══════════════════════════════════════════════════════════════════════════

fn check_connections(
    root: &Map<String, Value>,
    node_names: Option<&HashSet<String>>,
    issues: &mut Issues,
) {
    // Without a node list every reference would dangle; the structural pass
    // has already reported that.
    let (Some(names), Some(connections)) =
        (node_names, root.get("connections").and_then(Value::as_object))
    else {
        return;
    };

    for (source, ports) in connections {
        let source_path = format!("connections.{}", source);

        if !names.contains(source) {
            issues.error(
                IssueKind::Reference,
                format!("Connection references non-existent source node: {}", source),
                source_path.clone(),
            );
        }

        let Some(ports) = ports.as_object() else {
            issues.error(
                IssueKind::Structural,
                format!("Invalid connection structure for node: {}", source),
                source_path,
            );
            continue;
        };

        for (port, slots) in ports {
            let port_path = format!("{}.{}", source_path, port);
            let Some(slots) = slots.as_array() else {
                issues.error(
                    IssueKind::Structural,
                    format!("Connection output \"{}\" of node {} must be a list", port, source),
                    port_path,
                );
                continue;
            };

            for (slot_index, slot) in slots.iter().enumerate() {
                let slot_path = format!("{}[{}]", port_path, slot_index);
                let targets = match slot {
                    Value::Array(targets) => targets,
                    Value::Null => continue,
                    _ => {
                        issues.error(
                            IssueKind::Structural,
                            format!("Connection slot of node {} must be a list", source),
                            slot_path,
                        );
                        continue;
                    }
                };

                for (target_index, target) in targets.iter().enumerate() {
                    let target_path = format!("{}[{}]", slot_path, target_index);
                    match target.get("node").and_then(Value::as_str) {
                        Some(node) if names.contains(node) => {}
                        Some(node) => issues.error(
                            IssueKind::Reference,
                            format!("Connection references non-existent target node: {}", node),
                            target_path,
                        ),
                        None => issues.error(
                            IssueKind::Structural,
                            format!("Connection target from node {} has no node name", source),
                            target_path,
                        ),
                    }
                }
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Security pass (advisory)
// ═══════════════════════════════════════════════════════════════════════════

fn check_sensitive_data(document: &Value, issues: &mut Issues) {
    let text = document.to_string();
    for (source, pattern) in sensitive_patterns() {
        if pattern.is_match(&text) {
            issues.warn(
                format!("Potential sensitive data detected matching pattern: {}", source),
                "",
            );
        }
    }
}
