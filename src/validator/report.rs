//! Validation report types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::node_types::is_trigger_type;

/// Taxonomy of validation findings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    /// Input text is not JSON, or not a JSON object.
    Parse,
    /// Required field missing or wrong container kind.
    Structural,
    /// Connection or node-type reference does not resolve.
    Reference,
    /// Value violates its declared type or enumerated set.
    Value,
    /// Never affects the verdict.
    Advisory,
}

/// A single error or warning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Issue {
    pub kind: IssueKind,
    pub message: String,
    /// Dotted/bracketed locator, empty when document-wide.
    #[serde(default)]
    pub path: String,
}

impl Issue {
    pub fn new(kind: IssueKind, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: path.into(),
        }
    }
}

/// Overall outcome, derived from error/warning counts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Passed,
    PassedWithWarnings,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
}

/// A node whose type implies it starts execution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerNode {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub node_type: String,
}

/// The two accepted `position` encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionShape {
    /// `[x, y]`
    Pair,
    /// `{"x": .., "y": ..}`
    Mapping,
}

impl PositionShape {
    /// Classify a `position` value; `None` for anything else.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Array(items) if items.len() == 2 => Some(PositionShape::Pair),
            Value::Object(_) => Some(PositionShape::Mapping),
            _ => None,
        }
    }
}

/// How many nodes used each position shape.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PositionShapes {
    pub pair: usize,
    pub mapping: usize,
}

/// Facts derived from the document, independent of the verdict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WorkflowMetadata {
    pub name: Option<String>,
    pub workflow_id: Option<String>,
    pub node_count: usize,
    pub node_types: BTreeSet<String>,
    pub trigger_nodes: Vec<TriggerNode>,
    pub credential_types: BTreeSet<String>,
    pub has_credentials: bool,
    pub position_shapes: PositionShapes,
}

impl WorkflowMetadata {
    /// Collect metadata from an untrusted document. Never fails; anything
    /// that does not have the expected shape is skipped.
    pub fn collect(document: &Value) -> Self {
        let mut meta = WorkflowMetadata {
            name: document.get("name").and_then(Value::as_str).map(str::to_string),
            workflow_id: document.get("id").and_then(Value::as_str).map(str::to_string),
            ..Default::default()
        };

        let Some(nodes) = document.get("nodes").and_then(Value::as_array) else {
            return meta;
        };
        meta.node_count = nodes.len();

        for node in nodes {
            let name = node.get("name").and_then(Value::as_str).map(str::to_string);

            if let Some(node_type) = node.get("type").and_then(Value::as_str) {
                meta.node_types.insert(node_type.to_string());
                if is_trigger_type(node_type) {
                    meta.trigger_nodes.push(TriggerNode {
                        name: name.clone(),
                        node_type: node_type.to_string(),
                    });
                }
            }

            if let Some(creds) = node.get("credentials").and_then(Value::as_object) {
                if !creds.is_empty() {
                    meta.has_credentials = true;
                }
                meta.credential_types.extend(creds.keys().cloned());
            }

            match node.get("position").and_then(PositionShape::of) {
                Some(PositionShape::Pair) => meta.position_shapes.pair += 1,
                Some(PositionShape::Mapping) => meta.position_shapes.mapping += 1,
                None => {}
            }
        }

        meta
    }
}

/// Result of a validation run. `valid` is true iff `errors` is empty.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ValidationReport {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub valid: bool,
    pub status: ReportStatus,
    pub summary: Summary,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub metadata: WorkflowMetadata,
}

impl ValidationReport {
    pub fn new(errors: Vec<Issue>, warnings: Vec<Issue>, metadata: WorkflowMetadata) -> Self {
        let valid = errors.is_empty();
        let status = if !valid {
            ReportStatus::Failed
        } else if warnings.is_empty() {
            ReportStatus::Passed
        } else {
            ReportStatus::PassedWithWarnings
        };

        Self {
            file: None,
            valid,
            status,
            summary: Summary {
                errors: errors.len(),
                warnings: warnings.len(),
            },
            errors,
            warnings,
            metadata,
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    /// All error messages joined one per line, for feeding back to the model.
    pub fn error_text(&self) -> String {
        self.errors
            .iter()
            .map(|e| {
                if e.path.is_empty() {
                    e.message.clone()
                } else {
                    format!("{} (at: {})", e.message, e.path)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn has_error_at(&self, path: &str) -> bool {
        self.errors.iter().any(|e| e.path == path)
    }
}
