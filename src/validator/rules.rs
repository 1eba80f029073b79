//! Declarative rule tables for workflow documents.

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use serde_json::Value;

/// Top-level fields every workflow must carry.
pub const REQUIRED_FIELDS: &[&str] = &["name", "nodes", "connections", "settings"];

/// Fields every node must carry.
pub const NODE_REQUIRED_FIELDS: &[&str] = &["name", "type", "position"];

/// Settings that n8n rejects as booleans. Models get this wrong constantly.
pub const STRING_ONLY_SETTINGS: &[&str] = &["saveDataSuccessExecution", "saveDataErrorExecution"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingType {
    String,
    Boolean,
}

impl SettingType {
    pub fn name(&self) -> &'static str {
        match self {
            SettingType::String => "string",
            SettingType::Boolean => "boolean",
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        match self {
            SettingType::String => value.is_string(),
            SettingType::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SettingRule {
    pub key: &'static str,
    pub value_type: SettingType,
    /// Enumerated values; empty means any value of the right type.
    pub values: &'static [&'static str],
    pub required: bool,
}

pub const SETTINGS_RULES: &[SettingRule] = &[
    SettingRule {
        key: "saveDataSuccessExecution",
        value_type: SettingType::String,
        values: &["all", "none"],
        required: true,
    },
    SettingRule {
        key: "saveDataErrorExecution",
        value_type: SettingType::String,
        values: &["all", "none"],
        required: true,
    },
    SettingRule {
        key: "executionOrder",
        value_type: SettingType::String,
        values: &["v0", "v1"],
        required: false,
    },
    SettingRule {
        key: "saveExecutionProgress",
        value_type: SettingType::Boolean,
        values: &[],
        required: false,
    },
];

/// Heuristic patterns for secrets embedded in a workflow.
pub const SENSITIVE_PATTERNS: &[&str] = &[
    r"api[_-]?key",
    r"api[_-]?secret",
    r"password",
    r"token",
    r"credential",
];

/// Compiled, case-insensitive [`SENSITIVE_PATTERNS`] paired with their source.
pub fn sensitive_patterns() -> &'static [(&'static str, Regex)] {
    static COMPILED: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        SENSITIVE_PATTERNS
            .iter()
            .filter_map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .build()
                    .ok()
                    .map(|re| (*p, re))
            })
            .collect()
    })
}

/// JSON type name as it appears in error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Render a value for a message without quoting strings.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
