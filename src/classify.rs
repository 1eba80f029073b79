//! Best-effort classification of free-text validation errors.
//!
//! Error phrasings come from n8n imports, our own validator and the model
//! itself. The category set is closed; anything unrecognised falls back to
//! [`ErrorCategory::Unknown`].

use std::sync::OnceLock;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    DuplicateId,
    MissingNode,
    InvalidConnection,
    MissingParameter,
    InvalidType,
    SyntaxError,
    SettingsError,
    Unknown,
}

/// Checked in order; the first match wins.
const PATTERNS: &[(ErrorCategory, &str)] = &[
    (ErrorCategory::DuplicateId, r"duplicate.*id"),
    (ErrorCategory::MissingNode, r"node.*not.*found|cannot.*find.*node"),
    (ErrorCategory::InvalidConnection, r"invalid.*connection|connection.*error"),
    (ErrorCategory::MissingParameter, r"missing.*required.*parameter|parameter.*required"),
    (ErrorCategory::InvalidType, r"invalid.*type|type.*error"),
    (ErrorCategory::SyntaxError, r"syntax.*error|unexpected.*token"),
    (
        ErrorCategory::SettingsError,
        r"settings.*must.*be.*string|savedata.*must.*be.*string",
    ),
];

fn compiled() -> &'static [(ErrorCategory, Regex)] {
    static COMPILED: OnceLock<Vec<(ErrorCategory, Regex)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .filter_map(|(category, pattern)| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .ok()
                    .map(|re| (*category, re))
            })
            .collect()
    })
}

/// Classify an error message.
pub fn classify(message: &str) -> ErrorCategory {
    compiled()
        .iter()
        .find(|(_, re)| re.is_match(message))
        .map(|(category, _)| *category)
        .unwrap_or(ErrorCategory::Unknown)
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::DuplicateId => "duplicateId",
            ErrorCategory::MissingNode => "missingNode",
            ErrorCategory::InvalidConnection => "invalidConnection",
            ErrorCategory::MissingParameter => "missingParameter",
            ErrorCategory::InvalidType => "invalidType",
            ErrorCategory::SyntaxError => "syntaxError",
            ErrorCategory::SettingsError => "settingsError",
            ErrorCategory::Unknown => "unknown",
        }
    }

    /// Fix instructions embedded in the correction prompt.
    pub fn instructions(&self) -> &'static str {
        match self {
            ErrorCategory::DuplicateId => {
                "- Check all node IDs and ensure each one is unique
- Generate new UUIDs for any duplicate IDs found
- Update any connections that reference the changed IDs"
            }
            ErrorCategory::MissingNode => {
                "- Identify which node is being referenced but doesn't exist
- Either create the missing node or fix the reference to point to an existing node
- Ensure all connection references are valid"
            }
            ErrorCategory::InvalidConnection => {
                "- Check the connections object structure
- Ensure all node names in connections exist in the nodes array
- Verify connection points (main, ai_tool, etc.) are valid for the node types"
            }
            ErrorCategory::MissingParameter => {
                "- Identify which node is missing required parameters
- Add the missing required parameters with appropriate default values
- Refer to n8n documentation for the specific node type's requirements"
            }
            ErrorCategory::InvalidType => {
                "- Check data types of all parameters
- Remember: saveDataSuccessExecution and saveDataErrorExecution must be strings (\"all\" or \"none\")
- Ensure boolean values are not quoted and string values are properly quoted"
            }
            ErrorCategory::SyntaxError => {
                "- Fix any JSON syntax errors (missing commas, brackets, quotes)
- Ensure proper JSON structure throughout
- Validate that all strings are properly escaped"
            }
            ErrorCategory::SettingsError => {
                "- Ensure settings.saveDataSuccessExecution is a string (\"all\" or \"none\"), not a boolean
- Ensure settings.saveDataErrorExecution is a string (\"all\" or \"none\"), not a boolean
- Check that executionOrder is set to \"v1\"
- Verify saveExecutionProgress is a boolean (true or false)"
            }
            ErrorCategory::Unknown => {
                "- Read the error message carefully
- Identify the specific issue mentioned
- Apply appropriate fixes based on n8n workflow requirements"
            }
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_phrasings() {
        assert_eq!(classify("Duplicate node ID: abc"), ErrorCategory::DuplicateId);
        assert_eq!(classify("Node 'Foo' not found"), ErrorCategory::MissingNode);
        assert_eq!(classify("Cannot find node Bar"), ErrorCategory::MissingNode);
        assert_eq!(classify("Invalid connection from A"), ErrorCategory::InvalidConnection);
        assert_eq!(
            classify("Missing required parameter 'url'"),
            ErrorCategory::MissingParameter
        );
        assert_eq!(classify("TypeError: x is undefined"), ErrorCategory::InvalidType);
        assert_eq!(classify("Unexpected token } in JSON"), ErrorCategory::SyntaxError);
        assert_eq!(
            classify("saveDataSuccessExecution must be a string"),
            ErrorCategory::SettingsError
        );
    }

    #[test]
    fn test_first_match_wins() {
        // Matches both duplicate-id and missing-node; order decides.
        assert_eq!(
            classify("duplicate id, node not found"),
            ErrorCategory::DuplicateId
        );
    }

    #[test]
    fn test_unknown_fallback() {
        assert_eq!(classify("the moon is made of cheese"), ErrorCategory::Unknown);
        assert_eq!(classify(""), ErrorCategory::Unknown);
    }
}
