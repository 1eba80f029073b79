//! Built-in node type registry.
//!
//! The generator prompt and the whitelist gate both read from this table so
//! the model is only ever told about types the validator accepts.

use std::collections::BTreeSet;

/// Registry grouping, used to lay out the prompt's node list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeCategory {
    Trigger,
    Core,
    Ai,
    Integration,
}

impl NodeCategory {
    pub fn heading(&self) -> &'static str {
        match self {
            NodeCategory::Trigger => "TRIGGER NODES (at least one required)",
            NodeCategory::Core => "CORE NODES",
            NodeCategory::Ai => "AI/LLM NODES (langchain package)",
            NodeCategory::Integration => "INTEGRATION NODES",
        }
    }

    pub const ALL: [NodeCategory; 4] = [
        NodeCategory::Trigger,
        NodeCategory::Core,
        NodeCategory::Ai,
        NodeCategory::Integration,
    ];
}

/// A known node type with the version the generator should emit.
#[derive(Debug, Clone, Copy)]
pub struct NodeTypeEntry {
    pub name: &'static str,
    pub version: &'static str,
    pub category: NodeCategory,
    pub note: Option<&'static str>,
}

const fn entry(
    name: &'static str,
    version: &'static str,
    category: NodeCategory,
    note: Option<&'static str>,
) -> NodeTypeEntry {
    NodeTypeEntry {
        name,
        version,
        category,
        note,
    }
}

pub const REGISTRY: &[NodeTypeEntry] = &[
    entry("n8n-nodes-base.webhook", "1.1", NodeCategory::Trigger, None),
    entry("n8n-nodes-base.scheduleTrigger", "1.1", NodeCategory::Trigger, None),
    entry("n8n-nodes-base.manualTrigger", "1", NodeCategory::Trigger, None),
    entry("n8n-nodes-base.emailReadImapV2", "2", NodeCategory::Trigger, None),
    entry("@n8n/n8n-nodes-langchain.chatTrigger", "1", NodeCategory::Trigger, None),
    entry(
        "n8n-nodes-base.set",
        "3.3",
        NodeCategory::Core,
        Some("Use new format with assignments.assignments array"),
    ),
    entry("n8n-nodes-base.code", "2", NodeCategory::Core, Some("JavaScript execution")),
    entry("n8n-nodes-base.httpRequest", "4.1", NodeCategory::Core, Some("HTTP/API calls")),
    entry("n8n-nodes-base.if", "2", NodeCategory::Core, Some("Conditional branching")),
    entry("n8n-nodes-base.switch", "3", NodeCategory::Core, Some("Multiple conditions")),
    entry("n8n-nodes-base.merge", "3", NodeCategory::Core, Some("Merge data")),
    entry("n8n-nodes-base.splitInBatches", "3", NodeCategory::Core, Some("Batch processing")),
    entry("@n8n/n8n-nodes-langchain.agent", "1", NodeCategory::Ai, Some("AI Agent")),
    entry("@n8n/n8n-nodes-langchain.lmChatOpenAi", "1", NodeCategory::Ai, Some("OpenAI Chat")),
    entry("@n8n/n8n-nodes-langchain.toolCode", "1", NodeCategory::Ai, Some("Tool for agents")),
    entry(
        "@n8n/n8n-nodes-langchain.memoryBufferWindow",
        "1",
        NodeCategory::Ai,
        Some("Conversation memory"),
    ),
    entry("n8n-nodes-base.slack", "2.1", NodeCategory::Integration, None),
    entry("n8n-nodes-base.discord", "2", NodeCategory::Integration, None),
    entry("n8n-nodes-base.postgres", "2.4", NodeCategory::Integration, None),
    entry("n8n-nodes-base.googleSheets", "4", NodeCategory::Integration, None),
];

/// Types models like to invent, with the real replacement.
pub const KNOWN_INVALID: &[(&str, &str)] = &[
    ("n8n-nodes-base.openai", "@n8n/n8n-nodes-langchain.lmChatOpenAi"),
    ("n8n-nodes-base.gpt", "@n8n/n8n-nodes-langchain.agent"),
];

/// Whether a node type starts executions.
pub fn is_trigger_type(node_type: &str) -> bool {
    node_type.to_lowercase().contains("trigger")
}

/// The allowed node-type set injected into the validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeTypeSet(BTreeSet<String>);

impl NodeTypeSet {
    /// Set derived from [`REGISTRY`].
    pub fn builtin() -> Self {
        REGISTRY.iter().map(|e| e.name).collect()
    }

    pub fn contains(&self, node_type: &str) -> bool {
        self.0.contains(node_type)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Replacement hint for a type outside the set, if one is obvious.
    pub fn suggest(&self, node_type: &str) -> Option<String> {
        if let Some((_, replacement)) = KNOWN_INVALID.iter().find(|(bad, _)| *bad == node_type) {
            return Some((*replacement).to_string());
        }

        // Short names such as "webhook" or "code"
        if !node_type.contains('.') {
            let suffix = format!(".{}", node_type.to_lowercase());
            return self
                .0
                .iter()
                .find(|t| t.to_lowercase().ends_with(&suffix))
                .cloned();
        }

        None
    }
}

impl<S: Into<String>> FromIterator<S> for NodeTypeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl Default for NodeTypeSet {
    fn default() -> Self {
        Self::builtin()
    }
}
