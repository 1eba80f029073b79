//! Prompt templates for generation and correction

use serde_json::Value;

use crate::classify::ErrorCategory;
use crate::node_types::{NodeCategory, KNOWN_INVALID, REGISTRY};

/// Where the basic generator takes its input from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum GenerationMode {
    /// Fix or complete an existing workflow JSON against the PR intent.
    #[value(alias = "from_workflow")]
    FromWorkflow,
    /// Generate a new workflow from a specification document.
    #[value(alias = "from_spec")]
    FromSpec,
}

/// Input for the basic generation prompt.
#[derive(Debug, Clone)]
pub enum GenerationInput<'a> {
    FromWorkflow {
        intent: &'a str,
        current_json: &'a str,
    },
    FromSpec {
        spec: &'a str,
        pr_context: &'a str,
    },
}

/// Render the permitted node list from the registry.
pub fn node_type_catalog() -> String {
    let mut out = String::new();
    for category in NodeCategory::ALL {
        out.push_str(&format!("   {}:\n", category.heading()));
        for entry in REGISTRY.iter().filter(|e| e.category == category) {
            match entry.note {
                Some(note) => out.push_str(&format!(
                    "   - {} (v{}) - {}\n",
                    entry.name, entry.version, note
                )),
                None => out.push_str(&format!("   - {} (v{})\n", entry.name, entry.version)),
            }
        }
        out.push('\n');
    }
    out
}

/// System prompt for the basic generator.
pub fn generation_system_prompt() -> String {
    let never_use: String = KNOWN_INVALID
        .iter()
        .map(|(bad, good)| format!("   - {} (use {} instead)\n", bad, good))
        .collect();

    format!(
        r#"You are an expert n8n Workflow Automation System. Your sole purpose is to generate and correct n8n workflow JSON based on user requests.

**Critical Rules:**
1. Your response MUST be a single, valid JSON object. Do not include any explanatory text, markdown formatting like ```json, or any preamble. Your response must start with {{ and end with }}.
2. The generated JSON must be a complete n8n workflow with the following structure:
   - name: workflow name (required)
   - nodes: array of node objects
   - connections: object mapping node connections
   - settings: workflow settings object with executionOrder, saveExecutionProgress, saveDataSuccessExecution (STRING "all" or "none"), saveDataErrorExecution (STRING "all" or "none")
   - meta: optional metadata object
   - pinData: optional pinned data object (usually empty {{}})

3. All nodes must have:
   - unique id (UUID format preferred)
   - name (descriptive string)
   - type (valid n8n node type from the list below)
   - position array [x, y]
   - parameters object (node-specific configuration)
   - typeVersion number (use the exact version specified below)

4. **ONLY use these exact node types (anything else will fail):**

{catalog}
5. **NEVER use these (they don't exist):**
{never_use}   - Short names like 'webhook', 'code', 'http' (always use full names)

6. Connection format MUST be:
   {{
     "NodeName": {{
       "main": [[{{"node": "TargetNodeName", "type": "main", "index": 0}}]]
     }}
   }}

   For AI nodes connecting to Agent:
   {{
     "OpenAI Chat": {{
       "ai_languageModel": [[{{"node": "Agent", "type": "ai_languageModel", "index": 0}}]]
     }}
   }}

7. Analyze the user's intent carefully to create a logical and functional workflow
8. IMPORTANT: saveDataSuccessExecution and saveDataErrorExecution MUST be strings ("all" or "none"), NOT booleans"#,
        catalog = node_type_catalog(),
        never_use = never_use,
    )
}

/// User prompt for the basic generator.
pub fn build_generation_prompt(input: &GenerationInput<'_>) -> String {
    match input {
        GenerationInput::FromSpec { spec, pr_context } => format!(
            r#"
<task>
Generate a complete n8n workflow based on the following specification.
</task>

<specification>
{spec}
</specification>

<pr_context>
{pr_context}
</pr_context>

<instructions>
- Create a fully functional n8n workflow that implements the specification
- Ensure all nodes have unique IDs (use UUID format)
- Connect the nodes logically based on the workflow requirements
- Include proper error handling where appropriate
- Your response MUST be only the raw JSON object, starting with {{ and ending with }}
</instructions>"#
        ),
        GenerationInput::FromWorkflow {
            intent,
            current_json,
        } => format!(
            r#"
<task>
Please generate a complete and valid n8n workflow based on the following intent and existing JSON. If the existing JSON is buggy or incomplete, correct it based on the intent.
</task>

<intent>
{intent}
</intent>

<current_workflow_json>
{current_json}
</current_workflow_json>

<instructions>
- If the JSON is invalid or incomplete, fix all issues
- Ensure all nodes have unique IDs
- Ensure all connections reference valid nodes
- Verify settings object has correct string values for saveDataSuccessExecution and saveDataErrorExecution
- Connect the nodes logically based on the intent
- Your response MUST be only the raw JSON object, starting with {{ and ending with }}
</instructions>"#
        ),
    }
}

pub const CORRECTION_SYSTEM_PROMPT: &str = r#"You are an expert n8n Workflow Debugging and Correction System. Your sole purpose is to analyze workflow errors and fix them.

**Critical Rules:**
1. Your response MUST be a single, valid JSON object. Do not include any explanatory text, markdown formatting, or any preamble.
2. Carefully analyze the error message to understand what went wrong
3. Common n8n workflow errors include:
   - Missing or duplicate node IDs
   - Invalid node references in connections
   - Incorrect parameter types or missing required parameters
   - Invalid settings values (remember: saveDataSuccessExecution and saveDataErrorExecution MUST be strings)
   - Malformed JSON structure
4. Fix ONLY the specific error mentioned while preserving the rest of the workflow logic
5. Do not introduce new errors while fixing existing ones
6. Ensure the corrected workflow maintains the original intent"#;

/// User prompt for the self-correction step.
pub fn build_correction_prompt(
    previous: &Value,
    intent: &str,
    error_message: &str,
    category: ErrorCategory,
) -> String {
    let faulty = serde_json::to_string_pretty(previous).unwrap_or_else(|_| previous.to_string());
    format!(
        r#"
<task>
The n8n workflow has an error that needs to be fixed. Analyze the error and correct the JSON.
</task>

<original_intent>
{intent}
</original_intent>

<faulty_workflow_json>
{faulty}
</faulty_workflow_json>

<validation_error>
Error Type: {category}
Error Message: {error_message}
</validation_error>

<specific_instructions>
{instructions}
</specific_instructions>

<general_instructions>
- Carefully analyze the error message to understand the exact problem
- Fix ONLY the specific error mentioned
- Preserve all other aspects of the workflow that are working
- Ensure the workflow still achieves the original intent
- Your response MUST be only the corrected, raw JSON object
</general_instructions>"#,
        instructions = category.instructions(),
    )
}

pub const EXPERT_SYSTEM_PROMPT: &str = r#"You are an elite n8n Workflow Architect with comprehensive knowledge of:
- All n8n node types (base, langchain, community)
- Advanced workflow patterns and optimization techniques
- Error handling and recovery strategies
- Performance optimization and scaling
- Security best practices and credential management

CRITICAL RULES:
1. Output ONLY valid JSON - no markdown, no explanations
2. Response must start with { and end with }
3. Settings must use: saveDataSuccessExecution and saveDataErrorExecution as STRINGS ("all" or "none")
4. All node IDs must be unique UUIDs
5. Implement comprehensive error handling
6. Optimize for performance and scalability
7. Follow security best practices"#;

/// User prompt for the enhanced generator's `create` mode.
pub fn build_create_prompt(requirements: &str, pattern: Option<&str>) -> String {
    let pattern = match pattern {
        Some(p) => format!("Use the {} pattern", p),
        None => "Detect appropriate pattern".to_string(),
    };
    format!(
        r#"
<task>Generate a complete n8n workflow</task>

<requirements>
{requirements}
</requirements>

<pattern>
{pattern}
</pattern>

<allowed_node_types>
{catalog}</allowed_node_types>

<constraints>
- Use latest stable node versions from the registry
- Implement comprehensive error handling
- Optimize for performance
- Include proper data validation
- Follow security best practices
</constraints>

<output>Raw JSON object only</output>"#,
        catalog = node_type_catalog(),
    )
}

/// User prompt for the enhanced generator's `enhance` mode.
pub fn build_enhance_prompt(existing: &Value, improvements: &str) -> String {
    format!(
        r#"
<task>Enhance and optimize the existing workflow</task>

<current_workflow>
{existing}
</current_workflow>

<improvements>
{improvements}
</improvements>

<focus_areas>
- Performance optimization
- Error handling
- Security hardening
- Code quality
- Resource efficiency
</focus_areas>

<output>Enhanced workflow JSON only</output>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_system_prompt_lists_registry() {
        let prompt = generation_system_prompt();
        for entry in REGISTRY {
            assert!(prompt.contains(entry.name), "missing {}", entry.name);
        }
        assert!(prompt.contains("n8n-nodes-base.openai (use @n8n/n8n-nodes-langchain.lmChatOpenAi instead)"));
    }

    #[test]
    fn test_correction_prompt_embeds_category() {
        let prompt = build_correction_prompt(
            &json!({"name": "T"}),
            "Send a digest",
            "Duplicate node ID: 1",
            ErrorCategory::DuplicateId,
        );
        assert!(prompt.contains("Error Type: duplicateId"));
        assert!(prompt.contains("Generate new UUIDs"));
        assert!(prompt.contains("\"name\": \"T\""));
    }
}
