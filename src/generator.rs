//! Workflow generation pipelines.
//!
//! - Basic: prompt → LLM → parse → generation gate.
//! - Enhanced: pattern detection and model selection, validation,
//!   self-heal, re-validation and `meta` stamping.

use chrono::{DateTime, Utc};
use regex::RegexBuilder;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::clients::{extract_json_object, CompletionRequest, LlmClient};
use crate::config::ModelTiers;
use crate::error::{Error, Result};
use crate::prompt::{self, GenerationInput};
use crate::validator::{self, rules::STRING_ONLY_SETTINGS, Issue, ValidationReport, ValidatorOptions};

pub const GENERATOR_NAME: &str = "n8n-ci enhanced generator";

// ═══════════════════════════════════════════════════════════════════════════
// Pattern detection and model selection
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WorkflowPattern {
    ApiIntegration,
    DataPipeline,
    AiAgent,
    Automation,
}

impl WorkflowPattern {
    pub const ALL: [WorkflowPattern; 4] = [
        WorkflowPattern::ApiIntegration,
        WorkflowPattern::DataPipeline,
        WorkflowPattern::AiAgent,
        WorkflowPattern::Automation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowPattern::ApiIntegration => "api-integration",
            WorkflowPattern::DataPipeline => "data-pipeline",
            WorkflowPattern::AiAgent => "ai-agent",
            WorkflowPattern::Automation => "automation",
        }
    }

    /// Node-role keywords that vote for this pattern.
    pub fn keywords(&self) -> &'static [&'static str] {
        match self {
            WorkflowPattern::ApiIntegration => {
                &["webhook", "authentication", "api-call", "transform", "response"]
            }
            WorkflowPattern::DataPipeline => {
                &["trigger", "fetch", "validate", "transform", "store", "notify"]
            }
            WorkflowPattern::AiAgent => &[
                "chat-trigger",
                "context-retrieval",
                "llm-processing",
                "tool-calling",
                "response",
            ],
            WorkflowPattern::Automation => {
                &["schedule", "condition-check", "action", "verification", "logging"]
            }
        }
    }
}

impl std::fmt::Display for WorkflowPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the pattern whose keywords occur most often. Ties go to the later
/// pattern, so requirements with no keywords land on `automation`.
pub fn detect_pattern(requirements: &str) -> WorkflowPattern {
    let lowered = requirements.to_lowercase();
    let mut best = (WorkflowPattern::ApiIntegration, 0usize);

    for pattern in WorkflowPattern::ALL {
        let score = pattern
            .keywords()
            .iter()
            .filter(|k| lowered.contains(*k))
            .count();
        if score >= best.1 {
            best = (pattern, score);
        }
    }

    best.0
}

/// Heuristic complexity score: integrations count once, advanced features
/// twice, AI features three times.
pub fn assess_complexity(requirements: &str) -> u32 {
    const WEIGHTS: &[(&str, u32)] = &[
        (r"integrate|connect|api|database", 1),
        (r"parallel|batch|optimize|scale|security", 2),
        (r"ai|ml|llm|gpt|claude|agent", 3),
    ];

    WEIGHTS
        .iter()
        .filter_map(|(pattern, weight)| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .ok()
                .map(|re| re.find_iter(requirements).count() as u32 * weight)
        })
        .sum()
}

pub fn select_model(models: &ModelTiers, complexity: u32) -> &str {
    if complexity > 8 {
        &models.complex
    } else if complexity > 4 {
        &models.standard
    } else {
        &models.simple
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Layout
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    #[default]
    Grid,
    Linear,
    Tree,
}

/// Canvas position for the node at `index`.
pub fn calculate_position(index: usize, layout: Layout) -> [f64; 2] {
    let i = index as f64;
    match layout {
        Layout::Grid => {
            const COLS: usize = 4;
            const SPACING: f64 = 250.0;
            let row = (index / COLS) as f64;
            let col = (index % COLS) as f64;
            [250.0 + col * SPACING, 300.0 + row * SPACING]
        }
        Layout::Linear => [250.0 + i * 250.0, 300.0],
        Layout::Tree => {
            let level = (i + 1.0).log2().floor();
            let nodes_in_level = 2f64.powf(level);
            let position_in_level = i - (nodes_in_level - 1.0);
            let spacing = 800.0 / nodes_in_level;
            [200.0 + position_in_level * spacing, 200.0 + level * 200.0]
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Gate and self-heal
// ═══════════════════════════════════════════════════════════════════════════

/// Minimal shape check applied to every model reply before it is written.
pub fn generation_gate(workflow: &Value) -> Result<()> {
    if !workflow.get("nodes").is_some_and(Value::is_array) {
        return Err(Error::InvalidWorkflow(
            "missing or invalid nodes array".to_string(),
        ));
    }
    if !workflow.get("connections").is_some_and(Value::is_object) {
        return Err(Error::InvalidWorkflow(
            "missing or invalid connections object".to_string(),
        ));
    }
    let Some(settings) = workflow.get("settings").and_then(Value::as_object) else {
        return Err(Error::InvalidWorkflow(
            "missing or invalid settings object".to_string(),
        ));
    };
    for key in STRING_ONLY_SETTINGS {
        if !settings.get(*key).is_some_and(Value::is_string) {
            return Err(Error::InvalidWorkflow(format!("{} must be a string", key)));
        }
    }
    Ok(())
}

pub fn default_settings() -> Value {
    json!({
        "executionOrder": "v1",
        "saveExecutionProgress": true,
        "saveDataSuccessExecution": "all",
        "saveDataErrorExecution": "all"
    })
}

/// Repair what a report flags and a fix is known for. Returns a description
/// of each repair applied.
pub fn self_heal(workflow: &mut Value, report: &ValidationReport, layout: Layout) -> Vec<String> {
    let mut fixes = Vec::new();
    let Some(root) = workflow.as_object_mut() else {
        return fixes;
    };

    if report.has_error_at("nodes") {
        root.insert("nodes".to_string(), json!([]));
        fixes.push("reset nodes to an empty list".to_string());
    }
    if report.has_error_at("connections") {
        root.insert("connections".to_string(), json!({}));
        fixes.push("reset connections to an empty object".to_string());
    }
    if report.has_error_at("settings") {
        root.insert("settings".to_string(), default_settings());
        fixes.push("replaced settings with defaults".to_string());
    }

    if let Some(settings) = root.get_mut("settings").and_then(Value::as_object_mut) {
        for key in STRING_ONLY_SETTINGS {
            if report.has_error_at(&format!("settings.{}", key)) {
                settings.insert((*key).to_string(), json!("all"));
                fixes.push(format!("set settings.{} to \"all\"", key));
            }
        }
    }

    if let Some(nodes) = root.get_mut("nodes").and_then(Value::as_array_mut) {
        for (index, node) in nodes.iter_mut().enumerate() {
            let Some(fields) = node.as_object_mut() else {
                continue;
            };
            if report.has_error_at(&format!("nodes[{}].id", index)) {
                fields.insert("id".to_string(), json!(uuid::Uuid::new_v4().to_string()));
                fixes.push(format!("assigned a new id to nodes[{}]", index));
            }
            if report.has_error_at(&format!("nodes[{}].position", index)) {
                fields.insert("position".to_string(), json!(calculate_position(index, layout)));
                fixes.push(format!("laid out nodes[{}]", index));
            }
        }
    }

    fixes
}

/// Merge generator provenance into `meta`.
pub fn stamp_meta(workflow: &mut Value, model: &str, pattern: WorkflowPattern, at: DateTime<Utc>) {
    let Some(root) = workflow.as_object_mut() else {
        return;
    };

    let meta = root
        .entry("meta")
        .or_insert_with(|| Value::Object(Map::new()));
    if !meta.is_object() {
        *meta = Value::Object(Map::new());
    }
    if let Some(meta) = meta.as_object_mut() {
        meta.insert("generatedBy".to_string(), json!(GENERATOR_NAME));
        meta.insert("generatedAt".to_string(), json!(at.to_rfc3339()));
        meta.insert("model".to_string(), json!(model));
        meta.insert("pattern".to_string(), json!(pattern.as_str()));
        meta.insert("version".to_string(), json!(env!("CARGO_PKG_VERSION")));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Generator
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EnhanceMode {
    Create,
    Enhance,
}

#[derive(Debug, Clone)]
pub struct EnhancedRequest {
    pub mode: EnhanceMode,
    pub requirements: String,
    pub existing: Option<Value>,
    pub auto_heal: bool,
    pub validation: ValidatorOptions,
}

#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub success: bool,
    pub workflow: Value,
    pub report: ValidationReport,
    pub model: String,
    pub pattern: WorkflowPattern,
    pub complexity: u32,
    pub fixes: Vec<String>,
}

/// Persisted next to the generated workflow.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationReport {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub model: String,
    pub pattern: WorkflowPattern,
    pub complexity: u32,
    pub node_count: usize,
    pub validation_warnings: Vec<Issue>,
    pub fixes: Vec<String>,
}

impl GenerationOutcome {
    pub fn report_at(&self, timestamp: DateTime<Utc>) -> GenerationReport {
        GenerationReport {
            timestamp,
            success: self.success,
            model: self.model.clone(),
            pattern: self.pattern,
            complexity: self.complexity,
            node_count: self.report.metadata.node_count,
            validation_warnings: self.report.warnings.clone(),
            fixes: self.fixes.clone(),
        }
    }
}

pub struct WorkflowGenerator<'a> {
    client: &'a LlmClient,
}

impl<'a> WorkflowGenerator<'a> {
    pub fn new(client: &'a LlmClient) -> Self {
        Self { client }
    }

    /// Basic generation: the reply must pass [`generation_gate`].
    pub async fn generate(&self, input: &GenerationInput<'_>) -> Result<Value> {
        let settings = self.client.settings();
        let request = CompletionRequest {
            model: settings.models.standard.clone(),
            system: prompt::generation_system_prompt(),
            prompt: prompt::build_generation_prompt(input),
            temperature: settings.temperature,
        };

        let reply = self.client.complete(&request).await?;
        let workflow = extract_json_object(&reply)?;
        generation_gate(&workflow)?;

        info!(
            nodes = workflow["nodes"].as_array().map_or(0, Vec::len),
            "Workflow generated"
        );
        Ok(workflow)
    }

    pub async fn generate_enhanced(&self, request: &EnhancedRequest) -> Result<GenerationOutcome> {
        let settings = self.client.settings();
        let pattern = detect_pattern(&request.requirements);
        let complexity = assess_complexity(&request.requirements);
        let model = select_model(&settings.models, complexity).to_string();

        info!(pattern = %pattern, model = %model, complexity, "Starting enhanced generation");

        let user_prompt = match request.mode {
            EnhanceMode::Create => {
                prompt::build_create_prompt(&request.requirements, Some(pattern.as_str()))
            }
            EnhanceMode::Enhance => {
                let existing = request.existing.as_ref().ok_or_else(|| {
                    Error::InvalidWorkflow("enhance mode requires an existing workflow".to_string())
                })?;
                prompt::build_enhance_prompt(existing, &request.requirements)
            }
        };

        let reply = self
            .client
            .complete(&CompletionRequest {
                model: model.clone(),
                system: prompt::EXPERT_SYSTEM_PROMPT.to_string(),
                prompt: user_prompt,
                temperature: settings.temperature,
            })
            .await?;

        let mut workflow = extract_json_object(&reply)?;
        let mut report = validator::validate(&workflow, &request.validation);
        let mut fixes = Vec::new();

        if !report.valid && request.auto_heal {
            fixes = self_heal(&mut workflow, &report, Layout::default());
            info!(fixes = fixes.len(), "Applied self-healing");
            report = validator::validate(&workflow, &request.validation);
        }

        if !report.valid {
            warn!(errors = report.summary.errors, "Generated workflow failed validation");
        }

        stamp_meta(&mut workflow, &model, pattern, Utc::now());

        Ok(GenerationOutcome {
            success: report.valid,
            workflow,
            report,
            model,
            pattern,
            complexity,
            fixes,
        })
    }
}
