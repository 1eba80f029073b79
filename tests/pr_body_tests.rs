//! Tests for PR body rendering
//!
//! - Default body sections with and without a validation report
//! - Template placeholder filling and fallback

use chrono::{TimeZone, Utc};
use n8n_ci::pr_body::{PrBodyGenerator, PrContext, RelatedItem};
use n8n_ci::validator::{validate, ValidatorOptions};
use serde_json::{json, Value};

fn workflow() -> Value {
    json!({
        "name": "Lead Router",
        "description": "Routes inbound leads",
        "nodes": [
            {"id": "1", "name": "Inbound", "type": "n8n-nodes-base.webhook", "position": [0, 0]},
            {"id": "2", "name": "Every Hour", "type": "n8n-nodes-base.scheduleTrigger", "position": [0, 200]},
            {"id": "3", "name": "Notify", "type": "n8n-nodes-base.slack", "position": [250, 0],
             "credentials": {"slackApi": {"id": "7", "name": "Slack"}}}
        ],
        "connections": {
            "Inbound": {"main": [[{"node": "Notify", "type": "main", "index": 0}]]}
        },
        "settings": {"saveDataSuccessExecution": "all", "saveDataErrorExecution": "all"}
    })
}

fn context() -> PrContext {
    PrContext {
        actor: Some("octocat".to_string()),
        run_id: Some("9001".to_string()),
        run_url: Some("https://github.com/acme/flows/actions/runs/9001".to_string()),
        related: vec![
            RelatedItem { number: 12, closes: true },
            RelatedItem { number: 3, closes: false },
        ],
        generated_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Default body
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_body_sections() {
    let workflow = workflow();
    let body = PrBodyGenerator::new("projects/crm/lead-router.json", &workflow)
        .render(None, &context());

    assert!(body.starts_with("## 🤖 n8n Workflow Pull Request\n\n### 📋 Lead Router\n\n> Routes inbound leads"));
    assert!(body.contains("- **Source File**: `projects/crm/lead-router.json`"));
    assert!(body.contains("- **Target Location**: `workflows/lead-router.json`"));
    assert!(body.contains("- **Total Nodes**: 3"));
    assert!(body.contains("- **Trigger Nodes**: Every Hour (n8n-nodes-base.scheduleTrigger)"));
    assert!(body.contains("- `n8n-nodes-base.slack`"));
    assert!(body.contains("- [ ] Configure slackApi"));
    assert!(body.contains("- [ ] **slackApi**: Configure in n8n settings"));
    assert!(body.contains("- [ ] Activate the workflow and test trigger conditions"));
    assert!(body.contains("- Closes #12\n- Related to #3"));
    assert!(body.contains("- **Generated by**: @octocat"));
    assert!(body.contains("- **GitHub Action Run**: 9001"));
    assert!(body.contains("- **Workflow Validation**: Not run"));
    assert!(!body.contains("Validation Status"));
}

#[test]
fn test_body_without_triggers_or_credentials() {
    let workflow = json!({"name": "Plain", "nodes": [{"name": "Set", "type": "n8n-nodes-base.set"}]});
    let body = PrBodyGenerator::new("plain.json", &workflow).render(None, &PrContext::default());

    assert!(!body.contains("Trigger Nodes"));
    assert!(body.contains("- No credentials required"));
    assert!(body.contains("- [x] None required"));
    assert!(body.contains("- [ ] Execute the workflow manually"));
    assert!(body.contains("@github-actions[bot]"));
    assert!(!body.contains("Related Issues"));
}

#[test]
fn test_body_with_validation_report() {
    let mut workflow = workflow();
    workflow["settings"]["saveDataErrorExecution"] = json!(false);
    let report = validate(&workflow, &ValidatorOptions::permissive());

    let body = PrBodyGenerator::new("lead-router.json", &workflow).render(Some(&report), &context());

    assert!(body.contains("### 🔍 Validation Status: ❌ Failed"));
    assert!(body.contains("- **Errors**: 1"));
    assert!(body.contains("#### Errors Found\n- ❌ saveDataErrorExecution must be a string"));
    assert!(body.contains("(at: settings.saveDataErrorExecution)"));
    assert!(body.contains("#### Warnings"));
    assert!(body.contains("- **Workflow Validation**: ❌ Failed"));
    assert!(!body.contains("#### Compliance"));
}

#[test]
fn test_body_with_passing_report() {
    let workflow = workflow();
    let report = validate(&workflow, &ValidatorOptions::strict());
    let body = PrBodyGenerator::new("lead-router.json", &workflow).render(Some(&report), &context());

    assert!(body.contains("### 🔍 Validation Status: ✅ Passed"));
    assert!(body.contains("#### Compliance"));
    assert!(body.contains("- **Workflow Validation**: ✅ Passed"));
}

// ═══════════════════════════════════════════════════════════════════════════
// Template mode
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_template_placeholders() {
    let workflow = workflow();
    let template = "# <!-- workflow name -->\n<!-- Auto-filled by automation -->\nFrom <!-- source file --> \
                    (<!-- node count --> nodes) at <!-- timestamp -->, run <!-- link to run -->, again <!-- node count -->";

    let body = PrBodyGenerator::new("lead-router.json", &workflow).render_template(template, &context());

    assert_eq!(
        body,
        "# Lead Router\n\nFrom lead-router.json (3 nodes) at 2025-06-01T12:00:00+00:00, \
         run https://github.com/acme/flows/actions/runs/9001, again 3"
    );
}

#[test]
fn test_template_run_link_default() {
    let workflow = workflow();
    let body = PrBodyGenerator::new("x.json", &workflow)
        .render_template("<!-- link to run -->", &PrContext::default());
    assert_eq!(body, "#");
}

#[test]
fn test_template_file_fallback() {
    let dir = tempfile::tempdir().unwrap();
    let workflow = workflow();
    let generator = PrBodyGenerator::new("lead-router.json", &workflow);

    let missing = generator.render_from_template_file(&dir.path().join("missing.md"), &context());
    assert_eq!(missing, generator.render(None, &context()));

    let path = dir.path().join("workflow.md");
    std::fs::write(&path, "Workflow: <!-- workflow name -->").unwrap();
    assert_eq!(
        generator.render_from_template_file(&path, &context()),
        "Workflow: Lead Router"
    );
}
