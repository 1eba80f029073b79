//! Pull request body rendering for workflow PRs.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::warn;

use crate::validator::{Issue, ValidationReport, WorkflowMetadata};

pub const DEFAULT_TEMPLATE_PATH: &str = ".github/PULL_REQUEST_TEMPLATE/workflow.md";
pub const DEFAULT_ACTOR: &str = "github-actions[bot]";

/// An issue or PR referenced from the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelatedItem {
    pub number: u64,
    pub closes: bool,
}

/// Run context shown in the footer and template placeholders.
#[derive(Debug, Clone)]
pub struct PrContext {
    pub actor: Option<String>,
    pub run_id: Option<String>,
    pub run_url: Option<String>,
    pub related: Vec<RelatedItem>,
    pub generated_at: DateTime<Utc>,
}

impl Default for PrContext {
    fn default() -> Self {
        Self {
            actor: None,
            run_id: None,
            run_url: None,
            related: Vec::new(),
            generated_at: Utc::now(),
        }
    }
}

pub struct PrBodyGenerator<'a> {
    source_file: &'a str,
    workflow: &'a Value,
    metadata: WorkflowMetadata,
}

impl<'a> PrBodyGenerator<'a> {
    pub fn new(source_file: &'a str, workflow: &'a Value) -> Self {
        Self {
            source_file,
            workflow,
            metadata: WorkflowMetadata::collect(workflow),
        }
    }

    fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or("Unnamed Workflow")
    }

    fn file_name(&self) -> String {
        Path::new(self.source_file)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_file.to_string())
    }

    pub fn render(&self, validation: Option<&ValidationReport>, context: &PrContext) -> String {
        let mut sections = vec![self.header(), self.workflow_info()];
        if let Some(report) = validation {
            sections.push(validation_section(report));
        }
        sections.push(self.testing_section());
        sections.push(self.config_section());
        if !context.related.is_empty() {
            sections.push(related_section(&context.related));
        }
        sections.push(footer(validation, context));
        sections.join("\n\n")
    }

    /// Fill the placeholders of a PR template.
    pub fn render_template(&self, template: &str, context: &PrContext) -> String {
        let node_count = self.metadata.node_count.to_string();
        let generated_at = context.generated_at.to_rfc3339();
        let replacements: [(&str, &str); 6] = [
            ("<!-- Auto-filled by automation -->", ""),
            ("<!-- workflow name -->", self.name()),
            ("<!-- source file -->", self.source_file),
            ("<!-- node count -->", &node_count),
            ("<!-- timestamp -->", &generated_at),
            ("<!-- link to run -->", context.run_url.as_deref().unwrap_or("#")),
        ];

        replacements
            .iter()
            .fold(template.to_string(), |body, (placeholder, value)| {
                body.replace(placeholder, value)
            })
    }

    /// Template rendering that falls back to [`Self::render`] when the
    /// template cannot be read.
    pub fn render_from_template_file(&self, template_path: &Path, context: &PrContext) -> String {
        match std::fs::read_to_string(template_path) {
            Ok(template) => self.render_template(&template, context),
            Err(e) => {
                warn!(file = %template_path.display(), error = %e, "PR template unavailable, using default body");
                self.render(None, context)
            }
        }
    }

    fn header(&self) -> String {
        let description = self
            .workflow
            .get("description")
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
            .map(|d| format!("> {}", d))
            .unwrap_or_default();

        format!(
            "## 🤖 n8n Workflow Pull Request\n\n### 📋 {}\n\n{}",
            self.name(),
            description
        )
    }

    fn workflow_info(&self) -> String {
        let mut out = String::from("### 📊 Workflow Information\n\n");
        let _ = writeln!(out, "- **Source File**: `{}`", self.source_file);
        let _ = writeln!(out, "- **Target Location**: `workflows/{}`", self.file_name());
        let _ = write!(out, "- **Total Nodes**: {}", self.metadata.node_count);

        if !self.metadata.trigger_nodes.is_empty() {
            let triggers: Vec<String> = self
                .metadata
                .trigger_nodes
                .iter()
                .map(|t| format!("{} ({})", t.name.as_deref().unwrap_or("unnamed"), t.node_type))
                .collect();
            let _ = write!(out, "\n- **Trigger Nodes**: {}", triggers.join(", "));
        }

        out.push_str("\n\n#### Node Types Used");
        for node_type in &self.metadata.node_types {
            let _ = write!(out, "\n- `{}`", node_type);
        }
        out
    }

    fn testing_section(&self) -> String {
        let credentials = if self.metadata.credential_types.is_empty() {
            "- No credentials required".to_string()
        } else {
            self.metadata
                .credential_types
                .iter()
                .map(|c| format!("- [ ] Configure {}", c))
                .collect::<Vec<_>>()
                .join("\n   ")
        };
        let execution = if self.metadata.trigger_nodes.is_empty() {
            "- [ ] Execute the workflow manually"
        } else {
            "- [ ] Activate the workflow and test trigger conditions"
        };

        format!(
            r#"### 🧪 Testing Instructions

1. **Import the workflow**
   ```
   Import the workflow JSON into your n8n instance
   ```

2. **Configure credentials**
   {credentials}

3. **Test execution**
   {execution}
   - [ ] Verify all nodes execute successfully
   - [ ] Check output data is as expected

4. **Error handling**
   - [ ] Test with invalid inputs
   - [ ] Verify error paths work correctly"#
        )
    }

    fn config_section(&self) -> String {
        let credentials = if self.metadata.credential_types.is_empty() {
            "- [x] None required".to_string()
        } else {
            self.metadata
                .credential_types
                .iter()
                .map(|c| format!("- [ ] **{}**: Configure in n8n settings", c))
                .collect::<Vec<_>>()
                .join("\n")
        };

        format!(
            r#"### 🔧 Configuration Requirements

#### Credentials Needed
{credentials}

#### Environment Setup
- [ ] n8n instance running
- [ ] Required integrations accessible
- [ ] Test data available"#
        )
    }
}

fn issue_lines(issues: &[Issue], marker: &str) -> String {
    issues
        .iter()
        .map(|i| {
            if i.path.is_empty() {
                format!("- {} {}", marker, i.message)
            } else {
                format!("- {} {} (at: {})", marker, i.message, i.path)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn validation_section(report: &ValidationReport) -> String {
    let status = if report.valid { "✅ Passed" } else { "❌ Failed" };
    let mut out = format!(
        "### 🔍 Validation Status: {}\n\n- **Errors**: {}\n- **Warnings**: {}",
        status, report.summary.errors, report.summary.warnings
    );

    if !report.errors.is_empty() {
        let _ = write!(out, "\n\n#### Errors Found\n{}", issue_lines(&report.errors, "❌"));
    }
    if !report.warnings.is_empty() {
        let _ = write!(out, "\n\n#### Warnings\n{}", issue_lines(&report.warnings, "⚠️"));
    }
    if report.valid {
        out.push_str("\n\n#### Compliance\n- ✅ JSON syntax valid\n- ✅ Required fields present");
    }
    out
}

fn related_section(items: &[RelatedItem]) -> String {
    let lines: Vec<String> = items
        .iter()
        .map(|item| {
            if item.closes {
                format!("- Closes #{}", item.number)
            } else {
                format!("- Related to #{}", item.number)
            }
        })
        .collect();
    format!("### 🔗 Related Issues/PRs\n\n{}", lines.join("\n"))
}

fn footer(validation: Option<&ValidationReport>, context: &PrContext) -> String {
    let timestamp = context.generated_at.to_rfc3339();
    let actor = context.actor.as_deref().unwrap_or(DEFAULT_ACTOR);
    let run_id = context.run_id.as_deref().unwrap_or("N/A");
    let validation = match validation {
        Some(report) if report.valid => "✅ Passed",
        Some(_) => "❌ Failed",
        None => "Not run",
    };

    format!(
        r#"---

### 🤖 Automation Metadata

- **Generated at**: {timestamp}
- **Generated by**: @{actor}
- **GitHub Action Run**: {run_id}
- **Workflow Validation**: {validation}
- **Auto-generated**: Yes

<details>
<summary>📝 Additional Technical Details</summary>

```json
{{
  "generator": "n8n-ci pr-body",
  "version": "{version}",
  "timestamp": "{timestamp}"
}}
```

</details>"#,
        version = env!("CARGO_PKG_VERSION"),
    )
}

/// Accepts `12`, `#12` and `closes #12`.
impl std::str::FromStr for RelatedItem {
    type Err = String;

    fn from_str(raw: &str) -> std::result::Result<Self, Self::Err> {
        let lowered = raw.trim().to_lowercase();
        let (closes, rest) = match lowered.strip_prefix("closes") {
            Some(rest) => (true, rest),
            None => (false, lowered.as_str()),
        };
        let number = rest
            .trim()
            .trim_start_matches('#')
            .parse::<u64>()
            .map_err(|_| format!("invalid issue reference: {}", raw))?;
        Ok(RelatedItem { number, closes })
    }
}
