//! Workflow id registry
//!
//! Tracks which n8n workflow id each repository workflow file is deployed
//! as. Ids live in the workflow's own `meta` object; there is no remote
//! lookup.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

use crate::config::RegistryConfig;
use crate::error::{Error, Result};

pub const NOT_SET: &str = "Not set";

fn workflow_url_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/workflow/([a-zA-Z0-9]+)(?:/|$)").ok())
        .as_ref()
}

/// Workflow id from an n8n editor URL such as
/// `https://n8n.example.com/workflow/abCDE1f6gHiJKL7`.
pub fn extract_id_from_url(url: &str) -> Option<String> {
    workflow_url_re()?
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Editor URL for `id` on the instance behind `api_url`.
pub fn deployed_url(api_url: &str, id: &str) -> String {
    format!("{}/workflow/{}", api_url.replacen("/api/v1", "", 1), id)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    pub name: String,
    pub file: PathBuf,
    pub n8n_id: Option<String>,
    pub github_pr: Option<String>,
    pub last_updated: Option<String>,
    pub deployed_url: Option<String>,
    pub description: Option<String>,
}

impl RegistryEntry {
    fn from_workflow(file: &Path, workflow: &Value) -> Self {
        let meta = workflow.get("meta");
        Self {
            name: workflow
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("Unnamed")
                .to_string(),
            file: file.to_path_buf(),
            n8n_id: meta_text(meta, "n8nWorkflowId"),
            github_pr: meta_text(meta, "githubPullRequest"),
            last_updated: meta_text(meta, "lastUpdated"),
            deployed_url: meta_text(meta, "deployedUrl"),
            description: meta_text(meta, "description"),
        }
    }

    fn matches(&self, term: &str) -> bool {
        self.name.to_lowercase().contains(&term.to_lowercase())
            || self.n8n_id.as_deref() == Some(term)
            || self.file.to_string_lossy().contains(term)
            || self.github_pr.as_deref() == Some(term)
    }
}

/// PR numbers are written both as strings and as numbers.
fn meta_text(meta: Option<&Value>, key: &str) -> Option<String> {
    match meta?.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct RegistrySummary {
    pub total: usize,
    pub with_id: usize,
    pub missing_id: usize,
}

impl RegistrySummary {
    pub fn of(entries: &[RegistryEntry]) -> Self {
        let with_id = entries.iter().filter(|e| e.n8n_id.is_some()).count();
        Self {
            total: entries.len(),
            with_id,
            missing_id: entries.len() - with_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetIdOutcome {
    pub file: PathBuf,
    pub n8n_id: String,
    pub deployed_url: String,
}

pub struct WorkflowRegistry {
    config: RegistryConfig,
}

impl WorkflowRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self { config }
    }

    /// `workflows/*.json` plus `projects/<dir>/*.json` without `.meta`
    /// files, sorted.
    pub fn all_workflow_files(&self) -> Vec<PathBuf> {
        let mut files = json_files(&self.config.workflows_dir, |_| true);

        if let Ok(entries) = std::fs::read_dir(&self.config.projects_dir) {
            for entry in entries.flatten() {
                let dir = entry.path();
                if dir.is_dir() {
                    files.extend(json_files(&dir, |name| !name.contains(".meta")));
                }
            }
        }

        files.sort();
        files
    }

    pub fn read_workflow(path: &Path) -> Result<Value> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| Error::json(path.display().to_string(), e))
    }

    /// Merge `metadata` into the file's `meta` object, stamp `lastUpdated`
    /// and write the file back pretty-printed.
    pub fn update_metadata(
        path: &Path,
        metadata: Map<String, Value>,
        now: DateTime<Utc>,
    ) -> Result<Value> {
        let mut workflow = Self::read_workflow(path)?;
        let root = workflow.as_object_mut().ok_or_else(|| {
            Error::InvalidWorkflow(format!("{} is not a JSON object", path.display()))
        })?;

        let meta = root
            .entry("meta")
            .or_insert_with(|| Value::Object(Map::new()));
        if !meta.is_object() {
            *meta = Value::Object(Map::new());
        }
        if let Some(meta) = meta.as_object_mut() {
            meta.extend(metadata);
            meta.insert("lastUpdated".to_string(), json!(now.to_rfc3339()));
        }

        let content = serde_json::to_string_pretty(&workflow)
            .map_err(|e| Error::json(path.display().to_string(), e))?;
        std::fs::write(path, content).map_err(|e| Error::io(path, e))?;
        info!(file = %path.display(), "Updated workflow metadata");
        Ok(workflow)
    }

    /// Every readable workflow file. Unreadable files are logged and skipped.
    pub fn list(&self) -> Vec<RegistryEntry> {
        self.all_workflow_files()
            .iter()
            .filter_map(|file| match Self::read_workflow(file) {
                Ok(workflow) => Some(RegistryEntry::from_workflow(file, &workflow)),
                Err(e) => {
                    warn!(file = %file.display(), error = %e, "Skipping unreadable workflow");
                    None
                }
            })
            .collect()
    }

    /// Match by name substring (case-insensitive), exact n8n id, path
    /// substring or exact PR number.
    pub fn find(&self, term: &str) -> Vec<RegistryEntry> {
        self.list().into_iter().filter(|e| e.matches(term)).collect()
    }

    /// Record `id_or_url` as the n8n id of `file`. `file` is used directly
    /// when it exists, else the first workflow path containing it.
    pub fn set_id(&self, file: &str, id_or_url: &str, now: DateTime<Utc>) -> Result<SetIdOutcome> {
        let id = if id_or_url.contains("http") {
            let id = extract_id_from_url(id_or_url)
                .ok_or_else(|| Error::InvalidUrl(id_or_url.to_string()))?;
            info!(id = %id, "Extracted workflow id from URL");
            id
        } else {
            id_or_url.to_string()
        };

        let direct = PathBuf::from(file);
        let target = if direct.is_file() {
            direct
        } else {
            self.all_workflow_files()
                .into_iter()
                .find(|f| f.to_string_lossy().contains(file))
                .ok_or_else(|| Error::NotFound(format!("workflow file {}", file)))?
        };

        let url = deployed_url(&self.config.n8n_api_url, &id);
        let mut metadata = Map::new();
        metadata.insert("n8nWorkflowId".to_string(), json!(id));
        metadata.insert("deployedUrl".to_string(), json!(url));
        Self::update_metadata(&target, metadata, now)?;

        Ok(SetIdOutcome {
            file: target,
            n8n_id: id,
            deployed_url: url,
        })
    }
}

fn json_files(dir: &Path, keep: impl Fn(&str) -> bool) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with(".json") && keep(n))
        })
        .collect()
}
