//! Workflow scanner
//!
//! Finds workflow files under the project tree and compares them with a
//! persisted sync state to decide which ones are new or modified.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};

pub const DEFAULT_STATE_FILE: &str = ".workflow-sync-state.json";

pub const DEFAULT_SCAN_PATTERNS: &[&str] = &[
    "projects/*/phase-12-final/*.json",
    "projects/*/phase-7-final/*.json",
    "projects/*/phase-8-deployment/*.json",
];

pub const DEFAULT_EXCLUDE_PATTERNS: &[&str] = &[
    "**/node_modules/**",
    "**/.git/**",
    "**/backup/**",
    "**/*-draft.json",
    "**/*-test.json",
];

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub state_file: PathBuf,
    /// Directory the scan patterns are relative to.
    pub root: PathBuf,
    pub scan_patterns: Vec<String>,
    pub exclude_patterns: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from(DEFAULT_STATE_FILE),
            root: PathBuf::from("."),
            scan_patterns: DEFAULT_SCAN_PATTERNS.iter().map(|s| s.to_string()).collect(),
            exclude_patterns: DEFAULT_EXCLUDE_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Persisted state
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessedEntry {
    pub processed_at: DateTime<Utc>,
    /// `success` or whatever the caller recorded on failure.
    pub status: String,
    pub last_sync: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncMetrics {
    pub total_processed: u64,
    pub total_synced: u64,
    pub total_failed: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SyncState {
    #[serde(default)]
    pub processed_workflows: BTreeMap<String, ProcessedEntry>,
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metrics: SyncMetrics,
}

// ═══════════════════════════════════════════════════════════════════════════
// Scan results
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowFileInfo {
    pub path: String,
    pub name: String,
    pub id: Option<String>,
    pub node_count: usize,
    pub description: String,
    pub modified_time: DateTime<Utc>,
    pub size: u64,
}

#[derive(Debug, Clone, Default)]
pub struct ScanResults {
    pub new: Vec<WorkflowFileInfo>,
    pub modified: Vec<WorkflowFileInfo>,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub total_workflows: usize,
    pub new_workflows: usize,
    pub modified_workflows: usize,
    pub action_required: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportedWorkflow {
    pub path: String,
    pub name: String,
    pub nodes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub timestamp: DateTime<Utc>,
    pub summary: ScanSummary,
    pub new_workflows: Vec<ReportedWorkflow>,
    pub modified_workflows: Vec<ReportedWorkflow>,
    pub state_metrics: SyncMetrics,
}

// ═══════════════════════════════════════════════════════════════════════════
// Scanner
// ═══════════════════════════════════════════════════════════════════════════

pub struct WorkflowScanner {
    config: ScannerConfig,
    state: SyncState,
}

impl WorkflowScanner {
    pub fn new(config: ScannerConfig) -> Self {
        Self {
            config,
            state: SyncState::default(),
        }
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Load the state file. Missing or unreadable state starts empty.
    pub fn load_state(&mut self) -> &SyncState {
        let path = &self.config.state_file;
        self.state = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(state) => state,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Sync state unreadable, starting empty");
                    SyncState::default()
                }
            },
            Err(e) => {
                debug!(file = %path.display(), error = %e, "No sync state, starting empty");
                SyncState::default()
            }
        };
        &self.state
    }

    pub fn save_state(&self) -> Result<()> {
        let path = &self.config.state_file;
        let content = serde_json::to_string_pretty(&self.state)
            .map_err(|e| Error::json("sync state", e))?;
        std::fs::write(path, content).map_err(|e| Error::io(path, e))?;
        debug!(file = %path.display(), "Saved sync state");
        Ok(())
    }

    /// Workflow files matching a scan pattern and no exclude pattern,
    /// relative to the scan root, sorted.
    pub fn scan_for_workflows(&self) -> Result<Vec<String>> {
        let include = build_glob_set(&self.config.scan_patterns)?;
        let exclude = build_glob_set(&self.config.exclude_patterns)?;
        let root = &self.config.root;

        let mut found = BTreeSet::new();
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(relative) = relative_path(root, entry.path()) else {
                continue;
            };
            if include.is_match(&relative) && !exclude.is_match(&relative) {
                found.insert(relative);
            }
        }

        Ok(found.into_iter().collect())
    }

    /// Read the summary fields of one workflow file. `None` when the file
    /// cannot be read or parsed.
    pub fn workflow_metadata(&self, relative: &str) -> Option<WorkflowFileInfo> {
        let full = self.config.root.join(relative);
        let read = || -> Result<WorkflowFileInfo> {
            let content = std::fs::read_to_string(&full).map_err(|e| Error::io(&full, e))?;
            let workflow: Value =
                serde_json::from_str(&content).map_err(|e| Error::json(relative, e))?;
            let stats = std::fs::metadata(&full).map_err(|e| Error::io(&full, e))?;
            let modified = stats.modified().map_err(|e| Error::io(&full, e))?;

            Ok(WorkflowFileInfo {
                path: relative.to_string(),
                name: workflow
                    .get("name")
                    .and_then(Value::as_str)
                    .unwrap_or("Unnamed Workflow")
                    .to_string(),
                id: workflow.get("id").and_then(Value::as_str).map(str::to_string),
                node_count: workflow
                    .get("nodes")
                    .and_then(Value::as_array)
                    .map_or(0, Vec::len),
                description: workflow
                    .get("description")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                modified_time: DateTime::<Utc>::from(modified),
                size: stats.len(),
            })
        };

        match read() {
            Ok(info) => Some(info),
            Err(e) => {
                warn!(file = %relative, error = %e, "Error reading workflow");
                None
            }
        }
    }

    /// New = never processed; modified = touched after it was processed.
    pub fn find_new_workflows(&mut self) -> Result<ScanResults> {
        self.load_state();
        let all = self.scan_for_workflows()?;
        let mut results = ScanResults {
            total: all.len(),
            ..ScanResults::default()
        };

        for path in &all {
            let Some(info) = self.workflow_metadata(path) else {
                continue;
            };
            match self.state.processed_workflows.get(path) {
                None => results.new.push(info),
                Some(entry) if info.modified_time > entry.processed_at => {
                    results.modified.push(info)
                }
                Some(_) => {}
            }
        }

        info!(
            total = results.total,
            new = results.new.len(),
            modified = results.modified.len(),
            "Workflow scan complete"
        );
        Ok(results)
    }

    pub fn mark_processed(&mut self, path: &str, status: &str) -> Result<()> {
        self.mark_processed_at(path, status, Utc::now())
    }

    pub fn mark_processed_at(&mut self, path: &str, status: &str, now: DateTime<Utc>) -> Result<()> {
        let success = status == "success";
        self.state.processed_workflows.insert(
            path.to_string(),
            ProcessedEntry {
                processed_at: now,
                status: status.to_string(),
                last_sync: success.then_some(now),
            },
        );

        self.state.metrics.total_processed += 1;
        if success {
            self.state.metrics.total_synced += 1;
        } else {
            self.state.metrics.total_failed += 1;
        }
        self.state.last_sync = Some(now);

        info!(file = %path, status = %status, "Marked workflow as processed");
        self.save_state()
    }

    pub fn reset(&mut self) -> Result<()> {
        self.state = SyncState::default();
        self.save_state()
    }

    pub fn report(&self, results: &ScanResults, timestamp: DateTime<Utc>) -> ScanReport {
        ScanReport {
            timestamp,
            summary: ScanSummary {
                total_workflows: results.total,
                new_workflows: results.new.len(),
                modified_workflows: results.modified.len(),
                action_required: results.new.len() + results.modified.len(),
            },
            new_workflows: results
                .new
                .iter()
                .map(|w| ReportedWorkflow {
                    path: w.path.clone(),
                    name: w.name.clone(),
                    nodes: w.node_count,
                    last_modified: None,
                })
                .collect(),
            modified_workflows: results
                .modified
                .iter()
                .map(|w| ReportedWorkflow {
                    path: w.path.clone(),
                    name: w.name.clone(),
                    nodes: w.node_count,
                    last_modified: Some(w.modified_time),
                })
                .collect(),
            state_metrics: self.state.metrics.clone(),
        }
    }
}

fn build_glob_set(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(GlobBuilder::new(pattern).literal_separator(true).build()?);
    }
    Ok(builder.build()?)
}

/// `/`-joined path of `path` below `root`.
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}
