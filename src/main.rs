//! n8n workflow CI
//!
//! Command-line entry point for the CI steps around n8n workflow JSON.
//!
//! ## Commands
//!
//! - `validate` - Validate a workflow file (exit 1 when invalid)
//! - `generate` - Generate a workflow from a PR intent or a spec file
//! - `enhance` - Pattern-aware generation with validation and self-heal
//! - `correct` - Feed a failing workflow and its error back to the model
//! - `scan` - Track new and modified workflow files
//! - `ids` - Manage n8n workflow ids stored in workflow metadata
//! - `pr-body` - Render a pull request body for a workflow

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{bail, Context};
use chrono::Utc;
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use n8n_ci::clients::LlmClient;
use n8n_ci::config::Config;
use n8n_ci::correction::WorkflowCorrector;
use n8n_ci::generator::{EnhanceMode, EnhancedRequest, WorkflowGenerator};
use n8n_ci::pr_body::{PrBodyGenerator, PrContext, RelatedItem, DEFAULT_TEMPLATE_PATH};
use n8n_ci::prompt::{GenerationInput, GenerationMode};
use n8n_ci::registry::{extract_id_from_url, WorkflowRegistry};
use n8n_ci::render;
use n8n_ci::scanner::WorkflowScanner;
use n8n_ci::validator::{self, ValidationReport, ValidatorOptions};

#[derive(Parser)]
#[command(name = "n8n-ci")]
#[command(about = "Generate, validate and self-correct n8n workflow JSON", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a workflow JSON file
    Validate {
        /// Path to the workflow JSON file
        file: PathBuf,
        /// Enforce the node-type whitelist and node-id rules
        #[arg(long)]
        strict: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Also write the JSON report to this file
        #[arg(long)]
        report: Option<PathBuf>,
        /// Write error messages to this file when validation fails
        #[arg(long)]
        error_out: Option<PathBuf>,
    },
    /// Generate a workflow with the LLM
    Generate {
        #[arg(long, value_enum, env = "GENERATION_MODE", default_value = "from-workflow")]
        mode: GenerationMode,
        /// Intent text, usually the PR body
        #[arg(long, env = "PR_BODY", default_value = "")]
        intent: String,
        /// Current workflow JSON text
        #[arg(long, env = "FILE_CONTENT", default_value = "{}")]
        current: String,
        /// Specification document for `from-spec`
        #[arg(long, env = "SPEC_FILE")]
        spec_file: Option<PathBuf>,
        #[arg(long, default_value = "generated_workflow.json")]
        out: PathBuf,
    },
    /// Pattern-aware generation with validation and self-heal
    Enhance {
        #[arg(long, value_enum, env = "GENERATION_MODE", default_value = "create")]
        mode: EnhanceMode,
        /// Requirements or improvement requests
        #[arg(long, env = "PR_BODY", default_value = "")]
        requirements: String,
        /// Existing workflow JSON text for `enhance`
        #[arg(long, env = "FILE_CONTENT")]
        existing: Option<String>,
        /// Skip self-healing of validation errors
        #[arg(long)]
        no_heal: bool,
        #[arg(long, default_value = "generated_workflow.json")]
        out: PathBuf,
        #[arg(long, default_value = "generation_report.json")]
        report: PathBuf,
    },
    /// Correct a failing workflow using its validation error
    Correct {
        #[arg(long, default_value = "generated_workflow.json")]
        workflow: PathBuf,
        /// Error message to correct against
        #[arg(long, env = "LAST_ERROR_MESSAGE")]
        error: Option<String>,
        /// Read the error message from this file when none is given
        #[arg(long, default_value = "validation_error.txt")]
        error_file: PathBuf,
        /// Original intent, usually the PR body
        #[arg(long, env = "PR_BODY", default_value = "")]
        intent: String,
        #[arg(long, default_value = "corrected_workflow.json")]
        out: PathBuf,
    },
    /// Track new and modified workflow files
    Scan {
        #[command(subcommand)]
        action: Option<ScanAction>,
    },
    /// Manage n8n workflow ids
    Ids {
        #[command(subcommand)]
        action: IdsAction,
    },
    /// Render a pull request body for a workflow
    PrBody {
        /// Path to the workflow JSON file
        file: PathBuf,
        /// Validation report written by `validate --report`
        #[arg(long)]
        validation_report: Option<PathBuf>,
        /// Fill a PR template instead of rendering the default body
        #[arg(long, num_args = 0..=1, default_missing_value = DEFAULT_TEMPLATE_PATH)]
        template: Option<PathBuf>,
        #[arg(long, env = "GITHUB_ACTOR")]
        actor: Option<String>,
        #[arg(long, env = "GITHUB_RUN_ID")]
        run_id: Option<String>,
        #[arg(long, env = "GITHUB_RUN_URL")]
        run_url: Option<String>,
        /// Related issue, `#12` or `closes #12`
        #[arg(long)]
        related: Vec<RelatedItem>,
    },
}

#[derive(Subcommand)]
enum ScanAction {
    /// Report new and modified workflows (default)
    Scan,
    /// Record a workflow as processed
    MarkProcessed {
        path: String,
        #[arg(default_value = "success")]
        status: String,
    },
    /// Clear the sync state
    Reset,
    /// List processed workflows
    List,
}

#[derive(Subcommand)]
enum IdsAction {
    /// List all workflows with their ids
    List,
    /// Find a workflow by id, name, file path or PR
    Find { term: String },
    /// Set the n8n workflow id for a file
    Set {
        file: String,
        /// Workflow id or editor URL
        id: String,
    },
    /// Extract a workflow id from an n8n URL
    Extract { url: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr; stdout carries reports
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "n8n_ci=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_env();
    let cli = Cli::parse();

    match run(cli.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &Config) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Validate {
            file,
            strict,
            json,
            report,
            error_out,
        } => validate(&file, strict, json, report.as_deref(), error_out.as_deref()),
        Commands::Generate {
            mode,
            intent,
            current,
            spec_file,
            out,
        } => generate(config, mode, &intent, &current, spec_file.as_deref(), &out).await,
        Commands::Enhance {
            mode,
            requirements,
            existing,
            no_heal,
            out,
            report,
        } => enhance(config, mode, requirements, existing.as_deref(), !no_heal, &out, &report).await,
        Commands::Correct {
            workflow,
            error,
            error_file,
            intent,
            out,
        } => correct(config, &workflow, error, &error_file, &intent, &out).await,
        Commands::Scan { action } => scan(config, action.unwrap_or(ScanAction::Scan)),
        Commands::Ids { action } => ids(config, action),
        Commands::PrBody {
            file,
            validation_report,
            template,
            actor,
            run_id,
            run_url,
            related,
        } => {
            let context = PrContext {
                actor,
                run_id,
                run_url,
                related,
                generated_at: Utc::now(),
            };
            pr_body(&file, validation_report.as_deref(), template.as_deref(), &context)
        }
    }
}

fn write_json(path: &Path, value: &impl serde::Serialize) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    std::fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
    info!(file = %path.display(), "Wrote output");
    Ok(())
}

fn read_workflow(path: &Path) -> anyhow::Result<Value> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

fn read_report(path: &Path) -> anyhow::Result<ValidationReport> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(serde_json::from_str(&content)?)
}

fn validate(
    file: &Path,
    strict: bool,
    json: bool,
    report_out: Option<&Path>,
    error_out: Option<&Path>,
) -> anyhow::Result<ExitCode> {
    let options = if strict {
        ValidatorOptions::strict()
    } else {
        ValidatorOptions::permissive()
    };
    let report = validator::validate_file(file, &options);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render::validation_report(&report));
    }

    if let Some(path) = report_out {
        write_json(path, &report)?;
    }
    if let (Some(path), false) = (error_out, report.valid) {
        std::fs::write(path, report.error_text())
            .with_context(|| format!("writing {}", path.display()))?;
    }

    Ok(if report.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn generate(
    config: &Config,
    mode: GenerationMode,
    intent: &str,
    current: &str,
    spec_file: Option<&Path>,
    out: &Path,
) -> anyhow::Result<ExitCode> {
    config.require_api_key()?;
    let client = LlmClient::new(config.llm.clone())?;
    let generator = WorkflowGenerator::new(&client);

    let spec;
    let input = match mode {
        GenerationMode::FromWorkflow => GenerationInput::FromWorkflow {
            intent,
            current_json: current,
        },
        GenerationMode::FromSpec => {
            let Some(path) = spec_file else {
                bail!("from-spec mode requires --spec-file or SPEC_FILE");
            };
            spec = std::fs::read_to_string(path)
                .with_context(|| format!("reading spec file {}", path.display()))?;
            GenerationInput::FromSpec {
                spec: &spec,
                pr_context: intent,
            }
        }
    };

    info!(mode = ?mode, "Generating workflow");
    let workflow = generator.generate(&input).await?;

    write_json(out, &workflow)?;
    render::set_github_output(
        config.github_output.as_deref(),
        "json_output",
        &serde_json::to_string(&workflow)?,
    )?;
    Ok(ExitCode::SUCCESS)
}

async fn enhance(
    config: &Config,
    mode: EnhanceMode,
    requirements: String,
    existing: Option<&str>,
    auto_heal: bool,
    out: &Path,
    report_out: &Path,
) -> anyhow::Result<ExitCode> {
    config.require_api_key()?;
    let client = LlmClient::new(config.llm.clone())?;
    let generator = WorkflowGenerator::new(&client);
    let output = config.github_output.as_deref();

    let existing = existing
        .filter(|text| !text.trim().is_empty())
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("parsing existing workflow JSON")?;

    let request = EnhancedRequest {
        mode,
        requirements,
        existing,
        auto_heal,
        validation: ValidatorOptions {
            allowed_node_types: None,
            strict: true,
        },
    };

    let outcome = match generator.generate_enhanced(&request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            render::set_github_output(output, "success", "false")?;
            render::set_github_output(output, "error", &e.to_string())?;
            return Err(e.into());
        }
    };

    write_json(out, &outcome.workflow)?;
    write_json(report_out, &outcome.report_at(Utc::now()))?;

    render::set_github_output(output, "workflow", &serde_json::to_string(&outcome.workflow)?)?;
    render::set_github_output(output, "success", &outcome.success.to_string())?;
    render::set_github_output(output, "model", &outcome.model)?;
    render::set_github_output(output, "pattern", outcome.pattern.as_str())?;

    if !outcome.success {
        print!("{}", render::validation_report(&outcome.report));
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

async fn correct(
    config: &Config,
    workflow_path: &Path,
    error_message: Option<String>,
    error_file: &Path,
    intent: &str,
    out: &Path,
) -> anyhow::Result<ExitCode> {
    config.require_api_key()?;

    let error_message = match error_message.filter(|m| !m.trim().is_empty()) {
        Some(message) => message,
        None if error_file.exists() => std::fs::read_to_string(error_file)
            .with_context(|| format!("reading {}", error_file.display()))?,
        None => bail!("no error message provided (LAST_ERROR_MESSAGE or {})", error_file.display()),
    };

    let previous = read_workflow(workflow_path)?;
    let client = LlmClient::new(config.llm.clone())?;
    let corrector = WorkflowCorrector::new(&client);
    let correction = corrector.correct(&previous, intent, &error_message).await?;

    info!(category = %correction.category, "Workflow corrected");
    write_json(out, &correction.workflow)?;
    render::set_github_output(
        config.github_output.as_deref(),
        "corrected_json",
        &serde_json::to_string(&correction.workflow)?,
    )?;
    Ok(ExitCode::SUCCESS)
}

fn scan(config: &Config, action: ScanAction) -> anyhow::Result<ExitCode> {
    let mut scanner = WorkflowScanner::new(config.scanner.clone());

    match action {
        ScanAction::Scan => {
            let results = scanner.find_new_workflows()?;
            let report = scanner.report(&results, Utc::now());
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        ScanAction::MarkProcessed { path, status } => {
            scanner.load_state();
            scanner.mark_processed(&path, &status)?;
            println!("Marked {} as processed with status: {}", path, status);
        }
        ScanAction::Reset => {
            scanner.reset()?;
            println!("State reset successfully");
        }
        ScanAction::List => {
            let state = scanner.load_state();
            println!("Total processed workflows: {}", state.processed_workflows.len());
            for (path, entry) in &state.processed_workflows {
                println!("- {}: {} ({})", path, entry.status, entry.processed_at.to_rfc3339());
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn ids(config: &Config, action: IdsAction) -> anyhow::Result<ExitCode> {
    let registry = WorkflowRegistry::new(config.registry.clone());

    match action {
        IdsAction::List => print!("{}", render::registry_table(&registry.list())),
        IdsAction::Find { term } => {
            let matches = registry.find(&term);
            print!("{}", render::registry_matches(&term, &matches));
        }
        IdsAction::Set { file, id } => {
            let outcome = registry.set_id(&file, &id, Utc::now())?;
            println!(
                "Set workflow id for {}\n  n8n ID: {}\n  URL: {}",
                outcome.file.display(),
                outcome.n8n_id,
                outcome.deployed_url
            );
        }
        IdsAction::Extract { url } => match extract_id_from_url(&url) {
            Some(id) => println!("Extracted ID: {}", id),
            None => {
                warn!(url = %url, "Could not extract ID from URL");
                return Ok(ExitCode::FAILURE);
            }
        },
    }
    Ok(ExitCode::SUCCESS)
}

fn pr_body(
    file: &Path,
    validation_report: Option<&Path>,
    template: Option<&Path>,
    context: &PrContext,
) -> anyhow::Result<ExitCode> {
    let workflow = read_workflow(file)?;
    let source = file.display().to_string();
    let generator = PrBodyGenerator::new(&source, &workflow);

    let body = match template {
        Some(template) => generator.render_from_template_file(template, context),
        None => {
            let report = validation_report.and_then(|path| match read_report(path) {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "Failed to read validation report");
                    None
                }
            });
            generator.render(report.as_ref(), context)
        }
    };

    println!("{}", body);
    Ok(ExitCode::SUCCESS)
}
