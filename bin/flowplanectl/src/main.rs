//! ---
//! fp_section: "05-command-line"
//! fp_subsection: "binary"
//! fp_type: "source"
//! fp_scope: "code"
//! fp_description: "Binary entrypoint for flowplanectl."
//! fp_version: "v0.0.0-prealpha"
//! fp_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use flowplane_api::{
    ApiParameter, CreateWorkflowRequest, CreateWorkflowTemplateRequest, WorkflowKey,
    WorkflowService,
};
use flowplane_common::config::AppConfig;
use flowplane_common::logging::init_tracing;
use flowplane_core::collab::{InMemoryEngine, InMemoryTemplateStore, OrchestrationClient};
use flowplane_core::{Phase, WorkflowManager};
use futures::StreamExt;
use tokio::signal;
use tracing::{info, warn};

const DEFAULT_CONFIG_CANDIDATES: &[&str] = &["configs/flowplane.toml", "configs/flowplane.example.toml"];

#[derive(Debug, Parser)]
#[command(author, version, about = "Flowplane workflow control plane", long_about = None)]
struct Cli {
    #[arg(long, value_name = "FILE", help = "Path to configuration file")]
    config: Option<PathBuf>,

    #[arg(
        long,
        value_name = "PREFIX",
        help = "Override the correlation label key prefix"
    )]
    label_prefix: Option<String>,

    #[arg(long, default_value = "default", help = "Namespace to operate in")]
    namespace: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Statically validate a workflow manifest")]
    Validate {
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,
    },
    #[command(about = "Register a manifest as a template, run it, and stream its snapshots")]
    Run {
        #[arg(value_name = "MANIFEST")]
        manifest: PathBuf,

        #[arg(long, help = "Template name (defaults to the manifest file stem)")]
        name: Option<String>,

        #[arg(long = "param", value_name = "NAME=VALUE", value_parser = parse_parameter)]
        params: Vec<ApiParameter>,

        #[arg(
            long,
            value_delimiter = ',',
            default_value = "Running,Succeeded",
            value_parser = parse_phase,
            help = "Phases the in-memory engine moves through, one per poll interval"
        )]
        phases: Vec<Phase>,
    },
    #[command(about = "Print the effective configuration as TOML")]
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (mut config, source) = load_config(cli.config.as_deref())?;
    if let Some(prefix) = &cli.label_prefix {
        config.labels.key_prefix = prefix.clone();
    }
    config.validate()?;
    init_tracing("flowplanectl", &config.logging)?;
    match &source {
        Some(path) => info!(config_path = %path.display(), "configuration loaded"),
        None => warn!("no configuration file found; using defaults"),
    }

    match cli.command {
        Commands::Validate { manifest } => validate(&manifest),
        Commands::Run {
            manifest,
            name,
            params,
            phases,
        } => run(config, &cli.namespace, &manifest, name, params, phases).await,
        Commands::ShowConfig => {
            let rendered = toml::to_string_pretty(&config).context("unable to render configuration")?;
            println!("{}", rendered);
            Ok(())
        }
    }
}

/// Explicit `--config` must load; otherwise the first existing default wins,
/// falling back to built-in defaults.
fn load_config(explicit: Option<&Path>) -> Result<(AppConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        let loaded = AppConfig::load_with_source(&[path])?;
        return Ok((loaded.config, Some(loaded.source)));
    }
    let env_override = std::env::var_os(AppConfig::ENV_CONFIG_PATH).is_some();
    let any_default = DEFAULT_CONFIG_CANDIDATES
        .iter()
        .any(|candidate| Path::new(candidate).exists());
    if env_override || any_default {
        let loaded = AppConfig::load_with_source(DEFAULT_CONFIG_CANDIDATES)?;
        return Ok((loaded.config, Some(loaded.source)));
    }
    let mut config = AppConfig::default();
    config.apply_env_overrides(|key| std::env::var(key).ok());
    Ok((config, None))
}

fn validate(path: &Path) -> Result<()> {
    let manifest = read_manifest(path)?;
    InMemoryEngine::new()
        .validate_manifest(manifest.as_bytes())
        .map_err(|err| anyhow!("{}: {}", path.display(), err))?;
    println!("{}: ok", path.display());
    Ok(())
}

async fn run(
    config: AppConfig,
    namespace: &str,
    path: &Path,
    name: Option<String>,
    params: Vec<ApiParameter>,
    phases: Vec<Phase>,
) -> Result<()> {
    let manifest = read_manifest(path)?;
    let name = match name {
        Some(name) => name,
        None => path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow!("cannot derive a template name from {}", path.display()))?,
    };

    let engine = Arc::new(InMemoryEngine::new());
    let manager = WorkflowManager::from_config(
        Arc::new(InMemoryTemplateStore::new()),
        engine.clone(),
        &config,
    );
    let service = WorkflowService::from_config(manager, &config);

    let template = service
        .create_workflow_template(CreateWorkflowTemplateRequest {
            namespace: namespace.to_owned(),
            name,
            manifest,
        })
        .await?;
    let workflow = service
        .create_workflow(CreateWorkflowRequest {
            namespace: namespace.to_owned(),
            template_uid: template.uid.clone(),
            template_version: template.version,
            parameters: params,
        })
        .await?;
    info!(workflow = %workflow.name, template_uid = %template.uid, "workflow started");

    let mut stream = service
        .watch_workflow(WorkflowKey::new(namespace, &workflow.name))
        .await?;
    let driver = tokio::spawn(drive_phases(
        engine,
        namespace.to_owned(),
        workflow.name.clone(),
        phases,
        config.watch.poll_interval,
    ));

    loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(Ok(snapshot)) => println!("{}", serde_json::to_string(&snapshot)?),
                Some(Err(err)) => {
                    driver.abort();
                    return Err(err.into());
                }
                None => break,
            },
            _ = signal::ctrl_c() => {
                warn!("interrupted; closing watch");
                break;
            }
        }
    }

    driver.abort();
    Ok(())
}

async fn drive_phases(
    engine: Arc<InMemoryEngine>,
    namespace: String,
    name: String,
    phases: Vec<Phase>,
    step: Duration,
) {
    for phase in phases {
        tokio::time::sleep(step).await;
        if let Err(err) = engine.set_phase(&namespace, &name, phase) {
            warn!(error = %err, "unable to advance workflow phase");
            return;
        }
    }
}

fn read_manifest(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("unable to read manifest {}", path.display()))
}

fn parse_parameter(raw: &str) -> Result<ApiParameter, String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("parameter name missing in '{}'", raw));
    }
    Ok(ApiParameter {
        name: name.to_owned(),
        value: Some(value.to_owned()),
    })
}

fn parse_phase(raw: &str) -> Result<Phase, String> {
    raw.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_split_on_first_equals() {
        let parameter = parse_parameter("query=a=b").expect("valid parameter");
        assert_eq!(parameter.name, "query");
        assert_eq!(parameter.value.as_deref(), Some("a=b"));
        assert!(parse_parameter("novalue").is_err());
        assert!(parse_parameter("=x").is_err());
    }

    #[test]
    fn cli_parses_run_with_phases() {
        let cli = Cli::try_parse_from([
            "flowplanectl",
            "--label-prefix",
            "ops.example.com/",
            "run",
            "etl.yaml",
            "--param",
            "day=monday",
            "--phases",
            "running,failed",
        ])
        .expect("arguments parse");
        assert_eq!(cli.label_prefix.as_deref(), Some("ops.example.com/"));
        match cli.command {
            Commands::Run { phases, params, .. } => {
                assert_eq!(phases, vec![Phase::Running, Phase::Failed]);
                assert_eq!(params.len(), 1);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn default_phases_reach_success() {
        let cli = Cli::try_parse_from(["flowplanectl", "run", "etl.yaml"]).expect("arguments parse");
        match cli.command {
            Commands::Run { phases, .. } => {
                assert_eq!(phases, vec![Phase::Running, Phase::Succeeded]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn drive_phases_finishes_workflow() {
        let engine = Arc::new(InMemoryEngine::new());
        let created = engine
            .create(
                "default",
                b"entrypoint: main\ntemplates:\n  - name: main\n",
                Default::default(),
            )
            .await
            .expect("created");
        drive_phases(
            engine.clone(),
            "default".into(),
            created.metadata.name.clone(),
            vec![Phase::Running, Phase::Succeeded],
            Duration::from_secs(1),
        )
        .await;
        let finished = engine
            .get("default", &created.metadata.name)
            .await
            .expect("exists");
        assert!(finished.status.is_finished());
    }
}
