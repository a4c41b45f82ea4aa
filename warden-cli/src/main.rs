//! Warden CLI - run supervised workers from a spec file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use warden_core::config::WardenConfig;
use warden_core::dispatch::{Dispatcher, SignalReceiver, SinkDescriptor};
use warden_supervisor::{
    AgentServerState, AgentStatus, LifecycleEvent, ModuleRegistry, ProcessLifecycle,
    ProcessSpec, TaskSupervisor,
};

#[derive(Parser)]
#[command(name = "warden")]
#[command(about = "Warden worker supervision CLI", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start every process in a spec file and supervise them until interrupted
    Run {
        /// TOML file with `[[process]]` tables
        specs: PathBuf,

        /// Configuration file (defaults to warden.toml and WARDEN_* variables)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(long)]
        hold: Option<u64>,

        /// Agent ID used as the signal source
        #[arg(long, env = "WARDEN_AGENT_ID", default_value = "warden")]
        agent_id: String,
    },
    /// List the built-in worker modules
    Modules,
    /// Version information
    Version,
}

/// Contents of a spec file
#[derive(Debug, Deserialize)]
struct SpecFile {
    #[serde(default)]
    process: Vec<ProcessSpec>,
}

fn load_specs(path: &Path) -> Result<Vec<ProcessSpec>> {
    use figment::{
        Figment,
        providers::{Format, Toml},
    };

    if !path.exists() {
        anyhow::bail!("Spec file not found: {}", path.display());
    }

    let file: SpecFile = Figment::from(Toml::file(path))
        .extract()
        .with_context(|| format!("Invalid spec file {}", path.display()))?;
    Ok(file.process)
}

fn load_config(path: Option<&Path>) -> Result<WardenConfig> {
    let config = match path {
        Some(path) => WardenConfig::from_file(path)?,
        None => WardenConfig::load()?,
    };
    Ok(config)
}

async fn terminate_all(lifecycle: &ProcessLifecycle, state: &AgentServerState) {
    for child in lifecycle.list(state).await {
        if let Err(e) = lifecycle.terminate(state, &child.handle).await {
            warn!(handle = %child.handle, error = %e, "Failed to terminate child process");
        }
    }
}

/// One line per lifecycle signal
fn describe(event: &LifecycleEvent) -> String {
    let mut line = event.category.to_string();
    if let Some(handle) = event.payload.handle {
        line.push_str(&format!(" {}", handle));
    }
    if let Some(ref spec) = event.payload.spec {
        line.push_str(&format!(" module={}", spec.module_name()));
    }
    if let Some(ref error) = event.payload.error {
        line.push_str(&format!(" error=\"{}\"", error));
    }
    line
}

async fn print_events(mut rx: SignalReceiver) {
    while let Some(signal) = rx.recv().await {
        if let Some(event) = LifecycleEvent::from_signal(&signal) {
            println!("{}", describe(&event));
        }
    }
}

async fn supervise(
    config: &WardenConfig,
    dispatcher: Dispatcher,
    specs: Vec<ProcessSpec>,
    hold: Option<u64>,
    agent_id: String,
) -> Result<()> {
    let supervisor = Arc::new(TaskSupervisor::new(
        ModuleRegistry::with_builtin(),
        config.supervisor.clone(),
    ));
    let state = AgentServerState::new(agent_id, supervisor, dispatcher)
        .with_status(AgentStatus::Initializing);
    let lifecycle = ProcessLifecycle::new();

    info!(agent_id = %state.agent_id, count = specs.len(), "Starting processes");
    let state = match lifecycle.start(&state, specs).await {
        Ok((state, _)) => state.with_status(AgentStatus::Running),
        Err(e) => {
            terminate_all(&lifecycle, &state.with_status(AgentStatus::Stopping)).await;
            return Err(e).context("Failed to start processes");
        }
    };
    info!(agent_id = %state.agent_id, status = ?state.status, "Agent ready");

    for child in lifecycle.list(&state).await {
        println!(
            "{}  {:<10} {}",
            child.handle,
            child.modules.join(","),
            child.id.as_deref().unwrap_or("-")
        );
    }

    match hold {
        Some(secs) => {
            tokio::select! {
                _ = tokio::time::sleep(Duration::from_secs(secs)) => {}
                result = tokio::signal::ctrl_c() => result?,
            }
        }
        None => tokio::signal::ctrl_c().await?,
    }

    let state = state.with_status(AgentStatus::Stopping);
    info!(agent_id = %state.agent_id, status = ?state.status, "Shutting down");
    terminate_all(&lifecycle, &state).await;
    Ok(())
}

async fn run(
    specs: &Path,
    config: Option<&Path>,
    hold: Option<u64>,
    agent_id: String,
) -> Result<()> {
    let config = load_config(config)?;
    let specs = load_specs(specs)?;

    let (tx, rx) = config.dispatch.channel();
    let printer = tokio::spawn(print_events(rx));
    let dispatcher = Dispatcher::builder()
        .config(&config.dispatch)
        .sink(SinkDescriptor::direct_async(tx))
        .build();

    let result = supervise(&config, dispatcher, specs, hold, agent_id).await;

    // every sender is gone with the dispatcher, so the printer drains and stops
    let _ = printer.await;
    result
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            specs,
            config,
            hold,
            agent_id,
        } => run(&specs, config.as_deref(), hold, agent_id).await?,
        Commands::Modules => {
            for name in ModuleRegistry::with_builtin().names() {
                println!("{}", name);
            }
        }
        Commands::Version => {
            println!("warden {}", env!("CARGO_PKG_VERSION"));
            println!("warden-core {}", warden_core::VERSION);
        }
    }

    Ok(())
}
