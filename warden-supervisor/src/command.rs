//! OS-process worker module
//!
//! `command` runs an external program as a supervised worker. Start arguments are either
//! positional (`["sleep", "30"]`) or named (`program`, `args`, `working_dir`).

use crate::spec::StartArgs;
use crate::worker::{BoxedWorker, Worker, WorkerModule};
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Module that spawns an OS process per worker
pub struct CommandModule;

#[derive(Debug, PartialEq)]
struct CommandLine {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

fn as_string(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(format!("expected a string argument, got {}", other)),
    }
}

impl CommandLine {
    fn parse(args: &StartArgs) -> Result<Self, String> {
        match args {
            StartArgs::Positional(values) => {
                let (program, rest) = values
                    .split_first()
                    .ok_or_else(|| "missing program".to_string())?;
                Ok(Self {
                    program: as_string(program)?,
                    args: rest.iter().map(as_string).collect::<Result<_, _>>()?,
                    working_dir: None,
                })
            }
            StartArgs::Named(_) => {
                let program = args
                    .named("program")
                    .ok_or_else(|| "missing option: program".to_string())
                    .and_then(as_string)?;
                let argv = match args.named("args") {
                    None => Vec::new(),
                    Some(Value::Array(items)) => {
                        items.iter().map(as_string).collect::<Result<_, _>>()?
                    }
                    Some(other) => return Err(format!("args must be a list, got {}", other)),
                };
                let working_dir = args
                    .named("working_dir")
                    .map(as_string)
                    .transpose()?
                    .map(PathBuf::from);
                Ok(Self {
                    program,
                    args: argv,
                    working_dir,
                })
            }
        }
    }
}

struct CommandWorker {
    program: String,
    child: Child,
}

#[async_trait]
impl Worker for CommandWorker {
    async fn run(self: Box<Self>, shutdown: CancellationToken) {
        let mut this = *self;
        let pid = this.child.id();
        tokio::select! {
            status = this.child.wait() => match status {
                Ok(status) => info!(program = %this.program, ?pid, %status, "Command exited"),
                Err(e) => {
                    warn!(program = %this.program, ?pid, error = %e, "Error waiting for command")
                }
            },
            _ = shutdown.cancelled() => {
                debug!(program = %this.program, ?pid, "Stopping command");
                if let Err(e) = this.child.start_kill() {
                    warn!(program = %this.program, ?pid, error = %e, "Failed to kill command");
                }
                match this.child.wait().await {
                    Ok(status) => info!(program = %this.program, ?pid, %status, "Command stopped"),
                    Err(e) => warn!(
                        program = %this.program,
                        ?pid,
                        error = %e,
                        "Error waiting for command shutdown"
                    ),
                }
            }
        }
    }
}

#[async_trait]
impl WorkerModule for CommandModule {
    fn name(&self) -> &str {
        "command"
    }

    async fn init(&self, _function: &str, args: &StartArgs) -> Result<BoxedWorker, String> {
        let line = CommandLine::parse(args)?;

        let mut cmd = Command::new(&line.program);
        cmd.args(&line.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        if let Some(ref working_dir) = line.working_dir {
            cmd.current_dir(working_dir);
        }

        let child = cmd
            .spawn()
            .map_err(|e| format!("Failed to spawn {}: {}", line.program, e))?;

        Ok(Box::new(CommandWorker {
            program: line.program,
            child,
        }))
    }
}
