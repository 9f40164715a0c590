use anyhow::{Context, bail};
use async_trait::async_trait;
use log::{debug, info};
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::protocol::{InstallRequest, InstallResponse};
use crate::error::{Error, Result};

/// Argument that switches the binary into worker mode.
pub const WORKER_SUBCOMMAND: &str = "worker";

/// Installs one package version into a package root.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Installer: Send + Sync {
    /// Returns the concrete version that now exists under
    /// `request.destination_root`.
    async fn install(&self, request: &InstallRequest) -> Result<String>;
}

/// Program and arguments that start a worker process.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl WorkerCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// The running executable with the `worker` argument.
    pub fn current_exe() -> anyhow::Result<Self> {
        let program = std::env::current_exe().context("Failed to locate the current executable")?;
        Ok(Self::new(program).arg(WORKER_SUBCOMMAND))
    }
}

/// Runs every install in a fresh worker process.
#[derive(Debug, Clone)]
pub struct WorkerInstaller {
    command: WorkerCommand,
}

impl WorkerInstaller {
    pub fn new(command: WorkerCommand) -> Self {
        Self { command }
    }

    /// One request, one reply. Both a reply and the process dying without
    /// one settle the call.
    async fn exchange(&self, request: &InstallRequest) -> anyhow::Result<String> {
        let payload = serde_json::to_vec(request)?;

        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start install worker {:?}", self.command.program))?;
        debug!("Started install worker (pid {:?})", child.id());

        if let Some(mut stdin) = child.stdin.take() {
            // A worker that dies early closes the pipe; its exit status and
            // stderr explain why.
            if let Err(e) = stdin.write_all(&payload).await {
                debug!("Failed to send install request: {}", e);
            } else if let Err(e) = stdin.shutdown().await {
                debug!("Failed to close worker stdin: {}", e);
            }
        }

        let output = child
            .wait_with_output()
            .await
            .context("Failed to wait for install worker")?;
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            debug!("Install worker stderr:\n{}", stderr.trim_end());
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let Some(line) = stdout.lines().map(str::trim).find(|line| !line.is_empty()) else {
            bail!(
                "install worker exited ({}) without a reply: {}",
                output.status,
                stderr.trim()
            );
        };

        let response: InstallResponse = serde_json::from_str(line)
            .with_context(|| format!("Malformed reply from install worker: {}", line))?;
        response.into_result()
    }
}

#[async_trait]
impl Installer for WorkerInstaller {
    #[tracing::instrument(skip(self))]
    async fn install(&self, request: &InstallRequest) -> Result<String> {
        info!(
            "Installing {}@{} into {:?}",
            request.package_name,
            request.version.as_deref().unwrap_or("latest"),
            request.destination_root
        );
        self.exchange(request).await.map_err(|source| Error::Install {
            package: request.package_name.clone(),
            source,
        })
    }
}
