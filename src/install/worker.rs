//! Child side of the install protocol.
//!
//! A worker handles exactly one request: read it from stdin, install into a
//! private staging directory, materialize into the package root, reply with
//! one JSON line on stdout and exit. Diagnostics go to stderr.

use anyhow::{Context, Result, bail};
use log::{debug, error, info, warn};
use semver::Version;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use super::protocol::{InstallRequest, InstallResponse};
use crate::package::{ENTRY_FILE, Manifest};
use crate::registry::{InstallOptions, Registry};
use crate::runtime::Runtime;

/// Serve one request over stdin/stdout.
pub async fn serve_stdio<R: Runtime>(runtime: &R, registry: &dyn Registry) -> Result<()> {
    let mut input = String::new();
    tokio::io::stdin()
        .read_to_string(&mut input)
        .await
        .context("Failed to read install request from stdin")?;

    let response = handle(runtime, registry, &input).await;

    let mut line = serde_json::to_string(&response)?;
    line.push('\n');
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(line.as_bytes())
        .await
        .context("Failed to write install response")?;
    stdout.flush().await?;
    Ok(())
}

/// Turn one raw request into exactly one response. Never fails.
pub async fn handle<R: Runtime>(runtime: &R, registry: &dyn Registry, input: &str) -> InstallResponse {
    let request: InstallRequest = match serde_json::from_str(input) {
        Ok(request) => request,
        Err(e) => {
            return InstallResponse::Failed {
                error: format!("invalid install request: {}", e),
            };
        }
    };

    match run(runtime, registry, &request).await {
        Ok(version) => InstallResponse::Installed { version },
        Err(e) => {
            error!("Install of {} failed: {:#}", request.package_name, e);
            InstallResponse::Failed {
                error: format!("{:#}", e),
            }
        }
    }
}

/// Stage the requested package and materialize it. Returns the installed
/// version.
#[tracing::instrument(skip(runtime, registry))]
pub async fn run<R: Runtime>(runtime: &R, registry: &dyn Registry, request: &InstallRequest) -> Result<String> {
    let destination_root = &request.destination_root;
    runtime
        .create_dir_all(destination_root)
        .with_context(|| format!("Failed to create {:?}", destination_root))?;

    // Removed on drop, so a normal exit leaves nothing behind.
    let staging = tempfile::Builder::new()
        .prefix("plugvm-staging-")
        .tempdir()
        .context("Failed to create staging directory")?;

    let (staged, version) = match &request.source_path {
        Some(source) => {
            let version = Manifest::read(runtime, source)?
                .and_then(|manifest| manifest.version)
                .with_context(|| format!("{:?} declares no version", source))?;
            info!("Installing {}@{} from {:?}", request.package_name, version, source);
            (source.clone(), version)
        }
        None => {
            let package_dir = staging.path().join("package");
            let options = InstallOptions {
                name: request.package_name.clone(),
                version: request.version.clone(),
                registry: request.registry.clone(),
                path: package_dir.clone(),
            };
            let version = registry.install(&options).await?;
            (package_dir, version)
        }
    };

    Version::parse(&version).with_context(|| format!("'{}' is not a valid version", version))?;
    materialize(runtime, &staged, destination_root, &version)?;
    Ok(version)
}

/// Move a staged tree to `<destination_root>/<version>`.
///
/// The tree is copied with symbolic links dereferenced into a hidden
/// `.partial-*` directory next to the target, then renamed into place. An
/// already installed target is left untouched; an incomplete one is
/// replaced.
#[tracing::instrument(skip(runtime))]
pub fn materialize<R: Runtime>(
    runtime: &R,
    staged: &Path,
    destination_root: &Path,
    version: &str,
) -> Result<PathBuf> {
    let target = destination_root.join(version);
    if runtime.exists(&target.join(ENTRY_FILE)) {
        info!("{:?} is already installed", target);
        return Ok(target);
    }
    if !runtime.exists(&staged.join(ENTRY_FILE)) {
        bail!("package {} has no {}", version, ENTRY_FILE);
    }

    let partial = tempfile::Builder::new()
        .prefix(".partial-")
        .tempdir_in(destination_root)
        .with_context(|| format!("Failed to create a staging directory in {:?}", destination_root))?;
    let copied = runtime.copy_tree(staged, partial.path())?;

    if runtime.exists(&target.join(ENTRY_FILE)) {
        info!("{:?} was installed concurrently", target);
        return Ok(target);
    }
    if runtime.exists(&target) {
        warn!("Replacing incomplete install at {:?}", target);
        runtime.remove_dir_all(&target)?;
    }

    if let Err(e) = runtime.rename(partial.path(), &target) {
        if runtime.exists(&target.join(ENTRY_FILE)) {
            info!("{:?} was installed concurrently", target);
            return Ok(target);
        }
        return Err(e.context(format!("Failed to move package into {:?}", target)));
    }

    debug!("Materialized {} files into {:?}", copied, target);
    Ok(target)
}
