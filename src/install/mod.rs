//! Isolated installation of package versions.
//!
//! The parent side ([`WorkerInstaller`]) starts one worker process per
//! install, sends it an [`InstallRequest`] on stdin and reads exactly one
//! [`InstallResponse`] line from its stdout. The child side
//! ([`worker::serve_stdio`]) stages the package in a private temporary
//! directory and moves it into the package root with a single rename, so a
//! version directory is either complete or absent.

mod locks;
mod orchestrator;
mod protocol;
pub mod worker;

pub use locks::InstallLocks;
pub use orchestrator::{Installer, WORKER_SUBCOMMAND, WorkerCommand, WorkerInstaller};
pub use protocol::{InstallRequest, InstallResponse};

#[cfg(test)]
pub use orchestrator::MockInstaller;
