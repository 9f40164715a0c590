//! Registry capability.
//!
//! A registry can list the published versions of a package together with
//! their metadata, and install one version into a directory. The loader
//! and the install worker only see the [`Registry`] trait; [`NpmRegistry`]
//! is the bundled implementation for npm-compatible HTTP registries.

mod npm;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

pub use npm::NpmRegistry;

/// Metadata published for a single version.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct VersionMetadata {
    #[serde(default)]
    pub version: Option<String>,
    /// Raw `engines` field; see [`crate::package::engine_pattern`].
    #[serde(default)]
    pub engines: Value,
    #[serde(default)]
    pub dist: Option<Dist>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Dist {
    pub tarball: String,
}

/// What to install and where.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallOptions {
    pub name: String,
    /// `None` or `latest` for the latest tag, an exact version or a range.
    pub version: Option<String>,
    pub registry: String,
    /// Directory that receives the unpacked package tree. Must not exist
    /// yet or be empty.
    pub path: PathBuf,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Registry: Send + Sync {
    /// All published versions of `package` keyed by version string.
    async fn view(&self, package: &str, registry: &str) -> Result<BTreeMap<String, VersionMetadata>>;

    /// Install one version into `options.path`, returning the concrete
    /// version that was installed.
    async fn install(&self, options: &InstallOptions) -> Result<String>;
}
