//! On-disk layout of installed versions.
//!
//! ```text
//! <base>/versions/<semver>/...          core versions
//! <base>/plugins/<name>/<semver>/...     plugin versions, one tree per plugin
//! ```

use anyhow::Context;
use std::fmt;
use std::path::{Component, Path, PathBuf};

use super::manifest::ENTRY_FILE;
use crate::error::{Error, Result};
use crate::runtime::Runtime;

pub const CORE_DIR: &str = "versions";
pub const PLUGINS_DIR: &str = "plugins";

/// Which kind of package a root stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageKind {
    Core,
    Plugin,
}

impl fmt::Display for PackageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PackageKind::Core => write!(f, "core"),
            PackageKind::Plugin => write!(f, "plugin"),
        }
    }
}

/// Directory holding every installed version of one package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRoot {
    path: PathBuf,
}

impl PackageRoot {
    /// Compute the root directory for a package without touching the disk.
    ///
    /// Core versions share `<base>/versions`; plugins are namespaced by
    /// name under `<base>/plugins`. Scoped names (`@scope/name`) nest.
    pub fn layout(base: &Path, kind: PackageKind, name: &str) -> Result<PathBuf> {
        match kind {
            PackageKind::Core => Ok(base.join(CORE_DIR)),
            PackageKind::Plugin => {
                validate_name(name)?;
                Ok(base.join(PLUGINS_DIR).join(name))
            }
        }
    }

    /// Compute the root and create it, parents included.
    #[tracing::instrument(skip(runtime))]
    pub fn open<R: Runtime>(runtime: &R, base: &Path, kind: PackageKind, name: &str) -> Result<Self> {
        let path = Self::layout(base, kind, name)?;
        runtime
            .create_dir_all(&path)
            .with_context(|| format!("Failed to create package root {:?}", path))?;
        Ok(Self { path })
    }

    /// Wrap an existing directory.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns: `<root>/<version>`
    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.path.join(version)
    }

    /// A version is installed iff its directory holds the entry file.
    pub fn exists<R: Runtime>(&self, runtime: &R, version: &str) -> bool {
        !version.is_empty() && runtime.exists(&self.version_dir(version).join(ENTRY_FILE))
    }
}

/// Check that `version` names exactly one directory below a root.
pub fn validate_version(version: &str) -> Result<()> {
    let mut components = Path::new(version).components();
    let valid = matches!(components.next(), Some(Component::Normal(_)))
        && components.next().is_none()
        && !version.contains(['/', '\\']);
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidVersion(version.to_string()))
    }
}

fn validate_name(name: &str) -> Result<()> {
    let path = Path::new(name);
    let valid = !name.trim().is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
    if valid {
        Ok(())
    } else {
        Err(Error::InvalidPackageName(name.to_string()))
    }
}
