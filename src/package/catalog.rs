//! Catalogs of known versions, read from a package root or a registry.

use anyhow::Context;
use log::debug;
use semver::Version;

use super::manifest::{ANY_PATTERN, Manifest, engine_pattern};
use super::root::PackageRoot;
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::runtime::Runtime;

/// One known version and the core range it declares support for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRecord {
    pub version: Version,
    pub compatibility: String,
}

impl VersionRecord {
    pub fn new(version: Version, compatibility: impl Into<String>) -> Self {
        Self {
            version,
            compatibility: compatibility.into(),
        }
    }
}

/// Versions of one package. Order carries no meaning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    records: Vec<VersionRecord>,
}

impl Catalog {
    pub fn iter(&self) -> impl Iterator<Item = &VersionRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<VersionRecord> for Catalog {
    fn from_iter<I: IntoIterator<Item = VersionRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

/// List the versions installed under a package root.
///
/// Only real directories whose name is a semantic version are listed. A
/// version whose manifest is missing or unreadable is still listed, with
/// the `*` pattern. Anything else in the root is skipped.
#[tracing::instrument(skip(runtime, root), fields(root = ?root.path()))]
pub fn read_local<R: Runtime>(runtime: &R, root: &PackageRoot, engine_key: &str) -> Result<Catalog> {
    if !runtime.exists(root.path()) {
        return Ok(Catalog::default());
    }

    let entries = runtime
        .read_dir(root.path())
        .with_context(|| format!("Failed to list package root {:?}", root.path()))?;

    let mut records = Vec::new();
    for entry in entries {
        let Some(name) = entry.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Ok(version) = Version::parse(name) else {
            debug!("Skipping non-version entry {:?}", entry);
            continue;
        };
        if runtime.is_symlink(&entry) || !runtime.is_dir(&entry) {
            debug!("Skipping non-directory entry {:?}", entry);
            continue;
        }

        let compatibility = match Manifest::read(runtime, &entry) {
            Ok(Some(manifest)) => manifest.compatibility(engine_key),
            Ok(None) => ANY_PATTERN.to_string(),
            Err(e) => {
                debug!("Unreadable manifest in {:?}: {:#}", entry, e);
                ANY_PATTERN.to_string()
            }
        };
        records.push(VersionRecord::new(version, compatibility));
    }

    debug!("Found {} local versions", records.len());
    Ok(Catalog { records })
}

/// Query the registry for every published version of `package`.
///
/// Version keys that are not semantic versions are dropped. Any failure
/// becomes [`Error::Registry`]; nothing is retried.
#[tracing::instrument(skip(registry))]
pub async fn read_remote(
    registry: &dyn Registry,
    package: &str,
    registry_url: &str,
    engine_key: &str,
) -> Result<Catalog> {
    let versions = registry
        .view(package, registry_url)
        .await
        .map_err(|source| Error::Registry {
            package: package.to_string(),
            source,
        })?;

    let records: Vec<VersionRecord> = versions
        .into_iter()
        .filter_map(|(version, metadata)| match Version::parse(&version) {
            Ok(parsed) => Some(VersionRecord::new(
                parsed,
                engine_pattern(&metadata.engines, engine_key),
            )),
            Err(_) => {
                debug!("Skipping unparseable remote version {:?}", version);
                None
            }
        })
        .collect();

    debug!("Registry lists {} versions of {}", records.len(), package);
    Ok(Catalog { records })
}
