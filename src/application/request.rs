use std::path::PathBuf;

use crate::config::Config;
use crate::package::{Manifest, PackageKind};

/// What to load. One instance per resolution attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageRequest {
    pub kind: PackageKind,
    pub name: String,
    /// Exact version to load, skipping catalog resolution.
    pub version: Option<String>,
    /// Development copy to load as is, skipping resolution and the
    /// compatibility check.
    pub local_path: Option<PathBuf>,
    /// Version of the running core, matched against declared patterns.
    pub core_version: String,
    /// Registry to use instead of the configured one.
    pub registry: Option<String>,
}

impl PackageRequest {
    pub fn core(name: impl Into<String>, core_version: impl Into<String>) -> Self {
        Self::new(PackageKind::Core, name, core_version)
    }

    pub fn plugin(name: impl Into<String>, core_version: impl Into<String>) -> Self {
        Self::new(PackageKind::Plugin, name, core_version)
    }

    fn new(kind: PackageKind, name: impl Into<String>, core_version: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            version: None,
            local_path: None,
            core_version: core_version.into(),
            registry: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_local_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.local_path = Some(path.into());
        self
    }

    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = Some(registry.into());
        self
    }
}

impl Config {
    /// Request for the configured core package.
    pub fn core_request(&self, core_version: impl Into<String>) -> PackageRequest {
        PackageRequest::core(self.core_package.clone(), core_version)
    }
}

/// Entry point of a loaded package, ready for the host to evaluate.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModule {
    /// Absolute path of the entry file.
    pub entry: PathBuf,
    /// Parsed fresh for this load. `None` for a development copy without
    /// a manifest.
    pub manifest: Option<Manifest>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedPackage {
    pub name: String,
    /// Directory the package was loaded from.
    pub path: PathBuf,
    /// Version declared by the manifest.
    pub version: Option<String>,
    pub module: LoadedModule,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CORE_PACKAGE;

    #[test]
    fn test_builders() {
        let request = PackageRequest::plugin("webpack", "1.0.0")
            .with_version("0.2.0")
            .with_registry("http://localhost:4873")
            .with_local_path("/src/webpack");

        assert_eq!(request.kind, PackageKind::Plugin);
        assert_eq!(request.name, "webpack");
        assert_eq!(request.core_version, "1.0.0");
        assert_eq!(request.version.as_deref(), Some("0.2.0"));
        assert_eq!(request.registry.as_deref(), Some("http://localhost:4873"));
        assert_eq!(request.local_path, Some(PathBuf::from("/src/webpack")));
    }

    #[test]
    fn test_core_request_uses_configured_package() {
        let request = Config::with_root("/tmp/root").core_request("1.0.6");
        assert_eq!(request.kind, PackageKind::Core);
        assert_eq!(request.name, DEFAULT_CORE_PACKAGE);
        assert_eq!(request.version, None);
    }
}
