use log::{debug, info, warn};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use super::request::{LoadedModule, LoadedPackage, PackageRequest};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::install::{InstallLocks, InstallRequest, Installer};
use crate::package::{
    ANY_PATTERN, AnyVersion, ENTRY_FILE, Manifest, PackageRoot, VersionMatcher, VersionResolver,
    read_local, read_remote, validate_version,
};
use crate::registry::Registry;
use crate::runtime::Runtime;

/// Progress of one load, recorded on its tracing span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Resolving,
    LoadingLocalPath,
    Installing,
    Loaded,
    Failed,
}

impl fmt::Display for LoadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadState::Resolving => "resolving",
            LoadState::LoadingLocalPath => "loading-local-path",
            LoadState::Installing => "installing",
            LoadState::Loaded => "loaded",
            LoadState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Resolves, installs and loads packages for one storage root.
pub struct PackageLoader<'a, R: Runtime> {
    runtime: &'a R,
    config: &'a Config,
    registry: Arc<dyn Registry>,
    installer: Arc<dyn Installer>,
    matcher: Arc<dyn VersionMatcher>,
    locks: InstallLocks,
}

impl<'a, R: Runtime> PackageLoader<'a, R> {
    /// Uses [`AnyVersion`] until a matcher is set with
    /// [`PackageLoader::with_matcher`].
    pub fn new(
        runtime: &'a R,
        config: &'a Config,
        registry: Arc<dyn Registry>,
        installer: Arc<dyn Installer>,
    ) -> Self {
        Self {
            runtime,
            config,
            registry,
            installer,
            matcher: Arc::new(AnyVersion),
            locks: InstallLocks::new(),
        }
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn VersionMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Load the package described by `request`.
    ///
    /// An explicit local path is read as is. Otherwise the target version
    /// is the explicit version, else the best local fit, else the best
    /// remote fit. A missing target is installed first, and the loaded
    /// manifest must accept the core version.
    #[tracing::instrument(
        skip(self, request),
        fields(kind = %request.kind, name = %request.name, state = tracing::field::Empty)
    )]
    pub async fn load(&self, request: &PackageRequest) -> Result<LoadedPackage> {
        let result = self.drive(request).await;
        match &result {
            Ok(loaded) => {
                self.enter(LoadState::Loaded);
                info!("Loaded {} from {:?}", loaded.name, loaded.path);
            }
            Err(e) => {
                self.enter(LoadState::Failed);
                warn!("Failed to load {}: {}", request.name, e);
            }
        }
        result
    }

    fn enter(&self, state: LoadState) {
        tracing::Span::current().record("state", tracing::field::display(state));
        debug!("state: {}", state);
    }

    async fn drive(&self, request: &PackageRequest) -> Result<LoadedPackage> {
        self.enter(LoadState::Resolving);

        if let Some(path) = &request.local_path {
            self.enter(LoadState::LoadingLocalPath);
            return self.read_package(request, path, false);
        }

        let root = PackageRoot::open(
            self.runtime,
            &self.config.root,
            request.kind,
            &request.name,
        )?;
        let mut version = self.resolve(request, &root).await?;

        if !root.exists(self.runtime, &version) {
            self.enter(LoadState::Installing);
            version = self.install_once(request, &root, version).await?;
        }

        self.read_package(request, &root.version_dir(&version), true)
    }

    /// Install `version` unless a concurrent load of this process did it
    /// first. Returns the version the installer reported.
    async fn install_once(
        &self,
        request: &PackageRequest,
        root: &PackageRoot,
        version: String,
    ) -> Result<String> {
        let version_dir = root.version_dir(&version);
        let lock = self.locks.lock_for(&version_dir);

        let outcome = {
            let _guard = lock.lock().await;
            if root.exists(self.runtime, &version) {
                debug!("{} {} was installed while waiting", request.name, version);
                Ok(version)
            } else {
                let install = InstallRequest {
                    package_name: request.name.clone(),
                    version: Some(version),
                    registry: self.registry_url(request).to_string(),
                    destination_root: root.path().to_path_buf(),
                    source_path: None,
                };
                self.installer.install(&install).await
            }
        };

        drop(lock);
        self.locks.release(&version_dir);
        outcome
    }

    /// Explicit version, then local best fit, then remote best fit.
    async fn resolve(&self, request: &PackageRequest, root: &PackageRoot) -> Result<String> {
        if let Some(version) = request
            .version
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
        {
            validate_version(version)?;
            debug!("Using explicit version {}", version);
            return Ok(version.to_string());
        }

        let engine_key = &self.config.engine_key;
        let local = read_local(self.runtime, root, engine_key)?;
        if let Some(version) =
            VersionResolver::best_fit(&local, &request.core_version, self.matcher.as_ref())
        {
            debug!("Using local version {}", version);
            return Ok(version.to_string());
        }

        let remote = read_remote(
            self.registry.as_ref(),
            &request.name,
            self.registry_url(request),
            engine_key,
        )
        .await?;
        if let Some(version) =
            VersionResolver::best_fit(&remote, &request.core_version, self.matcher.as_ref())
        {
            debug!("Using remote version {}", version);
            return Ok(version.to_string());
        }

        Err(Error::NoSatisfyingVersion {
            name: request.name.clone(),
            core_version: request.core_version.clone(),
        })
    }

    fn registry_url<'r>(&'r self, request: &'r PackageRequest) -> &'r str {
        request.registry.as_deref().unwrap_or(&self.config.registry)
    }

    fn read_package(
        &self,
        request: &PackageRequest,
        dir: &Path,
        check_compatibility: bool,
    ) -> Result<LoadedPackage> {
        let manifest = Manifest::read(self.runtime, dir)?;

        if check_compatibility {
            let pattern = manifest
                .as_ref()
                .map(|m| m.compatibility(&self.config.engine_key))
                .unwrap_or_else(|| ANY_PATTERN.to_string());
            if !self.matcher.matches(&request.core_version, &pattern) {
                let version = manifest
                    .as_ref()
                    .and_then(|m| m.version.clone())
                    .or_else(|| dir.file_name().map(|n| n.to_string_lossy().into_owned()))
                    .unwrap_or_default();
                return Err(Error::VersionMismatch {
                    name: request.name.clone(),
                    version,
                    pattern,
                    core_version: request.core_version.clone(),
                });
            }
        }

        let entry = match &manifest {
            Some(manifest) => manifest.entry_path(dir),
            None => dir.join(ENTRY_FILE),
        };
        if !self.runtime.exists(&entry) {
            return Err(Error::MissingEntry { path: entry });
        }

        Ok(LoadedPackage {
            name: request.name.clone(),
            path: dir.to_path_buf(),
            version: manifest.as_ref().and_then(|m| m.version.clone()),
            module: LoadedModule { entry, manifest },
        })
    }
}
