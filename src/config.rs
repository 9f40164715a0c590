//! Storage root resolution and crate-wide defaults.

use log::debug;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::runtime::Runtime;

/// Environment variable that overrides the storage root.
pub const ROOT_ENV_VAR: &str = "SVRX_DIR";
/// Directory under the user's home used when no override is set.
pub const DEFAULT_DIR_NAME: &str = ".svrx";
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";
/// Key under a manifest's `engines` that holds the core compatibility range.
pub const DEFAULT_ENGINE_KEY: &str = "svrx";
pub const DEFAULT_CORE_PACKAGE: &str = "@svrx/svrx";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Storage root holding `versions/` and `plugins/`.
    pub root: PathBuf,
    /// Registry used when a request does not name one.
    pub registry: String,
    pub engine_key: String,
    pub core_package: String,
}

impl Config {
    /// Resolve the storage root from the environment.
    ///
    /// `SVRX_DIR` wins when set and non-empty, otherwise `<home>/.svrx`.
    /// Fails with [`Error::Configuration`] when neither is available.
    #[tracing::instrument(skip(runtime))]
    pub fn load<R: Runtime>(runtime: &R) -> Result<Self> {
        let root = match runtime.env_var(ROOT_ENV_VAR) {
            Ok(dir) if !dir.is_empty() => {
                debug!("Using storage root from {}: {}", ROOT_ENV_VAR, dir);
                PathBuf::from(dir)
            }
            _ => runtime
                .home_dir()
                .map(|home| home.join(DEFAULT_DIR_NAME))
                .ok_or_else(|| {
                    Error::Configuration(format!(
                        "no home location available: set HOME or {}",
                        ROOT_ENV_VAR
                    ))
                })?,
        };

        Ok(Self::with_root(root))
    }

    /// Build a configuration around an explicit storage root.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            registry: DEFAULT_REGISTRY.to_string(),
            engine_key: DEFAULT_ENGINE_KEY.to_string(),
            core_package: DEFAULT_CORE_PACKAGE.to_string(),
        }
    }

    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = registry.into();
        self
    }

    pub fn with_engine_key(mut self, engine_key: impl Into<String>) -> Self {
        self.engine_key = engine_key.into();
        self
    }
}
