use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Manifest file name inside every package directory.
pub const MANIFEST_FILE: &str = "package.json";
/// Entry file whose presence marks a version directory as installed.
pub const ENTRY_FILE: &str = "index.js";
/// Compatibility pattern assumed when a package declares none.
pub const ANY_PATTERN: &str = "*";

/// The subset of a package manifest this crate reads.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<String>,
    /// Kept loose: old packages publish `engines` as an array.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub engines: Value,
}

impl Manifest {
    /// Read `<dir>/package.json`.
    ///
    /// Every call parses the file again; nothing is cached. Returns `None`
    /// when the directory has no manifest.
    #[tracing::instrument(skip(runtime))]
    pub fn read<R: Runtime>(runtime: &R, dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(MANIFEST_FILE);
        if !runtime.exists(&path) {
            return Ok(None);
        }

        let content = runtime
            .read_to_string(&path)
            .with_context(|| format!("Failed to read manifest {:?}", path))?;
        let manifest = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse manifest {:?}", path))?;
        Ok(Some(manifest))
    }

    /// Compatibility pattern declared under `engines.<engine_key>`, or `*`.
    pub fn compatibility(&self, engine_key: &str) -> String {
        engine_pattern(&self.engines, engine_key)
    }

    /// Absolute path of the module entry inside `dir`.
    pub fn entry_path(&self, dir: &Path) -> PathBuf {
        let main = self.main.as_deref().filter(|m| !m.is_empty());
        dir.join(main.unwrap_or(ENTRY_FILE))
    }
}

/// Extract `engines.<key>` as a pattern, defaulting to `*`.
pub fn engine_pattern(engines: &Value, key: &str) -> String {
    engines
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .unwrap_or(ANY_PATTERN)
        .to_string()
}
