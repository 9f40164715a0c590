use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::{debug, info};
use semver::{Version, VersionReq};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use super::{InstallOptions, Registry, VersionMetadata};
use crate::archive::TarGzExtractor;
use crate::http::HttpClient;
use crate::package::compare;
use crate::runtime::Runtime;

/// Package document served at `<registry>/<name>`.
#[derive(Debug, Deserialize)]
struct Packument {
    #[serde(rename = "dist-tags", default)]
    dist_tags: HashMap<String, String>,
    #[serde(default)]
    versions: BTreeMap<String, VersionMetadata>,
}

impl Packument {
    /// Resolve a requested version the way `npm install name@range` does:
    /// a dist-tag, then an exact version, then the highest version inside
    /// a range.
    fn resolve(&self, requested: Option<&str>) -> Option<String> {
        let requested = requested.map(str::trim).filter(|r| !r.is_empty());
        let wanted = requested.unwrap_or("latest");

        if let Some(tagged) = self.dist_tags.get(wanted) {
            return Some(tagged.clone());
        }
        if self.versions.contains_key(wanted) {
            return Some(wanted.to_string());
        }

        let req = VersionReq::parse(wanted).ok()?;
        self.versions
            .keys()
            .filter_map(|v| Version::parse(v).ok())
            .filter(|v| req.matches(v))
            .max_by(compare)
            .map(|v| v.to_string())
    }
}

/// Registry client for npm-compatible HTTP registries.
pub struct NpmRegistry<R: Runtime> {
    runtime: R,
    http: HttpClient,
}

impl<R: Runtime> NpmRegistry<R> {
    pub fn new(runtime: R, http: HttpClient) -> Self {
        Self { runtime, http }
    }

    /// Returns: `<registry>/<name>`, with the scope separator escaped.
    fn packument_url(registry: &str, name: &str) -> String {
        format!(
            "{}/{}",
            registry.trim_end_matches('/'),
            name.replace('/', "%2f")
        )
    }

    async fn packument(&self, name: &str, registry: &str) -> Result<Packument> {
        let url = Self::packument_url(registry, name);
        self.http
            .get_json_opt::<Packument>(&url)
            .await?
            .ok_or_else(|| anyhow!("package '{}' not found in {}", name, registry))
    }
}

#[async_trait]
impl<R: Runtime> Registry for NpmRegistry<R> {
    #[tracing::instrument(skip(self))]
    async fn view(&self, package: &str, registry: &str) -> Result<BTreeMap<String, VersionMetadata>> {
        let packument = self.packument(package, registry).await?;
        debug!("{} lists {} versions", package, packument.versions.len());
        Ok(packument.versions)
    }

    #[tracing::instrument(skip(self))]
    async fn install(&self, options: &InstallOptions) -> Result<String> {
        let packument = self.packument(&options.name, &options.registry).await?;

        let version = packument
            .resolve(options.version.as_deref())
            .ok_or_else(|| {
                anyhow!(
                    "version '{}' of package '{}' not found",
                    options.version.as_deref().unwrap_or("latest"),
                    options.name
                )
            })?;
        let tarball = packument
            .versions
            .get(&version)
            .and_then(|meta| meta.dist.as_ref())
            .map(|dist| dist.tarball.clone())
            .with_context(|| format!("{}@{} has no tarball", options.name, version))?;

        info!("Installing {}@{} from {}", options.name, version, tarball);

        let archive_path = options.path.with_extension("tgz");
        self.http
            .download_file(&tarball, || {
                self.runtime
                    .create_file(&archive_path)
                    .with_context(|| format!("Failed to create {:?}", archive_path))
            })
            .await?;

        TarGzExtractor
            .extract(&self.runtime, &archive_path, &options.path)
            .with_context(|| format!("Failed to unpack {}@{}", options.name, version))?;

        Ok(version)
    }
}
