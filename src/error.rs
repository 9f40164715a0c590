use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Terminal outcomes of a package load.
///
/// Nothing in this crate retries on any of these; each is surfaced to the
/// caller of [`crate::application::PackageLoader::load`].
#[derive(Error, Debug)]
pub enum Error {
    /// No usable storage root. Only an environment change fixes this.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid package name '{0}'")]
    InvalidPackageName(String),

    /// An explicit version that cannot name a directory in the package root.
    #[error("invalid version '{0}'")]
    InvalidVersion(String),

    /// The artifact's declared compatibility pattern rejects the running core.
    #[error(
        "version {version} of '{name}' requires core '{pattern}', which does not match the core version {core_version} currently in use"
    )]
    VersionMismatch {
        name: String,
        version: String,
        pattern: String,
        core_version: String,
    },

    #[error("there is no version of '{name}' that satisfies core version {core_version}")]
    NoSatisfyingVersion { name: String, core_version: String },

    #[error("failed to query the registry for '{package}': {source:#}")]
    Registry {
        package: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("install of '{package}' failed: {source:#}")]
    Install {
        package: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("no entry file found at {}", path.display())]
    MissingEntry { path: PathBuf },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_error_keeps_worker_message() {
        let err = Error::Install {
            package: "foo".into(),
            source: anyhow::anyhow!("not found"),
        };
        assert!(err.to_string().contains("not found"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_registry_error_shows_context_chain() {
        let source = anyhow::anyhow!("connection refused").context("GET http://registry/foo");
        let err = Error::Registry {
            package: "foo".into(),
            source,
        };
        let message = err.to_string();
        assert!(message.contains("GET http://registry/foo"));
        assert!(message.contains("connection refused"));
    }
}
