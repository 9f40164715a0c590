//! Package management module
//!
//! Layout of the version cache on disk, package manifests, version
//! catalogs and the best-fit version policy.

pub mod catalog;
mod manifest;
mod root;
mod version;

pub use catalog::{Catalog, VersionRecord, read_local, read_remote};
pub use manifest::{ANY_PATTERN, ENTRY_FILE, MANIFEST_FILE, Manifest, engine_pattern};
pub use root::{CORE_DIR, PLUGINS_DIR, PackageKind, PackageRoot, validate_version};
pub use version::{
    AnyVersion, SemverRange, VersionMatcher, VersionResolver, compare, is_prerelease,
};
