//! Application layer - the package loading use case.
//!
//! [`PackageLoader`] turns a [`PackageRequest`] into a [`LoadedPackage`]:
//! resolve the target version from the local cache or the registry,
//! install it through an [`crate::install::Installer`] when missing, then
//! read its manifest and entry file.

mod load;
mod request;

pub use load::{LoadState, PackageLoader};
pub use request::{LoadedModule, LoadedPackage, PackageRequest};
