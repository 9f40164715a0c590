pub mod application;
pub mod archive;
pub mod config;
pub mod error;
pub mod http;
pub mod install;
pub mod package;
pub mod registry;
pub mod runtime;

pub use application::{LoadedModule, LoadedPackage, PackageLoader, PackageRequest};
pub use config::Config;
pub use error::{Error, Result};
