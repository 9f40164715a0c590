//! Archive extraction for registry tarballs.

mod tar_gz;

pub use tar_gz::TarGzExtractor;
