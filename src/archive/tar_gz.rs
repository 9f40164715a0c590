use anyhow::{Context, Result, bail};
use flate2::read::GzDecoder;
use log::debug;
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};

use crate::runtime::Runtime;

/// Extractor for gzip-compressed tarballs as published by registries.
///
/// Registry tarballs wrap the package in one top-level directory
/// (usually `package/`). That directory is stripped, so the package tree
/// lands directly in the destination.
///
/// Only directories and regular files are unpacked. Symbolic and hard
/// links are skipped, and nothing is written through a link that already
/// exists below the destination.
pub struct TarGzExtractor;

impl TarGzExtractor {
    #[tracing::instrument(skip(self, runtime))]
    pub fn extract<R: Runtime>(&self, runtime: &R, archive_path: &Path, extract_to: &Path) -> Result<u64> {
        debug!("Extracting {:?} to {:?}...", archive_path, extract_to);
        let file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;
        let mut archive = Archive::new(GzDecoder::new(file));

        runtime.create_dir_all(extract_to)?;

        let mut extracted = 0;
        for entry in archive.entries().context("Failed to read tar entries")? {
            let mut entry = entry.context("Failed to read tar entry")?;
            let entry_path = entry.path().context("Invalid entry path")?.into_owned();

            let Some(relative) = strip_top_level(&entry_path)? else {
                continue;
            };
            let target = extract_to.join(&relative);
            let entry_type = entry.header().entry_type();

            if matches!(entry_type, EntryType::Symlink | EntryType::Link) {
                debug!("Skipping link entry {:?}", entry_path);
                continue;
            }
            ensure_no_links(runtime, extract_to, &relative)?;

            match entry_type {
                EntryType::Directory => runtime.create_dir_all(&target)?,
                EntryType::Regular | EntryType::Continuous => {
                    if let Some(parent) = target.parent() {
                        runtime.create_dir_all(parent)?;
                    }
                    let mut dest_file = runtime.create_file(&target)?;
                    std::io::copy(&mut entry, &mut dest_file)
                        .with_context(|| format!("Failed to extract file {:?}", target))?;

                    #[cfg(unix)]
                    if let Ok(mode) = entry.header().mode()
                        && let Err(e) = runtime.set_permissions(&target, mode)
                    {
                        debug!("Failed to set permissions on {:?}: {}", target, e);
                    }
                    extracted += 1;
                }
                other => debug!("Skipping {:?} entry {:?}", other, entry_path),
            }
        }

        debug!("Extracted {} files", extracted);
        Ok(extracted)
    }
}

/// Fail if any path between `root` and `root/relative` is a symbolic link.
fn ensure_no_links<R: Runtime>(runtime: &R, root: &Path, relative: &Path) -> Result<()> {
    let mut current = root.to_path_buf();
    for component in relative.components() {
        current.push(component);
        if runtime.is_symlink(&current) {
            bail!("Refusing to extract through symbolic link {:?}", current);
        }
    }
    Ok(())
}

/// Drop the first path component. Returns `None` for the top-level
/// directory itself and rejects paths escaping the destination.
fn strip_top_level(path: &Path) -> Result<Option<PathBuf>> {
    let mut components = path.components();
    components.next();

    let mut relative = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => bail!("Refusing to extract unsafe path {:?}", path),
        }
    }

    if relative.as_os_str().is_empty() {
        Ok(None)
    } else {
        Ok(Some(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::RealRuntime;
    use crate::test_utils::create_tar_gz;
    use std::fs;
    use tempfile::tempdir;

    /// Tarball with a `package/evil` link to `link_target`, then a file
    /// that would land behind the link.
    fn tar_gz_with_link(entry_type: tar::EntryType, link_target: &Path) -> Vec<u8> {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));

        let mut header = tar::Header::new_gnu();
        header.set_entry_type(entry_type);
        header.set_size(0);
        header.set_mode(0o777);
        builder
            .append_link(&mut header, "package/evil", link_target)
            .unwrap();

        let contents = b"pwned";
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder
            .append_data(&mut header, "package/evil/pwned.js", &contents[..])
            .unwrap();

        builder.into_inner().unwrap().finish().unwrap()
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_never_writes_through_symlink_entries() -> Result<()> {
        let dir = tempdir()?;
        let outside = dir.path().join("outside");
        fs::create_dir_all(&outside)?;
        let archive_path = dir.path().join("evil.tgz");
        fs::write(&archive_path, tar_gz_with_link(tar::EntryType::Symlink, &outside))?;

        let extract_path = dir.path().join("staging/package");
        let _ = TarGzExtractor.extract(&RealRuntime, &archive_path, &extract_path);

        assert!(!outside.join("pwned.js").exists());
        assert!(!extract_path.join("evil").is_symlink());
        Ok(())
    }

    #[test]
    fn test_extract_skips_hard_links() -> Result<()> {
        let dir = tempdir()?;
        let secret = dir.path().join("secret.txt");
        fs::write(&secret, "host file")?;
        let archive_path = dir.path().join("hardlink.tgz");
        fs::write(&archive_path, tar_gz_with_link(tar::EntryType::Link, &secret))?;

        let extract_path = dir.path().join("staging/package");
        TarGzExtractor.extract(&RealRuntime, &archive_path, &extract_path)?;

        assert_eq!(
            fs::read_to_string(extract_path.join("evil/pwned.js"))?,
            "pwned"
        );
        assert_eq!(fs::read_to_string(&secret)?, "host file");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_refuses_existing_symlink_in_destination() -> Result<()> {
        let dir = tempdir()?;
        let outside = dir.path().join("outside");
        fs::create_dir_all(&outside)?;
        let extract_path = dir.path().join("out");
        fs::create_dir_all(&extract_path)?;
        std::os::unix::fs::symlink(&outside, extract_path.join("lib"))?;

        let archive_path = dir.path().join("foo.tgz");
        fs::write(
            &archive_path,
            create_tar_gz(&[("package/lib/util.js", "util")]),
        )?;

        let err = TarGzExtractor
            .extract(&RealRuntime, &archive_path, &extract_path)
            .unwrap_err();

        assert!(err.to_string().contains("symbolic link"));
        assert!(!outside.join("util.js").exists());
        Ok(())
    }

    #[test]
    fn test_extract_strips_package_dir() -> Result<()> {
        let dir = tempdir()?;
        let archive_path = dir.path().join("foo.tgz");
        fs::write(
            &archive_path,
            create_tar_gz(&[
                ("package/package.json", r#"{"version":"1.0.0"}"#),
                ("package/index.js", "module.exports = {};"),
                ("package/lib/util.js", "util"),
            ]),
        )?;

        let extract_path = dir.path().join("out");
        let count = TarGzExtractor.extract(&RealRuntime, &archive_path, &extract_path)?;

        assert_eq!(count, 3);
        assert_eq!(
            fs::read_to_string(extract_path.join("index.js"))?,
            "module.exports = {};"
        );
        assert_eq!(fs::read_to_string(extract_path.join("lib/util.js"))?, "util");
        assert!(!extract_path.join("package").exists());
        Ok(())
    }

    #[test]
    fn test_extract_invalid_archive_fails() -> Result<()> {
        let dir = tempdir()?;
        let archive_path = dir.path().join("broken.tgz");
        fs::write(&archive_path, b"definitely not gzip")?;

        let result = TarGzExtractor.extract(&RealRuntime, &archive_path, &dir.path().join("out"));
        assert!(result.is_err());
        Ok(())
    }

    #[test]
    fn test_strip_top_level() {
        assert_eq!(strip_top_level(Path::new("package")).unwrap(), None);
        assert_eq!(
            strip_top_level(Path::new("package/a/b.js")).unwrap(),
            Some(PathBuf::from("a/b.js"))
        );
        assert!(strip_top_level(Path::new("package/../../etc/passwd")).is_err());
    }
}
