#![allow(dead_code)]

use flate2::Compression;
use flate2::write::GzEncoder;
use std::io::prelude::*;
use std::path::Path;
use tar::Builder;

/// Registry-style tarball: every file under a top-level `package/`.
pub fn create_package_tgz(files: &[(&str, &str)]) -> Vec<u8> {
    let mut tar_builder = Builder::new(Vec::new());
    for (name, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_path(format!("package/{}", name)).unwrap();
        header.set_mode(0o644);
        header.set_cksum();
        tar_builder.append(&header, content.as_bytes()).unwrap();
    }
    let tar = tar_builder.into_inner().unwrap();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&tar).unwrap();
    encoder.finish().unwrap()
}

pub fn manifest(version: &str, pattern: Option<&str>) -> String {
    let mut manifest = serde_json::json!({ "name": "fixture", "version": version });
    if let Some(pattern) = pattern {
        manifest["engines"] = serde_json::json!({ "svrx": pattern });
    }
    manifest.to_string()
}

/// Package document listing `(version, pattern)` pairs, each with a tarball
/// under `<url>/tarballs/<version>.tgz`.
pub fn packument(url: &str, latest: &str, versions: &[(&str, Option<&str>)]) -> String {
    let mut entries = serde_json::Map::new();
    for (version, pattern) in versions {
        let mut meta = serde_json::json!({
            "version": version,
            "dist": { "tarball": format!("{}/tarballs/{}.tgz", url, version) }
        });
        if let Some(pattern) = pattern {
            meta["engines"] = serde_json::json!({ "svrx": pattern });
        }
        entries.insert(version.to_string(), meta);
    }
    serde_json::json!({
        "dist-tags": { "latest": latest },
        "versions": entries
    })
    .to_string()
}

pub fn write_package_tree(dir: &Path, version: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join("package.json"), manifest(version, None)).unwrap();
    std::fs::write(dir.join("index.js"), "module.exports = {};").unwrap();
}
