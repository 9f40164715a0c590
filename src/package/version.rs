//! Version ordering, compatibility matching and best-fit resolution.
//!
//! Everything here is pure: no I/O, no caching.

use log::debug;
use semver::{Version, VersionReq};
use std::cmp::Ordering;

use super::catalog::Catalog;

/// Returns true when the version carries a pre-release tag.
pub fn is_prerelease(version: &Version) -> bool {
    !version.pre.is_empty()
}

/// Total order over versions where any stable version outranks any
/// pre-release, and semver precedence orders versions on the same side.
pub fn compare(a: &Version, b: &Version) -> Ordering {
    match (is_prerelease(a), is_prerelease(b)) {
        (false, true) => Ordering::Greater,
        (true, false) => Ordering::Less,
        _ => a.cmp(b),
    }
}

/// Policy deciding whether `version` satisfies the range `pattern`.
///
/// Implementations must be pure functions of their two arguments.
pub trait VersionMatcher: Send + Sync {
    fn matches(&self, version: &str, pattern: &str) -> bool;
}

/// Accepts every version for every pattern.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyVersion;

impl VersionMatcher for AnyVersion {
    fn matches(&self, _version: &str, _pattern: &str) -> bool {
        true
    }
}

/// Enforces npm-style ranges such as `>=1.0.0 <2.0.0 || ^3.0.0`.
///
/// Versions or patterns that cannot be parsed never match.
#[derive(Debug, Clone, Copy, Default)]
pub struct SemverRange;

impl VersionMatcher for SemverRange {
    fn matches(&self, version: &str, pattern: &str) -> bool {
        let Ok(version) = Version::parse(version.trim().trim_start_matches('v')) else {
            debug!("Cannot match unparseable version {:?}", version);
            return false;
        };

        pattern.split("||").any(|alternative| {
            match to_version_req(alternative) {
                Some(req) => req.matches(&version),
                None => {
                    debug!("Ignoring unparseable range {:?}", alternative);
                    false
                }
            }
        })
    }
}

/// Translate one npm range alternative into a [`VersionReq`].
///
/// npm separates comparators with spaces and treats a bare version as an
/// exact match, while `semver` expects commas and treats a bare version as
/// a caret requirement.
fn to_version_req(range: &str) -> Option<VersionReq> {
    let tokens: Vec<&str> = range.split_whitespace().collect();
    if tokens.is_empty() {
        return Some(VersionReq::STAR);
    }

    // Hyphen range: "1.2.3 - 2.3.4"
    if let [low, "-", high] = tokens.as_slice() {
        return VersionReq::parse(&format!(">={}, <={}", low, high)).ok();
    }

    let mut comparators = Vec::new();
    let mut pending_op: Option<&str> = None;
    for token in tokens {
        if token.chars().all(|c| OPERATOR_CHARS.contains(&c)) {
            // Operator written apart from its version: ">= 1.0.0"
            pending_op = Some(token);
            continue;
        }
        let token = match pending_op.take() {
            Some(op) => format!("{}{}", op, token),
            None => token.to_string(),
        };
        if let Some(comparator) = normalize_comparator(&token) {
            comparators.push(comparator);
        }
    }
    if pending_op.is_some() {
        return None;
    }
    if comparators.is_empty() {
        return Some(VersionReq::STAR);
    }

    VersionReq::parse(&comparators.join(", ")).ok()
}

const OPERATOR_CHARS: [char; 5] = ['<', '>', '=', '^', '~'];

/// Returns `None` for a comparator that accepts everything.
fn normalize_comparator(token: &str) -> Option<String> {
    let rest = token.trim_start_matches(OPERATOR_CHARS);
    let op = &token[..token.len() - rest.len()];
    let rest = rest.trim_start_matches('v');

    if matches!(rest, "*" | "x" | "X") {
        return None;
    }

    let numeric = rest.split(['-', '+']).next().unwrap_or(rest);
    let is_wildcard = numeric.split('.').any(|part| matches!(part, "*" | "x" | "X"));
    if op.is_empty() && !is_wildcard {
        Some(format!("={}", rest))
    } else {
        Some(format!("{}{}", op, rest))
    }
}

/// Version resolver - pure functions for version resolution.
pub struct VersionResolver;

impl VersionResolver {
    /// Pick the best version of a catalog for the given core version.
    ///
    /// Records whose compatibility pattern rejects `core_version` are
    /// dropped. Among the survivors the highest stable version wins; the
    /// highest pre-release is only chosen when no stable version is left.
    pub fn best_fit<'a>(
        catalog: &'a Catalog,
        core_version: &str,
        matcher: &dyn VersionMatcher,
    ) -> Option<&'a Version> {
        let (stable, prerelease): (Vec<&Version>, Vec<&Version>) = catalog
            .iter()
            .filter(|record| matcher.matches(core_version, &record.compatibility))
            .map(|record| &record.version)
            .partition(|version| !is_prerelease(version));

        stable
            .into_iter()
            .max_by(|a, b| compare(a, b))
            .or_else(|| prerelease.into_iter().max_by(|a, b| compare(a, b)))
    }
}
