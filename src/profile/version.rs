// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Version ordering and version metadata.
//!
//! Versions are free-form strings compared segment by segment on `.`
//! boundaries. Numeric segments compare numerically, anything else compares
//! lexicographically. The empty version means "no version pinned", and is
//! always considered the newest.

use std::{cmp::Ordering, collections::BTreeMap};

/// Compare two version strings.
///
/// Returns [`Ordering::Greater`] if `a` is newer than `b`.
///
/// # Invariant
///
/// - The empty version is greater than any other version.
/// - A version that extends another version is the greater of the two, e.g.,
///   "1.2.1" is greater than "1.2".
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    let mut lhs = a.split('.');
    let mut rhs = b.split('.');
    loop {
        match (lhs.next(), rhs.next()) {
            (Some(x), Some(y)) => match compare_segments(x, y) {
                Ordering::Equal => continue,
                ordering => return ordering,
            },
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (None, None) => return Ordering::Equal,
        }
    }
}

fn compare_segments(x: &str, y: &str) -> Ordering {
    match (x.parse::<u64>(), y.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => x.cmp(y),
    }
}

/// Supported versions of a profile implementation.
///
/// Maps each supported version onto the metadata that a profile
/// implementation needs to install it, e.g., download URLs or checksums. Each
/// implementation picks its own metadata type, so lookups stay typed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo<T> {
    name: String,
    versions: BTreeMap<String, T>,
    ordered: Vec<String>,
    default: String,
}

impl<T> VersionInfo<T> {
    /// Construct new version table.
    ///
    /// # Errors
    ///
    /// - Return [`VersionError::UnsupportedDefault`] if default version is not
    ///   among the supported versions.
    pub fn new(
        name: impl Into<String>,
        supported: impl IntoIterator<Item = (impl Into<String>, T)>,
        default: impl Into<String>,
    ) -> Result<Self> {
        let name = name.into();
        let default = default.into();
        let versions = supported
            .into_iter()
            .map(|(version, data)| (version.into(), data))
            .collect::<BTreeMap<_, _>>();

        if !versions.contains_key(&default) {
            return Err(VersionError::UnsupportedDefault {
                name,
                version: default,
            });
        }

        let mut ordered = versions.keys().cloned().collect::<Vec<_>>();
        ordered.sort_by(|a, b| compare_versions(b, a));

        Ok(Self {
            name,
            versions,
            ordered,
            default,
        })
    }

    /// Name of profile these versions belong to.
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Default version to install when none is requested.
    pub fn default_version(&self) -> &str {
        self.default.as_str()
    }

    /// Supported versions, newest first.
    pub fn supported(&self) -> &[String] {
        self.ordered.as_slice()
    }

    /// Resolve requested version.
    ///
    /// The empty version resolves to the default version.
    ///
    /// # Errors
    ///
    /// - Return [`VersionError::Unsupported`] if version is not supported.
    pub fn select(&self, version: &str) -> Result<&str> {
        if version.is_empty() {
            return Ok(self.default.as_str());
        }

        match self.versions.get_key_value(version) {
            Some((version, _)) => Ok(version.as_str()),
            None => Err(VersionError::Unsupported {
                name: self.name.clone(),
                version: version.into(),
                supported: self.ordered.clone(),
            }),
        }
    }

    /// Lookup metadata of requested version.
    ///
    /// # Errors
    ///
    /// - Return [`VersionError::Unsupported`] if version is not supported.
    pub fn lookup(&self, version: &str) -> Result<&T> {
        let version = self.select(version)?;
        self.versions
            .get(version)
            .ok_or_else(|| VersionError::Unsupported {
                name: self.name.clone(),
                version: version.into(),
                supported: self.ordered.clone(),
            })
    }

    /// Check if version is newer than the default version.
    pub fn is_newer_than_default(&self, version: &str) -> bool {
        compare_versions(version, &self.default) == Ordering::Greater
    }

    /// Check if version is older than the default version.
    pub fn is_older_than_default(&self, version: &str) -> bool {
        compare_versions(version, &self.default) == Ordering::Less
    }
}

/// Version selection error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionError {
    /// Requested version is not supported.
    #[error(
        "unsupported version {version:?} for profile {name:?}, supported versions are {supported:?}"
    )]
    Unsupported {
        name: String,
        version: String,
        supported: Vec<String>,
    },

    /// Default version is not among the supported versions.
    #[error("default version {version:?} for profile {name:?} is not a supported version")]
    UnsupportedDefault { name: String, version: String },
}

/// Friendly result alias :3
pub type Result<T, E = VersionError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    #[test_case("", "", Ordering::Equal; "both empty")]
    #[test_case("", "12", Ordering::Greater; "empty is newest")]
    #[test_case("3", "", Ordering::Less; "pinned is older than empty")]
    #[test_case("12", "3", Ordering::Greater; "numeric segments")]
    #[test_case("2", "11", Ordering::Less; "numeric not lexical")]
    #[test_case("1.2", "1.1", Ordering::Greater; "second segment")]
    #[test_case("1.2.1", "1.2", Ordering::Greater; "more specific wins")]
    #[test_case("1.2", "1.2", Ordering::Equal; "equal")]
    #[test_case("1.b", "1.a", Ordering::Greater; "lexical segments")]
    #[test_case("1.10", "1.9", Ordering::Greater; "multi digit segment")]
    #[test]
    fn compare_version_strings(a: &str, b: &str, expect: Ordering) {
        pretty_assertions::assert_eq!(compare_versions(a, b), expect);
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Release {
        Tarball { url: String },
        Git { revision: String },
    }

    fn go_versions() -> VersionInfo<Release> {
        VersionInfo::new(
            "go",
            [
                ("1.5", Release::Tarball { url: "https://go.dev/go1.5.tgz".into() }),
                ("1.10", Release::Tarball { url: "https://go.dev/go1.10.tgz".into() }),
                ("1.6", Release::Git { revision: "abc123".into() }),
            ],
            "1.6",
        )
        .unwrap()
    }

    #[test]
    fn version_info_select_and_lookup() {
        let info = go_versions();
        assert_eq!(info.supported(), ["1.10", "1.6", "1.5"]);
        assert_eq!(info.select("").unwrap(), "1.6");
        assert_eq!(info.select("1.5").unwrap(), "1.5");
        assert_eq!(
            info.lookup("").unwrap(),
            &Release::Git { revision: "abc123".into() }
        );
        assert_eq!(
            info.lookup("1.10").unwrap(),
            &Release::Tarball { url: "https://go.dev/go1.10.tgz".into() }
        );

        let result = info.select("1.4");
        assert!(matches!(result, Err(VersionError::Unsupported { .. })));
    }

    #[test]
    fn version_info_compare_to_default() {
        let info = go_versions();
        assert!(info.is_newer_than_default("1.10"));
        assert!(info.is_older_than_default("1.5"));
        assert!(!info.is_newer_than_default("1.6"));
        assert!(!info.is_older_than_default("1.6"));
    }

    #[test]
    fn version_info_rejects_unknown_default() {
        let result = VersionInfo::new("go", [("1.5", ())], "1.6");
        assert!(matches!(result, Err(VersionError::UnsupportedDefault { .. })));
    }
}
