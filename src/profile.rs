// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Profile domain representation.
//!
//! A __profile__ is a named suite of externally managed software, e.g., a Go
//! toolchain or a cross compiler, installed by some __installer__. Each
//! profile can be installed for several compile [`Target`]s at once.
//!
//! # Qualified Names
//!
//! Profile names are only unique within the namespace of their installer.
//! Thus, profiles are identified by their __qualified name__, which is
//! `<installer>:<name>` when the installer is known, or just `<name>` for
//! profiles that were installed without one.

pub mod target;
pub mod version;

pub use target::{format_env_list, parse_env_list, ProfileError, Target};
pub use version::{compare_versions, VersionError, VersionInfo};

/// Separator between installer and profile name in qualified names.
pub const INSTALLER_SEPARATOR: char = ':';

/// Named collection of externally managed software.
///
/// # Invariant
///
/// - Targets are kept in [`Target::sort_order`].
/// - No two targets match each other.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub(crate) name: String,
    pub(crate) installer: String,
    pub(crate) root: String,
    pub(crate) targets: Vec<Target>,
}

impl Profile {
    /// Construct new profile without targets.
    pub fn new(
        installer: impl Into<String>,
        name: impl Into<String>,
        root: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            installer: installer.into(),
            root: root.into(),
            targets: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    pub fn installer(&self) -> &str {
        self.installer.as_str()
    }

    /// Root directory that targets are installed under.
    pub fn root(&self) -> &str {
        self.root.as_str()
    }

    /// Qualified name of profile.
    pub fn qualified_name(&self) -> String {
        qualified_name(&self.installer, &self.name)
    }

    /// Installed targets in sorted order.
    pub fn targets(&self) -> &[Target] {
        self.targets.as_slice()
    }

    /// Find first target that matches given target.
    pub fn find_target(&self, target: &Target) -> Option<&Target> {
        self.targets.iter().find(|installed| installed.matches(target))
    }

    /// Insert target at its sorted position.
    ///
    /// Returns false without inserting if a matching target is already
    /// installed.
    pub(crate) fn insert_target(&mut self, target: Target) -> bool {
        if self.find_target(&target).is_some() {
            return false;
        }

        let position = self
            .targets
            .partition_point(|installed| installed.less(&target));
        self.targets.insert(position, target);
        true
    }

    /// Replace first target that matches given target.
    ///
    /// A replacement without a version keeps the version of the target it
    /// replaces. Returns false if no target matches.
    pub(crate) fn replace_target(&mut self, mut target: Target) -> bool {
        let Some(position) = self
            .targets
            .iter()
            .position(|installed| installed.matches(&target))
        else {
            return false;
        };

        // INVARIANT: Unpinned replacement must not match sibling targets.
        let installed = self.targets.remove(position);
        if target.version.is_empty() {
            target.version = installed.version;
        }

        self.insert_target(target)
    }

    /// Remove first target that matches given target.
    pub(crate) fn remove_target(&mut self, target: &Target) -> Option<Target> {
        let position = self
            .targets
            .iter()
            .position(|installed| installed.matches(target))?;
        Some(self.targets.remove(position))
    }
}

/// Construct qualified profile name.
pub fn qualified_name(installer: &str, name: &str) -> String {
    if installer.is_empty() {
        return name.to_owned();
    }

    format!("{installer}{INSTALLER_SEPARATOR}{name}")
}

/// Split qualified profile name into installer and profile name.
///
/// Unqualified names have an empty installer.
pub fn split_qualified_name(qualified: &str) -> (&str, &str) {
    qualified
        .split_once(INSTALLER_SEPARATOR)
        .unwrap_or(("", qualified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn qualified_names() {
        assert_eq!(qualified_name("jiri", "go"), "jiri:go");
        assert_eq!(qualified_name("", "go"), "go");
        assert_eq!(split_qualified_name("jiri:go"), ("jiri", "go"));
        assert_eq!(split_qualified_name("go"), ("", "go"));
        assert_eq!(Profile::new("jiri", "go", "go").qualified_name(), "jiri:go");
    }

    #[test]
    fn insert_keeps_targets_sorted() {
        let mut profile = Profile::new("", "go", "go");
        for target in [
            Target::with_version("amd64", "linux", "2"),
            Target::with_version("arm", "linux", "1"),
            Target::with_version("amd64", "linux", "12"),
            Target::with_version("amd64", "darwin", "3"),
        ] {
            assert!(profile.insert_target(target));
        }

        let result = profile
            .targets()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        let expect = vec![
            "amd64-darwin@3",
            "amd64-linux@12",
            "amd64-linux@2",
            "arm-linux@1",
        ];
        assert_eq!(result, expect);
    }

    #[test]
    fn insert_rejects_matching_target() {
        let mut profile = Profile::new("", "go", "go");
        assert!(profile.insert_target(Target::with_version("amd64", "linux", "2")));
        assert!(!profile.insert_target(Target::new("amd64", "linux")));
        assert!(!profile.insert_target(Target::with_version("amd64", "linux", "2")));
        assert_eq!(profile.targets().len(), 1);
    }

    #[test]
    fn replace_and_remove_target() {
        let mut profile = Profile::new("", "go", "go");
        profile.insert_target(Target::with_version("amd64", "linux", "2"));

        let mut updated = Target::with_version("amd64", "linux", "2");
        updated.installation_dir = "/opt/go".into();
        assert!(profile.replace_target(updated.clone()));
        assert_eq!(profile.find_target(&Target::new("amd64", "linux")), Some(&updated));
        assert!(!profile.replace_target(Target::new("arm", "linux")));

        assert_eq!(profile.remove_target(&Target::new("arm", "linux")), None);
        assert_eq!(profile.remove_target(&Target::new("amd64", "linux")), Some(updated));
        assert!(profile.targets().is_empty());
    }

    #[test]
    fn replace_without_version_keeps_installed_version() {
        let mut profile = Profile::new("", "go", "go");
        profile.insert_target(Target::with_version("amd64", "linux", "2"));
        profile.insert_target(Target::with_version("amd64", "linux", "1"));

        let mut unpinned = Target::new("amd64", "linux");
        unpinned.installation_dir = "/opt/go".into();
        assert!(profile.replace_target(unpinned));

        let result = profile
            .targets()
            .iter()
            .map(|target| (target.to_string(), target.installation_dir.clone()))
            .collect::<Vec<_>>();
        let expect = vec![
            ("amd64-linux@2".to_owned(), "/opt/go".to_owned()),
            ("amd64-linux@1".to_owned(), "".to_owned()),
        ];
        assert_eq!(result, expect);
    }

    #[test]
    fn replace_pins_unversioned_target_in_sorted_position() {
        let mut profile = Profile::new("", "go", "go");
        profile.insert_target(Target::new("amd64", "linux"));
        profile.insert_target(Target::with_version("arm", "linux", "1"));

        assert!(profile.replace_target(Target::with_version("amd64", "linux", "3")));
        let result = profile
            .targets()
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        assert_eq!(result, vec!["amd64-linux@3", "arm-linux@1"]);
    }
}
