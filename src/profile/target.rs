// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Compile targets.
//!
//! A __target__ is one compiled or installed instance of a profile, identified
//! by its architecture, operating system, and version. Targets are written
//! as `<arch>-<os>[@<version>]` on the command line, e.g., `amd64-linux` or
//! `arm64-android@1.2`.

use crate::{
    env::{join_key_value, split_key_value},
    profile::version::compare_versions,
};

use chrono::{DateTime, Utc};
use std::{
    cmp::Ordering,
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

/// Compiled code specification of a profile.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub arch: String,
    pub os: String,
    pub version: String,

    /// Environment variables set by the profile implementation.
    pub env: Vec<String>,

    /// Directory the target was installed into.
    pub installation_dir: String,

    /// Time of last addition or update through the profile database.
    pub update_time: Option<DateTime<Utc>>,

    command_line_env: Option<Vec<String>>,
}

impl Target {
    /// Construct new target without a pinned version.
    pub fn new(arch: impl Into<String>, os: impl Into<String>) -> Self {
        Self {
            arch: arch.into(),
            os: os.into(),
            ..Default::default()
        }
    }

    /// Construct new target pinned to a version.
    pub fn with_version(
        arch: impl Into<String>,
        os: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            ..Self::new(arch, os)
        }
    }

    /// Target of the host running this process.
    pub fn native() -> Self {
        Self::new(native_arch(), native_os())
    }

    /// Check if building for this target requires cross compilation.
    pub fn cross_compiling(&self) -> bool {
        self.arch != native_arch() || self.os != native_os()
    }

    /// Check if two targets refer to the same installation.
    ///
    /// Targets match if their architectures and operating systems are equal,
    /// and either of them has no version pinned, or both versions are equal.
    pub fn matches(&self, other: &Target) -> bool {
        self.arch == other.arch
            && self.os == other.os
            && (self.version.is_empty()
                || other.version.is_empty()
                || self.version == other.version)
    }

    /// Ordering of targets within a profile.
    ///
    /// Sort by architecture then operating system ascending, then by version
    /// descending such that newest versions come first.
    pub fn sort_order(&self, other: &Target) -> Ordering {
        self.arch
            .cmp(&other.arch)
            .then_with(|| self.os.cmp(&other.os))
            .then_with(|| compare_versions(&other.version, &self.version))
    }

    /// Check if target sorts strictly before other target.
    pub fn less(&self, other: &Target) -> bool {
        self.sort_order(other) == Ordering::Less
    }

    /// Environment variables given on the command line at installation.
    pub fn command_line_env(&self) -> &[String] {
        self.command_line_env.as_deref().unwrap_or_default()
    }

    /// Set command line environment variables.
    ///
    /// # Errors
    ///
    /// - Return [`ProfileError::CommandLineEnvFrozen`] if command line
    ///   environment was already set.
    pub fn set_command_line_env(
        &mut self,
        vars: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<()> {
        if self.command_line_env.is_some() {
            return Err(ProfileError::CommandLineEnvFrozen {
                target: self.to_string(),
            });
        }

        self.command_line_env = Some(vars.into_iter().map(Into::into).collect());
        Ok(())
    }

    pub(crate) fn restore_command_line_env(&mut self, vars: Option<Vec<String>>) {
        self.command_line_env = vars;
    }

    pub(crate) fn raw_command_line_env(&self) -> Option<&[String]> {
        self.command_line_env.as_deref()
    }
}

impl Display for Target {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}-{}", self.arch, self.os)?;
        if !self.version.is_empty() {
            write!(fmt, "@{}", self.version)?;
        }

        Ok(())
    }
}

impl FromStr for Target {
    type Err = ProfileError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let invalid = || ProfileError::InvalidTarget {
            input: data.into(),
        };

        // INVARIANT: Legacy "<tag>=" prefix is accepted, but discarded.
        let spec = match data.split_once('=') {
            Some((_, spec)) => spec,
            None => data,
        };

        let (arch_os, version) = match spec.split_once('@') {
            Some((arch_os, version)) if !version.is_empty() => (arch_os, version),
            Some(_) => return Err(invalid()),
            None => (spec, ""),
        };

        let (arch, os) = arch_os.split_once('-').ok_or_else(invalid)?;
        if arch.is_empty() || os.is_empty() || os.contains('-') {
            return Err(invalid());
        }

        Ok(Target::with_version(arch, os, version))
    }
}

/// Parse comma separated listing of `KEY=VALUE` environment variables.
///
/// # Errors
///
/// - Return [`ProfileError::InvalidEnvVar`] if an entry has an empty key.
pub fn parse_env_list(data: &str) -> Result<Vec<String>> {
    data.split(',')
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (key, value) = split_key_value(entry);
            if key.is_empty() {
                return Err(ProfileError::InvalidEnvVar {
                    input: entry.into(),
                });
            }
            Ok(join_key_value(key, value))
        })
        .collect()
}

/// Format listing of environment variables as comma separated string.
pub fn format_env_list(vars: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    vars.into_iter()
        .map(|var| var.as_ref().to_owned())
        .collect::<Vec<_>>()
        .join(",")
}

fn native_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "x86" => "386",
        "aarch64" => "arm64",
        arch => arch,
    }
}

fn native_os() -> &'static str {
    match std::env::consts::OS {
        "macos" => "darwin",
        os => os,
    }
}

/// Profile and target error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileError {
    /// Target string is not of the form `<arch>-<os>[@<version>]`.
    #[error("invalid target {input:?}, expected <arch>-<os>[@<version>]")]
    InvalidTarget { input: String },

    /// Environment variable entry lacks a name.
    #[error("invalid environment variable {input:?}, expected KEY=VALUE")]
    InvalidEnvVar { input: String },

    /// Command line environment can only be set once.
    #[error("command line environment of target {target} is already set")]
    CommandLineEnvFrozen { target: String },
}

/// Friendly result alias :3
pub type Result<T, E = ProfileError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use simple_test_case::test_case;

    #[test_case("amd64-linux", Target::new("amd64", "linux"); "no version")]
    #[test_case("arm64-android@1.2", Target::with_version("arm64", "android", "1.2"); "version")]
    #[test_case("tag=386-darwin@3", Target::with_version("386", "darwin", "3"); "legacy tag")]
    #[test]
    fn parse_target(input: &str, expect: Target) {
        let result: Target = input.parse().unwrap();
        pretty_assertions::assert_eq!(result, expect);
    }

    #[test_case(""; "empty")]
    #[test_case("amd64"; "missing os")]
    #[test_case("-linux"; "missing arch")]
    #[test_case("amd64-"; "empty os")]
    #[test_case("amd64-linux@"; "empty version")]
    #[test_case("amd64-linux-gnu"; "extra component")]
    #[test]
    fn parse_invalid_target(input: &str) {
        let result = input.parse::<Target>();
        pretty_assertions::assert_eq!(
            result,
            Err(ProfileError::InvalidTarget {
                input: input.into()
            })
        );
    }

    #[test]
    fn format_target() {
        assert_eq!(Target::new("amd64", "linux").to_string(), "amd64-linux");
        assert_eq!(
            Target::with_version("arm", "android", "4.2").to_string(),
            "arm-android@4.2"
        );
    }

    #[test]
    fn target_matching() {
        let unpinned = Target::new("amd64", "linux");
        let v1 = Target::with_version("amd64", "linux", "1");
        let v2 = Target::with_version("amd64", "linux", "2");
        let darwin = Target::with_version("amd64", "darwin", "1");

        assert!(unpinned.matches(&v1));
        assert!(v1.matches(&unpinned));
        assert!(v1.matches(&v1.clone()));
        assert!(!v1.matches(&v2));
        assert!(!v1.matches(&darwin));
    }

    #[test]
    fn target_sort_order() {
        let mut targets = vec![
            Target::with_version("amd64", "linux", "3"),
            Target::with_version("amd64", "darwin", "1"),
            Target::new("amd64", "linux"),
            Target::with_version("amd64", "linux", "12"),
            Target::with_version("386", "linux", "1"),
            Target::with_version("amd64", "linux", "2"),
        ];
        targets.sort_by(Target::sort_order);

        let result = targets.iter().map(ToString::to_string).collect::<Vec<_>>();
        let expect = vec![
            "386-linux@1",
            "amd64-darwin@1",
            "amd64-linux",
            "amd64-linux@12",
            "amd64-linux@3",
            "amd64-linux@2",
        ];
        assert_eq!(result, expect);
        assert!(Target::with_version("amd64", "linux", "1.2").less(&Target::with_version(
            "amd64", "linux", "1.1"
        )));
    }

    #[test]
    fn command_line_env_is_set_once() {
        let mut target = Target::new("amd64", "linux");
        assert_eq!(target.command_line_env(), &[] as &[String]);

        target.set_command_line_env(["CC=clang"]).unwrap();
        assert_eq!(target.command_line_env(), ["CC=clang"]);

        let result = target.set_command_line_env(["CC=gcc"]);
        assert_eq!(
            result,
            Err(ProfileError::CommandLineEnvFrozen {
                target: "amd64-linux".into()
            })
        );
        assert_eq!(target.command_line_env(), ["CC=clang"]);
    }

    #[test]
    fn native_target_is_not_cross_compiling() {
        let native = Target::native();
        assert!(!native.cross_compiling());
        assert_eq!(native.version, "");

        let mut other = native.clone();
        other.os = "fuchsia-not-a-host".into();
        assert!(other.cross_compiling());
    }

    #[test]
    fn env_list_round_trip() {
        let vars = parse_env_list("CC=clang,CFLAGS=-O2 -g,EMPTY=").unwrap();
        assert_eq!(vars, vec!["CC=clang", "CFLAGS=-O2 -g", "EMPTY="]);
        assert_eq!(format_env_list(&vars), "CC=clang,CFLAGS=-O2 -g,EMPTY=");

        let result = parse_env_list("=oops");
        assert_eq!(
            result,
            Err(ProfileError::InvalidEnvVar {
                input: "=oops".into()
            })
        );
    }
}
