// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Environment merging.
//!
//! Several profiles can contribute values for the same environment variable,
//! e.g., two toolchains both extending `PATH`. A __merge policy__ decides how
//! the values of one variable are combined across an ordered list of
//! profile environments, and an inherited __base__ environment.
//!
//! # Merge Policy Grammar
//!
//! Merge policies are configured as a comma separated listing of variable
//! names, where markers around each name select the policy:
//!
//! | Entry    | Policy                                  |
//! |----------|-----------------------------------------|
//! | `^:VAR`  | ignore base, append with `:`            |
//! | `^+VAR`  | ignore base, append with space          |
//! | `-VAR`   | ignore variable entirely                |
//! | `:VAR`   | append with `:`                         |
//! | `+VAR`   | append with space                       |
//! | `VAR:`   | prepend with `:`                        |
//! | `VAR+`   | prepend with space                      |
//! | `VAR*`   | use last value                          |
//! | `VAR^`   | use base value, ignore profiles         |
//! | `^VAR:`  | ignore base, prepend with `:`           |
//! | `^VAR+`  | ignore base, prepend with space         |
//! | `^VAR*`  | ignore base, use last value             |
//! | `^VAR`   | ignore base, use first value            |
//! | `VAR`    | use first value                         |
//!
//! Variables without a policy use their first value.

use crate::{
    database::ProfileDatabase,
    env::{split_key_value, split_tokens, EnvVars, FLAG_SEPARATOR, PATH_SEPARATOR},
    profile::{split_qualified_name, Target},
};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};
use tracing::{debug, trace};

/// Token separator used by appending and prepending policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Separator {
    /// Path-like variables separated by `:`.
    Path,

    /// Flag-like variables separated by a space.
    Flag,
}

impl Separator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => PATH_SEPARATOR,
            Self::Flag => FLAG_SEPARATOR,
        }
    }

    fn marker(&self) -> char {
        match self {
            Self::Path => ':',
            Self::Flag => '+',
        }
    }

    fn from_marker(marker: char) -> Option<Self> {
        match marker {
            ':' => Some(Self::Path),
            '+' => Some(Self::Flag),
            _ => None,
        }
    }
}

/// Action of a merge policy, independent of separator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergeAction {
    UseFirst,
    UseLast,
    Ignore,
    Append,
    Prepend,
    IgnoreBaseAppend,
    IgnoreBasePrepend,
    IgnoreBaseUseFirst,
    IgnoreBaseUseLast,
    UseBaseIgnoreProfiles,
}

/// How values of one environment variable are combined.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MergePolicy {
    /// Keep first value seen, base included.
    #[default]
    UseFirst,

    /// Keep last value seen.
    UseLast,

    /// Drop variable from base and profiles.
    Ignore,

    /// Append profile tokens after current tokens.
    Append(Separator),

    /// Prepend profile tokens before current tokens.
    Prepend(Separator),

    /// Drop base value, then append profile tokens.
    IgnoreBaseAppend(Separator),

    /// Drop base value, then prepend profile tokens.
    IgnoreBasePrepend(Separator),

    /// Drop base value, then keep first profile value.
    IgnoreBaseUseFirst,

    /// Drop base value, then keep last profile value.
    IgnoreBaseUseLast,

    /// Keep base value, and ignore profile values.
    UseBaseIgnoreProfiles,
}

impl MergePolicy {
    pub const APPEND_PATH: Self = Self::Append(Separator::Path);
    pub const APPEND_FLAG: Self = Self::Append(Separator::Flag);
    pub const PREPEND_PATH: Self = Self::Prepend(Separator::Path);
    pub const PREPEND_FLAG: Self = Self::Prepend(Separator::Flag);
    pub const IGNORE_BASE_APPEND_PATH: Self = Self::IgnoreBaseAppend(Separator::Path);
    pub const IGNORE_BASE_APPEND_FLAG: Self = Self::IgnoreBaseAppend(Separator::Flag);
    pub const IGNORE_BASE_PREPEND_PATH: Self = Self::IgnoreBasePrepend(Separator::Path);
    pub const IGNORE_BASE_PREPEND_FLAG: Self = Self::IgnoreBasePrepend(Separator::Flag);

    pub fn action(&self) -> MergeAction {
        match self {
            Self::UseFirst => MergeAction::UseFirst,
            Self::UseLast => MergeAction::UseLast,
            Self::Ignore => MergeAction::Ignore,
            Self::Append(_) => MergeAction::Append,
            Self::Prepend(_) => MergeAction::Prepend,
            Self::IgnoreBaseAppend(_) => MergeAction::IgnoreBaseAppend,
            Self::IgnoreBasePrepend(_) => MergeAction::IgnoreBasePrepend,
            Self::IgnoreBaseUseFirst => MergeAction::IgnoreBaseUseFirst,
            Self::IgnoreBaseUseLast => MergeAction::IgnoreBaseUseLast,
            Self::UseBaseIgnoreProfiles => MergeAction::UseBaseIgnoreProfiles,
        }
    }

    /// Separator of appending or prepending policies.
    pub fn separator(&self) -> Option<Separator> {
        match self {
            Self::Append(sep)
            | Self::Prepend(sep)
            | Self::IgnoreBaseAppend(sep)
            | Self::IgnoreBasePrepend(sep) => Some(*sep),
            _ => None,
        }
    }

    /// Check if base value of variable must be discarded before merging.
    pub fn ignores_base(&self) -> bool {
        matches!(
            self,
            Self::Ignore
                | Self::IgnoreBaseAppend(_)
                | Self::IgnoreBasePrepend(_)
                | Self::IgnoreBaseUseFirst
                | Self::IgnoreBaseUseLast
        )
    }

    /// Fold applied to profile values once base handling is done.
    fn fold(&self) -> Fold {
        match *self {
            Self::Ignore | Self::UseBaseIgnoreProfiles => Fold::Skip,
            Self::Append(sep) | Self::IgnoreBaseAppend(sep) => Fold::Append(sep),
            Self::Prepend(sep) | Self::IgnoreBasePrepend(sep) => Fold::Prepend(sep),
            Self::UseFirst | Self::IgnoreBaseUseFirst => Fold::First,
            Self::UseLast | Self::IgnoreBaseUseLast => Fold::Last,
        }
    }

    fn format_entry(&self, name: &str) -> String {
        match self {
            Self::UseFirst => name.to_owned(),
            Self::UseLast => format!("{name}*"),
            Self::Ignore => format!("-{name}"),
            Self::Append(sep) => format!("{}{name}", sep.marker()),
            Self::Prepend(sep) => format!("{name}{}", sep.marker()),
            Self::IgnoreBaseAppend(sep) => format!("^{}{name}", sep.marker()),
            Self::IgnoreBasePrepend(sep) => format!("^{name}{}", sep.marker()),
            Self::IgnoreBaseUseFirst => format!("^{name}"),
            Self::IgnoreBaseUseLast => format!("^{name}*"),
            Self::UseBaseIgnoreProfiles => format!("{name}^"),
        }
    }

    fn parse_entry(entry: &str) -> Result<(String, Self)> {
        let invalid = || MergeError::InvalidEntry {
            entry: entry.into(),
        };

        let mut chars = entry.chars();
        let first = chars.next().ok_or_else(invalid)?;
        let second = chars.next();
        let last = entry.chars().next_back().ok_or_else(invalid)?;

        let (name, policy) = match (first, second) {
            ('^', Some(marker @ (':' | '+'))) => (
                &entry[2..],
                Self::IgnoreBaseAppend(Separator::from_marker(marker).ok_or_else(invalid)?),
            ),
            ('-', _) => (&entry[1..], Self::Ignore),
            (marker @ (':' | '+'), _) => (
                &entry[1..],
                Self::Append(Separator::from_marker(marker).ok_or_else(invalid)?),
            ),
            ('^', _) => {
                let rest = &entry[1..];
                match rest.chars().next_back() {
                    Some(marker @ (':' | '+')) => {
                        let separator = Separator::from_marker(marker).ok_or_else(invalid)?;
                        (&rest[..rest.len() - 1], Self::IgnoreBasePrepend(separator))
                    }
                    Some('*') => (&rest[..rest.len() - 1], Self::IgnoreBaseUseLast),
                    _ => (rest, Self::IgnoreBaseUseFirst),
                }
            }
            _ => match last {
                ':' | '+' => (
                    &entry[..entry.len() - 1],
                    Self::Prepend(Separator::from_marker(last).ok_or_else(invalid)?),
                ),
                '*' => (&entry[..entry.len() - 1], Self::UseLast),
                '^' => (&entry[..entry.len() - 1], Self::UseBaseIgnoreProfiles),
                _ => (entry, Self::UseFirst),
            },
        };

        // INVARIANT: Variable names never carry leftover policy markers.
        if name.is_empty() || name.contains(['^', '-', ':', '+', '*', '=']) {
            return Err(invalid());
        }

        Ok((name.to_owned(), policy))
    }
}

enum Fold {
    Skip,
    Append(Separator),
    Prepend(Separator),
    First,
    Last,
}

/// Merge policies keyed by environment variable name.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct MergePolicies {
    policies: BTreeMap<String, MergePolicy>,
}

impl MergePolicies {
    /// Construct new empty policy table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Policy of variable, defaulting to [`MergePolicy::UseFirst`].
    pub fn get(&self, name: impl AsRef<str>) -> MergePolicy {
        self.policies
            .get(name.as_ref())
            .copied()
            .unwrap_or_default()
    }

    /// Set policy of variable, returning its previous policy.
    pub fn insert(&mut self, name: impl Into<String>, policy: MergePolicy) -> Option<MergePolicy> {
        self.policies.insert(name.into(), policy)
    }

    pub fn remove(&mut self, name: impl AsRef<str>) -> Option<MergePolicy> {
        self.policies.remove(name.as_ref())
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Iterate through policies ordered by variable name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, MergePolicy)> {
        self.policies
            .iter()
            .map(|(name, policy)| (name.as_str(), *policy))
    }

    /// Override policies with policies from another table.
    pub fn extend(&mut self, other: MergePolicies) {
        self.policies.extend(other.policies);
    }
}

impl<K> FromIterator<(K, MergePolicy)> for MergePolicies
where
    K: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, MergePolicy)>>(iter: I) -> Self {
        Self {
            policies: iter
                .into_iter()
                .map(|(name, policy)| (name.into(), policy))
                .collect(),
        }
    }
}

impl Display for MergePolicies {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        let entries = self
            .iter()
            .map(|(name, policy)| policy.format_entry(name))
            .collect::<Vec<_>>();
        fmt.write_str(entries.join(",").as_str())
    }
}

impl FromStr for MergePolicies {
    type Err = MergeError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        if data.is_empty() {
            return Err(MergeError::Empty);
        }

        let mut policies = MergePolicies::new();
        for entry in data.split(',') {
            let (name, policy) = MergePolicy::parse_entry(entry)?;
            policies.insert(name, policy);
        }

        Ok(policies)
    }
}

impl Serialize for MergePolicies {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.to_string().as_str())
    }
}

impl<'de> Deserialize<'de> for MergePolicies {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let data = String::deserialize(deserializer)?;
        data.parse().map_err(serde::de::Error::custom)
    }
}

/// Stock merge policies for toolchain profiles.
pub fn default_merge_policies() -> MergePolicies {
    [
        ("PATH", MergePolicy::PREPEND_PATH),
        ("GOPATH", MergePolicy::PREPEND_PATH),
        ("VDLPATH", MergePolicy::PREPEND_PATH),
        ("CFLAGS", MergePolicy::APPEND_FLAG),
        ("CCFLAGS", MergePolicy::APPEND_FLAG),
        ("CXXFLAGS", MergePolicy::APPEND_FLAG),
        ("LDFLAGS", MergePolicy::APPEND_FLAG),
        ("CGO_CFLAGS", MergePolicy::APPEND_FLAG),
        ("CGO_CXXFLAGS", MergePolicy::APPEND_FLAG),
        ("CGO_LDFLAGS", MergePolicy::APPEND_FLAG),
        ("GOARCH", MergePolicy::UseBaseIgnoreProfiles),
        ("GOOS", MergePolicy::UseBaseIgnoreProfiles),
    ]
    .into_iter()
    .collect()
}

/// Merge ordered listing of environment sources into base environment.
///
/// Base values of variables whose policy ignores the base are removed first.
/// Then each `KEY=VALUE` entry of each source is folded into the base in
/// order according to the policy of its variable.
pub fn merge_env(
    policies: &MergePolicies,
    base: &mut EnvVars,
    sources: impl IntoIterator<Item = impl IntoIterator<Item = impl AsRef<str>>>,
) {
    for name in base.names() {
        if policies.get(&name).ignores_base() {
            trace!("drop base value of {name}");
            base.delete(&name);
        }
    }

    for source in sources {
        for var in source {
            let (key, value) = split_key_value(var.as_ref());
            match policies.get(key).fold() {
                Fold::Skip => continue,
                Fold::Append(sep) => {
                    let mut tokens = base.tokens(key, sep.as_str());
                    tokens.extend(split_tokens(value, sep.as_str()));
                    base.set_tokens(key, tokens, sep.as_str());
                }
                Fold::Prepend(sep) => {
                    let mut tokens = split_tokens(value, sep.as_str());
                    tokens.extend(base.tokens(key, sep.as_str()));
                    base.set_tokens(key, tokens, sep.as_str());
                }
                Fold::First => {
                    if !base.contains(key) {
                        base.set(key, value);
                    }
                }
                Fold::Last => base.set(key, value),
            }
        }
    }
}

/// Merge environments of profiles installed for a target into base.
///
/// Profiles are merged in the order given. Profiles that are not installed,
/// or lack a matching target, contribute nothing.
pub fn merge_env_from_profiles(
    policies: &MergePolicies,
    base: &mut EnvVars,
    db: &ProfileDatabase,
    qualified_names: impl IntoIterator<Item = impl AsRef<str>>,
    target: &Target,
) {
    let mut sources = Vec::new();
    for qualified in qualified_names {
        let (installer, name) = split_qualified_name(qualified.as_ref());
        match db.lookup_profile_target(installer, name, target) {
            Some(installed) => sources.push(installed.env),
            None => debug!("no target {target} installed for {}", qualified.as_ref()),
        }
    }

    merge_env(policies, base, sources);
}

/// Merge policy error types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// Merge policy listing is empty.
    #[error("empty merge policy listing")]
    Empty,

    /// Merge policy entry cannot be parsed.
    #[error("invalid merge policy entry {entry:?}")]
    InvalidEntry { entry: String },
}

/// Friendly result alias :3
pub type Result<T, E = MergeError> = std::result::Result<T, E>;
