// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the configuration file that the profile tooling
//! reads its defaults from. File I/O is left to the caller to figure out.

use crate::merge::MergePolicies;

use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Profile tooling configuration layout.
///
/// # General Layout
///
/// The configuration file only has a settings section for now. It names the
/// profile database to use, the installer to write profiles for, and the
/// merge policies to apply when combining profile environments.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ProfilesConfig {
    /// Settings for the profile tooling.
    #[serde(default)]
    pub settings: ProfilesSettings,
}

impl FromStr for ProfilesConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: ProfilesConfig =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on database path field.
        if let Some(database) = config.settings.database.take() {
            config.settings.database = Some(DatabasePath::new(
                shellexpand::full(database.to_string().as_str())
                    .map_err(ConfigError::ShellExpansion)?
                    .into_owned(),
            ));
        }

        Ok(config)
    }
}

impl Display for ProfilesConfig {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Profile tooling settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ProfilesSettings {
    /// Profile database file or directory.
    pub database: Option<DatabasePath>,

    /// Installer whose profiles are written back to the database.
    pub installer: Option<String>,

    /// Merge policies for profile environments.
    pub merge_policies: Option<MergePolicies>,
}

/// Path to profile database file or directory.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct DatabasePath(PathBuf);

impl DatabasePath {
    /// Construct new database path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Treat database path as [`Path`] slice.
    pub fn as_path(&self) -> &Path {
        self.0.as_path()
    }
}

impl Display for DatabasePath {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_path().to_string_lossy().as_ref())
    }
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::MergePolicy;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use sealed_test::prelude::*;

    #[sealed_test(env = [("BLAH", "/home/blah")])]
    fn deserialize_profiles_config() -> anyhow::Result<()> {
        let result: ProfilesConfig = r#"
            [settings]
            database = "$BLAH/profiles-db"
            installer = "v23"
            merge_policies = ":PATH,CFLAGS+,GOOS^"
        "#
        .parse()?;

        let expect = ProfilesConfig {
            settings: ProfilesSettings {
                database: Some(DatabasePath::new("/home/blah/profiles-db")),
                installer: Some("v23".into()),
                merge_policies: Some(
                    [
                        ("PATH", MergePolicy::APPEND_PATH),
                        ("CFLAGS", MergePolicy::PREPEND_FLAG),
                        ("GOOS", MergePolicy::UseBaseIgnoreProfiles),
                    ]
                    .into_iter()
                    .collect(),
                ),
            },
        };

        assert_eq!(result, expect);

        Ok(())
    }

    #[test]
    fn deserialize_empty_config() -> anyhow::Result<()> {
        let result: ProfilesConfig = "".parse()?;
        assert_eq!(result, ProfilesConfig::default());

        Ok(())
    }

    #[test]
    fn deserialize_invalid_merge_policies() {
        let result = r#"
            [settings]
            merge_policies = "A:*"
        "#
        .parse::<ProfilesConfig>();
        assert!(matches!(result, Err(ConfigError::Deserialize(_))));
    }

    #[test]
    fn serialize_profiles_config() {
        let result = ProfilesConfig {
            settings: ProfilesSettings {
                database: Some(DatabasePath::new("/home/blah/profiles-db")),
                installer: Some("v23".into()),
                merge_policies: Some("^:PATH,-TMP".parse().unwrap()),
            },
        }
        .to_string();

        let expect = indoc! {r#"
            [settings]
            database = "/home/blah/profiles-db"
            installer = "v23"
            merge_policies = "^:PATH,-TMP"
        "#};

        assert_eq!(result, expect);
    }
}
