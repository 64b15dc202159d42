// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine default locations of the files that the profile tooling reads
//! and writes when the user does not name them explicitly.

use std::path::PathBuf;

/// Determine default absolute path to profile database directory.
///
/// Uses XDG Base Directory path `$XDG_DATA_HOME/profiles-db` as the default
/// absolute path for the profile database. Does not check if the path
/// returned actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if data directory path cannot be determined.
///
/// # See Also
///
/// - [XDG Base Directory](https://wiki.archlinux.org/title/XDG_Base_Directory)
pub fn default_database_dir() -> Result<PathBuf> {
    dirs::data_dir()
        .map(|path| path.join("profiles-db"))
        .ok_or(NoWayHome)
}

/// Determine default absolute path to configuration file.
///
/// Uses `$XDG_CONFIG_HOME/profiles.toml`. Does not check if the path returned
/// actually exists.
///
/// # Errors
///
/// - Return [`NoWayHome`] if configuration directory path cannot be
///   determined.
pub fn default_config_file() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|path| path.join("profiles.toml"))
        .ok_or(NoWayHome)
}

/// No way to determine user's home directory.
///
/// # See Also
///
/// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
#[derive(Clone, Debug, thiserror::Error)]
#[error("cannot determine absolute path to user's home directory")]
pub struct NoWayHome;

/// Friendly result alias :3
pub type Result<T, E = NoWayHome> = std::result::Result<T, E>;
