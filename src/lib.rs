// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Profile database and environment merging for externally managed software.
//!
//! A __profile__ is a suite of external software, e.g., a toolchain, that is
//! installed for one or more compile targets. The [`ProfileDatabase`] keeps
//! track of what is installed where, and persists that record as versioned
//! XML. When running tools against installed profiles, [`merge_env`] combines
//! the environments of several profiles with the inherited environment
//! according to per-variable [`MergePolicy`] rules.

pub mod config;
pub mod database;
pub mod env;
pub mod merge;
pub mod path;
pub mod profile;

pub use database::{DatabaseError, FileSystem, OsFileSystem, ProfileDatabase, SchemaVersion};
pub use env::EnvVars;
pub use merge::{
    default_merge_policies, merge_env, merge_env_from_profiles, MergeError, MergePolicies,
    MergePolicy, Separator,
};
pub use profile::{Profile, ProfileError, Target, VersionInfo};
