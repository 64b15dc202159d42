// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Layout of the original schema and schema versions 2 through 4.

use crate::database::schema::VarList;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename = "profiles")]
pub(crate) struct LegacyDocument {
    #[serde(rename = "profile", default)]
    pub(crate) profiles: Vec<LegacyProfile>,
}

/// Profile entry, whose name may be qualified by its installer.
#[derive(Debug, Deserialize)]
pub(crate) struct LegacyProfile {
    #[serde(rename = "@name")]
    pub(crate) name: String,

    #[serde(rename = "@root", default)]
    pub(crate) root: String,

    #[serde(rename = "target", default)]
    pub(crate) targets: Vec<LegacyTarget>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LegacyTarget {
    /// Deprecated target label, read but never migrated.
    #[serde(rename = "@tag", default)]
    #[allow(dead_code)]
    pub(crate) tag: Option<String>,

    #[serde(rename = "@arch", default)]
    pub(crate) arch: String,

    #[serde(rename = "@os", default)]
    pub(crate) os: String,

    #[serde(rename = "@installation-directory", default)]
    pub(crate) installation_dir: String,

    #[serde(rename = "@version", default)]
    pub(crate) version: String,

    #[serde(rename = "@date", default)]
    pub(crate) date: String,

    #[serde(rename = "envvars", default)]
    pub(crate) env: Option<VarList>,

    #[serde(rename = "command-line", default)]
    pub(crate) command_line_env: Option<VarList>,
}
