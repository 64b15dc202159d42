// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Layout of schema version 5, the latest schema.

use crate::{
    database::schema::{escape_text, format_date, SchemaVersion, VarList},
    profile::Profile,
};

use quick_xml::{events::BytesText, Writer};
use serde::Deserialize;
use std::io::{Result as IoResult, Write};

/// Profiles of a single installer.
#[derive(Debug, Deserialize)]
#[serde(rename = "profiles")]
pub(crate) struct CurrentDocument {
    #[serde(rename = "@version")]
    pub(crate) version: String,

    #[serde(rename = "@installer", default)]
    pub(crate) installer: String,

    #[serde(rename = "profile", default)]
    pub(crate) profiles: Vec<CurrentProfile>,
}

impl CurrentDocument {
    /// Lay out profiles for writing, stripping installer from their names.
    pub(crate) fn from_profiles<'a>(
        installer: &str,
        profiles: impl IntoIterator<Item = &'a Profile>,
    ) -> Self {
        Self {
            version: SchemaVersion::LATEST.to_string(),
            installer: installer.to_owned(),
            profiles: profiles
                .into_iter()
                .map(|profile| CurrentProfile {
                    name: profile.name().to_owned(),
                    root: profile.root().to_owned(),
                    targets: profile
                        .targets()
                        .iter()
                        .map(|target| CurrentTarget {
                            arch: target.arch.clone(),
                            os: target.os.clone(),
                            installation_dir: target.installation_dir.clone(),
                            version: target.version.clone(),
                            date: format_date(target.update_time.as_ref()),
                            env: VarList {
                                vars: target.env.clone(),
                            },
                            command_line_env: target.raw_command_line_env().map(|vars| VarList {
                                vars: vars.to_vec(),
                            }),
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    pub(crate) fn write<W: Write>(&self, writer: &mut Writer<W>) -> IoResult<()> {
        let mut root = writer
            .create_element("profiles")
            .with_attribute(("version", self.version.as_str()));
        if !self.installer.is_empty() {
            root = root.with_attribute(("installer", self.installer.as_str()));
        }

        root.write_inner_content(|writer| {
            for profile in &self.profiles {
                profile.write(writer)?;
            }
            Ok(())
        })?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CurrentProfile {
    #[serde(rename = "@name")]
    pub(crate) name: String,

    #[serde(rename = "@root", default)]
    pub(crate) root: String,

    #[serde(rename = "target", default)]
    pub(crate) targets: Vec<CurrentTarget>,
}

impl CurrentProfile {
    fn write<W: Write>(&self, writer: &mut Writer<W>) -> IoResult<()> {
        writer
            .create_element("profile")
            .with_attribute(("name", self.name.as_str()))
            .with_attribute(("root", self.root.as_str()))
            .write_inner_content(|writer| {
                for target in &self.targets {
                    target.write(writer)?;
                }
                Ok(())
            })?;

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CurrentTarget {
    #[serde(rename = "@arch")]
    pub(crate) arch: String,

    #[serde(rename = "@os")]
    pub(crate) os: String,

    #[serde(rename = "@installation-directory", default)]
    pub(crate) installation_dir: String,

    #[serde(rename = "@version", default)]
    pub(crate) version: String,

    #[serde(rename = "@date", default)]
    pub(crate) date: String,

    #[serde(rename = "envvars", default)]
    pub(crate) env: VarList,

    #[serde(rename = "command-line", default)]
    pub(crate) command_line_env: Option<VarList>,
}

impl CurrentTarget {
    fn write<W: Write>(&self, writer: &mut Writer<W>) -> IoResult<()> {
        let mut element = writer
            .create_element("target")
            .with_attribute(("arch", self.arch.as_str()))
            .with_attribute(("os", self.os.as_str()))
            .with_attribute(("installation-directory", self.installation_dir.as_str()))
            .with_attribute(("version", self.version.as_str()));
        if !self.date.is_empty() {
            element = element.with_attribute(("date", self.date.as_str()));
        }

        element.write_inner_content(|writer| {
            self.env.write(writer, "envvars")?;
            if let Some(command_line_env) = &self.command_line_env {
                command_line_env.write(writer, "command-line")?;
            }
            Ok(())
        })?;

        Ok(())
    }
}

impl VarList {
    fn write<W: Write>(&self, writer: &mut Writer<W>, tag: &str) -> IoResult<()> {
        let element = writer.create_element(tag);
        if self.vars.is_empty() {
            element.write_empty()?;
            return Ok(());
        }

        element.write_inner_content(|writer| {
            for var in &self.vars {
                writer
                    .create_element("var")
                    .write_text_content(BytesText::from_escaped(escape_text(var)))?;
            }
            Ok(())
        })?;

        Ok(())
    }
}
