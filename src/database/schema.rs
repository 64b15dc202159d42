// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Versioned XML schema of the profile database.
//!
//! Every database file is a `<profiles>` document whose `version` attribute
//! selects the schema it was written with:
//!
//! - __Original__: no `version` attribute. Targets may carry a `tag`
//!   attribute, and profile names may be qualified with their installer.
//! - __V2 through V4__: same layout as the original schema, but versioned.
//! - __V5__: the `<profiles>` element names the installer of all profiles in
//!   the file, and profile names are unqualified. Tags are gone.
//!
//! Decoding happens in two steps. First the document is parsed into the
//! representation of its own schema version. Then [`migrate`] maps that
//! representation onto the in-memory [`Profile`] model. Files are only ever
//! written with the latest schema.

mod current;
mod legacy;

use crate::profile::{split_qualified_name, Profile, Target};

use chrono::{DateTime, Datelike, SecondsFormat, Utc};
use quick_xml::Writer;
use serde::Deserialize;
use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    string::FromUtf8Error,
};

pub(crate) use current::CurrentDocument;
pub(crate) use legacy::LegacyDocument;

/// Schema version of the profile database.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchemaVersion {
    #[default]
    Original = 0,
    V2 = 2,
    V3 = 3,
    V4 = 4,
    V5 = 5,
}

impl SchemaVersion {
    /// Schema version that all database files are written with.
    pub const LATEST: Self = Self::V5;

    /// Oldest schema version allowed when reading a database directory.
    pub const MINIMUM_DIRECTORY: Self = Self::V5;

    pub fn as_u32(&self) -> u32 {
        *self as u32
    }
}

impl TryFrom<u32> for SchemaVersion {
    type Error = SchemaError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Original),
            2 => Ok(Self::V2),
            3 => Ok(Self::V3),
            4 => Ok(Self::V4),
            5 => Ok(Self::V5),
            _ => Err(SchemaError::UnsupportedVersion {
                version: value.to_string(),
            }),
        }
    }
}

impl Display for SchemaVersion {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        write!(fmt, "{}", self.as_u32())
    }
}

/// Root attributes shared by every schema version.
#[derive(Debug, Deserialize)]
#[serde(rename = "profiles")]
struct Header {
    #[serde(rename = "@version", default)]
    version: Option<String>,
}

/// Database file decoded with the schema it was written in.
#[derive(Debug)]
pub(crate) enum VersionedDocument {
    Legacy {
        version: SchemaVersion,
        document: LegacyDocument,
    },
    Current(CurrentDocument),
}

impl VersionedDocument {
    pub(crate) fn version(&self) -> SchemaVersion {
        match self {
            Self::Legacy { version, .. } => *version,
            Self::Current(_) => SchemaVersion::V5,
        }
    }
}

/// Decode database file contents.
///
/// # Errors
///
/// - Return [`SchemaError::Decode`] if contents are not valid XML for the
///   schema version they declare.
/// - Return [`SchemaError::UnsupportedVersion`] if declared schema version
///   is unknown.
pub(crate) fn decode(data: &str) -> Result<VersionedDocument> {
    let header: Header = quick_xml::de::from_str(data)?;
    let version = match header.version.as_deref().map(str::trim) {
        None | Some("") => SchemaVersion::Original,
        Some(version) => version
            .parse::<u32>()
            .map_err(|_| SchemaError::UnsupportedVersion {
                version: version.into(),
            })
            .and_then(SchemaVersion::try_from)?,
    };

    let document = match version {
        SchemaVersion::V5 => VersionedDocument::Current(quick_xml::de::from_str(data)?),
        version => VersionedDocument::Legacy {
            version,
            document: quick_xml::de::from_str(data)?,
        },
    };

    Ok(document)
}

/// Map decoded document onto in-memory profiles.
///
/// # Errors
///
/// - Return [`SchemaError::InvalidDate`] if a target date is not an RFC 3339
///   timestamp.
pub(crate) fn migrate(document: VersionedDocument) -> Result<Vec<Profile>> {
    match document {
        VersionedDocument::Legacy { document, .. } => document
            .profiles
            .into_iter()
            .map(|profile| -> Result<Profile> {
                // INVARIANT: Legacy names may already be installer qualified.
                let (installer, name) = split_qualified_name(&profile.name);
                let mut migrated = Profile::new(installer, name, profile.root.as_str());
                for target in profile.targets {
                    let mut migrated_target =
                        Target::with_version(target.arch, target.os, target.version);
                    migrated_target.installation_dir = target.installation_dir;
                    migrated_target.update_time = parse_date(&target.date)?;
                    migrated_target.env = target.env.map(|env| env.vars).unwrap_or_default();
                    migrated_target
                        .restore_command_line_env(target.command_line_env.map(|env| env.vars));
                    migrated.insert_target(migrated_target);
                }
                Ok(migrated)
            })
            .collect(),
        VersionedDocument::Current(document) => document
            .profiles
            .into_iter()
            .map(|profile| -> Result<Profile> {
                let mut migrated =
                    Profile::new(document.installer.as_str(), profile.name, profile.root);
                for target in profile.targets {
                    let mut migrated_target =
                        Target::with_version(target.arch, target.os, target.version);
                    migrated_target.installation_dir = target.installation_dir;
                    migrated_target.update_time = parse_date(&target.date)?;
                    migrated_target.env = target.env.vars;
                    migrated_target
                        .restore_command_line_env(target.command_line_env.map(|env| env.vars));
                    migrated.insert_target(migrated_target);
                }
                Ok(migrated)
            })
            .collect(),
    }
}

/// Encode profiles of one installer with the latest schema.
///
/// # Errors
///
/// - Return [`SchemaError::Write`] if XML cannot be written.
pub(crate) fn encode<'a>(
    installer: &str,
    profiles: impl IntoIterator<Item = &'a Profile>,
) -> Result<String> {
    let document = CurrentDocument::from_profiles(installer, profiles);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    document.write(&mut writer)?;

    let mut buffer = String::from_utf8(writer.into_inner())?;
    buffer.push('\n');
    Ok(buffer)
}

/// Whitespace that XML decoding trims from the edges of text.
const XML_SPACE: [char; 4] = [' ', '\t', '\n', '\r'];

/// Escape element text such that surrounding whitespace survives decoding.
pub(crate) fn escape_text(text: &str) -> String {
    let start = text.len() - text.trim_start_matches(XML_SPACE).len();
    let end = text.trim_end_matches(XML_SPACE).len().max(start);

    let mut escaped = text[..start].chars().map(char_ref).collect::<String>();
    escaped.push_str(&quick_xml::escape::escape(&text[start..end]));
    escaped.extend(text[end..].chars().map(char_ref));
    escaped
}

fn char_ref(ch: char) -> String {
    format!("&#x{:X};", u32::from(ch))
}

/// `KEY=VALUE` listing shared by `<envvars>` and `<command-line>` elements.
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct VarList {
    #[serde(rename = "var", default)]
    pub(crate) vars: Vec<String>,
}

fn parse_date(date: &str) -> Result<Option<DateTime<Utc>>> {
    let date = date.trim();
    if date.is_empty() {
        return Ok(None);
    }

    let parsed = DateTime::parse_from_rfc3339(date)
        .map_err(|err| SchemaError::InvalidDate {
            date: date.into(),
            source: err,
        })?
        .with_timezone(&Utc);

    // INVARIANT: Year one is the zero timestamp of old writers, i.e., unset.
    if parsed.year() <= 1 {
        return Ok(None);
    }

    Ok(Some(parsed))
}

pub(crate) fn format_date(date: Option<&DateTime<Utc>>) -> String {
    date.map(|date| date.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        .unwrap_or_default()
}

/// Schema encoding and decoding error types.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// XML does not match schema.
    #[error(transparent)]
    Decode(#[from] quick_xml::DeError),

    /// XML cannot be written.
    #[error(transparent)]
    Write(#[from] std::io::Error),

    /// Database file is not valid UTF-8.
    #[error("profile database file is not valid UTF-8")]
    Encoding(#[from] FromUtf8Error),

    /// Schema version is unknown.
    #[error("unsupported schema version {version:?}")]
    UnsupportedVersion { version: String },

    /// Target date is not a valid timestamp.
    #[error("invalid target date {date:?}")]
    InvalidDate {
        date: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Friendly result alias :3
pub type Result<T, E = SchemaError> = std::result::Result<T, E>;
