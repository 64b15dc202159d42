// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Profile database management and persistence.
//!
//! The __profile database__ is the authoritative record of which profiles are
//! installed, and for which targets. It lives in memory as a registry keyed by
//! qualified profile name, and is persisted as XML.
//!
//! # Database Layout
//!
//! A database can be a single file, or a directory of files. In a directory,
//! each installer owns exactly one file named after itself, e.g.,
//! `profiles-db/v23` holds all profiles installed by "v23". Files ending in
//! ".prev" are backups of the previous write, and are never read.
//!
//! # Write Discipline
//!
//! Writes go to a fresh file next to the destination. Any existing
//! destination file is then renamed to `<file>.prev`, and the fresh file is
//! renamed into place. These are two separate renames, so a crash in between
//! can leave only the ".prev" backup behind. The backup can be renamed back
//! manually in that case.

pub mod fs;
pub mod schema;

pub use fs::{FileSystem, OsFileSystem};
pub use schema::{SchemaError, SchemaVersion};

use crate::profile::{qualified_name, Profile, Target};

use chrono::Utc;
use parking_lot::Mutex;
use std::{
    collections::BTreeMap,
    ffi::OsString,
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, instrument, warn};

/// Suffix of backup files kept by writes.
pub const BACKUP_SUFFIX: &str = ".prev";

/// Registry of installed profiles.
///
/// All operations lock the registry for their whole duration, so a database
/// can be shared between threads.
#[derive(Debug)]
pub struct ProfileDatabase {
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    version: SchemaVersion,
    path: PathBuf,
    profiles: BTreeMap<String, Profile>,
}

impl ProfileDatabase {
    /// Construct new empty database at the latest schema version.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                version: SchemaVersion::LATEST,
                ..Default::default()
            }),
        }
    }

    /// Drop all profiles, and reset database to its initial state.
    pub fn clear(&self) {
        *self.state.lock() = State {
            version: SchemaVersion::LATEST,
            ..Default::default()
        };
    }

    /// Schema version of most recently read data.
    pub fn schema_version(&self) -> SchemaVersion {
        self.state.lock().version
    }

    /// Path database was last read from.
    pub fn path(&self) -> PathBuf {
        self.state.lock().path.clone()
    }

    /// Install new profile.
    ///
    /// Does nothing if profile is already installed, i.e., the root of the
    /// first installation wins. Always returns the installed profile.
    pub fn install_profile(
        &self,
        installer: impl AsRef<str>,
        name: impl AsRef<str>,
        root: impl AsRef<str>,
    ) -> Profile {
        let (installer, name) = (installer.as_ref(), name.as_ref());
        self.state
            .lock()
            .profiles
            .entry(qualified_name(installer, name))
            .or_insert_with(|| Profile::new(installer, name, root.as_ref()))
            .clone()
    }

    /// Add target to installed profile.
    ///
    /// Sets update time of target, and inserts it at its sorted position.
    ///
    /// # Errors
    ///
    /// - Return [`DatabaseError::ProfileNotInstalled`] if profile is missing.
    /// - Return [`DatabaseError::TargetConflict`] if a matching target is
    ///   already installed.
    pub fn add_profile_target(
        &self,
        installer: impl AsRef<str>,
        name: impl AsRef<str>,
        mut target: Target,
    ) -> Result<()> {
        let (installer, name) = (installer.as_ref(), name.as_ref());
        let qualified = qualified_name(installer, name);
        let mut state = self.state.lock();
        let profile = state.profiles.get_mut(&qualified).ok_or_else(|| {
            DatabaseError::ProfileNotInstalled {
                name: name.into(),
                qualified: qualified.clone(),
                target: target.to_string(),
            }
        })?;

        if let Some(installed) = profile.find_target(&target) {
            return Err(DatabaseError::TargetConflict {
                name: name.into(),
                qualified,
                target: target.to_string(),
                installed: installed.to_string(),
            });
        }

        target.update_time = Some(Utc::now());
        debug!("add target {target} to {qualified}");
        profile.insert_target(target);

        Ok(())
    }

    /// Replace matching target of installed profile.
    ///
    /// Refreshes update time of target.
    ///
    /// # Errors
    ///
    /// - Return [`DatabaseError::ProfileNotInstalled`] if profile is missing.
    /// - Return [`DatabaseError::TargetNotInstalled`] if no target matches.
    pub fn update_profile_target(
        &self,
        installer: impl AsRef<str>,
        name: impl AsRef<str>,
        mut target: Target,
    ) -> Result<()> {
        let (installer, name) = (installer.as_ref(), name.as_ref());
        let qualified = qualified_name(installer, name);
        let mut state = self.state.lock();
        let profile = state.profiles.get_mut(&qualified).ok_or_else(|| {
            DatabaseError::ProfileNotInstalled {
                name: name.into(),
                qualified: qualified.clone(),
                target: target.to_string(),
            }
        })?;

        target.update_time = Some(Utc::now());
        let description = target.to_string();
        if !profile.replace_target(target) {
            return Err(DatabaseError::TargetNotInstalled {
                name: name.into(),
                qualified,
                target: description,
            });
        }

        debug!("update target {description} of {qualified}");
        Ok(())
    }

    /// Remove first matching target of profile.
    ///
    /// Removing the last target of a profile removes the profile itself.
    /// Returns true if the profile is gone afterwards, either because it was
    /// deleted, or because it was never installed.
    pub fn remove_profile_target(
        &self,
        installer: impl AsRef<str>,
        name: impl AsRef<str>,
        target: &Target,
    ) -> bool {
        let qualified = qualified_name(installer.as_ref(), name.as_ref());
        let mut state = self.state.lock();
        let Some(profile) = state.profiles.get_mut(&qualified) else {
            return true;
        };

        if let Some(removed) = profile.remove_target(target) {
            debug!("remove target {removed} from {qualified}");
        }

        if profile.targets().is_empty() {
            debug!("remove profile {qualified}");
            state.profiles.remove(&qualified);
            return true;
        }

        false
    }

    /// Qualified names of installed profiles in lexicographic order.
    pub fn names(&self) -> Vec<String> {
        self.state.lock().profiles.keys().cloned().collect()
    }

    /// Snapshot of installed profiles ordered by qualified name.
    pub fn profiles(&self) -> Vec<Profile> {
        self.state.lock().profiles.values().cloned().collect()
    }

    /// Lookup installed profile.
    pub fn lookup_profile(
        &self,
        installer: impl AsRef<str>,
        name: impl AsRef<str>,
    ) -> Option<Profile> {
        self.state
            .lock()
            .profiles
            .get(&qualified_name(installer.as_ref(), name.as_ref()))
            .cloned()
    }

    /// Lookup first installed target of profile that matches given target.
    pub fn lookup_profile_target(
        &self,
        installer: impl AsRef<str>,
        name: impl AsRef<str>,
        target: &Target,
    ) -> Option<Target> {
        self.state
            .lock()
            .profiles
            .get(&qualified_name(installer.as_ref(), name.as_ref()))?
            .find_target(target)
            .cloned()
    }

    /// Environment variables of first installed target that matches.
    pub fn target_env(
        &self,
        installer: impl AsRef<str>,
        name: impl AsRef<str>,
        target: &Target,
    ) -> Option<Vec<String>> {
        self.lookup_profile_target(installer, name, target)
            .map(|installed| installed.env)
    }

    /// Read database from file or directory, replacing current contents.
    ///
    /// A missing path yields an empty database at the original schema
    /// version. Contents stay untouched if reading fails.
    ///
    /// # Errors
    ///
    /// - Return [`DatabaseError::Io`] if path cannot be accessed.
    /// - Return [`DatabaseError::Schema`] if a file cannot be decoded.
    /// - Return [`DatabaseError::DirectoryVersionTooOld`] if a file in a
    ///   database directory predates the minimum schema version.
    /// - Return [`DatabaseError::DirectoryVersionMismatch`] if files in a
    ///   database directory disagree on their schema version.
    #[instrument(skip(self, fs, path), level = "debug")]
    pub fn read(&self, fs: &impl FileSystem, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut state = self.state.lock();

        let is_dir = match fs.is_dir(path) {
            Ok(is_dir) => is_dir,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no profile database at {:?}", path.display());
                *state = State {
                    version: SchemaVersion::Original,
                    path: path.into(),
                    profiles: BTreeMap::new(),
                };
                return Ok(());
            }
            Err(err) => return Err(DatabaseError::io(path, err)),
        };

        let mut profiles = BTreeMap::new();
        let version = if is_dir {
            read_dir(fs, path, &mut profiles)?
        } else {
            read_file(fs, path, &mut profiles)?
        };

        debug!(
            "read {} profiles at schema version {version} from {:?}",
            profiles.len(),
            path.display()
        );
        *state = State {
            version,
            path: path.into(),
            profiles,
        };

        Ok(())
    }

    /// Write profiles of installer at the latest schema version.
    ///
    /// If path is a directory, then profiles are written to a file named after
    /// the installer inside it. An empty installer selects profiles that were
    /// installed without one. The previous file is kept as a ".prev" backup.
    ///
    /// # Errors
    ///
    /// - Return [`DatabaseError::EmptyPath`] if path is empty.
    /// - Return [`DatabaseError::MissingInstaller`] if path is a directory,
    ///   but installer is empty.
    /// - Return [`DatabaseError::MissingTargetVersion`] if any target to be
    ///   written has no version. Nothing is written in that case.
    /// - Return [`DatabaseError::Schema`] if profiles cannot be encoded.
    /// - Return [`DatabaseError::Io`] if any file operation fails.
    #[instrument(skip(self, fs, path), level = "debug")]
    pub fn write(
        &self,
        fs: &impl FileSystem,
        installer: &str,
        path: impl AsRef<Path>,
    ) -> Result<()> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(DatabaseError::EmptyPath);
        }

        let state = self.state.lock();
        let file = match fs.is_dir(path) {
            Ok(true) if installer.is_empty() => {
                return Err(DatabaseError::MissingInstaller { path: path.into() })
            }
            Ok(true) => path.join(installer),
            Ok(false) => path.to_path_buf(),
            Err(err) if err.kind() == ErrorKind::NotFound => path.to_path_buf(),
            Err(err) => return Err(DatabaseError::io(path, err)),
        };

        let profiles = state
            .profiles
            .values()
            .filter(|profile| profile.installer() == installer)
            .collect::<Vec<_>>();

        // INVARIANT: Targets without a version are never persisted.
        for profile in &profiles {
            let unversioned = profile
                .targets()
                .iter()
                .find(|target| target.version.is_empty());
            if let Some(target) = unversioned {
                return Err(DatabaseError::MissingTargetVersion {
                    qualified: profile.qualified_name(),
                    target: target.to_string(),
                });
            }
        }

        let data = schema::encode(installer, profiles)
            .map_err(|err| DatabaseError::schema(&file, err))?;

        let fresh = suffixed(&file, &format!(".{}", Utc::now().format("%Y%m%d%H%M%S%f")));
        fs.write_file(&fresh, data.as_bytes())
            .map_err(|err| DatabaseError::io(&fresh, err))?;

        let backup = suffixed(&file, BACKUP_SUFFIX);
        match fs.rename(&file, &backup) {
            Ok(()) => debug!("backup {:?} to {:?}", file.display(), backup.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                discard(fs, &fresh);
                return Err(DatabaseError::io(&file, err));
            }
        }

        if let Err(err) = fs.rename(&fresh, &file) {
            discard(fs, &fresh);
            return Err(DatabaseError::io(&file, err));
        }
        debug!("wrote profiles of {installer:?} to {:?}", file.display());

        Ok(())
    }
}

impl Default for ProfileDatabase {
    fn default() -> Self {
        Self::new()
    }
}

fn read_file(
    fs: &impl FileSystem,
    path: &Path,
    profiles: &mut BTreeMap<String, Profile>,
) -> Result<SchemaVersion> {
    let data = fs
        .read_file(path)
        .map_err(|err| DatabaseError::io(path, err))?;
    let data = String::from_utf8(data).map_err(|err| DatabaseError::schema(path, err.into()))?;
    let document = schema::decode(&data).map_err(|err| DatabaseError::schema(path, err))?;
    let version = document.version();

    for profile in schema::migrate(document).map_err(|err| DatabaseError::schema(path, err))? {
        let qualified = profile.qualified_name();
        if profiles.insert(qualified.clone(), profile).is_some() {
            warn!("profile {qualified} in {:?} replaces earlier entry", path.display());
        }
    }

    Ok(version)
}

fn read_dir(
    fs: &impl FileSystem,
    path: &Path,
    profiles: &mut BTreeMap<String, Profile>,
) -> Result<SchemaVersion> {
    let mut versions = Vec::new();
    for entry in fs.read_dir(path).map_err(|err| DatabaseError::io(path, err))? {
        if entry.to_string_lossy().ends_with(BACKUP_SUFFIX) {
            continue;
        }

        let version = read_file(fs, &entry, profiles)?;
        versions.push((entry, version));
    }

    let Some((first_path, expected)) = versions.first() else {
        return Ok(SchemaVersion::Original);
    };

    // INVARIANT: Version mismatches are reported before version minimums.
    if let Some((path, version)) = versions.iter().find(|(_, version)| version != expected) {
        return Err(DatabaseError::DirectoryVersionMismatch {
            path: path.clone(),
            version: *version,
            first_path: first_path.clone(),
            expected: *expected,
        });
    }

    if *expected < SchemaVersion::MINIMUM_DIRECTORY {
        return Err(DatabaseError::DirectoryVersionTooOld {
            path: first_path.clone(),
            version: *expected,
            minimum: SchemaVersion::MINIMUM_DIRECTORY,
        });
    }

    Ok(*expected)
}

/// Remove leftover file of a failed write.
fn discard(fs: &impl FileSystem, path: &Path) {
    if let Err(err) = fs.remove_file(path) {
        warn!("cannot remove {:?}: {err}", path.display());
    }
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Profile database error types.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// Profile must be installed before targets can be added to it.
    #[error("profile {name:?} ({qualified}) is not installed, cannot use target {target}")]
    ProfileNotInstalled {
        name: String,
        qualified: String,
        target: String,
    },

    /// Matching target is already installed.
    #[error("profile {name:?} ({qualified}) already has target {installed} matching {target}")]
    TargetConflict {
        name: String,
        qualified: String,
        target: String,
        installed: String,
    },

    /// No installed target matches.
    #[error("profile {name:?} ({qualified}) has no target matching {target}")]
    TargetNotInstalled {
        name: String,
        qualified: String,
        target: String,
    },

    /// Target without version cannot be written.
    #[error("profile {qualified} has target {target} without a version")]
    MissingTargetVersion { qualified: String, target: String },

    /// Database path is empty.
    #[error("profile database path is empty")]
    EmptyPath,

    /// Writing into a database directory requires an installer.
    #[error("installer required to write into profile database directory {:?}", path.display())]
    MissingInstaller { path: PathBuf },

    /// Database directory file predates minimum schema version.
    #[error(
        "profile database file {:?} has schema version {version}, but at least version {minimum} is required",
        path.display()
    )]
    DirectoryVersionTooOld {
        path: PathBuf,
        version: SchemaVersion,
        minimum: SchemaVersion,
    },

    /// Database directory files disagree on schema version.
    #[error(
        "profile database file {:?} has schema version {version}, but {:?} has version {expected}",
        path.display(),
        first_path.display()
    )]
    DirectoryVersionMismatch {
        path: PathBuf,
        version: SchemaVersion,
        first_path: PathBuf,
        expected: SchemaVersion,
    },

    /// Database file cannot be encoded or decoded.
    #[error("invalid profile database file {:?}", path.display())]
    Schema {
        #[source]
        source: SchemaError,
        path: PathBuf,
    },

    /// File system operation fails.
    #[error("failed to access profile database at {:?}", path.display())]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

impl DatabaseError {
    fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            source,
            path: path.into(),
        }
    }

    fn schema(path: impl Into<PathBuf>, source: SchemaError) -> Self {
        Self::Schema {
            source,
            path: path.into(),
        }
    }
}

/// Friendly result alias :3
pub type Result<T, E = DatabaseError> = std::result::Result<T, E>;
