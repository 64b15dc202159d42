// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! File system access for the profile database.

use std::{
    fs,
    io,
    path::{Path, PathBuf},
};

/// Layer of indirection for file system access.
pub trait FileSystem {
    /// Read entire contents of file.
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Create or truncate file, and write data to it.
    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Rename file, replacing destination if it exists.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove file.
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// List paths of entries in directory, sorted by name.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Check if path is a directory.
    ///
    /// Missing paths produce an [`io::ErrorKind::NotFound`] error.
    fn is_dir(&self, path: &Path) -> io::Result<bool>;
}

/// File system access through the standard library.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        fs::write(path, data)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<io::Result<Vec<_>>>()?;
        entries.sort();
        Ok(entries)
    }

    fn is_dir(&self, path: &Path) -> io::Result<bool> {
        fs::metadata(path).map(|metadata| metadata.is_dir())
    }
}
