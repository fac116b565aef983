// SPDX-License-Identifier: GPL-3.0-only

//! Host I/O capability used by discovery and detach
//!
//! Everything the library learns about the host goes through [`HostProbe`]:
//! directory listings, existence checks, symlink resolution and writes to
//! sysfs trigger files. [`OsProbe`] talks to the real filesystem and
//! [`MemoryProbe`] serves an in-memory fixture.

pub mod memory;
pub mod os;

pub use memory::{MemoryProbe, RecordedWrite};
pub use os::OsProbe;

use std::io;

/// One child of a listed directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeEntry {
    pub name: String,
    pub is_dir: bool,
}

impl ProbeEntry {
    pub fn new(name: impl Into<String>, is_dir: bool) -> Self {
        Self {
            name: name.into(),
            is_dir,
        }
    }
}

pub trait HostProbe: Send + Sync {
    /// Lists the children of `path` in a stable order.
    fn read_dir(&self, path: &str) -> io::Result<Vec<ProbeEntry>>;

    /// Succeeds when `path` exists, without following a final symlink.
    fn lstat(&self, path: &str) -> io::Result<()>;

    /// Resolves every symlink in `path`.
    fn canonicalize(&self, path: &str) -> io::Result<String>;

    fn write_file(&self, path: &str, data: &[u8], mode: u32) -> io::Result<()>;

    /// `lstat` with "does not exist" mapped to `Ok(false)`.
    fn exists(&self, path: &str) -> io::Result<bool> {
        match self.lstat(path) {
            Ok(()) => Ok(true),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(error) => Err(error),
        }
    }

    /// `read_dir` with a missing directory treated as empty.
    fn read_dir_or_empty(&self, path: &str) -> io::Result<Vec<ProbeEntry>> {
        match self.read_dir(path) {
            Ok(entries) => Ok(entries),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(error) => Err(error),
        }
    }
}

impl<P: HostProbe + ?Sized> HostProbe for &P {
    fn read_dir(&self, path: &str) -> io::Result<Vec<ProbeEntry>> {
        (**self).read_dir(path)
    }

    fn lstat(&self, path: &str) -> io::Result<()> {
        (**self).lstat(path)
    }

    fn canonicalize(&self, path: &str) -> io::Result<String> {
        (**self).canonicalize(path)
    }

    fn write_file(&self, path: &str, data: &[u8], mode: u32) -> io::Result<()> {
        (**self).write_file(path, data, mode)
    }
}
