// SPDX-License-Identifier: GPL-3.0-only

//! In-memory host fixture
//!
//! Describes a host as a handful of directories, symlinks and plain paths,
//! and records every write so callers can assert on rescans and removals:
//!
//! ```
//! use sas_sys::probe::{HostProbe, MemoryProbe};
//!
//! let probe = MemoryProbe::new()
//!     .dir("/dev/disk/by-id", &["wwn-0x500a0981891b8dc5"])
//!     .symlink("/dev/disk/by-id/wwn-0x500a0981891b8dc5", "/dev/sda")
//!     .file("/dev/sda");
//!
//! assert_eq!(
//!     probe.canonicalize("/dev/disk/by-id/wwn-0x500a0981891b8dc5").unwrap(),
//!     "/dev/sda"
//! );
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::Mutex;

use super::{HostProbe, ProbeEntry};

const MAX_SYMLINK_HOPS: usize = 40;

/// A write observed by [`MemoryProbe`], including failed ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedWrite {
    pub path: String,
    pub data: Vec<u8>,
    pub mode: u32,
}

#[derive(Debug, Default)]
pub struct MemoryProbe {
    dirs: BTreeMap<String, Vec<ProbeEntry>>,
    paths: BTreeSet<String>,
    symlinks: BTreeMap<String, String>,
    read_dir_failures: BTreeMap<String, io::ErrorKind>,
    canonicalize_failures: BTreeSet<String>,
    write_failures: BTreeSet<String>,
    writes: Mutex<Vec<RecordedWrite>>,
}

impl MemoryProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory listing; entries keep the given order.
    pub fn dir(mut self, path: &str, entries: &[&str]) -> Self {
        let listing = self.dirs.entry(normalize(path)).or_default();
        for name in entries {
            listing.push(ProbeEntry::new(*name, false));
        }
        self
    }

    pub fn symlink(mut self, path: &str, target: &str) -> Self {
        self.symlinks.insert(normalize(path), normalize(target));
        self
    }

    /// Marks a path as existing.
    pub fn file(mut self, path: &str) -> Self {
        self.paths.insert(normalize(path));
        self
    }

    pub fn fail_read_dir(mut self, path: &str, kind: io::ErrorKind) -> Self {
        self.read_dir_failures.insert(normalize(path), kind);
        self
    }

    pub fn fail_canonicalize(mut self, path: &str) -> Self {
        self.canonicalize_failures.insert(normalize(path));
        self
    }

    /// Writes to `path` are recorded and then fail with `PermissionDenied`.
    pub fn fail_write(mut self, path: &str) -> Self {
        self.write_failures.insert(normalize(path));
        self
    }

    pub fn writes(&self) -> Vec<RecordedWrite> {
        self.writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of writes whose path ends with `suffix`.
    pub fn write_count(&self, suffix: &str) -> usize {
        self.writes()
            .iter()
            .filter(|write| write.path.ends_with(suffix))
            .count()
    }

    fn is_known(&self, path: &str) -> bool {
        if self.paths.contains(path)
            || self.dirs.contains_key(path)
            || self.symlinks.contains_key(path)
        {
            return true;
        }

        match path.rsplit_once('/') {
            Some((parent, name)) => {
                let parent = if parent.is_empty() { "/" } else { parent };
                self.dirs
                    .get(parent)
                    .is_some_and(|entries| entries.iter().any(|entry| entry.name == name))
            }
            None => false,
        }
    }
}

impl HostProbe for MemoryProbe {
    fn read_dir(&self, path: &str) -> io::Result<Vec<ProbeEntry>> {
        let path = normalize(path);
        if let Some(kind) = self.read_dir_failures.get(&path) {
            return Err(io::Error::new(*kind, format!("fixture: cannot list {path}")));
        }

        self.dirs
            .get(&path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("fixture: no {path}")))
    }

    fn lstat(&self, path: &str) -> io::Result<()> {
        let path = normalize(path);
        if self.is_known(&path) {
            Ok(())
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, format!("fixture: no {path}")))
        }
    }

    fn canonicalize(&self, path: &str) -> io::Result<String> {
        let mut current = normalize(path);
        for _ in 0..MAX_SYMLINK_HOPS {
            if self.canonicalize_failures.contains(&current) {
                return Err(io::Error::other(format!("fixture: cannot resolve {current}")));
            }
            match self.symlinks.get(&current) {
                Some(target) => current = target.clone(),
                None if self.is_known(&current) => return Ok(current),
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("fixture: no {current}"),
                    ));
                }
            }
        }

        Err(io::Error::other(format!("fixture: symlink loop at {path}")))
    }

    fn write_file(&self, path: &str, data: &[u8], mode: u32) -> io::Result<()> {
        let path = normalize(path);
        self.writes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedWrite {
                path: path.clone(),
                data: data.to_vec(),
                mode,
            });

        if self.write_failures.contains(&path) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("fixture: write to {path} denied"),
            ));
        }
        Ok(())
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
