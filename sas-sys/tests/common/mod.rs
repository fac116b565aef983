// SPDX-License-Identifier: GPL-3.0-only

#![allow(dead_code)]

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use sas_sys::probe::{HostProbe, MemoryProbe, ProbeEntry};

pub const TARGET_WWN: &str = "500a0981891b8dc5";
pub const BY_PATH_LUN0: &str = "pci-0000:41:00.0-fc-0x500a0981891b8dc5-lun-0";

static COUNTER: AtomicU64 = AtomicU64::new(1);

pub struct TempDir {
    pub path: PathBuf,
}

impl TempDir {
    pub fn new(label: &str) -> Self {
        let unique = COUNTER.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "sas-sys-{label}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("create temp dir");
        Self { path }
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Two SCSI hosts and nothing else.
pub fn empty_host() -> MemoryProbe {
    MemoryProbe::new().dir("/sys/class/scsi_host", &["host0", "host1"])
}

/// `/dev/sda` reachable by path as WWN 500a0981891b8dc5 LUN 0.
pub fn by_path_disk() -> MemoryProbe {
    empty_host()
        .dir("/dev/disk/by-path", &[BY_PATH_LUN0])
        .symlink(&format!("/dev/disk/by-path/{BY_PATH_LUN0}"), "/dev/sda")
        .file("/dev/sda")
}

/// [`by_path_disk`] with `/dev/sda` owned by `/dev/dm-1`.
pub fn by_path_multipath() -> MemoryProbe {
    by_path_disk()
        .file("/dev/dm-1")
        .dir("/sys/block", &["sda", "sdb", "dm-1"])
        .dir("/sys/block/dm-1/slaves", &["sda", "sdb"])
}

/// A host whose state changes once a SCSI rescan is triggered.
///
/// Reads are served from `before` until the first write to a `scan` file,
/// and from `after` from then on. Every write is recorded in `before`.
pub struct RescanHost {
    pub before: MemoryProbe,
    pub after: MemoryProbe,
    rescanned: AtomicBool,
}

impl RescanHost {
    pub fn new(before: MemoryProbe, after: MemoryProbe) -> Self {
        Self {
            before,
            after,
            rescanned: AtomicBool::new(false),
        }
    }

    pub fn rescanned(&self) -> bool {
        self.rescanned.load(Ordering::SeqCst)
    }

    fn current(&self) -> &MemoryProbe {
        if self.rescanned() {
            &self.after
        } else {
            &self.before
        }
    }
}

impl HostProbe for RescanHost {
    fn read_dir(&self, path: &str) -> io::Result<Vec<ProbeEntry>> {
        self.current().read_dir(path)
    }

    fn lstat(&self, path: &str) -> io::Result<()> {
        self.current().lstat(path)
    }

    fn canonicalize(&self, path: &str) -> io::Result<String> {
        self.current().canonicalize(path)
    }

    fn write_file(&self, path: &str, data: &[u8], mode: u32) -> io::Result<()> {
        let result = self.before.write_file(path, data, mode);
        if path.ends_with("/scan") {
            self.rescanned.store(true, Ordering::SeqCst);
        }
        result
    }
}
