// SPDX-License-Identifier: GPL-3.0-only

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;

use super::{HostProbe, ProbeEntry};

/// [`HostProbe`] backed by the real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProbe;

impl HostProbe for OsProbe {
    fn read_dir(&self, path: &str) -> io::Result<Vec<ProbeEntry>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            // sysfs exposes devices as symlinks to directories
            let is_dir = entry.file_type()?.is_dir()
                || fs::metadata(entry.path())
                    .map(|metadata| metadata.is_dir())
                    .unwrap_or(false);
            entries.push(ProbeEntry::new(
                entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            ));
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn lstat(&self, path: &str) -> io::Result<()> {
        fs::symlink_metadata(path).map(|_| ())
    }

    fn canonicalize(&self, path: &str) -> io::Result<String> {
        Ok(fs::canonicalize(path)?.to_string_lossy().into_owned())
    }

    fn write_file(&self, path: &str, data: &[u8], mode: u32) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(mode)
            .open(path)?;
        file.write_all(data)
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::symlink;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    static COUNTER: AtomicU64 = AtomicU64::new(1);

    struct TempDir {
        path: PathBuf,
    }

    impl TempDir {
        fn new() -> Self {
            let unique = COUNTER.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "sas-sys-os-probe-{}-{unique}",
                std::process::id()
            ));
            fs::create_dir_all(&path).expect("create temp dir");
            Self { path }
        }

        fn join(&self, name: &str) -> String {
            self.path.join(name).to_string_lossy().into_owned()
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    #[test]
    fn lists_entries_sorted_by_name() {
        let temp = TempDir::new();
        fs::write(temp.join("sdb"), b"").expect("write sdb");
        fs::write(temp.join("sda"), b"").expect("write sda");
        fs::create_dir(temp.join("dm-0")).expect("create dm-0");

        let entries = OsProbe.read_dir(&temp.join("")).expect("read dir");
        let names: Vec<&str> = entries.iter().map(|entry| entry.name.as_str()).collect();

        assert_eq!(names, vec!["dm-0", "sda", "sdb"]);
        assert!(entries[0].is_dir);
        assert!(!entries[1].is_dir);
    }

    #[test]
    fn resolves_symlinks_and_checks_existence() {
        let temp = TempDir::new();
        fs::write(temp.join("sda"), b"").expect("write sda");
        symlink(temp.join("sda"), temp.join("wwn-0x500a")).expect("create symlink");
        symlink(temp.join("gone"), temp.join("dangling")).expect("create dangling symlink");

        let resolved = OsProbe
            .canonicalize(&temp.join("wwn-0x500a"))
            .expect("canonicalize");
        assert!(resolved.ends_with("/sda"));

        assert!(OsProbe.exists(&temp.join("dangling")).expect("lstat dangling"));
        assert!(!OsProbe.exists(&temp.join("missing")).expect("lstat missing"));
        assert!(OsProbe.canonicalize(&temp.join("dangling")).is_err());
    }

    #[test]
    fn missing_directory_lists_empty() {
        let temp = TempDir::new();
        assert!(OsProbe.read_dir(&temp.join("nope")).is_err());
        assert!(
            OsProbe
                .read_dir_or_empty(&temp.join("nope"))
                .expect("missing dir")
                .is_empty()
        );
    }

    #[test]
    fn writes_trigger_bytes() {
        let temp = TempDir::new();
        let target = temp.join("scan");

        OsProbe
            .write_file(&target, b"- - -", 0o666)
            .expect("write scan trigger");
        OsProbe.write_file(&target, b"1", 0o666).expect("rewrite");

        assert_eq!(fs::read(&target).expect("read back"), b"1");
    }
}
