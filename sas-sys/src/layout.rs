// SPDX-License-Identifier: GPL-3.0-only

//! Well-known host locations used for discovery and removal
//!
//! Production code uses [`HostLayout::default`]. A TOML file can override any
//! subset of the keys, which is mostly useful on hosts with non-standard udev
//! rules and in tests.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Result, SysError};

/// Prefix every raw or multipath device path must carry.
pub const DEV_PREFIX: &str = "/dev/";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HostLayout {
    /// udev symlink farm keyed by transport path
    pub by_path_dir: String,
    /// udev symlink farm keyed by WWN/WWID
    pub by_id_dir: String,
    pub sys_block_dir: String,
    /// Parent of the per-host `scan` trigger files
    pub scsi_host_dir: String,
    /// Multipath administration binary, looked up in `PATH` when relative
    pub multipathd: String,
}

impl Default for HostLayout {
    fn default() -> Self {
        Self {
            by_path_dir: "/dev/disk/by-path".to_string(),
            by_id_dir: "/dev/disk/by-id".to_string(),
            sys_block_dir: "/sys/block".to_string(),
            scsi_host_dir: "/sys/class/scsi_host".to_string(),
            multipathd: "multipathd".to_string(),
        }
    }
}

impl HostLayout {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let layout: HostLayout =
            toml::from_str(raw).map_err(|error| SysError::Config(error.to_string()))?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|error| {
            SysError::Config(format!("cannot read {}: {}", path.display(), error))
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("by_path_dir", &self.by_path_dir),
            ("by_id_dir", &self.by_id_dir),
            ("sys_block_dir", &self.sys_block_dir),
            ("scsi_host_dir", &self.scsi_host_dir),
        ] {
            if value.is_empty() {
                return Err(SysError::Config(format!("{key} must not be empty")));
            }
            if !value.starts_with('/') {
                return Err(SysError::Config(format!(
                    "{key} must be an absolute path, got {value}"
                )));
            }
        }

        if self.multipathd.is_empty() {
            return Err(SysError::Config("multipathd must not be empty".to_string()));
        }

        Ok(())
    }

    pub fn by_path_entry(&self, name: &str) -> String {
        join(&self.by_path_dir, name)
    }

    pub fn by_id_entry(&self, name: &str) -> String {
        join(&self.by_id_dir, name)
    }

    /// `<sys_block>/<dm>/slaves/<device>`, present iff `device` backs `dm`.
    pub fn slave_marker(&self, dm: &str, device: &str) -> String {
        format!("{}/{}/slaves/{}", trim(&self.sys_block_dir), dm, device)
    }

    pub fn slaves_dir(&self, dm: &str) -> String {
        format!("{}/{}/slaves", trim(&self.sys_block_dir), dm)
    }

    pub fn scan_trigger(&self, host: &str) -> String {
        format!("{}/{}/scan", trim(&self.scsi_host_dir), host)
    }

    pub fn delete_trigger(&self, device: &str) -> String {
        format!("{}/{}/device/delete", trim(&self.sys_block_dir), device)
    }
}

/// `/dev/<name>` for a kernel device name.
pub fn dev_path(name: &str) -> String {
    format!("{DEV_PREFIX}{name}")
}

/// Kernel name of a `/dev/<name>` path; `None` for any other shape.
pub fn split_dev_path(path: &str) -> Option<&str> {
    let parts: Vec<&str> = path.split('/').collect();
    if parts.len() == 3 && parts[1].starts_with("dev") && !parts[2].is_empty() {
        Some(parts[2])
    } else {
        None
    }
}

fn trim(dir: &str) -> &str {
    let trimmed = dir.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

fn join(dir: &str, name: &str) -> String {
    format!("{}/{}", trim(dir), name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_linux_conventions() {
        let layout = HostLayout::default();
        assert_eq!(
            layout.slave_marker("dm-1", "sda"),
            "/sys/block/dm-1/slaves/sda"
        );
        assert_eq!(layout.scan_trigger("host0"), "/sys/class/scsi_host/host0/scan");
        assert_eq!(layout.delete_trigger("sdb"), "/sys/block/sdb/device/delete");
        assert_eq!(
            layout.by_id_entry("wwn-0x500a"),
            "/dev/disk/by-id/wwn-0x500a"
        );
        assert!(layout.validate().is_ok());
    }

    #[test]
    fn splits_only_flat_dev_paths() {
        assert_eq!(split_dev_path("/dev/sda"), Some("sda"));
        assert_eq!(split_dev_path("/dev/dm-3"), Some("dm-3"));
        assert_eq!(split_dev_path("/dev/mapper/mpatha"), None);
        assert_eq!(split_dev_path("/sys/block/sda"), None);
        assert_eq!(split_dev_path("/dev/"), None);
        assert_eq!(split_dev_path("sda"), None);
    }

    #[test]
    fn trailing_slashes_are_tolerated() {
        let layout = HostLayout {
            sys_block_dir: "/sys/block/".to_string(),
            ..HostLayout::default()
        };
        assert_eq!(layout.slaves_dir("dm-0"), "/sys/block/dm-0/slaves");
    }

    #[test]
    fn parses_partial_toml() {
        let layout = HostLayout::from_toml_str(
            "sys_block_dir = \"/run/fake/sys/block\"\nmultipathd = \"/usr/sbin/multipathd\"\n",
        )
        .expect("parse layout");

        assert_eq!(layout.sys_block_dir, "/run/fake/sys/block");
        assert_eq!(layout.multipathd, "/usr/sbin/multipathd");
        assert_eq!(layout.by_path_dir, "/dev/disk/by-path");
    }

    #[test]
    fn rejects_relative_directories() {
        let error = HostLayout::from_toml_str("by_id_dir = \"dev/disk/by-id\"\n")
            .expect_err("relative path should fail");
        assert!(matches!(error, SysError::Config(message) if message.contains("by_id_dir")));
    }

    #[test]
    fn rejects_malformed_toml() {
        assert!(matches!(
            HostLayout::from_toml_str("by_id_dir = [1, 2"),
            Err(SysError::Config(_))
        ));
    }
}
