// SPDX-License-Identifier: GPL-3.0-only

//! Finds the raw SCSI disk for one identifier and its multipath owner, if any
//!
//! Three udev naming conventions are supported:
//!
//! - by-path: `<transport>-0x<wwn>-lun-<lun>` under `/dev/disk/by-path`
//! - by-id WWN: `wwn-0x<wwn>` under `/dev/disk/by-id`
//! - by-id WWID: exactly `scsi-<wwid>` under `/dev/disk/by-id`; udev replaces
//!   whitespace in the WWID with underscores, so callers pass it that way
//!
//! Identifiers are matched as given. "Nothing matched" is an empty
//! [`DeviceMatch`], not an error.

use tracing::{debug, trace};

use crate::error::{Result, SysError};
use crate::layout::{HostLayout, dev_path, split_dev_path};
use crate::probe::{HostProbe, ProbeEntry};

/// Outcome of a single identifier lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceMatch {
    /// Canonical raw device, e.g. `/dev/sda`
    pub disk: Option<String>,
    /// Owning aggregate, e.g. `/dev/dm-1`
    pub multipath: Option<String>,
}

impl DeviceMatch {
    pub fn is_empty(&self) -> bool {
        self.disk.is_none() && self.multipath.is_none()
    }
}

pub struct DeviceLocator<'a, P: HostProbe + ?Sized> {
    probe: &'a P,
    layout: &'a HostLayout,
}

impl<'a, P: HostProbe + ?Sized> DeviceLocator<'a, P> {
    pub fn new(probe: &'a P, layout: &'a HostLayout) -> Self {
        Self { probe, layout }
    }

    /// Look up `wwn`/`lun` in the by-path farm.
    pub fn locate_by_path_and_lun(&self, wwn: &str, lun: &str) -> Result<DeviceMatch> {
        let fragment = format!("-0x{wwn}-lun-{lun}");
        debug!(wwn = %wwn, lun = %lun, "searching by-path");

        let entries = self.list(&self.layout.by_path_dir)?;
        let Some(entry) = entries.iter().find(|entry| entry.name.contains(&fragment)) else {
            debug!(fragment = %fragment, "no by-path entry matched");
            return Ok(DeviceMatch::default());
        };

        let link = self.layout.by_path_entry(&entry.name);
        let disk = self
            .probe
            .canonicalize(&link)
            .map_err(|e| SysError::probe("canonicalize", &link, e))?;
        self.with_owner(disk)
    }

    /// Look up a single `wwn` in the by-id farm.
    ///
    /// An entry whose symlink does not resolve, or resolves outside
    /// `/dev/<name>`, is skipped.
    pub fn locate_by_wwn(&self, wwn: &str) -> Result<DeviceMatch> {
        let token = format!("wwn-0x{wwn}");
        debug!(wwn = %wwn, "searching by-id for wwn");

        for entry in self.list(&self.layout.by_id_dir)? {
            trace!(name = %entry.name, token = %token, "checking by-id entry");
            if !entry.name.contains(&token) {
                continue;
            }

            let link = self.layout.by_id_entry(&entry.name);
            let disk = match self.probe.canonicalize(&link) {
                Ok(disk) => disk,
                Err(e) => {
                    debug!(link = %link, error = %e, "unresolvable by-id symlink, skipping");
                    continue;
                }
            };
            match self.with_owner(disk) {
                Err(SysError::InvalidDevicePath(resolved)) => {
                    debug!(
                        link = %link,
                        resolved = %resolved,
                        "by-id symlink does not point at a device node, skipping"
                    );
                }
                found => return found,
            }
        }

        Ok(DeviceMatch::default())
    }

    /// Look up `scsi-<wwid>` in the by-id farm.
    pub fn locate_by_wwid(&self, wwid: &str) -> Result<DeviceMatch> {
        let expected = format!("scsi-{wwid}");
        debug!(wwid = %wwid, "searching by-id for wwid");

        let entries = self.list(&self.layout.by_id_dir)?;
        let Some(entry) = entries.iter().find(|entry| entry.name == expected) else {
            debug!(expected = %expected, "no by-id entry matched");
            return Ok(DeviceMatch::default());
        };

        let link = self.layout.by_id_entry(&entry.name);
        let disk = self
            .probe
            .canonicalize(&link)
            .map_err(|e| SysError::probe("canonicalize", &link, e))?;
        self.with_owner(disk)
    }

    /// Given a device like `/dev/sdx` (or a link to one), find the
    /// device-mapper node it is a slave of.
    pub fn find_multipath_owner(&self, device: &str) -> Result<Option<String>> {
        let name = self.kernel_name(device)?;
        let sys_block = &self.layout.sys_block_dir;

        for entry in self.list(sys_block)? {
            if !entry.name.starts_with("dm-") {
                continue;
            }
            let marker = self.layout.slave_marker(&entry.name, &name);
            if self
                .probe
                .exists(&marker)
                .map_err(|e| SysError::probe("lstat", &marker, e))?
            {
                trace!(device = %device, dm = %entry.name, "found multipath owner");
                return Ok(Some(dev_path(&entry.name)));
            }
        }

        Ok(None)
    }

    /// Kernel name (`sdX`, `dm-N`) of the device `path` resolves to.
    pub fn kernel_name(&self, path: &str) -> Result<String> {
        let resolved = self
            .probe
            .canonicalize(path)
            .map_err(|e| SysError::probe("canonicalize", path, e))?;
        split_dev_path(&resolved)
            .map(str::to_string)
            .ok_or_else(|| SysError::InvalidDevicePath(resolved.clone()))
    }

    fn with_owner(&self, disk: String) -> Result<DeviceMatch> {
        let multipath = self.find_multipath_owner(&disk)?;
        debug!(disk = %disk, multipath = ?multipath, "found disk");
        Ok(DeviceMatch {
            disk: Some(disk),
            multipath,
        })
    }

    fn list(&self, dir: &str) -> Result<Vec<ProbeEntry>> {
        self.probe
            .read_dir_or_empty(dir)
            .map_err(|e| SysError::probe("read_dir", dir, e))
    }
}
