// SPDX-License-Identifier: GPL-3.0-only

//! Two-pass device discovery
//!
//! Newly attached SAS targets are not always visible to the SCSI layer yet.
//! The first pass looks at what the host already exposes; only when it finds
//! no multipath aggregate is the SCSI bus rescanned and a second, final pass
//! made.
//!
//! Within a pass, identifiers are tried in order and the pass stops at the
//! first aggregate. A raw disk found along the way is kept as a fallback for
//! when no aggregate turns up at all.

use sas_types::{Connector, Identifiers};
use tracing::{debug, info, info_span, warn};

use crate::error::{Result, SysError};
use crate::layout::HostLayout;
use crate::locator::{DeviceLocator, DeviceMatch};
use crate::multipath;
use crate::probe::HostProbe;

/// Pass 1 inspects existing devices, pass 2 follows a bus rescan.
pub const MAX_SCAN_PASSES: usize = 2;

/// Written to each host's `scan` file: wildcard channel, target and LUN.
pub const RESCAN_TRIGGER: &[u8] = b"- - -";

const TRIGGER_MODE: u32 = 0o666;

pub struct Discovery<'a, P: HostProbe + ?Sized> {
    probe: &'a P,
    layout: &'a HostLayout,
}

impl<'a, P: HostProbe + ?Sized> Discovery<'a, P> {
    pub fn new(probe: &'a P, layout: &'a HostLayout) -> Self {
        Self { probe, layout }
    }

    /// Resolve the connector's identifiers to a device and store the result
    /// in the connector.
    pub fn discover(&self, connector: &mut Connector) -> Result<()> {
        let span = info_span!("discover", volume = %connector.volume_name);
        let _enter = span.enter();

        connector.clear_result();

        let identifiers = connector.identifiers();
        let (disk, aggregate) = self.search(identifiers)?;

        match (aggregate, disk) {
            (Some(aggregate), disk) => {
                let mut members = multipath::list_members(self.probe, self.layout, &aggregate)?;
                if let Some(disk) = disk.filter(|_| members.is_empty()) {
                    warn!(
                        dm = %aggregate,
                        disk = %disk,
                        "multipath device lists no slaves, using located disk"
                    );
                    members.push(disk);
                }
                info!(dm = %aggregate, members = ?members, "multipath device was discovered");
                connector.multipath = true;
                connector.device_path = aggregate;
                connector.scsi_devices = members;
            }
            (None, Some(disk)) => {
                info!(disk = %disk, "raw SAS disk was discovered");
                connector.device_path = disk.clone();
                connector.scsi_devices = vec![disk];
            }
            (None, None) => {
                let identifiers = connector.identifiers();
                debug!(mode = identifiers.mode(), "no SAS disk found");
                return Err(SysError::DeviceNotFound(format!(
                    "{} {:?}",
                    identifiers.mode(),
                    identifiers.values()
                )));
            }
        }

        Ok(())
    }

    /// Trigger a rescan on every SCSI host. Returns how many hosts were
    /// triggered successfully.
    pub fn rescan(&self) -> usize {
        let scsi_host_dir = &self.layout.scsi_host_dir;
        let hosts = match self.probe.read_dir(scsi_host_dir) {
            Ok(hosts) => hosts,
            Err(e) => {
                warn!(dir = %scsi_host_dir, error = %e, "cannot list scsi hosts, skipping rescan");
                return 0;
            }
        };

        let mut triggered = 0;
        for host in hosts {
            let trigger = self.layout.scan_trigger(&host.name);
            debug!(path = %trigger, "scsi host rescan");
            match self.probe.write_file(&trigger, RESCAN_TRIGGER, TRIGGER_MODE) {
                Ok(()) => triggered += 1,
                Err(e) => warn!(path = %trigger, error = %e, "scsi host rescan failed"),
            }
        }
        triggered
    }

    /// Returns the last raw disk seen and the first aggregate found.
    fn search(&self, identifiers: Identifiers<'_>) -> Result<(Option<String>, Option<String>)> {
        let locator = DeviceLocator::new(self.probe, self.layout);
        let mut disk = None;

        for pass in 0..MAX_SCAN_PASSES {
            if pass > 0 {
                debug!("scsi rescan host");
                self.rescan();
            }

            let ids = identifiers.values();
            for id in ids {
                debug!(pass, id = %id, mode = identifiers.mode(), "search for disk");
                let found = match identifiers {
                    Identifiers::PathAndLun { lun, .. } => locator.locate_by_path_and_lun(id, lun)?,
                    Identifiers::Wwn(_) => locator.locate_by_wwn(id)?,
                    Identifiers::Wwids(_) => locator.locate_by_wwid(id)?,
                };

                let DeviceMatch {
                    disk: found_disk,
                    multipath: found_multipath,
                } = found;
                if found_disk.is_some() {
                    disk = found_disk;
                }
                if let Some(aggregate) = found_multipath {
                    return Ok((disk, Some(aggregate)));
                }
            }
        }

        Ok((disk, None))
    }
}
