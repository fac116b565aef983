// SPDX-License-Identifier: GPL-3.0-only

//! Attach and detach entry points

use sas_types::Connector;
use tracing::{debug, error, info, info_span, warn};

use crate::discovery::Discovery;
use crate::error::{Result, SysError};
use crate::layout::{DEV_PREFIX, HostLayout};
use crate::locator::DeviceLocator;
use crate::multipath;
use crate::probe::HostProbe;

/// Byte written to `device/delete` to drop a SCSI device.
const DELETE_TRIGGER: &[u8] = b"1";

const TRIGGER_MODE: u32 = 0o666;

/// A host's SAS devices, seen through a [`HostProbe`].
pub struct SasHost<P: HostProbe> {
    probe: P,
    layout: HostLayout,
}

impl<P: HostProbe> SasHost<P> {
    pub fn new(probe: P) -> Self {
        Self::with_layout(probe, HostLayout::default())
    }

    pub fn with_layout(probe: P, layout: HostLayout) -> Self {
        Self { probe, layout }
    }

    pub fn probe(&self) -> &P {
        &self.probe
    }

    pub fn layout(&self) -> &HostLayout {
        &self.layout
    }

    /// Find the device for `connector` and return the path to use for I/O.
    ///
    /// The connector is updated in place with the discovery result.
    pub fn attach(&self, connector: &mut Connector) -> Result<String> {
        info!(volume = %connector.volume_name, "Attaching SAS volume");
        if let Err(e) = self.discover(connector) {
            info!(volume = %connector.volume_name, "unable to find disk given WWNs or WWIDs");
            return Err(e);
        }
        Ok(connector.device_path.clone())
    }

    pub fn discover(&self, connector: &mut Connector) -> Result<()> {
        Discovery::new(&self.probe, &self.layout).discover(connector)
    }

    pub fn rescan(&self) -> usize {
        Discovery::new(&self.probe, &self.layout).rescan()
    }

    pub fn find_multipath_owner(&self, device: &str) -> Result<Option<String>> {
        DeviceLocator::new(&self.probe, &self.layout).find_multipath_owner(device)
    }

    pub fn list_members(&self, dm_path: &str) -> Result<Vec<String>> {
        multipath::list_members(&self.probe, &self.layout, dm_path)
    }

    /// Remove the SCSI device(s) behind `device_path` from the host.
    ///
    /// A multipath aggregate is expanded to its members. Every member is
    /// attempted even when an earlier one fails; the returned error names the
    /// last failure.
    pub fn detach(&self, device_path: &str) -> Result<()> {
        let span = info_span!("detach", device_path = %device_path);
        let _enter = span.enter();
        info!("Detaching SAS volume");

        let dst_path = self
            .probe
            .canonicalize(device_path)
            .map_err(|e| SysError::probe("canonicalize", device_path, e))?;

        if !dst_path.starts_with(DEV_PREFIX) {
            return Err(SysError::InvalidDevicePath(dst_path));
        }

        let devices = if multipath::is_multipath_path(&dst_path) {
            self.list_members(&dst_path)?
        } else {
            vec![dst_path.clone()]
        };
        debug!(dst_path = %dst_path, devices = ?devices, "resolved devices to detach");

        let attempted = devices.len();
        let mut failed = 0;
        let mut last_error = None;

        for device in devices {
            if let Err(e) = self.remove_device(&device) {
                warn!(device = %device, error = %e, "detaching device failed");
                failed += 1;
                last_error = Some((device, e));
            }
        }

        match last_error {
            Some((device, source)) => {
                let error = SysError::DetachFailed {
                    device,
                    failed,
                    attempted,
                    source: Box::new(source),
                };
                error!(error = %error, "last error occurred during detach");
                Err(error)
            }
            None => Ok(()),
        }
    }

    /// Write to `/sys/block/<name>/device/delete` for one `/dev/<name>` device.
    fn remove_device(&self, device_path: &str) -> Result<()> {
        if !device_path.starts_with(DEV_PREFIX) {
            return Err(SysError::InvalidDevicePath(device_path.to_string()));
        }

        let name = device_path.rsplit('/').next().unwrap_or_default();
        if name.is_empty() {
            return Err(SysError::InvalidDevicePath(device_path.to_string()));
        }

        let trigger = self.layout.delete_trigger(name);
        info!(path = %trigger, "remove device from scsi-subsystem");
        self.probe
            .write_file(&trigger, DELETE_TRIGGER, TRIGGER_MODE)
            .map_err(|e| SysError::probe("write_file", &trigger, e))
    }
}

/// [`SasHost::attach`] with the default host layout.
pub fn attach<P: HostProbe + ?Sized>(connector: &mut Connector, probe: &P) -> Result<String> {
    SasHost::new(probe).attach(connector)
}

/// [`SasHost::detach`] with the default host layout.
pub fn detach<P: HostProbe + ?Sized>(device_path: &str, probe: &P) -> Result<()> {
    SasHost::new(probe).detach(device_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SasErrorKind;
    use crate::probe::MemoryProbe;

    #[test]
    fn single_disk_detach_writes_delete() {
        let probe = MemoryProbe::new()
            .symlink("/dev/disk/by-id/wwn-0x500a", "/dev/sdb")
            .file("/dev/sdb");

        detach("/dev/disk/by-id/wwn-0x500a", &probe).expect("detach");

        let writes = probe.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].path, "/sys/block/sdb/device/delete");
        assert_eq!(writes[0].data, DELETE_TRIGGER);
    }

    #[test]
    fn path_outside_dev_is_rejected_before_removal() {
        let probe = MemoryProbe::new().file("/tmp/disk.img");

        let error = detach("/tmp/disk.img", &probe).expect_err("not under /dev");

        assert_eq!(error.kind(), SasErrorKind::InvalidInput);
        assert!(probe.writes().is_empty());
    }

    #[test]
    fn unresolvable_path_propagates() {
        let error = detach("/dev/sdq", &MemoryProbe::new()).expect_err("missing device");
        assert!(matches!(error, SysError::Probe { op: "canonicalize", .. }));
    }

    #[test]
    fn attach_returns_device_path() {
        let probe = MemoryProbe::new()
            .dir("/dev/disk/by-id", &["scsi-3600a098"])
            .symlink("/dev/disk/by-id/scsi-3600a098", "/dev/sdd")
            .file("/dev/sdd");
        let mut connector = Connector::with_wwids("vol", vec!["3600a098".to_string()]);

        let device = attach(&mut connector, &probe).expect("attach");

        assert_eq!(device, "/dev/sdd");
        assert_eq!(connector.device_path, "/dev/sdd");
    }
}
