// SPDX-License-Identifier: GPL-3.0-only

//! Device-mapper multipath helpers
//!
//! Member ("slave") enumeration for an aggregate such as `/dev/dm-1`, plus
//! the `multipathd` wrapper used to resize a map after its paths grew.

#[cfg(feature = "multipath-tools")]
pub mod resize;

#[cfg(feature = "multipath-tools")]
pub use resize::{MultipathTool, render_resize_command, resize_multipath_device};

use tracing::trace;

use crate::error::{Result, SysError};
use crate::layout::{HostLayout, dev_path, split_dev_path};
use crate::probe::HostProbe;

const DM_PREFIX: &str = "/dev/dm-";

/// True for device-mapper node paths (`/dev/dm-<n>`).
pub fn is_multipath_path(path: &str) -> bool {
    path.starts_with(DM_PREFIX)
}

/// Raw devices backing the multipath aggregate at `dm_path`.
///
/// Paths that are not of the form `/dev/<name>` have no members. Member order
/// follows the probe's listing of `<sys_block>/<name>/slaves`.
pub fn list_members<P: HostProbe + ?Sized>(
    probe: &P,
    layout: &HostLayout,
    dm_path: &str,
) -> Result<Vec<String>> {
    let Some(name) = split_dev_path(dm_path) else {
        trace!(dm_path = %dm_path, "not a /dev/<name> path, no members");
        return Ok(Vec::new());
    };

    let slaves_dir = layout.slaves_dir(name);
    let entries = probe
        .read_dir_or_empty(&slaves_dir)
        .map_err(|e| SysError::probe("read_dir", &slaves_dir, e))?;

    let members: Vec<String> = entries.iter().map(|entry| dev_path(&entry.name)).collect();
    trace!(dm_path = %dm_path, members = ?members, "resolved multipath members");
    Ok(members)
}
