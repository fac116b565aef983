// SPDX-License-Identifier: GPL-3.0-only

use serde::{Deserialize, Serialize};

/// LUN used with `target_wwns` when the caller leaves it empty.
pub const DEFAULT_LUN: &str = "1";

/// Identification and result record for one attach/detach cycle.
///
/// Every field defaults on load, so records written by other versions of the
/// library deserialize without error.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Connector {
    /// Caller-supplied label, never interpreted
    pub volume_name: String,
    /// WWNs looked up under `/dev/disk/by-path`, paired with `lun`
    pub target_wwns: Vec<String>,
    pub lun: String,
    /// WWIDs looked up as `scsi-<wwid>` under `/dev/disk/by-id`
    pub wwids: Vec<String>,
    /// Single WWN looked up as `wwn-0x<wwn>` under `/dev/disk/by-id`
    pub target_wwn: String,
    /// True iff discovery resolved a multipath aggregate
    pub multipath: bool,
    /// Device to use for I/O: the aggregate when `multipath`, else the raw disk
    #[serde(alias = "target_device")]
    pub device_path: String,
    /// Raw SCSI devices underneath `device_path`
    pub scsi_devices: Vec<String>,
}

/// Borrowed view of the identifier set, one variant per lookup strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identifiers<'a> {
    PathAndLun { wwns: &'a [String], lun: &'a str },
    Wwn(&'a str),
    Wwids(&'a [String]),
}

impl Identifiers<'_> {
    /// Number of identifiers a discovery pass will try.
    pub fn len(&self) -> usize {
        match self {
            Identifiers::PathAndLun { wwns, .. } => wwns.len(),
            Identifiers::Wwn(_) => 1,
            Identifiers::Wwids(wwids) => wwids.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Identifier values in lookup order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            Identifiers::PathAndLun { wwns, .. } => wwns.iter().map(String::as_str).collect(),
            Identifiers::Wwn(wwn) => vec![*wwn],
            Identifiers::Wwids(wwids) => wwids.iter().map(String::as_str).collect(),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Identifiers::PathAndLun { .. } => "by-path",
            Identifiers::Wwn(_) => "by-id-wwn",
            Identifiers::Wwids(_) => "by-id-wwid",
        }
    }
}

impl Connector {
    /// Connector identifying the volume by target WWNs and a LUN.
    pub fn with_target_wwns(
        volume_name: impl Into<String>,
        target_wwns: Vec<String>,
        lun: impl Into<String>,
    ) -> Self {
        Self {
            volume_name: volume_name.into(),
            target_wwns,
            lun: lun.into(),
            ..Self::default()
        }
    }

    /// Connector identifying the volume by a single WWN.
    pub fn with_target_wwn(volume_name: impl Into<String>, target_wwn: impl Into<String>) -> Self {
        Self {
            volume_name: volume_name.into(),
            target_wwn: target_wwn.into(),
            ..Self::default()
        }
    }

    /// Connector identifying the volume by WWIDs.
    pub fn with_wwids(volume_name: impl Into<String>, wwids: Vec<String>) -> Self {
        Self {
            volume_name: volume_name.into(),
            wwids,
            ..Self::default()
        }
    }

    /// Selects the lookup strategy.
    ///
    /// Precedence: `target_wwns` (by-path), then `target_wwn` (by-id WWN),
    /// then `wwids` (by-id WWID). An empty connector yields an empty WWID set.
    pub fn identifiers(&self) -> Identifiers<'_> {
        if !self.target_wwns.is_empty() {
            Identifiers::PathAndLun {
                wwns: &self.target_wwns,
                lun: self.lun_or_default(),
            }
        } else if !self.target_wwn.is_empty() {
            Identifiers::Wwn(&self.target_wwn)
        } else {
            Identifiers::Wwids(&self.wwids)
        }
    }

    pub fn lun_or_default(&self) -> &str {
        if self.lun.is_empty() {
            DEFAULT_LUN
        } else {
            &self.lun
        }
    }

    /// Drops everything a previous discovery stored.
    pub fn clear_result(&mut self) {
        self.multipath = false;
        self.device_path.clear();
        self.scsi_devices.clear();
    }

    pub fn is_attached(&self) -> bool {
        !self.device_path.is_empty()
    }
}
