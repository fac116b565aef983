// SPDX-License-Identifier: GPL-3.0-only

//! Host-side discovery and release of SAS block devices
//!
//! This crate finds the block device behind a SAS volume, identified by
//! WWN (+LUN) or WWID, and removes it from the host again:
//!
//! - Two-pass discovery with a single SCSI bus rescan between passes
//! - Multipath aggregate detection and member (slave) resolution
//! - Best-effort detach across every member of a multipath device
//! - Connector persistence between attach and detach
//! - `multipathd` map resize
//!
//! All host access goes through [`probe::HostProbe`], so the logic runs
//! against [`probe::MemoryProbe`] in tests. Device removal and rescans require
//! root privileges on a real host.
//!
//! ```no_run
//! use sas_sys::{Connector, SasHost, probe::OsProbe};
//!
//! # fn example() -> sas_sys::Result<()> {
//! let host = SasHost::new(OsProbe);
//! let mut connector = Connector::with_target_wwn("vol-1", "600c0ff000546067369fe36201000000");
//! let device = host.attach(&mut connector)?;
//! println!("attached {device} (multipath: {})", connector.multipath);
//! host.detach(&device)?;
//! # Ok(())
//! # }
//! ```

pub mod discovery;
pub mod error;
pub mod layout;
pub mod lifecycle;
pub mod locator;
pub mod multipath;
pub mod persist;
pub mod probe;

pub use discovery::{Discovery, MAX_SCAN_PASSES};
pub use error::{Result, SasErrorKind, SysError};
pub use layout::HostLayout;
pub use lifecycle::{SasHost, attach, detach};
pub use locator::{DeviceLocator, DeviceMatch};
#[cfg(feature = "multipath-tools")]
pub use multipath::{MultipathTool, resize_multipath_device};
pub use sas_types::{Connector, Identifiers};
