// SPDX-License-Identifier: GPL-3.0-only

//! Domain model for SAS volume attach/detach
//!
//! A [`Connector`] carries everything needed to find a SAS-attached volume on
//! the host and everything discovery learned about it:
//!
//! - **Identification**: target WWNs plus a LUN (by-path lookup), a single
//!   target WWN (by-id lookup), or a list of WWIDs (by-id lookup)
//! - **Result**: the device to use for I/O, whether it is a multipath
//!   aggregate, and the raw SCSI devices underneath it
//!
//! The record is serde-serializable so it can be persisted between attach and
//! detach, which may happen in different processes.

pub mod connector;

pub use connector::{Connector, DEFAULT_LUN, Identifiers};
