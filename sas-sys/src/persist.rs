// SPDX-License-Identifier: GPL-3.0-only

//! Connector snapshots on disk
//!
//! Attach and detach commonly run in different processes. The connector is
//! written as a single JSON object (e.g. `/var/lib/sas/<volume>.json`) after
//! attach and read back before detach. There is no locking; concurrent
//! writers to one path must be serialized by the caller.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use sas_types::Connector;
use tracing::{debug, error};

use crate::error::{Result, SysError};

/// Write `connector` to `path`, replacing any previous content.
pub fn save(connector: &Connector, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| {
        error!(path = %path.display(), error = %e, "could not create connector file");
        persistence_error(path, "create", e)
    })?;

    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, connector).map_err(|e| {
        error!(path = %path.display(), error = %e, "could not encode the connector");
        persistence_error(path, "encode", e)
    })?;
    writer
        .write_all(b"\n")
        .and_then(|()| writer.flush())
        .map_err(|e| persistence_error(path, "encode", e))?;

    debug!(path = %path.display(), volume = %connector.volume_name, "persisted connector");
    Ok(())
}

/// Read a connector previously written by [`save`].
pub fn load(path: &Path) -> Result<Connector> {
    let raw = fs::read(path).map_err(|e| persistence_error(path, "read", e))?;
    let connector: Connector =
        serde_json::from_slice(&raw).map_err(|e| persistence_error(path, "decode", e))?;
    debug!(path = %path.display(), volume = %connector.volume_name, "loaded connector");
    Ok(connector)
}

fn persistence_error(path: &Path, step: &'static str, reason: impl ToString) -> SysError {
    SysError::Persistence {
        path: path.to_path_buf(),
        step,
        reason: reason.to_string(),
    }
}
