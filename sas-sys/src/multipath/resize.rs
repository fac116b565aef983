// SPDX-License-Identifier: GPL-3.0-only

//! `multipathd resize map` wrapper

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{debug, info, warn};
use which::which;

use crate::error::{Result, SysError};
use crate::layout::HostLayout;

pub struct MultipathTool {
    /// Path to the multipathd binary
    binary_path: PathBuf,
}

impl MultipathTool {
    /// Locate the binary named by `layout.multipathd`.
    ///
    /// Returns an error if it is not installed.
    pub fn new(layout: &HostLayout) -> Result<Self> {
        let binary_path = which(&layout.multipathd)
            .map_err(|_| SysError::ToolNotFound(layout.multipathd.clone()))?;
        debug!("Found multipathd binary at {:?}", binary_path);
        Ok(Self { binary_path })
    }

    /// Use `binary_path` as is, without a `PATH` lookup.
    pub fn with_binary(binary_path: impl Into<PathBuf>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    pub fn binary_path(&self) -> &Path {
        &self.binary_path
    }

    /// Grow the multipath map behind `device` to the size of its paths.
    pub fn resize_map(&self, device: &str) -> Result<()> {
        let rendered = render_resize_command(&self.binary_path, device);
        info!(device = %device, command = %rendered, "Resizing multipath device");

        let output = Command::new(&self.binary_path)
            .args(["resize", "map", device])
            .output()
            .map_err(|e| SysError::ResizeFailed {
                device: device.to_string(),
                output: String::new(),
                status: format!("failed to execute {}: {}", self.binary_path.display(), e),
            })?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            let combined = combined.trim().to_string();
            warn!(device = %device, output = %combined, "multipathd resize failed");
            return Err(SysError::ResizeFailed {
                device: device.to_string(),
                output: combined,
                status: output.status.to_string(),
            });
        }

        Ok(())
    }
}

/// Resize with the default layout's `multipathd`.
pub fn resize_multipath_device(device: &str) -> Result<()> {
    MultipathTool::new(&HostLayout::default())?.resize_map(device)
}

pub fn render_resize_command(binary: &Path, device: &str) -> String {
    format!("{} resize map {}", binary.display(), device)
}
