// SPDX-License-Identifier: GPL-3.0-only

use std::path::PathBuf;

use thiserror::Error;

/// Error types for SAS host operations
#[derive(Error, Debug)]
pub enum SysError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("host probe {op} failed for {path}: {source}")]
    Probe {
        op: &'static str,
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no SAS disk found for {0}")]
    DeviceNotFound(String),

    #[error("invalid device path: {0}")]
    InvalidDevicePath(String),

    #[error("detach failed for {device} ({failed} of {attempted} devices failed): {source}")]
    DetachFailed {
        device: String,
        failed: usize,
        attempted: usize,
        #[source]
        source: Box<SysError>,
    },

    #[error("could not resize multipath device {device}: {output} ({status})")]
    ResizeFailed {
        device: String,
        output: String,
        status: String,
    },

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("failed to {step} connector record {path:?}: {reason}")]
    Persistence {
        path: PathBuf,
        step: &'static str,
        reason: String,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Coarse classification of [`SysError`] for callers that map errors onto
/// their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SasErrorKind {
    NotFound,
    HostProbe,
    InvalidInput,
    PartialDetach,
    ExternalTool,
    Persistence,
    Config,
}

impl SasErrorKind {
    pub fn code(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::InvalidInput => 400,
            Self::Config => 400,
            Self::PartialDetach => 409,
            Self::HostProbe => 500,
            Self::Persistence => 500,
            Self::ExternalTool => 502,
        }
    }
}

impl SysError {
    pub(crate) fn probe(op: &'static str, path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Probe {
            op,
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> SasErrorKind {
        match self {
            SysError::Io(_) | SysError::Probe { .. } => SasErrorKind::HostProbe,
            SysError::DeviceNotFound(_) => SasErrorKind::NotFound,
            SysError::InvalidDevicePath(_) => SasErrorKind::InvalidInput,
            SysError::DetachFailed { .. } => SasErrorKind::PartialDetach,
            SysError::ResizeFailed { .. } | SysError::ToolNotFound(_) => {
                SasErrorKind::ExternalTool
            }
            SysError::Persistence { .. } => SasErrorKind::Persistence,
            SysError::Config(_) => SasErrorKind::Config,
        }
    }
}

/// Result type alias for SAS host operations
pub type Result<T> = std::result::Result<T, SysError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detach_failure_names_last_device() {
        let error = SysError::DetachFailed {
            device: "/dev/sdc".to_string(),
            failed: 2,
            attempted: 3,
            source: Box::new(SysError::InvalidDevicePath("sdc".to_string())),
        };

        let message = error.to_string();
        assert!(message.contains("/dev/sdc"));
        assert!(message.contains("2 of 3"));
        assert_eq!(error.kind(), SasErrorKind::PartialDetach);
    }

    #[test]
    fn classifies_probe_errors() {
        let error = SysError::probe(
            "read_dir",
            "/sys/block",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert_eq!(error.kind(), SasErrorKind::HostProbe);
        assert_eq!(error.kind().code(), 500);
        assert_eq!(
            SysError::DeviceNotFound("wwn".to_string()).kind().code(),
            404
        );
    }
}
