use std::time::Duration;

use thiserror::Error;

use crate::shared::stream_config::StreamKind;

/// Failures of the sensor session and frame acquisition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("no depth camera found")]
    NoDeviceFound,
    #[error("device {serial} is unavailable: {reason}")]
    DeviceUnavailable { serial: String, reason: String },
    #[error("no frame set arrived within {0:?}")]
    FrameTimeout(Duration),
    #[error("frame set has no {0} frame")]
    IncompleteFrameSet(StreamKind),
    #[error("sensor session closed")]
    SessionClosed,
    #[error("sensor backend error: {0}")]
    Backend(String),
}

impl CaptureError {
    /// Per-cycle conditions the caller may simply retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CaptureError::IncompleteFrameSet(_) | CaptureError::FrameTimeout(_)
        )
    }
}
