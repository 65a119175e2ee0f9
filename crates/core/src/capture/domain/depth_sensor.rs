use std::time::Duration;

use crate::shared::calibration::Calibration;
use crate::shared::stream_config::CaptureConfig;

use super::capture_error::CaptureError;
use super::frame_set::FrameSet;

/// One connected camera as reported by the driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub serial: String,
}

/// Driver-level access to depth cameras.
///
/// Implementations wrap a vendor SDK (or a software camera); the session
/// layer owns exclusivity and cancellation on top of this.
pub trait DepthSensor: Send {
    fn devices(&self) -> Result<Vec<DeviceInfo>, CaptureError>;

    /// Configures both streams on `device` and starts streaming.
    fn start(
        &mut self,
        device: &DeviceInfo,
        config: &CaptureConfig,
    ) -> Result<Box<dyn FrameSource>, CaptureError>;
}

/// Rejects stream formats no backend can deliver before touching hardware.
pub fn check_formats(config: &CaptureConfig) -> Result<(), CaptureError> {
    match config.unsupported_format() {
        Some((kind, format)) => Err(CaptureError::Backend(format!(
            "{kind} stream cannot be captured as {format:?}"
        ))),
        None => Ok(()),
    }
}

/// A running stream of frame sets.
pub trait FrameSource: Send {
    fn calibration(&self) -> Calibration;

    /// Waits at most `timeout` for the next frame set.
    ///
    /// `Ok(None)` means nothing arrived in time; callers decide whether
    /// that is a timeout or just one slice of a longer wait.
    fn poll(&mut self, timeout: Duration) -> Result<Option<FrameSet>, CaptureError>;

    /// Stops streaming and releases the hardware. Called at most once.
    fn stop(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::stream_config::PixelFormat;

    #[test]
    fn test_check_formats_accepts_defaults_and_bgr_color() {
        let mut config = CaptureConfig::default();
        assert!(check_formats(&config).is_ok());
        config.color.format = PixelFormat::Bgr8;
        assert!(check_formats(&config).is_ok());
    }

    #[test]
    fn test_check_formats_rejects_non_z16_depth() {
        let mut config = CaptureConfig::default();
        config.depth.format = PixelFormat::Bgr8;
        assert_eq!(
            check_formats(&config).unwrap_err(),
            CaptureError::Backend("depth stream cannot be captured as Bgr8".into())
        );
    }
}
