use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::shared::calibration::Calibration;
use crate::shared::stream_config::CaptureConfig;

use super::device_claim::DeviceClaim;
use super::domain::capture_error::CaptureError;
use super::domain::depth_sensor::{DepthSensor, DeviceInfo, FrameSource};
use super::domain::frame_set::FrameSet;

/// Longest a blocked wait goes without checking for a close request.
const POLL_SLICE: Duration = Duration::from_millis(50);

/// Closes a session from another thread, unblocking any pending wait.
#[derive(Clone, Debug)]
pub struct SessionCloser {
    closed: Arc<AtomicBool>,
}

impl SessionCloser {
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Single owner of an open camera: stream configuration, calibration and
/// the exclusive device claim live here for the whole capture session.
pub struct SensorSession {
    source: Option<Box<dyn FrameSource>>,
    claim: Option<DeviceClaim>,
    device: DeviceInfo,
    config: CaptureConfig,
    calibration: Calibration,
    closed: Arc<AtomicBool>,
}

impl SensorSession {
    /// Opens the first device `sensor` reports and starts both streams.
    ///
    /// Nothing is retained on failure: a device claim taken before a
    /// failed start is released again.
    pub fn open(sensor: &mut dyn DepthSensor, config: CaptureConfig) -> Result<Self, CaptureError> {
        let device = sensor
            .devices()?
            .into_iter()
            .next()
            .ok_or(CaptureError::NoDeviceFound)?;

        let claim = DeviceClaim::acquire(&device.serial)?;
        let source = sensor.start(&device, &config)?;
        let calibration = source.calibration();

        log::info!(
            "Opened {} ({}): depth {}x{}@{} color {}x{}@{}",
            device.name,
            device.serial,
            config.depth.width,
            config.depth.height,
            config.depth.fps,
            config.color.width,
            config.color.height,
            config.color.fps,
        );

        Ok(Self {
            source: Some(source),
            claim: Some(claim),
            device,
            config,
            calibration,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn device(&self) -> &DeviceInfo {
        &self.device
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Latest calibration reported by the driver.
    pub fn calibration(&self) -> Calibration {
        self.source
            .as_ref()
            .map_or(self.calibration, |s| s.calibration())
    }

    pub fn closer(&self) -> SessionCloser {
        SessionCloser {
            closed: self.closed.clone(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.source.is_none()
    }

    /// Blocks until the driver delivers a frame set, `timeout` elapses, or
    /// the session is closed.
    pub fn wait_for_frames(&mut self, timeout: Duration) -> Result<FrameSet, CaptureError> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return Err(CaptureError::SessionClosed);
            }
            let source = self.source.as_mut().ok_or(CaptureError::SessionClosed)?;

            let now = Instant::now();
            if now >= deadline {
                return Err(CaptureError::FrameTimeout(timeout));
            }
            let slice = (deadline - now).min(POLL_SLICE);

            if let Some(frames) = source.poll(slice)? {
                return Ok(frames);
            }
        }
    }

    /// Stops streaming and releases the device. Later calls do nothing.
    pub fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(mut source) = self.source.take() {
            source.stop();
            log::info!("Closed {} ({})", self.device.name, self.device.serial);
        }
        self.claim = None;
    }
}

impl Drop for SensorSession {
    fn drop(&mut self) {
        self.close();
    }
}
