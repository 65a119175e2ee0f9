//! Software camera producing a fixed, fully deterministic scene.
//!
//! The depth stream sees a floor-like plane receding from 1.2 m (top row)
//! to 2.0 m (bottom row) with a box-shaped subject at 0.8 m in the middle
//! of the frame, and an invalid band along the left edge like the real
//! stereo module. Depth and color share an identity calibration.

use std::thread;
use std::time::{Duration, Instant};

use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::depth_sensor::{check_formats, DepthSensor, DeviceInfo, FrameSource};
use crate::capture::domain::frame_set::FrameSet;
use crate::shared::calibration::{Calibration, Extrinsics, Intrinsics};
use crate::shared::depth_frame::{DepthFrame, DEFAULT_DEPTH_SCALE};
use crate::shared::frame::Frame;
use crate::shared::stream_config::{CaptureConfig, StreamConfig};

pub const SYNTHETIC_SERIAL: &str = "synthetic-0";

const PLANE_NEAR_MM: u16 = 1200;
const PLANE_FAR_MM: u16 = 2000;
const SUBJECT_MM: u16 = 800;
const INVALID_BAND_COLS: u32 = 8;
const SUBJECT_RGB: [u8; 3] = [224, 172, 105];

/// Horizontal field of view of roughly 55 degrees at any resolution.
fn focal_for(width: u32) -> f32 {
    width as f32 * 0.96
}

pub struct SyntheticSensor {
    devices: Vec<DeviceInfo>,
}

impl SyntheticSensor {
    pub fn new() -> Self {
        Self::with_serial(SYNTHETIC_SERIAL)
    }

    pub fn with_serial(serial: &str) -> Self {
        Self {
            devices: vec![DeviceInfo {
                name: "Synthetic Depth Camera".into(),
                serial: serial.into(),
            }],
        }
    }

    /// A sensor that enumerates no devices.
    pub fn disconnected() -> Self {
        Self { devices: vec![] }
    }
}

impl Default for SyntheticSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl DepthSensor for SyntheticSensor {
    fn devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        Ok(self.devices.clone())
    }

    fn start(
        &mut self,
        device: &DeviceInfo,
        config: &CaptureConfig,
    ) -> Result<Box<dyn FrameSource>, CaptureError> {
        if !self.devices.contains(device) {
            return Err(CaptureError::DeviceUnavailable {
                serial: device.serial.clone(),
                reason: "not connected".into(),
            });
        }
        check_formats(config)?;
        let fps = config.depth.fps.min(config.color.fps).max(1);
        Ok(Box::new(SyntheticSource {
            config: *config,
            interval: Duration::from_secs_f64(1.0 / fps as f64),
            next_due: Instant::now(),
            sequence: 0,
            running: true,
        }))
    }
}

struct SyntheticSource {
    config: CaptureConfig,
    interval: Duration,
    next_due: Instant,
    sequence: u64,
    running: bool,
}

impl FrameSource for SyntheticSource {
    fn calibration(&self) -> Calibration {
        let d = self.config.depth;
        let c = self.config.color;
        Calibration {
            depth: Intrinsics::centred(d.width, d.height, focal_for(d.width)),
            color: Intrinsics::centred(c.width, c.height, focal_for(c.width)),
            depth_to_color: Extrinsics::identity(),
            depth_scale: DEFAULT_DEPTH_SCALE,
        }
    }

    fn poll(&mut self, timeout: Duration) -> Result<Option<FrameSet>, CaptureError> {
        if !self.running {
            return Err(CaptureError::SessionClosed);
        }
        let now = Instant::now();
        if self.next_due > now {
            let wait = self.next_due - now;
            if wait > timeout {
                thread::sleep(timeout);
                return Ok(None);
            }
            thread::sleep(wait);
        }
        self.next_due = Instant::now() + self.interval;
        self.sequence += 1;

        Ok(Some(FrameSet::complete(
            render_depth(&self.config.depth, self.sequence),
            render_color(&self.config.color, self.sequence),
        )))
    }

    fn stop(&mut self) {
        self.running = false;
    }
}

fn in_subject(x: u32, y: u32, width: u32, height: u32) -> bool {
    (width / 4..width * 3 / 4).contains(&x) && (height / 4..height * 3 / 4).contains(&y)
}

fn render_depth(stream: &StreamConfig, sequence: u64) -> DepthFrame {
    let (w, h) = (stream.width, stream.height);
    let mut data = Vec::with_capacity(w as usize * h as usize);
    for y in 0..h {
        let t = y as f32 / (h.max(2) - 1) as f32;
        let plane = PLANE_NEAR_MM as f32 + t * (PLANE_FAR_MM - PLANE_NEAR_MM) as f32;
        for x in 0..w {
            let depth = if x < INVALID_BAND_COLS {
                0
            } else if in_subject(x, y, w, h) {
                SUBJECT_MM
            } else {
                plane.round() as u16
            };
            data.push(depth);
        }
    }
    DepthFrame::new(data, w, h, DEFAULT_DEPTH_SCALE, sequence)
}

fn render_color(stream: &StreamConfig, sequence: u64) -> Frame {
    let (w, h) = (stream.width, stream.height);
    let mut data = Vec::with_capacity(w as usize * h as usize * 3);
    for y in 0..h {
        let shade = (y * 255 / h.max(1)) as u8;
        for x in 0..w {
            if in_subject(x, y, w, h) {
                data.extend_from_slice(&SUBJECT_RGB);
            } else {
                data.extend_from_slice(&[shade, shade / 2, 255 - shade]);
            }
        }
    }
    Frame::new(data, w, h, 3, sequence)
}
