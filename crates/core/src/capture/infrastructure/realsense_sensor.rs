//! Intel RealSense backend through `realsense-rust`.
//!
//! Streams depth and color in the configured formats (Z16 depth, RGB8 or
//! BGR8 color). Calibration is read from the active stream profiles; the
//! depth scale is refreshed from each depth frame's reported units.

use std::collections::HashSet;
use std::convert::TryFrom;
use std::ffi::CString;
use std::time::Duration;

use realsense_rust::base::Rs2Intrinsics;
use realsense_rust::config::Config;
use realsense_rust::context::Context;
use realsense_rust::frame::{ColorFrame, DepthFrame as RsDepthFrame, FrameEx};
use realsense_rust::kind::{Rs2CameraInfo, Rs2Format, Rs2ProductLine, Rs2StreamKind};
use realsense_rust::pipeline::{ActivePipeline, FrameWaitError, InactivePipeline};

use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::depth_sensor::{check_formats, DepthSensor, DeviceInfo, FrameSource};
use crate::capture::domain::frame_set::FrameSet;
use crate::shared::calibration::{Calibration, Extrinsics, Intrinsics};
use crate::shared::depth_frame::{DepthFrame, DEFAULT_DEPTH_SCALE};
use crate::shared::frame::Frame;
use crate::shared::stream_config::{CaptureConfig, PixelFormat};

fn rs2_format(format: PixelFormat) -> Rs2Format {
    match format {
        PixelFormat::Z16 => Rs2Format::Z16,
        PixelFormat::Rgb8 => Rs2Format::Rgb8,
        PixelFormat::Bgr8 => Rs2Format::Bgr8,
    }
}

fn backend<E: std::fmt::Display>(e: E) -> CaptureError {
    CaptureError::Backend(e.to_string())
}

pub struct RealsenseSensor {
    context: Context,
}

// SAFETY: the librealsense context is only touched from the thread that
// currently owns the sensor; it is moved, never shared.
unsafe impl Send for RealsenseSensor {}

impl RealsenseSensor {
    pub fn new() -> Result<Self, CaptureError> {
        Ok(Self {
            context: Context::new().map_err(backend)?,
        })
    }
}

impl DepthSensor for RealsenseSensor {
    fn devices(&self) -> Result<Vec<DeviceInfo>, CaptureError> {
        let mut lines = HashSet::new();
        lines.insert(Rs2ProductLine::Any);
        let devices = self
            .context
            .query_devices(lines)
            .iter()
            .map(|d| DeviceInfo {
                name: d
                    .info(Rs2CameraInfo::Name)
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "RealSense".into()),
                serial: d
                    .info(Rs2CameraInfo::SerialNumber)
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            })
            .collect();
        Ok(devices)
    }

    fn start(
        &mut self,
        device: &DeviceInfo,
        config: &CaptureConfig,
    ) -> Result<Box<dyn FrameSource>, CaptureError> {
        check_formats(config)?;
        let pipeline = InactivePipeline::try_from(&self.context).map_err(backend)?;
        let serial = CString::new(device.serial.as_str()).map_err(backend)?;

        let mut rs_config = Config::new();
        rs_config
            .enable_device_from_serial(&serial)
            .map_err(backend)?
            .disable_all_streams()
            .map_err(backend)?
            .enable_stream(
                Rs2StreamKind::Depth,
                None,
                config.depth.width as usize,
                config.depth.height as usize,
                rs2_format(config.depth.format),
                config.depth.fps as usize,
            )
            .map_err(backend)?
            .enable_stream(
                Rs2StreamKind::Color,
                None,
                config.color.width as usize,
                config.color.height as usize,
                rs2_format(config.color.format),
                config.color.fps as usize,
            )
            .map_err(backend)?;

        // Device contention surfaces here as a start failure.
        let active = pipeline
            .start(Some(rs_config))
            .map_err(|e| CaptureError::DeviceUnavailable {
                serial: device.serial.clone(),
                reason: e.to_string(),
            })?;

        let calibration = read_calibration(&active)?;
        Ok(Box::new(RealsenseSource {
            pipeline: Some(active),
            calibration,
            color_format: config.color.format,
        }))
    }
}

fn to_intrinsics(i: &Rs2Intrinsics) -> Intrinsics {
    Intrinsics {
        width: i.width() as u32,
        height: i.height() as u32,
        fx: i.fx(),
        fy: i.fy(),
        ppx: i.ppx(),
        ppy: i.ppy(),
    }
}

fn read_calibration(active: &ActivePipeline) -> Result<Calibration, CaptureError> {
    let streams = active.profile().streams();
    let depth = streams
        .iter()
        .find(|s| s.kind() == Rs2StreamKind::Depth)
        .ok_or_else(|| backend("depth stream missing from profile"))?;
    let color = streams
        .iter()
        .find(|s| s.kind() == Rs2StreamKind::Color)
        .ok_or_else(|| backend("color stream missing from profile"))?;

    let extrinsics = depth.extrinsics(color).map_err(backend)?;
    Ok(Calibration {
        depth: to_intrinsics(&depth.intrinsics().map_err(backend)?),
        color: to_intrinsics(&color.intrinsics().map_err(backend)?),
        depth_to_color: Extrinsics {
            rotation: extrinsics.rotation(),
            translation: extrinsics.translation(),
        },
        depth_scale: DEFAULT_DEPTH_SCALE,
    })
}

struct RealsenseSource {
    pipeline: Option<ActivePipeline>,
    calibration: Calibration,
    color_format: PixelFormat,
}

// SAFETY: see `RealsenseSensor`; the pipeline handle moves with the source.
unsafe impl Send for RealsenseSource {}

impl FrameSource for RealsenseSource {
    fn calibration(&self) -> Calibration {
        self.calibration
    }

    fn poll(&mut self, timeout: Duration) -> Result<Option<FrameSet>, CaptureError> {
        let pipeline = self.pipeline.as_mut().ok_or(CaptureError::SessionClosed)?;
        let composite = match pipeline.wait(Some(timeout)) {
            Ok(frames) => frames,
            Err(FrameWaitError::DidTimeoutBeforeFrameArrival) => return Ok(None),
            Err(e) => return Err(backend(e)),
        };

        let depth = composite
            .frames_of_type::<RsDepthFrame>()
            .pop()
            .map(|f| convert_depth(&f))
            .transpose()?;
        if let Some(ref d) = depth {
            self.calibration.depth_scale = d.depth_scale();
        }
        let color = composite
            .frames_of_type::<ColorFrame>()
            .pop()
            .map(|f| convert_color(&f, self.color_format))
            .transpose()?;

        Ok(Some(FrameSet { depth, color }))
    }

    fn stop(&mut self) {
        if let Some(active) = self.pipeline.take() {
            let _ = active.stop();
        }
    }
}

/// Raw bytes of an image frame, one `stride`-long row after another.
fn frame_bytes(data: &std::os::raw::c_void, len: usize) -> &[u8] {
    // SAFETY: librealsense guarantees `len` readable bytes at `data` for as
    // long as the frame is alive, and the slice borrows from the frame.
    unsafe { std::slice::from_raw_parts(data as *const std::os::raw::c_void as *const u8, len) }
}

/// Packs `height` rows of `row_len` bytes out of a buffer whose rows are
/// `stride` bytes apart.
fn packed_rows(bytes: &[u8], stride: usize, row_len: usize, height: usize) -> Option<Vec<u8>> {
    if stride < row_len || bytes.len() < stride * height.saturating_sub(1) + row_len {
        return None;
    }
    let mut out = Vec::with_capacity(row_len * height);
    for row in 0..height {
        out.extend_from_slice(&bytes[row * stride..row * stride + row_len]);
    }
    Some(out)
}

fn depth_from_bytes(packed: &[u8]) -> Vec<u16> {
    packed
        .chunks_exact(2)
        .map(|px| u16::from_le_bytes([px[0], px[1]]))
        .collect()
}

fn rgb_from_bytes(mut packed: Vec<u8>, format: PixelFormat) -> Vec<u8> {
    if format == PixelFormat::Bgr8 {
        for px in packed.chunks_exact_mut(3) {
            px.swap(0, 2);
        }
    }
    packed
}

fn convert_depth(frame: &RsDepthFrame) -> Result<DepthFrame, CaptureError> {
    let (w, h) = (frame.width(), frame.height());
    let scale = frame.depth_units().unwrap_or(DEFAULT_DEPTH_SCALE);
    let bytes = frame_bytes(unsafe { frame.get_data() }, frame.get_data_size());
    let packed = packed_rows(bytes, frame.stride(), w * 2, h)
        .ok_or_else(|| backend("depth frame is smaller than its dimensions"))?;
    Ok(DepthFrame::new(
        depth_from_bytes(&packed),
        w as u32,
        h as u32,
        scale,
        frame.frame_number(),
    ))
}

fn convert_color(frame: &ColorFrame, format: PixelFormat) -> Result<Frame, CaptureError> {
    let (w, h) = (frame.width(), frame.height());
    let bytes = frame_bytes(unsafe { frame.get_data() }, frame.get_data_size());
    let packed = packed_rows(bytes, frame.stride(), w * 3, h)
        .ok_or_else(|| backend("color frame is smaller than its dimensions"))?;
    Ok(Frame::new(
        rgb_from_bytes(packed, format),
        w as u32,
        h as u32,
        3,
        frame.frame_number(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::depth(PixelFormat::Z16, Rs2Format::Z16)]
    #[case::rgb(PixelFormat::Rgb8, Rs2Format::Rgb8)]
    #[case::bgr(PixelFormat::Bgr8, Rs2Format::Bgr8)]
    fn test_rs2_format_mapping(#[case] format: PixelFormat, #[case] expected: Rs2Format) {
        assert_eq!(rs2_format(format), expected);
    }

    #[test]
    fn test_packed_rows_drops_stride_padding() {
        let bytes = [1, 2, 9, 9, 3, 4, 9, 9];
        assert_eq!(packed_rows(&bytes, 4, 2, 2).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_packed_rows_rejects_short_buffer() {
        assert!(packed_rows(&[1, 2, 3], 4, 2, 2).is_none());
        assert!(packed_rows(&[1, 2, 3, 4], 1, 2, 2).is_none());
    }

    #[test]
    fn test_depth_bytes_are_little_endian() {
        assert_eq!(depth_from_bytes(&[0xE8, 0x03, 0, 0]), vec![1000, 0]);
    }

    #[test]
    fn test_bgr_is_reordered_to_rgb() {
        assert_eq!(
            rgb_from_bytes(vec![1, 2, 3, 4, 5, 6], PixelFormat::Bgr8),
            vec![3, 2, 1, 6, 5, 4]
        );
        assert_eq!(
            rgb_from_bytes(vec![1, 2, 3], PixelFormat::Rgb8),
            vec![1, 2, 3]
        );
    }
}
