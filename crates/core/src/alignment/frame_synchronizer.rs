use std::time::Duration;

use crate::capture::domain::capture_error::CaptureError;
use crate::capture::domain::frame_set::{AlignedFrameSet, FrameSet};
use crate::capture::sensor_session::SensorSession;
use crate::shared::calibration::Calibration;
use crate::shared::stream_config::StreamKind;

use super::depth_aligner::align_depth_to_color;

/// Pulls matched depth+color sets from a session and aligns depth to the
/// color grid. Color is always the reference frame.
pub struct FrameSynchronizer {
    timeout: Duration,
}

impl FrameSynchronizer {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Blocks until the next complete set is ready and aligned.
    ///
    /// Fails with `FrameTimeout` when nothing arrives within the timeout,
    /// `IncompleteFrameSet` when the driver delivered only one stream, and
    /// `SessionClosed` when the session is closed while waiting.
    pub fn next_aligned_frame_set(
        &self,
        session: &mut SensorSession,
    ) -> Result<AlignedFrameSet, CaptureError> {
        let frames = session.wait_for_frames(self.timeout)?;
        align(frames, &session.calibration())
    }
}

/// Aligns a delivered set, refusing sets with a missing component.
pub fn align(frames: FrameSet, calibration: &Calibration) -> Result<AlignedFrameSet, CaptureError> {
    let depth = frames
        .depth
        .ok_or(CaptureError::IncompleteFrameSet(StreamKind::Depth))?;
    let color = frames
        .color
        .ok_or(CaptureError::IncompleteFrameSet(StreamKind::Color))?;

    let depth = align_depth_to_color(&depth, calibration, color.width(), color.height());
    Ok(AlignedFrameSet { depth, color })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::infrastructure::synthetic_sensor::SyntheticSensor;
    use crate::shared::calibration::{Extrinsics, Intrinsics};
    use crate::shared::depth_frame::DepthFrame;
    use crate::shared::frame::Frame;
    use crate::shared::stream_config::CaptureConfig;

    fn calibration() -> Calibration {
        Calibration {
            depth: Intrinsics::centred(8, 6, 8.0),
            color: Intrinsics::centred(8, 6, 8.0),
            depth_to_color: Extrinsics::identity(),
            depth_scale: 0.001,
        }
    }

    #[test]
    fn test_color_only_set_is_incomplete() {
        let frames = FrameSet {
            depth: None,
            color: Some(Frame::filled(8, 6, [0, 0, 0], 0)),
        };
        let err = align(frames, &calibration()).unwrap_err();
        assert_eq!(err, CaptureError::IncompleteFrameSet(StreamKind::Depth));
    }

    #[test]
    fn test_depth_only_set_is_incomplete() {
        let frames = FrameSet {
            depth: Some(DepthFrame::zeroed(8, 6, 0.001, 0)),
            color: None,
        };
        let err = align(frames, &calibration()).unwrap_err();
        assert_eq!(err, CaptureError::IncompleteFrameSet(StreamKind::Color));
    }

    #[test]
    fn test_aligned_depth_matches_color_extent() {
        let frames = FrameSet::complete(
            DepthFrame::new(vec![900; 48], 8, 6, 0.001, 3),
            Frame::filled(8, 6, [5, 5, 5], 3),
        );
        let aligned = align(frames, &calibration()).unwrap();
        assert!(aligned.depth.width() == aligned.color.width());
        assert!(aligned.depth.height() == aligned.color.height());
        assert_eq!(aligned.depth.raw(4, 3), 900);
    }

    #[test]
    fn test_next_aligned_frame_set_from_session() {
        let mut sensor = SyntheticSensor::with_serial("synchronizer-test");
        let mut session = SensorSession::open(&mut sensor, CaptureConfig::matched(32, 24, 30)).unwrap();
        let sync = FrameSynchronizer::new(Duration::from_secs(1));
        let aligned = sync.next_aligned_frame_set(&mut session).unwrap();
        assert_eq!((aligned.color.width(), aligned.color.height()), (32, 24));
        assert_eq!((aligned.depth.width(), aligned.depth.height()), (32, 24));
        assert_eq!(aligned.depth.raw(16, 12), 800);
    }

    #[test]
    fn test_closed_session_fails() {
        let mut sensor = SyntheticSensor::with_serial("synchronizer-closed-test");
        let mut session = SensorSession::open(&mut sensor, CaptureConfig::matched(8, 8, 30)).unwrap();
        session.close();
        let sync = FrameSynchronizer::new(Duration::from_secs(1));
        assert_eq!(
            sync.next_aligned_frame_set(&mut session).unwrap_err(),
            CaptureError::SessionClosed
        );
    }
}
