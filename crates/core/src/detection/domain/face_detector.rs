use crate::shared::detection_box::DetectionBox;
use crate::shared::frame::Frame;

/// Domain interface for face detection on a color frame.
///
/// Boxes are returned in the frame's own pixel coordinates, whatever
/// resolution the underlying model runs at. Finding no faces is an empty
/// vector, not an error.
pub trait FaceDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionBox>, Box<dyn std::error::Error>>;
}
