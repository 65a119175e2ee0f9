use crate::shared::detection_box::DetectionBox;
use crate::shared::frame::Frame;

/// Domain interface for obscuring rectangular regions of a frame.
///
/// Implementations modify the frame in place and must clip every box to the
/// frame extent; a box outside the frame is a no-op, never an error.
pub trait FrameRedactor: Send {
    fn redact(&self, frame: &mut Frame, boxes: &[DetectionBox])
        -> Result<(), Box<dyn std::error::Error>>;
}
