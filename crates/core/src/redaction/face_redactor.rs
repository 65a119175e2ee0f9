use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::detection_box::DetectionBox;
use crate::shared::frame::Frame;

use super::domain::frame_redactor::FrameRedactor;

/// Result of one redaction pass.
#[derive(Clone, Debug, PartialEq)]
pub struct Redaction {
    pub color: Frame,
    pub depth: Frame,
    /// Boxes that were filled, in color-frame coordinates. Empty when
    /// redaction was disabled or no face was found.
    pub boxes: Vec<DetectionBox>,
}

/// Detects faces on the color image and blanks the same rectangles in the
/// color image and the aligned depth visualization.
///
/// Every detection is redacted unless a confidence floor is configured.
pub struct FaceRedactor {
    detector: Box<dyn FaceDetector>,
    redactor: Box<dyn FrameRedactor>,
    min_confidence: Option<f32>,
}

impl FaceRedactor {
    pub fn new(detector: Box<dyn FaceDetector>, redactor: Box<dyn FrameRedactor>) -> Self {
        Self {
            detector,
            redactor,
            min_confidence: None,
        }
    }

    pub fn with_min_confidence(mut self, min_confidence: Option<f32>) -> Self {
        self.min_confidence = min_confidence;
        self
    }

    /// With `enabled == false` both images come back untouched and the
    /// detector is not run.
    pub fn redact(
        &mut self,
        mut color: Frame,
        mut depth: Frame,
        enabled: bool,
    ) -> Result<Redaction, Box<dyn std::error::Error>> {
        if !enabled {
            return Ok(Redaction {
                color,
                depth,
                boxes: Vec::new(),
            });
        }
        if !color.same_extent(&depth) {
            return Err(format!(
                "color {}x{} and depth {}x{} are not aligned",
                color.width(),
                color.height(),
                depth.width(),
                depth.height()
            )
            .into());
        }

        let mut boxes = self.detector.detect(&color)?;
        if let Some(floor) = self.min_confidence {
            boxes.retain(|b| b.confidence >= floor);
        }

        self.redactor.redact(&mut color, &boxes)?;
        self.redactor.redact(&mut depth, &boxes)?;
        Ok(Redaction {
            color,
            depth,
            boxes,
        })
    }
}
