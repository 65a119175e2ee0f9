use crate::redaction::domain::frame_redactor::FrameRedactor;
use crate::shared::detection_box::DetectionBox;
use crate::shared::frame::Frame;

/// Paints each box with an opaque color.
///
/// On frames with fewer than three channels the first component of the fill
/// color is used for every channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SolidFillRedactor {
    fill: [u8; 3],
}

impl SolidFillRedactor {
    pub fn new(fill: [u8; 3]) -> Self {
        Self { fill }
    }

    pub fn fill(&self) -> [u8; 3] {
        self.fill
    }

    fn pixel_value(&self, channels: usize) -> Vec<u8> {
        if channels >= 3 {
            let mut px = vec![255u8; channels];
            px[..3].copy_from_slice(&self.fill);
            px
        } else {
            vec![self.fill[0]; channels]
        }
    }
}

impl Default for SolidFillRedactor {
    fn default() -> Self {
        Self::new([0, 0, 0])
    }
}

impl FrameRedactor for SolidFillRedactor {
    fn redact(
        &self,
        frame: &mut Frame,
        boxes: &[DetectionBox],
    ) -> Result<(), Box<dyn std::error::Error>> {
        let fw = frame.width() as usize;
        let channels = frame.channels() as usize;
        let px = self.pixel_value(channels);
        let (width, height) = (frame.width(), frame.height());
        let data = frame.data_mut();

        for b in boxes {
            let Some((x0, y0, x1, y1)) = b.clip_to(width, height) else {
                continue;
            };
            for y in y0 as usize..y1 as usize {
                let start = (y * fw + x0 as usize) * channels;
                let end = (y * fw + x1 as usize) * channels;
                for dst in data[start..end].chunks_exact_mut(channels) {
                    dst.copy_from_slice(&px);
                }
            }
        }
        Ok(())
    }
}
