/// A face detector's rectangle in color-frame pixel coordinates.
///
/// The rectangle is half-open: it covers columns `x..x + width` and rows
/// `y..y + height`. Coordinates may lie partly or fully outside the frame;
/// consumers clip with [`DetectionBox::clip_to`] before touching pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectionBox {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub confidence: f32,
}

impl DetectionBox {
    pub fn new(x: i32, y: i32, width: i32, height: i32, confidence: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            confidence,
        }
    }

    /// Builds a box from detector output, truncating coordinates toward zero.
    pub fn from_float(x: f32, y: f32, width: f32, height: f32, confidence: f32) -> Self {
        Self::new(x as i32, y as i32, width as i32, height as i32, confidence)
    }

    /// Intersection with a `frame_w` x `frame_h` image as `(x0, y0, x1, y1)`,
    /// end-exclusive, or `None` if nothing of the box lies inside the image.
    pub fn clip_to(&self, frame_w: u32, frame_h: u32) -> Option<(u32, u32, u32, u32)> {
        let fw = i64::from(frame_w);
        let fh = i64::from(frame_h);
        let x0 = i64::from(self.x).clamp(0, fw);
        let y0 = i64::from(self.y).clamp(0, fh);
        let x1 = (i64::from(self.x) + i64::from(self.width.max(0))).clamp(0, fw);
        let y1 = (i64::from(self.y) + i64::from(self.height.max(0))).clamp(0, fh);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some((x0 as u32, y0 as u32, x1 as u32, y1 as u32))
    }

    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x
            && py >= self.y
            && i64::from(px) < i64::from(self.x) + i64::from(self.width)
            && i64::from(py) < i64::from(self.y) + i64::from(self.height)
    }
}
