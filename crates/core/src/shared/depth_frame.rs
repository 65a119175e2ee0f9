use super::detection_box::DetectionBox;

/// Default RealSense depth unit: one raw step is one millimetre.
pub const DEFAULT_DEPTH_SCALE: f32 = 0.001;

/// Raw per-pixel depth in sensor units (`Z16`). Zero means "no data".
#[derive(Clone, Debug, PartialEq)]
pub struct DepthFrame {
    data: Vec<u16>,
    width: u32,
    height: u32,
    depth_scale: f32,
    sequence: u64,
}

impl DepthFrame {
    pub fn new(data: Vec<u16>, width: u32, height: u32, depth_scale: f32, sequence: u64) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize),
            "data length must equal width * height"
        );
        Self {
            data,
            width,
            height,
            depth_scale,
            sequence,
        }
    }

    /// An all-invalid frame.
    pub fn zeroed(width: u32, height: u32, depth_scale: f32, sequence: u64) -> Self {
        Self::new(
            vec![0; width as usize * height as usize],
            width,
            height,
            depth_scale,
            sequence,
        )
    }

    pub fn data(&self) -> &[u16] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u16] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Metres per raw depth unit.
    pub fn depth_scale(&self) -> f32 {
        self.depth_scale
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn raw(&self, x: u32, y: u32) -> u16 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    /// Distance in metres at `(x, y)`; 0.0 where the sensor has no data.
    pub fn distance(&self, x: u32, y: u32) -> f32 {
        self.raw(x, y) as f32 * self.depth_scale
    }

    /// Marks every pixel inside the box (clipped to the frame) as invalid.
    pub fn clear_region(&mut self, region: &DetectionBox) {
        let Some((x0, y0, x1, y1)) = region.clip_to(self.width, self.height) else {
            return;
        };
        let w = self.width as usize;
        for y in y0..y1 {
            let row = y as usize * w;
            self.data[row + x0 as usize..row + x1 as usize].fill(0);
        }
    }
}
