use crate::shared::depth_frame::DepthFrame;
use crate::shared::frame::Frame;

use super::color_scheme::ColorScheme;

/// Color used for pixels with no depth reading.
pub const INVALID_DEPTH_RGB: [u8; 3] = [0, 0, 0];

const HISTOGRAM_BINS: usize = u16::MAX as usize + 1;

/// Maps a depth image onto an RGB visualization.
///
/// With histogram equalization the ramp position of each pixel is its rank
/// among the valid depths of the same frame, so the full ramp is used no
/// matter how the scene is spread out. Otherwise depths are placed linearly
/// between `min_distance_m` and `max_distance_m` and clamped at both ends.
/// Zero depth always renders as [`INVALID_DEPTH_RGB`].
#[derive(Clone, Debug)]
pub struct DepthColorizer {
    scheme: ColorScheme,
    equalize: bool,
    min_distance_m: f32,
    max_distance_m: f32,
}

impl DepthColorizer {
    pub fn new(scheme: ColorScheme) -> Self {
        Self {
            scheme,
            equalize: true,
            min_distance_m: 0.0,
            max_distance_m: 6.0,
        }
    }

    pub fn with_equalization(mut self, equalize: bool) -> Self {
        self.equalize = equalize;
        self
    }

    pub fn with_range(mut self, min_distance_m: f32, max_distance_m: f32) -> Self {
        self.min_distance_m = min_distance_m;
        self.max_distance_m = max_distance_m;
        self
    }

    pub fn scheme(&self) -> ColorScheme {
        self.scheme
    }

    pub fn colorize(&self, depth: &DepthFrame) -> Frame {
        let mut data = Vec::with_capacity(depth.data().len() * 3);

        if self.equalize {
            let cumulative = cumulative_histogram(depth.data());
            let total = cumulative[HISTOGRAM_BINS - 1];
            for &raw in depth.data() {
                if raw == 0 || total == 0 {
                    data.extend_from_slice(&INVALID_DEPTH_RGB);
                } else {
                    let t = cumulative[raw as usize] as f32 / total as f32;
                    data.extend_from_slice(&self.scheme.color_at(t));
                }
            }
        } else {
            let scale = depth.depth_scale();
            let span = self.max_distance_m - self.min_distance_m;
            for &raw in depth.data() {
                if raw == 0 {
                    data.extend_from_slice(&INVALID_DEPTH_RGB);
                    continue;
                }
                let meters = raw as f32 * scale;
                let t = if span > 0.0 {
                    (meters - self.min_distance_m) / span
                } else {
                    1.0
                };
                data.extend_from_slice(&self.scheme.color_at(t));
            }
        }

        Frame::new(data, depth.width(), depth.height(), 3, depth.sequence())
    }
}

/// Running count of valid pixels at or below each raw depth value.
fn cumulative_histogram(raw: &[u16]) -> Vec<u32> {
    let mut histogram = vec![0u32; HISTOGRAM_BINS];
    for &d in raw {
        if d != 0 {
            histogram[d as usize] += 1;
        }
    }
    for i in 1..HISTOGRAM_BINS {
        histogram[i] += histogram[i - 1];
    }
    histogram
}
