use std::path::Path;

use crate::shared::depth_frame::DepthFrame;
use crate::shared::frame::Frame;

/// Persists captured images. The file format follows the path's extension.
pub trait ImageWriter: Send {
    /// Writes an 8-bit RGB frame (color or colorized depth).
    fn write_frame(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>>;

    /// Writes raw depth units losslessly as 16-bit grayscale.
    fn write_depth(&self, path: &Path, depth: &DepthFrame)
        -> Result<(), Box<dyn std::error::Error>>;
}
