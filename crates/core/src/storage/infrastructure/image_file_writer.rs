use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, Luma, RgbImage};

use crate::shared::depth_frame::DepthFrame;
use crate::shared::frame::Frame;
use crate::storage::domain::image_writer::ImageWriter;

const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Writes frames with the `image` crate.
///
/// JPEG output uses a fixed quality; every other format is picked from the
/// extension with the encoder's defaults.
pub struct ImageFileWriter {
    jpeg_quality: u8,
}

impl ImageFileWriter {
    pub fn new() -> Self {
        Self {
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_jpeg_quality(quality: u8) -> Self {
        Self {
            jpeg_quality: quality.clamp(1, 100),
        }
    }
}

impl Default for ImageFileWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

fn is_jpeg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("jpg") || e.eq_ignore_ascii_case("jpeg"))
}

impl ImageWriter for ImageFileWriter {
    fn write_frame(&self, path: &Path, frame: &Frame) -> Result<(), Box<dyn std::error::Error>> {
        if frame.channels() != 3 {
            return Err(format!("expected an RGB frame, got {} channels", frame.channels()).into());
        }
        ensure_parent(path)?;

        let img = RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("frame buffer does not match its dimensions")?;

        if is_jpeg(path) {
            let out = BufWriter::new(File::create(path)?);
            JpegEncoder::new_with_quality(out, self.jpeg_quality).encode_image(&img)?;
        } else {
            img.save(path)?;
        }
        Ok(())
    }

    fn write_depth(
        &self,
        path: &Path,
        depth: &DepthFrame,
    ) -> Result<(), Box<dyn std::error::Error>> {
        ensure_parent(path)?;
        let img: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::from_raw(depth.width(), depth.height(), depth.data().to_vec())
                .ok_or("depth buffer does not match its dimensions")?;
        img.save(path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: u32, height: u32) -> Frame {
        let data = (0..width * height)
            .flat_map(|i| [(i % 256) as u8, 64, 200])
            .collect();
        Frame::new(data, width, height, 3, 0)
    }

    #[test]
    fn test_color_frame_as_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("color_00000.jpeg");
        ImageFileWriter::new().write_frame(&path, &gradient(64, 48)).unwrap();

        let img = image::open(&path).unwrap();
        assert_eq!((img.width(), img.height()), (64, 48));
        assert_eq!(image::ImageFormat::from_path(&path).unwrap(), image::ImageFormat::Jpeg);
    }

    #[test]
    fn test_colorized_depth_as_tiff_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depth_00000.tiff");
        let frame = gradient(20, 10);
        ImageFileWriter::new().write_frame(&path, &frame).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.as_raw(), frame.data());
    }

    #[test]
    fn test_raw_depth_as_16_bit_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("depth_raw_00000.png");
        let data: Vec<u16> = (0..12).map(|i| i * 5000).collect();
        let depth = DepthFrame::new(data.clone(), 4, 3, 0.001, 0);
        ImageFileWriter::new().write_depth(&path, &depth).unwrap();

        let img = image::open(&path).unwrap().into_luma16();
        assert_eq!(img.as_raw(), &data);
    }

    #[test]
    fn test_parent_directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subject-1").join("kitchen").join("color.jpeg");
        ImageFileWriter::default().write_frame(&path, &gradient(8, 8)).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_gray_frame_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let frame = Frame::new(vec![0; 16], 4, 4, 1, 0);
        let result = ImageFileWriter::new().write_frame(&dir.path().join("x.png"), &frame);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_extension_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = ImageFileWriter::new().write_frame(&dir.path().join("x.unknown"), &gradient(4, 4));
        assert!(result.is_err());
    }

    #[test]
    fn test_jpeg_quality_is_clamped() {
        assert_eq!(ImageFileWriter::with_jpeg_quality(0).jpeg_quality, 1);
        assert_eq!(ImageFileWriter::with_jpeg_quality(200).jpeg_quality, 100);
    }
}
