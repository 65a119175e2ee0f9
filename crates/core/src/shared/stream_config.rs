use std::fmt;

use serde::{Deserialize, Serialize};

use super::constants::{TARGET_FPS, TARGET_HEIGHT, TARGET_WIDTH};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StreamKind {
    Depth,
    Color,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Depth => write!(f, "depth"),
            StreamKind::Color => write!(f, "color"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 16-bit unsigned depth in sensor units.
    Z16,
    Rgb8,
    Bgr8,
}

impl PixelFormat {
    /// Whether a stream of `kind` can be delivered in this format.
    pub fn fits(self, kind: StreamKind) -> bool {
        match kind {
            StreamKind::Depth => self == PixelFormat::Z16,
            StreamKind::Color => matches!(self, PixelFormat::Rgb8 | PixelFormat::Bgr8),
        }
    }
}

/// One stream's immutable profile, fixed when the session starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub fps: u32,
}

/// Profiles for both streams of a capture session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub depth: StreamConfig,
    pub color: StreamConfig,
}

impl CaptureConfig {
    /// Same resolution and rate on both streams, Z16 depth and RGB color.
    pub fn matched(width: u32, height: u32, fps: u32) -> Self {
        Self {
            depth: StreamConfig {
                width,
                height,
                format: PixelFormat::Z16,
                fps,
            },
            color: StreamConfig {
                width,
                height,
                format: PixelFormat::Rgb8,
                fps,
            },
        }
    }
}

impl CaptureConfig {
    /// First stream whose format it cannot carry, if any.
    pub fn unsupported_format(&self) -> Option<(StreamKind, PixelFormat)> {
        [
            (StreamKind::Depth, self.depth.format),
            (StreamKind::Color, self.color.format),
        ]
        .into_iter()
        .find(|(kind, format)| !format.fits(*kind))
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::matched(TARGET_WIDTH, TARGET_HEIGHT, TARGET_FPS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_is_vga_at_six_fps() {
        let config = CaptureConfig::default();
        assert_eq!((config.depth.width, config.depth.height), (640, 480));
        assert_eq!((config.color.width, config.color.height), (640, 480));
        assert_eq!(config.depth.fps, 6);
        assert_eq!(config.depth.format, PixelFormat::Z16);
        assert_eq!(config.color.format, PixelFormat::Rgb8);
    }

    #[test]
    fn test_stream_kind_display() {
        assert_eq!(StreamKind::Depth.to_string(), "depth");
        assert_eq!(StreamKind::Color.to_string(), "color");
    }

    #[rstest]
    #[case::z16_depth(PixelFormat::Z16, StreamKind::Depth, true)]
    #[case::rgb_depth(PixelFormat::Rgb8, StreamKind::Depth, false)]
    #[case::rgb_color(PixelFormat::Rgb8, StreamKind::Color, true)]
    #[case::bgr_color(PixelFormat::Bgr8, StreamKind::Color, true)]
    #[case::z16_color(PixelFormat::Z16, StreamKind::Color, false)]
    fn test_format_fits_stream(
        #[case] format: PixelFormat,
        #[case] kind: StreamKind,
        #[case] expected: bool,
    ) {
        assert_eq!(format.fits(kind), expected);
    }

    #[test]
    fn test_unsupported_format_reports_first_bad_stream() {
        let mut config = CaptureConfig::default();
        assert_eq!(config.unsupported_format(), None);

        config.color.format = PixelFormat::Bgr8;
        assert_eq!(config.unsupported_format(), None);

        config.depth.format = PixelFormat::Rgb8;
        assert_eq!(
            config.unsupported_format(),
            Some((StreamKind::Depth, PixelFormat::Rgb8))
        );
    }
}
