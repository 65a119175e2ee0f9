use std::fmt;

/// Depth color ramps, numbered like the librealsense colorizer presets.
///
/// The first stop is used for the nearest depth and the last for the
/// farthest; intermediate values interpolate linearly between evenly
/// spaced stops.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorScheme {
    Jet,
    Classic,
    WhiteToBlack,
    BlackToWhite,
}

const JET: &[[u8; 3]] = &[
    [0, 0, 255],
    [0, 255, 255],
    [255, 255, 0],
    [255, 0, 0],
    [50, 0, 0],
];
const CLASSIC: &[[u8; 3]] = &[
    [30, 77, 203],
    [25, 60, 192],
    [45, 117, 220],
    [204, 108, 191],
    [196, 57, 178],
    [198, 33, 24],
];
const WHITE_TO_BLACK: &[[u8; 3]] = &[[255, 255, 255], [0, 0, 0]];
const BLACK_TO_WHITE: &[[u8; 3]] = &[[0, 0, 0], [255, 255, 255]];

impl ColorScheme {
    pub const ALL: &[ColorScheme] = &[
        ColorScheme::Jet,
        ColorScheme::Classic,
        ColorScheme::WhiteToBlack,
        ColorScheme::BlackToWhite,
    ];

    pub fn from_preset(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn preset(self) -> u8 {
        match self {
            ColorScheme::Jet => 0,
            ColorScheme::Classic => 1,
            ColorScheme::WhiteToBlack => 2,
            ColorScheme::BlackToWhite => 3,
        }
    }

    fn stops(self) -> &'static [[u8; 3]] {
        match self {
            ColorScheme::Jet => JET,
            ColorScheme::Classic => CLASSIC,
            ColorScheme::WhiteToBlack => WHITE_TO_BLACK,
            ColorScheme::BlackToWhite => BLACK_TO_WHITE,
        }
    }

    /// Color at normalized position `t` (clamped to `0.0..=1.0`).
    pub fn color_at(self, t: f32) -> [u8; 3] {
        let stops = self.stops();
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let pos = t * (stops.len() - 1) as f32;
        let lo = (pos.floor() as usize).min(stops.len() - 1);
        let hi = (lo + 1).min(stops.len() - 1);
        let frac = pos - lo as f32;

        let mut out = [0u8; 3];
        for c in 0..3 {
            let a = stops[lo][c] as f32;
            let b = stops[hi][c] as f32;
            out[c] = (a + (b - a) * frac).round() as u8;
        }
        out
    }
}

impl fmt::Display for ColorScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorScheme::Jet => write!(f, "Jet"),
            ColorScheme::Classic => write!(f, "Classic"),
            ColorScheme::WhiteToBlack => write!(f, "White to Black"),
            ColorScheme::BlackToWhite => write!(f, "Black to White"),
        }
    }
}
