//! Pinhole camera model and the depth-to-color rigid transform.
//!
//! Conventions follow librealsense: pixel centres sit at integer
//! coordinates, rotations are stored column-major, and lens distortion is
//! ignored (the D400 color stream reports near-zero coefficients).

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub width: u32,
    pub height: u32,
    pub fx: f32,
    pub fy: f32,
    pub ppx: f32,
    pub ppy: f32,
}

impl Intrinsics {
    /// Pixel `(u, v)` at `depth_m` metres to a 3D point in the camera frame.
    pub fn deproject(&self, u: f32, v: f32, depth_m: f32) -> [f32; 3] {
        let x = (u - self.ppx) / self.fx;
        let y = (v - self.ppy) / self.fy;
        [x * depth_m, y * depth_m, depth_m]
    }

    /// 3D point to pixel coordinates. Returns `None` for points at or
    /// behind the image plane.
    pub fn project(&self, point: [f32; 3]) -> Option<[f32; 2]> {
        if point[2] <= 0.0 {
            return None;
        }
        Some([
            point[0] / point[2] * self.fx + self.ppx,
            point[1] / point[2] * self.fy + self.ppy,
        ])
    }

    /// Ideal centred pinhole for a sensor of the given size and focal length.
    pub fn centred(width: u32, height: u32, focal: f32) -> Self {
        Self {
            width,
            height,
            fx: focal,
            fy: focal,
            ppx: (width as f32 - 1.0) / 2.0,
            ppy: (height as f32 - 1.0) / 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Extrinsics {
    /// 3x3 rotation, column-major.
    pub rotation: [f32; 9],
    /// Translation in metres.
    pub translation: [f32; 3],
}

impl Extrinsics {
    pub fn identity() -> Self {
        Self {
            rotation: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
            translation: [0.0; 3],
        }
    }

    pub fn transform(&self, p: [f32; 3]) -> [f32; 3] {
        let r = &self.rotation;
        let t = &self.translation;
        [
            r[0] * p[0] + r[3] * p[1] + r[6] * p[2] + t[0],
            r[1] * p[0] + r[4] * p[1] + r[7] * p[2] + t[1],
            r[2] * p[0] + r[5] * p[1] + r[8] * p[2] + t[2],
        ]
    }
}

impl Default for Extrinsics {
    fn default() -> Self {
        Self::identity()
    }
}

/// Everything needed to re-project depth samples into the color grid.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub depth: Intrinsics,
    pub color: Intrinsics,
    pub depth_to_color: Extrinsics,
    /// Metres per raw depth unit.
    pub depth_scale: f32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn intrinsics() -> Intrinsics {
        Intrinsics {
            width: 640,
            height: 480,
            fx: 600.0,
            fy: 610.0,
            ppx: 320.5,
            ppy: 240.25,
        }
    }

    #[test]
    fn test_deproject_then_project_returns_pixel() {
        let intr = intrinsics();
        let p = intr.deproject(100.0, 50.0, 1.7);
        let px = intr.project(p).unwrap();
        assert_relative_eq!(px[0], 100.0, epsilon = 1e-3);
        assert_relative_eq!(px[1], 50.0, epsilon = 1e-3);
    }

    #[test]
    fn test_principal_point_lies_on_axis() {
        let p = intrinsics().deproject(320.5, 240.25, 2.0);
        assert_relative_eq!(p[0], 0.0);
        assert_relative_eq!(p[1], 0.0);
        assert_relative_eq!(p[2], 2.0);
    }

    #[test]
    fn test_project_rejects_points_behind_camera() {
        assert!(intrinsics().project([0.1, 0.1, 0.0]).is_none());
        assert!(intrinsics().project([0.1, 0.1, -1.0]).is_none());
    }

    #[test]
    fn test_identity_extrinsics_is_noop() {
        let p = [0.3, -0.2, 1.1];
        assert_eq!(Extrinsics::identity().transform(p), p);
    }

    #[test]
    fn test_rotation_is_column_major() {
        // 90 degrees about z: x axis maps onto y axis
        let e = Extrinsics {
            rotation: [0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0],
            translation: [0.0, 0.0, 0.5],
        };
        let p = e.transform([1.0, 0.0, 0.0]);
        assert_relative_eq!(p[0], 0.0);
        assert_relative_eq!(p[1], 1.0);
        assert_relative_eq!(p[2], 0.5);
    }

    #[test]
    fn test_calibration_serializes_to_json() {
        let calib = Calibration {
            depth: intrinsics(),
            color: Intrinsics::centred(640, 480, 615.0),
            depth_to_color: Extrinsics::identity(),
            depth_scale: 0.001,
        };
        let json = serde_json::to_string(&calib).unwrap();
        let back: Calibration = serde_json::from_str(&json).unwrap();
        assert_eq!(back, calib);
    }
}
