use crate::shared::calibration::Calibration;
use crate::shared::depth_frame::DepthFrame;

/// Re-samples `depth` onto a `color_w` x `color_h` grid so that pixel
/// `(x, y)` of the result and of the color frame see the same point.
///
/// Each valid depth pixel is treated as a square footprint: both opposite
/// corners are deprojected, moved into the color camera and projected, and
/// every color pixel the footprint spans takes the depth of the pixel
/// centre, measured along the color camera's axis. Where footprints
/// collide the nearest surface wins. Color pixels nothing maps to stay 0.
pub fn align_depth_to_color(
    depth: &DepthFrame,
    calibration: &Calibration,
    color_w: u32,
    color_h: u32,
) -> DepthFrame {
    let mut out = DepthFrame::zeroed(color_w, color_h, depth.depth_scale(), depth.sequence());
    if color_w == 0 || color_h == 0 {
        return out;
    }

    let d_intr = &calibration.depth;
    let c_intr = &calibration.color;
    let extr = &calibration.depth_to_color;
    let scale = depth.depth_scale();
    let max_x = color_w as i64 - 1;
    let max_y = color_h as i64 - 1;
    let out_w = color_w as usize;
    let out_data = out.data_mut();

    for v in 0..depth.height() {
        for u in 0..depth.width() {
            let raw = depth.raw(u, v);
            if raw == 0 {
                continue;
            }
            let z = raw as f32 * scale;
            let (uf, vf) = (u as f32, v as f32);

            let centre = extr.transform(d_intr.deproject(uf, vf, z));
            let Some(corner0) = c_intr.project(extr.transform(d_intr.deproject(uf - 0.5, vf - 0.5, z)))
            else {
                continue;
            };
            let Some(corner1) = c_intr.project(extr.transform(d_intr.deproject(uf + 0.5, vf + 0.5, z)))
            else {
                continue;
            };

            let aligned = (centre[2] / scale).round();
            if !(aligned >= 1.0 && aligned <= u16::MAX as f32) {
                continue;
            }
            let aligned = aligned as u16;

            let (x0, x1) = ordered(to_pixel(corner0[0]), to_pixel(corner1[0]));
            let (y0, y1) = ordered(to_pixel(corner0[1]), to_pixel(corner1[1]));
            if x1 < 0 || y1 < 0 || x0 > max_x || y0 > max_y {
                continue;
            }

            for y in y0.max(0)..=y1.min(max_y) {
                let row = y as usize * out_w;
                for x in x0.max(0)..=x1.min(max_x) {
                    let slot = &mut out_data[row + x as usize];
                    if *slot == 0 || aligned < *slot {
                        *slot = aligned;
                    }
                }
            }
        }
    }

    out
}

fn to_pixel(coord: f32) -> i64 {
    (coord + 0.5).floor() as i64
}

fn ordered(a: i64, b: i64) -> (i64, i64) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}
