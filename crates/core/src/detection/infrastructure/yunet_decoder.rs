//! Prior generation, head decoding and suppression for the YuNet face model.
//!
//! YuNet predicts offsets relative to a fixed grid of square anchors laid
//! over four feature maps (strides 8, 16, 32, 64). Each anchor contributes
//! 14 regression values (box plus five landmarks), a two-class score and an
//! IoU estimate; the final score is `sqrt(face * clamp(iou, 0, 1))`.

use std::cmp::Ordering;

const MIN_SIZES: [&[f32]; 4] = [&[10.0, 16.0, 24.0], &[32.0, 48.0], &[64.0, 96.0], &[128.0, 192.0, 256.0]];
const STEPS: [f32; 4] = [8.0, 16.0, 32.0, 64.0];
const CENTER_VARIANCE: f32 = 0.1;
const SIZE_VARIANCE: f32 = 0.2;

/// Values per anchor in the `loc` head.
pub const LOC_STRIDE: usize = 14;
/// Values per anchor in the `conf` head (background, face).
pub const CONF_STRIDE: usize = 2;

/// Anchor box, centre and size normalized to the model input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Prior {
    pub cx: f32,
    pub cy: f32,
    pub w: f32,
    pub h: f32,
}

/// Decoded face in model-input pixels, top-left origin.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub score: f32,
}

impl Candidate {
    fn iou(&self, other: &Candidate) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.w).min(other.x + other.w);
        let y2 = (self.y + self.h).min(other.y + other.h);
        let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        if inter <= 0.0 {
            return 0.0;
        }
        inter / (self.w * self.h + other.w * other.h - inter)
    }
}

/// Anchors for a `width` x `height` input, in the order the model emits them.
pub fn generate_priors(width: u32, height: u32) -> Vec<Prior> {
    let mut map_w = ((width + 1) / 2) / 2;
    let mut map_h = ((height + 1) / 2) / 2;
    let (fw, fh) = (width as f32, height as f32);

    let mut priors = Vec::new();
    for (min_sizes, step) in MIN_SIZES.iter().zip(STEPS) {
        map_w /= 2;
        map_h /= 2;
        for row in 0..map_h {
            for col in 0..map_w {
                for &min_size in min_sizes.iter() {
                    priors.push(Prior {
                        cx: (col as f32 + 0.5) * step / fw,
                        cy: (row as f32 + 0.5) * step / fh,
                        w: min_size / fw,
                        h: min_size / fh,
                    });
                }
            }
        }
    }
    priors
}

/// Decodes the three output heads into candidates scoring at least
/// `score_threshold`.
pub fn decode(
    priors: &[Prior],
    loc: &[f32],
    conf: &[f32],
    iou: &[f32],
    input_w: u32,
    input_h: u32,
    score_threshold: f32,
) -> Result<Vec<Candidate>, String> {
    let n = priors.len();
    if loc.len() < n * LOC_STRIDE || conf.len() < n * CONF_STRIDE || iou.len() < n {
        return Err(format!(
            "model heads too short for {n} anchors: loc={} conf={} iou={}",
            loc.len(),
            conf.len(),
            iou.len()
        ));
    }

    let (fw, fh) = (input_w as f32, input_h as f32);
    let mut out = Vec::new();
    for (i, p) in priors.iter().enumerate() {
        let face = conf[i * CONF_STRIDE + 1];
        let quality = iou[i].clamp(0.0, 1.0);
        let score = (face * quality).max(0.0).sqrt();
        if score < score_threshold {
            continue;
        }

        let l = &loc[i * LOC_STRIDE..i * LOC_STRIDE + 4];
        let cx = (p.cx + l[0] * CENTER_VARIANCE * p.w) * fw;
        let cy = (p.cy + l[1] * CENTER_VARIANCE * p.h) * fh;
        let w = p.w * (l[2] * SIZE_VARIANCE).exp() * fw;
        let h = p.h * (l[3] * SIZE_VARIANCE).exp() * fh;
        out.push(Candidate {
            x: cx - w / 2.0,
            y: cy - h / 2.0,
            w,
            h,
            score,
        });
    }
    Ok(out)
}

/// Greedy NMS over the `top_k` best candidates, highest score first.
pub fn suppress(mut candidates: Vec<Candidate>, nms_threshold: f32, top_k: usize) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    candidates.truncate(top_k);

    let mut keep: Vec<Candidate> = Vec::new();
    for c in candidates {
        if keep.iter().all(|k| k.iou(&c) <= nms_threshold) {
            keep.push(c);
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn candidate(x: f32, y: f32, size: f32, score: f32) -> Candidate {
        Candidate {
            x,
            y,
            w: size,
            h: size,
            score,
        }
    }

    #[test]
    fn test_prior_count_for_320() {
        assert_eq!(generate_priors(320, 320).len(), 5875);
    }

    #[test]
    fn test_first_and_last_prior() {
        let priors = generate_priors(320, 320);
        let first = priors[0];
        assert_relative_eq!(first.cx, 0.0125);
        assert_relative_eq!(first.cy, 0.0125);
        assert_relative_eq!(first.w, 10.0 / 320.0);

        let last = priors[priors.len() - 1];
        assert_relative_eq!(last.cx, 4.5 * 64.0 / 320.0);
        assert_relative_eq!(last.w, 256.0 / 320.0);
    }

    #[test]
    fn test_decode_zero_offsets_returns_anchor() {
        let priors = generate_priors(320, 320);
        let n = priors.len();
        let loc = vec![0.0; n * LOC_STRIDE];
        let mut conf = vec![0.0; n * CONF_STRIDE];
        let mut iou = vec![0.0; n];
        conf[1] = 1.0;
        iou[0] = 1.0;

        let out = decode(&priors, &loc, &conf, &iou, 320, 320, 0.9).unwrap();
        assert_eq!(out.len(), 1);
        assert_relative_eq!(out[0].x, -1.0, epsilon = 1e-4);
        assert_relative_eq!(out[0].y, -1.0, epsilon = 1e-4);
        assert_relative_eq!(out[0].w, 10.0, epsilon = 1e-4);
        assert_relative_eq!(out[0].score, 1.0);
    }

    #[test]
    fn test_decode_applies_offsets() {
        let priors = vec![Prior {
            cx: 0.5,
            cy: 0.5,
            w: 0.1,
            h: 0.1,
        }];
        let mut loc = vec![0.0; LOC_STRIDE];
        loc[0] = 1.0;
        loc[2] = 5.0 * 2f32.ln();
        let out = decode(&priors, &loc, &[0.0, 0.81], &[1.0], 100, 100, 0.5).unwrap();

        // cx = (0.5 + 0.1 * 0.1) * 100 = 51, w = 0.1 * 2 * 100 = 20
        assert_relative_eq!(out[0].x, 41.0, epsilon = 1e-3);
        assert_relative_eq!(out[0].w, 20.0, epsilon = 1e-3);
        assert_relative_eq!(out[0].h, 10.0, epsilon = 1e-3);
        assert_relative_eq!(out[0].score, 0.9, epsilon = 1e-6);
    }

    #[test]
    fn test_decode_iou_is_clamped() {
        let priors = generate_priors(32, 32);
        let n = priors.len();
        let loc = vec![0.0; n * LOC_STRIDE];
        let conf: Vec<f32> = (0..n * CONF_STRIDE).map(|i| (i % 2) as f32).collect();
        let iou = vec![-0.5; n];
        let out = decode(&priors, &loc, &conf, &iou, 32, 32, 0.0).unwrap();
        assert!(out.iter().all(|c| c.score == 0.0));

        let iou = vec![4.0; n];
        let out = decode(&priors, &loc, &conf, &iou, 32, 32, 0.0).unwrap();
        assert!(out.iter().all(|c| c.score == 1.0));
    }

    #[test]
    fn test_decode_rejects_short_heads() {
        let priors = generate_priors(320, 320);
        assert!(decode(&priors, &[0.0; 14], &[0.0; 2], &[0.0], 320, 320, 0.9).is_err());
    }

    #[test]
    fn test_suppress_keeps_best_of_overlap() {
        let kept = suppress(
            vec![
                candidate(5.0, 5.0, 100.0, 0.8),
                candidate(0.0, 0.0, 100.0, 0.95),
                candidate(300.0, 300.0, 40.0, 0.91),
            ],
            0.3,
            5000,
        );
        assert_eq!(kept.len(), 2);
        assert_relative_eq!(kept[0].score, 0.95);
        assert_relative_eq!(kept[1].score, 0.91);
    }

    #[test]
    fn test_suppress_respects_top_k() {
        let kept = suppress(
            vec![
                candidate(0.0, 0.0, 10.0, 0.9),
                candidate(100.0, 0.0, 10.0, 0.99),
                candidate(200.0, 0.0, 10.0, 0.95),
            ],
            0.3,
            2,
        );
        assert_eq!(kept.len(), 2);
        assert_relative_eq!(kept[0].score, 0.99);
        assert_relative_eq!(kept[1].score, 0.95);
    }
}
