/// YuNet face detector using ONNX Runtime via `ort`.
///
/// The color frame is resized to the model input, fed as a BGR float tensor
/// in the 0-255 range, and the `loc`/`conf`/`iou` heads are decoded against
/// the model's anchor grid. Boxes come back in the caller's frame coordinates.
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::RgbImage;
use thiserror::Error;

use crate::detection::domain::face_detector::FaceDetector;
use crate::shared::constants::{DETECTOR_INPUT_SIZE, YUNET_MODEL_NAME, YUNET_MODEL_URL};
use crate::shared::detection_box::DetectionBox;
use crate::shared::frame::Frame;

use super::model_resolver::{ModelResolveError, ModelResolver, ProgressFn};
use super::yunet_decoder::{decode, generate_priors, suppress, Prior};

#[derive(Error, Debug)]
pub enum ModelLoadError {
    #[error("face model not found at {0}")]
    NotFound(PathBuf),
    #[error("failed to load face model: {0}")]
    Session(String),
    #[error(transparent)]
    Resolve(#[from] ModelResolveError),
}

/// Decoding parameters, fixed at construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct YuNetConfig {
    /// Square input used when the model declares dynamic spatial dims.
    pub input_size: u32,
    pub score_threshold: f32,
    pub nms_threshold: f32,
    pub top_k: usize,
}

impl Default for YuNetConfig {
    fn default() -> Self {
        Self {
            input_size: DETECTOR_INPUT_SIZE,
            score_threshold: 0.9,
            nms_threshold: 0.3,
            top_k: 5000,
        }
    }
}

/// YuNet detector backed by an ONNX Runtime session.
pub struct OnnxYuNetDetector {
    session: ort::session::Session,
    config: YuNetConfig,
    input_width: u32,
    input_height: u32,
    priors: Vec<Prior>,
}

impl OnnxYuNetDetector {
    /// Load a YuNet model from `model_path`.
    ///
    /// Fails with `NotFound` before touching ONNX Runtime when the file is
    /// missing, and with `Session` when the artifact cannot be loaded.
    pub fn new(model_path: &Path, config: YuNetConfig) -> Result<Self, ModelLoadError> {
        if !model_path.is_file() {
            return Err(ModelLoadError::NotFound(model_path.to_path_buf()));
        }

        let session = ort::session::Session::builder()
            .map_err(|e| ModelLoadError::Session(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| ModelLoadError::Session(e.to_string()))?;

        let (input_width, input_height) = static_input_size(&session)
            .unwrap_or((config.input_size, config.input_size));
        log::info!(
            "loaded face model {} ({input_width}x{input_height})",
            model_path.display()
        );

        Ok(Self {
            session,
            config,
            input_width,
            input_height,
            priors: generate_priors(input_width, input_height),
        })
    }

    /// Load from an explicit path, or from the model cache (downloading the
    /// published YuNet model on first use).
    pub fn load(
        model_path: Option<&Path>,
        config: YuNetConfig,
        progress: Option<ProgressFn>,
    ) -> Result<Self, ModelLoadError> {
        let path = match model_path {
            Some(p) => p.to_path_buf(),
            None => ModelResolver::new()?.resolve(YUNET_MODEL_NAME, YUNET_MODEL_URL, progress)?,
        };
        Self::new(&path, config)
    }
}

impl FaceDetector for OnnxYuNetDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<DetectionBox>, Box<dyn std::error::Error>> {
        let (iw, ih) = (self.input_width, self.input_height);
        let input = to_input_tensor(frame, iw, ih)?;

        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        let loc = outputs.get("loc").ok_or("YuNet model has no 'loc' output")?;
        let conf = outputs.get("conf").ok_or("YuNet model has no 'conf' output")?;
        let iou = outputs.get("iou").ok_or("YuNet model has no 'iou' output")?;
        let loc = loc.try_extract_array::<f32>()?;
        let conf = conf.try_extract_array::<f32>()?;
        let iou = iou.try_extract_array::<f32>()?;

        let candidates = decode(
            &self.priors,
            loc.as_slice().ok_or("cannot read 'loc' tensor")?,
            conf.as_slice().ok_or("cannot read 'conf' tensor")?,
            iou.as_slice().ok_or("cannot read 'iou' tensor")?,
            iw,
            ih,
            self.config.score_threshold,
        )?;
        let kept = suppress(candidates, self.config.nms_threshold, self.config.top_k);

        let sx = frame.width() as f32 / iw as f32;
        let sy = frame.height() as f32 / ih as f32;
        Ok(kept
            .iter()
            .map(|c| DetectionBox::from_float(c.x * sx, c.y * sy, c.w * sx, c.h * sy, c.score))
            .collect())
    }
}

/// Spatial size declared by the model's NCHW input, if static.
fn static_input_size(session: &ort::session::Session) -> Option<(u32, u32)> {
    let input = session.inputs().first()?;
    if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
        if shape.len() >= 4 && shape[2] > 0 && shape[3] > 0 {
            return Some((shape[3] as u32, shape[2] as u32));
        }
    }
    None
}

/// Resize an RGB frame to `width` x `height` and lay it out as a
/// `[1, 3, H, W]` BGR tensor with raw 0-255 values.
fn to_input_tensor(
    frame: &Frame,
    width: u32,
    height: u32,
) -> Result<ndarray::Array4<f32>, Box<dyn std::error::Error>> {
    if frame.channels() != 3 {
        return Err(format!("face detection needs RGB input, got {} channels", frame.channels()).into());
    }

    let resized;
    let src = if frame.width() == width && frame.height() == height {
        frame
    } else {
        let rgb = RgbImage::from_raw(frame.width(), frame.height(), frame.data().to_vec())
            .ok_or("frame buffer does not match its dimensions")?;
        let scaled = imageops::resize(&rgb, width, height, FilterType::Triangle);
        resized = Frame::new(scaled.into_raw(), width, height, 3, frame.sequence());
        &resized
    };

    let pixels = src.as_ndarray();
    let (w, h) = (width as usize, height as usize);
    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, h, w));
    for y in 0..h {
        for x in 0..w {
            for c in 0..3 {
                tensor[[0, c, y, x]] = pixels[[y, x, 2 - c]] as f32;
            }
        }
    }
    Ok(tensor)
}
