//! ONNX Runtime backend for the segmentation predictor.
//!
//! Expects a Mesmer-style export: input `(1, H, W, 2)` float32 at
//! 0.5 µm/pixel, output an integer label image with H×W elements. When the
//! graph declares `maxima_threshold` / `interior_threshold` inputs they are
//! fed as scalars. A model with one output serves the nuclear compartment;
//! a multi-head model names its outputs `nuclear` / `whole_cell`.

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};
use ndarray::{arr0, Array2, Array4, ArrayView4};
use ort::session::Session;
use ort::value::Tensor;
#[cfg(any(windows, target_os = "linux"))]
use ort::ep::{CUDA, ExecutionProvider};
use std::fmt::Display;
use std::path::Path;

use super::predictor::{Compartment, PredictRequest, SegmentationPredictor};
use crate::error::{CodexError, Result};

/// Resolution the model was trained at.
pub const MODEL_MPP: f64 = 0.5;

const MAXIMA_INPUT: &str = "maxima_threshold";
const INTERIOR_INPUT: &str = "interior_threshold";

fn ort_error(e: impl Display) -> CodexError {
    CodexError::Predictor(e.to_string())
}

pub struct OnnxPredictor {
    session: Session,
    image_input: String,
    takes_thresholds: bool,
    output_names: Vec<String>,
}

impl OnnxPredictor {
    pub fn new(model_path: &Path, cpu: bool) -> Result<Self> {
        if !model_path.exists() {
            return Err(CodexError::Predictor(format!(
                "model not found at {}",
                model_path.display()
            )));
        }

        #[allow(unused_mut)]
        let mut builder = Session::builder().map_err(ort_error)?;
        #[cfg(any(windows, target_os = "linux"))]
        if !cpu {
            let cuda = CUDA::default();
            match cuda.is_available() {
                Ok(true) => match cuda.register(&mut builder) {
                    Ok(()) => log::info!("segment: using CUDA execution provider"),
                    Err(e) => log::warn!("segment: CUDA registration failed: {e}. Using CPU."),
                },
                Ok(false) => log::info!("segment: CUDA not available in this build. Using CPU."),
                Err(e) => log::warn!("segment: CUDA check failed: {e}. Using CPU."),
            }
        }
        #[cfg(not(any(windows, target_os = "linux")))]
        let _ = cpu;
        let session = builder.commit_from_file(model_path).map_err(ort_error)?;

        let names: Vec<String> = session.inputs().iter().map(|i| i.name().to_string()).collect();
        let image_input = names
            .iter()
            .find(|n| n.as_str() != MAXIMA_INPUT && n.as_str() != INTERIOR_INPUT)
            .cloned()
            .ok_or_else(|| CodexError::Predictor("model has no image input".into()))?;
        let takes_thresholds =
            names.iter().any(|n| n == MAXIMA_INPUT) && names.iter().any(|n| n == INTERIOR_INPUT);
        let output_names: Vec<String> = session.outputs().iter().map(|o| o.name().to_string()).collect();
        log::debug!("segment: model inputs {:?}, outputs {:?}", names, output_names);

        Ok(Self {
            session,
            image_input,
            takes_thresholds,
            output_names,
        })
    }
}

/// Index of the output head that labels `compartment`.
fn output_index(outputs: &[String], compartment: Compartment) -> Result<usize> {
    if let Some(i) = outputs.iter().position(|n| n == compartment.key()) {
        return Ok(i);
    }
    if outputs.len() == 1 && compartment == Compartment::Nuclear {
        return Ok(0);
    }
    Err(CodexError::Predictor(format!(
        "model has no output for the {} compartment (outputs: {:?})",
        compartment.key(),
        outputs
    )))
}

/// Triangle-filtered resize of one plane. Float pixels are clamped to
/// `[0, 1]` by the resampler, so the plane is normalised around the call.
fn resize_plane(plane: Vec<f32>, w: u32, h: u32, nw: u32, nh: u32) -> Result<Vec<f32>> {
    let peak = plane.iter().fold(0.0f32, |m, &v| m.max(v.abs()));
    let norm = if peak > 0.0 { peak } else { 1.0 };
    let unit: Vec<f32> = plane.into_iter().map(|v| v / norm).collect();
    let img = ImageBuffer::<Luma<f32>, Vec<f32>>::from_raw(w, h, unit)
        .ok_or_else(|| CodexError::Predictor("channel buffer size mismatch".into()))?;
    let resized = imageops::resize(&img, nw, nh, FilterType::Triangle);
    Ok(resized.into_raw().into_iter().map(|v| v * norm).collect())
}

/// Resample a `(1, H, W, C)` tensor to `(1, nh, nw, C)`.
fn resample_input(image: ArrayView4<'_, f32>, nh: usize, nw: usize) -> Result<Array4<f32>> {
    let (_, h, w, c) = image.dim();
    let mut out = Array4::<f32>::zeros((1, nh, nw, c));
    for ch in 0..c {
        let plane: Vec<f32> = image.slice(ndarray::s![0, .., .., ch]).iter().copied().collect();
        let resized = resize_plane(plane, w as u32, h as u32, nw as u32, nh as u32)?;
        for (i, v) in resized.into_iter().enumerate() {
            out[[0, i / nw, i % nw, ch]] = v;
        }
    }
    Ok(out)
}

/// Nearest-neighbour resample of a row-major `h × w` label buffer.
fn resample_labels(labels: Vec<u32>, w: usize, h: usize, nw: usize, nh: usize) -> Result<Array2<u32>> {
    let src = Array2::from_shape_vec((h, w), labels)?;
    let pick = |i: usize, n: usize, len: usize| (((i as f64 + 0.5) * len as f64 / n as f64) as usize).min(len - 1);
    Ok(Array2::from_shape_fn((nh, nw), |(y, x)| src[[pick(y, nh, h), pick(x, nw, w)]]))
}

impl SegmentationPredictor for OnnxPredictor {
    fn predict(&mut self, image: ArrayView4<'_, f32>, request: &PredictRequest) -> Result<Array2<u32>> {
        let head = output_index(&self.output_names, request.compartment)?;
        let (_, h, w, _) = image.dim();
        let ratio = request.pixel_size_um / MODEL_MPP;
        let nh = ((h as f64 * ratio).round() as usize).max(1);
        let nw = ((w as f64 * ratio).round() as usize).max(1);
        let input = if (nh, nw) == (h, w) {
            image.to_owned()
        } else {
            resample_input(image, nh, nw)?
        };

        let tensor = Tensor::from_array(input).map_err(ort_error)?;
        let outputs = if self.takes_thresholds {
            let maxima = Tensor::from_array(arr0(request.maxima_threshold as f32)).map_err(ort_error)?;
            let interior = Tensor::from_array(arr0(request.interior_threshold as f32)).map_err(ort_error)?;
            self.session
                .run(ort::inputs![
                    self.image_input.as_str() => tensor,
                    MAXIMA_INPUT => maxima,
                    INTERIOR_INPUT => interior,
                ])
                .map_err(ort_error)?
        } else {
            self.session
                .run(ort::inputs![self.image_input.as_str() => tensor])
                .map_err(ort_error)?
        };

        let output = &outputs[head];
        let labels: Vec<u32> = if let Ok(v) = output.try_extract_array::<i64>() {
            v.iter().map(|&l| l.max(0) as u32).collect()
        } else if let Ok(v) = output.try_extract_array::<i32>() {
            v.iter().map(|&l| l.max(0) as u32).collect()
        } else {
            let v = output.try_extract_array::<f32>().map_err(ort_error)?;
            v.iter().map(|&l| l.max(0.0).round() as u32).collect()
        };
        if labels.len() != nh * nw {
            return Err(CodexError::Predictor(format!(
                "model returned {} labels for a {}x{} input",
                labels.len(),
                nh,
                nw
            )));
        }

        if (nh, nw) == (h, w) {
            Ok(Array2::from_shape_vec((h, w), labels)?)
        } else {
            resample_labels(labels, nw, nh, w, h)
        }
    }
}
