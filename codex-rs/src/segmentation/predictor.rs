use clap::ValueEnum;
use ndarray::{Array2, ArrayView4};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which compartment the predictor should label.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Compartment {
    #[default]
    Nuclear,
    WholeCell,
}

impl Compartment {
    /// Manifest key, also the output name a multi-head model uses for it.
    pub fn key(self) -> &'static str {
        match self {
            Compartment::Nuclear => "nuclear",
            Compartment::WholeCell => "whole_cell",
        }
    }
}

/// Calibration and post-processing settings handed to the predictor.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictRequest {
    pub pixel_size_um: f64,
    pub maxima_threshold: f64,
    pub interior_threshold: f64,
    pub compartment: Compartment,
}

/// A pretrained cell-segmentation model.
///
/// `image` is `(1, height, width, 2)` with channels `[internal, boundary]`;
/// the result is a `(height, width)` label mask, 0 for background.
pub trait SegmentationPredictor {
    fn predict(&mut self, image: ArrayView4<'_, f32>, request: &PredictRequest) -> Result<Array2<u32>>;
}

impl<P: SegmentationPredictor + ?Sized> SegmentationPredictor for Box<P> {
    fn predict(&mut self, image: ArrayView4<'_, f32>, request: &PredictRequest) -> Result<Array2<u32>> {
        (**self).predict(image, request)
    }
}
