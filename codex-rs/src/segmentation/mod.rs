//! Segmentation: build the two-channel input from marker sums, run the
//! predictor, render previews, and drive batches of regions.

pub mod batch;
pub mod onnx;
pub mod predictor;
pub mod preview;
pub mod scale;

use ndarray::{Array2, Array3, Array4};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{CodexError, Result};
use crate::raster;
use crate::region::MarkerImages;

pub use batch::{run_batch, run_batch_from_catalog, write_manifest, BatchReport, RegionFailure};
pub use onnx::OnnxPredictor;
pub use predictor::{Compartment, PredictRequest, SegmentationPredictor};
pub use scale::{scale, sum_scaled};

pub const MANIFEST_FILE: &str = "parameter_segmentation.json";
pub const MASK_FILE: &str = "segmentation_mask.tiff";
pub const RGB_FILE: &str = "rgb_image.tiff";
pub const OVERLAY_FILE: &str = "overlay.tiff";

fn default_scale() -> bool {
    true
}

fn default_maxima_threshold() -> f64 {
    0.075
}

fn default_interior_threshold() -> f64 {
    0.20
}

/// Everything that determines a segmentation run; persisted as the manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationParams {
    pub boundary_markers: Vec<String>,
    pub internal_markers: Vec<String>,
    pub pixel_size_um: f64,
    /// Min-max scale each marker before summing.
    #[serde(default = "default_scale")]
    pub scale: bool,
    /// Larger values give fewer cells.
    #[serde(default = "default_maxima_threshold")]
    pub maxima_threshold: f64,
    /// Larger values give larger cells.
    #[serde(default = "default_interior_threshold")]
    pub interior_threshold: f64,
    #[serde(default)]
    pub compartment: Compartment,
}

impl SegmentationParams {
    pub fn new(boundary_markers: Vec<String>, internal_markers: Vec<String>, pixel_size_um: f64) -> Self {
        Self {
            boundary_markers,
            internal_markers,
            pixel_size_um,
            scale: default_scale(),
            maxima_threshold: default_maxima_threshold(),
            interior_threshold: default_interior_threshold(),
            compartment: Compartment::default(),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Boundary then internal markers, each listed once.
    pub fn markers(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for m in self.boundary_markers.iter().chain(&self.internal_markers) {
            if !out.contains(m) {
                out.push(m.clone());
            }
        }
        out
    }

    pub fn request(&self) -> PredictRequest {
        PredictRequest {
            pixel_size_um: self.pixel_size_um,
            maxima_threshold: self.maxima_threshold,
            interior_threshold: self.interior_threshold,
            compartment: self.compartment,
        }
    }
}

/// Outputs of segmenting one region.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationArtifact {
    pub mask: Array2<u32>,
    pub rgb_preview: Array3<u8>,
    pub outline_overlay: Array3<u8>,
}

impl SegmentationArtifact {
    /// Write mask, preview and overlay TIFFs into `dir`.
    pub fn write(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        raster::write_mask_tiff(&dir.join(MASK_FILE), &self.mask)?;
        raster::write_rgb_tiff(&dir.join(RGB_FILE), &self.rgb_preview)?;
        raster::write_rgb_tiff(&dir.join(OVERLAY_FILE), &self.outline_overlay)?;
        Ok(())
    }
}

/// Segment one region's rasters.
pub fn segment<P>(images: &MarkerImages, params: &SegmentationParams, predictor: &mut P) -> Result<SegmentationArtifact>
where
    P: SegmentationPredictor + ?Sized,
{
    let boundary = sum_scaled(&params.boundary_markers, images, params.scale)?;
    let internal = sum_scaled(&params.internal_markers, images, params.scale)?;

    let (h, w) = internal.dim();
    let mut stack = Array4::<f32>::zeros((1, h, w, 2));
    for ((y, x), &v) in internal.indexed_iter() {
        stack[[0, y, x, 0]] = f32::from(v);
        stack[[0, y, x, 1]] = f32::from(boundary[[y, x]]);
    }

    let mask = predictor.predict(stack.view(), &params.request())?;
    if mask.dim() != (h, w) {
        return Err(CodexError::ShapeMismatch {
            what: "predicted mask".to_string(),
            expected: (h, w),
            actual: mask.dim(),
        });
    }

    let rgb_preview = preview::rgb_image(&internal, &boundary);
    let outline_overlay = preview::outline_overlay(&rgb_preview, &mask);
    Ok(SegmentationArtifact {
        mask,
        rgb_preview,
        outline_overlay,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::Raster;
    use ndarray::ArrayView4;

    /// Labels every pixel whose internal channel is above half scale.
    struct Threshold {
        seen: Option<PredictRequest>,
    }

    impl SegmentationPredictor for Threshold {
        fn predict(&mut self, image: ArrayView4<'_, f32>, request: &PredictRequest) -> Result<Array2<u32>> {
            self.seen = Some(request.clone());
            let (_, h, w, c) = image.dim();
            assert_eq!(c, 2);
            Ok(Array2::from_shape_fn((h, w), |(y, x)| u32::from(image[[0, y, x, 0]] > 127.0)))
        }
    }

    fn images() -> MarkerImages {
        let mut imgs = MarkerImages::new();
        imgs.insert("DAPI", Raster::U16(Array2::from_shape_fn((6, 6), |(y, x)| ((y * x) % 7) as u16)))
            .unwrap();
        imgs.insert("CD45", Raster::U8(Array2::from_shape_fn((6, 6), |(y, _)| y as u8)))
            .unwrap();
        imgs
    }

    #[test]
    fn segment_stacks_internal_first_and_forwards_calibration() {
        let params = SegmentationParams::new(vec!["CD45".into()], vec!["DAPI".into()], 0.377);
        let mut predictor = Threshold { seen: None };
        let art = segment(&images(), &params, &mut predictor).unwrap();

        let expected = sum_scaled(&["DAPI"], &images(), true).unwrap();
        assert_eq!(art.mask, expected.mapv(|v| u32::from(v > 127)));
        let req = predictor.seen.unwrap();
        assert_eq!(req.pixel_size_um, 0.377);
        assert_eq!(req.maxima_threshold, 0.075);
        assert_eq!(req.compartment, Compartment::Nuclear);
        assert_eq!(art.rgb_preview.dim(), (6, 6, 3));
    }

    #[test]
    fn wrong_mask_shape_is_rejected() {
        struct Tiny;
        impl SegmentationPredictor for Tiny {
            fn predict(&mut self, _: ArrayView4<'_, f32>, _: &PredictRequest) -> Result<Array2<u32>> {
                Ok(Array2::zeros((2, 2)))
            }
        }
        let params = SegmentationParams::new(vec!["CD45".into()], vec!["DAPI".into()], 0.5);
        let err = segment(&images(), &params, &mut Tiny).unwrap_err();
        assert!(matches!(err, CodexError::ShapeMismatch { .. }));
    }

    #[test]
    fn params_fill_defaults_from_json() {
        let json = r#"{"boundary_markers":["CD45"],"internal_markers":["DAPI"],"pixel_size_um":0.5}"#;
        let params: SegmentationParams = serde_json::from_str(json).unwrap();
        assert!(params.scale);
        assert_eq!(params.interior_threshold, 0.20);
        assert_eq!(params.markers(), vec!["CD45", "DAPI"]);
    }
}
