//! Per-region batch segmentation. A failing region is recorded and skipped;
//! it never stops the regions after it.

use std::fs;
use std::path::{Path, PathBuf};

use super::{segment, SegmentationParams, SegmentationPredictor, MANIFEST_FILE};
use crate::catalog::Catalog;
use crate::error::{CodexError, Result};
use crate::region::{MarkerImages, RegionMarkerObject};

#[derive(Debug)]
pub struct RegionFailure {
    pub region: String,
    pub error: CodexError,
}

/// Outcome of a batch: regions written and regions that failed, in order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub completed: Vec<String>,
    pub failed: Vec<RegionFailure>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_regions(&self) -> Vec<&str> {
        self.failed.iter().map(|f| f.region.as_str()).collect()
    }

    /// Collapse into an error naming every failed region.
    pub fn into_result(self) -> Result<Vec<String>> {
        if self.failed.is_empty() {
            return Ok(self.completed);
        }
        let message = self
            .failed
            .iter()
            .map(|f| format!("{}: {}", f.region, f.error))
            .collect::<Vec<_>>()
            .join("; ");
        Err(CodexError::Segmentation {
            region: self.failed_regions().join(","),
            message,
        })
    }

    fn record(&mut self, region: &str, outcome: Result<()>) {
        match outcome {
            Ok(()) => {
                log::info!("{}: segmentation completed", region);
                self.completed.push(region.to_string());
            }
            Err(error) => {
                log::warn!("{}: segmentation failed: {}", region, error);
                self.failed.push(RegionFailure {
                    region: region.to_string(),
                    error,
                });
            }
        }
    }
}

/// Write the run parameters to `<output_dir>/parameter_segmentation.json`.
pub fn write_manifest(output_dir: &Path, params: &SegmentationParams) -> Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let path = output_dir.join(MANIFEST_FILE);
    let file = fs::File::create(&path)?;
    serde_json::to_writer_pretty(file, params)?;
    Ok(path)
}

fn segment_region<P>(
    output_dir: &Path,
    region: &str,
    images: &MarkerImages,
    params: &SegmentationParams,
    predictor: &mut P,
) -> Result<()>
where
    P: SegmentationPredictor + ?Sized,
{
    let artifact = segment(images, params, predictor)?;
    artifact.write(&output_dir.join(region))
}

/// Segment every region of an in-memory object.
pub fn run_batch<P>(
    output_dir: &Path,
    object: &RegionMarkerObject,
    params: &SegmentationParams,
    predictor: &mut P,
    progress: impl Fn(f64, &str),
) -> Result<BatchReport>
where
    P: SegmentationPredictor + ?Sized,
{
    write_manifest(output_dir, params)?;
    let total = object.len();
    let mut report = BatchReport::default();
    for (i, (region, images)) in object.iter().enumerate() {
        let outcome = segment_region(output_dir, region, images, params, predictor);
        report.record(region, outcome);
        progress(
            (i + 1) as f64 / total as f64,
            &format!("Segmented region {}/{} ({})", i + 1, total, region),
        );
    }
    Ok(report)
}

/// Load, segment and write one region at a time straight from a catalog.
///
/// Only the current region's rasters are held in memory; a region whose
/// markers cannot be loaded is reported like any other failure.
pub fn run_batch_from_catalog<P>(
    output_dir: &Path,
    catalog: &Catalog,
    params: &SegmentationParams,
    predictor: &mut P,
    progress: impl Fn(f64, &str),
) -> Result<BatchReport>
where
    P: SegmentationPredictor + ?Sized,
{
    write_manifest(output_dir, params)?;
    let markers = params.markers();
    let total = catalog.len();
    let mut report = BatchReport::default();
    for (i, (region, records)) in catalog.iter().enumerate() {
        let outcome = MarkerImages::load(region, records, &markers)
            .and_then(|images| segment_region(output_dir, region, &images, params, predictor));
        report.record(region, outcome);
        progress(
            (i + 1) as f64 / total as f64,
            &format!("Segmented region {}/{} ({})", i + 1, total, region),
        );
    }
    Ok(report)
}
