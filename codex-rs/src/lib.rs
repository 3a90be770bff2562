//! Organise multiplexed tissue-imaging (CODEX) acquisitions by region and
//! marker, segment cells with a pretrained predictor, and extract per-cell
//! feature tables.
//!
//! Typical flow:
//!
//! ```no_run
//! use codex_rs::{Catalog, NamingScheme, summarize_markers};
//! use std::path::Path;
//!
//! # fn main() -> codex_rs::Result<()> {
//! let catalog = Catalog::build(Path::new("/data/markers"), NamingScheme::Fusion)?;
//! let summary = summarize_markers(&catalog)?;
//! println!("{}", summary);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod error;
pub mod features;
pub mod marker;
pub mod raster;
pub mod reconcile;
pub mod region;
pub mod scheme;
pub mod segmentation;
pub mod selection;

pub use catalog::Catalog;
pub use error::{CodexError, Result};
pub use features::{extract, extract_directory, CellFeatureTable, CellFeatures};
pub use raster::{CropWindow, Raster};
pub use reconcile::{summarize_markers, MarkerSummary};
pub use region::{MarkerImages, RegionMarkerObject};
pub use scheme::{FilenameParser, MarkerRecord, NamingScheme};
pub use segmentation::{
    run_batch, run_batch_from_catalog, segment, BatchReport, SegmentationArtifact, SegmentationParams,
    SegmentationPredictor,
};
