use std::path::PathBuf;

/// Errors raised while cataloguing, loading, segmenting or measuring regions.
#[derive(Debug, thiserror::Error)]
pub enum CodexError {
    #[error("{path}: file name does not match the {scheme} naming scheme")]
    Parse { path: PathBuf, scheme: &'static str },

    #[error("region directory {0} contains no marker files")]
    EmptyRegion(PathBuf),

    #[error("region directory {dir} resolves to several regions: {regions:?}")]
    MixedRegion { dir: PathBuf, regions: Vec<String> },

    #[error("region '{0}' is present in more than one directory")]
    DuplicateRegion(String),

    #[error("region '{0}' not found")]
    UnknownRegion(String),

    #[error("marker '{marker}' not found in region '{region}'")]
    MissingMarker { region: String, marker: String },

    #[error("marker '{marker}' matches {count} files in region '{region}'")]
    AmbiguousMarker {
        region: String,
        marker: String,
        count: usize,
    },

    #[error("marker '{0}' is not loaded")]
    MarkerNotLoaded(String),

    #[error("cannot min-max scale {what}: raster has zero range")]
    DegenerateRange { what: String },

    #[error("no markers given for {0}")]
    NoMarkers(&'static str),

    #[error("shape mismatch for {what}: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        what: String,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error("crop window rows {rows:?} cols {cols:?} exceeds raster of shape {shape:?}")]
    CropOutOfBounds {
        rows: (i64, i64),
        cols: (i64, i64),
        shape: (usize, usize),
    },

    #[error("{path}: unsupported TIFF pixel format ({format})")]
    UnsupportedPixelFormat { path: PathBuf, format: String },

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("segmentation predictor failed: {0}")]
    Predictor(String),

    #[error("segmentation of region '{region}' failed: {message}")]
    Segmentation { region: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    #[error(transparent)]
    Tiff(#[from] tiff::TiffError),

    #[error(transparent)]
    Regex(#[from] regex::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Shape(#[from] ndarray::ShapeError),
}

pub type Result<T> = std::result::Result<T, CodexError>;
