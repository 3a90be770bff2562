use clap::Args;
use codex_rs::segmentation::{run_batch_from_catalog, Compartment, OnnxPredictor, SegmentationParams};
use codex_rs::NamingScheme;
use std::path::Path;

#[derive(Args, Clone)]
pub struct SegmentArgs {
    /// Root directory with one subdirectory per region
    #[arg(long)]
    pub input: String,
    #[arg(long, value_enum)]
    pub scheme: NamingScheme,
    /// Regions to segment: "all", names, or indices/slices
    #[arg(long, default_value = "all")]
    pub regions: String,
    /// Output directory (parameter_segmentation.json + <region>/ artifacts)
    #[arg(long)]
    pub output: String,
    /// Path to the segmentation model (.onnx)
    #[arg(long)]
    pub model: String,
    /// JSON parameter file; flags below override its values
    #[arg(long)]
    pub params: Option<String>,
    /// Comma-separated boundary (membrane) markers
    #[arg(long, value_delimiter = ',')]
    pub boundary: Vec<String>,
    /// Comma-separated internal (nuclear) markers
    #[arg(long, value_delimiter = ',')]
    pub internal: Vec<String>,
    /// Pixel size in microns
    #[arg(long)]
    pub pixel_size: Option<f64>,
    /// Skip per-marker min-max scaling
    #[arg(long)]
    pub no_scale: bool,
    /// Maxima threshold, larger for fewer cells
    #[arg(long)]
    pub maxima_threshold: Option<f64>,
    /// Interior threshold, larger for larger cells
    #[arg(long)]
    pub interior_threshold: Option<f64>,
    #[arg(long, value_enum)]
    pub compartment: Option<Compartment>,
    /// Force CPU (skip CUDA)
    #[arg(long)]
    pub cpu: bool,
}

fn resolve_params(args: &SegmentArgs) -> Result<SegmentationParams, Box<dyn std::error::Error>> {
    let mut params = match &args.params {
        Some(path) => SegmentationParams::from_json_file(Path::new(path))?,
        None => {
            let pixel_size = args
                .pixel_size
                .ok_or("--pixel-size is required without --params")?;
            SegmentationParams::new(Vec::new(), Vec::new(), pixel_size)
        }
    };
    if !args.boundary.is_empty() {
        params.boundary_markers = args.boundary.clone();
    }
    if !args.internal.is_empty() {
        params.internal_markers = args.internal.clone();
    }
    if let Some(v) = args.pixel_size {
        params.pixel_size_um = v;
    }
    if args.no_scale {
        params.scale = false;
    }
    if let Some(v) = args.maxima_threshold {
        params.maxima_threshold = v;
    }
    if let Some(v) = args.interior_threshold {
        params.interior_threshold = v;
    }
    if let Some(c) = args.compartment {
        params.compartment = c;
    }

    if params.boundary_markers.is_empty() || params.internal_markers.is_empty() {
        return Err("Both boundary and internal markers are required".into());
    }
    if !(params.pixel_size_um > 0.0) {
        return Err(format!("Pixel size must be positive, got {}", params.pixel_size_um).into());
    }
    Ok(params)
}

pub fn run(args: SegmentArgs, progress: impl Fn(f64, &str)) -> Result<(), Box<dyn std::error::Error>> {
    let params = resolve_params(&args)?;
    let catalog = super::selected_catalog(&args.input, args.scheme, &args.regions)?;

    progress(0.0, "Loading segmentation model...");
    let mut predictor = OnnxPredictor::new(Path::new(&args.model), args.cpu)?;

    let report = run_batch_from_catalog(Path::new(&args.output), &catalog, &params, &mut predictor, &progress)?;
    progress(
        1.0,
        &format!(
            "Segmented {} regions, {} failed",
            report.completed.len(),
            report.failed.len()
        ),
    );
    report.into_result()?;
    Ok(())
}
