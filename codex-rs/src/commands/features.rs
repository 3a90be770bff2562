use clap::Args;
use codex_rs::extract_directory;
use std::path::Path;

#[derive(Args, Clone)]
pub struct FeaturesArgs {
    /// Directory with one subdirectory of marker TIFFs per region
    #[arg(long)]
    pub markers: String,
    /// Segmentation output directory; tables are written next to each mask
    #[arg(long)]
    pub segmentation: String,
}

pub fn run(args: FeaturesArgs, progress: impl Fn(f64, &str)) -> Result<(), Box<dyn std::error::Error>> {
    let regions = extract_directory(Path::new(&args.markers), Path::new(&args.segmentation), &progress)?;
    if regions.is_empty() {
        return Err(format!(
            "No regions found in both {} and {}",
            args.markers, args.segmentation
        )
        .into());
    }
    progress(1.0, &format!("Wrote feature tables for {} regions", regions.len()));
    Ok(())
}
