use clap::Args;
use codex_rs::{NamingScheme, RegionMarkerObject};
use std::fs;
use std::path::Path;

#[derive(Args, Clone)]
pub struct CropArgs {
    /// Root directory with one subdirectory per region
    #[arg(long)]
    pub input: String,
    #[arg(long, value_enum)]
    pub scheme: NamingScheme,
    /// Regions to crop: "all", names, or indices/slices
    #[arg(long, default_value = "all")]
    pub regions: String,
    /// Comma-separated markers to export (default: every marker of each region)
    #[arg(long, value_delimiter = ',')]
    pub markers: Vec<String>,
    /// Window centre, column
    #[arg(long)]
    pub x: i64,
    /// Window centre, row
    #[arg(long)]
    pub y: i64,
    /// Side length of the square window in pixels
    #[arg(long)]
    pub length: u32,
    /// Output directory; receives <region>/<marker>.tif
    #[arg(long)]
    pub output: String,
}

pub fn run(args: CropArgs, progress: impl Fn(f64, &str)) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = super::selected_catalog(&args.input, args.scheme, &args.regions)?.deduplicated();
    let output = Path::new(&args.output);
    let total = catalog.len();

    for (i, region) in catalog.region_names().iter().enumerate() {
        let markers = if args.markers.is_empty() {
            catalog
                .region(region)
                .map(|recs| recs.iter().map(|r| r.marker.clone()).collect())
                .unwrap_or_default()
        } else {
            args.markers.clone()
        };

        // one region resident at a time
        let object = RegionMarkerObject::load(&catalog.subset(&[region])?, &markers)?;
        let cropped = object.crop(args.x, args.y, args.length)?;

        let region_dir = output.join(region);
        fs::create_dir_all(&region_dir)?;
        for (marker, raster) in cropped.region(region)?.iter() {
            raster.write_tiff(&region_dir.join(format!("{}.tif", marker)))?;
        }
        progress(
            (i + 1) as f64 / total as f64,
            &format!("Cropped region {}/{} ({})", i + 1, total, region),
        );
    }

    progress(1.0, &format!("Wrote {}", output.display()));
    Ok(())
}
