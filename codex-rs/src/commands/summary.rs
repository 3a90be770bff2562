use clap::Args;
use codex_rs::{summarize_markers, NamingScheme};
use std::path::Path;

#[derive(Args, Clone)]
pub struct SummaryArgs {
    /// Root directory with one subdirectory per region
    #[arg(long)]
    pub input: String,
    /// File naming convention of the acquisition system
    #[arg(long, value_enum)]
    pub scheme: NamingScheme,
    /// Regions: "all", names, or comma-separated indices/slices, e.g. "0:4, 6"
    #[arg(long, default_value = "all")]
    pub regions: String,
    /// Optional CSV dump of the catalog (path,region,cycle,channel,marker)
    #[arg(long)]
    pub catalog: Option<String>,
    /// Print the usable marker names one per line instead of the summary
    #[arg(long)]
    pub unique_only: bool,
}

pub fn run(args: SummaryArgs, progress: impl Fn(f64, &str)) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = super::selected_catalog(&args.input, args.scheme, &args.regions)?;
    progress(
        0.5,
        &format!(
            "Catalogued {} regions, {} marker files",
            catalog.len(),
            catalog.records().count()
        ),
    );

    if let Some(out) = &args.catalog {
        catalog.write_csv(Path::new(out))?;
    }

    let summary = summarize_markers(&catalog)?;
    if args.unique_only {
        for marker in summary.unique_sorted() {
            println!("{}", marker);
        }
    } else {
        println!("{}", summary);
    }
    progress(1.0, "Done");
    Ok(())
}
