mod commands;

use clap::{Parser, Subcommand};
use std::io::{self, Write};

#[derive(Parser)]
#[command(name = "codex", about = "CODEX tissue imaging CLI: summary, crop, segment, features")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Summary(commands::summary::SummaryArgs),
    Crop(commands::crop::CropArgs),
    Segment(commands::segment::SegmentArgs),
    Features(commands::features::FeaturesArgs),
}

fn progress(prog: f64, msg: &str) {
    let _ = writeln!(
        io::stderr(),
        "{}",
        serde_json::json!({"progress": prog, "message": msg})
    );
    let _ = io::stderr().flush();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Summary(args) => commands::summary::run(args, progress)?,
        Commands::Crop(args) => commands::crop::run(args, progress)?,
        Commands::Segment(args) => commands::segment::run(args, progress)?,
        Commands::Features(args) => commands::features::run(args, progress)?,
    }
    Ok(())
}
