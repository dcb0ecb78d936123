use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use region_extract::{ExtractPath, PathSummary, Pipeline, RegionConfig};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

/// Builds the chart-ready CSV extracts (agricultural statistics, daily weather and
/// vegetation index) for the regions in a region config.
#[derive(Debug, Parser)]
#[command(name = "region-extract", version, about)]
struct Args {
    /// Region config JSON
    #[arg(long, value_name = "PATH", default_value = "assets/data/region_config.json")]
    config: PathBuf,

    /// Directory the CSV files are written to. Defaults to the config's directory.
    #[arg(long, value_name = "PATH")]
    output_dir: Option<PathBuf>,

    /// Directory for downloaded artifacts reused between runs
    #[arg(long, value_name = "PATH")]
    cache_dir: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", default_value_t = 60)]
    timeout_secs: u64,

    /// Run only these extracts (quickstats, weather, ndvi). Repeatable.
    #[arg(long = "only", value_name = "EXTRACT")]
    only: Vec<ExtractPath>,
}

fn report(name: &str, summary: &Option<PathSummary>) {
    match summary {
        Some(s) if s.skipped.is_empty() => info!("{}: {} rows", name, s.rows),
        Some(s) => warn!(
            "{}: {} rows, skipped {}",
            name,
            s.rows,
            s.skipped.join(", ")
        ),
        None => {}
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = RegionConfig::load(&args.config)?;
    let output_dir = args.output_dir.clone().unwrap_or_else(|| {
        args.config
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    });

    let pipeline = Pipeline::builder()
        .config(config)
        .output_dir(output_dir.clone())
        .maybe_cache_dir(args.cache_dir)
        .timeout(Duration::from_secs(args.timeout_secs))
        .build()
        .await
        .context("Failed to set up the extract pipeline")?;

    let paths = if args.only.is_empty() {
        ExtractPath::ALL.to_vec()
    } else {
        args.only
    };
    let summary = pipeline.run_only(&paths).await?;

    report("quickstats", &summary.quickstats);
    report("weather", &summary.weather);
    report("ndvi", &summary.ndvi);
    info!("CSV extracts written to {}", output_dir.display());
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    if let Err(error) = run(args).await {
        eprintln!("Error: {:#}", error);
        process::exit(1);
    }
}
