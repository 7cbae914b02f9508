//! Cumulative lossyear mask generator.
//!
//! Reads a Hansen GFC lossyear tile and writes, for each year level, a
//! binary GeoTIFF marking every pixel lost up to and including that year,
//! followed by a tiled pyramid TIFF of each mask.

mod progress;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use lossyear_split::{open_geotiff, RunSummary, SplitConfig, YearSplit};
use progress::BarProgress;

#[derive(Parser, Debug)]
#[command(name = "yearsplit")]
#[command(about = "Split a lossyear raster into cumulative per-year masks and tile pyramids")]
struct Args {
    /// Lossyear GeoTIFF to split
    input: PathBuf,

    /// Row workers, also the number of pyramids built at once
    #[arg(short = 'j', long, env = "YEARSPLIT_WORKERS", default_value = "4")]
    workers: usize,

    /// First year level (years since 2000)
    #[arg(long, env = "YEARSPLIT_MIN_LEVEL", default_value = "1")]
    min_level: u8,

    /// Last year level (years since 2000)
    #[arg(long, env = "YEARSPLIT_MAX_LEVEL", default_value = "20")]
    max_level: u8,

    /// Directory receiving masks and pyramids
    #[arg(short, long, env = "YEARSPLIT_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Pyramid tile edge length
    #[arg(long, env = "YEARSPLIT_TILE_SIZE", default_value = "256")]
    tile_size: usize,

    /// Only write the masks
    #[arg(long)]
    no_pyramids: bool,

    /// Hide progress bars
    #[arg(long)]
    no_progress: bool,

    /// Print the run summary as JSON instead of a file list
    #[arg(long)]
    json: bool,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, env = "YEARSPLIT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Args {
    fn split_config(&self) -> SplitConfig {
        SplitConfig {
            min_level: self.min_level,
            max_level: self.max_level,
            workers: self.workers,
            tile_size: self.tile_size,
            output_dir: self.output_dir.clone(),
            build_pyramids: !self.no_pyramids,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args)?;

    let config = args.split_config();
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid arguments: {}", e))?;

    let source = open_geotiff(&args.input)?;
    let georef = source.georeference();
    let (block_width, block_height) = source.block_size();
    info!(
        path = %args.input.display(),
        width = source.width(),
        height = source.height(),
        bands = source.band_count(),
        block_width,
        block_height,
        transform = ?georef.transform.0,
        crs = %georef.keys.ascii_params,
        "Opened lossyear raster"
    );

    std::fs::create_dir_all(&config.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            config.output_dir.display()
        )
    })?;

    let bars = Arc::new(BarProgress::new(
        source.height() as u64,
        config.thresholds()?.len() as u64,
        !args.no_progress,
    ));
    let splitter = YearSplit::geotiff(config)?.with_progress(bars.clone());

    let summary = splitter.run(source).await?;
    bars.finish();

    info!(
        masks = summary.masks.len(),
        pyramids = summary.pyramids.len(),
        rows_ms = summary.rows_ms,
        pyramids_ms = summary.pyramids_ms,
        "Done"
    );
    print_summary(&summary, args.json)
}

fn init_tracing(args: &Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr);

    if args.log_json {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn print_summary(summary: &RunSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }
    for path in &summary.masks {
        println!("{}", path.display());
    }
    for pyramid in &summary.pyramids {
        println!("{}", pyramid.path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["yearsplit", "tile.tif"]).unwrap();
        let config = args.split_config();
        assert_eq!(args.input, PathBuf::from("tile.tif"));
        assert_eq!(config.workers, 4);
        assert_eq!((config.min_level, config.max_level), (1, 20));
        assert_eq!(config.tile_size, 256);
        assert_eq!(config.output_dir, PathBuf::from("."));
        assert!(config.build_pyramids);
    }

    #[test]
    fn test_flags() {
        let args = Args::try_parse_from([
            "yearsplit",
            "tile.tif",
            "-j",
            "8",
            "--min-level",
            "3",
            "--max-level",
            "7",
            "--output-dir",
            "/tmp/out",
            "--no-pyramids",
        ])
        .unwrap();
        let config = args.split_config();
        assert_eq!(config.workers, 8);
        assert_eq!((config.min_level, config.max_level), (3, 7));
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert!(!config.build_pyramids);
    }

    #[test]
    fn test_input_required() {
        assert!(Args::try_parse_from(["yearsplit"]).is_err());
    }
}
