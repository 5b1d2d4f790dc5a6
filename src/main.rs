//! Command line front end: `svx2vdb <INPUT> <OUTPUT>`

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use svx2vdb::{CompressionMethod, ConvertOptions, Converter};

#[derive(Parser, Debug)]
#[command(name = "svx2vdb", version)]
#[command(about = "Converts Simple Voxel format files into sparse volume (VDB) grid files")]
struct Args {
    /// Input SVX archive
    input: PathBuf,

    /// Output grid file
    output: PathBuf,

    /// JSON file with conversion options
    #[arg(long)]
    config: Option<PathBuf>,

    /// World units per voxel
    #[arg(long)]
    voxel_size: Option<f64>,

    /// Name of the output grid
    #[arg(long)]
    name: Option<String>,

    /// Payload compression (none, deflate, zstd)
    #[arg(long)]
    compression: Option<CompressionMethod>,

    /// Write an empty grid when the archive declares no slices
    #[arg(long)]
    write_empty: bool,

    /// Hide the progress bar
    #[arg(short, long)]
    quiet: bool,
}

impl Args {
    fn options(&self) -> Result<ConvertOptions> {
        let mut options = match &self.config {
            Some(path) => ConvertOptions::from_json_file(path)?,
            None => ConvertOptions::default(),
        };

        if let Some(voxel_size) = self.voxel_size {
            options = options.with_voxel_size(voxel_size);
        }
        if let Some(name) = &self.name {
            options = options.with_grid_name(name.clone());
        }
        if let Some(method) = self.compression {
            options = options.with_compression(method);
        }
        if self.write_empty {
            options = options.with_write_empty_grid(true);
        }
        if self.quiet {
            options = options.with_progress(false);
        }
        Ok(options)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let converter = Converter::new(args.options()?)?;
    let report = converter
        .convert_file(&args.input, &args.output)
        .with_context(|| format!("converting {}", args.input.display()))?;

    info!("{}", report.summary());
    Ok(())
}
