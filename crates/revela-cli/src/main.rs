//! revela - photo adjustment export CLI
//!
//! The command-line driver for the revela engine: decode an image, apply
//! a parameter snapshot, write the full-resolution result. Exports run
//! the engine's non-cached path; this binary is also the reference
//! consumer of the snapshot-as-JSON persistence boundary.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use revela_core::{LinearImage, SourceMetadata};
use revela_engine::{EngineConfig, MemorySource, RenderEngine, SourceProvider};
use revela_params::AdjustmentParameters;
use revela_transfer::srgb::srgb_to_linear;

#[derive(Parser)]
#[command(name = "revela")]
#[command(author, version, about = "Photo adjustment engine CLI")]
#[command(long_about = "
Applies a revela adjustment snapshot to an image and exports the result.

Examples:
  revela export photo.jpg out.png
  revela export photo.jpg out.png -p edits.json --dither
  revela export photo.jpg out.png --exposure 0.5 --contrast 0.2
  revela info photo.jpg
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render an image with adjustments and write the result
    #[command(visible_alias = "e")]
    Export(ExportArgs),

    /// Show image information
    #[command(visible_alias = "i")]
    Info(InfoArgs),
}

#[derive(Args)]
struct ExportArgs {
    /// Input image (PNG/JPEG)
    input: PathBuf,

    /// Output image (PNG/JPEG)
    output: PathBuf,

    /// Adjustment snapshot as a JSON file
    #[arg(short, long)]
    params: Option<PathBuf>,

    /// Exposure override in stops
    #[arg(long, allow_hyphen_values = true)]
    exposure: Option<f32>,

    /// Contrast override in [-1, 1]
    #[arg(long, allow_hyphen_values = true)]
    contrast: Option<f32>,

    /// Saturation override in [-1, 1]
    #[arg(long, allow_hyphen_values = true)]
    saturation: Option<f32>,

    /// Sharpening override in [0, 1]
    #[arg(long)]
    sharpening: Option<f32>,

    /// Dither the 8-bit encode
    #[arg(long)]
    dither: bool,

    /// Disable the GPU bilateral path
    #[arg(long)]
    no_gpu: bool,
}

#[derive(Args)]
struct InfoArgs {
    /// Input image
    input: PathBuf,
}

/// Decodes an image file into linear light via the sRGB transfer.
struct FileSource {
    path: PathBuf,
}

impl FileSource {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

impl SourceProvider for FileSource {
    fn decode(&self) -> revela_engine::EngineResult<(LinearImage, SourceMetadata)> {
        let decoded = image::open(&self.path)
            .map_err(|e| revela_engine::EngineError::Decode(e.to_string()))?
            .to_rgb8();
        let (w, h) = decoded.dimensions();

        let n = w as usize * h as usize;
        let mut r = Vec::with_capacity(n);
        let mut g = Vec::with_capacity(n);
        let mut b = Vec::with_capacity(n);
        for px in decoded.pixels() {
            r.push(srgb_to_linear(px.0[0] as f32 / 255.0));
            g.push(srgb_to_linear(px.0[1] as f32 / 255.0));
            b.push(srgb_to_linear(px.0[2] as f32 / 255.0));
        }
        let img = LinearImage::from_planes(w, h, r, g, b)
            .map_err(|e| revela_engine::EngineError::Decode(e.to_string()))?;

        let metadata = SourceMetadata {
            width: w,
            height: h,
            label: self
                .path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned()),
            from_raw: false,
        };
        Ok((img, metadata))
    }
}

fn load_params(args: &ExportArgs) -> Result<AdjustmentParameters> {
    let mut params = match &args.params {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading parameters from {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("parsing parameters from {}", path.display()))?
        }
        None => AdjustmentParameters::default(),
    };

    if let Some(v) = args.exposure {
        params.exposure = v;
    }
    if let Some(v) = args.contrast {
        params.contrast = v;
    }
    if let Some(v) = args.saturation {
        params.saturation = v;
    }
    if let Some(v) = args.sharpening {
        params.sharpening = v;
    }
    Ok(params)
}

fn cmd_export(args: &ExportArgs) -> Result<()> {
    let params = load_params(args)?;
    let config = EngineConfig::builder().gpu(!args.no_gpu).build();
    let mut engine = RenderEngine::new(config);

    let metadata = engine
        .load_source(&FileSource::new(&args.input))
        .with_context(|| format!("decoding {}", args.input.display()))?;
    info!(
        width = metadata.width,
        height = metadata.height,
        "source decoded"
    );

    let buffer = engine
        .render_export(&params, args.dither)
        .context("rendering export")?;

    let out = image::RgbaImage::from_raw(buffer.width(), buffer.height(), buffer.into_data())
        .context("assembling output buffer")?;
    out.save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!(
        "{} -> {} ({}x{}{})",
        args.input.display(),
        args.output.display(),
        metadata.width,
        metadata.height,
        if args.dither { ", dithered" } else { "" }
    );
    Ok(())
}

fn cmd_info(args: &InfoArgs) -> Result<()> {
    let (img, metadata) = FileSource::new(&args.input)
        .decode()
        .with_context(|| format!("decoding {}", args.input.display()))?;

    println!("{}", args.input.display());
    println!("  dimensions: {}x{}", metadata.width, metadata.height);
    println!("  pixels:     {}", img.pixel_count());
    if let Some(label) = &metadata.label {
        println!("  label:      {label}");
    }

    let (r, g, b) = img.planes();
    for (name, plane) in [("r", r), ("g", g), ("b", b)] {
        let min = plane.iter().copied().fold(f32::INFINITY, f32::min);
        let max = plane.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mean = plane.iter().sum::<f32>() / plane.len() as f32;
        println!("  {name}: min {min:.4}  max {max:.4}  mean {mean:.4}");
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    match &cli.command {
        Commands::Export(args) => cmd_export(args),
        Commands::Info(args) => cmd_info(args),
    }
}
