use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use mrr_series::{Mask, ReadOptions, SeriesAssembler, UnwrapSettings};

/// Assemble a series of phase-contrast DICOM slices
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Any file of the series, e.g. data/188_13-12-10_56_1
    example: PathBuf,

    /// Unwrap every slice with this algorithm (primary-gold, native-gold, itoh)
    #[arg(long)]
    unwrap: Option<String>,

    /// Mask image, required with --unwrap
    #[arg(long)]
    mask: Option<PathBuf>,

    /// Use the mask image as is, even if it looks inverted
    #[arg(long)]
    no_invert_check: bool,

    /// Decode slices in parallel
    #[arg(long)]
    parallel: bool,

    /// Write the mean image of every volume as PNG into this directory
    #[arg(long)]
    preview: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mask = args
        .mask
        .as_ref()
        .map(|path| {
            Mask::from_image_file(path, !args.no_invert_check)
                .with_context(|| format!("reading mask {}", path.display()))
        })
        .transpose()?;

    let options = match &args.unwrap {
        Some(algorithm) => ReadOptions::new().with_unwrap(UnwrapSettings::new(algorithm)),
        None => ReadOptions::new(),
    };

    let series = SeriesAssembler::new()
        .with_parallel(args.parallel)
        .assemble(&args.example, &options, mask.as_ref())
        .with_context(|| format!("assembling series of {}", args.example.display()))?;

    for (i, volume) in series.into_vec().iter().enumerate() {
        println!(
            "PTFT {:>8}: {:?} (slices, rows, columns), first file {}",
            volume.ptft(),
            volume.dim(),
            volume.metadata.orig_file,
        );

        if let Some(directory) = &args.preview {
            let path = directory.join(format!("mean_{i}.png"));
            if let Some(image) = volume.mean_to_image() {
                image
                    .save(&path)
                    .with_context(|| format!("writing preview {}", path.display()))?;
            }
        }
    }

    Ok(())
}
