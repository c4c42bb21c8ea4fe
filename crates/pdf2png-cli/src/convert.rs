//! Convert command - validate inputs and write one PNG per page.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, bail};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use pdf2png_core::{ConversionRequest, Pdf2PngConfig, convert_pdf_with_progress};

/// Arguments for the conversion.
#[derive(Args)]
pub struct ConvertArgs {
    /// Path to the input PDF file (must be a scanned document)
    pdf_path: PathBuf,

    /// Directory where PNG files will be written
    output_dir: PathBuf,

    /// Prefix for output filenames (default: the PDF file name without extension)
    #[arg(long)]
    prefix: Option<String>,

    /// Overwrite existing PNG files if they already exist
    #[arg(long)]
    overwrite: bool,
}

pub fn run(args: ConvertArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let start = Instant::now();

    if !args.pdf_path.exists() {
        bail!("Input PDF does not exist: {}", args.pdf_path.display());
    }

    let is_pdf = args
        .pdf_path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        bail!("Input file must be a PDF");
    }

    let config = match config_path {
        Some(path) => Pdf2PngConfig::from_file(path)
            .map_err(|e| anyhow!("Unable to load config {}: {}", path.display(), e))?,
        None => Pdf2PngConfig::default(),
    };
    debug!("Using configuration: {:?}", config);

    if let Err(e) = fs::create_dir_all(&args.output_dir) {
        bail!(
            "Unable to create output directory {}: {}",
            args.output_dir.display(),
            e
        );
    }

    let request = ConversionRequest::new(&args.pdf_path, &args.output_dir)
        .with_prefix(args.prefix)
        .with_overwrite(args.overwrite);

    info!(
        "Converting {} into {} with prefix {:?}",
        request.source.display(),
        request.output_dir.display(),
        request.prefix
    );

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("##-"),
    );

    let result = convert_pdf_with_progress(&request, &config, |page| {
        pb.set_length(page.total as u64);
        pb.set_position(page.index as u64);
        pb.set_message(format!("{}x{}", page.width, page.height));
    });

    let summary = match result {
        Ok(summary) => summary,
        Err(e) => {
            pb.abandon();
            return Err(e.into());
        }
    };
    pb.finish_and_clear();

    info!(
        "Wrote {} PNG files to {} in {:?}",
        summary.pages.len(),
        request.output_dir.display(),
        start.elapsed()
    );

    Ok(())
}
