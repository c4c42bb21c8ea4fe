//! CLI application for extracting the scanned image of each PDF page.

mod convert;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Convert each page of a scanned PDF into a lossless PNG file.
/// The output files are named with a page number suffix.
#[derive(Parser)]
#[command(name = "pdf2png")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    convert: convert::ConvertArgs,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    // Only the top-level message is shown, on a single line.
    match convert::run(cli.convert, cli.config.as_deref()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
