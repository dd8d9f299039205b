//! CLI for converting PDF forms to PDF/A.
//!
//! A thin shim over the library: parses the single positional argument,
//! installs logging, runs the pipeline and maps its result to an exit code.
//!
//! Exit codes: `0` archive written (with or without metadata), `1` the
//! conversion failed, `2` the input had nothing to archive.

use clap::Parser;
use pdf2pdfa::{ArchiveConfig, MetadataOutcome, Pipeline};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Convert a PDF with form fields into a PDF/A copy (`pdfa_<name>` next to
/// the source) and carry the field values into its document metadata.
///
/// The Ghostscript binary can be overridden with PDF2PDFA_GHOSTSCRIPT; log
/// verbosity follows RUST_LOG.
#[derive(Parser, Debug)]
#[command(name = "pdf2pdfa", version)]
struct Cli {
    /// Path to the PDF file
    file_path: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let pipeline = Pipeline::new(ArchiveConfig::from_env());

    match pipeline.run(&cli.file_path) {
        Ok(archived) => {
            if let MetadataOutcome::NotUpdated { reason } = &archived.metadata {
                println!("{reason}");
            }
            println!("{}", archived.output.display());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_recoverable() => {
            println!("{e}");
            Ok(ExitCode::from(2))
        }
        Err(e) => Err(e.into()),
    }
}
