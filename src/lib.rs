//! # pdf2pdfa
//!
//! Turn a filled-in PDF form into a PDF/A archival copy without losing the
//! answers.
//!
//! ## What this crate does
//!
//! 1. **Collect form fields**: reads `/AcroForm /Fields` from the source PDF
//!    and keeps every named, non-signature field as a `name → value` pair.
//! 2. **Convert to PDF/A**: runs Ghostscript to produce a flattened PDF/A-1
//!    copy named `pdfa_<original name>` next to the source.
//! 3. **Merge metadata**: writes the collected pairs into the copy's `/Info`
//!    dictionary, replacing any entry with the same name.
//!
//! ## Quick example
//!
//! ```no_run
//! use pdf2pdfa::{ArchiveConfig, Pipeline};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let archived = Pipeline::new(ArchiveConfig::from_env()).run("/srv/forms/claim.pdf")?;
//! println!("PDF/A copy: {}", archived.output.display());
//! # Ok(())
//! # }
//! ```

use std::path::PathBuf;
use thiserror::Error;

mod converter;
mod fields;
mod merger;
mod pdf_utils;
mod pipeline;

pub use converter::{pdfa_output_path, ArchivalConverter, WorkingDirGuard, OUTPUT_PREFIX};
pub use fields::{FieldCollector, FieldType, FormField, MetadataMapping};
pub use merger::MetadataMerger;
pub use pipeline::{Archived, MetadataOutcome, Pipeline};

// ── Configuration ────────────────────────────────────────────────────────────

/// Environment variable that overrides [`ArchiveConfig::ghostscript`].
pub const GHOSTSCRIPT_ENV: &str = "PDF2PDFA_GHOSTSCRIPT";

/// Runtime configuration shared by every pipeline stage.
#[derive(Debug, Clone)]
pub struct ArchiveConfig {
    /// Ghostscript executable. Resolved through `PATH` when it is a bare name.
    pub ghostscript: PathBuf,

    /// Field types that are never copied into the metadata mapping.
    pub ignored_field_types: Vec<FieldType>,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            ghostscript: PathBuf::from("gs"),
            ignored_field_types: vec![FieldType::Signature],
        }
    }
}

impl ArchiveConfig {
    /// Default configuration with the converter binary taken from
    /// [`GHOSTSCRIPT_ENV`] when that variable is set and non-empty.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(gs) = std::env::var_os(GHOSTSCRIPT_ENV).filter(|v| !v.is_empty()) {
            config.ghostscript = PathBuf::from(gs);
        }
        config
    }

    /// Returns `true` when fields of `field_type` are skipped by the collector.
    pub fn ignores(&self, field_type: Option<&FieldType>) -> bool {
        field_type.is_some_and(|t| self.ignored_field_types.contains(t))
    }
}

// ── Error type ───────────────────────────────────────────────────────────────

/// Every error that this crate can produce.
///
/// Stages never print and never swallow: they all return this type, and
/// [`ArchiveError::is_recoverable`] tells the caller whether the failure means
/// "nothing to archive" or "something broke".
#[derive(Error, Debug)]
pub enum ArchiveError {
    /// The source file is missing or is not a parseable PDF.
    #[error("File '{}' not found or not a valid PDF, please specify the full path: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    /// The source PDF has no interactive form.
    #[error("File '{}' has no form fields", .path.display())]
    NoFormFields { path: PathBuf },

    /// The form exists but every field was unnamed or of an ignored type.
    #[error("File '{}' has no named form fields to carry over", .path.display())]
    NoUsableFields { path: PathBuf },

    /// The path has no file name component to derive an output name from.
    #[error("Path '{}' does not name a file", .path.display())]
    InvalidPath { path: PathBuf },

    /// The converter binary could not be started at all.
    #[error("Cannot run converter '{}': {source}", .program.display())]
    ConverterUnavailable {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The converter ran and exited unsuccessfully.
    #[error("Command '{command}' returned with error (code {}): {output}", describe_exit_code(.code))]
    Conversion {
        command: String,
        code: Option<i32>,
        output: String,
    },

    /// The converted file could not be reopened for the metadata merge.
    #[error("File '{}' does not exist, metadata will not be updated: {source}", .path.display())]
    MetadataTargetMissing {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },

    /// Serializing the updated document failed.
    #[error("Failed to write '{}': {detail}", .path.display())]
    Write { path: PathBuf, detail: String },

    /// The underlying lopdf library returned an error.
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// A filesystem I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ArchiveError {
    /// Returns `true` for failures that mean the input simply has nothing to
    /// archive, or that the archive was produced without its metadata.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Parse { .. }
                | Self::NoFormFields { .. }
                | Self::NoUsableFields { .. }
                | Self::MetadataTargetMissing { .. }
        )
    }
}

fn describe_exit_code(code: &Option<i32>) -> String {
    code.map_or_else(|| "none, terminated by signal".to_string(), |c| c.to_string())
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, ArchiveError>;
