use crate::converter::ArchivalConverter;
use crate::fields::FieldCollector;
use crate::merger::MetadataMerger;
use crate::{ArchiveConfig, ArchiveError, Result};
use std::env;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Entry point: collect form fields, convert to PDF/A, merge the fields into
/// the copy's metadata.
///
/// ```no_run
/// use pdf2pdfa::{ArchiveConfig, MetadataOutcome, Pipeline};
///
/// let pipeline = Pipeline::new(ArchiveConfig::default());
/// match pipeline.run("form.pdf") {
///     Ok(archived) => {
///         println!("wrote {}", archived.output.display());
///         if let MetadataOutcome::NotUpdated { reason } = archived.metadata {
///             println!("metadata not updated: {reason}");
///         }
///     }
///     Err(e) if e.is_recoverable() => println!("{e}"),
///     Err(e) => panic!("{e}"),
/// }
/// ```
pub struct Pipeline {
    config: ArchiveConfig,
}

/// A PDF/A copy that was written to disk.
#[derive(Debug)]
pub struct Archived {
    /// Path of the PDF/A file (`pdfa_<name>` next to the source).
    pub output: PathBuf,

    /// Whether the form fields made it into the copy's `/Info` dictionary.
    pub metadata: MetadataOutcome,
}

/// Result of the metadata stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataOutcome {
    /// Every collected field was written; `entries` is how many.
    Merged { entries: usize },

    /// The converted file could not be reopened. It is kept as produced by
    /// the converter, without the form fields.
    NotUpdated { reason: String },
}

impl Pipeline {
    pub fn new(config: ArchiveConfig) -> Self {
        Self { config }
    }

    /// Returns a reference to the active [`ArchiveConfig`].
    pub fn config(&self) -> &ArchiveConfig {
        &self.config
    }

    /// Archive the form at `source`.
    ///
    /// Relative paths are resolved against the current directory first. The
    /// converter is only started when at least one usable field was found.
    ///
    /// # Errors
    ///
    /// Everything except [`ArchiveError::MetadataTargetMissing`] is returned
    /// as-is; that one becomes [`MetadataOutcome::NotUpdated`] because the
    /// PDF/A file already exists at that point.
    pub fn run<P: AsRef<Path>>(&self, source: P) -> Result<Archived> {
        let source = absolute(source.as_ref())?;

        let mapping = FieldCollector::new(&self.config).collect(&source)?;
        if mapping.is_empty() {
            return Err(ArchiveError::NoUsableFields { path: source });
        }

        let output = ArchivalConverter::new(&self.config).convert(&source)?;

        let metadata = match MetadataMerger::merge(&output, &mapping) {
            Ok(entries) => MetadataOutcome::Merged { entries },
            Err(e @ ArchiveError::MetadataTargetMissing { .. }) => {
                warn!("{e}");
                MetadataOutcome::NotUpdated {
                    reason: e.to_string(),
                }
            }
            Err(e) => return Err(e),
        };

        info!(output = %output.display(), "archive complete");
        Ok(Archived { output, metadata })
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(env::current_dir()?.join(path))
    }
}
