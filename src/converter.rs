use crate::{ArchiveConfig, ArchiveError, Result};
use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, warn};

/// Prefix put in front of the source file name to name the PDF/A copy.
pub const OUTPUT_PREFIX: &str = "pdfa_";

/// Ghostscript switches selecting PDF/A-1 output in batch mode.
///
/// `PDFACompatibilityPolicy=2` makes Ghostscript abort on content it cannot
/// make conformant instead of silently dropping it.
const PDFA_FLAGS: &[&str] = &[
    "-dPDFA=1",
    "-dBATCH",
    "-dNOPAUSE",
    "-sProcessColorModel=DeviceRGB",
    "-sDEVICE=pdfwrite",
    "-sPDFACompatibilityPolicy=2",
];

/// Where the PDF/A copy of `source` is written: `pdfa_<name>` in the same
/// directory.
///
/// ```
/// use std::path::Path;
/// let out = pdf2pdfa::pdfa_output_path("/srv/forms/claim.pdf").unwrap();
/// assert_eq!(out, Path::new("/srv/forms/pdfa_claim.pdf"));
/// ```
pub fn pdfa_output_path<P: AsRef<Path>>(source: P) -> Result<PathBuf> {
    let source = source.as_ref();
    let file_name = source.file_name().ok_or_else(|| ArchiveError::InvalidPath {
        path: source.to_path_buf(),
    })?;

    let mut output_name = OsString::from(OUTPUT_PREFIX);
    output_name.push(file_name);
    Ok(source.with_file_name(output_name))
}

// ── WorkingDirGuard ───────────────────────────────────────────────────────────

/// Switches the process working directory and switches it back on drop.
///
/// Restoration happens on every exit path, including early returns and
/// panics unwinding through the owner.
#[must_use = "the previous working directory is restored when the guard is dropped"]
pub struct WorkingDirGuard {
    previous: PathBuf,
}

impl WorkingDirGuard {
    /// Remember the current directory and change into `dir`.
    pub fn enter<P: AsRef<Path>>(dir: P) -> io::Result<Self> {
        let previous = env::current_dir()?;
        env::set_current_dir(dir.as_ref())?;
        debug!(from = %previous.display(), to = %dir.as_ref().display(), "changed working directory");
        Ok(Self { previous })
    }

    /// The directory that will be restored.
    pub fn previous(&self) -> &Path {
        &self.previous
    }
}

impl Drop for WorkingDirGuard {
    fn drop(&mut self) {
        if let Err(e) = env::set_current_dir(&self.previous) {
            warn!(dir = %self.previous.display(), "failed to restore working directory: {e}");
        }
    }
}

// ── ArchivalConverter ─────────────────────────────────────────────────────────

/// Runs Ghostscript to produce a flattened PDF/A-1 copy of a PDF.
pub struct ArchivalConverter<'a> {
    config: &'a ArchiveConfig,
}

impl<'a> ArchivalConverter<'a> {
    pub fn new(config: &'a ArchiveConfig) -> Self {
        Self { config }
    }

    /// Convert `source` (an absolute path) and return the output path from
    /// [`pdfa_output_path`].
    ///
    /// The working directory is the source's directory while the converter
    /// runs, and is restored afterwards whether or not it succeeded. The call
    /// blocks until the converter exits; there is no timeout.
    ///
    /// # Errors
    ///
    /// * [`ArchiveError::ConverterUnavailable`] when the binary cannot be
    ///   started.
    /// * [`ArchiveError::Conversion`] when it exits with a non-zero status.
    pub fn convert<P: AsRef<Path>>(&self, source: P) -> Result<PathBuf> {
        let source = source.as_ref();
        let output = pdfa_output_path(source)?;
        let args = self.command_line(source, &output);
        let command = self.render_command(&args);

        let working_dir = source
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| ArchiveError::InvalidPath {
                path: source.to_path_buf(),
            })?;

        info!(%command, "running PDF/A converter");
        let result = {
            let _cwd = WorkingDirGuard::enter(working_dir)?;
            Command::new(&self.config.ghostscript).args(&args).output()
        };

        let result = result.map_err(|source| ArchiveError::ConverterUnavailable {
            program: self.config.ghostscript.clone(),
            source,
        })?;

        if !result.status.success() {
            let mut captured = String::from_utf8_lossy(&result.stdout).into_owned();
            captured.push_str(&String::from_utf8_lossy(&result.stderr));
            return Err(ArchiveError::Conversion {
                command,
                code: result.status.code(),
                output: captured,
            });
        }

        info!(output = %output.display(), "PDF/A conversion finished");
        Ok(output)
    }

    /// Arguments passed to the converter (excluding the program itself).
    pub fn command_line(&self, source: &Path, output: &Path) -> Vec<OsString> {
        let mut out_flag = OsString::from("-sOutputFile=");
        out_flag.push(output);

        PDFA_FLAGS
            .iter()
            .map(OsString::from)
            .chain([out_flag, source.as_os_str().to_owned()])
            .collect()
    }

    fn render_command(&self, args: &[OsString]) -> String {
        std::iter::once(self.config.ghostscript.as_os_str())
            .chain(args.iter().map(OsString::as_os_str))
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
