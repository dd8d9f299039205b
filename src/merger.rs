use crate::{pdf_utils, ArchiveError, MetadataMapping, Result};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Where the trailer keeps `/Info`.
enum InfoLocation {
    Indirect(ObjectId),
    Inline,
    Missing,
}

/// Writes a [`MetadataMapping`] into a PDF's `/Info` dictionary.
pub struct MetadataMerger;

impl MetadataMerger {
    /// Reopen `path`, merge `mapping` into its `/Info` dictionary and write
    /// the document back to the same path.
    ///
    /// Returns the number of entries applied.
    ///
    /// # Errors
    ///
    /// * [`ArchiveError::MetadataTargetMissing`] when `path` cannot be parsed.
    ///   The file is not touched.
    /// * [`ArchiveError::Write`] when serialization fails. The document is
    ///   written to a sibling temporary file first and renamed over `path`,
    ///   so the previous contents survive a failed write.
    pub fn merge<P: AsRef<Path>>(path: P, mapping: &MetadataMapping) -> Result<usize> {
        let path = path.as_ref();
        let mut document =
            Document::load(path).map_err(|source| ArchiveError::MetadataTargetMissing {
                path: path.to_path_buf(),
                source,
            })?;

        let applied = Self::merge_into(&mut document, mapping)?;
        Self::save_in_place(&mut document, path)?;

        info!(path = %path.display(), entries = applied, "updated document metadata");
        Ok(applied)
    }

    /// Apply `mapping` to `document`'s `/Info` dictionary, creating it when
    /// the trailer has none.
    ///
    /// Every key is overwritten unconditionally; keys not in `mapping` are
    /// left alone. A `Null` value removes the key.
    pub fn merge_into(document: &mut Document, mapping: &MetadataMapping) -> Result<usize> {
        // Streams must become indirect objects before /Info is borrowed.
        let entries: Vec<(&str, Object)> = mapping
            .iter()
            .map(|(name, value)| (name.as_str(), pdf_utils::attach(document, value.clone())))
            .collect();

        let info = Self::info_dictionary_mut(document)?;
        for (name, value) in &entries {
            if matches!(value, Object::Null) {
                debug!(%name, "removing metadata entry");
                info.remove(name.as_bytes());
            } else {
                debug!(%name, "setting metadata entry");
                info.set(name.as_bytes().to_vec(), value.clone());
            }
        }

        Ok(entries.len())
    }

    fn info_dictionary_mut(document: &mut Document) -> Result<&mut Dictionary> {
        let location = match document.trailer.get(b"Info") {
            Ok(Object::Reference(id)) => InfoLocation::Indirect(*id),
            Ok(Object::Dictionary(_)) => InfoLocation::Inline,
            _ => InfoLocation::Missing,
        };

        let info = match location {
            InfoLocation::Indirect(id) => document.get_object_mut(id)?,
            InfoLocation::Inline => document.trailer.get_mut(b"Info")?,
            InfoLocation::Missing => {
                debug!("document has no /Info dictionary, creating one");
                let id = document.add_object(Dictionary::new());
                document.trailer.set("Info", Object::Reference(id));
                document.get_object_mut(id)?
            }
        };

        Ok(info.as_dict_mut()?)
    }

    fn save_in_place(document: &mut Document, path: &Path) -> Result<()> {
        let write_error = |detail: String| ArchiveError::Write {
            path: path.to_path_buf(),
            detail,
        };

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut staged = NamedTempFile::new_in(dir)?;
        // Keep the converter's file mode rather than the temp file's 0600.
        if let Ok(metadata) = std::fs::metadata(path) {
            staged.as_file().set_permissions(metadata.permissions())?;
        }

        document
            .save_to(&mut staged)
            .map_err(|e| write_error(e.to_string()))?;
        staged
            .persist(path)
            .map_err(|e| write_error(e.error.to_string()))?;
        Ok(())
    }
}
