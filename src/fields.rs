use crate::{pdf_utils, ArchiveConfig, ArchiveError, Result};
use indexmap::IndexMap;
use lopdf::{Document, Object};
use std::path::Path;
use tracing::{debug, info};

// ── FieldType ─────────────────────────────────────────────────────────────────

/// The `/FT` entry of a form field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    /// `/Btn`: push buttons, check boxes and radio buttons.
    Button,
    /// `/Tx`
    Text,
    /// `/Ch`: list and combo boxes.
    Choice,
    /// `/Sig`
    Signature,
    /// Any other name, kept verbatim.
    Other(String),
}

impl FieldType {
    /// Map a PDF name (without the leading slash) to a field type.
    pub fn from_name(name: &[u8]) -> Self {
        match name {
            b"Btn" => Self::Button,
            b"Tx" => Self::Text,
            b"Ch" => Self::Choice,
            b"Sig" => Self::Signature,
            other => Self::Other(String::from_utf8_lossy(other).into_owned()),
        }
    }

    /// The PDF name for this type.
    pub fn as_name(&self) -> &str {
        match self {
            Self::Button => "Btn",
            Self::Text => "Tx",
            Self::Choice => "Ch",
            Self::Signature => "Sig",
            Self::Other(name) => name,
        }
    }
}

// ── FormField ─────────────────────────────────────────────────────────────────

/// One entry of the document's `/AcroForm /Fields` array.
#[derive(Debug, Clone)]
pub struct FormField {
    /// `/FT`, absent on fields that inherit their type or declare none.
    pub field_type: Option<FieldType>,

    /// `/T`, decoded to a Rust string. `None` when missing or empty.
    pub name: Option<String>,

    /// `/V` with indirect references resolved, so the value can be stored in
    /// another document. `Object::Null` when the field has no value.
    pub value: Object,
}

/// Field name → field value, in form order. Later duplicates replace earlier
/// ones.
pub type MetadataMapping = IndexMap<String, Object>;

// ── FieldCollector ────────────────────────────────────────────────────────────

/// Reads a PDF form and turns its fields into a [`MetadataMapping`].
pub struct FieldCollector<'a> {
    config: &'a ArchiveConfig,
}

impl<'a> FieldCollector<'a> {
    pub fn new(config: &'a ArchiveConfig) -> Self {
        Self { config }
    }

    /// Parse the PDF at `path` and collect its usable form fields.
    ///
    /// # Errors
    ///
    /// * [`ArchiveError::Parse`] when the file is missing or malformed.
    /// * [`ArchiveError::NoFormFields`] when the document has no `/AcroForm`.
    ///
    /// An empty mapping is returned as `Ok`; deciding whether that is fatal is
    /// left to the caller.
    pub fn collect<P: AsRef<Path>>(&self, path: P) -> Result<MetadataMapping> {
        let path = path.as_ref();
        let document = Document::load(path).map_err(|source| ArchiveError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let mapping = self
            .collect_from_document(&document)
            .ok_or_else(|| ArchiveError::NoFormFields {
                path: path.to_path_buf(),
            })?;

        info!(
            path = %path.display(),
            fields = mapping.len(),
            "collected form fields"
        );
        Ok(mapping)
    }

    /// Collect usable fields from an already parsed document, or `None` when
    /// it has no form.
    ///
    /// A field is kept when it has a non-empty name and its type is not in
    /// [`ArchiveConfig::ignored_field_types`].
    pub fn collect_from_document(&self, document: &Document) -> Option<MetadataMapping> {
        let mut mapping = MetadataMapping::new();

        for field in Self::fields(document)? {
            if self.config.ignores(field.field_type.as_ref()) {
                debug!(name = ?field.name, "skipping ignored field type");
                continue;
            }
            let Some(name) = field.name else {
                debug!("skipping unnamed field");
                continue;
            };
            debug!(%name, "collected field");
            mapping.insert(name, field.value);
        }

        Some(mapping)
    }

    /// Every entry of the flat `/AcroForm /Fields` array, unfiltered.
    ///
    /// Returns `None` when the catalog has no `/AcroForm` or the form has no
    /// `/Fields` array.
    pub fn fields(document: &Document) -> Option<Vec<FormField>> {
        let catalog = document.catalog().ok()?;
        let acro_form = pdf_utils::resolve_dict(document, catalog, b"AcroForm")?;
        let entries = acro_form
            .get(b"Fields")
            .ok()
            .and_then(|v| pdf_utils::resolve(document, v))?
            .as_array()
            .ok()?;

        let mut fields = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(dict) = pdf_utils::resolve(document, entry).and_then(|o| o.as_dict().ok())
            else {
                debug!("skipping /Fields entry that is not a dictionary");
                continue;
            };

            let field_type = dict
                .get(b"FT")
                .ok()
                .and_then(|v| pdf_utils::resolve(document, v))
                .and_then(|v| v.as_name().ok())
                .map(FieldType::from_name);

            let value = dict
                .get(b"V")
                .map(|v| pdf_utils::detach(document, v))
                .unwrap_or(Object::Null);

            fields.push(FormField {
                field_type,
                name: pdf_utils::extract_text_from_dict(document, dict, b"T"),
                value,
            });
        }

        Some(fields)
    }
}
