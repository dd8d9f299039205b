// Fixture builders shared by the integration tests.
//
// PDFs are built in memory with lopdf so the tests need no binary fixtures.

#![allow(dead_code)]

use lopdf::{dictionary, Dictionary, Document, Object, ObjectId};
use std::path::{Path, PathBuf};

/// A one-page document without a form.
pub fn blank_document() -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::from(page_id)],
            "Count" => 1i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc
}

/// A field dictionary. `field_type` is the bare `/FT` name (`"Tx"`, `"Sig"`…).
pub fn field(field_type: Option<&str>, name: Option<&str>, value: Option<Object>) -> Dictionary {
    let mut dict = Dictionary::new();
    if let Some(ft) = field_type {
        dict.set("FT", Object::Name(ft.as_bytes().to_vec()));
    }
    if let Some(t) = name {
        dict.set("T", Object::string_literal(t));
    }
    if let Some(v) = value {
        dict.set("V", v);
    }
    dict
}

/// Shorthand for a named text field holding a literal string.
pub fn text_field(name: &str, value: &str) -> Dictionary {
    field(Some("Tx"), Some(name), Some(Object::string_literal(value)))
}

/// Attach an `/AcroForm` whose `/Fields` array references `fields`.
pub fn add_form(doc: &mut Document, fields: Vec<Dictionary>) {
    let refs: Vec<Object> = fields
        .into_iter()
        .map(|f| Object::Reference(doc.add_object(f)))
        .collect();
    let form_id = doc.add_object(dictionary! { "Fields" => refs });

    let root = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
    doc.get_object_mut(root)
        .unwrap()
        .as_dict_mut()
        .unwrap()
        .set("AcroForm", Object::Reference(form_id));
}

/// Give the document an indirect `/Info` dictionary with string entries.
pub fn set_info(doc: &mut Document, entries: &[(&str, &str)]) {
    let mut info = Dictionary::new();
    for (key, value) in entries {
        info.set(key.as_bytes().to_vec(), Object::string_literal(*value));
    }
    let info_id = doc.add_object(info);
    doc.trailer.set("Info", Object::Reference(info_id));
}

/// A document with a form made of `fields`.
pub fn form_document(fields: Vec<Dictionary>) -> Document {
    let mut doc = blank_document();
    add_form(&mut doc, fields);
    doc
}

/// Save `doc` as `dir/name` and return the path.
pub fn write_pdf(doc: &mut Document, dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    doc.save(&path).unwrap();
    path
}

/// Read a string entry from the `/Info` dictionary of the PDF at `path`.
pub fn info_entry(path: &Path, key: &str) -> Option<String> {
    let doc = Document::load(path).unwrap();
    let info = match doc.trailer.get(b"Info").ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok()?.clone(),
        Object::Dictionary(dict) => dict.clone(),
        _ => return None,
    };
    let bytes = info.get(key.as_bytes()).ok()?.as_str().ok()?;
    Some(String::from_utf8_lossy(bytes).into_owned())
}

/// Stand-in for Ghostscript: copies the source to `-sOutputFile` and records
/// the directory it ran in as `converter_cwd.txt` next to the source.
pub const COPYING_STUB: &str = r#"#!/bin/sh
out=""
src=""
for arg in "$@"; do
    case "$arg" in
        -sOutputFile=*) out="${arg#-sOutputFile=}" ;;
    esac
    src="$arg"
done
pwd -P > "$(dirname "$src")/converter_cwd.txt"
cp "$src" "$out"
"#;

pub const FAILING_STUB: &str = r#"#!/bin/sh
echo "stub failure"
echo "details on stderr" >&2
exit 1
"#;

/// Exits successfully without writing anything.
pub const SILENT_STUB: &str = "#!/bin/sh\nexit 0\n";

/// Write `script` as an executable `fake-gs` in `dir`.
#[cfg(unix)]
pub fn install_stub(dir: &Path, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("fake-gs");
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// The form used by the end-to-end tests: two text fields, one signature,
/// and an existing `/Info` with `Author` and `Creator`.
pub fn sample_form(dir: &Path) -> PathBuf {
    let mut doc = form_document(vec![
        text_field("Author", "Alice"),
        text_field("Title", "Doc"),
        field(Some("Sig"), Some("Signature1"), None),
    ]);
    set_info(&mut doc, &[("Author", "Bob"), ("Creator", "Form Designer")]);
    write_pdf(&mut doc, dir, "form.pdf")
}
