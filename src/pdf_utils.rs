//! Shared lopdf helpers used by the collector and the merger.

use lopdf::{Dictionary, Document, Object};

/// Reference chains deeper than this are treated as broken.
const MAX_RESOLVE_DEPTH: usize = 32;

/// Follow indirect references until a direct object is reached.
///
/// Returns `None` for dangling or cyclic references.
pub(crate) fn resolve<'a>(document: &'a Document, object: &'a Object) -> Option<&'a Object> {
    let mut current = object;
    for _ in 0..MAX_RESOLVE_DEPTH {
        match current {
            Object::Reference(id) => current = document.get_object(*id).ok()?,
            direct => return Some(direct),
        }
    }
    None
}

/// Look up `key` in `dict` and resolve it to a dictionary.
pub(crate) fn resolve_dict<'a>(
    document: &'a Document,
    dict: &'a Dictionary,
    key: &[u8],
) -> Option<&'a Dictionary> {
    let value = dict.get(key).ok()?;
    resolve(document, value)?.as_dict().ok()
}

/// Extract a text string (e.g. a field's `/T`) from a PDF dictionary.
///
/// Returns `Some(String)` if the key exists and contains a non-empty string,
/// `None` otherwise.
pub(crate) fn extract_text_from_dict(
    document: &Document,
    dict: &Dictionary,
    key: &[u8],
) -> Option<String> {
    let value = dict.get(key).ok()?;
    decode_text_string(resolve(document, value)?).filter(|s| !s.is_empty())
}

/// Decode a PDF text string object.
///
/// Strings with a UTF-16BE or UTF-8 byte-order mark are decoded as such,
/// everything else through PDFDocEncoding. Malformed UTF-16/UTF-8 is decoded
/// lossily instead of being dropped. `None` when `object` is not a string.
pub(crate) fn decode_text_string(object: &Object) -> Option<String> {
    match lopdf::decode_text_string(object) {
        Ok(text) => match text.strip_prefix('\u{FEFF}') {
            Some(rest) => Some(rest.to_owned()),
            None => Some(text),
        },
        Err(_) => object.as_str().ok().map(decode_lossy),
    }
}

fn decode_lossy(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    let utf8 = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    String::from_utf8_lossy(utf8).into_owned()
}

/// Deep-copy `object` out of `document`, replacing every indirect reference
/// with the object it points to.
///
/// The result no longer depends on `document`'s object table and can be
/// inserted into another document. Dangling or too-deep references become
/// `Null`.
pub(crate) fn detach(document: &Document, object: &Object) -> Object {
    detach_at(document, object, 0)
}

fn detach_at(document: &Document, object: &Object, depth: usize) -> Object {
    if depth > MAX_RESOLVE_DEPTH {
        return Object::Null;
    }
    match object {
        Object::Reference(id) => match document.get_object(*id) {
            Ok(target) => detach_at(document, target, depth + 1),
            Err(_) => Object::Null,
        },
        Object::Array(items) => Object::Array(
            items
                .iter()
                .map(|item| detach_at(document, item, depth + 1))
                .collect(),
        ),
        Object::Dictionary(dict) => Object::Dictionary(detach_dict(document, dict, depth + 1)),
        Object::Stream(stream) => {
            let mut stream = stream.clone();
            stream.dict = detach_dict(document, &stream.dict, depth + 1);
            Object::Stream(stream)
        }
        direct => direct.clone(),
    }
}

fn detach_dict(document: &Document, dict: &Dictionary, depth: usize) -> Dictionary {
    let mut out = Dictionary::new();
    for (key, value) in dict.iter() {
        out.set(key.clone(), detach_at(document, value, depth));
    }
    out
}

/// Make a detached object storable in `document`.
///
/// Streams may only live as indirect objects, so every stream (at any
/// nesting level) is added to `document` and replaced by a reference.
pub(crate) fn attach(document: &mut Document, object: Object) -> Object {
    match object {
        Object::Stream(mut stream) => {
            stream.dict = attach_dict(document, stream.dict);
            Object::Reference(document.add_object(stream))
        }
        Object::Array(items) => Object::Array(
            items
                .into_iter()
                .map(|item| attach(document, item))
                .collect(),
        ),
        Object::Dictionary(dict) => Object::Dictionary(attach_dict(document, dict)),
        direct => direct,
    }
}

fn attach_dict(document: &mut Document, dict: Dictionary) -> Dictionary {
    let mut out = Dictionary::new();
    for (key, value) in dict.iter() {
        out.set(key.clone(), attach(document, value.clone()));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{dictionary, Stream, StringFormat};

    fn text(bytes: &[u8]) -> Option<String> {
        decode_text_string(&Object::String(bytes.to_vec(), StringFormat::Literal))
    }

    #[test]
    fn decodes_utf16_text_strings() {
        let bytes = [0xFE, 0xFF, 0x00, b'N', 0x00, 0xE4, 0x00, b'm'];
        assert_eq!(text(&bytes).as_deref(), Some("Näm"));
    }

    #[test]
    fn decodes_pdfdoc_encoding() {
        assert_eq!(text(&[b'A', 0x92]).as_deref(), Some("A™"));
        assert_eq!(text(&[0x80, b' ', 0x83]).as_deref(), Some("• …"));
        assert_eq!(text(&[b'K', 0xF6, b'l', b'n']).as_deref(), Some("Köln"));
        assert_eq!(text(b"plain").as_deref(), Some("plain"));
    }

    #[test]
    fn strips_utf8_byte_order_mark() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice("Größe".as_bytes());
        assert_eq!(text(&bytes).as_deref(), Some("Größe"));
    }

    #[test]
    fn malformed_utf16_is_decoded_lossily() {
        // Unpaired high surrogate.
        let bytes = [0xFE, 0xFF, 0xD8, 0x00, 0x00, b'x'];
        assert_eq!(text(&bytes).as_deref(), Some("\u{FFFD}x"));
    }

    #[test]
    fn non_strings_are_not_text() {
        assert_eq!(decode_text_string(&Object::Integer(4)), None);
    }

    #[test]
    fn detach_resolves_nested_references() {
        let mut doc = Document::with_version("1.5");
        let inner = doc.add_object(Object::string_literal("deep"));
        let array = doc.add_object(Object::Array(vec![inner.into(), 7.into()]));

        let detached = detach(&doc, &Object::Reference(array));
        let items = detached.as_array().unwrap();
        assert_eq!(items[0].as_str().unwrap(), b"deep");
        assert_eq!(items[1].as_i64().unwrap(), 7);
    }

    #[test]
    fn detach_breaks_reference_cycles() {
        let mut doc = Document::with_version("1.5");
        let id = doc.new_object_id();
        doc.objects.insert(id, Object::Reference(id));

        assert!(matches!(detach(&doc, &Object::Reference(id)), Object::Null));
    }

    #[test]
    fn attach_moves_streams_into_the_object_table() {
        let mut doc = Document::with_version("1.5");
        let stream = Stream::new(dictionary! {}, b"rich text".to_vec());

        let attached = attach(&mut doc, Object::Stream(stream));
        let id = attached.as_reference().unwrap();
        let stored = doc.get_object(id).unwrap().as_stream().unwrap();
        assert_eq!(stored.content, b"rich text");
    }
}
