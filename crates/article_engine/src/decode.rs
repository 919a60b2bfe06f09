use chardetng::EncodingDetector;
use encoding_rs::Encoding;

const META_SNIFF_BYTES: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedHtml {
    pub html: String,
    pub encoding_label: String,
}

/// Decode raw bytes into UTF-8 using: BOM -> meta charset -> UTF-8 validity -> chardetng fallback.
///
/// Decoding is lossy: a body cut at the byte cap may end inside a character.
pub fn decode_html(bytes: &[u8]) -> DecodedHtml {
    // 1) BOM aware decode using encoding_rs helper
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return decode_with(&bytes[bom_len..], encoding);
    }

    // 2) <meta charset> or http-equiv declaration near the top of the document
    if let Some(enc) = sniff_meta_charset(bytes).and_then(|label| Encoding::for_label(label.as_bytes())) {
        return decode_with(bytes, ascii_compatible(enc));
    }

    // 3) UTF-8, tolerating a sequence cut off by the byte cap
    if is_utf8_prefix(bytes) {
        return decode_with(bytes, encoding_rs::UTF_8);
    }

    // 4) chardetng detection over the full body
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let enc = detector.guess(None, true);
    decode_with(bytes, enc)
}

fn sniff_meta_charset(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(META_SNIFF_BYTES)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    let mut rest = head.as_str();
    while let Some(idx) = rest.find("<meta") {
        rest = &rest[idx + "<meta".len()..];
        let tag_end = rest.find('>').unwrap_or(rest.len());
        let tag = &rest[..tag_end];
        if let Some(pos) = tag.find("charset=") {
            let value = tag[pos + "charset=".len()..]
                .trim_start_matches(|c: char| c == '"' || c == '\'')
                .split(|c: char| c == '"' || c == '\'' || c == ';' || c == '/' || c.is_whitespace())
                .next()
                .unwrap_or_default();
            if !value.is_empty() {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// A document that can declare its charset in ASCII is not UTF-16; treat it as UTF-8.
fn ascii_compatible(enc: &'static Encoding) -> &'static Encoding {
    if enc == encoding_rs::UTF_16LE || enc == encoding_rs::UTF_16BE {
        encoding_rs::UTF_8
    } else {
        enc
    }
}

fn is_utf8_prefix(bytes: &[u8]) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(_) => true,
        Err(err) => err.error_len().is_none(),
    }
}

fn decode_with(bytes: &[u8], enc: &'static Encoding) -> DecodedHtml {
    let (text, _) = enc.decode_without_bom_handling(bytes);
    DecodedHtml {
        html: text.into_owned(),
        encoding_label: enc.name().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_charset_is_sniffed() {
        let html = br#"<html><head><meta charset="iso-8859-1"></head><body>caf\xe9</body></html>"#;
        assert_eq!(sniff_meta_charset(html).as_deref(), Some("iso-8859-1"));
    }

    #[test]
    fn http_equiv_charset_is_sniffed() {
        let html = br#"<meta http-equiv="Content-Type" content="text/html; charset=Shift_JIS">"#;
        assert_eq!(sniff_meta_charset(html).as_deref(), Some("shift_jis"));
    }

    #[test]
    fn incomplete_trailing_sequence_still_counts_as_utf8() {
        assert!(is_utf8_prefix(b"na\xC3\xAFve\xC3"));
        assert!(!is_utf8_prefix(b"caf\xe9 au lait"));
    }

    #[test]
    fn utf16_declarations_map_to_utf8() {
        assert_eq!(ascii_compatible(encoding_rs::UTF_16LE), encoding_rs::UTF_8);
        assert_eq!(ascii_compatible(encoding_rs::UTF_16BE), encoding_rs::UTF_8);
        assert_eq!(ascii_compatible(encoding_rs::SHIFT_JIS), encoding_rs::SHIFT_JIS);
    }

    #[test]
    fn missing_declaration_yields_none() {
        assert_eq!(sniff_meta_charset(b"<html><body>plain</body></html>"), None);
    }
}
