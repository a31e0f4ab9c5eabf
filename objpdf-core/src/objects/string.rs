//! String objects and text decoding

/// How a string's bytes were (or will be) represented in the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringEncoding {
    /// `( ... )` literal holding single-byte or UTF-8 text
    Literal,
    /// Literal whose bytes start with the `FE FF` byte order mark
    Utf16Be,
    /// Literal whose bytes start with the `FF FE` byte order mark
    Utf16Le,
    /// `< ... >` hexadecimal literal
    Hex,
}

/// A string object: raw bytes plus an encoding tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfString {
    bytes: Vec<u8>,
    encoding: StringEncoding,
}

impl PdfString {
    pub fn new(bytes: Vec<u8>, encoding: StringEncoding) -> Self {
        Self { bytes, encoding }
    }

    /// Decode the raw lexeme of a literal string
    pub fn from_literal_lexeme(raw: &[u8]) -> Self {
        let bytes = unescape(raw);
        let encoding = if bytes.starts_with(&[0xFE, 0xFF]) {
            StringEncoding::Utf16Be
        } else if bytes.starts_with(&[0xFF, 0xFE]) {
            StringEncoding::Utf16Le
        } else {
            StringEncoding::Literal
        };
        Self { bytes, encoding }
    }

    /// Wrap the decoded bytes of a hex string
    pub fn from_hex(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            encoding: StringEncoding::Hex,
        }
    }

    /// Build a text string: a plain literal for ASCII, UTF-16BE with a BOM otherwise
    pub fn from_text(text: &str) -> Self {
        if text.is_ascii() {
            return Self {
                bytes: text.as_bytes().to_vec(),
                encoding: StringEncoding::Literal,
            };
        }
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Self {
            bytes,
            encoding: StringEncoding::Utf16Be,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn encoding(&self) -> StringEncoding {
        self.encoding
    }

    /// Decode the bytes as text
    pub fn text(&self) -> String {
        if self.bytes.starts_with(&[0xFE, 0xFF]) {
            return decode_utf16(&self.bytes[2..], u16::from_be_bytes);
        }
        if self.bytes.starts_with(&[0xFF, 0xFE]) {
            return decode_utf16(&self.bytes[2..], u16::from_le_bytes);
        }
        match std::str::from_utf8(&self.bytes) {
            Ok(text) => text.to_string(),
            // Latin-1 fallback
            Err(_) => self.bytes.iter().map(|&b| b as char).collect(),
        }
    }
}

fn decode_utf16(bytes: &[u8], convert: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| convert([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Apply the backslash escapes of a literal string
fn unescape(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let ch = raw[i];
        i += 1;
        if ch != b'\\' {
            out.push(ch);
            continue;
        }
        let Some(&next) = raw.get(i) else {
            break;
        };
        i += 1;
        match next {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0C),
            b'0'..=b'7' => {
                let mut value = (next - b'0') as u32;
                let mut digits = 1;
                while digits < 3 {
                    match raw.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            value = value * 8 + (d - b'0') as u32;
                            i += 1;
                            digits += 1;
                        }
                        _ => break,
                    }
                }
                out.push((value & 0xFF) as u8);
            }
            b'\r' => {
                if raw.get(i) == Some(&b'\n') {
                    i += 1;
                }
            }
            b'\n' => {}
            // \( \) \\ and unknown escapes keep the character
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_sequences() {
        let s = PdfString::from_literal_lexeme(br"Hello\r\n(World)");
        assert_eq!(s.as_bytes(), b"Hello\r\n(World)");

        let s = PdfString::from_literal_lexeme(br"a\(b\)c\\d\te");
        assert_eq!(s.as_bytes(), b"a(b)c\\d\te");
    }

    #[test]
    fn test_octal_escapes() {
        let s = PdfString::from_literal_lexeme(br"\101\12\0053");
        assert_eq!(s.as_bytes(), &[b'A', b'\n', 0x05, b'3']);
    }

    #[test]
    fn test_unknown_escape_drops_backslash() {
        let s = PdfString::from_literal_lexeme(br"\q");
        assert_eq!(s.as_bytes(), b"q");
    }

    #[test]
    fn test_utf16_detection() {
        let be = PdfString::from_literal_lexeme(&[0xFE, 0xFF, 0x00, b'H', 0x00, b'i']);
        assert_eq!(be.encoding(), StringEncoding::Utf16Be);
        assert_eq!(be.text(), "Hi");

        let le = PdfString::from_literal_lexeme(&[0xFF, 0xFE, b'H', 0x00, b'i', 0x00]);
        assert_eq!(le.encoding(), StringEncoding::Utf16Le);
        assert_eq!(le.text(), "Hi");
    }

    #[test]
    fn test_from_text() {
        let ascii = PdfString::from_text("Plain");
        assert_eq!(ascii.encoding(), StringEncoding::Literal);
        assert_eq!(ascii.as_bytes(), b"Plain");

        let unicode = PdfString::from_text("Grüße");
        assert_eq!(unicode.encoding(), StringEncoding::Utf16Be);
        assert_eq!(&unicode.as_bytes()[..2], &[0xFE, 0xFF]);
        assert_eq!(unicode.text(), "Grüße");
    }

    #[test]
    fn test_latin1_fallback() {
        let s = PdfString::new(vec![b'c', 0xE9], StringEncoding::Literal);
        assert_eq!(s.text(), "cé");
    }

    #[test]
    fn test_hex_string_keeps_tag() {
        let s = PdfString::from_hex(b"ID".to_vec());
        assert_eq!(s.encoding(), StringEncoding::Hex);
        assert_eq!(s.text(), "ID");
    }
}
