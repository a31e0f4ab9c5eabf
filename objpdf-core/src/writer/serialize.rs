//! Value serialization
//!
//! Stream payloads are written as they are; compression is decided by the
//! caller before a stream reaches this module.

use crate::objects::{Dictionary, Object, PdfString, StringEncoding};

/// Append the textual form of `object` to `out`
pub fn write_value(out: &mut Vec<u8>, object: &Object) {
    match object {
        Object::Null => out.extend_from_slice(b"null"),
        Object::Boolean(b) => out.extend_from_slice(if *b { b"true" } else { b"false" }),
        Object::Integer(i) => out.extend_from_slice(i.to_string().as_bytes()),
        Object::Real(f) => out.extend_from_slice(format_real(*f).as_bytes()),
        Object::Name(name) => write_name(out, name),
        Object::String(s) => write_string(out, s),
        Object::Date(date) => {
            out.push(b'(');
            out.extend_from_slice(date.to_pdf_string().as_bytes());
            out.push(b')');
        }
        Object::Array(arr) => {
            out.push(b'[');
            for (i, obj) in arr.iter().enumerate() {
                if i > 0 {
                    out.push(b' ');
                }
                write_value(out, obj);
            }
            out.push(b']');
        }
        Object::Dictionary(dict) => write_dictionary(out, dict),
        Object::Reference(id) => {
            out.extend_from_slice(format!("{} {} R", id.number(), id.generation()).as_bytes())
        }
        Object::Stream(stream) => {
            write_dictionary(out, stream.dict());
            out.extend_from_slice(b"\nstream\n");
            out.extend_from_slice(stream.raw_data());
            out.extend_from_slice(b"\nendstream");
        }
        Object::ObjectStream(container) => {
            write_value(out, &Object::Stream(container.stream().clone()))
        }
    }
}

/// Serialize a value into a fresh buffer
pub fn to_bytes(object: &Object) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(&mut out, object);
    out
}

fn write_dictionary(out: &mut Vec<u8>, dict: &Dictionary) {
    out.extend_from_slice(b"<<");
    for (key, value) in dict.iter() {
        out.push(b'\n');
        write_name(out, key);
        out.push(b' ');
        write_value(out, value);
    }
    out.extend_from_slice(b"\n>>");
}

fn write_name(out: &mut Vec<u8>, name: &str) {
    out.push(b'/');
    let mut utf8 = [0u8; 4];
    for ch in name.chars() {
        // Names hold one byte per char when read from a file
        let bytes: &[u8] = if (ch as u32) <= 0xFF {
            utf8[0] = ch as u8;
            &utf8[..1]
        } else {
            ch.encode_utf8(&mut utf8).as_bytes()
        };
        for &byte in bytes {
            let regular = (0x21..=0x7E).contains(&byte)
                && !matches!(
                    byte,
                    b'#' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
                );
            if regular {
                out.push(byte);
            } else {
                out.extend_from_slice(format!("#{byte:02X}").as_bytes());
            }
        }
    }
}

fn write_string(out: &mut Vec<u8>, s: &PdfString) {
    if s.encoding() == StringEncoding::Hex {
        out.push(b'<');
        for byte in s.as_bytes() {
            out.extend_from_slice(format!("{byte:02X}").as_bytes());
        }
        out.push(b'>');
        return;
    }

    out.push(b'(');
    for &byte in s.as_bytes() {
        match byte {
            b'\\' => out.extend_from_slice(b"\\\\"),
            b'(' => out.extend_from_slice(b"\\("),
            b')' => out.extend_from_slice(b"\\)"),
            b'\r' => out.extend_from_slice(b"\\r"),
            _ => out.push(byte),
        }
    }
    out.push(b')');
}

fn format_real(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    // Display never uses exponent notation for f64
    let text = format!("{value}");
    if text.contains('.') {
        text
    } else {
        format!("{text}.0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::objects::{ObjectId, PdfDate, Stream};
    use crate::parser::Parser;

    fn text(object: &Object) -> String {
        String::from_utf8(to_bytes(object)).unwrap()
    }

    #[test]
    fn test_primitives() {
        assert_eq!(text(&Object::Null), "null");
        assert_eq!(text(&Object::Boolean(false)), "false");
        assert_eq!(text(&Object::Integer(-17)), "-17");
        assert_eq!(text(&Object::Real(1.5)), "1.5");
        assert_eq!(text(&Object::Real(3.0)), "3.0");
        assert_eq!(text(&Object::Real(f64::NAN)), "0");
        assert_eq!(text(&Object::Reference(ObjectId::new(4, 2))), "4 2 R");
    }

    #[test]
    fn test_array_and_dictionary() {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::name("Page"));
        dict.set("Kids", vec![Object::Integer(1), Object::Integer(2)]);
        assert_eq!(
            text(&Object::Dictionary(dict)),
            "<<\n/Type /Page\n/Kids [1 2]\n>>"
        );
    }

    #[test]
    fn test_name_escaping() {
        assert_eq!(text(&Object::name("lime Green")), "/lime#20Green");
        assert_eq!(text(&Object::name("A#B")), "/A#23B");
        assert_eq!(text(&Object::name("")), "/");
    }

    #[test]
    fn test_string_escaping() {
        let s = PdfString::new(b"a(b)c\\d\re".to_vec(), StringEncoding::Literal);
        assert_eq!(text(&Object::String(s)), "(a\\(b\\)c\\\\d\\re)");

        let hex = PdfString::from_hex(vec![0x0A, 0xFF]);
        assert_eq!(text(&Object::String(hex)), "<0AFF>");
    }

    #[test]
    fn test_date() {
        let date = PdfDate::parse("D:20200101120000Z").unwrap();
        assert_eq!(text(&Object::Date(date)), "(D:20200101120000+00'00)");
    }

    #[test]
    fn test_stream() {
        let stream = Stream::new(Dictionary::new(), &b"xyz"[..]);
        assert_eq!(
            text(&Object::Stream(stream)),
            "<<\n/Length 3\n>>\nstream\nxyz\nendstream"
        );
    }

    #[test]
    fn test_serialized_values_parse_back() {
        let mut dict = Dictionary::new();
        dict.set("Name With Space", Object::name("x/y"));
        dict.set("Text", PdfString::from_text("Grüße (nested)"));
        dict.set("Real", Object::Real(-0.25));
        dict.set("Ref", ObjectId::new(12, 0));
        let original = Object::Dictionary(dict);

        let parsed = Parser::from_bytes(to_bytes(&original)).parse_value().unwrap();
        assert_eq!(parsed, original);
    }
}
