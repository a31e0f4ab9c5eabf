//! Test helpers for building small PDF files with correct offsets

use bytes::Bytes;

/// Builds a single-revision PDF with a classic xref table
pub struct PdfBuilder {
    version: String,
    objects: Vec<(u32, u16, Vec<u8>)>,
    extra_rows: Vec<(u32, String)>,
    trailer_extra: String,
    with_root: bool,
    prev_to_self: bool,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self {
            version: "1.4".to_string(),
            objects: Vec::new(),
            extra_rows: Vec::new(),
            trailer_extra: String::new(),
            with_root: true,
            prev_to_self: false,
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Add `number 0 obj <body> endobj`
    pub fn object(self, number: u32, body: &str) -> Self {
        self.object_bytes(number, 0, body.as_bytes().to_vec())
    }

    pub fn object_bytes(mut self, number: u32, generation: u16, body: Vec<u8>) -> Self {
        self.objects.push((number, generation, body));
        self
    }

    /// Add a stream object; `/Length` is appended to `dict_entries`
    pub fn stream(self, number: u32, dict_entries: &str, data: &[u8]) -> Self {
        let mut body = format!("<< {dict_entries} /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.object_bytes(number, 0, body)
    }

    /// Raw xref rows (`offset gen flag`) for objects with no body
    pub fn extra_xref_rows(mut self, rows: &[(u32, &str)]) -> Self {
        self.extra_rows
            .extend(rows.iter().map(|(n, row)| (*n, row.to_string())));
        self
    }

    pub fn trailer_extra(mut self, entries: &str) -> Self {
        self.trailer_extra = entries.to_string();
        self
    }

    pub fn without_root(mut self) -> Self {
        self.with_root = false;
        self
    }

    /// Point `/Prev` at this revision's own xref section
    pub fn prev_to_self(mut self) -> Self {
        self.prev_to_self = true;
        self
    }

    pub fn build(self) -> Bytes {
        let mut out = format!("%PDF-{}\n", self.version).into_bytes();
        out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        let mut offsets = Vec::new();
        for (number, generation, body) in &self.objects {
            offsets.push((*number, *generation, out.len()));
            out.extend_from_slice(format!("{number} {generation} obj\n").as_bytes());
            out.extend_from_slice(body);
            out.extend_from_slice(b"\nendobj\n");
        }

        let xref_offset = out.len();
        let mut xref = String::from("xref\n0 1\n0000000000 65535 f \n");
        for (number, generation, offset) in &offsets {
            xref.push_str(&format!("{number} 1\n{offset:010} {generation:05} n \n"));
        }
        for (number, row) in &self.extra_rows {
            xref.push_str(&format!("{number} 1\n{row} \n"));
        }

        let max = offsets
            .iter()
            .map(|(n, _, _)| *n)
            .chain(self.extra_rows.iter().map(|(n, _)| *n))
            .max()
            .unwrap_or(0);
        let root = if self.with_root { "/Root 1 0 R " } else { "" };
        let prev = if self.prev_to_self {
            format!("/Prev {xref_offset} ")
        } else {
            String::new()
        };
        xref.push_str(&format!(
            "trailer\n<< /Size {} {root}{prev}{} >>\nstartxref\n{xref_offset}\n%%EOF\n",
            max + 1,
            self.trailer_extra
        ));
        out.extend_from_slice(xref.as_bytes());
        Bytes::from(out)
    }
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// zlib-compress `data` for building filtered streams
pub fn deflate(data: &[u8]) -> Vec<u8> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}
