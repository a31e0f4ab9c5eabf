//! Builds PDF files byte by byte, with correct offsets, for integration tests

#![allow(dead_code)]

use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

/// An in-memory PDF assembled one revision at a time
pub struct PdfFile {
    out: Vec<u8>,
    pending: Vec<(u32, u16, usize)>,
    max_number: u32,
    last_xref: Option<usize>,
}

impl PdfFile {
    pub fn new(version: &str) -> Self {
        let mut out = format!("%PDF-{version}\n").into_bytes();
        out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
        Self {
            out,
            pending: Vec::new(),
            max_number: 0,
            last_xref: None,
        }
    }

    pub fn object(&mut self, number: u32, body: &str) -> &mut Self {
        self.object_with_generation(number, 0, body.as_bytes())
    }

    pub fn object_with_generation(&mut self, number: u32, generation: u16, body: &[u8]) -> &mut Self {
        self.pending.push((number, generation, self.out.len()));
        self.max_number = self.max_number.max(number);
        self.out
            .extend_from_slice(format!("{number} {generation} obj\n").as_bytes());
        self.out.extend_from_slice(body);
        self.out.extend_from_slice(b"\nendobj\n");
        self
    }

    /// A stream object; `/Length` is appended to `dict_entries`
    pub fn stream(&mut self, number: u32, dict_entries: &str, data: &[u8]) -> &mut Self {
        let mut body =
            format!("<< {dict_entries} /Length {} >>\nstream\n", data.len()).into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(b"\nendstream");
        self.object_with_generation(number, 0, &body)
    }

    /// Close the revision with a classic table of the objects added since
    /// the previous revision
    pub fn finish_table(&mut self, trailer_entries: &str) -> &mut Self {
        let xref_offset = self.out.len();
        let mut xref = String::from("xref\n0 1\n0000000000 65535 f \n");
        for (number, generation, offset) in self.pending.drain(..) {
            xref.push_str(&format!("{number} 1\n{offset:010} {generation:05} n \n"));
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} {trailer_entries}{} >>\nstartxref\n{xref_offset}\n%%EOF\n",
            self.max_number + 1,
            self.prev_entry()
        ));
        self.out.extend_from_slice(xref.as_bytes());
        self.last_xref = Some(xref_offset);
        self
    }

    /// Close the revision with a cross-reference stream numbered
    /// `xref_number`; `compressed` rows are `(number, container, index)`
    pub fn finish_stream(
        &mut self,
        xref_number: u32,
        trailer_entries: &str,
        compressed: &[(u32, u32, u32)],
    ) -> &mut Self {
        let xref_offset = self.out.len();
        let mut rows: Vec<(u32, [u64; 3])> = self
            .pending
            .drain(..)
            .map(|(number, generation, offset)| (number, [1, offset as u64, generation as u64]))
            .collect();
        rows.extend(
            compressed
                .iter()
                .map(|(number, container, index)| (*number, [2, *container as u64, *index as u64])),
        );
        rows.push((xref_number, [1, xref_offset as u64, 0]));
        rows.sort_by_key(|(number, _)| *number);

        let mut data = Vec::new();
        let mut index = String::new();
        for (number, [kind, field2, field3]) in &rows {
            index.push_str(&format!("{number} 1 "));
            data.push(*kind as u8);
            data.extend_from_slice(&(*field2 as u32).to_be_bytes());
            data.extend_from_slice(&(*field3 as u16).to_be_bytes());
        }

        let size = rows
            .iter()
            .map(|(number, _)| *number)
            .max()
            .unwrap_or(0)
            .max(self.max_number)
            + 1;
        let dict = format!(
            "/Type /XRef /Size {size} /W [1 4 2] /Index [{}] {trailer_entries}{}",
            index.trim_end(),
            self.prev_entry()
        );
        self.stream(xref_number, &dict, &data);
        self.pending.clear();
        self.out
            .extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());
        self.last_xref = Some(xref_offset);
        self
    }

    /// Append bytes that belong to no object
    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.out.extend_from_slice(bytes);
        self
    }

    pub fn len(&self) -> usize {
        self.out.len()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.out.clone()
    }

    fn prev_entry(&self) -> String {
        self.last_xref
            .map(|offset| format!(" /Prev {offset}"))
            .unwrap_or_default()
    }
}

pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Object stream payload: the `number offset` header, a space, then bodies.
/// Returns the payload and its `/First`.
pub fn object_stream_payload(members: &[(u32, &str)]) -> (Vec<u8>, usize) {
    let mut header = String::new();
    let mut body = String::new();
    for (number, value) in members {
        header.push_str(&format!("{number} {} ", body.len()));
        body.push_str(value);
        body.push(' ');
    }
    let first = header.len();
    let mut payload = header.into_bytes();
    payload.extend_from_slice(body.as_bytes());
    (payload, first)
}
