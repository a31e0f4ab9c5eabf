//! Stream decoding through the filter pipeline

mod support;

use objpdf::parser::{Filter, FilterError, FilterPipeline};
use objpdf::{Dictionary, Document, Object, ObjectId, Stream};
use pretty_assertions::assert_eq;
use support::{deflate, PdfFile};

fn stream_with(entries: &[(&str, Object)], data: Vec<u8>) -> Stream {
    let mut dict = Dictionary::new();
    for (key, value) in entries {
        dict.set(*key, value.clone());
    }
    Stream::new(dict, data)
}

fn params(entries: &[(&str, i64)]) -> Object {
    let mut dict = Dictionary::new();
    for (key, value) in entries {
        dict.set(*key, *value);
    }
    Object::Dictionary(dict)
}

#[test]
fn test_flate_decode() {
    let stream = stream_with(
        &[("Filter", Object::name("FlateDecode"))],
        deflate(b"q 1 0 0 1 0 0 cm Q"),
    );
    assert_eq!(stream.decoded_data().unwrap().as_ref(), b"q 1 0 0 1 0 0 cm Q");
    assert!(stream.is_decoded());
}

#[test]
fn test_unsupported_filter_fails_before_decoding() {
    // The Flate stage would fail on this payload; the LZW stage is refused first
    let stream = stream_with(
        &[(
            "Filter",
            Object::Array(vec![Object::name("FlateDecode"), Object::name("LZWDecode")]),
        )],
        b"definitely not zlib".to_vec(),
    );
    assert_eq!(
        stream.decoded_data(),
        Err(FilterError::UnsupportedFilter("LZWDecode".to_string()))
    );
}

#[test]
fn test_every_unimplemented_filter_is_refused() {
    for name in [
        "ASCIIHexDecode",
        "ASCII85Decode",
        "LZWDecode",
        "RunLengthDecode",
        "CCITTFaxDecode",
        "JBIG2Decode",
        "DCTDecode",
        "JPXDecode",
    ] {
        let stream = stream_with(&[("Filter", Object::name(name))], b"payload".to_vec());
        assert_eq!(
            stream.decoded_data(),
            Err(FilterError::UnsupportedFilter(name.to_string())),
            "{name}"
        );
        assert!(!stream.filters().unwrap().is_supported());
    }
}

#[test]
fn test_unknown_filter_name() {
    let stream = stream_with(&[("Filter", Object::name("BrotliDecode"))], Vec::new());
    assert_eq!(
        stream.decoded_data(),
        Err(FilterError::UnsupportedFilter("BrotliDecode".to_string()))
    );
}

#[test]
fn test_png_up_predictor() {
    let rows = [2u8, 10, 20, 30, 2, 1, 1, 1, 0, 7, 8, 9];
    let stream = stream_with(
        &[
            ("Filter", Object::name("FlateDecode")),
            ("DecodeParms", params(&[("Predictor", 12), ("Columns", 3)])),
        ],
        deflate(&rows),
    );
    assert_eq!(
        stream.decoded_data().unwrap().as_ref(),
        &[10, 20, 30, 11, 21, 31, 7, 8, 9]
    );
}

#[test]
fn test_predictor_row_width_uses_colors_and_bits() {
    // Two colors, 16 bits, one column: four bytes per row
    let rows = [0u8, 1, 2, 3, 4, 2, 1, 1, 1, 1];
    let stream = stream_with(
        &[
            ("Filter", Object::name("FlateDecode")),
            (
                "DecodeParms",
                params(&[("Predictor", 15), ("Colors", 2), ("BitsPerComponent", 16)]),
            ),
        ],
        deflate(&rows),
    );
    assert_eq!(stream.decoded_data().unwrap().as_ref(), &[1, 2, 3, 4, 2, 3, 4, 5]);
}

#[test]
fn test_unsupported_png_rows() {
    for (tag, predictor) in [(1u8, 11i64), (3, 13), (4, 14)] {
        let stream = stream_with(
            &[
                ("Filter", Object::name("FlateDecode")),
                ("DecodeParms", params(&[("Predictor", 15), ("Columns", 2)])),
            ],
            deflate(&[tag, 1, 2]),
        );
        assert_eq!(
            stream.decoded_data(),
            Err(FilterError::UnsupportedPredictor(predictor))
        );
    }
}

#[test]
fn test_tiff_predictor_is_refused() {
    let stream = stream_with(
        &[
            ("Filter", Object::name("FlateDecode")),
            ("DecodeParms", params(&[("Predictor", 2)])),
        ],
        deflate(b"abc"),
    );
    assert_eq!(stream.decoded_data(), Err(FilterError::UnsupportedPredictor(2)));
}

#[test]
fn test_identity_crypt_is_a_pass_through() {
    let stream = stream_with(&[("Filter", Object::name("Crypt"))], b"clear".to_vec());
    assert_eq!(stream.decoded_data().unwrap().as_ref(), b"clear");

    let mut crypt_params = Dictionary::new();
    crypt_params.set("Name", Object::name("StdCF"));
    let stream = stream_with(
        &[
            ("Filter", Object::name("Crypt")),
            ("DecodeParms", Object::Dictionary(crypt_params)),
        ],
        b"cipher".to_vec(),
    );
    assert_eq!(
        stream.decoded_data(),
        Err(FilterError::UnsupportedEncryption("StdCF".to_string()))
    );
}

#[test]
fn test_corrupt_flate_payload() {
    let stream = stream_with(&[("Filter", Object::name("FlateDecode"))], b"garbage".to_vec());
    assert!(matches!(stream.decoded_data(), Err(FilterError::Corrupt(_))));
    // The failure is remembered
    assert!(stream.is_decoded());
    assert!(matches!(stream.decoded_data(), Err(FilterError::Corrupt(_))));
}

#[test]
fn test_pipeline_from_dict() {
    let mut dict = Dictionary::new();
    dict.set(
        "Filter",
        Object::Array(vec![Object::name("Fl"), Object::name("Crypt")]),
    );
    let pipeline = FilterPipeline::from_dict(&dict).unwrap();
    assert_eq!(
        pipeline.filters().collect::<Vec<_>>(),
        vec![Filter::FlateDecode, Filter::Crypt]
    );
    assert!(pipeline.is_supported());

    dict.set("Filter", 7i64);
    assert!(matches!(
        FilterPipeline::from_dict(&dict),
        Err(FilterError::MalformedFilter(_))
    ));
}

#[test]
fn test_filters_inside_a_document() {
    let mut file = PdfFile::new("1.4");
    file.object(1, "<</Type /Catalog>>")
        .stream(2, "/Filter /FlateDecode", &deflate(b"inflated"))
        .stream(3, "/Filter /ASCII85Decode", b"87cURD]i,\"Ebo80~>")
        .finish_table("/Root 1 0 R");
    let mut doc = Document::from_bytes(file.bytes()).unwrap();

    let two = doc.get_object(ObjectId::new(2, 0)).unwrap().unwrap();
    assert_eq!(
        two.value().as_stream().unwrap().decoded_data().unwrap().as_ref(),
        b"inflated"
    );

    let three = doc.get_object(ObjectId::new(3, 0)).unwrap().unwrap();
    let stream = three.value().as_stream().unwrap();
    assert!(stream.decoded_data().is_err());
    // The raw payload is still available
    assert_eq!(stream.raw_data().as_ref(), b"87cURD]i,\"Ebo80~>");
}

#[test]
fn test_predictor_width_overflow_is_an_error() {
    let stream = stream_with(
        &[
            ("Filter", Object::name("FlateDecode")),
            (
                "DecodeParms",
                params(&[("Predictor", 12), ("Colors", 4), ("Columns", i64::MAX / 2)]),
            ),
        ],
        deflate(&[2, 1, 2, 3, 4]),
    );
    assert!(matches!(
        stream.decoded_data(),
        Err(FilterError::MalformedFilter(_))
    ));
}

#[test]
fn test_predictor_row_wider_than_payload() {
    let stream = stream_with(
        &[
            ("Filter", Object::name("FlateDecode")),
            ("DecodeParms", params(&[("Predictor", 12), ("Columns", 1 << 40)])),
        ],
        deflate(&[2, 1, 2, 3]),
    );
    assert!(matches!(stream.decoded_data(), Err(FilterError::Corrupt(_))));
}

#[test]
fn test_predictor_on_empty_payload() {
    let stream = stream_with(
        &[
            ("Filter", Object::name("FlateDecode")),
            ("DecodeParms", params(&[("Predictor", 12), ("Columns", 1 << 40)])),
        ],
        deflate(b""),
    );
    assert_eq!(stream.decoded_data().unwrap().as_ref(), b"");
}
