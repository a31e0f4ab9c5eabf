//! PDF Stream Filters
//!
//! Decodes stream payloads according to ISO 32000-1 Section 7.4. Only
//! FlateDecode (with the PNG Up predictor) and the Identity crypt filter
//! are implemented; every other standard filter is recognized and refused.

use crate::compression;
use crate::objects::{Dictionary, Object};
use bytes::Bytes;

/// Filter failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    #[error("Unsupported predictor: {0}")]
    UnsupportedPredictor(i64),

    #[error("Unsupported encryption filter: {0}")]
    UnsupportedEncryption(String),

    #[error("Malformed filter declaration: {0}")]
    MalformedFilter(String),

    #[error("Corrupt stream data: {0}")]
    Corrupt(String),
}

/// Standard PDF filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// ASCII hex decode
    ASCIIHexDecode,

    /// ASCII 85 decode
    ASCII85Decode,

    /// LZW decode
    LZWDecode,

    /// Flate decode (zlib/deflate compression)
    FlateDecode,

    /// Run length decode
    RunLengthDecode,

    /// CCITT fax decode
    CCITTFaxDecode,

    /// JBIG2 decode
    JBIG2Decode,

    /// DCT decode (JPEG)
    DCTDecode,

    /// JPX decode (JPEG 2000)
    JPXDecode,

    /// Crypt filter
    Crypt,
}

impl Filter {
    /// Parse filter from name, including the inline image abbreviations
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "ASCIIHexDecode" | "AHx" => Some(Filter::ASCIIHexDecode),
            "ASCII85Decode" | "A85" => Some(Filter::ASCII85Decode),
            "LZWDecode" | "LZW" => Some(Filter::LZWDecode),
            "FlateDecode" | "Fl" => Some(Filter::FlateDecode),
            "RunLengthDecode" | "RL" => Some(Filter::RunLengthDecode),
            "CCITTFaxDecode" | "CCF" => Some(Filter::CCITTFaxDecode),
            "JBIG2Decode" => Some(Filter::JBIG2Decode),
            "DCTDecode" | "DCT" => Some(Filter::DCTDecode),
            "JPXDecode" => Some(Filter::JPXDecode),
            "Crypt" => Some(Filter::Crypt),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Filter::ASCIIHexDecode => "ASCIIHexDecode",
            Filter::ASCII85Decode => "ASCII85Decode",
            Filter::LZWDecode => "LZWDecode",
            Filter::FlateDecode => "FlateDecode",
            Filter::RunLengthDecode => "RunLengthDecode",
            Filter::CCITTFaxDecode => "CCITTFaxDecode",
            Filter::JBIG2Decode => "JBIG2Decode",
            Filter::DCTDecode => "DCTDecode",
            Filter::JPXDecode => "JPXDecode",
            Filter::Crypt => "Crypt",
        }
    }
}

/// The `/DecodeParms` keys this module understands
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeParams {
    pub predictor: i64,
    pub colors: i64,
    pub bits_per_component: i64,
    pub columns: i64,
    /// Crypt filter name
    pub name: String,
}

impl Default for DecodeParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
            name: "Identity".to_string(),
        }
    }
}

impl DecodeParams {
    pub fn from_dict(dict: Option<&Dictionary>) -> Self {
        let defaults = Self::default();
        let Some(dict) = dict else {
            return defaults;
        };
        Self {
            predictor: dict.get_integer("Predictor").unwrap_or(defaults.predictor),
            colors: dict.get_integer("Colors").unwrap_or(defaults.colors),
            bits_per_component: dict
                .get_integer("BitsPerComponent")
                .unwrap_or(defaults.bits_per_component),
            columns: dict.get_integer("Columns").unwrap_or(defaults.columns),
            name: dict
                .get_name("Name")
                .map(str::to_string)
                .unwrap_or(defaults.name),
        }
    }

    /// Bytes per predictor row, excluding the PNG tag byte
    pub fn row_width(&self) -> Result<usize, FilterError> {
        let overflow = || {
            FilterError::MalformedFilter(format!(
                "predictor row of {} colors x {} columns x {} bits is too wide",
                self.colors, self.columns, self.bits_per_component
            ))
        };
        let bits = self
            .colors
            .max(0)
            .checked_mul(self.columns.max(0))
            .and_then(|n| n.checked_mul(self.bits_per_component.max(0)))
            .and_then(|n| n.checked_add(7))
            .ok_or_else(overflow)?;
        usize::try_from(bits / 8).map_err(|_| overflow())
    }
}

/// Ordered chain of decode filters for one stream
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterPipeline {
    stages: Vec<(Filter, DecodeParams)>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage
    pub fn push(&mut self, filter: Filter, params: DecodeParams) {
        self.stages.push((filter, params));
    }

    /// Build the chain from `/Filter` and `/DecodeParms`
    pub fn from_dict(dict: &Dictionary) -> Result<Self, FilterError> {
        let names: Vec<&str> = match dict.get("Filter") {
            None => return Ok(Self::new()),
            Some(Object::Name(name)) => vec![name.as_str()],
            Some(Object::Array(array)) => array
                .iter()
                .map(|item| {
                    item.as_name().ok_or_else(|| {
                        FilterError::MalformedFilter(format!(
                            "filter array holds a {}",
                            item.type_name()
                        ))
                    })
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(FilterError::MalformedFilter(format!(
                    "/Filter is a {}",
                    other.type_name()
                )))
            }
        };

        let params: Vec<Option<&Dictionary>> = match dict.get("DecodeParms") {
            Some(Object::Dictionary(params)) => vec![Some(params)],
            Some(Object::Array(array)) => array.iter().map(|item| item.as_dict()).collect(),
            _ => Vec::new(),
        };

        let mut pipeline = Self::new();
        for (index, name) in names.into_iter().enumerate() {
            let filter = Filter::from_name(name)
                .ok_or_else(|| FilterError::UnsupportedFilter(name.to_string()))?;
            let stage_params = params.get(index).copied().flatten();
            pipeline.push(filter, DecodeParams::from_dict(stage_params));
        }
        Ok(pipeline)
    }

    pub fn filters(&self) -> impl Iterator<Item = Filter> + '_ {
        self.stages.iter().map(|(filter, _)| *filter)
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Check that every stage can run
    pub fn validate(&self) -> Result<(), FilterError> {
        for (filter, params) in &self.stages {
            match filter {
                Filter::FlateDecode => match params.predictor {
                    1 | 10..=15 => {}
                    other => return Err(FilterError::UnsupportedPredictor(other)),
                },
                Filter::Crypt if params.name == "Identity" => {}
                Filter::Crypt => return Err(FilterError::UnsupportedEncryption(params.name.clone())),
                other => return Err(FilterError::UnsupportedFilter(other.name().to_string())),
            }
        }
        Ok(())
    }

    pub fn is_supported(&self) -> bool {
        self.validate().is_ok()
    }

    /// Run every stage left to right
    ///
    /// Nothing runs unless every stage is supported, so a failure never
    /// yields partially decoded bytes.
    pub fn decode(&self, data: &Bytes) -> Result<Bytes, FilterError> {
        self.validate()?;

        let mut current = data.clone();
        for (filter, params) in &self.stages {
            current = match filter {
                Filter::FlateDecode => decode_flate(&current, params)?.into(),
                // Identity crypt filter
                _ => current,
            };
        }
        Ok(current)
    }
}

fn decode_flate(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>, FilterError> {
    let inflated =
        compression::decompress(data).map_err(|e| FilterError::Corrupt(e.to_string()))?;
    if params.predictor >= 10 {
        undo_png_prediction(&inflated, params)
    } else {
        Ok(inflated)
    }
}

/// Reverse PNG row prediction; each row is prefixed by its algorithm tag
fn undo_png_prediction(data: &[u8], params: &DecodeParams) -> Result<Vec<u8>, FilterError> {
    let row_width = params.row_width()?;
    if row_width == 0 {
        return Err(FilterError::MalformedFilter(
            "predictor row width is zero".to_string(),
        ));
    }

    if data.is_empty() {
        return Ok(Vec::new());
    }

    // A row wider than the payload is rejected here, before any allocation
    let stride = row_width.saturating_add(1);
    if data.len() % stride != 0 {
        return Err(FilterError::Corrupt(format!(
            "{} bytes is not a whole number of {stride}-byte predictor rows",
            data.len()
        )));
    }

    let mut output = Vec::with_capacity(data.len() / stride * row_width);
    let mut previous = vec![0u8; row_width];
    for row in data.chunks_exact(stride) {
        let (tag, bytes) = (row[0], &row[1..]);
        match tag {
            0 => previous.copy_from_slice(bytes),
            2 => {
                for (prior, byte) in previous.iter_mut().zip(bytes) {
                    *prior = byte.wrapping_add(*prior);
                }
            }
            1 | 3 | 4 => return Err(FilterError::UnsupportedPredictor(10 + tag as i64)),
            other => {
                return Err(FilterError::Corrupt(format!(
                    "unknown PNG predictor tag {other}"
                )))
            }
        }
        output.extend_from_slice(&previous);
    }
    Ok(output)
}
