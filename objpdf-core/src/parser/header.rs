//! PDF Header Parser
//!
//! Parses PDF header and version according to ISO 32000-1 Section 7.5.2

use super::{ParseError, ParseResult};

/// PDF Version information
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PdfVersion {
    pub major: u8,
    pub minor: u8,
}

impl PdfVersion {
    /// Create a new PDF version
    pub fn new(major: u8, minor: u8) -> Self {
        Self { major, minor }
    }

    /// Parse the `%PDF-x.y` marker at the start of `data`
    pub fn from_header(data: &[u8]) -> ParseResult<Self> {
        let rest = data.strip_prefix(b"%PDF-").ok_or(ParseError::MissingHeader)?;
        let version = rest.get(..3).ok_or_else(|| {
            ParseError::UnsupportedVersion(String::from_utf8_lossy(rest).into_owned())
        })?;

        match version {
            [b'1', b'.', minor @ b'0'..=b'7'] => Ok(Self::new(1, minor - b'0')),
            _ => Err(ParseError::UnsupportedVersion(
                String::from_utf8_lossy(version).into_owned(),
            )),
        }
    }

    /// Check if this version is supported
    pub fn is_supported(&self) -> bool {
        matches!((self.major, self.minor), (1, 0..=7))
    }
}

impl std::fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
