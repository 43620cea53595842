use thiserror::Error;

use crate::detect::DetectedFormat;

/// Errors produced by the extraction core.
///
/// Only [`UnsupportedContainer`](MetadataError::UnsupportedContainer),
/// [`CorruptContainer`](MetadataError::CorruptContainer) and
/// [`Io`](MetadataError::Io) ever reach callers of
/// [`extract`](crate::pipeline::extract). `MalformedMetadata` is returned by
/// the individual parsers and folded into a partial record by the pipeline.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("not an image this tool understands: {0}")]
    UnsupportedContainer(String),

    #[error("file may be corrupted: {0}")]
    CorruptContainer(String),

    #[error("malformed {format} metadata: {reason}")]
    MalformedMetadata {
        format: DetectedFormat,
        reason: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MetadataError {
    pub(crate) fn malformed(format: DetectedFormat, reason: impl Into<String>) -> Self {
        Self::MalformedMetadata {
            format,
            reason: reason.into(),
        }
    }

    /// Whether this error ends the extraction call instead of degrading to a partial record.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::MalformedMetadata { .. })
    }
}

impl From<img_parts::Error> for MetadataError {
    fn from(e: img_parts::Error) -> Self {
        Self::CorruptContainer(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MetadataError>;
