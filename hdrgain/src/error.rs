use std::io;
use std::path::PathBuf;

/// Error produced by the conversion pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input path does not name a readable file.
    #[error("input not found: {}", .0.display())]
    InputNotFound(PathBuf),
    /// Every decode strategy rejected the input.
    #[error("failed to decode {}: {detail}", .path.display())]
    Decode { path: PathBuf, detail: String },
    /// The decoded image is not three-channel RGB.
    #[error("unsupported channel layout: expected 3 channels, found {0}")]
    UnsupportedChannels(usize),
    /// A configuration value is out of range.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),
    /// Two buffers that must share a shape do not.
    #[error("image size mismatch: {expected:?} vs {received:?}")]
    ImageSizeMismatch {
        expected: (u32, u32),
        received: (u32, u32),
    },
    /// The image codec failed to produce output.
    #[error("encoder failure: {0}")]
    Encode(String),
    /// Gain map metadata could not be written or parsed.
    #[error("gain map metadata: {0}")]
    Metadata(String),
    /// The output location could not be prepared or written.
    #[error("failed to write {}: {source}", .path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid_param(msg: impl Into<String>) -> Self {
        Self::InvalidParam(msg.into())
    }

    pub(crate) fn metadata(msg: impl Into<String>) -> Self {
        Self::Metadata(msg.into())
    }

    pub(crate) fn output(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Output {
            path: path.into(),
            source,
        }
    }
}

impl From<jpeg_encoder::EncodingError> for Error {
    fn from(e: jpeg_encoder::EncodingError) -> Self {
        Self::Encode(e.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(e: image::ImageError) -> Self {
        match e {
            image::ImageError::IoError(io) => Self::Io(io),
            other => Self::Encode(other.to_string()),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Self::metadata(e.to_string())
    }
}

impl From<img_parts::Error> for Error {
    fn from(e: img_parts::Error) -> Self {
        Self::metadata(format!("JPEG container: {e}"))
    }
}
