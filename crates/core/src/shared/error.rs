use std::path::PathBuf;

use thiserror::Error;

/// Problems with the requested setup. Raised once, before any resource is
/// allocated, and never retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("encoder '{0}' not found in the linked media library")]
    EncoderNotFound(String),
    #[error("frame rate must be in (0, {max}], got {value}")]
    FrameRateOutOfRange { value: f32, max: f32 },
    #[error("bitrate must be at most {max} bits/sec, got {value}")]
    BitrateOutOfRange { value: u64, max: u64 },
    #[error("bitrate tolerance must be at most {max} bits, got {value}")]
    BitrateToleranceOutOfRange { value: u64, max: u64 },
    #[error("frame dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("unsupported pixel conversion: {0}")]
    UnsupportedConversion(String),
    #[error("media library initialisation failed: {0}")]
    Runtime(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("encoder '{0}' not found")]
    EncoderNotFound(String),
    #[error("unable to open codec: {0}")]
    Open(String),
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("encoder flush failed: {0}")]
    Flush(String),
    #[error("codec is not open")]
    NotOpen,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContainerError {
    #[error("could not deduce output format from file extension of {0}")]
    UnknownFormat(PathBuf),
    #[error("could not allocate output stream: {0}")]
    StreamAlloc(String),
    #[error("unable to open {path} for writing: {reason}")]
    IoOpen { path: PathBuf, reason: String },
    #[error("failed to write container header: {0}")]
    HeaderWrite(String),
    #[error("error writing frame to file: {0}")]
    Write(String),
    #[error("failed to write container trailer: {0}")]
    Trailer(String),
    #[error("container is not open")]
    NotOpen,
    #[error("container session can only be opened once")]
    AlreadyOpened,
}

/// Failures reported by the upstream renderer while rows are pulled.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("row {row} outside raster of height {height}")]
    RowOutOfRange { row: u32, height: u32 },
    #[error("span {x0}..{x1} outside raster of width {width}")]
    SpanOutOfRange { x0: u32, x1: u32, width: u32 },
    #[error("row {row} has {got} samples, expected {expected}")]
    ShortRow { row: u32, expected: u32, got: u32 },
    #[error("renderer failed: {0}")]
    Upstream(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    #[error("expected {expected_width}x{expected_height} image, got {width}x{height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },
    #[error("pixel conversion failed: {0}")]
    Failed(String),
}

/// Unified result of every session operation.
///
/// An aborted frame is not an error; see `FrameOutcome::Aborted`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EncodeError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Codec(CodecError),
    #[error(transparent)]
    Container(#[from] ContainerError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("invalid session state: {0}")]
    InvalidState(String),
}

impl From<CodecError> for EncodeError {
    fn from(err: CodecError) -> Self {
        match err {
            CodecError::EncoderNotFound(name) => {
                EncodeError::Configuration(ConfigurationError::EncoderNotFound(name))
            }
            other => EncodeError::Codec(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_encoder_is_a_configuration_error() {
        let err: EncodeError = CodecError::EncoderNotFound("prores_ks".into()).into();
        assert_eq!(
            err,
            EncodeError::Configuration(ConfigurationError::EncoderNotFound("prores_ks".into()))
        );
    }

    #[test]
    fn test_other_codec_errors_stay_codec_errors() {
        let err: EncodeError = CodecError::Encode("boom".into()).into();
        assert!(matches!(err, EncodeError::Codec(CodecError::Encode(_))));
    }

    #[test]
    fn test_messages_are_descriptive() {
        let err = EncodeError::from(ContainerError::UnknownFormat(PathBuf::from("out.xyz")));
        assert!(err.to_string().contains("out.xyz"));

        let err = EncodeError::from(ConfigurationError::FrameRateOutOfRange {
            value: 0.0,
            max: 100.0,
        });
        assert_eq!(err.to_string(), "frame rate must be in (0, 100], got 0");
    }
}
