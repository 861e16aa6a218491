use crate::shared::codec_config::CodecConfiguration;
use crate::shared::error::CodecError;
use crate::shared::rational::Rational;

use super::packaged_frame::PackagedFrame;

/// One unit of compressed output. Timestamps are in `time_base` units.
#[derive(Clone, Debug, PartialEq)]
pub struct CompressedPacket {
    pub data: Vec<u8>,
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    pub duration: i64,
    pub is_keyframe: bool,
    pub stream_index: usize,
    pub time_base: Rational,
}

impl CompressedPacket {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Encoder lifecycle: open once, encode many, flush, close.
///
/// `Parameters` is whatever the muxer needs to describe the stream; it
/// keeps this trait free of any media-library type.
pub trait VideoCodec {
    type Parameters;

    fn open(
        &mut self,
        config: &CodecConfiguration,
        width: u32,
        height: u32,
    ) -> Result<(), CodecError>;

    /// Submits one frame. `Ok(None)` means the encoder is holding the frame
    /// internally, which is not an error.
    fn encode_frame(
        &mut self,
        frame: &PackagedFrame,
        pts: i64,
    ) -> Result<Option<CompressedPacket>, CodecError>;

    /// Signals end of stream and drains every buffered packet.
    fn flush(&mut self) -> Result<Vec<CompressedPacket>, CodecError>;

    fn stream_parameters(&self) -> Result<Self::Parameters, CodecError>;

    /// The encoder's time base once open.
    fn time_base(&self) -> Option<Rational>;

    /// Releases encoder state. Safe to call when not open.
    fn close(&mut self);

    fn is_open(&self) -> bool;
}
