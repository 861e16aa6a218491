use std::path::Path;

use crate::encode::domain::video_codec::CompressedPacket;
use crate::shared::error::ContainerError;
use crate::shared::rational::Rational;

use super::container_kind::ContainerKind;

/// Where a muxer is in its one-shot lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MuxerStatus {
    NeverOpened,
    /// `open` started and failed part-way. Whatever was allocated has been
    /// released already.
    OpenFailed,
    Opened,
    Closed,
}

/// Stream descriptors allocated at open and released at close.
///
/// `allocated` counts successful stream registrations. `released` counts the
/// streams owned by the output context at the point it is freed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StreamLedger {
    pub allocated: usize,
    pub released: usize,
}

impl StreamLedger {
    pub fn is_balanced(&self) -> bool {
        self.allocated == self.released
    }
}

/// Single-video-stream container writer.
///
/// `open` covers output allocation, stream registration, opening the file
/// and writing the header. A muxer is used for exactly one file.
pub trait ContainerMuxer {
    type Parameters;

    fn open(
        &mut self,
        path: &Path,
        kind: ContainerKind,
        parameters: Self::Parameters,
        codec_time_base: Rational,
    ) -> Result<(), ContainerError>;

    /// Rescales `packet` from its own time base to the stream's and hands
    /// it to the interleaver. Rejected unless the header has been written.
    fn write_packet(&mut self, packet: &CompressedPacket) -> Result<(), ContainerError>;

    fn write_trailer(&mut self) -> Result<(), ContainerError>;

    /// Releases the output and every stream it registered. Does nothing
    /// unless `open` succeeded.
    fn close(&mut self) -> StreamLedger;

    fn status(&self) -> MuxerStatus;
}
