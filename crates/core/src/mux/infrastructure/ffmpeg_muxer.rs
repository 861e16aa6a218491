use std::path::{Path, PathBuf};

use ffmpeg_next::codec;
use ffmpeg_next::codec::packet::Flags as PacketFlags;
use ffmpeg_next::format;
use ffmpeg_next::Packet;

use crate::encode::domain::video_codec::CompressedPacket;
use crate::mux::domain::container_kind::ContainerKind;
use crate::mux::domain::container_muxer::{ContainerMuxer, MuxerStatus, StreamLedger};
use crate::shared::error::ContainerError;
use crate::shared::media_runtime;
use crate::shared::rational::Rational;

struct OpenOutput {
    octx: format::context::Output,
    stream_index: usize,
    stream_time_base: Rational,
    trailer_written: bool,
}

/// libavformat-backed muxer writing one video stream.
pub struct FfmpegMuxer {
    status: MuxerStatus,
    output: Option<OpenOutput>,
    path: Option<PathBuf>,
    ledger: StreamLedger,
    packets_written: u64,
    last_pts: Option<i64>,
}

impl FfmpegMuxer {
    pub fn new() -> Self {
        Self {
            status: MuxerStatus::NeverOpened,
            output: None,
            path: None,
            ledger: StreamLedger::default(),
            packets_written: 0,
            last_pts: None,
        }
    }

    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    /// Presentation timestamp of the last packet written, in stream units.
    pub fn last_pts(&self) -> Option<i64> {
        self.last_pts
    }

    pub fn ledger(&self) -> StreamLedger {
        self.ledger
    }

    /// Stream time base chosen by the muxer at header time.
    pub fn stream_time_base(&self) -> Option<Rational> {
        self.output.as_ref().map(|o| o.stream_time_base)
    }

    fn open_output(
        &mut self,
        path: &Path,
        kind: ContainerKind,
        parameters: codec::Parameters,
        codec_time_base: Rational,
    ) -> Result<OpenOutput, ContainerError> {
        media_runtime::ensure_initialized().map_err(|e| ContainerError::IoOpen {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // Allocates the context and, unless the format is sink-less, opens
        // the file.
        let mut octx =
            format::output_as(path, kind.muxer_name()).map_err(|e| ContainerError::IoOpen {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        if octx.format().flags().contains(format::Flags::NO_FILE) {
            log::debug!("{} muxer writes without file I/O", kind.muxer_name());
        }

        let stream_index = {
            let mut ost = octx
                .add_stream(ffmpeg_next::encoder::find(codec::Id::None))
                .map_err(|e| ContainerError::StreamAlloc(e.to_string()))?;
            ost.set_parameters(parameters);
            ost.set_time_base(codec_time_base);
            ost.index()
        };
        self.ledger.allocated += 1;

        if let Err(e) = octx.write_header() {
            self.release(octx);
            return Err(ContainerError::HeaderWrite(e.to_string()));
        }

        let stream_time_base = octx
            .stream(stream_index)
            .map(|s| Rational::from(s.time_base()))
            .ok_or_else(|| ContainerError::StreamAlloc("stream vanished after header".into()))?;

        Ok(OpenOutput {
            octx,
            stream_index,
            stream_time_base,
            trailer_written: false,
        })
    }

    /// Frees the output context, and with it every stream it owns.
    fn release(&mut self, octx: format::context::Output) {
        let streams = octx.nb_streams() as usize;
        drop(octx);
        self.ledger.released += streams;
    }
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerMuxer for FfmpegMuxer {
    type Parameters = codec::Parameters;

    fn open(
        &mut self,
        path: &Path,
        kind: ContainerKind,
        parameters: codec::Parameters,
        codec_time_base: Rational,
    ) -> Result<(), ContainerError> {
        if self.status != MuxerStatus::NeverOpened {
            return Err(ContainerError::AlreadyOpened);
        }

        match self.open_output(path, kind, parameters, codec_time_base) {
            Ok(output) => {
                log::info!(
                    "Opened {kind} container {} (stream time base {}/{})",
                    path.display(),
                    output.stream_time_base.num,
                    output.stream_time_base.den
                );
                self.output = Some(output);
                self.path = Some(path.to_path_buf());
                self.status = MuxerStatus::Opened;
                Ok(())
            }
            Err(e) => {
                self.status = MuxerStatus::OpenFailed;
                Err(e)
            }
        }
    }

    fn write_packet(&mut self, compressed: &CompressedPacket) -> Result<(), ContainerError> {
        let output = match (self.status, self.output.as_mut()) {
            (MuxerStatus::Opened, Some(output)) if !output.trailer_written => output,
            _ => return Err(ContainerError::NotOpen),
        };

        let mut packet = Packet::copy(&compressed.data);
        packet.set_pts(compressed.pts);
        packet.set_dts(compressed.dts);
        packet.set_duration(compressed.duration);
        if compressed.is_keyframe {
            packet.set_flags(PacketFlags::KEY);
        }
        packet.set_stream(output.stream_index);
        packet.rescale_ts(compressed.time_base, output.stream_time_base);
        let pts = packet.pts();

        packet
            .write_interleaved(&mut output.octx)
            .map_err(|e| ContainerError::Write(e.to_string()))?;

        self.packets_written += 1;
        self.last_pts = pts;
        Ok(())
    }

    fn write_trailer(&mut self) -> Result<(), ContainerError> {
        let output = match (self.status, self.output.as_mut()) {
            (MuxerStatus::Opened, Some(output)) if !output.trailer_written => output,
            _ => return Err(ContainerError::NotOpen),
        };
        output
            .octx
            .write_trailer()
            .map_err(|e| ContainerError::Trailer(e.to_string()))?;
        output.trailer_written = true;
        Ok(())
    }

    fn close(&mut self) -> StreamLedger {
        if let Some(output) = self.output.take() {
            if !output.trailer_written {
                log::warn!(
                    "Closing {} without a trailer",
                    self.path
                        .as_deref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_default()
                );
            }
            self.release(output.octx);
            self.status = MuxerStatus::Closed;
            log::debug!(
                "Released {} of {} output streams",
                self.ledger.released,
                self.ledger.allocated
            );
        }
        self.ledger
    }

    fn status(&self) -> MuxerStatus {
        self.status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::domain::packaged_frame::{PackagedFrame, Plane};
    use crate::encode::domain::video_codec::VideoCodec;
    use crate::encode::infrastructure::prores_codec::ProresCodec;
    use crate::shared::codec_config::CodecConfiguration;

    fn open_codec(width: u32, height: u32) -> ProresCodec {
        let mut codec = ProresCodec::new();
        codec
            .open(&CodecConfiguration::default(), width, height)
            .unwrap();
        codec
    }

    fn encode(codec: &mut ProresCodec, width: u32, height: u32, pts: i64) -> CompressedPacket {
        let mut frame = PackagedFrame::new(width, height);
        frame.plane_mut(Plane::Luma).fill(400);
        frame.plane_mut(Plane::Cb).fill(512);
        frame.plane_mut(Plane::Cr).fill(512);
        codec.encode_frame(&frame, pts).unwrap().unwrap()
    }

    fn open_muxer(path: &Path, codec: &ProresCodec) -> FfmpegMuxer {
        let mut muxer = FfmpegMuxer::new();
        muxer
            .open(
                path,
                ContainerKind::from_path(path).unwrap(),
                codec.stream_parameters().unwrap(),
                codec.time_base().unwrap(),
            )
            .unwrap();
        muxer
    }

    fn read_packets(path: &Path) -> (usize, Vec<(Option<i64>, bool)>) {
        ffmpeg_next::init().unwrap();
        let mut ictx = format::input(&path).unwrap();
        let streams = ictx.nb_streams() as usize;
        let packets = ictx
            .packets()
            .map(|(_, p)| (p.pts(), p.is_key()))
            .collect();
        (streams, packets)
    }

    #[test]
    fn test_single_packet_mov_has_one_keyframe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("single.mov");
        let mut codec = open_codec(16, 16);
        let mut muxer = open_muxer(&path, &codec);

        let packet = encode(&mut codec, 16, 16, 0);
        muxer.write_packet(&packet).unwrap();
        muxer.write_trailer().unwrap();
        let ledger = muxer.close();
        codec.close();

        assert!(ledger.is_balanced());
        let (streams, packets) = read_packets(&path);
        assert_eq!(streams, 1);
        assert_eq!(packets.len(), 1);
        assert!(packets[0].1);
    }

    #[test]
    fn test_matroska_output() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.mkv");
        let mut codec = open_codec(16, 16);
        let mut muxer = open_muxer(&path, &codec);
        for pts in 0..3 {
            muxer.write_packet(&encode(&mut codec, 16, 16, pts)).unwrap();
        }
        muxer.write_trailer().unwrap();
        muxer.close();

        let (streams, packets) = read_packets(&path);
        assert_eq!(streams, 1);
        assert_eq!(packets.len(), 3);
    }

    #[test]
    fn test_timestamps_non_decreasing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ts.mov");
        let mut codec = open_codec(16, 16);
        let mut muxer = open_muxer(&path, &codec);

        let mut previous = None;
        for pts in 0..6 {
            muxer.write_packet(&encode(&mut codec, 16, 16, pts)).unwrap();
            let current = muxer.last_pts();
            assert!(current >= previous, "{current:?} < {previous:?}");
            previous = current;
        }
        muxer.write_trailer().unwrap();
        muxer.close();

        let (_, packets) = read_packets(&path);
        let pts: Vec<i64> = packets.iter().filter_map(|p| p.0).collect();
        assert_eq!(pts.len(), 6);
        assert!(pts.windows(2).all(|w| w[0] <= w[1]));
        assert!(packets.iter().all(|p| p.1));
    }

    #[test]
    fn test_stream_ledger_balanced_without_packets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.mov");
        let codec = open_codec(16, 16);
        let mut muxer = open_muxer(&path, &codec);
        muxer.write_trailer().unwrap();
        assert_eq!(muxer.ledger(), StreamLedger { allocated: 1, released: 0 });
        assert!(!muxer.ledger().is_balanced());

        let ledger = muxer.close();
        assert_eq!(ledger, StreamLedger { allocated: 1, released: 1 });
        assert_eq!(muxer.status(), MuxerStatus::Closed);
    }

    #[test]
    fn test_close_without_open_is_noop() {
        let mut muxer = FfmpegMuxer::new();
        assert_eq!(muxer.close(), StreamLedger::default());
        assert_eq!(muxer.status(), MuxerStatus::NeverOpened);
    }

    #[test]
    fn test_write_before_open_rejected() {
        let mut codec = open_codec(16, 16);
        let packet = encode(&mut codec, 16, 16, 0);
        let mut muxer = FfmpegMuxer::new();
        assert_eq!(muxer.write_packet(&packet), Err(ContainerError::NotOpen));
        assert_eq!(muxer.write_trailer(), Err(ContainerError::NotOpen));
    }

    #[test]
    fn test_unwritable_path_is_io_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("out.mov");
        let codec = open_codec(16, 16);
        let mut muxer = FfmpegMuxer::new();

        let err = muxer
            .open(
                &path,
                ContainerKind::QuickTime,
                codec.stream_parameters().unwrap(),
                codec.time_base().unwrap(),
            )
            .unwrap_err();
        assert!(matches!(err, ContainerError::IoOpen { .. }));
        assert_eq!(muxer.status(), MuxerStatus::OpenFailed);
        assert_eq!(muxer.close(), StreamLedger::default());
        assert!(!path.exists());
    }

    #[test]
    fn test_open_twice_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("twice.mov");
        let codec = open_codec(16, 16);
        let mut muxer = open_muxer(&path, &codec);
        let err = muxer
            .open(
                &path,
                ContainerKind::QuickTime,
                codec.stream_parameters().unwrap(),
                codec.time_base().unwrap(),
            )
            .unwrap_err();
        assert_eq!(err, ContainerError::AlreadyOpened);
    }

    #[test]
    fn test_write_after_trailer_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("late.mov");
        let mut codec = open_codec(16, 16);
        let mut muxer = open_muxer(&path, &codec);
        muxer.write_trailer().unwrap();
        let packet = encode(&mut codec, 16, 16, 0);
        assert_eq!(muxer.write_packet(&packet), Err(ContainerError::NotOpen));
    }
}
