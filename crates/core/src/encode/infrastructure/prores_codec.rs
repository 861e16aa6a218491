use std::collections::VecDeque;

use ffmpeg_next::codec;
use ffmpeg_next::format::Pixel;
use ffmpeg_next::util::frame::video::Video as VideoFrame;
use ffmpeg_next::{Dictionary, Packet};

use crate::encode::domain::packaged_frame::{PackagedFrame, Plane};
use crate::encode::domain::video_codec::{CompressedPacket, VideoCodec};
use crate::shared::codec_config::{CodecConfiguration, MbDecision};
use crate::shared::constants::{BITS_PER_MB, GOP_SIZE, PRORES_ENCODER_NAME, VENDOR_TAG};
use crate::shared::error::CodecError;
use crate::shared::media_runtime;
use crate::shared::rational::Rational;

struct OpenEncoder {
    encoder: codec::encoder::video::Encoder,
    frame: VideoFrame,
    time_base: Rational,
    // Packets received but not yet handed out, oldest first.
    pending: VecDeque<CompressedPacket>,
}

/// Intra-only 10-bit 4:2:2 ProRes encoder backed by libavcodec's `prores_ks`.
pub struct ProresCodec {
    encoder_name: String,
    state: Option<OpenEncoder>,
}

impl ProresCodec {
    pub fn new() -> Self {
        Self::with_encoder_name(PRORES_ENCODER_NAME)
    }

    /// Overrides the encoder looked up at open. Only useful for probing.
    pub fn with_encoder_name(name: &str) -> Self {
        Self {
            encoder_name: name.to_string(),
            state: None,
        }
    }
}

impl Default for ProresCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn to_decision(mode: MbDecision) -> codec::encoder::Decision {
    match mode {
        MbDecision::Simple => codec::encoder::Decision::Simple,
        MbDecision::Bits => codec::encoder::Decision::Bits,
        MbDecision::RateDistortion => codec::encoder::Decision::RateDistortion,
    }
}

fn is_again(err: &ffmpeg_next::Error) -> bool {
    matches!(err, ffmpeg_next::Error::Other { errno } if *errno == ffmpeg_next::util::error::EAGAIN)
}

fn to_compressed(packet: &Packet, time_base: Rational) -> CompressedPacket {
    CompressedPacket {
        data: packet.data().map(<[u8]>::to_vec).unwrap_or_default(),
        pts: packet.pts(),
        dts: packet.dts(),
        duration: packet.duration(),
        is_keyframe: packet.is_key(),
        stream_index: packet.stream(),
        time_base,
    }
}

fn load_planes(src: &PackagedFrame, dst: &mut VideoFrame) {
    for plane in Plane::ALL {
        let index = plane.index();
        let stride = dst.stride(index);
        let data = dst.data_mut(index);
        for y in 0..src.height() {
            let start = y as usize * stride;
            let row = src.row(plane, y);
            for (bytes, sample) in data[start..start + row.len() * 2]
                .chunks_exact_mut(2)
                .zip(row)
            {
                bytes.copy_from_slice(&sample.to_le_bytes());
            }
        }
    }
}

impl OpenEncoder {
    fn drain(&mut self) -> Result<(), ffmpeg_next::Error> {
        let mut packet = Packet::empty();
        loop {
            match self.encoder.receive_packet(&mut packet) {
                Ok(()) => self
                    .pending
                    .push_back(to_compressed(&packet, self.time_base)),
                Err(ffmpeg_next::Error::Eof) => return Ok(()),
                Err(e) if is_again(&e) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }
}

impl VideoCodec for ProresCodec {
    type Parameters = codec::Parameters;

    fn open(
        &mut self,
        config: &CodecConfiguration,
        width: u32,
        height: u32,
    ) -> Result<(), CodecError> {
        if self.state.is_some() {
            return Err(CodecError::Open("codec already open".into()));
        }
        media_runtime::ensure_initialized().map_err(|e| CodecError::Open(e.to_string()))?;

        let encoder_codec = ffmpeg_next::encoder::find_by_name(&self.encoder_name)
            .ok_or_else(|| CodecError::EncoderNotFound(self.encoder_name.clone()))?;

        let mut ctx = codec::context::Context::new_with_codec(encoder_codec)
            .encoder()
            .video()
            .map_err(|e| CodecError::Open(e.to_string()))?;

        let time_base = config.time_base();
        ctx.set_width(width);
        ctx.set_height(height);
        ctx.set_format(Pixel::YUV422P10LE);
        ctx.set_flags(codec::Flags::GLOBAL_HEADER);
        ctx.set_time_base(time_base);
        ctx.set_frame_rate(Some(Rational::new(time_base.den, time_base.num)));
        ctx.set_gop(GOP_SIZE);
        ctx.set_bit_rate(config.bitrate as usize);
        ctx.set_tolerance(config.bitrate_tolerance as usize);
        ctx.set_mb_decision(to_decision(config.mb_decision));

        let mut options = Dictionary::new();
        options.set("profile", config.profile.option_value());
        options.set("bits_per_mb", &BITS_PER_MB.to_string());
        options.set("vendor", VENDOR_TAG);

        let encoder = ctx
            .open_with(options)
            .map_err(|e| CodecError::Open(e.to_string()))?;

        log::info!(
            "Opened {} ({} profile, {width}x{height}, {} fps, time base {}/{})",
            self.encoder_name,
            config.profile,
            config.frame_rate,
            time_base.num,
            time_base.den
        );

        self.state = Some(OpenEncoder {
            encoder,
            frame: VideoFrame::new(Pixel::YUV422P10LE, width, height),
            time_base,
            pending: VecDeque::new(),
        });
        Ok(())
    }

    fn encode_frame(
        &mut self,
        frame: &PackagedFrame,
        pts: i64,
    ) -> Result<Option<CompressedPacket>, CodecError> {
        let state = self.state.as_mut().ok_or(CodecError::NotOpen)?;
        if frame.width() != state.frame.width() || frame.height() != state.frame.height() {
            return Err(CodecError::Encode(format!(
                "frame is {}x{}, encoder expects {}x{}",
                frame.width(),
                frame.height(),
                state.frame.width(),
                state.frame.height()
            )));
        }

        load_planes(frame, &mut state.frame);
        state.frame.set_pts(Some(pts));
        state
            .encoder
            .send_frame(&state.frame)
            .map_err(|e| CodecError::Encode(e.to_string()))?;

        state
            .drain()
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        if state.pending.len() > 1 {
            log::debug!("{} packets queued behind this one", state.pending.len() - 1);
        }
        Ok(state.pending.pop_front())
    }

    fn flush(&mut self) -> Result<Vec<CompressedPacket>, CodecError> {
        let state = self.state.as_mut().ok_or(CodecError::NotOpen)?;
        state
            .encoder
            .send_eof()
            .map_err(|e| CodecError::Flush(e.to_string()))?;
        state
            .drain()
            .map_err(|e| CodecError::Flush(e.to_string()))?;
        Ok(state.pending.drain(..).collect())
    }

    fn stream_parameters(&self) -> Result<codec::Parameters, CodecError> {
        let state = self.state.as_ref().ok_or(CodecError::NotOpen)?;
        Ok(codec::Parameters::from(&state.encoder))
    }

    fn time_base(&self) -> Option<Rational> {
        self.state.as_ref().map(|s| s.time_base)
    }

    fn close(&mut self) {
        if self.state.take().is_some() {
            log::debug!("Closed {}", self.encoder_name);
        }
    }

    fn is_open(&self) -> bool {
        self.state.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::codec_config::ProresProfile;
    use rstest::rstest;

    fn config() -> CodecConfiguration {
        CodecConfiguration::default().with_frame_rate(24.0)
    }

    fn grey(width: u32, height: u32) -> PackagedFrame {
        let mut frame = PackagedFrame::new(width, height);
        frame.plane_mut(Plane::Luma).fill(502);
        frame.plane_mut(Plane::Cb).fill(512);
        frame.plane_mut(Plane::Cr).fill(512);
        frame
    }

    #[test]
    fn test_encode_produces_keyframe_packet() {
        let mut codec = ProresCodec::new();
        codec.open(&config(), 16, 16).unwrap();

        let packet = codec.encode_frame(&grey(16, 16), 0).unwrap().unwrap();
        assert!(packet.is_keyframe);
        assert!(packet.size() > 0);
        assert_eq!(packet.pts, Some(0));
        assert_eq!(packet.time_base, Rational::new(1000, 24000));
        codec.close();
    }

    #[test]
    fn test_every_frame_is_a_keyframe() {
        let mut codec = ProresCodec::new();
        codec.open(&config(), 16, 8).unwrap();
        for pts in 0..4 {
            let packet = codec.encode_frame(&grey(16, 8), pts).unwrap().unwrap();
            assert!(packet.is_keyframe);
            assert_eq!(packet.pts, Some(pts));
        }
        assert!(codec.flush().unwrap().is_empty());
    }

    #[rstest]
    #[case(ProresProfile::Proxy)]
    #[case(ProresProfile::Lt)]
    #[case(ProresProfile::Standard)]
    #[case(ProresProfile::Hq)]
    fn test_all_profiles_open(#[case] profile: ProresProfile) {
        let mut codec = ProresCodec::new();
        codec.open(&config().with_profile(profile), 16, 16).unwrap();
        assert!(codec.is_open());
    }

    #[rstest]
    #[case(MbDecision::Simple)]
    #[case(MbDecision::Bits)]
    #[case(MbDecision::RateDistortion)]
    fn test_all_mb_decisions_open(#[case] mode: MbDecision) {
        let mut codec = ProresCodec::new();
        codec.open(&config().with_mb_decision(mode), 16, 16).unwrap();
        assert!(codec.encode_frame(&grey(16, 16), 0).unwrap().is_some());
    }

    #[test]
    fn test_missing_encoder_reported() {
        let mut codec = ProresCodec::with_encoder_name("no_such_encoder");
        assert_eq!(
            codec.open(&config(), 16, 16).unwrap_err(),
            CodecError::EncoderNotFound("no_such_encoder".into())
        );
        assert!(!codec.is_open());
    }

    #[test]
    fn test_encode_without_open_returns_error() {
        let mut codec = ProresCodec::new();
        assert_eq!(
            codec.encode_frame(&grey(16, 16), 0).unwrap_err(),
            CodecError::NotOpen
        );
        assert!(codec.stream_parameters().is_err());
        assert!(codec.time_base().is_none());
    }

    #[test]
    fn test_wrong_frame_size_is_encode_error() {
        let mut codec = ProresCodec::new();
        codec.open(&config(), 16, 16).unwrap();
        assert!(matches!(
            codec.encode_frame(&grey(8, 8), 0),
            Err(CodecError::Encode(_))
        ));
    }

    #[test]
    fn test_double_open_rejected() {
        let mut codec = ProresCodec::new();
        codec.open(&config(), 16, 16).unwrap();
        assert!(matches!(
            codec.open(&config(), 16, 16),
            Err(CodecError::Open(_))
        ));
    }

    #[test]
    fn test_close_idempotent() {
        let mut codec = ProresCodec::new();
        codec.close();
        codec.open(&config(), 16, 16).unwrap();
        codec.close();
        codec.close();
        assert!(!codec.is_open());
    }

    #[test]
    fn test_stream_parameters_describe_prores() {
        let mut codec = ProresCodec::new();
        codec.open(&config(), 32, 16).unwrap();
        let params = codec.stream_parameters().unwrap();
        assert_eq!(params.id(), codec::Id::PRORES);
    }

    fn queued(codec: &mut ProresCodec, pts: i64) {
        let state = codec.state.as_mut().unwrap();
        let packet = CompressedPacket {
            data: vec![0xAB; 4],
            pts: Some(pts),
            dts: Some(pts),
            duration: 1,
            is_keyframe: true,
            stream_index: 0,
            time_base: state.time_base,
        };
        state.pending.push_back(packet);
    }

    #[test]
    fn test_queued_packets_come_out_oldest_first() {
        let mut codec = ProresCodec::new();
        codec.open(&config(), 16, 16).unwrap();
        queued(&mut codec, 100);
        queued(&mut codec, 101);

        let mut seen = Vec::new();
        for pts in 0..3 {
            let packet = codec.encode_frame(&grey(16, 16), pts).unwrap().unwrap();
            seen.push(packet.pts);
        }
        seen.extend(codec.flush().unwrap().into_iter().map(|p| p.pts));

        assert_eq!(
            seen,
            vec![Some(100), Some(101), Some(0), Some(1), Some(2)]
        );
    }

    #[test]
    fn test_flush_returns_every_queued_packet() {
        let mut codec = ProresCodec::new();
        codec.open(&config(), 16, 16).unwrap();
        queued(&mut codec, 7);
        codec.encode_frame(&grey(16, 16), 0).unwrap();

        let flushed = codec.flush().unwrap();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0].pts, Some(0));
    }
}
