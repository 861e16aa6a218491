use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::conversion::domain::quantizer::TransferCurve;
use crate::conversion::domain::raster_converter::{Conversion, RasterConverter};
use crate::conversion::infrastructure::converter_factory::{create_converter, ConverterKind};
use crate::encode::domain::frame_packager::FramePackager;
use crate::encode::domain::video_codec::{CompressedPacket, VideoCodec};
use crate::encode::infrastructure::prores_codec::ProresCodec;
use crate::mux::domain::container_kind::ContainerKind;
use crate::mux::domain::container_muxer::ContainerMuxer;
use crate::mux::infrastructure::ffmpeg_muxer::FfmpegMuxer;
use crate::pipeline::session_logger::{NullSessionLogger, SessionLogger};
use crate::pipeline::writer_settings::WriterSettings;
use crate::render::domain::row_source::RowSource;
use crate::shared::codec_config::CodecConfiguration;
use crate::shared::error::{CodecError, EncodeError};

/// Lifecycle of an [`EncodeSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    /// No frame submitted yet; nothing allocated.
    NeverOpened,
    /// Setup failed. Nothing is held and finish is a no-op.
    OpenFailed,
    /// Codec and container are open and the header is on disk.
    Opened,
    /// An encode or write failed. Further frames are rejected but finish
    /// still tears everything down.
    Faulted,
    Closed,
}

/// What happened to one submitted frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A packet reached the container.
    Written,
    /// The encoder kept the frame; its packet will come later.
    Buffered,
    /// The renderer aborted mid-frame. Nothing was encoded and the session
    /// stays usable.
    Aborted { rows_read: u32 },
}

/// What finish actually did. All zero when setup never completed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TeardownReport {
    pub trailer_written: bool,
    pub streams_allocated: usize,
    pub streams_released: usize,
    pub packets_flushed: usize,
}

struct FramePipeline {
    raster: RasterConverter,
    packager: FramePackager,
}

/// Drives one output file: set up on the first frame, encode and mux each
/// frame, tear down once.
///
/// Codec and container are open exactly while the phase is `Opened` or
/// `Faulted`. Dropping an open session finishes it.
pub struct EncodeSession<C, M>
where
    C: VideoCodec,
    M: ContainerMuxer<Parameters = C::Parameters>,
{
    path: PathBuf,
    config: CodecConfiguration,
    converter: ConverterKind,
    transfer: TransferCurve,
    codec: C,
    muxer: M,
    logger: Box<dyn SessionLogger>,
    phase: SessionPhase,
    pipeline: Option<FramePipeline>,
    next_pts: i64,
    frames_encoded: u64,
    packets_written: u64,
}

impl EncodeSession<ProresCodec, FfmpegMuxer> {
    /// Session writing ProRes through libavformat.
    pub fn prores(path: impl Into<PathBuf>, settings: &WriterSettings) -> Self {
        Self::new(path, settings.codec, ProresCodec::new(), FfmpegMuxer::new())
            .with_converter(settings.converter)
            .with_transfer(settings.transfer)
    }
}

impl<C, M> EncodeSession<C, M>
where
    C: VideoCodec,
    M: ContainerMuxer<Parameters = C::Parameters>,
{
    pub fn new(path: impl Into<PathBuf>, config: CodecConfiguration, codec: C, muxer: M) -> Self {
        Self {
            path: path.into(),
            config,
            converter: ConverterKind::default(),
            transfer: TransferCurve::default(),
            codec,
            muxer,
            logger: Box::new(NullSessionLogger),
            phase: SessionPhase::NeverOpened,
            pipeline: None,
            next_pts: 0,
            frames_encoded: 0,
            packets_written: 0,
        }
    }

    pub fn with_converter(mut self, converter: ConverterKind) -> Self {
        self.converter = converter;
        self
    }

    pub fn with_transfer(mut self, transfer: TransferCurve) -> Self {
        self.transfer = transfer;
        self
    }

    pub fn with_logger(mut self, logger: Box<dyn SessionLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn config(&self) -> &CodecConfiguration {
        &self.config
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Session resolution once set up.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.pipeline
            .as_ref()
            .map(|p| (p.raster.width(), p.raster.height()))
    }

    /// Frames handed to the encoder, whether or not a packet came back.
    pub fn frames_encoded(&self) -> u64 {
        self.frames_encoded
    }

    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn muxer(&self) -> &M {
        &self.muxer
    }

    /// Sets up codec and container for `width`x`height` frames.
    ///
    /// Called implicitly by the first [`write_frame`](Self::write_frame).
    /// Any failure leaves the session in `OpenFailed` with nothing held.
    pub fn open(&mut self, width: u32, height: u32) -> Result<(), EncodeError> {
        if self.phase != SessionPhase::NeverOpened {
            return Err(EncodeError::InvalidState(format!(
                "cannot open a session in phase {:?}",
                self.phase
            )));
        }

        match self.setup(width, height) {
            Ok(pipeline) => {
                self.pipeline = Some(pipeline);
                self.phase = SessionPhase::Opened;
                self.logger.info(&format!(
                    "Writing {width}x{height} {} to {}",
                    self.config.profile,
                    self.path.display()
                ));
                Ok(())
            }
            Err(e) => {
                log::error!("Session setup for {} failed: {e}", self.path.display());
                self.phase = SessionPhase::OpenFailed;
                Err(e)
            }
        }
    }

    fn setup(&mut self, width: u32, height: u32) -> Result<FramePipeline, EncodeError> {
        self.config.validate()?;
        let kind = ContainerKind::from_path(&self.path)?;

        let raster = RasterConverter::new(width, height, self.transfer)?;
        let packager = FramePackager::new(
            width,
            height,
            create_converter(self.converter, width, height)?,
        );

        self.codec.open(&self.config, width, height)?;

        let opened = self
            .codec
            .stream_parameters()
            .and_then(|params| {
                let time_base = self.codec.time_base().ok_or(CodecError::NotOpen)?;
                Ok((params, time_base))
            })
            .map_err(EncodeError::from)
            .and_then(|(params, time_base)| {
                self.muxer
                    .open(&self.path, kind, params, time_base)
                    .map_err(EncodeError::from)
            });
        if let Err(e) = opened {
            self.codec.close();
            return Err(e);
        }

        Ok(FramePipeline { raster, packager })
    }

    /// Pulls one frame from `source`, encodes it and writes any packet.
    ///
    /// The first call sets the session up at the source's resolution.
    pub fn write_frame(&mut self, source: &mut dyn RowSource) -> Result<FrameOutcome, EncodeError> {
        match self.phase {
            SessionPhase::NeverOpened => self.open(source.width(), source.height())?,
            SessionPhase::Opened => {}
            SessionPhase::OpenFailed => {
                return Err(EncodeError::InvalidState(
                    "session setup failed; no frames can be written".into(),
                ))
            }
            SessionPhase::Faulted => {
                return Err(EncodeError::InvalidState(
                    "session faulted on an earlier frame".into(),
                ))
            }
            SessionPhase::Closed => {
                return Err(EncodeError::InvalidState("session already finished".into()))
            }
        }

        let Some(pipeline) = self.pipeline.as_mut() else {
            return Err(EncodeError::InvalidState("session has no frame pipeline".into()));
        };
        if (source.width(), source.height()) != (pipeline.raster.width(), pipeline.raster.height())
        {
            return Err(EncodeError::InvalidState(format!(
                "frame is {}x{}, session is {}x{}",
                source.width(),
                source.height(),
                pipeline.raster.width(),
                pipeline.raster.height()
            )));
        }

        let t0 = Instant::now();
        let image = match pipeline.raster.pull(source)? {
            Conversion::Complete(image) => image,
            Conversion::Aborted { rows_read } => {
                log::info!("Renderer aborted after {rows_read} rows; frame skipped");
                return Ok(FrameOutcome::Aborted { rows_read });
            }
        };
        self.logger.timing("convert", elapsed_ms(t0));

        let t0 = Instant::now();
        let frame = pipeline.packager.package(&image)?;
        self.logger.timing("package", elapsed_ms(t0));

        let t0 = Instant::now();
        let encoded = self.codec.encode_frame(frame, self.next_pts);
        self.logger.timing("encode", elapsed_ms(t0));
        let packet = match encoded {
            Ok(packet) => packet,
            Err(e) => return Err(self.fault(e.into())),
        };
        self.next_pts += 1;
        self.frames_encoded += 1;
        self.logger.progress(self.frames_encoded);

        let Some(packet) = packet else {
            return Ok(FrameOutcome::Buffered);
        };
        let t0 = Instant::now();
        self.write_packet(&packet)?;
        self.logger.timing("mux", elapsed_ms(t0));
        Ok(FrameOutcome::Written)
    }

    fn write_packet(&mut self, packet: &CompressedPacket) -> Result<(), EncodeError> {
        if let Err(e) = self.muxer.write_packet(packet) {
            return Err(self.fault(e.into()));
        }
        self.packets_written += 1;
        self.logger.metric("packet_bytes", packet.size() as f64);
        Ok(())
    }

    fn fault(&mut self, err: EncodeError) -> EncodeError {
        log::error!("Encoding {} failed: {err}", self.path.display());
        self.phase = SessionPhase::Faulted;
        err
    }

    /// Flushes the encoder, writes the trailer and releases codec and
    /// container.
    ///
    /// Does nothing and succeeds if setup never completed or the session
    /// is already closed. Otherwise everything is released even when a
    /// step fails; the first failure is returned.
    pub fn finish(&mut self) -> Result<TeardownReport, EncodeError> {
        if !matches!(self.phase, SessionPhase::Opened | SessionPhase::Faulted) {
            return Ok(TeardownReport::default());
        }

        let mut first_error: Option<EncodeError> = None;
        let mut report = TeardownReport::default();

        match self.codec.flush() {
            Ok(packets) => {
                for packet in &packets {
                    match self.muxer.write_packet(packet) {
                        Ok(()) => {
                            self.packets_written += 1;
                            report.packets_flushed += 1;
                        }
                        Err(e) => {
                            first_error.get_or_insert(e.into());
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                first_error.get_or_insert(e.into());
            }
        }

        match self.muxer.write_trailer() {
            Ok(()) => report.trailer_written = true,
            Err(e) => {
                first_error.get_or_insert(e.into());
            }
        }

        self.codec.close();
        let ledger = self.muxer.close();
        report.streams_allocated = ledger.allocated;
        report.streams_released = ledger.released;

        self.pipeline = None;
        self.phase = SessionPhase::Closed;

        if !ledger.is_balanced() {
            log::warn!(
                "Released {} of {} output streams",
                ledger.released,
                ledger.allocated
            );
        }
        log::info!(
            "Finished {} ({} frames, {} packets)",
            self.path.display(),
            self.frames_encoded,
            self.packets_written
        );
        self.logger.summary();

        match first_error {
            Some(e) => Err(e),
            None => Ok(report),
        }
    }
}

impl<C, M> Drop for EncodeSession<C, M>
where
    C: VideoCodec,
    M: ContainerMuxer<Parameters = C::Parameters>,
{
    fn drop(&mut self) {
        if matches!(self.phase, SessionPhase::Opened | SessionPhase::Faulted) {
            log::warn!(
                "Session for {} dropped without finish; finalizing",
                self.path.display()
            );
            if let Err(e) = self.finish() {
                log::warn!("Finalizing {} failed: {e}", self.path.display());
            }
        }
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}
