use std::path::PathBuf;
use std::process;

use clap::Parser;

use prores_writer_core::conversion::domain::quantizer::TransferCurve;
use prores_writer_core::conversion::infrastructure::converter_factory::ConverterKind;
use prores_writer_core::encode::infrastructure::prores_codec::ProresCodec;
use prores_writer_core::mux::infrastructure::ffmpeg_muxer::FfmpegMuxer;
use prores_writer_core::pipeline::encode_session::{EncodeSession, FrameOutcome};
use prores_writer_core::pipeline::session_logger::StdoutSessionLogger;
use prores_writer_core::pipeline::writer_settings::WriterSettings;
use prores_writer_core::render::domain::row_source::RowSource;
use prores_writer_core::render::infrastructure::image_row_source::{is_image, ImageRowSource};
use prores_writer_core::render::infrastructure::raster_row_source::RasterRowSource;
use prores_writer_core::shared::codec_config::{MbDecision, ProresProfile};
use prores_writer_core::shared::media_runtime;
use prores_writer_core::shared::raster_frame::RasterFrame;

/// Encode image files, or a solid colour, into a ProRes 4:2:2 container.
#[derive(Parser)]
#[command(name = "prores-writer")]
struct Cli {
    /// Output file (.mov, .qt or .mkv).
    output: PathBuf,

    /// Input images, one frame each, in order.
    inputs: Vec<PathBuf>,

    /// Encode a solid linear-light colour instead of images: r,g,b in 0.0-1.0.
    #[arg(long, value_delimiter = ',')]
    solid: Option<Vec<f32>>,

    /// Number of frames to write with --solid.
    #[arg(long, default_value = "24")]
    frames: u32,

    /// Frame width for --solid.
    #[arg(long, default_value = "1920")]
    width: u32,

    /// Frame height for --solid.
    #[arg(long, default_value = "1080")]
    height: u32,

    /// ProRes profile: proxy, lt, standard or hq.
    #[arg(long)]
    profile: Option<String>,

    /// Frames per second (0-100].
    #[arg(long)]
    fps: Option<f32>,

    /// Target bitrate in bits/sec.
    #[arg(long)]
    bitrate: Option<u64>,

    /// Bitrate tolerance in bits.
    #[arg(long)]
    bitrate_tolerance: Option<u64>,

    /// Macroblock decision: simple, bits or rd.
    #[arg(long)]
    mb_decision: Option<String>,

    /// RGB to 4:2:2 converter: swscale or software.
    #[arg(long)]
    converter: Option<String>,

    /// Float to 8-bit transfer: srgb or linear.
    #[arg(long)]
    transfer: Option<String>,

    /// Settings JSON to start from instead of the per-user file.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Raise the abort flag after this many rows of the first frame.
    #[arg(long)]
    abort_after_rows: Option<u32>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let base = match &cli.settings {
        Some(path) => WriterSettings::load_from(path)?,
        None => WriterSettings::load(),
    };
    let settings = apply_overrides(&cli, base)?;
    settings.codec.validate()?;
    media_runtime::initialize(settings.media_log_level)?;

    let mut session = EncodeSession::prores(&cli.output, &settings)
        .with_logger(Box::new(StdoutSessionLogger::default()));

    let written = write_frames(&cli, &mut session);
    let report = session.finish();
    let written = written?;
    let report = report?;

    log::info!(
        "Wrote {written} frames to {} (trailer: {}, streams released: {}/{})",
        cli.output.display(),
        report.trailer_written,
        report.streams_released,
        report.streams_allocated
    );
    Ok(())
}

type ProresSession = EncodeSession<ProresCodec, FfmpegMuxer>;

fn write_frames(cli: &Cli, session: &mut ProresSession) -> Result<u64, Box<dyn std::error::Error>> {
    let mut written = 0;
    match &cli.solid {
        Some(rgb) => {
            let colour = [rgb[0], rgb[1], rgb[2]];
            for index in 0..cli.frames {
                let source = RasterRowSource::new(RasterFrame::solid(cli.width, cli.height, colour));
                let mut source = match abort_limit(cli, index) {
                    Some(rows) => source.with_abort_after_rows(rows),
                    None => source,
                };
                written += submit(session, &mut source, index)?;
            }
        }
        None => {
            for (index, path) in cli.inputs.iter().enumerate() {
                let source = ImageRowSource::open(path)?;
                let mut source = match abort_limit(cli, index as u32) {
                    Some(rows) => source.with_abort_after_rows(rows),
                    None => source,
                };
                written += submit(session, &mut source, index as u32)?;
            }
        }
    }
    Ok(written)
}

fn submit(
    session: &mut ProresSession,
    source: &mut dyn RowSource,
    index: u32,
) -> Result<u64, Box<dyn std::error::Error>> {
    match session.write_frame(source)? {
        FrameOutcome::Aborted { rows_read } => {
            log::warn!("Frame {index} aborted after {rows_read} rows");
            Ok(0)
        }
        FrameOutcome::Written | FrameOutcome::Buffered => Ok(1),
    }
}

fn abort_limit(cli: &Cli, index: u32) -> Option<u32> {
    cli.abort_after_rows.filter(|_| index == 0)
}

fn apply_overrides(
    cli: &Cli,
    mut settings: WriterSettings,
) -> Result<WriterSettings, Box<dyn std::error::Error>> {
    if let Some(name) = &cli.profile {
        let profile = ProresProfile::parse(name)
            .ok_or_else(|| format!("Unknown profile '{name}'. Use proxy, lt, standard or hq"))?;
        settings.codec = settings.codec.with_profile(profile);
    }
    if let Some(fps) = cli.fps {
        settings.codec = settings.codec.with_frame_rate(fps);
    }
    if let Some(bitrate) = cli.bitrate {
        settings.codec = settings.codec.with_bitrate(bitrate);
    }
    if let Some(tolerance) = cli.bitrate_tolerance {
        settings.codec = settings.codec.with_bitrate_tolerance(tolerance);
    }
    if let Some(name) = &cli.mb_decision {
        let mode = MbDecision::parse(name)
            .ok_or_else(|| format!("Unknown macroblock decision '{name}'. Use simple, bits or rd"))?;
        settings.codec = settings.codec.with_mb_decision(mode);
    }
    if let Some(name) = &cli.converter {
        settings.converter = ConverterKind::parse(name)
            .ok_or_else(|| format!("Unknown converter '{name}'. Use swscale or software"))?;
    }
    if let Some(name) = &cli.transfer {
        settings.transfer = TransferCurve::parse(name)
            .ok_or_else(|| format!("Unknown transfer curve '{name}'. Use srgb or linear"))?;
    }
    Ok(settings)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    match (&cli.solid, cli.inputs.is_empty()) {
        (Some(_), false) => {
            return Err("--solid cannot be combined with input images".into());
        }
        (None, true) => {
            return Err("Provide input images or --solid r,g,b".into());
        }
        _ => {}
    }
    if let Some(rgb) = &cli.solid {
        if rgb.len() != 3 {
            return Err(format!("--solid needs exactly 3 values, got {}", rgb.len()).into());
        }
        if cli.width == 0 || cli.height == 0 {
            return Err("--width and --height must be positive".into());
        }
    }
    for input in &cli.inputs {
        if !input.exists() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
        if !is_image(input) {
            return Err(format!("Not a supported image: {}", input.display()).into());
        }
    }
    if let Some(parent) = cli.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        if !parent.is_dir() {
            return Err(format!("Output directory not found: {}", parent.display()).into());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("prores-writer").chain(args.iter().copied()))
    }

    #[test]
    fn test_solid_and_images_are_exclusive() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("a.png");
        std::fs::write(&image, b"").unwrap();
        let out = dir.path().join("out.mov");
        let cli = parse(&[
            out.to_str().unwrap(),
            image.to_str().unwrap(),
            "--solid",
            "1,0,0",
        ]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_needs_some_input() {
        let cli = parse(&["out.mov"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_solid_needs_three_components() {
        let cli = parse(&["out.mov", "--solid", "1,0"]);
        assert!(validate(&cli).is_err());
        let cli = parse(&["out.mov", "--solid", "1,0,0"]);
        assert!(validate(&cli).is_ok());
    }

    #[test]
    fn test_missing_input_rejected() {
        let cli = parse(&["out.mov", "/definitely/not/here.png"]);
        assert!(validate(&cli).is_err());
    }

    #[test]
    fn test_overrides_replace_settings() {
        let cli = parse(&[
            "out.mov",
            "--solid",
            "0,0,1",
            "--profile",
            "hq",
            "--fps",
            "25",
            "--mb-decision",
            "rd",
            "--converter",
            "software",
            "--transfer",
            "linear",
        ]);
        let settings = apply_overrides(&cli, WriterSettings::default()).unwrap();
        assert_eq!(settings.codec.profile, ProresProfile::Hq);
        assert_eq!(settings.codec.frame_rate, 25.0);
        assert_eq!(settings.codec.mb_decision, MbDecision::RateDistortion);
        assert_eq!(settings.converter, ConverterKind::Software);
        assert_eq!(settings.transfer, TransferCurve::Linear);
    }

    #[test]
    fn test_unknown_profile_rejected() {
        let cli = parse(&["out.mov", "--solid", "0,0,1", "--profile", "4444"]);
        assert!(apply_overrides(&cli, WriterSettings::default()).is_err());
    }

    #[test]
    fn test_abort_limit_only_applies_to_first_frame() {
        let cli = parse(&["out.mov", "--solid", "0,0,1", "--abort-after-rows", "3"]);
        assert_eq!(abort_limit(&cli, 0), Some(3));
        assert_eq!(abort_limit(&cli, 1), None);
    }
}
