/// libavcodec encoder used for every session.
pub const PRORES_ENCODER_NAME: &str = "prores_ks";

/// Per-macroblock bit budget handed to the encoder's `bits_per_mb` option.
pub const BITS_PER_MB: u32 = 8000;

/// Four-character vendor tag written into each frame header. QuickTime
/// readers use it to identify the producing encoder.
pub const VENDOR_TAG: &str = "ap10";

/// Codec time base is `TIME_BASE_SCALE / (fps * TIME_BASE_SCALE)`, so
/// fractional rates such as 23.976 keep three decimal places.
pub const TIME_BASE_SCALE: i32 = 1000;

/// Intra-only: every frame is a keyframe.
pub const GOP_SIZE: u32 = 1;

pub const DEFAULT_FRAME_RATE: f32 = 24.0;
pub const MAX_FRAME_RATE: f32 = 100.0;

pub const DEFAULT_BITRATE: u64 = 400_000;
pub const MAX_BITRATE: u64 = 4_000_000_000;

pub const DEFAULT_BITRATE_TOLERANCE: u64 = 40_000_000;
/// Stored in a C `int` by the encoder context.
pub const MAX_BITRATE_TOLERANCE: u64 = i32::MAX as u64;

/// Output sample depth of the packaged planes.
pub const PLANAR_BIT_DEPTH: u32 = 10;

pub const QUICKTIME_EXTENSIONS: &[&str] = &["mov", "qt"];
pub const MATROSKA_EXTENSIONS: &[&str] = &["mkv"];

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp", "exr"];

pub const SETTINGS_DIR_NAME: &str = "ProresWriter";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
