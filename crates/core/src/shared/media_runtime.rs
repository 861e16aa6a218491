use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use super::error::ConfigurationError;

/// Verbosity of the media library's own diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaLogLevel {
    Quiet,
    Error,
    #[default]
    Warning,
    Info,
    Debug,
}

impl MediaLogLevel {
    fn to_ffmpeg(self) -> ffmpeg_next::util::log::Level {
        use ffmpeg_next::util::log::Level;
        match self {
            MediaLogLevel::Quiet => Level::Quiet,
            MediaLogLevel::Error => Level::Error,
            MediaLogLevel::Warning => Level::Warning,
            MediaLogLevel::Info => Level::Info,
            MediaLogLevel::Debug => Level::Debug,
        }
    }
}

static INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// One-time, process-wide registration of the media library.
///
/// Only the first call's `level` takes effect; later calls return the
/// cached outcome without touching global state.
pub fn initialize(level: MediaLogLevel) -> Result<(), ConfigurationError> {
    INIT.get_or_init(|| {
        ffmpeg_next::init().map_err(|e| e.to_string())?;
        ffmpeg_next::util::log::set_level(level.to_ffmpeg());
        log::debug!("Media library initialised (log level {level:?})");
        Ok(())
    })
    .clone()
    .map_err(ConfigurationError::Runtime)
}

/// Initialises with the default level if nothing has done so yet.
pub fn ensure_initialized() -> Result<(), ConfigurationError> {
    initialize(MediaLogLevel::default())
}
