use serde::{Deserialize, Serialize};

use crate::conversion::domain::planar_converter::PlanarConverter;
use crate::shared::error::ConfigurationError;

use super::software_planar_converter::SoftwarePlanarConverter;
use super::sws_planar_converter::SwsPlanarConverter;

/// Planar conversion backend.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConverterKind {
    /// libswscale, bicubic. Matches what other ffmpeg-based tools produce.
    #[default]
    Swscale,
    /// Pure-Rust BT.601 matrix. Deterministic across ffmpeg builds.
    Software,
}

impl ConverterKind {
    pub const ALL: [ConverterKind; 2] = [ConverterKind::Swscale, ConverterKind::Software];

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "swscale" | "sws" => Some(ConverterKind::Swscale),
            "software" | "soft" => Some(ConverterKind::Software),
            _ => None,
        }
    }
}

impl std::fmt::Display for ConverterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConverterKind::Swscale => write!(f, "swscale"),
            ConverterKind::Software => write!(f, "software"),
        }
    }
}

/// Builds the planar converter for a session of fixed dimensions.
///
/// Construction failures are configuration errors and surface before the
/// encoder is opened.
pub fn create_converter(
    kind: ConverterKind,
    width: u32,
    height: u32,
) -> Result<Box<dyn PlanarConverter>, ConfigurationError> {
    if width == 0 || height == 0 {
        return Err(ConfigurationError::InvalidDimensions { width, height });
    }
    match kind {
        ConverterKind::Swscale => {
            log::info!("Using swscale planar converter ({width}x{height})");
            Ok(Box::new(SwsPlanarConverter::new(width, height)?))
        }
        ConverterKind::Software => {
            log::info!("Using software planar converter ({width}x{height})");
            Ok(Box::new(SoftwarePlanarConverter::new()))
        }
    }
}
