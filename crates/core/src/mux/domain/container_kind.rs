use std::path::Path;

use crate::shared::constants::{MATROSKA_EXTENSIONS, QUICKTIME_EXTENSIONS};
use crate::shared::error::ContainerError;

/// Output container, inferred from the file extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerKind {
    QuickTime,
    Matroska,
}

impl ContainerKind {
    pub const ALL: [ContainerKind; 2] = [ContainerKind::QuickTime, ContainerKind::Matroska];

    pub fn from_path(path: &Path) -> Result<Self, ContainerError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .ok_or_else(|| ContainerError::UnknownFormat(path.to_path_buf()))?;

        Self::ALL
            .into_iter()
            .find(|kind| kind.extensions().contains(&ext.as_str()))
            .ok_or_else(|| ContainerError::UnknownFormat(path.to_path_buf()))
    }

    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ContainerKind::QuickTime => QUICKTIME_EXTENSIONS,
            ContainerKind::Matroska => MATROSKA_EXTENSIONS,
        }
    }

    /// Short name of the libavformat muxer.
    pub fn muxer_name(self) -> &'static str {
        match self {
            ContainerKind::QuickTime => "mov",
            ContainerKind::Matroska => "matroska",
        }
    }
}

impl std::fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContainerKind::QuickTime => write!(f, "QuickTime"),
            ContainerKind::Matroska => write!(f, "Matroska"),
        }
    }
}
