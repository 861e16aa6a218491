use std::path::{Path, PathBuf};

use image::{ColorType, DynamicImage};
use thiserror::Error;

use crate::conversion::domain::quantizer::srgb_to_linear;
use crate::render::domain::row_source::{ChannelMask, PixelRect, Row, RowSource};
use crate::render::infrastructure::raster_row_source::RasterRowSource;
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::error::SourceError;
use crate::shared::raster_frame::RasterFrame;

#[derive(Error, Debug)]
pub enum ImageLoadError {
    #[error("failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Adapts a still image on disk to the [`RowSource`] interface, standing in
/// for a live renderer.
///
/// Rows are served bottom-up like any renderer, so `get_row(0)` is the
/// last row of the file.
///
/// Integer images are assumed to carry sRGB-encoded values and are
/// linearised on load; float images (EXR, 32-bit TIFF) are used as-is.
pub struct ImageRowSource {
    path: PathBuf,
    inner: RasterRowSource,
}

impl ImageRowSource {
    pub fn open(path: &Path) -> Result<Self, ImageLoadError> {
        let img = image::open(path).map_err(|source| ImageLoadError::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let frame = raster_from_image(&img);
        log::debug!(
            "Loaded {} ({}x{}, {:?})",
            path.display(),
            frame.width(),
            frame.height(),
            img.color()
        );
        Ok(Self {
            path: path.to_path_buf(),
            inner: RasterRowSource::new(frame),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn with_abort_after_rows(mut self, rows: u32) -> Self {
        self.inner = self.inner.with_abort_after_rows(rows);
        self
    }
}

impl RowSource for ImageRowSource {
    fn width(&self) -> u32 {
        self.inner.width()
    }

    fn height(&self) -> u32 {
        self.inner.height()
    }

    fn validate(&mut self) -> Result<(), SourceError> {
        self.inner.validate()
    }

    fn request(&mut self, region: PixelRect, channels: ChannelMask, count: u32) {
        self.inner.request(region, channels, count);
    }

    fn get_row(
        &mut self,
        y: u32,
        x0: u32,
        x1: u32,
        channels: ChannelMask,
    ) -> Result<Row, SourceError> {
        self.inner.get_row(y, x0, x1, channels)
    }

    fn is_aborted(&self) -> bool {
        self.inner.is_aborted()
    }
}

fn is_float(color: ColorType) -> bool {
    matches!(color, ColorType::Rgb32F | ColorType::Rgba32F)
}

fn raster_from_image(img: &DynamicImage) -> RasterFrame {
    let linear = is_float(img.color());
    let rgb = img.to_rgb32f();
    let (width, height) = rgb.dimensions();
    let mut data = rgb.into_raw();
    if !linear {
        for value in data.iter_mut() {
            *value = srgb_to_linear(*value);
        }
    }
    RasterFrame::new(data, width, height)
}

/// Returns true if `path` has an extension the image decoder handles.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
