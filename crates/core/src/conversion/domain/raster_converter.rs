use crate::render::domain::row_source::{ChannelMask, PixelRect, RowSource};
use crate::shared::error::{ConfigurationError, SourceError};
use crate::shared::raster_frame::Channel;

use super::quantizer::{Quantizer, TransferCurve};
use super::rgb24_image::Rgb24Image;

/// Result of pulling one frame from the renderer.
#[derive(Debug, Clone, PartialEq)]
pub enum Conversion {
    Complete(Rgb24Image),
    /// The renderer raised its abort flag. Nothing was produced.
    Aborted { rows_read: u32 },
}

/// Pulls float rows from a [`RowSource`] into an interleaved 8-bit image.
///
/// Output row `r` is sourced from input row `height - 1 - r`. Renderer rows
/// count up from the bottom, the planar path downstream counts down from the
/// top. The abort flag is polled around every row pull.
#[derive(Debug, Clone)]
pub struct RasterConverter {
    width: u32,
    height: u32,
    quantizer: Quantizer,
}

impl RasterConverter {
    pub fn new(width: u32, height: u32, curve: TransferCurve) -> Result<Self, ConfigurationError> {
        if width == 0 || height == 0 {
            return Err(ConfigurationError::InvalidDimensions { width, height });
        }
        Ok(Self {
            width,
            height,
            quantizer: Quantizer::new(curve),
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pull(&self, source: &mut dyn RowSource) -> Result<Conversion, SourceError> {
        source.validate()?;
        source.request(
            PixelRect::full(self.width, self.height),
            ChannelMask::RGB,
            1,
        );

        let mut image = Rgb24Image::new(self.width, self.height);
        for y in 0..self.height {
            if source.is_aborted() {
                return Ok(Conversion::Aborted { rows_read: y });
            }
            let row = source.get_row(y, 0, self.width, ChannelMask::RGB)?;
            if source.is_aborted() {
                return Ok(Conversion::Aborted { rows_read: y + 1 });
            }

            let dst = image.row_mut(self.height - 1 - y);
            for channel in Channel::RGB {
                let samples = row.channel(channel);
                if samples.len() != self.width as usize {
                    return Err(SourceError::ShortRow {
                        row: y,
                        expected: self.width,
                        got: samples.len() as u32,
                    });
                }
                self.quantizer
                    .to_bytes_strided(samples, &mut dst[channel.index()..], 3);
            }
        }
        Ok(Conversion::Complete(image))
    }
}
