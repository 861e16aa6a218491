use crate::conversion::domain::planar_converter::PlanarConverter;
use crate::conversion::domain::rgb24_image::Rgb24Image;
use crate::shared::error::ConversionError;

use super::packaged_frame::PackagedFrame;

/// Owns the one destination buffer of a session and fills it per frame.
///
/// `package` hands out a shared borrow of the buffer, so the codec must be
/// done with it before the next call can overwrite it.
pub struct FramePackager {
    converter: Box<dyn PlanarConverter>,
    frame: PackagedFrame,
    packaged: u64,
}

impl FramePackager {
    pub fn new(width: u32, height: u32, converter: Box<dyn PlanarConverter>) -> Self {
        log::debug!(
            "Allocating {width}x{height} 4:2:2 buffer for {} converter",
            converter.name()
        );
        Self {
            converter,
            frame: PackagedFrame::new(width, height),
            packaged: 0,
        }
    }

    pub fn width(&self) -> u32 {
        self.frame.width()
    }

    pub fn height(&self) -> u32 {
        self.frame.height()
    }

    pub fn converter_name(&self) -> &'static str {
        self.converter.name()
    }

    /// Number of frames packaged so far.
    pub fn packaged(&self) -> u64 {
        self.packaged
    }

    pub fn package(&mut self, image: &Rgb24Image) -> Result<&PackagedFrame, ConversionError> {
        self.converter.convert(image, &mut self.frame)?;
        self.packaged += 1;
        Ok(&self.frame)
    }
}
