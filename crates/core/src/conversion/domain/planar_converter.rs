use crate::encode::domain::packaged_frame::PackagedFrame;
use crate::shared::error::ConversionError;

use super::rgb24_image::Rgb24Image;

/// Colour transform from the 8-bit RGB intermediate into the codec's
/// 10-bit 4:2:2 planar layout. Scaling is always 1:1.
///
/// Implementations write in place so the destination buffer can be reused
/// across frames.
pub trait PlanarConverter {
    fn convert(&mut self, src: &Rgb24Image, dst: &mut PackagedFrame)
        -> Result<(), ConversionError>;

    fn name(&self) -> &'static str;
}

pub(crate) fn check_dimensions(
    src: &Rgb24Image,
    dst: &PackagedFrame,
) -> Result<(), ConversionError> {
    if src.width() != dst.width() || src.height() != dst.height() {
        return Err(ConversionError::DimensionMismatch {
            expected_width: dst.width(),
            expected_height: dst.height(),
            width: src.width(),
            height: src.height(),
        });
    }
    Ok(())
}
