use ffmpeg_next::format::Pixel;
use ffmpeg_next::software::scaling::{Context as Scaler, Flags};
use ffmpeg_next::util::frame::video::Video as VideoFrame;

use crate::conversion::domain::planar_converter::{check_dimensions, PlanarConverter};
use crate::conversion::domain::rgb24_image::Rgb24Image;
use crate::encode::domain::packaged_frame::{PackagedFrame, Plane};
use crate::shared::error::{ConfigurationError, ConversionError};
use crate::shared::media_runtime;

/// RGB24 -> YUV422P10LE through libswscale with the bicubic filter.
///
/// The scaler context and both intermediate frames are built once and
/// reused for every frame of the session.
pub struct SwsPlanarConverter {
    scaler: Scaler,
    input: VideoFrame,
    output: VideoFrame,
    width: u32,
    height: u32,
}

impl SwsPlanarConverter {
    /// Fails with `UnsupportedConversion` if libswscale rejects the
    /// dimensions or format pair. This is a setup error, never per-frame.
    pub fn new(width: u32, height: u32) -> Result<Self, ConfigurationError> {
        if width == 0 || height == 0 {
            return Err(ConfigurationError::InvalidDimensions { width, height });
        }
        media_runtime::ensure_initialized()?;

        let scaler = Scaler::get(
            Pixel::RGB24,
            width,
            height,
            Pixel::YUV422P10LE,
            width,
            height,
            Flags::BICUBIC,
        )
        .map_err(|e| {
            ConfigurationError::UnsupportedConversion(format!(
                "RGB24 -> YUV422P10LE at {width}x{height}: {e}"
            ))
        })?;

        Ok(Self {
            scaler,
            input: VideoFrame::new(Pixel::RGB24, width, height),
            output: VideoFrame::new(Pixel::YUV422P10LE, width, height),
            width,
            height,
        })
    }

    fn load_input(&mut self, src: &Rgb24Image) {
        let stride = self.input.stride(0);
        let row_bytes = src.stride();
        let data = self.input.data_mut(0);
        for y in 0..self.height {
            let start = y as usize * stride;
            data[start..start + row_bytes].copy_from_slice(src.row(y));
        }
    }

    fn store_output(&self, dst: &mut PackagedFrame) {
        for plane in Plane::ALL {
            let index = plane.index();
            let stride = self.output.stride(index);
            let bytes = self.output.data(index);
            let samples = dst.plane_width(plane) as usize;
            for y in 0..self.height {
                let start = y as usize * stride;
                let src_row = &bytes[start..start + samples * 2];
                for (out, pair) in dst
                    .row_mut(plane, y)
                    .iter_mut()
                    .zip(src_row.chunks_exact(2))
                {
                    *out = u16::from_le_bytes([pair[0], pair[1]]);
                }
            }
        }
    }
}

impl PlanarConverter for SwsPlanarConverter {
    fn convert(
        &mut self,
        src: &Rgb24Image,
        dst: &mut PackagedFrame,
    ) -> Result<(), ConversionError> {
        check_dimensions(src, dst)?;
        if src.width() != self.width || src.height() != self.height {
            return Err(ConversionError::DimensionMismatch {
                expected_width: self.width,
                expected_height: self.height,
                width: src.width(),
                height: src.height(),
            });
        }

        self.load_input(src);
        self.scaler
            .run(&self.input, &mut self.output)
            .map_err(|e| ConversionError::Failed(e.to_string()))?;
        self.store_output(dst);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "swscale"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::infrastructure::software_planar_converter::SoftwarePlanarConverter;

    fn solid(width: u32, height: u32, rgb: [u8; 3]) -> Rgb24Image {
        Rgb24Image::from_raw(rgb.repeat(width as usize * height as usize), width, height).unwrap()
    }

    fn mean(samples: &[u16]) -> f64 {
        samples.iter().map(|&s| s as f64).sum::<f64>() / samples.len() as f64
    }

    #[test]
    fn test_zero_dimensions_rejected() {
        assert!(matches!(
            SwsPlanarConverter::new(0, 16),
            Err(ConfigurationError::InvalidDimensions { .. })
        ));
    }

    #[test]
    fn test_converts_solid_colour_close_to_reference() {
        let src = solid(16, 8, [255, 0, 0]);
        let mut sws_out = PackagedFrame::new(16, 8);
        let mut reference = PackagedFrame::new(16, 8);

        SwsPlanarConverter::new(16, 8)
            .unwrap()
            .convert(&src, &mut sws_out)
            .unwrap();
        SoftwarePlanarConverter::new()
            .convert(&src, &mut reference)
            .unwrap();

        for plane in Plane::ALL {
            let delta = (mean(sws_out.plane(plane)) - mean(reference.plane(plane))).abs();
            assert!(delta < 8.0, "{plane:?} differs by {delta}");
        }
    }

    #[test]
    fn test_preserves_row_order() {
        // Top half white, bottom half black.
        let mut data = vec![255u8; 16 * 4 * 3];
        data.extend(vec![0u8; 16 * 4 * 3]);
        let src = Rgb24Image::from_raw(data, 16, 8).unwrap();
        let mut dst = PackagedFrame::new(16, 8);
        SwsPlanarConverter::new(16, 8)
            .unwrap()
            .convert(&src, &mut dst)
            .unwrap();

        assert!(dst.sample(Plane::Luma, 8, 0) > 900);
        assert!(dst.sample(Plane::Luma, 8, 7) < 100);
    }

    #[test]
    fn test_reusable_across_frames() {
        let mut converter = SwsPlanarConverter::new(8, 8).unwrap();
        let mut dst = PackagedFrame::new(8, 8);
        converter.convert(&solid(8, 8, [0, 0, 0]), &mut dst).unwrap();
        let black = dst.sample(Plane::Luma, 0, 0);
        converter
            .convert(&solid(8, 8, [255, 255, 255]), &mut dst)
            .unwrap();
        assert!(dst.sample(Plane::Luma, 0, 0) > black);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut converter = SwsPlanarConverter::new(8, 8).unwrap();
        let mut dst = PackagedFrame::new(4, 4);
        assert!(matches!(
            converter.convert(&solid(4, 4, [0, 0, 0]), &mut dst),
            Err(ConversionError::DimensionMismatch { .. })
        ));
    }
}
