use crate::conversion::domain::planar_converter::{check_dimensions, PlanarConverter};
use crate::conversion::domain::rgb24_image::Rgb24Image;
use crate::encode::domain::packaged_frame::{PackagedFrame, Plane};
use crate::shared::error::ConversionError;

// BT.601 luma weights.
const KR: f32 = 0.299;
const KB: f32 = 0.114;
const KG: f32 = 1.0 - KR - KB;

// 10-bit limited ("video") range.
const LUMA_OFFSET: f32 = 64.0;
const LUMA_RANGE: f32 = 876.0;
const CHROMA_OFFSET: f32 = 512.0;
const CHROMA_RANGE: f32 = 896.0;

/// Pure-Rust RGB24 -> 10-bit 4:2:2 conversion using BT.601 limited range,
/// the same matrix libswscale picks for untagged sources.
///
/// Chroma is computed per pixel and box-averaged over horizontal pairs; an
/// odd trailing column uses its single pixel. Deterministic, no library
/// state.
#[derive(Debug, Default, Clone, Copy)]
pub struct SoftwarePlanarConverter;

impl SoftwarePlanarConverter {
    pub fn new() -> Self {
        Self
    }
}

fn normalised(rgb: [u8; 3]) -> [f32; 3] {
    rgb.map(|c| c as f32 / 255.0)
}

fn luma(rgb: [f32; 3]) -> f32 {
    KR * rgb[0] + KG * rgb[1] + KB * rgb[2]
}

fn chroma(rgb: [f32; 3]) -> (f32, f32) {
    let y = luma(rgb);
    let cb = (rgb[2] - y) / (2.0 * (1.0 - KB));
    let cr = (rgb[0] - y) / (2.0 * (1.0 - KR));
    (cb, cr)
}

fn to_sample(value: f32) -> u16 {
    value.round().clamp(0.0, PackagedFrame::MAX_SAMPLE as f32) as u16
}

impl PlanarConverter for SoftwarePlanarConverter {
    fn convert(
        &mut self,
        src: &Rgb24Image,
        dst: &mut PackagedFrame,
    ) -> Result<(), ConversionError> {
        check_dimensions(src, dst)?;

        let width = src.width();
        for y in 0..src.height() {
            let luma_row = dst.row_mut(Plane::Luma, y);
            for x in 0..width {
                let rgb = normalised(src.pixel(x, y));
                luma_row[x as usize] = to_sample(LUMA_OFFSET + LUMA_RANGE * luma(rgb));
            }

            let chroma_width = dst.plane_width(Plane::Cb);
            let mut cb_row = vec![0u16; chroma_width as usize];
            let mut cr_row = vec![0u16; chroma_width as usize];
            for cx in 0..chroma_width {
                let left = 2 * cx;
                let right = (left + 1).min(width - 1);
                let (cb_l, cr_l) = chroma(normalised(src.pixel(left, y)));
                let (cb_r, cr_r) = chroma(normalised(src.pixel(right, y)));
                cb_row[cx as usize] = to_sample(CHROMA_OFFSET + CHROMA_RANGE * (cb_l + cb_r) / 2.0);
                cr_row[cx as usize] = to_sample(CHROMA_OFFSET + CHROMA_RANGE * (cr_l + cr_r) / 2.0);
            }
            dst.row_mut(Plane::Cb, y).copy_from_slice(&cb_row);
            dst.row_mut(Plane::Cr, y).copy_from_slice(&cr_row);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "software"
    }
}
