use serde::{Deserialize, Serialize};

/// How linear float samples are mapped onto 8-bit code values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferCurve {
    /// sRGB encoding, the host's default 8-bit view of linear light.
    #[default]
    Srgb,
    /// Samples are already display-referred; scale only.
    Linear,
}

impl TransferCurve {
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "srgb" => Some(TransferCurve::Srgb),
            "linear" => Some(TransferCurve::Linear),
            _ => None,
        }
    }
}

pub fn linear_to_srgb(value: f32) -> f32 {
    if value <= 0.003_130_8 {
        value * 12.92
    } else {
        1.055 * value.powf(1.0 / 2.4) - 0.055
    }
}

pub fn srgb_to_linear(value: f32) -> f32 {
    if value <= 0.040_45 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

/// Converts float samples to bytes through a transfer curve.
///
/// Out-of-range and NaN inputs clamp to the nearest end of [0, 255].
#[derive(Debug, Clone, Copy)]
pub struct Quantizer {
    curve: TransferCurve,
}

impl Quantizer {
    pub fn new(curve: TransferCurve) -> Self {
        Self { curve }
    }

    pub fn curve(&self) -> TransferCurve {
        self.curve
    }

    pub fn to_byte(&self, value: f32) -> u8 {
        if value.is_nan() || value <= 0.0 {
            return 0;
        }
        if value >= 1.0 {
            return 255;
        }
        let encoded = match self.curve {
            TransferCurve::Srgb => linear_to_srgb(value),
            TransferCurve::Linear => value,
        };
        (encoded * 255.0).round().clamp(0.0, 255.0) as u8
    }

    /// Quantises `src` into every `step`-th byte of `dst`, starting at
    /// `dst[0]`. Used to scatter one channel into an interleaved row.
    pub fn to_bytes_strided(&self, src: &[f32], dst: &mut [u8], step: usize) {
        for (value, out) in src.iter().zip(dst.iter_mut().step_by(step)) {
            *out = self.to_byte(*value);
        }
    }
}

impl Default for Quantizer {
    fn default() -> Self {
        Self::new(TransferCurve::default())
    }
}
