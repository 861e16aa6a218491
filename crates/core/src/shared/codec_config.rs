use serde::{Deserialize, Serialize};

use super::constants::{
    DEFAULT_BITRATE, DEFAULT_BITRATE_TOLERANCE, DEFAULT_FRAME_RATE, MAX_BITRATE,
    MAX_BITRATE_TOLERANCE, MAX_FRAME_RATE, TIME_BASE_SCALE,
};
use super::error::ConfigurationError;
use super::rational::Rational;

/// ProRes 4:2:2 quality preset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProresProfile {
    Proxy,
    Lt,
    #[default]
    Standard,
    Hq,
}

impl ProresProfile {
    pub const ALL: &[ProresProfile] = &[
        ProresProfile::Proxy,
        ProresProfile::Lt,
        ProresProfile::Standard,
        ProresProfile::Hq,
    ];

    /// Value accepted by the encoder's `profile` option.
    pub fn option_value(self) -> &'static str {
        match self {
            ProresProfile::Proxy => "proxy",
            ProresProfile::Lt => "lt",
            ProresProfile::Standard => "standard",
            ProresProfile::Hq => "hq",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.option_value().eq_ignore_ascii_case(name))
    }
}

impl std::fmt::Display for ProresProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProresProfile::Proxy => write!(f, "Proxy"),
            ProresProfile::Lt => write!(f, "LT"),
            ProresProfile::Standard => write!(f, "Standard"),
            ProresProfile::Hq => write!(f, "HQ"),
        }
    }
}

/// Macroblock decision mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MbDecision {
    #[default]
    Simple,
    Bits,
    RateDistortion,
}

impl MbDecision {
    pub const ALL: &[MbDecision] = &[
        MbDecision::Simple,
        MbDecision::Bits,
        MbDecision::RateDistortion,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "simple" => Some(MbDecision::Simple),
            "bits" => Some(MbDecision::Bits),
            "rd" | "rate_distortion" | "rate-distortion" => Some(MbDecision::RateDistortion),
            _ => None,
        }
    }
}

impl std::fmt::Display for MbDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MbDecision::Simple => write!(f, "simple"),
            MbDecision::Bits => write!(f, "bits"),
            MbDecision::RateDistortion => write!(f, "rate_distortion"),
        }
    }
}

/// Encoder parameters supplied once before the first frame. Read-only after
/// the session opens.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfiguration {
    pub profile: ProresProfile,
    pub frame_rate: f32,
    pub bitrate: u64,
    pub bitrate_tolerance: u64,
    pub mb_decision: MbDecision,
}

impl Default for CodecConfiguration {
    fn default() -> Self {
        Self {
            profile: ProresProfile::default(),
            frame_rate: DEFAULT_FRAME_RATE,
            bitrate: DEFAULT_BITRATE,
            bitrate_tolerance: DEFAULT_BITRATE_TOLERANCE,
            mb_decision: MbDecision::default(),
        }
    }
}

impl CodecConfiguration {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let in_range = self.frame_rate > 0.0 && self.frame_rate <= MAX_FRAME_RATE;
        // Rates that round to a zero time-base denominator are unusable.
        if !in_range || self.time_base_den() <= 0 {
            return Err(ConfigurationError::FrameRateOutOfRange {
                value: self.frame_rate,
                max: MAX_FRAME_RATE,
            });
        }
        if self.bitrate > MAX_BITRATE {
            return Err(ConfigurationError::BitrateOutOfRange {
                value: self.bitrate,
                max: MAX_BITRATE,
            });
        }
        if self.bitrate_tolerance > MAX_BITRATE_TOLERANCE {
            return Err(ConfigurationError::BitrateToleranceOutOfRange {
                value: self.bitrate_tolerance,
                max: MAX_BITRATE_TOLERANCE,
            });
        }
        Ok(())
    }

    /// `1000 / (fps * 1000)`: one tick per frame, exact for rates with up
    /// to three decimals.
    pub fn time_base(&self) -> Rational {
        Rational::new(TIME_BASE_SCALE, self.time_base_den())
    }

    fn time_base_den(&self) -> i32 {
        (self.frame_rate * TIME_BASE_SCALE as f32).round() as i32
    }

    pub fn with_profile(mut self, profile: ProresProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: f32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn with_bitrate(mut self, bitrate: u64) -> Self {
        self.bitrate = bitrate;
        self
    }

    pub fn with_bitrate_tolerance(mut self, tolerance: u64) -> Self {
        self.bitrate_tolerance = tolerance;
        self
    }

    pub fn with_mb_decision(mut self, mode: MbDecision) -> Self {
        self.mb_decision = mode;
        self
    }
}
