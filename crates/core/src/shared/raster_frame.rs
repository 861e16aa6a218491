use ndarray::{Array3, ArrayView1, Axis};

/// Red, green and blue samples in that order, matching the plane layout of
/// a `RasterFrame`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    pub const RGB: [Channel; 3] = [Channel::Red, Channel::Green, Channel::Blue];

    pub fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }
}

/// A width x height grid of floating-point RGB samples.
///
/// Row-major with the origin at the top-left; `1.0` is full intensity.
/// Values outside [0, 1] are allowed and clamped at quantisation time.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterFrame {
    samples: Array3<f32>,
}

impl RasterFrame {
    /// Builds a frame from interleaved `[r, g, b, r, g, b, ...]` samples.
    pub fn new(data: Vec<f32>, width: u32, height: u32) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * 3,
            "data length must equal width * height * 3"
        );
        let samples = Array3::from_shape_vec((height as usize, width as usize, 3), data)
            .unwrap_or_else(|_| Array3::zeros((height as usize, width as usize, 3)));
        Self { samples }
    }

    pub fn solid(width: u32, height: u32, rgb: [f32; 3]) -> Self {
        let samples = Array3::from_shape_fn((height as usize, width as usize, 3), |(_, _, c)| {
            rgb[c]
        });
        Self { samples }
    }

    /// Builds a frame by evaluating `f(x, y)` for every pixel.
    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> [f32; 3]) -> Self {
        let mut frame = Self::solid(width, height, [0.0; 3]);
        for ((y, x, c), value) in frame.samples.indexed_iter_mut() {
            *value = f(x as u32, y as u32)[c];
        }
        frame
    }

    pub fn width(&self) -> u32 {
        self.samples.shape()[1] as u32
    }

    pub fn height(&self) -> u32 {
        self.samples.shape()[0] as u32
    }

    /// One channel of row `y`, `width` samples long.
    pub fn row_channel(&self, y: u32, channel: Channel) -> ArrayView1<'_, f32> {
        self.samples
            .index_axis(Axis(0), y as usize)
            .index_axis_move(Axis(1), channel.index())
    }
}
