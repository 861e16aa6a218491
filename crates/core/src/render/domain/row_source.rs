use crate::shared::error::SourceError;
use crate::shared::raster_frame::Channel;

/// Set of colour channels requested from the renderer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChannelMask(u8);

impl ChannelMask {
    pub const NONE: ChannelMask = ChannelMask(0);
    pub const RED: ChannelMask = ChannelMask(1);
    pub const GREEN: ChannelMask = ChannelMask(1 << 1);
    pub const BLUE: ChannelMask = ChannelMask(1 << 2);
    pub const RGB: ChannelMask = ChannelMask(0b111);

    pub fn of(channel: Channel) -> Self {
        ChannelMask(1 << channel.index())
    }

    pub fn contains(self, channel: Channel) -> bool {
        self.0 & Self::of(channel).0 != 0
    }

    pub fn union(self, other: ChannelMask) -> Self {
        ChannelMask(self.0 | other.0)
    }
}

/// Pixel-aligned rectangle, `x1`/`y1` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl PixelRect {
    pub fn full(width: u32, height: u32) -> Self {
        Self {
            x0: 0,
            y0: 0,
            x1: width,
            y1: height,
        }
    }

    pub fn width(&self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    pub fn height(&self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }
}

/// One row span of float samples, one vector per channel. Channels not in
/// the requested mask are left empty.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Row {
    channels: [Vec<f32>; 3],
}

impl Row {
    pub fn new(red: Vec<f32>, green: Vec<f32>, blue: Vec<f32>) -> Self {
        Self {
            channels: [red, green, blue],
        }
    }

    pub fn channel(&self, channel: Channel) -> &[f32] {
        &self.channels[channel.index()]
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut Vec<f32> {
        &mut self.channels[channel.index()]
    }

    pub fn len(&self) -> usize {
        self.channels.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pull interface onto the upstream renderer.
///
/// Rows are produced on demand and `get_row` may block. Row `0` is the
/// bottom of the picture. The abort flag is polled; the writer checks it
/// between row pulls.
pub trait RowSource {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Prepares the upstream graph for the session's resolution.
    fn validate(&mut self) -> Result<(), SourceError>;

    /// Declares the region and channels about to be read, `count` times.
    fn request(&mut self, region: PixelRect, channels: ChannelMask, count: u32);

    fn get_row(
        &mut self,
        y: u32,
        x0: u32,
        x1: u32,
        channels: ChannelMask,
    ) -> Result<Row, SourceError>;

    fn is_aborted(&self) -> bool;
}
