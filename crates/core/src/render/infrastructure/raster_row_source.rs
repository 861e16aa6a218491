use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::render::domain::row_source::{ChannelMask, PixelRect, Row, RowSource};
use crate::shared::error::SourceError;
use crate::shared::raster_frame::{Channel, RasterFrame};

/// Serves rows from an in-memory [`RasterFrame`].
///
/// Rows are numbered the way the renderer numbers them: `get_row(0)` is the
/// bottom row of the frame.
///
/// The abort flag is shared so a controlling thread can cancel a frame
/// while rows are being pulled. `abort_after_rows` raises the flag itself
/// once that many rows have been served.
pub struct RasterRowSource {
    frame: RasterFrame,
    cancelled: Arc<AtomicBool>,
    abort_after_rows: Option<u32>,
    rows_served: u32,
    requested: Option<(PixelRect, ChannelMask, u32)>,
    validated: bool,
}

impl RasterRowSource {
    pub fn new(frame: RasterFrame) -> Self {
        Self {
            frame,
            cancelled: Arc::new(AtomicBool::new(false)),
            abort_after_rows: None,
            rows_served: 0,
            requested: None,
            validated: false,
        }
    }

    pub fn with_cancel_flag(mut self, cancelled: Arc<AtomicBool>) -> Self {
        self.cancelled = cancelled;
        self
    }

    pub fn with_abort_after_rows(mut self, rows: u32) -> Self {
        self.abort_after_rows = Some(rows);
        self
    }

    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancelled.clone()
    }

    pub fn rows_served(&self) -> u32 {
        self.rows_served
    }

    pub fn requested(&self) -> Option<(PixelRect, ChannelMask, u32)> {
        self.requested
    }

    pub fn is_validated(&self) -> bool {
        self.validated
    }

}

impl RowSource for RasterRowSource {
    fn width(&self) -> u32 {
        self.frame.width()
    }

    fn height(&self) -> u32 {
        self.frame.height()
    }

    fn validate(&mut self) -> Result<(), SourceError> {
        self.validated = true;
        Ok(())
    }

    fn request(&mut self, region: PixelRect, channels: ChannelMask, count: u32) {
        self.requested = Some((region, channels, count));
    }

    fn get_row(
        &mut self,
        y: u32,
        x0: u32,
        x1: u32,
        channels: ChannelMask,
    ) -> Result<Row, SourceError> {
        let (width, height) = (self.frame.width(), self.frame.height());
        if y >= height {
            return Err(SourceError::RowOutOfRange { row: y, height });
        }
        if x0 > x1 || x1 > width {
            return Err(SourceError::SpanOutOfRange { x0, x1, width });
        }

        let mut row = Row::default();
        for channel in Channel::RGB {
            if channels.contains(channel) {
                let samples = self.frame.row_channel(height - 1 - y, channel);
                *row.channel_mut(channel) = samples
                    .iter()
                    .skip(x0 as usize)
                    .take((x1 - x0) as usize)
                    .copied()
                    .collect();
            }
        }

        self.rows_served += 1;
        if let Some(limit) = self.abort_after_rows {
            if self.rows_served >= limit {
                self.cancelled.store(true, Ordering::SeqCst);
            }
        }
        Ok(row)
    }

    fn is_aborted(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
