//! Pixel sinks: the buffer the engine draws into and flushes to hardware.
//!
//! The engine only ever talks to [`PixelSink`]. Whatever pushes the buffer
//! onto a physical strip sits behind a [`StripDriver`] owned by a
//! [`PixArray`], or behind any other sink a [`SinkFactory`] hands out.

mod array;
mod memory;
mod window;

pub use array::{FrameLayout, LogDriver, PixArray, SmartLedsDriver, StripDriver};
pub use memory::{FrameHistory, MemorySink};
pub use window::SubStrip;

use crate::{Color, Result, StripOptions};

/// An addressable buffer of pixels with an explicit flush.
pub trait PixelSink: Send {
    fn num_pixels(&self) -> usize;

    fn set_all(&mut self, color: Color);

    /// Sets one pixel. Indices outside the buffer are ignored.
    fn set_one(&mut self, index: usize, color: Color);

    /// Reads back the buffered value of one pixel (not what the hardware
    /// shows). Out of range reads return [`Color::OFF`].
    fn pixel(&self, index: usize) -> Color;

    /// Pushes the buffer to the output.
    fn write(&mut self) -> Result<()>;
}

/// Opens a sink for a resolved strip.
pub trait SinkFactory: Send + Sync {
    fn open(&self, options: &StripOptions) -> Result<Box<dyn PixelSink>>;
}

impl<F> SinkFactory for F
where
    F: Fn(&StripOptions) -> Result<Box<dyn PixelSink>> + Send + Sync,
{
    fn open(&self, options: &StripOptions) -> Result<Box<dyn PixelSink>> {
        self(options)
    }
}

/// Factory for strips that log their frames instead of driving hardware.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSinkFactory;

impl SinkFactory for LogSinkFactory {
    fn open(&self, options: &StripOptions) -> Result<Box<dyn PixelSink>> {
        let driver = LogDriver::new(options.gpio().unwrap_or_default());
        Ok(Box::new(PixArray::new(options, driver)?))
    }
}
