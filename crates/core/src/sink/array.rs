use std::fmt::{Debug, Write as _};

use smart_leds::SmartLedsWrite;

use super::PixelSink;
use crate::color::{gamma_correct, scale};
use crate::{Color, LedlineError, PixelOrder, Result, StripOptions};

/// How a frame is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLayout {
    pub order: PixelOrder,
    pub channels: usize,
}

/// The low-level primitive that pushes a finished frame to an output.
pub trait StripDriver: Send {
    fn show(&mut self, frame: &[Color], layout: FrameLayout) -> Result<()>;
}

/// In-memory pixel buffer flushed through a [`StripDriver`].
///
/// With a non-zero brightness every pixel is scaled and gamma corrected on
/// its way out; the buffer itself keeps the requested colors.
#[derive(Debug)]
pub struct PixArray<D> {
    pixels: Vec<Color>,
    layout: FrameLayout,
    brightness: f32,
    driver: D,
}

impl<D: StripDriver> PixArray<D> {
    pub fn new(options: &StripOptions, driver: D) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            pixels: vec![Color::OFF; options.num_pixels],
            layout: FrameLayout {
                order: options.order,
                channels: options.num_colors,
            },
            brightness: options.brightness,
            driver,
        })
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    fn output_frame(&self) -> Vec<Color> {
        if self.brightness == 0.0 {
            return self.pixels.clone();
        }
        self.pixels
            .iter()
            .map(|&pixel| gamma_correct(scale(pixel, self.brightness)))
            .collect()
    }
}

impl<D: StripDriver> PixelSink for PixArray<D> {
    fn num_pixels(&self) -> usize {
        self.pixels.len()
    }

    fn set_all(&mut self, color: Color) {
        self.pixels.fill(color);
    }

    fn set_one(&mut self, index: usize, color: Color) {
        if let Some(pixel) = self.pixels.get_mut(index) {
            *pixel = color;
        }
    }

    fn pixel(&self, index: usize) -> Color {
        self.pixels.get(index).copied().unwrap_or_default()
    }

    fn write(&mut self) -> Result<()> {
        let frame = self.output_frame();
        self.driver.show(&frame, self.layout)
    }
}

/// Adapter for any `smart-leds` writer whose color type converts from
/// [`Color`] (`RGB8` for three-channel strips, `RGBW<u8>` for four).
///
/// Wire order is the writer's business, so the frame layout is not applied.
#[derive(Debug)]
pub struct SmartLedsDriver<W> {
    writer: W,
}

impl<W> SmartLedsDriver<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W> StripDriver for SmartLedsDriver<W>
where
    W: SmartLedsWrite + Send,
    W::Color: From<Color>,
    W::Error: Debug,
{
    fn show(&mut self, frame: &[Color], _layout: FrameLayout) -> Result<()> {
        self.writer
            .write(frame.iter().copied())
            .map_err(|err| LedlineError::sink(format!("{err:?}")))
    }
}

/// Driver that encodes frames in wire order and emits them as trace events.
#[derive(Debug, Default)]
pub struct LogDriver {
    gpio: u32,
    frames: u64,
}

impl LogDriver {
    pub fn new(gpio: u32) -> Self {
        Self { gpio, frames: 0 }
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames
    }
}

impl StripDriver for LogDriver {
    fn show(&mut self, frame: &[Color], layout: FrameLayout) -> Result<()> {
        self.frames += 1;
        if tracing::enabled!(tracing::Level::TRACE) {
            let mut hex = String::with_capacity(frame.len() * layout.channels * 2);
            for &pixel in frame {
                for byte in layout.order.encode(pixel, layout.channels) {
                    let _ = write!(hex, "{byte:02x}");
                }
            }
            tracing::trace!(gpio = self.gpio, frame = self.frames, %hex, "strip frame");
        }
        Ok(())
    }
}
