use super::Artist;
use crate::color::lerp;
use crate::{Color, PixelSink};

/// Two-color linear gradient.
///
/// Pixel `i` of `n` uses `t = i / n`, so the last pixel stops one step short
/// of `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gradient {
    pub start: Color,
    pub end: Color,
}

impl Gradient {
    pub fn new(start: Color, end: Color) -> Self {
        Self { start, end }
    }
}

impl Artist for Gradient {
    #[allow(clippy::cast_precision_loss)]
    fn draw(&self, sink: &mut dyn PixelSink) {
        let n = sink.num_pixels();
        for i in 0..n {
            let t = i as f32 / n as f32;
            sink.set_one(i, lerp(self.start, self.end, t));
        }
    }
}

/// Repeats a list of colors along the strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sequence {
    pub colors: Vec<Color>,
}

impl Sequence {
    pub fn new(colors: Vec<Color>) -> Self {
        Self { colors }
    }
}

impl Artist for Sequence {
    fn draw(&self, sink: &mut dyn PixelSink) {
        if self.colors.is_empty() {
            return;
        }
        for i in 0..sink.num_pixels() {
            sink.set_one(i, self.colors[i % self.colors.len()]);
        }
    }
}
