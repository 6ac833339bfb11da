use std::ops::RangeInclusive;

use super::PixelSink;
use crate::{Color, Result};

/// A contiguous window over another sink. Index 0 of the window maps to
/// `start` of the parent; flushing flushes the whole parent.
pub struct SubStrip<'a> {
    inner: &'a mut dyn PixelSink,
    start: usize,
    len: usize,
}

impl<'a> SubStrip<'a> {
    /// Clamps `range` to the parent strip. A range that starts past the end
    /// produces an empty window.
    pub fn new(inner: &'a mut dyn PixelSink, range: RangeInclusive<usize>) -> Self {
        let total = inner.num_pixels();
        let start = (*range.start()).min(total);
        let end = (*range.end()).min(total.saturating_sub(1));
        let len = if start < total && end >= start {
            end - start + 1
        } else {
            0
        };
        Self { inner, start, len }
    }
}

impl PixelSink for SubStrip<'_> {
    fn num_pixels(&self) -> usize {
        self.len
    }

    fn set_all(&mut self, color: Color) {
        for index in self.start..self.start + self.len {
            self.inner.set_one(index, color);
        }
    }

    fn set_one(&mut self, index: usize, color: Color) {
        if index < self.len {
            self.inner.set_one(self.start + index, color);
        }
    }

    fn pixel(&self, index: usize) -> Color {
        if index < self.len {
            self.inner.pixel(self.start + index)
        } else {
            Color::OFF
        }
    }

    fn write(&mut self) -> Result<()> {
        self.inner.write()
    }
}
