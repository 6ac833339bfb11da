use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::PixelSink;
use crate::{Color, LedlineError, Result};

/// Shared record of every frame a [`MemorySink`] flushed.
#[derive(Debug, Default, Clone)]
pub struct FrameHistory {
    frames: Arc<Mutex<Vec<Vec<Color>>>>,
}

impl FrameHistory {
    fn lock(&self) -> MutexGuard<'_, Vec<Vec<Color>>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, frame: Vec<Color>) {
        self.lock().push(frame);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn frames(&self) -> Vec<Vec<Color>> {
        self.lock().clone()
    }

    pub fn last(&self) -> Option<Vec<Color>> {
        self.lock().last().cloned()
    }

    /// Number of flushed frames where every pixel equals `color`.
    pub fn count_uniform(&self, color: Color) -> usize {
        self.lock()
            .iter()
            .filter(|frame| frame.iter().all(|&pixel| pixel == color))
            .count()
    }
}

/// Sink that keeps its pixels in memory and records flushed frames.
#[derive(Debug)]
pub struct MemorySink {
    pixels: Vec<Color>,
    history: FrameHistory,
    fail_writes: bool,
}

impl MemorySink {
    pub fn new(num_pixels: usize) -> Self {
        Self {
            pixels: vec![Color::OFF; num_pixels],
            history: FrameHistory::default(),
            fail_writes: false,
        }
    }

    /// A sink whose every flush fails.
    #[must_use]
    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn history(&self) -> FrameHistory {
        self.history.clone()
    }

    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }
}

impl PixelSink for MemorySink {
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
        if self.fail_writes {
            return Err(LedlineError::sink("memory sink configured to fail"));
        }
        self.history.push(self.pixels.clone());
        Ok(())
    }
}
