use std::time::Duration;

use tokio::time::Instant;

use super::{next_delay, progress, snapshot, Animation};
use crate::{Color, PixelSink};

/// Default sweep time when a step gives none.
pub const DEFAULT_ZIP_DURATION: Duration = Duration::from_millis(2000);

/// A single pixel of one color that travels from the first to the last
/// pixel once. Pixels it leaves behind go back to what they showed at start.
#[derive(Debug, Clone)]
pub struct Zip {
    duration: Duration,
    color: Color,
    started: Option<Instant>,
    background: Vec<Color>,
}

impl Zip {
    /// A zero `duration` falls back to [`DEFAULT_ZIP_DURATION`].
    pub fn new(duration: Duration, color: Color) -> Self {
        let duration = if duration.is_zero() {
            DEFAULT_ZIP_DURATION
        } else {
            duration
        };
        Self {
            duration,
            color,
            started: None,
            background: Vec::new(),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    fn restore(&self, sink: &mut dyn PixelSink) {
        for (index, &color) in self.background.iter().enumerate() {
            sink.set_one(index, color);
        }
    }
}

impl Animation for Zip {
    fn start(&mut self, sink: &mut dyn PixelSink, now: Instant) {
        self.started = Some(now);
        self.background = snapshot(sink);
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn next_step(&mut self, sink: &mut dyn PixelSink, now: Instant) -> Duration {
        let started = *self.started.get_or_insert(now);
        let elapsed = now.saturating_duration_since(started);
        self.restore(sink);
        if elapsed >= self.duration {
            return Duration::ZERO;
        }

        let n = self.background.len();
        if n > 0 {
            let head = (progress(elapsed, self.duration) * n as f32) as usize;
            sink.set_one(head.min(n - 1), self.color);
        }
        next_delay(elapsed, self.duration)
    }
}
