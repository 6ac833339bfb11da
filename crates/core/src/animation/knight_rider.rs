use std::time::Duration;

use tokio::time::Instant;

use super::{next_delay, progress, Animation, TICK};
use crate::{Color, PixelSink};

pub const DEFAULT_PULSE_TIME: Duration = Duration::from_secs(1);
pub const DEFAULT_PULSE_LEN: usize = 5;

/// A red scanner bar that sweeps end to end once per pulse, turning around
/// at every pulse boundary. Intensity peaks in the middle of the bar.
#[derive(Debug, Clone)]
pub struct KnightRider {
    pulse_time: Duration,
    pulse_len: usize,
    run_for: Option<Duration>,
    started: Option<Instant>,
}

impl KnightRider {
    pub fn new(pulse_time: Duration, pulse_len: usize) -> Self {
        Self {
            pulse_time,
            pulse_len: pulse_len.max(1),
            run_for: None,
            started: None,
        }
    }

    /// Stops after `run_for`; without it the scanner runs until canceled.
    #[must_use]
    pub fn with_run_time(mut self, run_for: Duration) -> Self {
        self.run_for = Some(run_for);
        self
    }

    #[allow(clippy::cast_precision_loss)]
    fn intensity(&self, offset: usize) -> u8 {
        let center = (self.pulse_len - 1) as f32 / 2.0;
        let falloff = 1.0 - (offset as f32 - center).abs() / (center + 1.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let value = (falloff * 255.0) as u8;
        value
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    fn draw(&self, sink: &mut dyn PixelSink, elapsed: Duration) {
        let n = sink.num_pixels();
        sink.set_all(Color::OFF);
        if n == 0 || self.pulse_time.is_zero() {
            return;
        }

        let pulse = elapsed.as_nanos() / self.pulse_time.as_nanos();
        let within = Duration::from_nanos(
            (elapsed.as_nanos() % self.pulse_time.as_nanos()) as u64,
        );
        let travelled = (progress(within, self.pulse_time) * (n - 1) as f32) as isize;
        let last = (n - 1) as isize;
        let (head, step) = if pulse % 2 == 0 {
            (travelled, -1)
        } else {
            (last - travelled, 1)
        };

        for offset in 0..self.pulse_len {
            let index = head + step * offset as isize;
            if !(0..=last).contains(&index) {
                continue;
            }
            sink.set_one(index as usize, Color::rgb(self.intensity(offset), 0, 0));
        }
    }
}

impl Default for KnightRider {
    fn default() -> Self {
        Self::new(DEFAULT_PULSE_TIME, DEFAULT_PULSE_LEN)
    }
}

impl Animation for KnightRider {
    fn start(&mut self, sink: &mut dyn PixelSink, now: Instant) {
        self.started = Some(now);
        sink.set_all(Color::OFF);
    }

    fn next_step(&mut self, sink: &mut dyn PixelSink, now: Instant) -> Duration {
        let started = *self.started.get_or_insert(now);
        let elapsed = now.saturating_duration_since(started);
        match self.run_for {
            Some(run_for) if elapsed >= run_for => {
                sink.set_all(Color::OFF);
                Duration::ZERO
            }
            Some(run_for) => {
                self.draw(sink, elapsed);
                next_delay(elapsed, run_for)
            }
            None => {
                self.draw(sink, elapsed);
                TICK
            }
        }
    }
}
