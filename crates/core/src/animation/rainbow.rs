use std::time::Duration;

use smart_leds::hsv::{hsv2rgb, Hsv};
use tokio::time::Instant;

use super::{next_delay, progress, Animation};
use crate::{Color, PixelSink};

pub const DEFAULT_RAINBOW_PERIOD: Duration = Duration::from_secs(20);

/// Full hue wheel spread along the strip, rotated once over `period`.
#[derive(Debug, Clone)]
pub struct Rainbow {
    period: Duration,
    started: Option<Instant>,
}

impl Rainbow {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            started: None,
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn draw(sink: &mut dyn PixelSink, rotation: f32) {
        let n = sink.num_pixels();
        let base = (rotation * 256.0) as usize;
        for i in 0..n {
            let hue = ((base + i * 256 / n) % 256) as u8;
            let rgb = hsv2rgb(Hsv {
                hue,
                sat: 255,
                val: 255,
            });
            sink.set_one(i, Color::from(rgb));
        }
    }
}

impl Default for Rainbow {
    fn default() -> Self {
        Self::new(DEFAULT_RAINBOW_PERIOD)
    }
}

impl Animation for Rainbow {
    fn start(&mut self, _sink: &mut dyn PixelSink, now: Instant) {
        self.started = Some(now);
    }

    fn next_step(&mut self, sink: &mut dyn PixelSink, now: Instant) -> Duration {
        let started = *self.started.get_or_insert(now);
        let elapsed = now.saturating_duration_since(started);
        Self::draw(sink, progress(elapsed, self.period));
        if elapsed >= self.period {
            return Duration::ZERO;
        }
        next_delay(elapsed, self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySink;

    #[test]
    fn spreads_hues_and_rotates() {
        let mut sink = MemorySink::new(4);
        let t0 = Instant::now();
        let mut rainbow = Rainbow::new(Duration::from_millis(400));
        rainbow.start(&mut sink, t0);

        rainbow.next_step(&mut sink, t0);
        let first = sink.pixels().to_vec();
        assert_eq!(first[0], Color::from(hsv2rgb(Hsv { hue: 0, sat: 255, val: 255 })));
        assert_ne!(first[0], first[2]);

        // A quarter turn moves each hue one pixel along.
        rainbow.next_step(&mut sink, t0 + Duration::from_millis(100));
        assert_eq!(sink.pixel(0), first[1]);
        assert_eq!(sink.pixel(3), first[0]);
    }

    #[test]
    fn completes_after_one_period() {
        let mut sink = MemorySink::new(3);
        let t0 = Instant::now();
        let mut rainbow = Rainbow::new(Duration::from_millis(50));
        rainbow.start(&mut sink, t0);
        assert_ne!(rainbow.next_step(&mut sink, t0 + Duration::from_millis(49)), Duration::ZERO);
        assert_eq!(rainbow.next_step(&mut sink, t0 + Duration::from_millis(50)), Duration::ZERO);
    }
}
