use std::time::Duration;

use tokio::time::Instant;

use super::{next_delay, progress, snapshot, Animation};
use crate::color::lerp;
use crate::{Color, PixelSink};

/// Fades every pixel from whatever it showed at `start` toward one color.
#[derive(Debug, Clone)]
pub struct Fade {
    duration: Duration,
    target: Color,
    started: Option<Instant>,
    from: Vec<Color>,
}

impl Fade {
    pub fn new(duration: Duration, target: Color) -> Self {
        Self {
            duration,
            target,
            started: None,
            from: Vec::new(),
        }
    }
}

impl Animation for Fade {
    fn start(&mut self, sink: &mut dyn PixelSink, now: Instant) {
        self.started = Some(now);
        self.from = snapshot(sink);
    }

    fn next_step(&mut self, sink: &mut dyn PixelSink, now: Instant) -> Duration {
        let started = *self.started.get_or_insert(now);
        let elapsed = now.saturating_duration_since(started);
        let t = progress(elapsed, self.duration);
        for (index, &from) in self.from.iter().enumerate() {
            sink.set_one(index, lerp(from, self.target, t));
        }
        if elapsed >= self.duration {
            return Duration::ZERO;
        }
        next_delay(elapsed, self.duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySink;

    const A: Color = Color::rgbw(200, 10, 0, 40);
    const B: Color = Color::rgbw(0, 110, 255, 0);

    #[test]
    fn starts_at_buffer_and_ends_at_target() {
        let mut sink = MemorySink::new(4);
        sink.set_all(A);
        let t0 = Instant::now();
        let mut fade = Fade::new(Duration::from_millis(100), B);
        fade.start(&mut sink, t0);

        assert_ne!(fade.next_step(&mut sink, t0), Duration::ZERO);
        assert_eq!(sink.pixels(), &[A; 4]);

        let delay = fade.next_step(&mut sink, t0 + Duration::from_millis(50));
        assert_ne!(delay, Duration::ZERO);
        assert_eq!(sink.pixel(0), lerp(A, B, 0.5));

        let delay = fade.next_step(&mut sink, t0 + Duration::from_millis(99));
        assert_ne!(delay, Duration::ZERO);

        let delay = fade.next_step(&mut sink, t0 + Duration::from_millis(100));
        assert_eq!(delay, Duration::ZERO);
        assert_eq!(sink.pixels(), &[B; 4]);
    }

    #[test]
    fn fades_each_pixel_from_its_own_start() {
        let mut sink = MemorySink::new(2);
        sink.set_one(0, A);
        let t0 = Instant::now();
        let mut fade = Fade::new(Duration::from_millis(10), B);
        fade.start(&mut sink, t0);
        fade.next_step(&mut sink, t0 + Duration::from_millis(5));

        assert_eq!(sink.pixel(0), lerp(A, B, 0.5));
        assert_eq!(sink.pixel(1), lerp(Color::OFF, B, 0.5));
    }

    #[test]
    fn zero_duration_completes_immediately() {
        let mut sink = MemorySink::new(3);
        let t0 = Instant::now();
        let mut fade = Fade::new(Duration::ZERO, B);
        fade.start(&mut sink, t0);
        assert_eq!(fade.next_step(&mut sink, t0), Duration::ZERO);
        assert_eq!(sink.pixels(), &[B; 3]);
    }
}
