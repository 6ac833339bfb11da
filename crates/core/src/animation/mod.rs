//! Animation primitives.
//!
//! Static looks implement [`Artist`] and draw once. Time-driven effects
//! implement [`Animation`]: the caller invokes [`Animation::start`] once and
//! then [`Animation::next_step`] on every tick until it returns
//! [`Duration::ZERO`], which marks the animation as complete.

mod artist;
mod fade;
mod knight_rider;
mod rainbow;
mod zip;

pub use artist::{Gradient, Sequence};
pub use fade::Fade;
pub use knight_rider::KnightRider;
pub use rainbow::Rainbow;
pub use zip::Zip;

use std::time::Duration;

use tokio::time::Instant;

use crate::PixelSink;

/// Interval between animation ticks.
pub const TICK: Duration = Duration::from_millis(1);

/// A one-shot, static fill.
pub trait Artist {
    fn draw(&self, sink: &mut dyn PixelSink);
}

/// A time-driven effect.
pub trait Animation: Send {
    /// Resets the internal clock to `now`. May capture or blank the sink.
    fn start(&mut self, sink: &mut dyn PixelSink, now: Instant);

    /// Renders the frame for `now` into the sink and returns the delay until
    /// the next call; zero means the animation is done.
    fn next_step(&mut self, sink: &mut dyn PixelSink, now: Instant) -> Duration;
}

/// Fraction of `total` covered by `elapsed`, capped at 1.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
pub(crate) fn progress(elapsed: Duration, total: Duration) -> f32 {
    if total.is_zero() {
        return 1.0;
    }
    let ratio = elapsed.as_nanos() as f64 / total.as_nanos() as f64;
    ratio.min(1.0) as f32
}

/// Delay to return while `elapsed < total`: one tick, or what remains.
pub(crate) fn next_delay(elapsed: Duration, total: Duration) -> Duration {
    total.saturating_sub(elapsed).min(TICK)
}

pub(crate) fn snapshot(sink: &dyn PixelSink) -> Vec<crate::Color> {
    (0..sink.num_pixels()).map(|index| sink.pixel(index)).collect()
}
