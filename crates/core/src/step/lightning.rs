use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use super::{blank, flush, sleep_or_cancel, StepOutcome};
use crate::timeline::LightningMeta;
use crate::{Color, PixelSink};

/// Lightning parameters with every unset field replaced by a random pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LightningPlan {
    pub bursts: u32,
    pub spacing: Duration,
    pub length: Duration,
    pub brightness: u8,
}

/// Flash color for a burst: white channel at `brightness`, blue at half of
/// it rounded up.
pub fn lightning_on_color(brightness: u8) -> Color {
    #[allow(clippy::cast_possible_truncation)]
    let blue = ((u16::from(brightness) + 1) / 2) as u8;
    Color::rgbw(0, 0, blue, brightness)
}

impl LightningPlan {
    pub fn resolve(meta: &LightningMeta) -> Self {
        let mut rng = rand::thread_rng();
        let bursts = match meta.bursts {
            0 => rng.gen_range(0..5),
            n => n,
        };
        let spacing = match meta.burst_spacing {
            0 => rng.gen_range(0..5),
            n => n,
        };
        let length = match meta.burst_length {
            0 => rng.gen_range(0..100),
            n => n,
        };
        let brightness = match meta.burst_brightness {
            0 => rng.gen_range(0..128),
            n => n,
        };
        Self {
            bursts,
            spacing: Duration::from_millis(spacing),
            length: Duration::from_millis(length),
            brightness,
        }
    }

    pub fn on_color(&self) -> Color {
        lightning_on_color(self.brightness)
    }

    /// Uncanceled run time: spacing follows every burst, the last included.
    pub fn total(&self) -> Duration {
        (self.length + self.spacing) * self.bursts
    }

    /// Plays the bursts. Cancellation blanks the sink and skips the rest.
    pub async fn run(&self, sink: &mut dyn PixelSink, cancel: &CancellationToken) -> StepOutcome {
        let on = self.on_color();
        for _ in 0..self.bursts {
            if cancel.is_cancelled() {
                blank(sink);
                return StepOutcome::Canceled;
            }

            sink.set_all(on);
            flush(sink);
            if !sleep_or_cancel(self.length, cancel).await {
                blank(sink);
                return StepOutcome::Canceled;
            }

            blank(sink);
            if !sleep_or_cancel(self.spacing, cancel).await {
                return StepOutcome::Canceled;
            }
        }
        StepOutcome::Continue
    }
}
