use std::time::Duration;

use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::lightning::LightningPlan;
use super::{blank, flush, hold, StepOutcome};
use crate::animation::{
    Animation, Artist, Fade, Gradient, KnightRider, Rainbow, Sequence, Zip, TICK,
};
use crate::timeline::{Effect, Step};
use crate::{PixelSink, SubStrip};

pub(super) async fn process(
    sink: &mut dyn PixelSink,
    step: &Step,
    effect: &Effect,
    cancel: &CancellationToken,
) -> StepOutcome {
    tracing::debug!(
        step_id = %step.id,
        effect = effect.name(),
        time = step.time_ms(),
        leds = ?step.leds,
        "processing effect"
    );
    match step.leds {
        Some(range) => {
            let mut window = SubStrip::new(sink, range.as_range());
            render(&mut window, step, effect, cancel).await
        }
        None => render(sink, step, effect, cancel).await,
    }
}

async fn render(
    sink: &mut dyn PixelSink,
    step: &Step,
    effect: &Effect,
    cancel: &CancellationToken,
) -> StepOutcome {
    let time = Duration::from_millis(step.time_ms());
    match effect {
        Effect::Solid(meta) => {
            sink.set_all(meta.color);
            flush(sink);
            hold(time, cancel).await
        }
        Effect::Gradient(meta) => {
            paint(sink, &Gradient::new(meta.start_color, meta.end_color), time, cancel).await
        }
        Effect::Sequence(meta) => {
            paint(sink, &Sequence::new(meta.sequence.clone()), time, cancel).await
        }
        Effect::Fade(meta) => animate(sink, Fade::new(time, meta.color), cancel).await,
        Effect::Zip(meta) => animate(sink, Zip::new(time, meta.color), cancel).await,
        Effect::Rainbow => {
            let rainbow = if time.is_zero() {
                Rainbow::default()
            } else {
                Rainbow::new(time)
            };
            animate(sink, rainbow, cancel).await
        }
        Effect::KnightRider => {
            let scanner = if time.is_zero() {
                KnightRider::default()
            } else {
                KnightRider::default().with_run_time(time)
            };
            animate(sink, scanner, cancel).await
        }
        Effect::Lightning(meta) => {
            let plan = LightningPlan::resolve(meta);
            tracing::debug!(
                step_id = %step.id,
                bursts = plan.bursts,
                burst_type = %meta.burst_type,
                length_ms = plan.length.as_millis() as u64,
                spacing_ms = plan.spacing.as_millis() as u64,
                brightness = plan.brightness,
                "lightning"
            );
            match plan.run(sink, cancel).await {
                StepOutcome::Canceled => StepOutcome::Canceled,
                _ => hold(time, cancel).await,
            }
        }
        Effect::Unknown(name) => {
            tracing::warn!(step_id = %step.id, effect = %name, "unknown effect, skipping");
            StepOutcome::Continue
        }
    }
}

/// Draws a static look once, flushes, then holds it for `time`.
async fn paint<A: Artist>(
    sink: &mut dyn PixelSink,
    artist: &A,
    time: Duration,
    cancel: &CancellationToken,
) -> StepOutcome {
    artist.draw(sink);
    flush(sink);
    hold(time, cancel).await
}

/// Drives a time-based effect on a fixed tick until it reports completion.
/// Cancellation blanks the sink.
async fn animate<A: Animation>(
    sink: &mut dyn PixelSink,
    mut animation: A,
    cancel: &CancellationToken,
) -> StepOutcome {
    let mut ticker = tokio::time::interval(TICK);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    animation.start(sink, Instant::now());

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                blank(sink);
                return StepOutcome::Canceled;
            }
            _ = ticker.tick() => {}
        }

        let delay = animation.next_step(sink, Instant::now());
        flush(sink);
        if delay.is_zero() {
            return StepOutcome::Continue;
        }
    }
}
