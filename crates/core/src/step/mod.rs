//! Step interpreter: executes one timeline step against a render target.

mod effect;
mod lightning;
mod trigger;

pub use lightning::{lightning_on_color, LightningPlan};
pub use trigger::{build_request, split_header, TRIGGER_TIMEOUT};

use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::timeline::{Step, StepKind};
use crate::{Color, PixelOrder, PixelSink, StripOptions};

/// What the runner should do after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Advance to the next step.
    Continue,
    /// Restart from the first step of the same timeline.
    LoopBack,
    /// The run was canceled while this step executed.
    Canceled,
}

/// A resolved render target: strip parameters plus the sink drawn into.
pub struct StepProcessor {
    pub gpio: u32,
    pub leds: usize,
    pub pixel_order: PixelOrder,
    pub number_of_colors: usize,
    sink: Box<dyn PixelSink>,
}

impl StepProcessor {
    pub fn new(options: &StripOptions, sink: Box<dyn PixelSink>) -> Self {
        Self {
            gpio: options.gpio().unwrap_or_default(),
            leds: options.num_pixels,
            pixel_order: options.order,
            number_of_colors: options.num_colors,
            sink,
        }
    }

    pub fn sink(&self) -> &dyn PixelSink {
        &*self.sink
    }

    pub fn sink_mut(&mut self) -> &mut dyn PixelSink {
        &mut *self.sink
    }

    /// Executes one step. Returns once the step has finished, asked for a
    /// loop back, or observed cancellation.
    pub async fn process(&mut self, step: &Step, cancel: &CancellationToken) -> StepOutcome {
        match &step.kind {
            StepKind::Unknown(name) => {
                tracing::warn!(
                    step_id = %step.id,
                    step_type = %name,
                    "step has unknown type and can't be processed"
                );
                StepOutcome::Continue
            }
            StepKind::Malformed(reason) => {
                tracing::warn!(step_id = %step.id, %reason, "skipping malformed step");
                StepOutcome::Continue
            }
            StepKind::Loop => {
                tracing::debug!(step_id = %step.id, time = step.time_ms(), "processing loop");
                StepOutcome::LoopBack
            }
            StepKind::Trigger(meta) => trigger::process(step, meta, cancel).await,
            StepKind::Sleep => hold(Duration::from_millis(step.time_ms()), cancel).await,
            StepKind::RandomSleep => {
                let pause = random_sleep_duration(step.time_ms());
                tracing::debug!(step_id = %step.id, pause_ms = pause.as_millis() as u64, "random sleep");
                hold(pause, cancel).await
            }
            StepKind::Effect(kind) => effect::process(self.sink_mut(), step, kind, cancel).await,
        }
    }
}

/// Uniform in `[0, max_ms)`; a zero bound is a zero-length sleep.
pub fn random_sleep_duration(max_ms: u64) -> Duration {
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..max_ms))
}

/// Sleeps for `duration` unless canceled first. Returns `false` on cancel.
pub(crate) async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        () = cancel.cancelled() => false,
        () = tokio::time::sleep(duration) => true,
    }
}

pub(crate) async fn hold(duration: Duration, cancel: &CancellationToken) -> StepOutcome {
    if sleep_or_cancel(duration, cancel).await {
        StepOutcome::Continue
    } else {
        StepOutcome::Canceled
    }
}

/// Writes the sink, logging instead of failing.
pub(crate) fn flush(sink: &mut dyn PixelSink) {
    if let Err(err) = sink.write() {
        tracing::warn!(error = %err, "problem writing to strip");
    }
}

pub(crate) fn blank(sink: &mut dyn PixelSink) {
    sink.set_all(Color::OFF);
    flush(sink);
}
