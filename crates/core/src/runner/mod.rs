//! Timeline runner: walks one timeline's steps in order on one target.

use tokio_util::sync::CancellationToken;

use crate::step::{StepOutcome, StepProcessor};
use crate::timeline::Timeline;

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Fell off the end of the step list.
    Completed,
    Canceled,
}

pub struct TimelineRunner {
    process_id: String,
    timeline: Timeline,
    processor: StepProcessor,
}

impl TimelineRunner {
    pub fn new(process_id: impl Into<String>, timeline: Timeline, processor: StepProcessor) -> Self {
        Self {
            process_id: process_id.into(),
            timeline,
            processor,
        }
    }

    pub fn processor(&self) -> &StepProcessor {
        &self.processor
    }

    /// Runs until the steps are exhausted or `cancel` fires. A `Loop` step
    /// restarts from the first step, so a timeline containing one only ends
    /// on cancellation.
    pub async fn run(&mut self, cancel: &CancellationToken) -> RunOutcome {
        tracing::debug!(
            process_id = %self.process_id,
            timeline_id = %self.timeline.id,
            gpio = self.processor.gpio,
            leds = self.processor.leds,
            steps = self.timeline.steps.len(),
            "running timeline"
        );

        let steps = &self.timeline.steps;
        let mut index = 0;
        while let Some(step) = steps.get(index) {
            if cancel.is_cancelled() {
                return self.canceled();
            }
            match self.processor.process(step, cancel).await {
                StepOutcome::Continue => index += 1,
                StepOutcome::LoopBack => {
                    index = 0;
                    tokio::task::yield_now().await;
                }
                StepOutcome::Canceled => return self.canceled(),
            }
        }

        tracing::debug!(process_id = %self.process_id, "timeline completed");
        RunOutcome::Completed
    }

    fn canceled(&self) -> RunOutcome {
        tracing::debug!(process_id = %self.process_id, "timeline canceled");
        RunOutcome::Canceled
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::timeline::{Effect, SolidMeta, Step, StepKind};
    use crate::{Color, MemorySink, PixelSink, StripOptions};

    const GREEN: Color = Color::rgb(0, 255, 0);

    fn runner(steps: Vec<Step>, sink: MemorySink) -> TimelineRunner {
        let options = StripOptions {
            num_pixels: sink.num_pixels(),
            ..StripOptions::default()
        };
        let processor = StepProcessor::new(&options, Box::new(sink));
        TimelineRunner::new("test", Timeline::new("t", steps), processor)
    }

    fn solid(number: i64, color: Color, time: u64) -> Step {
        Step::effect(number, Effect::Solid(SolidMeta { color })).with_time(time)
    }

    #[tokio::test(start_paused = true)]
    async fn runs_steps_in_order_and_completes() {
        let sink = MemorySink::new(2);
        let history = sink.history();
        let steps = vec![
            solid(2, Color::OFF, 5),
            Step::new(1, StepKind::Sleep).with_time(5),
            solid(0, GREEN, 5),
        ];
        let mut runner = runner(steps, sink);

        let outcome = runner.run(&CancellationToken::new()).await;
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(
            history.frames(),
            vec![vec![GREEN; 2], vec![Color::OFF; 2]]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn loop_runs_until_canceled() {
        let sink = MemorySink::new(1);
        let history = sink.history();
        let steps = vec![solid(0, Color::OFF, 10), Step::new(1, StepKind::Loop)];
        let mut runner = runner(steps, sink);
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(105)).await;
            canceller.cancel();
        });

        assert_eq!(runner.run(&cancel).await, RunOutcome::Canceled);
        assert!(history.len() >= 10);
    }

    #[tokio::test]
    async fn already_canceled_runs_nothing() {
        let sink = MemorySink::new(1);
        let history = sink.history();
        let mut runner = runner(vec![solid(0, GREEN, 0)], sink);
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert_eq!(runner.run(&cancel).await, RunOutcome::Canceled);
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn empty_timeline_completes() {
        let mut runner = runner(Vec::new(), MemorySink::new(1));
        assert_eq!(runner.run(&CancellationToken::new()).await, RunOutcome::Completed);
    }
}
