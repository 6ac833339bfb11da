use std::sync::{Arc, Mutex};
use std::time::Duration;

use ledline_core::timeline::SolidMeta;
use ledline_core::{
    Color, Effect, FrameHistory, MemorySink, PixelSink, PlayRequest, Result, Scheduler,
    SchedulerHandle, SinkFactory, Step, StepKind, StripOptions, SystemConfig, Timeline,
};
use tokio_util::sync::CancellationToken;

/// Hands out memory sinks and keeps the frame history of each, keyed by pin.
#[derive(Default)]
struct Sinks {
    opened: Mutex<Vec<(u32, FrameHistory)>>,
}

impl Sinks {
    fn histories(&self) -> Vec<(u32, FrameHistory)> {
        self.opened.lock().unwrap().clone()
    }

    fn resets(&self) -> usize {
        self.histories()
            .iter()
            .filter(|(_, history)| history.frames() == vec![vec![Color::OFF; 3]])
            .count()
    }
}

impl SinkFactory for Sinks {
    fn open(&self, options: &StripOptions) -> Result<Box<dyn PixelSink>> {
        let sink = MemorySink::new(options.num_pixels);
        self.opened
            .lock()
            .unwrap()
            .push((options.gpio().unwrap_or_default(), sink.history()));
        Ok(Box::new(sink))
    }
}

fn start() -> (SchedulerHandle, Arc<Sinks>) {
    let config = SystemConfig {
        leds: 3,
        ..SystemConfig::default()
    };
    let sinks = Arc::new(Sinks::default());
    let (handle, _task) = Scheduler::spawn(Arc::new(config), sinks.clone(), CancellationToken::new());
    (handle, sinks)
}

fn solid(number: i64, color: Color, time: u64) -> Step {
    Step::effect(number, Effect::Solid(SolidMeta { color })).with_time(time)
}

fn looping(color: Color) -> Timeline {
    Timeline::new("loop", vec![solid(0, color, 10), Step::new(1, StepKind::Loop)])
}

async fn wait(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

#[tokio::test(start_paused = true)]
async fn looping_timeline_only_ends_on_stop() {
    let (handle, _) = start();
    handle
        .play(PlayRequest::with_id("forever", looping(Color::rgb(1, 2, 3))))
        .unwrap();

    wait(5_000).await;
    assert_eq!(handle.running().await.unwrap(), ["forever"]);

    handle.stop("forever").unwrap();
    wait(20).await;
    assert!(handle.running().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn stop_all_clears_registry_with_a_single_reset() {
    for count in [0, 1, 4] {
        let (handle, sinks) = start();
        for index in 0..count {
            let request = PlayRequest::with_id(format!("p{index}"), looping(Color::rgb(7, 7, 7)));
            handle.play(request).unwrap();
        }
        wait(20).await;
        assert_eq!(handle.running().await.unwrap().len(), count);

        handle.stop_all().unwrap();
        wait(20).await;
        assert!(handle.running().await.unwrap().is_empty(), "{count} plays");
        assert_eq!(sinks.histories().len(), count + 1);
        assert_eq!(sinks.resets(), 1, "{count} plays");
    }
}

#[tokio::test(start_paused = true)]
async fn stop_of_finished_process_still_resets() {
    let (handle, sinks) = start();
    let timeline = Timeline::new("once", vec![solid(0, Color::rgb(50, 0, 0), 5)]);
    handle.play(PlayRequest::with_id("once", timeline)).unwrap();
    wait(50).await;
    assert!(handle.running().await.unwrap().is_empty());

    handle.stop("once").unwrap();
    wait(20).await;
    assert_eq!(sinks.resets(), 1);
}

#[tokio::test(start_paused = true)]
async fn concurrent_timelines_are_independent() {
    let (handle, sinks) = start();
    let red = Color::rgb(255, 0, 0);
    let blue = Color::rgb(0, 0, 255);
    handle
        .play(PlayRequest::with_id("left", looping(red).with_gpio(12)))
        .unwrap();
    handle
        .play(PlayRequest::with_id(
            "right",
            Timeline::new("short", vec![solid(0, blue, 30)]).with_gpio(13),
        ))
        .unwrap();

    wait(10).await;
    assert_eq!(handle.running().await.unwrap(), ["left", "right"]);

    wait(100).await;
    assert_eq!(handle.running().await.unwrap(), ["left"]);

    handle.stop("right").unwrap();
    wait(20).await;
    assert_eq!(handle.running().await.unwrap(), ["left"]);

    let histories = sinks.histories();
    let left = &histories.iter().find(|(gpio, _)| *gpio == 12).unwrap().1;
    let right = &histories.iter().find(|(gpio, _)| *gpio == 13).unwrap().1;
    assert!(left.len() > 1);
    assert_eq!(left.count_uniform(red), left.len());
    assert_eq!(right.frames(), vec![vec![blue; 3]]);

    handle.stop("left").unwrap();
    wait(20).await;
    assert!(handle.running().await.unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn replaying_an_id_cancels_the_previous_run() {
    let (handle, sinks) = start();
    handle
        .play(PlayRequest::with_id("same", looping(Color::rgb(1, 1, 1))))
        .unwrap();
    wait(20).await;
    handle
        .play(PlayRequest::with_id("same", looping(Color::rgb(2, 2, 2))))
        .unwrap();
    wait(20).await;

    let first = sinks.histories()[0].1.len();
    wait(100).await;
    assert_eq!(sinks.histories()[0].1.len(), first);
    assert_eq!(handle.running().await.unwrap(), ["same"]);
}
