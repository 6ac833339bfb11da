//! Scheduler control loop.
//!
//! A single task owns the process registry and serialises every play, stop
//! and stop-all request. Each play runs on its own task bound to a child of
//! the scheduler's shutdown token; runners report back over the same command
//! channel when they end, so the registry is never shared.
//!
//! The control loop never blocks. Reading the system config and opening a
//! strip happen on the blocking pool, and the result comes back as a
//! command. Until then the play is pending: it is not listed as running,
//! but a stop or a newer play under the same id supersedes it.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::runner::{RunOutcome, TimelineRunner};
use crate::step::StepProcessor;
use crate::timeline::Timeline;
use crate::{ConfigProvider, LedlineError, Result, SinkFactory, StripOptions};

/// Caller-chosen key for a play request.
pub type ProcessId = String;

/// Prefix of the reset play spawned by a stop.
pub const STOPPING_PREFIX: &str = "Stopping_";

/// Process id of the reset play spawned by a stop-all.
pub const STOPPING_ALL: &str = "Stopping_all";

#[derive(Debug, Clone)]
pub struct PlayRequest {
    pub process_id: ProcessId,
    pub timeline: Timeline,
}

impl PlayRequest {
    /// A request under a freshly generated process id.
    pub fn new(timeline: Timeline) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), timeline)
    }

    pub fn with_id(process_id: impl Into<ProcessId>, timeline: Timeline) -> Self {
        Self {
            process_id: process_id.into(),
            timeline,
        }
    }
}

enum Command {
    Play(PlayRequest),
    Stop(ProcessId),
    StopAll,
    Running(oneshot::Sender<Vec<ProcessId>>),
    Resolved {
        process_id: ProcessId,
        generation: u64,
        timeline: Timeline,
        processor: Result<StepProcessor>,
    },
    Finished { process_id: ProcessId, generation: u64 },
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Play(request) => f.debug_tuple("Play").field(&request.process_id).finish(),
            Self::Stop(process_id) => f.debug_tuple("Stop").field(process_id).finish(),
            Self::StopAll => f.write_str("StopAll"),
            Self::Running(_) => f.write_str("Running"),
            Self::Resolved {
                process_id,
                generation,
                processor,
                ..
            } => f
                .debug_struct("Resolved")
                .field("process_id", process_id)
                .field("generation", generation)
                .field("ok", &processor.is_ok())
                .finish(),
            Self::Finished { process_id, generation } => f
                .debug_struct("Finished")
                .field("process_id", process_id)
                .field("generation", generation)
                .finish(),
        }
    }
}

struct RegistryEntry {
    cancel: CancellationToken,
    generation: u64,
}

/// Cloneable front end of a running [`Scheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: UnboundedSender<Command>,
}

impl SchedulerHandle {
    /// Starts a timeline. A play whose strip cannot be resolved is logged by
    /// the scheduler and dropped.
    pub fn play(&self, request: PlayRequest) -> Result<()> {
        self.send(Command::Play(request))
    }

    /// Cancels `process_id` if it is running, then forces the default strip
    /// dark either way.
    pub fn stop(&self, process_id: impl Into<ProcessId>) -> Result<()> {
        self.send(Command::Stop(process_id.into()))
    }

    pub fn stop_all(&self) -> Result<()> {
        self.send(Command::StopAll)
    }

    /// Registered process ids, sorted. Plays whose strip is still being
    /// opened are not listed yet.
    pub async fn running(&self) -> Result<Vec<ProcessId>> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Running(reply))?;
        rx.await.map_err(|_| LedlineError::SchedulerClosed)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx.send(command).map_err(|_| LedlineError::SchedulerClosed)
    }
}

pub struct Scheduler {
    config: Arc<dyn ConfigProvider>,
    sinks: Arc<dyn SinkFactory>,
    shutdown: CancellationToken,
    registry: HashMap<ProcessId, RegistryEntry>,
    pending: HashMap<ProcessId, RegistryEntry>,
    generation: u64,
    tx: UnboundedSender<Command>,
    rx: UnboundedReceiver<Command>,
}

impl Scheduler {
    /// Spawns the control loop. It runs until `shutdown` is canceled, which
    /// also cancels every timeline it started.
    pub fn spawn(
        config: Arc<dyn ConfigProvider>,
        sinks: Arc<dyn SinkFactory>,
        shutdown: CancellationToken,
    ) -> (SchedulerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            config,
            sinks,
            shutdown,
            registry: HashMap::new(),
            pending: HashMap::new(),
            generation: 0,
            tx: tx.clone(),
            rx,
        };
        let task = tokio::spawn(scheduler.run());
        (SchedulerHandle { tx }, task)
    }

    async fn run(mut self) {
        tracing::info!("scheduler started");
        loop {
            let command = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => break,
                command = self.rx.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };
            tracing::trace!(?command, "scheduler command");
            self.handle(command);
        }

        for entry in self.registry.values().chain(self.pending.values()) {
            entry.cancel.cancel();
        }
        tracing::info!(
            abandoned = self.registry.len(),
            pending = self.pending.len(),
            "scheduler stopped"
        );
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Play(request) => self.play(request),
            Command::Stop(process_id) => self.stop(&process_id),
            Command::StopAll => self.stop_all(),
            Command::Running(reply) => {
                let mut ids: Vec<_> = self.registry.keys().cloned().collect();
                ids.sort();
                let _ = reply.send(ids);
            }
            Command::Resolved {
                process_id,
                generation,
                timeline,
                processor,
            } => self.resolved(process_id, generation, timeline, processor),
            Command::Finished {
                process_id,
                generation,
            } => self.finished(&process_id, generation),
        }
    }

    /// Marks the play pending and resolves its strip on the blocking pool.
    fn play(&mut self, request: PlayRequest) {
        let PlayRequest {
            process_id,
            timeline,
        } = request;

        self.generation += 1;
        let generation = self.generation;
        let entry = RegistryEntry {
            cancel: self.shutdown.child_token(),
            generation,
        };
        if let Some(previous) = self.pending.insert(process_id.clone(), entry) {
            tracing::debug!(%process_id, "superseding a play that was still resolving");
            previous.cancel.cancel();
        }

        let config = Arc::clone(&self.config);
        let sinks = Arc::clone(&self.sinks);
        let tx = self.tx.clone();
        let gpio = timeline.gpio;
        tokio::spawn(async move {
            let processor = tokio::task::spawn_blocking(move || resolve(&*config, &*sinks, gpio))
                .await
                .unwrap_or_else(|err| {
                    Err(LedlineError::msg(format!("strip resolution failed: {err}")))
                });
            let _ = tx.send(Command::Resolved {
                process_id,
                generation,
                timeline,
                processor,
            });
        });
    }

    /// Registers and starts a play once its strip is open, unless a stop or a
    /// newer play for the same id got there first.
    fn resolved(
        &mut self,
        process_id: ProcessId,
        generation: u64,
        timeline: Timeline,
        processor: Result<StepProcessor>,
    ) {
        let entry = match self.pending.remove(&process_id) {
            Some(entry) if entry.generation == generation => entry,
            Some(newer) => {
                self.pending.insert(process_id.clone(), newer);
                tracing::debug!(%process_id, generation, "discarding superseded play");
                return;
            }
            None => {
                tracing::debug!(%process_id, generation, "discarding stopped play");
                return;
            }
        };

        let processor = match processor {
            Ok(processor) => processor,
            Err(err) => {
                tracing::error!(%process_id, error = %err, "cannot resolve strip for timeline");
                return;
            }
        };

        let cancel = entry.cancel.clone();
        if let Some(previous) = self.registry.insert(process_id.clone(), entry) {
            tracing::warn!(%process_id, "process id reused, canceling previous run");
            previous.cancel.cancel();
        }

        tracing::info!(
            %process_id,
            timeline_id = %timeline.id,
            gpio = processor.gpio,
            leds = processor.leds,
            "playing timeline"
        );

        let tx = self.tx.clone();
        let mut runner = TimelineRunner::new(process_id.clone(), timeline, processor);
        tokio::spawn(async move {
            let outcome = runner.run(&cancel).await;
            if outcome == RunOutcome::Completed {
                tracing::info!(%process_id, "timeline finished");
            }
            let _ = tx.send(Command::Finished {
                process_id,
                generation,
            });
        });
    }

    fn stop(&mut self, process_id: &str) {
        if let Some(entry) = self.pending.remove(process_id) {
            entry.cancel.cancel();
            tracing::debug!(%process_id, "dropped play that was still resolving");
        }
        match self.registry.remove(process_id) {
            Some(entry) => {
                entry.cancel.cancel();
                tracing::info!(%process_id, "stopped timeline");
            }
            None => tracing::debug!(%process_id, "stop requested for unknown process"),
        }
        self.play(PlayRequest::with_id(
            format!("{STOPPING_PREFIX}{process_id}"),
            Timeline::stop_sequence(),
        ));
    }

    fn stop_all(&mut self) {
        let stopped = self.registry.len();
        for (_, entry) in self.registry.drain().chain(self.pending.drain()) {
            entry.cancel.cancel();
        }
        tracing::info!(stopped, "stopped all timelines");
        self.play(PlayRequest::with_id(STOPPING_ALL, Timeline::stop_sequence()));
    }

    fn finished(&mut self, process_id: &str, generation: u64) {
        let current = self
            .registry
            .get(process_id)
            .is_some_and(|entry| entry.generation == generation);
        if current {
            self.registry.remove(process_id);
            tracing::debug!(%process_id, "deregistered");
        }
    }
}

/// Reads the system defaults, applies the timeline's pin override and opens
/// a sink for the result. Both steps may block.
fn resolve(
    config: &dyn ConfigProvider,
    sinks: &dyn SinkFactory,
    gpio: Option<u32>,
) -> Result<StepProcessor> {
    let system = config.system_config()?;
    let options = StripOptions::from_system(&system, gpio.unwrap_or(system.gpio));
    options.validate()?;
    let sink = sinks.open(&options)?;
    Ok(StepProcessor::new(&options, sink))
}

#[cfg(test)]
mod tests {
    use std::sync::{mpsc as mpsc_std, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::timeline::{Effect, SolidMeta, Step, StepKind};
    use crate::{Color, FrameHistory, MemorySink, PixelSink, SystemConfig};

    #[derive(Default)]
    struct Recording {
        opened: Mutex<Vec<(u32, FrameHistory)>>,
    }

    impl SinkFactory for Recording {
        fn open(&self, options: &StripOptions) -> Result<Box<dyn PixelSink>> {
            let sink = MemorySink::new(options.num_pixels);
            let gpio = options.gpio().unwrap_or_default();
            self.opened.lock().unwrap().push((gpio, sink.history()));
            Ok(Box::new(sink))
        }
    }

    fn start() -> (SchedulerHandle, Arc<Recording>, CancellationToken) {
        let config = SystemConfig {
            leds: 4,
            ..SystemConfig::default()
        };
        let sinks = Arc::new(Recording::default());
        let shutdown = CancellationToken::new();
        let (handle, _task) = Scheduler::spawn(Arc::new(config), sinks.clone(), shutdown.clone());
        (handle, sinks, shutdown)
    }

    fn looping() -> Timeline {
        let solid = Step::effect(0, Effect::Solid(SolidMeta { color: Color::rgb(9, 9, 9) }))
            .with_time(10);
        Timeline::new("loop", vec![solid, Step::new(1, StepKind::Loop)])
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn play_registers_until_complete() {
        let (handle, _, _shutdown) = start();
        let timeline = Timeline::new("short", vec![Step::new(0, StepKind::Sleep).with_time(50)]);
        handle.play(PlayRequest::with_id("a", timeline)).unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(handle.running().await.unwrap(), ["a"]);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(handle.running().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_and_blanks() {
        let (handle, sinks, _shutdown) = start();
        handle.play(PlayRequest::with_id("a", looping())).unwrap();
        settle().await;
        assert_eq!(handle.running().await.unwrap(), ["a"]);

        handle.stop("a").unwrap();
        settle().await;
        assert!(handle.running().await.unwrap().is_empty());

        let opened = sinks.opened.lock().unwrap();
        assert_eq!(opened.len(), 2);
        assert_eq!(opened[1].1.frames(), vec![vec![Color::OFF; 4]]);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_unknown_still_resets() {
        let (handle, sinks, _shutdown) = start();
        handle.stop("missing").unwrap();
        settle().await;
        assert!(handle.running().await.unwrap().is_empty());

        let opened = sinks.opened.lock().unwrap();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].1.count_uniform(Color::OFF), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeline_gpio_overrides_default() {
        let (handle, sinks, _shutdown) = start();
        let timeline = Timeline::new("pin", Vec::new()).with_gpio(21);
        handle.play(PlayRequest::new(timeline)).unwrap();
        handle.play(PlayRequest::new(Timeline::new("default", Vec::new()))).unwrap();
        settle().await;

        let mut gpios: Vec<_> = sinks.opened.lock().unwrap().iter().map(|(g, _)| *g).collect();
        gpios.sort();
        assert_eq!(gpios, [18, 21]);
    }

    /// Blocks opening pin 21 until released.
    struct Gated {
        gate: Mutex<mpsc_std::Receiver<()>>,
        inner: Recording,
    }

    impl SinkFactory for Gated {
        fn open(&self, options: &StripOptions) -> Result<Box<dyn PixelSink>> {
            if options.gpio() == Some(21) {
                let _ = self.gate.lock().unwrap().recv();
            }
            self.inner.open(options)
        }
    }

    async fn until(handle: &SchedulerHandle, expected: &[&str]) {
        let settled = tokio::time::timeout(Duration::from_secs(5), async {
            while handle.running().await.unwrap() != expected {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(settled.is_ok(), "registry never became {expected:?}");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn slow_strip_open_does_not_block_other_commands() {
        let (release, gate) = mpsc_std::channel();
        let sinks = Arc::new(Gated {
            gate: Mutex::new(gate),
            inner: Recording::default(),
        });
        let config = SystemConfig {
            leds: 4,
            ..SystemConfig::default()
        };
        let (handle, _task) =
            Scheduler::spawn(Arc::new(config), sinks.clone(), CancellationToken::new());

        handle.play(PlayRequest::with_id("slow", looping().with_gpio(21))).unwrap();
        handle.play(PlayRequest::with_id("fast", looping())).unwrap();
        until(&handle, &["fast"]).await;

        // Stopping a play that is still opening its strip drops it for good.
        handle.stop("slow").unwrap();
        release.send(()).unwrap();
        let opened = tokio::time::timeout(Duration::from_secs(5), async {
            while !sinks.inner.opened.lock().unwrap().iter().any(|(gpio, _)| *gpio == 21) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        assert!(opened.is_ok());
        settle().await;
        until(&handle, &["fast"]).await;

        let opened = sinks.inner.opened.lock().unwrap();
        let slow = &opened.iter().find(|(gpio, _)| *gpio == 21).unwrap().1;
        assert!(slow.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unresolvable_target_is_not_registered() {
        let sinks = Arc::new(Recording::default());
        let shutdown = CancellationToken::new();
        // Zero LEDs fails validation.
        let (handle, _task) = Scheduler::spawn(
            Arc::new(SystemConfig::default()),
            sinks.clone(),
            shutdown.clone(),
        );
        handle.play(PlayRequest::with_id("a", looping())).unwrap();
        settle().await;

        assert!(handle.running().await.unwrap().is_empty());
        assert!(sinks.opened.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_the_handle() {
        let (handle, _, shutdown) = start();
        handle.play(PlayRequest::with_id("a", looping())).unwrap();
        settle().await;
        shutdown.cancel();
        settle().await;

        assert!(matches!(handle.running().await, Err(LedlineError::SchedulerClosed)));
        assert!(matches!(handle.stop_all(), Err(LedlineError::SchedulerClosed)));
    }

    #[test]
    fn new_requests_get_unique_ids() {
        let a = PlayRequest::new(Timeline::new("x", Vec::new()));
        let b = PlayRequest::new(Timeline::new("x", Vec::new()));
        assert_ne!(a.process_id, b.process_id);
        assert!(Uuid::parse_str(&a.process_id).is_ok());
    }
}
