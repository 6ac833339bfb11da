//! Core library for the Ledline timeline player.
//!
//! Timelines are ordered programs of steps (static colors, fades, chases,
//! bursts, sleeps, loops and outbound HTTP triggers) rendered onto
//! addressable LED strips. The [`Scheduler`] accepts play, stop and
//! stop-all requests and runs every play on its own task; each task walks
//! its timeline through a [`StepProcessor`] that draws into a
//! [`PixelSink`].

pub mod animation;
pub mod color;
pub mod config;
pub mod error;
pub mod runner;
pub mod scheduler;
pub mod sink;
pub mod step;
pub mod timeline;

pub use color::{Color, PixelOrder};
pub use config::{ConfigProvider, JsonConfigFile, StripOptions, SystemConfig};
pub use error::{LedlineError, Result};
pub use runner::{RunOutcome, TimelineRunner};
pub use scheduler::{PlayRequest, ProcessId, Scheduler, SchedulerHandle};
pub use sink::{
    FrameHistory, LogDriver, LogSinkFactory, MemorySink, PixArray, PixelSink, SinkFactory,
    SmartLedsDriver, StripDriver, SubStrip,
};
pub use step::{StepOutcome, StepProcessor};
pub use timeline::{Effect, LedRange, Step, StepKind, Timeline};
