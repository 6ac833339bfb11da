//! Typed timeline model.
//!
//! Timelines arrive as JSON in the API shape and are decoded here, once, into
//! the [`StepKind`] / [`Effect`] sum types. Everything past this module works
//! on already-typed payloads.

mod decode;
mod range;

pub use range::LedRange;

use serde::Deserialize;

use crate::{Color, Result};

/// Hold time of the synthetic all-off step played on stop.
pub const STOP_STEP_TIME_MS: u64 = 1;

/// An ordered program of steps.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "decode::TimelineRecord")]
pub struct Timeline {
    pub id: String,
    pub name: String,
    pub enabled: bool,
    /// Creation time as sent by the caller (RFC 3339 text).
    pub created: Option<String>,
    /// Output pin override; `None` plays on the system default.
    pub gpio: Option<u32>,
    pub tags: Vec<String>,
    /// Steps sorted by [`Step::number`].
    pub steps: Vec<Step>,
}

impl Timeline {
    pub fn new(name: impl Into<String>, steps: Vec<Step>) -> Self {
        let mut timeline = Self {
            id: String::new(),
            name: name.into(),
            enabled: true,
            created: None,
            gpio: None,
            tags: Vec::new(),
            steps,
        };
        timeline.sort_steps();
        timeline
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    #[must_use]
    pub fn with_gpio(mut self, gpio: u32) -> Self {
        self.gpio = Some(gpio);
        self
    }

    /// The one-step timeline that forces an output dark.
    pub fn stop_sequence() -> Self {
        let step = Step::effect(0, Effect::Solid(SolidMeta { color: Color::OFF }))
            .with_id("StopStep")
            .with_time(STOP_STEP_TIME_MS);
        Self::new("stop", vec![step])
    }

    pub(crate) fn sort_steps(&mut self) {
        self.steps.sort_by_key(|step| step.number);
    }

    /// Steps that failed ingress decoding, with their reasons.
    pub fn malformed_steps(&self) -> impl Iterator<Item = (&Step, &str)> {
        self.steps.iter().filter_map(|step| match &step.kind {
            StepKind::Malformed(reason) => Some((step, reason.as_str())),
            _ => None,
        })
    }
}

/// One instruction within a timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub id: String,
    /// Ordinal position; defines execution order.
    pub number: i64,
    /// Milliseconds. Hold, animation or sleep time depending on the kind.
    pub time: Option<u64>,
    /// LED window; `None` is the whole strip.
    pub leds: Option<LedRange>,
    pub kind: StepKind,
}

impl Step {
    pub fn new(number: i64, kind: StepKind) -> Self {
        Self {
            id: String::new(),
            number,
            time: None,
            leds: None,
            kind,
        }
    }

    pub fn effect(number: i64, effect: Effect) -> Self {
        Self::new(number, StepKind::Effect(effect))
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_time(mut self, millis: u64) -> Self {
        self.time = Some(millis);
        self
    }

    #[must_use]
    pub fn with_leds(mut self, leds: LedRange) -> Self {
        self.leds = Some(leds);
        self
    }

    pub fn time_ms(&self) -> u64 {
        self.time.unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    Effect(Effect),
    Sleep,
    RandomSleep,
    Loop,
    Trigger(TriggerMeta),
    /// Unrecognised step type, carrying the name it was sent with.
    Unknown(String),
    /// The payload did not decode for the declared kind.
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Solid(SolidMeta),
    Fade(FadeMeta),
    Gradient(GradientMeta),
    Sequence(SequenceMeta),
    Rainbow,
    Zip(ZipMeta),
    KnightRider,
    Lightning(LightningMeta),
    Unknown(String),
}

impl Effect {
    pub fn name(&self) -> &str {
        match self {
            Self::Solid(_) => "solid",
            Self::Fade(_) => "fade",
            Self::Gradient(_) => "gradient",
            Self::Sequence(_) => "sequence",
            Self::Rainbow => "rainbow",
            Self::Zip(_) => "zip",
            Self::KnightRider => "knightrider",
            Self::Lightning(_) => "lightning",
            Self::Unknown(name) => name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolidMeta {
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FadeMeta {
    pub color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GradientMeta {
    pub start_color: Color,
    pub end_color: Color,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceMeta {
    pub sequence: Vec<Color>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZipMeta {
    pub color: Color,
}

/// Lightning parameters. Zero means "pick a random default when played".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LightningMeta {
    pub bursts: u32,
    pub burst_type: String,
    pub burst_spacing: u64,
    pub burst_length: u64,
    pub burst_brightness: u8,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerMeta {
    /// HTTP method; empty means POST.
    pub verb: String,
    pub url: String,
    /// `"Key:Value"` entries.
    pub headers: Vec<String>,
    pub body: Option<serde_json::Value>,
}
