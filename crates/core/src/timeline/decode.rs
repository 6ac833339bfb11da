//! Ingress decoding from the API JSON shape into typed steps.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use super::{
    Effect, FadeMeta, GradientMeta, LedRange, LightningMeta, SequenceMeta, SolidMeta, Step,
    StepKind, Timeline, TriggerMeta, ZipMeta,
};
use crate::{Color, LedlineError, Result};

#[derive(Debug, Deserialize)]
pub(super) struct TimelineRecord {
    #[serde(default)]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
    #[serde(default)]
    created: Option<String>,
    #[serde(default)]
    gpio: Option<u32>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    steps: Vec<StepRecord>,
}

fn enabled_by_default() -> bool {
    true
}

impl From<TimelineRecord> for Timeline {
    fn from(record: TimelineRecord) -> Self {
        let mut timeline = Timeline {
            id: record.id,
            name: record.name,
            enabled: record.enabled,
            created: record.created.filter(|created| !created.is_empty()),
            // Pin 0 is how an unset override is stored upstream.
            gpio: record.gpio.filter(|&gpio| gpio != 0),
            tags: record.tags,
            steps: record.steps.into_iter().map(Step::from).collect(),
        };
        timeline.sort_steps();
        timeline
    }
}

#[derive(Debug, Deserialize)]
struct StepRecord {
    #[serde(default)]
    id: String,
    #[serde(rename = "type", default)]
    step_type: String,
    #[serde(default)]
    effect: String,
    #[serde(default)]
    leds: String,
    #[serde(default)]
    time: Option<i64>,
    #[serde(default)]
    number: i64,
    #[serde(rename = "meta-info", default)]
    meta_info: Value,
}

impl From<StepRecord> for Step {
    fn from(record: StepRecord) -> Self {
        let decoded = decode_time(record.time).and_then(|time| {
            let leds = decode_leds(&record.leds)?;
            let kind = decode_kind(&record.step_type, &record.effect, record.meta_info)?;
            Ok((time, leds, kind))
        });
        let (time, leds, kind) = match decoded {
            Ok(parts) => parts,
            Err(err) => (None, None, StepKind::Malformed(err.to_string())),
        };
        Step {
            id: record.id,
            number: record.number,
            time,
            leds,
            kind,
        }
    }
}

fn decode_time(time: Option<i64>) -> Result<Option<u64>> {
    time.map(|millis| {
        u64::try_from(millis)
            .map_err(|_| LedlineError::decode(format!("negative step time {millis}")))
    })
    .transpose()
}

fn decode_leds(leds: &str) -> Result<Option<LedRange>> {
    if leds.trim().is_empty() {
        return Ok(None);
    }
    leds.parse().map(Some)
}

fn decode_kind(step_type: &str, effect: &str, meta: Value) -> Result<StepKind> {
    Ok(match step_type.to_ascii_lowercase().as_str() {
        "effect" => StepKind::Effect(decode_effect(effect, meta)?),
        "sleep" => StepKind::Sleep,
        "randomsleep" => StepKind::RandomSleep,
        "loop" => StepKind::Loop,
        "trigger" => {
            let meta: TriggerRecord = decode_meta("trigger", meta)?;
            StepKind::Trigger(TriggerMeta {
                verb: meta.verb,
                url: meta.url,
                headers: meta.headers,
                body: meta.body.filter(|body| !body.is_null()),
            })
        }
        _ => StepKind::Unknown(step_type.to_string()),
    })
}

fn decode_effect(effect: &str, meta: Value) -> Result<Effect> {
    Ok(match effect.to_ascii_lowercase().as_str() {
        "solid" => {
            let meta: ColorRecord = decode_meta(effect, meta)?;
            Effect::Solid(SolidMeta {
                color: meta.color.into(),
            })
        }
        "fade" => {
            let meta: ColorRecord = decode_meta(effect, meta)?;
            Effect::Fade(FadeMeta {
                color: meta.color.into(),
            })
        }
        "gradient" => {
            let meta: GradientRecord = decode_meta(effect, meta)?;
            Effect::Gradient(GradientMeta {
                start_color: meta.start_color.into(),
                end_color: meta.end_color.into(),
            })
        }
        "sequence" => {
            let meta: SequenceRecord = decode_meta(effect, meta)?;
            Effect::Sequence(SequenceMeta {
                sequence: meta.sequence.into_iter().map(Color::from).collect(),
            })
        }
        "zip" => {
            let meta: ColorRecord = decode_meta(effect, meta)?;
            Effect::Zip(ZipMeta {
                color: meta.color.into(),
            })
        }
        "lightning" => {
            let meta: LightningRecord = if meta.is_null() {
                LightningRecord::default()
            } else {
                decode_meta(effect, meta)?
            };
            Effect::Lightning(meta.try_into()?)
        }
        "rainbow" => Effect::Rainbow,
        "knightrider" => Effect::KnightRider,
        _ => Effect::Unknown(effect.to_string()),
    })
}

fn decode_meta<T: DeserializeOwned>(kind: &str, meta: Value) -> Result<T> {
    serde_json::from_value(meta)
        .map_err(|err| LedlineError::decode(format!("{kind} meta-info: {err}")))
}

#[derive(Debug, Default, Deserialize)]
struct MetaColor {
    #[serde(rename = "R", default)]
    r: i64,
    #[serde(rename = "G", default)]
    g: i64,
    #[serde(rename = "B", default)]
    b: i64,
    #[serde(rename = "W", default)]
    w: i64,
}

impl From<MetaColor> for Color {
    fn from(value: MetaColor) -> Self {
        Color::clamped(value.r, value.g, value.b, value.w)
    }
}

#[derive(Debug, Deserialize)]
struct ColorRecord {
    color: MetaColor,
}

#[derive(Debug, Deserialize)]
struct GradientRecord {
    #[serde(rename = "start-color")]
    start_color: MetaColor,
    #[serde(rename = "end-color")]
    end_color: MetaColor,
}

#[derive(Debug, Deserialize)]
struct SequenceRecord {
    sequence: Vec<MetaColor>,
}

#[derive(Debug, Default, Deserialize)]
struct LightningRecord {
    #[serde(default)]
    bursts: i64,
    #[serde(rename = "burst-type", default)]
    burst_type: String,
    #[serde(rename = "burst-spacing", default)]
    burst_spacing: i64,
    #[serde(rename = "burst-length", default)]
    burst_length: i64,
    #[serde(rename = "burst-brightness", default)]
    burst_brightness: i64,
}

impl TryFrom<LightningRecord> for LightningMeta {
    type Error = LedlineError;

    fn try_from(record: LightningRecord) -> Result<Self> {
        let non_negative = |field: &str, value: i64| {
            u64::try_from(value)
                .map_err(|_| LedlineError::decode(format!("lightning {field} is negative")))
        };
        let bursts = non_negative("bursts", record.bursts)?;
        let brightness = non_negative("burst-brightness", record.burst_brightness)?;
        Ok(Self {
            bursts: u32::try_from(bursts)
                .map_err(|_| LedlineError::decode("lightning bursts out of range"))?,
            burst_type: record.burst_type,
            burst_spacing: non_negative("burst-spacing", record.burst_spacing)?,
            burst_length: non_negative("burst-length", record.burst_length)?,
            burst_brightness: u8::try_from(brightness.min(255)).unwrap_or(u8::MAX),
        })
    }
}

#[derive(Debug, Deserialize)]
struct TriggerRecord {
    #[serde(default)]
    verb: String,
    url: String,
    #[serde(default)]
    headers: Vec<String>,
    #[serde(default)]
    body: Option<Value>,
}
