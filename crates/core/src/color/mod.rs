//! Pixel color value and the small amount of color math the engine needs.

mod order;

pub use order::PixelOrder;

use serde::{Deserialize, Serialize};
use smart_leds::{White, RGB8, RGBW};

const GAMMA: f32 = 2.8;

/// A single RGBW pixel value. Three-color strips ignore `w`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub w: u8,
}

impl Color {
    pub const OFF: Color = Color::rgbw(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, w: 0 }
    }

    pub const fn rgbw(r: u8, g: u8, b: u8, w: u8) -> Self {
        Self { r, g, b, w }
    }

    /// Builds a color from unconstrained integer channels, clamping each
    /// into `0..=255`.
    pub fn clamped(r: i64, g: i64, b: i64, w: i64) -> Self {
        Self {
            r: clamp_channel(r),
            g: clamp_channel(g),
            b: clamp_channel(b),
            w: clamp_channel(w),
        }
    }

    pub fn is_off(&self) -> bool {
        *self == Self::OFF
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn clamp_channel(value: i64) -> u8 {
    value.clamp(0, 255) as u8
}

impl From<Color> for RGB8 {
    fn from(value: Color) -> Self {
        RGB8::new(value.r, value.g, value.b)
    }
}

impl From<Color> for RGBW<u8> {
    fn from(value: Color) -> Self {
        RGBW {
            r: value.r,
            g: value.g,
            b: value.b,
            a: White(value.w),
        }
    }
}

impl From<RGB8> for Color {
    fn from(value: RGB8) -> Self {
        Self::rgb(value.r, value.g, value.b)
    }
}

/// Linear interpolation between two colors, `t` in `[0, 1]`.
///
/// The float delta of each channel is truncated toward zero before it is
/// added to `c1`, so intermediate values lean toward the start color.
/// Existing renders depend on this exact rounding.
pub fn lerp(c1: Color, c2: Color, t: f32) -> Color {
    Color {
        r: lerp_channel(c1.r, c2.r, t),
        g: lerp_channel(c1.g, c2.g, t),
        b: lerp_channel(c1.b, c2.b, t),
        w: lerp_channel(c1.w, c2.w, t),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn lerp_channel(a: u8, b: u8, t: f32) -> u8 {
    let delta = (t * (f32::from(b) - f32::from(a))) as i64;
    clamp_channel(i64::from(a) + delta)
}

/// Scales every channel by `t`, truncating.
#[allow(clippy::cast_possible_truncation)]
pub fn scale(color: Color, t: f32) -> Color {
    let ch = |v: u8| clamp_channel((t * f32::from(v)) as i64);
    Color {
        r: ch(color.r),
        g: ch(color.g),
        b: ch(color.b),
        w: ch(color.w),
    }
}

/// Applies a 2.8 gamma curve to every channel.
pub fn gamma_correct(color: Color) -> Color {
    Color {
        r: gamma_channel(color.r),
        g: gamma_channel(color.g),
        b: gamma_channel(color.b),
        w: gamma_channel(color.w),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn gamma_channel(value: u8) -> u8 {
    let normalized = f32::from(value) / 255.0;
    clamp_channel((normalized.powf(GAMMA) * 255.0 + 0.5) as i64)
}
