use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::Color;
use crate::LedlineError;

/// Wire order of the color channels for one pixel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PixelOrder {
    Rgb,
    Rbg,
    #[default]
    Grb,
    Gbr,
    Brg,
    Bgr,
    Rgbw,
    Rbgw,
    Grbw,
    Gbrw,
    Brgw,
    Bgrw,
}

impl PixelOrder {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rgb => "RGB",
            Self::Rbg => "RBG",
            Self::Grb => "GRB",
            Self::Gbr => "GBR",
            Self::Brg => "BRG",
            Self::Bgr => "BGR",
            Self::Rgbw => "RGBW",
            Self::Rbgw => "RBGW",
            Self::Grbw => "GRBW",
            Self::Gbrw => "GBRW",
            Self::Brgw => "BRGW",
            Self::Bgrw => "BGRW",
        }
    }

    /// Whether the order itself names a white channel.
    pub const fn has_white(self) -> bool {
        matches!(
            self,
            Self::Rgbw | Self::Rbgw | Self::Grbw | Self::Gbrw | Self::Brgw | Self::Bgrw
        )
    }

    /// Lays `color` out in wire order. `channels` is 3 or 4; with 4 the white
    /// byte always trails the three color bytes.
    pub fn encode(self, color: Color, channels: usize) -> Vec<u8> {
        let Color { r, g, b, w } = color;
        let mut bytes = match self {
            Self::Rgb | Self::Rgbw => vec![r, g, b],
            Self::Rbg | Self::Rbgw => vec![r, b, g],
            Self::Grb | Self::Grbw => vec![g, r, b],
            Self::Gbr | Self::Gbrw => vec![g, b, r],
            Self::Brg | Self::Brgw => vec![b, r, g],
            Self::Bgr | Self::Bgrw => vec![b, g, r],
        };
        if channels >= 4 {
            bytes.push(w);
        }
        bytes
    }
}

impl FromStr for PixelOrder {
    type Err = LedlineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_uppercase().as_str() {
            "RGB" => Self::Rgb,
            "RBG" => Self::Rbg,
            "GRB" => Self::Grb,
            "GBR" => Self::Gbr,
            "BRG" => Self::Brg,
            "BGR" => Self::Bgr,
            "RGBW" => Self::Rgbw,
            "RBGW" => Self::Rbgw,
            "GRBW" => Self::Grbw,
            "GBRW" => Self::Gbrw,
            "BRGW" => Self::Brgw,
            "BGRW" => Self::Bgrw,
            other => return Err(LedlineError::decode(format!("unknown pixel order {other:?}"))),
        })
    }
}

impl TryFrom<String> for PixelOrder {
    type Error = LedlineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PixelOrder> for String {
    fn from(value: PixelOrder) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for PixelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
