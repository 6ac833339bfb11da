use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{LedlineError, PixelOrder, Result};

pub const DEFAULT_GPIO: u32 = 18;
pub const DEFAULT_OSC_FREQUENCY: u32 = 800_000;
pub const DEFAULT_DMA_CHANNEL: u32 = 10;
pub const DEFAULT_NUMBER_OF_COLORS: usize = 3;

/// System-wide strip defaults, queried once per play request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub gpio: u32,
    pub leds: usize,
    pub pixel_order: PixelOrder,
    pub number_of_colors: usize,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            gpio: DEFAULT_GPIO,
            leds: 0,
            pixel_order: PixelOrder::default(),
            number_of_colors: DEFAULT_NUMBER_OF_COLORS,
        }
    }
}

impl SystemConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

/// Supplies the system defaults the scheduler resolves render targets from.
pub trait ConfigProvider: Send + Sync {
    fn system_config(&self) -> Result<SystemConfig>;
}

impl ConfigProvider for SystemConfig {
    fn system_config(&self) -> Result<SystemConfig> {
        Ok(self.clone())
    }
}

/// Config provider backed by a JSON file that is re-read on every query, so
/// edits apply to the next play request.
#[derive(Debug, Clone)]
pub struct JsonConfigFile {
    path: PathBuf,
}

impl JsonConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ConfigProvider for JsonConfigFile {
    fn system_config(&self) -> Result<SystemConfig> {
        SystemConfig::from_json_file(&self.path).map_err(|err| {
            LedlineError::config(format!("reading {}: {err}", self.path.display()))
        })
    }
}

/// Construction parameters for one physical strip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StripOptions {
    pub num_pixels: usize,
    pub order: PixelOrder,
    pub osc_frequency: u32,
    pub dma_channel: u32,
    pub pwm_pins: Vec<u32>,
    /// Global brightness in `(0, 1]`; zero disables scaling and gamma.
    pub brightness: f32,
    pub num_colors: usize,
}

impl Default for StripOptions {
    fn default() -> Self {
        Self {
            num_pixels: 0,
            order: PixelOrder::Grb,
            osc_frequency: DEFAULT_OSC_FREQUENCY,
            dma_channel: DEFAULT_DMA_CHANNEL,
            pwm_pins: vec![DEFAULT_GPIO],
            brightness: 0.0,
            num_colors: DEFAULT_NUMBER_OF_COLORS,
        }
    }
}

impl StripOptions {
    /// Options for the system defaults driven out of `gpio`.
    pub fn from_system(config: &SystemConfig, gpio: u32) -> Self {
        Self {
            num_pixels: config.leds,
            order: config.pixel_order,
            pwm_pins: vec![gpio],
            num_colors: config.number_of_colors,
            ..Self::default()
        }
    }

    pub fn gpio(&self) -> Option<u32> {
        self.pwm_pins.first().copied()
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_pixels == 0 {
            return Err(LedlineError::config("strip has no pixels"));
        }
        if !matches!(self.num_colors, 3 | 4) {
            return Err(LedlineError::config(format!(
                "unsupported color channel count {}",
                self.num_colors
            )));
        }
        if self.order.has_white() && self.num_colors != 4 {
            return Err(LedlineError::config(format!(
                "pixel order {} needs 4 color channels",
                self.order
            )));
        }
        if !(0.0..=1.0).contains(&self.brightness) {
            return Err(LedlineError::config(format!(
                "brightness {} outside 0..=1",
                self.brightness
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_takes_defaults() {
        let config: SystemConfig = serde_json::from_str(r#"{"leds": 60}"#).unwrap();
        assert_eq!(config.leds, 60);
        assert_eq!(config.gpio, DEFAULT_GPIO);
        assert_eq!(config.pixel_order, PixelOrder::Grb);
        assert_eq!(config.number_of_colors, 3);
    }

    #[test]
    fn strip_options_follow_system_config() {
        let config = SystemConfig {
            gpio: 12,
            leds: 30,
            pixel_order: PixelOrder::Grbw,
            number_of_colors: 4,
        };
        let options = StripOptions::from_system(&config, 21);
        assert_eq!(options.gpio(), Some(21));
        assert_eq!(options.num_pixels, 30);
        assert_eq!(options.dma_channel, DEFAULT_DMA_CHANNEL);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn validate_rejects_unusable_strips() {
        assert!(StripOptions::default().validate().is_err());
        let options = StripOptions {
            num_pixels: 10,
            num_colors: 5,
            ..StripOptions::default()
        };
        assert!(options.validate().is_err());
        let options = StripOptions {
            num_pixels: 10,
            order: PixelOrder::Rgbw,
            ..StripOptions::default()
        };
        assert!(options.validate().is_err());
    }
}
