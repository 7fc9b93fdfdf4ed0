// Copyright 2024-2025 mbp-hotkeyd contributors
//
// SPDX-License-Identifier: GPL-3.0-only

use serde::Deserialize;
use std::{fs, path::Path};

const CONFIG_PATH: &str = "/etc/mbp-hotkeyd/config.toml";

/// Tunables supplied before any hardware has been probed. Values may be
/// out of range for the hardware; they are clamped at probe time, once
/// the backlight driver has reported its maximum.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub lcd: LcdConfig,
    pub kbd: KbdConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LcdConfig {
    /// Brightness to set at startup; -1 leaves the hardware untouched.
    pub init: i32,
    pub step: i32,
}

impl Default for LcdConfig {
    fn default() -> Self { Self { init: -1, step: 10 } }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KbdConfig {
    /// Drive the keyboard backlight from the ambient light sensor.
    pub auto_on: bool,
    pub step: i32,
    /// Ambient light level (lux) at or below which the backlight turns on.
    pub on_threshold: u32,
    pub on_level: i32,
}

impl Default for KbdConfig {
    fn default() -> Self { Self { auto_on: true, step: 10, on_threshold: 20, on_level: 100 } }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> { Self::load_path(Path::new(CONFIG_PATH)) }

    pub(crate) fn load_path(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            log::info!("config file does not exist at {}; using defaults", path.display());
            return Ok(Self::default());
        }

        let text = fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }
}
