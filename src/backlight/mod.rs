// Copyright 2024-2025 mbp-hotkeyd contributors
//
// SPDX-License-Identifier: GPL-3.0-only

//! LCD backlight control: driver selection, stepping and clamping.
//!
//! The driver flavors only expose get/set/get-max against their
//! transport; range checking lives here. In-memory state advances only
//! when the hardware write went through.

pub mod gma950;
pub mod sysfs;

use std::{io, path::Path};

use crate::config::LcdConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LcdFlavor {
    /// Radeon X1600 through the kernel backlight class.
    SysfsRadeon,
    /// Intel GMA950 BLC PWM register through /dev/mem.
    Gma950,
}

#[derive(Debug, thiserror::Error)]
pub enum BacklightError {
    #[error("backlight control path missing: {}", _0)]
    NotFound(String),
    #[error("backlight control path not accessible: {}: {}", _0, _1)]
    Access(String, io::Error),
}

pub(crate) fn probe_error(path: &Path, why: io::Error) -> BacklightError {
    if why.kind() == io::ErrorKind::NotFound {
        BacklightError::NotFound(path.display().to_string())
    } else {
        BacklightError::Access(path.display().to_string(), why)
    }
}

/// A successful brightness change, reported to the notification sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepChange {
    pub old: u32,
    pub new: u32,
}

pub enum LcdDriver {
    Sysfs(sysfs::SysfsBacklight),
    Gma950(gma950::Gma950Backlight),
}

impl LcdDriver {
    pub fn probe(flavor: LcdFlavor) -> Result<Self, BacklightError> {
        match flavor {
            LcdFlavor::SysfsRadeon => sysfs::SysfsBacklight::probe().map(Self::Sysfs),
            LcdFlavor::Gma950 => gma950::Gma950Backlight::probe().map(Self::Gma950),
        }
    }

    /// Current hardware level; 0 when the read fails.
    pub fn get(&mut self) -> u32 {
        match self {
            Self::Sysfs(driver) => driver.get(),
            Self::Gma950(driver) => driver.get(),
        }
    }

    /// Writes a level to hardware. Failures are logged by the driver;
    /// the return value only tells the caller whether to trust its
    /// in-memory state.
    pub fn set(&mut self, value: u32) -> bool {
        match self {
            Self::Sysfs(driver) => driver.set(value),
            Self::Gma950(driver) => driver.set(value),
        }
    }

    pub fn max(&self) -> u32 {
        match self {
            Self::Sysfs(driver) => driver.max(),
            Self::Gma950(driver) => driver.max(),
        }
    }

    /// Lowest level `Down` steps to. The GMA950 keeps its PWM running.
    pub fn off_floor(&self) -> u32 {
        match self {
            Self::Sysfs(_) => 0,
            Self::Gma950(_) => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BacklightState {
    pub level: u32,
    pub max:   u32,
}

pub struct LcdBacklight {
    driver: LcdDriver,
    state:  BacklightState,
    step:   u32,
}

impl LcdBacklight {
    /// Probes the flavor's control path and initializes state from
    /// hardware. The config can only be validated here: its limits
    /// depend on the maximum the probe reports.
    pub fn probe(flavor: LcdFlavor, config: &LcdConfig) -> Result<Self, BacklightError> {
        LcdDriver::probe(flavor).map(|driver| Self::initialize(driver, config))
    }

    pub(crate) fn initialize(mut driver: LcdDriver, config: &LcdConfig) -> Self {
        let max = driver.max();

        let fixed = fix_config(config, max);
        if let Some(init) = fixed.init {
            driver.set(init);
        }

        let level = driver.get();
        log::info!("LCD backlight initialized at {}/{}", level, max);

        Self { driver, state: BacklightState { level, max }, step: fixed.step }
    }

    pub fn state(&self) -> BacklightState { self.state }

    pub fn step(&mut self, direction: Direction) -> Option<StepChange> {
        let old = self.driver.get();
        let new = step_value(old, self.step, direction, self.state.max, self.driver.off_floor());

        log::debug!("LCD stepping {:?} {} -> {}", direction, old, new);

        if !self.driver.set(new) {
            return None;
        }

        self.state.level = new;
        Some(StepChange { old, new })
    }
}

pub(crate) fn step_value(current: u32, step: u32, direction: Direction, max: u32, floor: u32) -> u32 {
    match direction {
        Direction::Up => current.saturating_add(step).min(max),
        Direction::Down => current.saturating_sub(step).max(floor),
    }
}

pub(crate) struct FixedLcdConfig {
    pub init: Option<u32>,
    pub step: u32,
}

/// Clamps the configured tunables against the hardware range: `init`
/// into [-1, max] where -1 means "leave the hardware alone", `step`
/// into [1, max/2] so a single step cannot saturate the range.
pub(crate) fn fix_config(config: &LcdConfig, max: u32) -> FixedLcdConfig {
    let init = if config.init < 0 { None } else { Some((config.init as u32).min(max)) };

    let ceiling = (max / 2).max(1);
    let step = (config.step.max(1) as u32).min(ceiling);

    FixedLcdConfig { init, step }
}
